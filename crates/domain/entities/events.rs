use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::events;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = events)]
pub struct EventEntity {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub venue: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub category: Option<String>,
    pub ticket_price_minor: i64,
    pub available_tickets: i32,
    pub max_attendees: i32,
    pub organizer_id: Uuid,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = events)]
pub struct InsertEventEntity {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub venue: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub category: Option<String>,
    pub ticket_price_minor: i64,
    pub available_tickets: i32,
    pub max_attendees: i32,
    pub organizer_id: Uuid,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable event fields. Capacity changes go through `EventRepository::update`'s
/// `max_attendees` argument so the ticket counter is adjusted in SQL.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = events)]
pub struct UpdateEventEntity {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub venue: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub category: Option<String>,
    pub ticket_price_minor: Option<i64>,
    pub image_url: Option<String>,
    pub status: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}
