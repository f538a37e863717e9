use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::{events::EventEntity, users::UserSummaryEntity},
    value_objects::enums::event_statuses::EventStatus,
};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;
/// 250,000.00, the largest single M-Pesa customer payment.
pub const MAX_TICKET_PRICE_MINOR: i64 = 25_000_000;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventDto {
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
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventEntity> for EventDto {
    fn from(value: EventEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            description: value.description,
            location: value.location,
            venue: value.venue,
            event_date: value.event_date,
            event_time: value.event_time,
            category: value.category,
            ticket_price_minor: value.ticket_price_minor,
            available_tickets: value.available_tickets,
            max_attendees: value.max_attendees,
            organizer_id: value.organizer_id,
            image_url: value.image_url,
            status: EventStatus::from_str(&value.status).unwrap_or_default(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrganizerDto {
    pub full_name: Option<String>,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl OrganizerDto {
    /// Listing pages only show name and email; the detail page adds the phone.
    pub fn public(organizer: UserSummaryEntity) -> Self {
        Self {
            full_name: organizer.full_name,
            email: organizer.email,
            phone_number: None,
        }
    }

    pub fn with_contact(organizer: UserSummaryEntity) -> Self {
        Self {
            full_name: organizer.full_name,
            email: organizer.email,
            phone_number: organizer.phone_number,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventWithOrganizerDto {
    #[serde(flatten)]
    pub event: EventDto,
    pub organizer: OrganizerDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrganizerEventDto {
    #[serde(flatten)]
    pub event: EventDto,
    pub registration_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaginationDto {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventListDto {
    pub events: Vec<EventWithOrganizerDto>,
    pub pagination: PaginationDto,
}

/// Query string accepted by the public event listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListEventsQuery {
    pub category: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Validated listing filter handed to the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ListEventsFilter {
    pub status: EventStatus,
    pub category: Option<String>,
    pub location: Option<String>,
    pub date: Option<NaiveDate>,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventModel {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub venue: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub category: Option<String>,
    pub ticket_price_minor: Option<i64>,
    pub max_attendees: i32,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEventModel {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub venue: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub category: Option<String>,
    pub ticket_price_minor: Option<i64>,
    pub max_attendees: Option<i32>,
    pub image_url: Option<String>,
    pub status: Option<EventStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyTicketModel {
    pub qr_data: String,
}
