use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::registrations;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = registrations)]
pub struct RegistrationEntity {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub ticket_quantity: i32,
    pub total_amount_minor: i64,
    pub phone_number: String,
    pub payment_status: String,
    pub mpesa_receipt: Option<String>,
    pub qr_code_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = registrations)]
pub struct InsertRegistrationEntity {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub ticket_quantity: i32,
    pub total_amount_minor: i64,
    pub phone_number: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields refreshed when a buyer retries against their pending registration.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = registrations)]
pub struct UpdatePendingRegistrationEntity {
    pub ticket_quantity: i32,
    pub total_amount_minor: i64,
    pub phone_number: String,
    pub updated_at: DateTime<Utc>,
}
