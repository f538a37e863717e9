use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::entities::registrations::RegistrationEntity, infra::db::postgres::schema::payments,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub amount_minor: i64,
    pub phone_number: String,
    pub mpesa_transaction_id: Option<String>,
    pub mpesa_receipt: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub registration_id: Uuid,
    pub amount_minor: i64,
    pub phone_number: String,
    pub mpesa_transaction_id: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// State written by a successful callback: the paid registration and whether its tickets
/// could be taken from the event's counter.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSettlement {
    pub registration: RegistrationEntity,
    pub tickets_decremented: bool,
}
