use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::{
        events::EventEntity, payments::PaymentEntity, registrations::RegistrationEntity,
        users::UserSummaryEntity,
    },
    value_objects::{
        enums::registration_statuses::RegistrationPaymentStatus, events::EventDto,
        payments::PaymentDto, users::UserSummaryDto,
    },
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegistrationDto {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub ticket_quantity: i32,
    pub total_amount_minor: i64,
    pub phone_number: String,
    pub payment_status: RegistrationPaymentStatus,
    pub mpesa_receipt: Option<String>,
    pub qr_code_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RegistrationEntity> for RegistrationDto {
    fn from(value: RegistrationEntity) -> Self {
        let payment_status = match value.payment_status.as_str() {
            "paid" => RegistrationPaymentStatus::Paid,
            "failed" => RegistrationPaymentStatus::Failed,
            _ => RegistrationPaymentStatus::Pending,
        };

        Self {
            id: value.id,
            event_id: value.event_id,
            user_id: value.user_id,
            ticket_quantity: value.ticket_quantity,
            total_amount_minor: value.total_amount_minor,
            phone_number: value.phone_number,
            payment_status,
            mpesa_receipt: value.mpesa_receipt,
            qr_code_data: value.qr_code_data,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// A buyer's registration with its event and every charge attempt against it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RegistrationDetailsDto {
    #[serde(flatten)]
    pub registration: RegistrationDto,
    pub events: EventDto,
    pub payments: Vec<PaymentDto>,
}

/// A registration as seen by the organizer of the event.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AttendeeRegistrationDto {
    #[serde(flatten)]
    pub registration: RegistrationDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<EventDto>,
    pub users: UserSummaryDto,
}

impl AttendeeRegistrationDto {
    pub fn new(
        registration: RegistrationEntity,
        event: Option<EventEntity>,
        attendee: UserSummaryEntity,
    ) -> Self {
        Self {
            registration: registration.into(),
            events: event.map(EventDto::from),
            users: attendee.into(),
        }
    }
}

/// Groups payment rows under their registrations, keeping the registration order.
pub fn attach_payments(
    rows: Vec<(RegistrationEntity, EventEntity)>,
    payments: Vec<PaymentEntity>,
) -> Vec<RegistrationDetailsDto> {
    let mut by_registration: HashMap<Uuid, Vec<PaymentDto>> = HashMap::new();
    for payment in payments {
        by_registration
            .entry(payment.registration_id)
            .or_default()
            .push(payment.into());
    }

    rows.into_iter()
        .map(|(registration, event)| {
            let payments = by_registration.remove(&registration.id).unwrap_or_default();
            RegistrationDetailsDto {
                registration: registration.into(),
                events: event.into(),
                payments,
            }
        })
        .collect()
}
