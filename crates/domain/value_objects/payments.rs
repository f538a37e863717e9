use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::payments::PaymentEntity, value_objects::enums::payment_statuses::PaymentStatus,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentDto {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub amount_minor: i64,
    pub phone_number: String,
    pub mpesa_transaction_id: Option<String>,
    pub mpesa_receipt: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentEntity> for PaymentDto {
    fn from(value: PaymentEntity) -> Self {
        Self {
            id: value.id,
            registration_id: value.registration_id,
            amount_minor: value.amount_minor,
            phone_number: value.phone_number,
            mpesa_transaction_id: value.mpesa_transaction_id,
            mpesa_receipt: value.mpesa_receipt,
            status: PaymentStatus::from_str(&value.status).unwrap_or(PaymentStatus::Failed),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitiatePaymentModel {
    pub event_id: Option<Uuid>,
    pub ticket_quantity: Option<i32>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MpesaResponseDto {
    #[serde(rename = "checkoutRequestID")]
    pub checkout_request_id: String,
    #[serde(rename = "customerMessage")]
    pub customer_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InitiatePaymentDto {
    pub payment: PaymentDto,
    pub mpesa_response: MpesaResponseDto,
}

/// Minor units (hundredths) to the whole-unit amount M-Pesa accepts, rounding up.
pub fn minor_to_mpesa_amount(amount_minor: i64) -> i64 {
    if amount_minor <= 0 {
        return 0;
    }
    amount_minor / 100 + i64::from(amount_minor % 100 != 0)
}
