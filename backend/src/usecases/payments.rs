use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use crates::{
    domain::{
        entities::{
            payments::InsertPaymentEntity,
            registrations::{
                InsertRegistrationEntity, RegistrationEntity, UpdatePendingRegistrationEntity,
            },
        },
        repositories::{
            events::EventRepository, payments::PaymentRepository,
            registrations::RegistrationRepository,
        },
        value_objects::{
            enums::{
                event_statuses::EventStatus, payment_statuses::PaymentStatus,
                registration_statuses::RegistrationPaymentStatus,
            },
            payments::{
                InitiatePaymentDto, InitiatePaymentModel, MpesaResponseDto, minor_to_mpesa_amount,
            },
            phone_numbers::normalize_mpesa_phone_number,
            registrations::{RegistrationDetailsDto, attach_payments},
        },
    },
    payments::mpesa_client::{
        CallbackAck, MpesaClient, StkCallback, StkCallbackEnvelope, StkPushRequest,
        StkPushResponse,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MpesaGateway: Send + Sync {
    async fn initiate_stk_push(&self, request: StkPushRequest) -> AnyResult<StkPushResponse>;
}

#[async_trait]
impl MpesaGateway for MpesaClient {
    async fn initiate_stk_push(&self, request: StkPushRequest) -> AnyResult<StkPushResponse> {
        self.initiate_stk_push(request).await
    }
}

const GATEWAY_FAILURE: &str = "Failed to initiate M-Pesa payment";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Event ID, ticket quantity, and phone number are required")]
    MissingFields,
    #[error("Ticket quantity must be at least 1")]
    InvalidQuantity,
    #[error("{0}")]
    InvalidPhone(String),
    #[error("Event not found")]
    EventNotFound,
    #[error("Event is not open for registration")]
    EventNotOpen,
    #[error("Only {0} tickets available")]
    InsufficientTickets(i32),
    #[error("Total amount is too large")]
    AmountOverflow,
    #[error("{}", GATEWAY_FAILURE)]
    Gateway(String),
    #[error("Registration not found")]
    RegistrationNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::EventNotFound | PaymentError::RegistrationNotFound => {
                StatusCode::NOT_FOUND
            }
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Internal(e) => AppError::Internal(e),
            PaymentError::Gateway(detail) => AppError::BadRequest {
                message: GATEWAY_FAILURE.to_string(),
                error: Some(serde_json::Value::String(detail)),
            },
            PaymentError::EventNotFound | PaymentError::RegistrationNotFound => {
                AppError::NotFound(err.to_string())
            }
            other => AppError::bad_request(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

/// What a single vendor callback delivery did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Completed {
        registration_id: Uuid,
        tickets_decremented: bool,
    },
    Failed {
        registration_id: Uuid,
    },
    /// The payment had already left `initiated`; a redelivery.
    AlreadySettled,
    UnknownTransaction,
}

pub fn account_reference(event_id: Uuid) -> String {
    let id = event_id.to_string();
    format!("EVENT-{}", &id[..8])
}

pub fn new_ticket_code() -> String {
    Uuid::new_v4().simple().to_string()
}

pub struct PaymentUseCase<E, R, P, G>
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: MpesaGateway + 'static,
{
    event_repo: Arc<E>,
    registration_repo: Arc<R>,
    payment_repo: Arc<P>,
    mpesa_gateway: Arc<G>,
}

impl<E, R, P, G> PaymentUseCase<E, R, P, G>
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: MpesaGateway + 'static,
{
    pub fn new(
        event_repo: Arc<E>,
        registration_repo: Arc<R>,
        payment_repo: Arc<P>,
        mpesa_gateway: Arc<G>,
    ) -> Self {
        Self {
            event_repo,
            registration_repo,
            payment_repo,
            mpesa_gateway,
        }
    }

    pub async fn initiate(
        &self,
        user_id: Uuid,
        model: InitiatePaymentModel,
    ) -> UseCaseResult<InitiatePaymentDto> {
        let (event_id, ticket_quantity, phone_number) =
            match (model.event_id, model.ticket_quantity, model.phone_number) {
                (Some(event_id), Some(quantity), Some(phone)) if !phone.trim().is_empty() => {
                    (event_id, quantity, phone.trim().to_string())
                }
                _ => return Err(PaymentError::MissingFields),
            };

        if ticket_quantity < 1 {
            return Err(PaymentError::InvalidQuantity);
        }

        info!(%user_id, %event_id, ticket_quantity, "payments: initiating payment");

        let event = self
            .event_repo
            .find_by_id(event_id)
            .await
            .map_err(|err| {
                error!(%event_id, db_error = ?err, "payments: failed to load event");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::EventNotFound)?;

        if EventStatus::from_str(&event.status) != Some(EventStatus::Published) {
            return Err(PaymentError::EventNotOpen);
        }

        // Checked here, enforced atomically when the ticket counter is decremented.
        if event.available_tickets < ticket_quantity {
            return Err(PaymentError::InsufficientTickets(event.available_tickets));
        }

        let total_amount_minor = event
            .ticket_price_minor
            .checked_mul(i64::from(ticket_quantity))
            .ok_or(PaymentError::AmountOverflow)?;

        let formatted_phone = normalize_mpesa_phone_number(&phone_number)
            .map_err(|err| PaymentError::InvalidPhone(err.to_string()))?;

        let registration = self
            .upsert_pending_registration(
                user_id,
                event_id,
                ticket_quantity,
                total_amount_minor,
                phone_number,
            )
            .await?;

        let stk_response = self
            .mpesa_gateway
            .initiate_stk_push(StkPushRequest {
                phone_number: formatted_phone.clone(),
                amount: minor_to_mpesa_amount(total_amount_minor),
                account_reference: account_reference(event_id),
                transaction_desc: format!("Payment for {}", event.title),
            })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    registration_id = %registration.id,
                    gateway_error = ?err,
                    "payments: stk push failed"
                );
                PaymentError::Gateway(err.to_string())
            })?;

        let now = Utc::now();
        let payment = self
            .payment_repo
            .record_payment(InsertPaymentEntity {
                registration_id: registration.id,
                amount_minor: total_amount_minor,
                phone_number: formatted_phone,
                mpesa_transaction_id: Some(stk_response.checkout_request_id.clone()),
                status: PaymentStatus::Initiated.as_str().to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(
                    registration_id = %registration.id,
                    checkout_request_id = %stk_response.checkout_request_id,
                    db_error = ?err,
                    "payments: failed to record payment"
                );
                PaymentError::Internal(err)
            })?;

        info!(
            %user_id,
            registration_id = %registration.id,
            payment_id = %payment.id,
            checkout_request_id = %stk_response.checkout_request_id,
            "payments: stk push sent"
        );

        Ok(InitiatePaymentDto {
            payment: payment.into(),
            mpesa_response: MpesaResponseDto {
                checkout_request_id: stk_response.checkout_request_id,
                customer_message: stk_response.customer_message,
            },
        })
    }

    async fn upsert_pending_registration(
        &self,
        user_id: Uuid,
        event_id: Uuid,
        ticket_quantity: i32,
        total_amount_minor: i64,
        phone_number: String,
    ) -> UseCaseResult<RegistrationEntity> {
        let pending = self
            .registration_repo
            .find_pending(user_id, event_id)
            .await
            .map_err(|err| {
                error!(%user_id, %event_id, db_error = ?err, "payments: failed to look up pending registration");
                PaymentError::Internal(err)
            })?;

        let now = Utc::now();

        if let Some(existing) = pending {
            let updated = self
                .registration_repo
                .update_pending(
                    existing.id,
                    UpdatePendingRegistrationEntity {
                        ticket_quantity,
                        total_amount_minor,
                        phone_number: phone_number.clone(),
                        updated_at: now,
                    },
                )
                .await
                .map_err(|err| {
                    error!(registration_id = %existing.id, db_error = ?err, "payments: failed to update pending registration");
                    PaymentError::Internal(err)
                })?;

            match updated {
                Some(registration) => {
                    info!(registration_id = %registration.id, "payments: reusing pending registration");
                    return Ok(registration);
                }
                None => {
                    info!(registration_id = %existing.id, "payments: pending registration settled meanwhile, creating a new one");
                }
            }
        }

        self.registration_repo
            .create(InsertRegistrationEntity {
                event_id,
                user_id,
                ticket_quantity,
                total_amount_minor,
                phone_number,
                payment_status: RegistrationPaymentStatus::Pending.as_str().to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(%user_id, %event_id, db_error = ?err, "payments: failed to save registration");
                PaymentError::Internal(err)
            })
    }

    /// Entry point for the vendor webhook. Every delivery is acknowledged; problems are only logged.
    pub async fn handle_callback(&self, payload: &[u8]) -> CallbackAck {
        let envelope = match serde_json::from_slice::<StkCallbackEnvelope>(payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(parse_error = %err, "payments: malformed mpesa callback");
                return CallbackAck::accepted();
            }
        };

        let checkout_request_id = envelope.body.stk_callback.checkout_request_id.clone();
        match self.process_callback(envelope.body.stk_callback).await {
            Ok(outcome) => {
                info!(%checkout_request_id, ?outcome, "payments: callback processed");
            }
            Err(err) => {
                error!(%checkout_request_id, callback_error = ?err, "payments: callback processing failed");
            }
        }

        CallbackAck::accepted()
    }

    pub async fn process_callback(&self, callback: StkCallback) -> UseCaseResult<CallbackOutcome> {
        let checkout_request_id = callback.checkout_request_id.clone();

        let payment = match self
            .payment_repo
            .find_by_transaction_id(checkout_request_id.clone())
            .await
            .map_err(PaymentError::Internal)?
        {
            Some(payment) => payment,
            None => {
                warn!(%checkout_request_id, "payments: callback for unknown transaction");
                return Ok(CallbackOutcome::UnknownTransaction);
            }
        };

        if !callback.is_success() {
            info!(
                %checkout_request_id,
                result_code = callback.result_code,
                result_desc = ?callback.result_desc,
                "payments: payment failed"
            );

            return Ok(match self.payment_repo.settle_failed(payment.id).await? {
                Some(registration_id) => CallbackOutcome::Failed { registration_id },
                None => CallbackOutcome::AlreadySettled,
            });
        }

        let receipt = callback.receipt_number();

        if let Some(paid) = callback
            .metadata_value("Amount")
            .and_then(|amount| amount.parse::<f64>().ok())
        {
            let expected = minor_to_mpesa_amount(payment.amount_minor) as f64;
            if (paid - expected).abs() > f64::EPSILON {
                warn!(%checkout_request_id, paid, expected, "payments: callback amount mismatch");
            }
        }

        let settlement = match self
            .payment_repo
            .settle_completed(payment.id, receipt.clone(), new_ticket_code())
            .await?
        {
            Some(settlement) => settlement,
            None => {
                info!(%checkout_request_id, "payments: duplicate success callback ignored");
                return Ok(CallbackOutcome::AlreadySettled);
            }
        };

        let registration = settlement.registration;
        if !settlement.tickets_decremented {
            warn!(
                event_id = %registration.event_id,
                registration_id = %registration.id,
                ticket_quantity = registration.ticket_quantity,
                "payments: paid registration exceeds remaining tickets"
            );
        }

        info!(
            registration_id = %registration.id,
            mpesa_receipt = ?receipt,
            "payments: payment completed"
        );

        Ok(CallbackOutcome::Completed {
            registration_id: registration.id,
            tickets_decremented: settlement.tickets_decremented,
        })
    }

    pub async fn registration_status(
        &self,
        user_id: Uuid,
        registration_id: Uuid,
    ) -> UseCaseResult<RegistrationDetailsDto> {
        let row = self
            .registration_repo
            .find_for_user_with_event(user_id, registration_id)
            .await
            .map_err(|err| {
                error!(%user_id, %registration_id, db_error = ?err, "payments: failed to load registration");
                PaymentError::Internal(err)
            })?
            .ok_or(PaymentError::RegistrationNotFound)?;

        let payments = self
            .payment_repo
            .list_for_registrations(vec![registration_id])
            .await
            .map_err(PaymentError::Internal)?;

        attach_payments(vec![row], payments)
            .into_iter()
            .next()
            .ok_or(PaymentError::RegistrationNotFound)
    }

    pub async fn history(&self, user_id: Uuid) -> UseCaseResult<Vec<RegistrationDetailsDto>> {
        let rows = self
            .registration_repo
            .list_for_user_with_events(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "payments: failed to load history");
                PaymentError::Internal(err)
            })?;

        let ids = rows.iter().map(|(registration, _)| registration.id).collect();
        let payments = self
            .payment_repo
            .list_for_registrations(ids)
            .await
            .map_err(PaymentError::Internal)?;

        Ok(attach_payments(rows, payments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crates::{
        domain::{
            entities::{
                events::EventEntity,
                payments::{CompletedSettlement, PaymentEntity},
            },
            repositories::{
                events::MockEventRepository, payments::MockPaymentRepository,
                registrations::MockRegistrationRepository,
            },
        },
        payments::mpesa_client::{CallbackItem, CallbackMetadata},
    };
    use mockall::predicate::{always, eq};

    fn published_event(price_minor: i64, available: i32) -> EventEntity {
        let now = Utc::now();
        EventEntity {
            id: Uuid::parse_str("1a2b3c4d-0000-4000-8000-000000000001").unwrap(),
            title: "Maseru Jazz Night".to_string(),
            description: None,
            location: Some("Maseru".to_string()),
            venue: None,
            event_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            event_time: None,
            category: None,
            ticket_price_minor: price_minor,
            available_tickets: available,
            max_attendees: 100,
            organizer_id: Uuid::new_v4(),
            image_url: None,
            status: "published".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn registration_from(insert: &InsertRegistrationEntity) -> RegistrationEntity {
        RegistrationEntity {
            id: Uuid::new_v4(),
            event_id: insert.event_id,
            user_id: insert.user_id,
            ticket_quantity: insert.ticket_quantity,
            total_amount_minor: insert.total_amount_minor,
            phone_number: insert.phone_number.clone(),
            payment_status: insert.payment_status.clone(),
            mpesa_receipt: None,
            qr_code_data: None,
            created_at: insert.created_at,
            updated_at: insert.updated_at,
        }
    }

    fn pending_registration(id: Uuid, event_id: Uuid, quantity: i32) -> RegistrationEntity {
        let now = Utc::now();
        RegistrationEntity {
            id,
            event_id,
            user_id: Uuid::new_v4(),
            ticket_quantity: quantity,
            total_amount_minor: 0,
            phone_number: "0712345678".to_string(),
            payment_status: "pending".to_string(),
            mpesa_receipt: None,
            qr_code_data: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn payment_from(insert: InsertPaymentEntity) -> PaymentEntity {
        PaymentEntity {
            id: Uuid::new_v4(),
            registration_id: insert.registration_id,
            amount_minor: insert.amount_minor,
            phone_number: insert.phone_number,
            mpesa_transaction_id: insert.mpesa_transaction_id,
            mpesa_receipt: None,
            status: insert.status,
            created_at: insert.created_at,
            updated_at: insert.updated_at,
        }
    }

    fn initiated_payment(registration_id: Uuid, checkout: &str) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id: Uuid::new_v4(),
            registration_id,
            amount_minor: 30_000,
            phone_number: "254712345678".to_string(),
            mpesa_transaction_id: Some(checkout.to_string()),
            mpesa_receipt: None,
            status: "initiated".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn stk_accepted() -> StkPushResponse {
        StkPushResponse {
            merchant_request_id: Some("29115-34620561-1".to_string()),
            checkout_request_id: "ws_CO_0001".to_string(),
            response_code: Some("0".to_string()),
            customer_message: Some("Success. Request accepted for processing".to_string()),
        }
    }

    fn callback(result_code: i64, checkout: &str) -> StkCallback {
        let callback_metadata = (result_code == 0).then(|| CallbackMetadata {
            items: vec![
                CallbackItem {
                    name: "Amount".to_string(),
                    value: Some(serde_json::json!(300)),
                },
                CallbackItem {
                    name: "MpesaReceiptNumber".to_string(),
                    value: Some(serde_json::json!("NLJ7RT61SV")),
                },
            ],
        });

        StkCallback {
            merchant_request_id: None,
            checkout_request_id: checkout.to_string(),
            result_code,
            result_desc: Some("done".to_string()),
            callback_metadata,
        }
    }

    fn initiate_model(event_id: Uuid, quantity: i32) -> InitiatePaymentModel {
        InitiatePaymentModel {
            event_id: Some(event_id),
            ticket_quantity: Some(quantity),
            phone_number: Some("0712 345 678".to_string()),
        }
    }

    #[test]
    fn account_reference_uses_event_id_prefix() {
        let event_id = Uuid::parse_str("1a2b3c4d-0000-4000-8000-000000000001").unwrap();
        assert_eq!(account_reference(event_id), "EVENT-1a2b3c4d");
    }

    #[test]
    fn ticket_codes_are_unique() {
        assert_ne!(new_ticket_code(), new_ticket_code());
    }

    #[tokio::test]
    async fn initiate_creates_registration_with_price_times_quantity() {
        let user_id = Uuid::new_v4();
        let event = published_event(15_000, 10);
        let event_id = event.id;

        let mut event_repo = MockEventRepository::new();
        event_repo
            .expect_find_by_id()
            .with(eq(event_id))
            .returning(move |_| {
                let event = event.clone();
                Box::pin(async move { Ok(Some(event)) })
            });

        let mut registration_repo = MockRegistrationRepository::new();
        registration_repo
            .expect_find_pending()
            .with(eq(user_id), eq(event_id))
            .returning(|_, _| Box::pin(async { Ok(None) }));
        registration_repo.expect_update_pending().never();
        registration_repo
            .expect_create()
            .withf(|insert| {
                insert.ticket_quantity == 2
                    && insert.total_amount_minor == 30_000
                    && insert.payment_status == "pending"
            })
            .times(1)
            .returning(|insert| {
                let registration = registration_from(&insert);
                Box::pin(async move { Ok(registration) })
            });

        let mut gateway = MockMpesaGateway::new();
        gateway
            .expect_initiate_stk_push()
            .withf(|request| {
                request.phone_number == "254712345678"
                    && request.amount == 300
                    && request.account_reference == "EVENT-1a2b3c4d"
                    && request.transaction_desc == "Payment for Maseru Jazz Night"
            })
            .times(1)
            .returning(|_| Ok(stk_accepted()));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_record_payment()
            .withf(|insert| {
                insert.status == "initiated"
                    && insert.amount_minor == 30_000
                    && insert.phone_number == "254712345678"
                    && insert.mpesa_transaction_id.as_deref() == Some("ws_CO_0001")
            })
            .times(1)
            .returning(|insert| {
                let payment = payment_from(insert);
                Box::pin(async move { Ok(payment) })
            });

        let usecase = PaymentUseCase::new(
            Arc::new(event_repo),
            Arc::new(registration_repo),
            Arc::new(payment_repo),
            Arc::new(gateway),
        );

        let result = usecase
            .initiate(user_id, initiate_model(event_id, 2))
            .await
            .unwrap();

        assert_eq!(result.payment.status, PaymentStatus::Initiated);
        assert_eq!(result.mpesa_response.checkout_request_id, "ws_CO_0001");
    }

    #[tokio::test]
    async fn repeated_initiate_updates_the_pending_registration() {
        let user_id = Uuid::new_v4();
        let event = published_event(15_000, 10);
        let event_id = event.id;
        let pending_id = Uuid::new_v4();

        let mut event_repo = MockEventRepository::new();
        event_repo.expect_find_by_id().returning(move |_| {
            let event = event.clone();
            Box::pin(async move { Ok(Some(event)) })
        });

        let mut registration_repo = MockRegistrationRepository::new();
        registration_repo.expect_find_pending().returning(move |_, event_id| {
            let pending = pending_registration(pending_id, event_id, 1);
            Box::pin(async move { Ok(Some(pending)) })
        });
        registration_repo.expect_create().never();
        registration_repo
            .expect_update_pending()
            .withf(move |id, update| {
                *id == pending_id && update.ticket_quantity == 3 && update.total_amount_minor == 45_000
            })
            .times(1)
            .returning(move |id, update| {
                let mut registration = pending_registration(id, event_id, update.ticket_quantity);
                registration.total_amount_minor = update.total_amount_minor;
                Box::pin(async move { Ok(Some(registration)) })
            });

        let mut gateway = MockMpesaGateway::new();
        gateway
            .expect_initiate_stk_push()
            .returning(|_| Ok(stk_accepted()));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_record_payment()
            .withf(move |insert| insert.registration_id == pending_id)
            .returning(|insert| {
                let payment = payment_from(insert);
                Box::pin(async move { Ok(payment) })
            });

        let usecase = PaymentUseCase::new(
            Arc::new(event_repo),
            Arc::new(registration_repo),
            Arc::new(payment_repo),
            Arc::new(gateway),
        );

        let result = usecase
            .initiate(user_id, initiate_model(event_id, 3))
            .await
            .unwrap();

        assert_eq!(result.payment.registration_id, pending_id);
    }

    #[tokio::test]
    async fn registration_paid_between_lookup_and_update_gets_a_new_registration() {
        let user_id = Uuid::new_v4();
        let event = published_event(15_000, 10);
        let event_id = event.id;
        let settled_id = Uuid::new_v4();

        let mut event_repo = MockEventRepository::new();
        event_repo.expect_find_by_id().returning(move |_| {
            let event = event.clone();
            Box::pin(async move { Ok(Some(event)) })
        });

        let mut registration_repo = MockRegistrationRepository::new();
        registration_repo.expect_find_pending().returning(move |_, event_id| {
            let pending = pending_registration(settled_id, event_id, 1);
            Box::pin(async move { Ok(Some(pending)) })
        });
        registration_repo
            .expect_update_pending()
            .with(eq(settled_id), always())
            .times(1)
            .returning(|_, _| Box::pin(async { Ok(None) }));
        registration_repo
            .expect_create()
            .withf(move |insert| {
                insert.user_id == user_id
                    && insert.ticket_quantity == 2
                    && insert.total_amount_minor == 30_000
                    && insert.payment_status == "pending"
            })
            .times(1)
            .returning(|insert| {
                let registration = registration_from(&insert);
                Box::pin(async move { Ok(registration) })
            });

        let mut gateway = MockMpesaGateway::new();
        gateway
            .expect_initiate_stk_push()
            .returning(|_| Ok(stk_accepted()));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_record_payment()
            .withf(move |insert| insert.registration_id != settled_id)
            .times(1)
            .returning(|insert| {
                let payment = payment_from(insert);
                Box::pin(async move { Ok(payment) })
            });

        let usecase = PaymentUseCase::new(
            Arc::new(event_repo),
            Arc::new(registration_repo),
            Arc::new(payment_repo),
            Arc::new(gateway),
        );

        let result = usecase
            .initiate(user_id, initiate_model(event_id, 2))
            .await
            .unwrap();

        assert_ne!(result.payment.registration_id, settled_id);
        assert_eq!(result.payment.amount_minor, 30_000);
    }

    #[tokio::test]
    async fn initiate_rejects_more_tickets_than_available() {
        let event = published_event(15_000, 2);
        let event_id = event.id;

        let mut event_repo = MockEventRepository::new();
        event_repo.expect_find_by_id().returning(move |_| {
            let event = event.clone();
            Box::pin(async move { Ok(Some(event)) })
        });

        let mut registration_repo = MockRegistrationRepository::new();
        registration_repo.expect_create().never();
        let mut gateway = MockMpesaGateway::new();
        gateway.expect_initiate_stk_push().never();

        let usecase = PaymentUseCase::new(
            Arc::new(event_repo),
            Arc::new(registration_repo),
            Arc::new(MockPaymentRepository::new()),
            Arc::new(gateway),
        );

        let err = usecase
            .initiate(Uuid::new_v4(), initiate_model(event_id, 3))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Only 2 tickets available");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn initiate_requires_all_fields_and_published_event() {
        let mut event = published_event(15_000, 10);
        event.status = "draft".to_string();
        let event_id = event.id;

        let mut event_repo = MockEventRepository::new();
        event_repo.expect_find_by_id().returning(move |_| {
            let event = event.clone();
            Box::pin(async move { Ok(Some(event)) })
        });

        let usecase = PaymentUseCase::new(
            Arc::new(event_repo),
            Arc::new(MockRegistrationRepository::new()),
            Arc::new(MockPaymentRepository::new()),
            Arc::new(MockMpesaGateway::new()),
        );

        let err = usecase
            .initiate(
                Uuid::new_v4(),
                InitiatePaymentModel {
                    event_id: Some(event_id),
                    ticket_quantity: None,
                    phone_number: Some("0712345678".to_string()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::MissingFields));

        let err = usecase
            .initiate(Uuid::new_v4(), initiate_model(event_id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::EventNotOpen));
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_vendor_detail_and_records_nothing() {
        let event = published_event(15_000, 10);
        let event_id = event.id;

        let mut event_repo = MockEventRepository::new();
        event_repo.expect_find_by_id().returning(move |_| {
            let event = event.clone();
            Box::pin(async move { Ok(Some(event)) })
        });

        let mut registration_repo = MockRegistrationRepository::new();
        registration_repo
            .expect_find_pending()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        registration_repo.expect_create().returning(|insert| {
            let registration = registration_from(&insert);
            Box::pin(async move { Ok(registration) })
        });

        let mut gateway = MockMpesaGateway::new();
        gateway
            .expect_initiate_stk_push()
            .returning(|_| Err(anyhow::anyhow!("Invalid Access Token")));

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_record_payment().never();

        let usecase = PaymentUseCase::new(
            Arc::new(event_repo),
            Arc::new(registration_repo),
            Arc::new(payment_repo),
            Arc::new(gateway),
        );

        let err = usecase
            .initiate(Uuid::new_v4(), initiate_model(event_id, 1))
            .await
            .unwrap_err();

        assert!(matches!(&err, PaymentError::Gateway(detail) if detail == "Invalid Access Token"));
        match AppError::from(err) {
            AppError::BadRequest { message, error } => {
                assert_eq!(message, "Failed to initiate M-Pesa payment");
                assert_eq!(error, Some(serde_json::json!("Invalid Access Token")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn paid_settlement(registration_id: Uuid, event_id: Uuid, qr: String) -> CompletedSettlement {
        let mut registration = pending_registration(registration_id, event_id, 2);
        registration.payment_status = "paid".to_string();
        registration.mpesa_receipt = Some("NLJ7RT61SV".to_string());
        registration.qr_code_data = Some(qr);
        CompletedSettlement {
            registration,
            tickets_decremented: true,
        }
    }

    #[tokio::test]
    async fn success_callback_settles_payment_registration_and_tickets() {
        let registration_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        let payment = initiated_payment(registration_id, "ws_CO_0001");
        let payment_id = payment.id;

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_transaction_id()
            .with(eq("ws_CO_0001".to_string()))
            .returning(move |_| {
                let payment = payment.clone();
                Box::pin(async move { Ok(Some(payment)) })
            });
        payment_repo
            .expect_settle_completed()
            .with(eq(payment_id), eq(Some("NLJ7RT61SV".to_string())), always())
            .times(1)
            .returning(move |_, _, qr| {
                let settlement = paid_settlement(registration_id, event_id, qr);
                Box::pin(async move { Ok(Some(settlement)) })
            });
        payment_repo.expect_settle_failed().never();

        let usecase = PaymentUseCase::new(
            Arc::new(MockEventRepository::new()),
            Arc::new(MockRegistrationRepository::new()),
            Arc::new(payment_repo),
            Arc::new(MockMpesaGateway::new()),
        );

        let outcome = usecase
            .process_callback(callback(0, "ws_CO_0001"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Completed {
                registration_id,
                tickets_decremented: true,
            }
        );
    }

    #[tokio::test]
    async fn duplicate_success_callback_is_ignored() {
        let payment = initiated_payment(Uuid::new_v4(), "ws_CO_0001");

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_transaction_id().returning(move |_| {
            let payment = payment.clone();
            Box::pin(async move { Ok(Some(payment)) })
        });
        payment_repo
            .expect_settle_completed()
            .times(1)
            .returning(|_, _, _| Box::pin(async { Ok(None) }));

        let usecase = PaymentUseCase::new(
            Arc::new(MockEventRepository::new()),
            Arc::new(MockRegistrationRepository::new()),
            Arc::new(payment_repo),
            Arc::new(MockMpesaGateway::new()),
        );

        let outcome = usecase
            .process_callback(callback(0, "ws_CO_0001"))
            .await
            .unwrap();

        assert_eq!(outcome, CallbackOutcome::AlreadySettled);
    }

    #[tokio::test]
    async fn redelivery_after_failed_settlement_completes_the_payment() {
        let registration_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        let payment = initiated_payment(registration_id, "ws_CO_0004");

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_transaction_id().returning(move |_| {
            let payment = payment.clone();
            Box::pin(async move { Ok(Some(payment)) })
        });

        // The first settlement rolls back, leaving the payment `initiated` for the retry.
        let mut seq = mockall::Sequence::new();
        payment_repo
            .expect_settle_completed()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Box::pin(async { Err(anyhow::anyhow!("connection reset")) }));
        payment_repo
            .expect_settle_completed()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _, qr| {
                let settlement = paid_settlement(registration_id, event_id, qr);
                Box::pin(async move { Ok(Some(settlement)) })
            });

        let usecase = PaymentUseCase::new(
            Arc::new(MockEventRepository::new()),
            Arc::new(MockRegistrationRepository::new()),
            Arc::new(payment_repo),
            Arc::new(MockMpesaGateway::new()),
        );

        assert!(usecase.process_callback(callback(0, "ws_CO_0004")).await.is_err());

        let outcome = usecase
            .process_callback(callback(0, "ws_CO_0004"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Completed {
                registration_id,
                tickets_decremented: true,
            }
        );
    }

    #[tokio::test]
    async fn oversold_settlement_is_reported() {
        let registration_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        let payment = initiated_payment(registration_id, "ws_CO_0005");

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_transaction_id().returning(move |_| {
            let payment = payment.clone();
            Box::pin(async move { Ok(Some(payment)) })
        });
        payment_repo
            .expect_settle_completed()
            .returning(move |_, _, qr| {
                let mut settlement = paid_settlement(registration_id, event_id, qr);
                settlement.tickets_decremented = false;
                Box::pin(async move { Ok(Some(settlement)) })
            });

        let usecase = PaymentUseCase::new(
            Arc::new(MockEventRepository::new()),
            Arc::new(MockRegistrationRepository::new()),
            Arc::new(payment_repo),
            Arc::new(MockMpesaGateway::new()),
        );

        let outcome = usecase
            .process_callback(callback(0, "ws_CO_0005"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            CallbackOutcome::Completed {
                registration_id,
                tickets_decremented: false,
            }
        );
    }

    #[tokio::test]
    async fn failed_callback_never_decrements_tickets() {
        let registration_id = Uuid::new_v4();
        let payment = initiated_payment(registration_id, "ws_CO_0002");
        let payment_id = payment.id;

        let mut payment_repo = MockPaymentRepository::new();
        payment_repo.expect_find_by_transaction_id().returning(move |_| {
            let payment = payment.clone();
            Box::pin(async move { Ok(Some(payment)) })
        });
        payment_repo
            .expect_settle_failed()
            .with(eq(payment_id))
            .times(1)
            .returning(move |_| Box::pin(async move { Ok(Some(registration_id)) }));
        payment_repo.expect_settle_completed().never();

        let usecase = PaymentUseCase::new(
            Arc::new(MockEventRepository::new()),
            Arc::new(MockRegistrationRepository::new()),
            Arc::new(payment_repo),
            Arc::new(MockMpesaGateway::new()),
        );

        let outcome = usecase
            .process_callback(callback(1032, "ws_CO_0002"))
            .await
            .unwrap();

        assert_eq!(outcome, CallbackOutcome::Failed { registration_id });
    }

    #[tokio::test]
    async fn malformed_and_unknown_callbacks_are_still_acknowledged() {
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_transaction_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        payment_repo.expect_settle_completed().never();

        let usecase = PaymentUseCase::new(
            Arc::new(MockEventRepository::new()),
            Arc::new(MockRegistrationRepository::new()),
            Arc::new(payment_repo),
            Arc::new(MockMpesaGateway::new()),
        );

        assert_eq!(usecase.handle_callback(b"not json").await, CallbackAck::accepted());

        let unknown = serde_json::json!({
            "Body": { "stkCallback": {
                "CheckoutRequestID": "ws_CO_missing",
                "ResultCode": 0,
                "ResultDesc": "ok"
            }}
        });
        let ack = usecase
            .handle_callback(unknown.to_string().as_bytes())
            .await;
        assert_eq!(ack, CallbackAck::accepted());
    }

    #[tokio::test]
    async fn callback_errors_are_acknowledged() {
        let mut payment_repo = MockPaymentRepository::new();
        payment_repo
            .expect_find_by_transaction_id()
            .returning(|_| Box::pin(async { Err(anyhow::anyhow!("pool exhausted")) }));

        let usecase = PaymentUseCase::new(
            Arc::new(MockEventRepository::new()),
            Arc::new(MockRegistrationRepository::new()),
            Arc::new(payment_repo),
            Arc::new(MockMpesaGateway::new()),
        );

        let payload = serde_json::json!({
            "Body": { "stkCallback": {
                "CheckoutRequestID": "ws_CO_0003",
                "ResultCode": 1,
                "ResultDesc": "insufficient balance"
            }}
        });

        let ack = usecase.handle_callback(payload.to_string().as_bytes()).await;
        assert_eq!(ack.result_code, 0);
        assert_eq!(ack.result_desc, "Success");
    }

    #[tokio::test]
    async fn status_is_scoped_to_the_caller() {
        let mut registration_repo = MockRegistrationRepository::new();
        registration_repo
            .expect_find_for_user_with_event()
            .returning(|_, _| Box::pin(async { Ok(None) }));

        let usecase = PaymentUseCase::new(
            Arc::new(MockEventRepository::new()),
            Arc::new(registration_repo),
            Arc::new(MockPaymentRepository::new()),
            Arc::new(MockMpesaGateway::new()),
        );

        let err = usecase
            .registration_status(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
