use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::payments::{CompletedSettlement, InsertPaymentEntity, PaymentEntity};

#[async_trait]
#[automock]
pub trait PaymentRepository {
    async fn record_payment(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity>;
    async fn find_by_transaction_id(
        &self,
        mpesa_transaction_id: String,
    ) -> Result<Option<PaymentEntity>>;
    /// In one transaction: moves an `initiated` payment to `completed`, marks its registration
    /// `paid` with the receipt and QR payload, and takes the tickets from the event when enough
    /// remain. `None` when the payment was already settled.
    async fn settle_completed(
        &self,
        payment_id: Uuid,
        mpesa_receipt: Option<String>,
        qr_code_data: String,
    ) -> Result<Option<CompletedSettlement>>;
    /// In one transaction: moves an `initiated` payment to `failed` and a still-pending
    /// registration with it. Returns the registration id, or `None` when already settled.
    async fn settle_failed(&self, payment_id: Uuid) -> Result<Option<Uuid>>;
    async fn list_for_registrations(
        &self,
        registration_ids: Vec<Uuid>,
    ) -> Result<Vec<PaymentEntity>>;
}
