use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{
    events::EventEntity,
    registrations::{
        InsertRegistrationEntity, RegistrationEntity, UpdatePendingRegistrationEntity,
    },
    users::UserSummaryEntity,
};

#[async_trait]
#[automock]
pub trait RegistrationRepository {
    async fn find_by_id(&self, registration_id: Uuid) -> Result<Option<RegistrationEntity>>;
    async fn find_pending(&self, user_id: Uuid, event_id: Uuid)
    -> Result<Option<RegistrationEntity>>;
    async fn create(
        &self,
        insert_registration_entity: InsertRegistrationEntity,
    ) -> Result<RegistrationEntity>;
    /// Updates the registration only while it is still `pending`.
    async fn update_pending(
        &self,
        registration_id: Uuid,
        update_entity: UpdatePendingRegistrationEntity,
    ) -> Result<Option<RegistrationEntity>>;
    async fn has_paid_registration(&self, user_id: Uuid, event_id: Uuid) -> Result<bool>;
    async fn find_for_user_with_event(
        &self,
        user_id: Uuid,
        registration_id: Uuid,
    ) -> Result<Option<(RegistrationEntity, EventEntity)>>;
    async fn list_for_user_with_events(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(RegistrationEntity, EventEntity)>>;
    async fn list_for_organizer(
        &self,
        organizer_id: Uuid,
    ) -> Result<Vec<(RegistrationEntity, EventEntity, UserSummaryEntity)>>;
    /// Paid registration of `event_id` whose id or QR payload equals `qr_data`.
    async fn find_paid_ticket(
        &self,
        event_id: Uuid,
        qr_data: String,
    ) -> Result<Option<(RegistrationEntity, UserSummaryEntity)>>;
}
