use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{
        events::{EventEntity, InsertEventEntity, UpdateEventEntity},
        users::UserSummaryEntity,
    },
    value_objects::events::ListEventsFilter,
};

#[async_trait]
#[automock]
pub trait EventRepository {
    /// Returns the requested page together with the total number of matches.
    async fn list(
        &self,
        filter: ListEventsFilter,
    ) -> Result<(Vec<(EventEntity, UserSummaryEntity)>, i64)>;
    async fn find_by_id(&self, event_id: Uuid) -> Result<Option<EventEntity>>;
    async fn find_with_organizer(
        &self,
        event_id: Uuid,
    ) -> Result<Option<(EventEntity, UserSummaryEntity)>>;
    async fn create(&self, insert_event_entity: InsertEventEntity) -> Result<EventEntity>;
    /// Applies the changeset and, when `max_attendees` is given, moves the cap and
    /// `available_tickets` by the same delta. Returns `None` when the new cap is below the
    /// tickets already sold.
    async fn update(
        &self,
        event_id: Uuid,
        update_event_entity: UpdateEventEntity,
        max_attendees: Option<i32>,
    ) -> Result<Option<EventEntity>>;
    async fn list_by_organizer(&self, organizer_id: Uuid) -> Result<Vec<EventEntity>>;
    async fn count_registrations(&self, event_ids: Vec<Uuid>) -> Result<HashMap<Uuid, i64>>;
}
