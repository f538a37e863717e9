use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{
    event_reviews::{EventReviewEntity, InsertEventReviewEntity},
    users::UserSummaryEntity,
};

#[async_trait]
#[automock]
pub trait EventReviewRepository {
    async fn list_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<(EventReviewEntity, UserSummaryEntity)>>;
    async fn find_by_user_and_event(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<EventReviewEntity>>;
    async fn create(
        &self,
        insert_review_entity: InsertEventReviewEntity,
    ) -> Result<(EventReviewEntity, UserSummaryEntity)>;
    async fn update(
        &self,
        review_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> Result<(EventReviewEntity, UserSummaryEntity)>;
    /// Deletes the review only when it belongs to `user_id`. Returns whether a row was removed.
    async fn delete_own(&self, review_id: Uuid, user_id: Uuid) -> Result<bool>;
}
