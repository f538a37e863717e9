use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{PgConnection, delete, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{event_reviews, users},
    },
};
use domain::{
    entities::{
        event_reviews::{EventReviewEntity, InsertEventReviewEntity},
        users::UserSummaryEntity,
    },
    repositories::event_reviews::EventReviewRepository,
};

pub struct EventReviewPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl EventReviewPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }

    fn load_reviewer(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<UserSummaryEntity> {
        users::table
            .filter(users::id.eq(user_id))
            .select(UserSummaryEntity::as_select())
            .first::<UserSummaryEntity>(conn)
    }
}

#[async_trait]
impl EventReviewRepository for EventReviewPostgres {
    async fn list_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<(EventReviewEntity, UserSummaryEntity)>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = event_reviews::table
            .inner_join(users::table.on(event_reviews::user_id.eq(users::id)))
            .filter(event_reviews::event_id.eq(event_id))
            .select((EventReviewEntity::as_select(), UserSummaryEntity::as_select()))
            .order(event_reviews::created_at.desc())
            .load::<(EventReviewEntity, UserSummaryEntity)>(&mut conn)?;

        Ok(results)
    }

    async fn find_by_user_and_event(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> Result<Option<EventReviewEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = event_reviews::table
            .filter(event_reviews::user_id.eq(user_id))
            .filter(event_reviews::event_id.eq(event_id))
            .select(EventReviewEntity::as_select())
            .first::<EventReviewEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn create(
        &self,
        insert_review_entity: InsertEventReviewEntity,
    ) -> Result<(EventReviewEntity, UserSummaryEntity)> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|tx| {
            let review = insert_into(event_reviews::table)
                .values(&insert_review_entity)
                .returning(EventReviewEntity::as_returning())
                .get_result::<EventReviewEntity>(tx)?;
            let reviewer = Self::load_reviewer(tx, review.user_id)?;
            Ok((review, reviewer))
        })?;

        Ok(result)
    }

    async fn update(
        &self,
        review_id: Uuid,
        rating: i16,
        comment: Option<String>,
    ) -> Result<(EventReviewEntity, UserSummaryEntity)> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = conn.transaction::<_, diesel::result::Error, _>(|tx| {
            let review = update(event_reviews::table.find(review_id))
                .set((
                    event_reviews::rating.eq(rating),
                    event_reviews::comment.eq(comment),
                    event_reviews::updated_at.eq(Utc::now()),
                ))
                .returning(EventReviewEntity::as_returning())
                .get_result::<EventReviewEntity>(tx)?;
            let reviewer = Self::load_reviewer(tx, review.user_id)?;
            Ok((review, reviewer))
        })?;

        Ok(result)
    }

    async fn delete_own(&self, review_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = delete(
            event_reviews::table
                .filter(event_reviews::id.eq(review_id))
                .filter(event_reviews::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;

        Ok(affected > 0)
    }
}
