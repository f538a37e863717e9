use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use crates::domain::{
    entities::event_reviews::InsertEventReviewEntity,
    repositories::{event_reviews::EventReviewRepository, registrations::RegistrationRepository},
    value_objects::event_reviews::{
        EventReviewsDto, MAX_RATING, MIN_RATING, ReviewDto, UpsertReviewModel,
    },
};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("You can only review events you have attended")]
    NotAttended,
    #[error("Rating must be between {} and {}", MIN_RATING, MAX_RATING)]
    InvalidRating,
    #[error("Review not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ReviewError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReviewError::NotAttended | ReviewError::InvalidRating => StatusCode::BAD_REQUEST,
            ReviewError::NotFound => StatusCode::NOT_FOUND,
            ReviewError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ReviewError> for AppError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Internal(e) => AppError::Internal(e),
            ReviewError::NotFound => AppError::NotFound(err.to_string()),
            other => AppError::bad_request(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, ReviewError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Created,
    Updated,
}

impl UpsertKind {
    pub fn message(&self) -> &'static str {
        match self {
            UpsertKind::Created => "Review submitted",
            UpsertKind::Updated => "Review updated",
        }
    }
}

pub struct ReviewUseCase<V, R>
where
    V: EventReviewRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    review_repo: Arc<V>,
    registration_repo: Arc<R>,
}

impl<V, R> ReviewUseCase<V, R>
where
    V: EventReviewRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    pub fn new(review_repo: Arc<V>, registration_repo: Arc<R>) -> Self {
        Self {
            review_repo,
            registration_repo,
        }
    }

    pub async fn list_for_event(&self, event_id: Uuid) -> UseCaseResult<EventReviewsDto> {
        let rows = self
            .review_repo
            .list_for_event(event_id)
            .await
            .map_err(|err| {
                error!(%event_id, db_error = ?err, "reviews: failed to list reviews");
                ReviewError::Internal(err)
            })?;

        Ok(EventReviewsDto::new(
            rows.into_iter()
                .map(|(review, reviewer)| ReviewDto::from_entities(review, reviewer))
                .collect(),
        ))
    }

    pub async fn upsert(
        &self,
        user_id: Uuid,
        model: UpsertReviewModel,
    ) -> UseCaseResult<(ReviewDto, UpsertKind)> {
        if !(MIN_RATING..=MAX_RATING).contains(&model.rating) {
            return Err(ReviewError::InvalidRating);
        }

        let event_id = model.event_id;
        let attended = self
            .registration_repo
            .has_paid_registration(user_id, event_id)
            .await
            .map_err(|err| {
                error!(%user_id, %event_id, db_error = ?err, "reviews: failed to check attendance");
                ReviewError::Internal(err)
            })?;
        if !attended {
            return Err(ReviewError::NotAttended);
        }

        let comment = model
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        let existing = self
            .review_repo
            .find_by_user_and_event(user_id, event_id)
            .await
            .map_err(ReviewError::Internal)?;

        let (kind, saved) = match existing {
            Some(review) => (
                UpsertKind::Updated,
                self.review_repo
                    .update(review.id, model.rating, comment)
                    .await,
            ),
            None => {
                let now = Utc::now();
                (
                    UpsertKind::Created,
                    self.review_repo
                        .create(InsertEventReviewEntity {
                            event_id,
                            user_id,
                            rating: model.rating,
                            comment,
                            created_at: now,
                            updated_at: now,
                        })
                        .await,
                )
            }
        };

        let (review, reviewer) = saved.map_err(|err| {
            error!(%user_id, %event_id, db_error = ?err, "reviews: failed to save review");
            ReviewError::Internal(err)
        })?;

        info!(%user_id, %event_id, rating = review.rating, ?kind, "reviews: review saved");
        Ok((ReviewDto::from_entities(review, reviewer), kind))
    }

    pub async fn delete(&self, user_id: Uuid, review_id: Uuid) -> UseCaseResult<()> {
        let deleted = self
            .review_repo
            .delete_own(review_id, user_id)
            .await
            .map_err(|err| {
                error!(%user_id, %review_id, db_error = ?err, "reviews: failed to delete review");
                ReviewError::Internal(err)
            })?;

        if !deleted {
            return Err(ReviewError::NotFound);
        }

        info!(%user_id, %review_id, "reviews: review deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::{
        entities::{event_reviews::EventReviewEntity, users::UserSummaryEntity},
        repositories::{
            event_reviews::MockEventReviewRepository, registrations::MockRegistrationRepository,
        },
    };
    use mockall::predicate::eq;

    fn reviewer(id: Uuid) -> UserSummaryEntity {
        UserSummaryEntity {
            id,
            full_name: Some("Lerato".to_string()),
            email: "lerato@example.com".to_string(),
            phone_number: None,
            created_at: Utc::now(),
        }
    }

    fn review(event_id: Uuid, user_id: Uuid, rating: i16) -> EventReviewEntity {
        let now = Utc::now();
        EventReviewEntity {
            id: Uuid::new_v4(),
            event_id,
            user_id,
            rating,
            comment: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn model(event_id: Uuid, rating: i16) -> UpsertReviewModel {
        UpsertReviewModel {
            event_id,
            rating,
            comment: Some("  Great show ".to_string()),
        }
    }

    #[tokio::test]
    async fn list_reports_rounded_average() {
        let event_id = Uuid::new_v4();
        let mut review_repo = MockEventReviewRepository::new();
        review_repo
            .expect_list_for_event()
            .with(eq(event_id))
            .returning(move |event_id| {
                let rows: Vec<_> = [5, 4, 4]
                    .into_iter()
                    .map(|rating| {
                        let user_id = Uuid::new_v4();
                        (review(event_id, user_id, rating), reviewer(user_id))
                    })
                    .collect();
                Box::pin(async move { Ok(rows) })
            });

        let usecase = ReviewUseCase::new(
            Arc::new(review_repo),
            Arc::new(MockRegistrationRepository::new()),
        );

        let dto = usecase.list_for_event(event_id).await.unwrap();
        assert_eq!(dto.total_reviews, 3);
        assert_eq!(dto.average_rating, 4.3);
        assert_eq!(dto.reviews[0].user.full_name.as_deref(), Some("Lerato"));
    }

    #[tokio::test]
    async fn only_paid_attendees_can_review() {
        let mut registration_repo = MockRegistrationRepository::new();
        registration_repo
            .expect_has_paid_registration()
            .returning(|_, _| Box::pin(async { Ok(false) }));

        let mut review_repo = MockEventReviewRepository::new();
        review_repo.expect_create().never();

        let usecase = ReviewUseCase::new(Arc::new(review_repo), Arc::new(registration_repo));
        let err = usecase
            .upsert(Uuid::new_v4(), model(Uuid::new_v4(), 5))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "You can only review events you have attended");
    }

    #[tokio::test]
    async fn rating_outside_range_is_rejected() {
        let usecase = ReviewUseCase::new(
            Arc::new(MockEventReviewRepository::new()),
            Arc::new(MockRegistrationRepository::new()),
        );

        for rating in [0, 6] {
            let err = usecase
                .upsert(Uuid::new_v4(), model(Uuid::new_v4(), rating))
                .await
                .unwrap_err();
            assert!(matches!(err, ReviewError::InvalidRating));
        }
    }

    #[tokio::test]
    async fn second_review_updates_the_first() {
        let user_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();
        let existing = review(event_id, user_id, 3);
        let existing_id = existing.id;

        let mut registration_repo = MockRegistrationRepository::new();
        registration_repo
            .expect_has_paid_registration()
            .with(eq(user_id), eq(event_id))
            .returning(|_, _| Box::pin(async { Ok(true) }));

        let mut review_repo = MockEventReviewRepository::new();
        review_repo
            .expect_find_by_user_and_event()
            .returning(move |_, _| {
                let existing = existing.clone();
                Box::pin(async move { Ok(Some(existing)) })
            });
        review_repo.expect_create().never();
        review_repo
            .expect_update()
            .with(eq(existing_id), eq(5), eq(Some("Great show".to_string())))
            .times(1)
            .returning(move |id, rating, comment| {
                let mut updated = review(event_id, user_id, rating);
                updated.id = id;
                updated.comment = comment;
                let reviewer = reviewer(user_id);
                Box::pin(async move { Ok((updated, reviewer)) })
            });

        let usecase = ReviewUseCase::new(Arc::new(review_repo), Arc::new(registration_repo));
        let (dto, kind) = usecase.upsert(user_id, model(event_id, 5)).await.unwrap();

        assert_eq!(kind, UpsertKind::Updated);
        assert_eq!(kind.message(), "Review updated");
        assert_eq!(dto.id, existing_id);
        assert_eq!(dto.rating, 5);
    }

    #[tokio::test]
    async fn first_review_is_created() {
        let user_id = Uuid::new_v4();
        let event_id = Uuid::new_v4();

        let mut registration_repo = MockRegistrationRepository::new();
        registration_repo
            .expect_has_paid_registration()
            .returning(|_, _| Box::pin(async { Ok(true) }));

        let mut review_repo = MockEventReviewRepository::new();
        review_repo
            .expect_find_by_user_and_event()
            .returning(|_, _| Box::pin(async { Ok(None) }));
        review_repo
            .expect_create()
            .withf(move |insert| insert.user_id == user_id && insert.rating == 4)
            .times(1)
            .returning(move |insert| {
                let created = review(insert.event_id, insert.user_id, insert.rating);
                let reviewer = reviewer(user_id);
                Box::pin(async move { Ok((created, reviewer)) })
            });

        let usecase = ReviewUseCase::new(Arc::new(review_repo), Arc::new(registration_repo));
        let (_, kind) = usecase.upsert(user_id, model(event_id, 4)).await.unwrap();

        assert_eq!(kind.message(), "Review submitted");
    }

    #[tokio::test]
    async fn deleting_someone_elses_review_is_not_found() {
        let mut review_repo = MockEventReviewRepository::new();
        review_repo
            .expect_delete_own()
            .returning(|_, _| Box::pin(async { Ok(false) }));

        let usecase = ReviewUseCase::new(
            Arc::new(review_repo),
            Arc::new(MockRegistrationRepository::new()),
        );

        let err = usecase
            .delete(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
