use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use crates::{
    domain::{
        repositories::{
            event_reviews::EventReviewRepository, registrations::RegistrationRepository,
        },
        value_objects::event_reviews::UpsertReviewModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{event_reviews::EventReviewPostgres, registrations::RegistrationPostgres},
    },
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::{api_response::ApiResponse, error_responses::AppError},
    usecases::reviews::{ReviewUseCase, UpsertKind},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let review_repository = EventReviewPostgres::new(Arc::clone(&db_pool));
    let registration_repository = RegistrationPostgres::new(Arc::clone(&db_pool));
    let review_usecase =
        ReviewUseCase::new(Arc::new(review_repository), Arc::new(registration_repository));

    Router::new()
        .route(
            "/event/:event_id",
            get(list_for_event::<EventReviewPostgres, RegistrationPostgres>),
        )
        .route("/", post(upsert::<EventReviewPostgres, RegistrationPostgres>))
        .route(
            "/:id",
            delete(delete_review::<EventReviewPostgres, RegistrationPostgres>),
        )
        .with_state(Arc::new(review_usecase))
}

pub async fn list_for_event<V, R>(
    State(review_usecase): State<Arc<ReviewUseCase<V, R>>>,
    Path(event_id): Path<Uuid>,
) -> impl IntoResponse
where
    V: EventReviewRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    match review_usecase.list_for_event(event_id).await {
        Ok(reviews) => ApiResponse::data(reviews).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn upsert<V, R>(
    State(review_usecase): State<Arc<ReviewUseCase<V, R>>>,
    auth: AuthUser,
    Json(upsert_review_model): Json<UpsertReviewModel>,
) -> impl IntoResponse
where
    V: EventReviewRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    match review_usecase.upsert(auth.user_id, upsert_review_model).await {
        Ok((review, kind)) => {
            let status = match kind {
                UpsertKind::Created => StatusCode::CREATED,
                UpsertKind::Updated => StatusCode::OK,
            };
            ApiResponse::with_message(kind.message(), json!({ "review": review }))
                .into_response_with(status)
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn delete_review<V, R>(
    State(review_usecase): State<Arc<ReviewUseCase<V, R>>>,
    auth: AuthUser,
    Path(review_id): Path<Uuid>,
) -> impl IntoResponse
where
    V: EventReviewRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    match review_usecase.delete(auth.user_id, review_id).await {
        Ok(()) => ApiResponse::message("Review deleted successfully").into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
