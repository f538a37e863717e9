use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{events::EventRepository, registrations::RegistrationRepository},
        value_objects::events::{
            CreateEventModel, ListEventsQuery, UpdateEventModel, VerifyTicketModel,
        },
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{events::EventPostgres, registrations::RegistrationPostgres},
    },
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::{api_response::ApiResponse, error_responses::AppError},
    usecases::events::EventUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let event_repository = EventPostgres::new(Arc::clone(&db_pool));
    let registration_repository = RegistrationPostgres::new(Arc::clone(&db_pool));
    let event_usecase =
        EventUseCase::new(Arc::new(event_repository), Arc::new(registration_repository));

    Router::new()
        .route(
            "/",
            get(list::<EventPostgres, RegistrationPostgres>)
                .post(create::<EventPostgres, RegistrationPostgres>),
        )
        .route(
            "/user/my-events",
            get(my_events::<EventPostgres, RegistrationPostgres>),
        )
        .route(
            "/:id",
            get(get_event::<EventPostgres, RegistrationPostgres>)
                .put(update::<EventPostgres, RegistrationPostgres>),
        )
        .route(
            "/:id/verify-ticket",
            post(verify_ticket::<EventPostgres, RegistrationPostgres>),
        )
        .with_state(Arc::new(event_usecase))
}

pub async fn list<E, R>(
    State(event_usecase): State<Arc<EventUseCase<E, R>>>,
    Query(query): Query<ListEventsQuery>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    match event_usecase.list(query).await {
        Ok(events) => ApiResponse::data(events).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn get_event<E, R>(
    State(event_usecase): State<Arc<EventUseCase<E, R>>>,
    Path(event_id): Path<Uuid>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    match event_usecase.get(event_id).await {
        Ok(event) => ApiResponse::data(json!({ "event": event })).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn create<E, R>(
    State(event_usecase): State<Arc<EventUseCase<E, R>>>,
    auth: AuthUser,
    Json(create_event_model): Json<CreateEventModel>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    match event_usecase
        .create(auth.user_id, auth.role, create_event_model)
        .await
    {
        Ok(event) => {
            ApiResponse::with_message("Event created successfully", json!({ "event": event }))
                .into_response_with(StatusCode::CREATED)
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn update<E, R>(
    State(event_usecase): State<Arc<EventUseCase<E, R>>>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(update_event_model): Json<UpdateEventModel>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    match event_usecase
        .update(auth.user_id, auth.role, event_id, update_event_model)
        .await
    {
        Ok(event) => {
            ApiResponse::with_message("Event updated successfully", json!({ "event": event }))
                .into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn my_events<E, R>(
    State(event_usecase): State<Arc<EventUseCase<E, R>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    match event_usecase.my_events(auth.user_id, auth.role).await {
        Ok(events) => ApiResponse::data(json!({ "events": events })).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn verify_ticket<E, R>(
    State(event_usecase): State<Arc<EventUseCase<E, R>>>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
    Json(verify_ticket_model): Json<VerifyTicketModel>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
{
    match event_usecase
        .verify_ticket(auth.user_id, auth.role, event_id, verify_ticket_model.qr_data)
        .await
    {
        Ok(registration) => ApiResponse::with_message(
            "Ticket verified",
            json!({ "registration": registration }),
        )
        .into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
