use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::{
            events::EventRepository, payments::PaymentRepository,
            registrations::RegistrationRepository,
        },
        value_objects::payments::InitiatePaymentModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            events::EventPostgres, payments::PaymentPostgres,
            registrations::RegistrationPostgres,
        },
    },
    payments::mpesa_client::MpesaClient,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    axum_http::{api_response::ApiResponse, error_responses::AppError},
    usecases::payments::{MpesaGateway, PaymentUseCase},
};

type PaymentState<E, R, P, G> = State<Arc<PaymentUseCase<E, R, P, G>>>;

pub fn routes(db_pool: Arc<PgPoolSquad>, mpesa_client: Arc<MpesaClient>) -> Router {
    let event_repository = EventPostgres::new(Arc::clone(&db_pool));
    let registration_repository = RegistrationPostgres::new(Arc::clone(&db_pool));
    let payment_repository = PaymentPostgres::new(Arc::clone(&db_pool));
    let payment_usecase = PaymentUseCase::new(
        Arc::new(event_repository),
        Arc::new(registration_repository),
        Arc::new(payment_repository),
        mpesa_client,
    );

    Router::new()
        .route(
            "/initiate",
            post(initiate::<EventPostgres, RegistrationPostgres, PaymentPostgres, MpesaClient>),
        )
        .route(
            "/callback",
            post(callback::<EventPostgres, RegistrationPostgres, PaymentPostgres, MpesaClient>),
        )
        .route(
            "/status/:registration_id",
            get(status::<EventPostgres, RegistrationPostgres, PaymentPostgres, MpesaClient>),
        )
        .route(
            "/history",
            get(history::<EventPostgres, RegistrationPostgres, PaymentPostgres, MpesaClient>),
        )
        .with_state(Arc::new(payment_usecase))
}

pub async fn initiate<E, R, P, G>(
    State(payment_usecase): PaymentState<E, R, P, G>,
    auth: AuthUser,
    Json(initiate_payment_model): Json<InitiatePaymentModel>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: MpesaGateway + 'static,
{
    match payment_usecase
        .initiate(auth.user_id, initiate_payment_model)
        .await
    {
        Ok(initiated) => {
            ApiResponse::with_message("Payment initiated successfully", initiated).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

/// Daraja posts here without credentials and expects an acknowledgement no
/// matter how the payload was handled.
pub async fn callback<E, R, P, G>(
    State(payment_usecase): PaymentState<E, R, P, G>,
    body: Bytes,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: MpesaGateway + 'static,
{
    Json(payment_usecase.handle_callback(&body).await)
}

pub async fn status<E, R, P, G>(
    State(payment_usecase): PaymentState<E, R, P, G>,
    auth: AuthUser,
    Path(registration_id): Path<Uuid>,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: MpesaGateway + 'static,
{
    match payment_usecase
        .registration_status(auth.user_id, registration_id)
        .await
    {
        Ok(registration) => {
            ApiResponse::data(json!({ "registration": registration })).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn history<E, R, P, G>(
    State(payment_usecase): PaymentState<E, R, P, G>,
    auth: AuthUser,
) -> impl IntoResponse
where
    E: EventRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
    G: MpesaGateway + 'static,
{
    match payment_usecase.history(auth.user_id).await {
        Ok(registrations) => {
            ApiResponse::data(json!({ "registrations": registrations })).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}
