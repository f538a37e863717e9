use std::sync::Arc;

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use crates::{
    domain::{
        repositories::{
            payments::PaymentRepository, registrations::RegistrationRepository,
            users::UserRepository,
        },
        value_objects::users::UpdateProfileModel,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            payments::PaymentPostgres, registrations::RegistrationPostgres, users::UserPostgres,
        },
    },
};
use serde_json::json;

use crate::{
    auth::AuthUser,
    axum_http::{api_response::ApiResponse, error_responses::AppError},
    usecases::users::UserUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let registration_repository = RegistrationPostgres::new(Arc::clone(&db_pool));
    let payment_repository = PaymentPostgres::new(Arc::clone(&db_pool));
    let user_usecase = UserUseCase::new(
        Arc::new(user_repository),
        Arc::new(registration_repository),
        Arc::new(payment_repository),
    );

    Router::new()
        .route(
            "/",
            get(list_users::<UserPostgres, RegistrationPostgres, PaymentPostgres>),
        )
        .route(
            "/profile",
            get(profile::<UserPostgres, RegistrationPostgres, PaymentPostgres>)
                .put(update_profile::<UserPostgres, RegistrationPostgres, PaymentPostgres>),
        )
        .route(
            "/registrations",
            get(registrations::<UserPostgres, RegistrationPostgres, PaymentPostgres>),
        )
        .route(
            "/events/registrations",
            get(event_registrations::<UserPostgres, RegistrationPostgres, PaymentPostgres>),
        )
        .with_state(Arc::new(user_usecase))
}

pub async fn profile<U, R, P>(
    State(user_usecase): State<Arc<UserUseCase<U, R, P>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    match user_usecase.profile(auth.user_id).await {
        Ok(user) => ApiResponse::data(json!({ "user": user })).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn update_profile<U, R, P>(
    State(user_usecase): State<Arc<UserUseCase<U, R, P>>>,
    auth: AuthUser,
    Json(update_profile_model): Json<UpdateProfileModel>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    match user_usecase
        .update_profile(auth.user_id, update_profile_model)
        .await
    {
        Ok(user) => {
            ApiResponse::with_message("Profile updated successfully", json!({ "user": user }))
                .into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn registrations<U, R, P>(
    State(user_usecase): State<Arc<UserUseCase<U, R, P>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    match user_usecase.registrations(auth.user_id).await {
        Ok(registrations) => {
            ApiResponse::data(json!({ "registrations": registrations })).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn list_users<U, R, P>(
    State(user_usecase): State<Arc<UserUseCase<U, R, P>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    match user_usecase.list_users(auth.role).await {
        Ok(users) => ApiResponse::data(json!({ "users": users })).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn event_registrations<U, R, P>(
    State(user_usecase): State<Arc<UserUseCase<U, R, P>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    match user_usecase
        .event_registrations(auth.user_id, auth.role)
        .await
    {
        Ok(registrations) => {
            ApiResponse::data(json!({ "registrations": registrations })).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}
