use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::{
    domain::{
        repositories::users::UserRepository,
        value_objects::users::{LoginModel, RegisterUserModel},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad, repositories::users::UserPostgres,
    },
};
use serde_json::json;

use crate::{
    auth::AuthUser,
    axum_http::{api_response::ApiResponse, error_responses::AppError},
    config::config_model::UserSecret,
    usecases::accounts::AccountUseCase,
};

pub fn routes(db_pool: Arc<PgPoolSquad>, user_secret: UserSecret) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let account_usecase = AccountUseCase::new(Arc::new(user_repository), user_secret);

    Router::new()
        .route("/register", post(register::<UserPostgres>))
        .route("/login", post(login::<UserPostgres>))
        .route("/me", get(me::<UserPostgres>))
        .with_state(Arc::new(account_usecase))
}

pub async fn register<T>(
    State(account_usecase): State<Arc<AccountUseCase<T>>>,
    Json(register_user_model): Json<RegisterUserModel>,
) -> impl IntoResponse
where
    T: UserRepository + Send + Sync + 'static,
{
    match account_usecase.register(register_user_model).await {
        Ok(session) => ApiResponse::with_message("User registered successfully", session)
            .into_response_with(StatusCode::CREATED),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn login<T>(
    State(account_usecase): State<Arc<AccountUseCase<T>>>,
    Json(login_model): Json<LoginModel>,
) -> impl IntoResponse
where
    T: UserRepository + Send + Sync + 'static,
{
    match account_usecase.login(login_model).await {
        Ok(session) => ApiResponse::with_message("Login successful", session).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn me<T>(
    State(account_usecase): State<Arc<AccountUseCase<T>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    T: UserRepository + Send + Sync + 'static,
{
    match account_usecase.me(auth.user_id).await {
        Ok(user) => ApiResponse::data(json!({ "user": user })).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}
