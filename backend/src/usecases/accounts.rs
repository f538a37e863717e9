use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use crates::domain::{
    entities::users::InsertUserEntity,
    repositories::users::UserRepository,
    value_objects::{
        enums::user_roles::UserRole,
        users::{AuthSessionDto, LoginModel, RegisterUserModel, UserDto},
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        issue_token,
        password::{hash_password, verify_password},
    },
    axum_http::error_responses::AppError,
    config::config_model::UserSecret,
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Password must be at least {} characters", MIN_PASSWORD_LENGTH)]
    WeakPassword,
    #[error("User already exists with this email")]
    EmailTaken,
    #[error("Cannot self-register as admin")]
    AdminSelfRegistration,
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("User not found")]
    UserNotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AccountError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccountError::MissingCredentials
            | AccountError::WeakPassword
            | AccountError::EmailTaken
            | AccountError::InvalidCredentials => StatusCode::BAD_REQUEST,
            AccountError::AdminSelfRegistration => StatusCode::FORBIDDEN,
            AccountError::UserNotFound => StatusCode::NOT_FOUND,
            AccountError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Internal(e) => AppError::Internal(e),
            AccountError::AdminSelfRegistration => AppError::Forbidden(err.to_string()),
            AccountError::UserNotFound => AppError::NotFound(err.to_string()),
            other => AppError::bad_request(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, AccountError>;

pub struct AccountUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    user_secret: UserSecret,
}

impl<U> AccountUseCase<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, user_secret: UserSecret) -> Self {
        Self {
            user_repo,
            user_secret,
        }
    }

    fn session(&self, user: UserDto) -> UseCaseResult<AuthSessionDto> {
        let token = issue_token(&self.user_secret, user.id, &user.email, user.role)
            .map_err(|e| AccountError::Internal(anyhow::anyhow!("{}", e)))?;
        Ok(AuthSessionDto { user, token })
    }

    pub async fn register(&self, model: RegisterUserModel) -> UseCaseResult<AuthSessionDto> {
        let email = model.email.trim().to_lowercase();
        if email.is_empty() || model.password.is_empty() {
            return Err(AccountError::MissingCredentials);
        }
        if model.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AccountError::WeakPassword);
        }

        let role = model.role.unwrap_or_default();
        if role == UserRole::Admin {
            warn!(%email, "accounts: rejected admin self-registration");
            return Err(AccountError::AdminSelfRegistration);
        }

        let existing = self
            .user_repo
            .find_by_email(email.clone())
            .await
            .map_err(|err| {
                error!(db_error = ?err, "accounts: failed to look up email");
                AccountError::Internal(err)
            })?;
        if existing.is_some() {
            info!(%email, "accounts: email already registered");
            return Err(AccountError::EmailTaken);
        }

        let password_hash = hash_password(&model.password)?;
        let now = Utc::now();

        let user = self
            .user_repo
            .create(InsertUserEntity {
                email,
                password_hash,
                full_name: model.full_name,
                phone_number: model.phone_number,
                role: role.as_str().to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(db_error = ?err, "accounts: failed to create user");
                AccountError::Internal(err)
            })?;

        info!(user_id = %user.id, role = %role, "accounts: user registered");
        self.session(user.into())
    }

    pub async fn login(&self, model: LoginModel) -> UseCaseResult<AuthSessionDto> {
        let email = model.email.trim().to_lowercase();
        if email.is_empty() || model.password.is_empty() {
            return Err(AccountError::MissingCredentials);
        }

        let user = self
            .user_repo
            .find_by_email(email)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "accounts: failed to load user for login");
                AccountError::Internal(err)
            })?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(&model.password, &user.password_hash) {
            info!(user_id = %user.id, "accounts: password mismatch");
            return Err(AccountError::InvalidCredentials);
        }

        info!(user_id = %user.id, "accounts: login succeeded");
        self.session(user.into())
    }

    pub async fn me(&self, user_id: Uuid) -> UseCaseResult<UserDto> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "accounts: failed to load current user");
                AccountError::Internal(err)
            })?
            .ok_or(AccountError::UserNotFound)?;

        Ok(user.into())
    }
}
