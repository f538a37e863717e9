use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use crates::domain::{
    entities::users::UpdateUserProfileEntity,
    repositories::{
        payments::PaymentRepository, registrations::RegistrationRepository,
        users::UserRepository,
    },
    value_objects::{
        enums::user_roles::UserRole,
        registrations::{AttendeeRegistrationDto, RegistrationDetailsDto, attach_payments},
        users::{UpdateProfileModel, UserDto},
    },
};
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,
    #[error("Access denied. Insufficient permissions.")]
    Forbidden,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl UserError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Forbidden => StatusCode::FORBIDDEN,
            UserError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Internal(e) => AppError::Internal(e),
            UserError::NotFound => AppError::NotFound(err.to_string()),
            UserError::Forbidden => AppError::Forbidden(err.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, UserError>;

pub struct UserUseCase<U, R, P>
where
    U: UserRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    registration_repo: Arc<R>,
    payment_repo: Arc<P>,
}

impl<U, R, P> UserUseCase<U, R, P>
where
    U: UserRepository + Send + Sync + 'static,
    R: RegistrationRepository + Send + Sync + 'static,
    P: PaymentRepository + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, registration_repo: Arc<R>, payment_repo: Arc<P>) -> Self {
        Self {
            user_repo,
            registration_repo,
            payment_repo,
        }
    }

    pub async fn profile(&self, user_id: Uuid) -> UseCaseResult<UserDto> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to load profile");
                UserError::Internal(err)
            })?
            .ok_or(UserError::NotFound)?;

        Ok(user.into())
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        model: UpdateProfileModel,
    ) -> UseCaseResult<UserDto> {
        let user = self
            .user_repo
            .update_profile(
                user_id,
                UpdateUserProfileEntity {
                    full_name: model.full_name,
                    phone_number: model.phone_number,
                    updated_at: Utc::now(),
                },
            )
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to update profile");
                UserError::Internal(err)
            })?;

        info!(%user_id, "users: profile updated");
        Ok(user.into())
    }

    pub async fn registrations(&self, user_id: Uuid) -> UseCaseResult<Vec<RegistrationDetailsDto>> {
        let rows = self
            .registration_repo
            .list_for_user_with_events(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "users: failed to list registrations");
                UserError::Internal(err)
            })?;

        let ids = rows.iter().map(|(registration, _)| registration.id).collect();
        let payments = self
            .payment_repo
            .list_for_registrations(ids)
            .await
            .map_err(UserError::Internal)?;

        Ok(attach_payments(rows, payments))
    }

    pub async fn list_users(&self, role: UserRole) -> UseCaseResult<Vec<UserDto>> {
        if role != UserRole::Admin {
            return Err(UserError::Forbidden);
        }

        let users = self.user_repo.list_all().await.map_err(|err| {
            error!(db_error = ?err, "users: failed to list users");
            UserError::Internal(err)
        })?;

        Ok(users.into_iter().map(UserDto::from).collect())
    }

    pub async fn event_registrations(
        &self,
        organizer_id: Uuid,
        role: UserRole,
    ) -> UseCaseResult<Vec<AttendeeRegistrationDto>> {
        if !role.can_manage_events() {
            return Err(UserError::Forbidden);
        }

        let rows = self
            .registration_repo
            .list_for_organizer(organizer_id)
            .await
            .map_err(|err| {
                error!(%organizer_id, db_error = ?err, "users: failed to list event registrations");
                UserError::Internal(err)
            })?;

        Ok(rows
            .into_iter()
            .map(|(registration, event, attendee)| {
                AttendeeRegistrationDto::new(registration, Some(event), attendee)
            })
            .collect())
    }
}
