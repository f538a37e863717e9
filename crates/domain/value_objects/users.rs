use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::users::{UserEntity, UserSummaryEntity},
    value_objects::enums::user_roles::UserRole,
};

/// User as returned to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserEntity> for UserDto {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            email: value.email,
            full_name: value.full_name,
            phone_number: value.phone_number,
            role: UserRole::from_str(&value.role).unwrap_or_default(),
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserSummaryDto {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserSummaryEntity> for UserSummaryDto {
    fn from(value: UserSummaryEntity) -> Self {
        Self {
            id: value.id,
            full_name: value.full_name,
            email: value.email,
            phone_number: value.phone_number,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserModel {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginModel {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileModel {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthSessionDto {
    pub user: UserDto,
    pub token: String,
}
