use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::users;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct InsertUserEntity {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `None` fields are left untouched by Diesel.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub struct UpdateUserProfileEntity {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a user joined onto events, registrations and reviews.
#[derive(Debug, Clone, PartialEq, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserSummaryEntity {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: String,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}
