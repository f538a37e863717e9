use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::users::{InsertUserEntity, UpdateUserProfileEntity, UserEntity};

#[async_trait]
#[automock]
pub trait UserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>>;
    async fn find_by_email(&self, email: String) -> Result<Option<UserEntity>>;
    async fn create(&self, insert_user_entity: InsertUserEntity) -> Result<UserEntity>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        update_profile_entity: UpdateUserProfileEntity,
    ) -> Result<UserEntity>;
    async fn list_all(&self) -> Result<Vec<UserEntity>>;
}
