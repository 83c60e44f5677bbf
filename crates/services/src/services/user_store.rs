use async_trait::async_trait;
use db::{
    DBService,
    models::{
        user::{UpdateUser, User},
        user_meta::UserMeta,
    },
};
use thiserror::Error;

/// Attribute keys owned by profile sync.
pub mod attributes {
    pub const USER_PUID: &str = "user_puid";
    pub const USER_PROFILE_DATA: &str = "user_profile_data";
    pub const USER_PROFILE_ID: &str = "user_profile_id";
    pub const NICKNAME: &str = "nickname";
    pub const USER_PROFILE_AVATAR_BASE64: &str = "user_profile_avatar_base64";
    pub const SSO_ALTSECID: &str = "sso_altsecid";

    /// Everything that moves when two accounts are linked.
    pub const PROFILE_KEYS: [&str; 6] = [
        USER_PUID,
        USER_PROFILE_DATA,
        USER_PROFILE_ID,
        NICKNAME,
        USER_PROFILE_AVATAR_BASE64,
        SSO_ALTSECID,
    ];
}

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("user {0} not found")]
    UserNotFound(i64),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Host-owned user records and their key/value attributes.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_attribute(&self, user_id: i64, key: &str)
    -> Result<Option<String>, UserStoreError>;

    async fn set_attribute(&self, user_id: i64, key: &str, value: &str)
    -> Result<(), UserStoreError>;

    async fn delete_attribute(&self, user_id: i64, key: &str) -> Result<(), UserStoreError>;

    async fn update_user(&self, user_id: i64, data: &UpdateUser) -> Result<(), UserStoreError>;

    /// At most one user whose attribute equals `value` exactly.
    async fn find_by_attribute(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<User>, UserStoreError>;
}

#[async_trait]
impl UserStore for DBService {
    async fn get_attribute(
        &self,
        user_id: i64,
        key: &str,
    ) -> Result<Option<String>, UserStoreError> {
        Ok(UserMeta::get(&self.pool, user_id, key).await?)
    }

    async fn set_attribute(
        &self,
        user_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), UserStoreError> {
        if User::find_by_id(&self.pool, user_id).await?.is_none() {
            return Err(UserStoreError::UserNotFound(user_id));
        }
        Ok(UserMeta::set(&self.pool, user_id, key, value).await?)
    }

    async fn delete_attribute(&self, user_id: i64, key: &str) -> Result<(), UserStoreError> {
        UserMeta::delete(&self.pool, user_id, key).await?;
        Ok(())
    }

    async fn update_user(&self, user_id: i64, data: &UpdateUser) -> Result<(), UserStoreError> {
        User::update(&self.pool, user_id, data)
            .await?
            .map(|_| ())
            .ok_or(UserStoreError::UserNotFound(user_id))
    }

    async fn find_by_attribute(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<User>, UserStoreError> {
        Ok(User::find_by_meta(&self.pool, key, value).await?)
    }
}
