use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub display_name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateUser {
    pub display_name: Option<String>,
    pub role: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.role.is_none()
    }
}

impl User {
    pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, login, display_name, role, created_at
               FROM users
               WHERE id = ?"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_login(pool: &SqlitePool, login: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT id, login, display_name, role, created_at
               FROM users
               WHERE login = ?"#,
        )
        .bind(login)
        .fetch_optional(pool)
        .await
    }

    pub async fn create(pool: &SqlitePool, login: &str, role: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"INSERT INTO users (login, role)
               VALUES (?, ?)
               RETURNING id, login, display_name, role, created_at"#,
        )
        .bind(login)
        .bind(role)
        .fetch_one(pool)
        .await
    }

    /// Returns `None` when no user has the given id.
    pub async fn update(
        pool: &SqlitePool,
        id: i64,
        data: &UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"UPDATE users
               SET display_name = COALESCE(?, display_name),
                   role = COALESCE(?, role)
               WHERE id = ?
               RETURNING id, login, display_name, role, created_at"#,
        )
        .bind(data.display_name.as_deref())
        .bind(data.role.as_deref())
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// First user (lowest id) whose attribute `key` equals `value` exactly.
    pub async fn find_by_meta(
        pool: &SqlitePool,
        key: &str,
        value: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"SELECT u.id, u.login, u.display_name, u.role, u.created_at
               FROM users u
               JOIN user_meta m ON m.user_id = u.id
               WHERE m.meta_key = ? AND m.meta_value = ?
               ORDER BY u.id ASC
               LIMIT 1"#,
        )
        .bind(key)
        .bind(value)
        .fetch_optional(pool)
        .await
    }
}
