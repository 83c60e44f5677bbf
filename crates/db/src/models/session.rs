use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub async fn create(pool: &SqlitePool, user_id: i64) -> Result<Self, sqlx::Error> {
        let token = Uuid::new_v4().simple().to_string();
        sqlx::query_as::<_, Session>(
            r#"INSERT INTO sessions (token, user_id)
               VALUES (?, ?)
               RETURNING token, user_id, created_at"#,
        )
        .bind(token)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_token(pool: &SqlitePool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            r#"SELECT token, user_id, created_at
               FROM sessions
               WHERE token = ?"#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await
    }

    pub async fn revoke(pool: &SqlitePool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM sessions WHERE token = ?"#)
            .bind(token)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
