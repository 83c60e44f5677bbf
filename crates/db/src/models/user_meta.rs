use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserMeta {
    pub user_id: i64,
    pub meta_key: String,
    pub meta_value: String,
}

impl UserMeta {
    pub async fn get(
        pool: &SqlitePool,
        user_id: i64,
        key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"SELECT meta_value
               FROM user_meta
               WHERE user_id = ? AND meta_key = ?"#,
        )
        .bind(user_id)
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    pub async fn set(
        pool: &SqlitePool,
        user_id: i64,
        key: &str,
        value: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"INSERT INTO user_meta (user_id, meta_key, meta_value)
               VALUES (?, ?, ?)
               ON CONFLICT(user_id, meta_key) DO UPDATE SET meta_value = excluded.meta_value"#,
        )
        .bind(user_id)
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Returns whether a value was removed.
    pub async fn delete(pool: &SqlitePool, user_id: i64, key: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(r#"DELETE FROM user_meta WHERE user_id = ? AND meta_key = ?"#)
            .bind(user_id)
            .bind(key)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserMeta>(
            r#"SELECT user_id, meta_key, meta_value
               FROM user_meta
               WHERE user_id = ?
               ORDER BY meta_key ASC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
