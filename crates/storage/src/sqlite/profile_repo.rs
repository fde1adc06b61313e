use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::repository::{RemoteProfile, RemoteProgressRepository, StorageError};
use sensei_core::model::UserId;

use super::SqliteRepository;

#[async_trait]
impl RemoteProgressRepository for SqliteRepository {
    async fn fetch_profile(&self, user: &UserId) -> Result<Option<RemoteProfile>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT points, updated_at
            FROM profiles
            WHERE id = ?1
            ",
        )
        .bind(user.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let points: i64 = row
            .try_get("points")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let points = u32::try_from(points)
            .map_err(|_| StorageError::Serialization(format!("points out of range: {points}")))?;

        Ok(Some(RemoteProfile {
            user_id: user.clone(),
            points,
            updated_at,
        }))
    }

    async fn upsert_points(
        &self,
        user: &UserId,
        points: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO profiles (id, points, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                points = excluded.points,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user.as_str())
        .bind(i64::from(points))
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        Ok(())
    }
}
