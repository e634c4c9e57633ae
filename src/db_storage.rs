use crate::errors::{AppError, ResultExt};
use crate::models::{SoilHistoryRecord, SoilReading};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Maximum number of history rows returned by one listing.
pub const MAX_HISTORY_LIMIT: i64 = 200;
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Database storage for soil estimate snapshots.
///
/// Each row keeps the full reading as JSON so older snapshots survive later
/// changes to the pipeline.
#[derive(Clone)]
pub struct SoilHistoryStorage {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct SoilHistoryRow {
    id: Uuid,
    location: String,
    result: String,
    created_at: DateTime<Utc>,
}

impl SoilHistoryStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `soil_history` table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS soil_history (
                id UUID PRIMARY KEY,
                location TEXT NOT NULL,
                result TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("creating soil_history table")?;

        Ok(())
    }

    /// Stores a snapshot of a reading.
    pub async fn store(
        &self,
        location: &str,
        reading: &SoilReading,
    ) -> Result<SoilHistoryRecord, AppError> {
        let id = Uuid::new_v4();
        let snapshot = serde_json::to_string(reading)?;

        let created_at: DateTime<Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO soil_history (id, location, result)
            VALUES ($1, $2, $3)
            RETURNING created_at
            "#,
        )
        .bind(id)
        .bind(location)
        .bind(&snapshot)
        .fetch_one(&self.pool)
        .await
        .context("inserting soil history")?;

        tracing::debug!("Stored soil history {} for {}", id, location);

        Ok(SoilHistoryRecord {
            id,
            location: location.to_string(),
            result: reading.clone(),
            created_at,
        })
    }

    /// Lists snapshots, newest first. Rows whose JSON no longer parses are
    /// skipped with a warning.
    pub async fn list(&self, limit: i64) -> Result<Vec<SoilHistoryRecord>, AppError> {
        let limit = clamp_limit(Some(limit));

        let rows = sqlx::query_as::<_, SoilHistoryRow>(
            r#"
            SELECT id, location, result, created_at
            FROM soil_history
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("listing soil history")?;

        let records = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_str::<SoilReading>(&row.result) {
                Ok(result) => Some(SoilHistoryRecord {
                    id: row.id,
                    location: row.location,
                    result,
                    created_at: row.created_at,
                }),
                Err(e) => {
                    tracing::warn!("Skipping unreadable soil history {}: {}", row.id, e);
                    None
                }
            })
            .collect();

        Ok(records)
    }
}

/// Applies the default and bounds to a requested page size.
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}
