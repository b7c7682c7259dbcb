//! Repository for the `jobs` table.
//!
//! Writes are whole-record upserts: the caller always holds the merged
//! in-memory record, so the row simply mirrors it until it turns terminal.

use genesis_core::types::JobId;

use crate::models::job::JobRow;
use crate::DbPool;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, status, progress, message, error, \
    artifact_path, artifact_url, seed, metadata, \
    created_at, updated_at";

/// Statuses a stored row never leaves.
const TERMINAL_STATUSES: &str = "'completed', 'failed', 'timed_out', 'cancelled'";

/// Provides persistence operations for generation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert or replace the row for `row.id`.
    ///
    /// A row that already holds a terminal status is left untouched, so
    /// writes racing on the same job cannot reopen it.
    pub async fn upsert(pool: &DbPool, row: &JobRow) -> Result<(), sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs ({COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                 status = excluded.status, \
                 progress = excluded.progress, \
                 message = excluded.message, \
                 error = excluded.error, \
                 artifact_path = excluded.artifact_path, \
                 artifact_url = excluded.artifact_url, \
                 seed = excluded.seed, \
                 metadata = excluded.metadata, \
                 updated_at = excluded.updated_at \
             WHERE jobs.status NOT IN ({TERMINAL_STATUSES})"
        );
        sqlx::query(&query)
            .bind(&row.id)
            .bind(&row.status)
            .bind(row.progress)
            .bind(&row.message)
            .bind(&row.error)
            .bind(&row.artifact_path)
            .bind(&row.artifact_url)
            .bind(row.seed)
            .bind(&row.metadata)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Find a job row by its public id.
    pub async fn find_by_id(pool: &DbPool, id: JobId) -> Result<Option<JobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = ?");
        sqlx::query_as::<_, JobRow>(&query)
            .bind(id.to_string())
            .fetch_optional(pool)
            .await
    }
}
