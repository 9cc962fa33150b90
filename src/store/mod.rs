// Research plan persistence
//
// A deliberately small CRUD layer: one table, numeric ids, no versioning.
// Plans are created by the planning step of the research workflow (or by
// the LLM through the research-plan tools) and read back for display.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// A stored research plan
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResearchPlan {
    pub id: i64,
    pub summary: String,
    pub details: String,
}

/// SQLite-backed plan store
#[derive(Clone)]
pub struct PlanStore {
    pool: SqlitePool,
}

impl PlanStore {
    /// Open (or create) the plan database at the given path
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS research_plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                summary TEXT NOT NULL,
                details TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// In-memory store for tests and throwaway sessions
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().in_memory(true))
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS research_plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                summary TEXT NOT NULL,
                details TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    /// Persist a plan, returning its assigned id
    pub async fn create(&self, summary: &str, details: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO research_plans (summary, details) VALUES (?, ?)")
            .bind(summary)
            .bind(details)
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// All stored plans, oldest first
    pub async fn list(&self) -> Result<Vec<ResearchPlan>> {
        let plans = sqlx::query_as::<_, ResearchPlan>(
            "SELECT id, summary, details FROM research_plans ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(plans)
    }

    /// Delete a plan by id; returns whether a row was removed
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM research_plans WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
