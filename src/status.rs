//! Scraper progress marker.
//!
//! The downstream scraper records the date it has processed up to, and
//! reads it back on the next run to know where to resume. The table holds at
//! most one row; saving overwrites it.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::db::Database;
use crate::metrics::{Query, QueryTimer};

const SAVE_PROCESSED_DATE: &str = "
    INSERT INTO scraper_status (id, last_processed_date)
    VALUES (1, ?1)
    ON CONFLICT (id) DO UPDATE SET
        last_processed_date = excluded.last_processed_date,
        updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

const GET_LAST_PROCESSED_DATE: &str =
    "SELECT last_processed_date FROM scraper_status ORDER BY updated_at DESC LIMIT 1";

/// Errors from [`StatusRepository`].
#[derive(Debug, Error)]
pub enum StatusError {
    /// The upsert failed.
    #[error("failed to execute insert query: {source}")]
    Save {
        #[source]
        source: sqlx::Error,
    },

    /// The select failed or the stored value could not be decoded.
    #[error("failed to get last processed date from table scraper_status: {source}")]
    Load {
        #[source]
        source: sqlx::Error,
    },
}

impl StatusError {
    /// Returns the underlying sqlx error.
    #[must_use]
    pub fn sqlx_error(&self) -> &sqlx::Error {
        match self {
            Self::Save { source } | Self::Load { source } => source,
        }
    }
}

/// Reads and writes the last processed date.
#[derive(Debug, Clone)]
pub struct StatusRepository {
    db: Database,
}

impl StatusRepository {
    /// Creates a repository over a migrated database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Stores `date` as the last processed date, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::Save`] if the upsert fails.
    #[instrument(skip_all, fields(date = %date))]
    pub async fn save_processed_date(&self, date: DateTime<Utc>) -> Result<(), StatusError> {
        let _timer = QueryTimer::start(Query::SaveProcessedDate);

        sqlx::query(SAVE_PROCESSED_DATE)
            .bind(date)
            .execute(self.db.pool())
            .await
            .map_err(|source| StatusError::Save { source })?;

        debug!("saved last processed date");
        Ok(())
    }

    /// Returns the most recently saved date, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError::Load`] if the query fails or the stored value
    /// is not a timestamp.
    #[instrument(skip(self))]
    pub async fn last_processed_date(&self) -> Result<Option<DateTime<Utc>>, StatusError> {
        let _timer = QueryTimer::start(Query::GetLastProcessedDate);

        let row: Option<(DateTime<Utc>,)> = sqlx::query_as(GET_LAST_PROCESSED_DATE)
            .fetch_optional(self.db.pool())
            .await
            .map_err(|source| StatusError::Load { source })?;

        Ok(row.map(|(date,)| date))
    }
}
