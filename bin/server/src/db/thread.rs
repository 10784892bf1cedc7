//! Postgres-backed message store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use healthfirst_conversation::{MessageStore, Speaker, StoreError, StoredTurn, ThreadSummary};
use healthfirst_core::{OwnerId, ThreadId};
use rootcause::Report;
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};

/// Row type for thread listing queries.
#[derive(FromRow)]
struct ThreadSummaryRow {
    thread_id: String,
    last_updated: DateTime<Utc>,
}

impl ThreadSummaryRow {
    fn try_into_summary(self) -> Result<ThreadSummary, Report<StoreError>> {
        let thread_id = ThreadId::parse(self.thread_id.clone()).map_err(|e| {
            Report::from(StoreError::QueryFailed {
                reason: format!("invalid thread id '{}': {}", self.thread_id, e),
            })
        })?;
        Ok(ThreadSummary {
            thread_id,
            last_updated: self.last_updated,
        })
    }
}

/// Row type for turn queries.
#[derive(FromRow)]
struct TurnRow {
    sender: String,
    content: Option<String>,
    legacy_content: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TurnRow> for StoredTurn {
    fn from(row: TurnRow) -> Self {
        Self {
            sender: row.sender,
            content: row.content,
            legacy_content: row.legacy_content,
            timestamp: row.created_at,
        }
    }
}

/// Classifies a sqlx error as a store error.
fn store_error(err: sqlx::Error) -> Report<StoreError> {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable {
                reason: err.to_string(),
            }
        }
        other => StoreError::QueryFailed {
            reason: other.to_string(),
        },
    }
    .into()
}

/// [`MessageStore`] over the `threads` and `turns` tables.
///
/// An append bumps the thread's `turn_count` with an upsert and uses the
/// returned count as the turn's sequence number. The row lock taken by the
/// upsert orders concurrent appends to one thread.
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    /// Creates a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    #[instrument(skip(self, content, owner), fields(thread_id = %thread_id, sender = speaker.as_sender()))]
    async fn append(
        &self,
        thread_id: &ThreadId,
        speaker: Speaker,
        content: &str,
        owner: Option<&OwnerId>,
    ) -> Result<(), Report<StoreError>> {
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        let seq: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO threads (thread_id, owner, turn_count, created_at, last_updated)
            VALUES ($1, $2, 1, NOW(), NOW())
            ON CONFLICT (thread_id) DO UPDATE SET
                turn_count = threads.turn_count + 1,
                owner = COALESCE(EXCLUDED.owner, threads.owner),
                last_updated = NOW()
            RETURNING turn_count
            "#,
        )
        .bind(thread_id.as_str())
        .bind(owner.map(OwnerId::as_str))
        .fetch_one(&mut *tx)
        .await
        .map_err(store_error)?;

        sqlx::query(
            r#"
            INSERT INTO turns (thread_id, seq, sender, content, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(thread_id.as_str())
        .bind(seq)
        .bind(speaker.as_sender())
        .bind(content)
        .execute(&mut *tx)
        .await
        .map_err(store_error)?;

        tx.commit().await.map_err(store_error)?;
        debug!(seq, "Appended turn");
        Ok(())
    }

    #[instrument(skip(self, owner), fields(scoped = owner.is_some()))]
    async fn list_threads(
        &self,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<ThreadSummary>, Report<StoreError>> {
        let rows: Vec<ThreadSummaryRow> = sqlx::query_as(
            r#"
            SELECT thread_id, last_updated
            FROM threads
            WHERE $1::TEXT IS NULL OR owner = $1
            ORDER BY last_updated DESC, thread_id
            "#,
        )
        .bind(owner.map(OwnerId::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        rows.into_iter()
            .map(ThreadSummaryRow::try_into_summary)
            .collect()
    }

    #[instrument(skip(self, owner), fields(thread_id = %thread_id, scoped = owner.is_some()))]
    async fn read_turns(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<Vec<StoredTurn>, Report<StoreError>> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            r#"
            SELECT t.sender, t.content, t.legacy_content, t.created_at
            FROM turns t
            JOIN threads th ON th.thread_id = t.thread_id
            WHERE t.thread_id = $1 AND ($2::TEXT IS NULL OR th.owner = $2)
            ORDER BY t.seq
            "#,
        )
        .bind(thread_id.as_str())
        .bind(owner.map(OwnerId::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(rows.into_iter().map(StoredTurn::from).collect())
    }

    #[instrument(skip(self, owner), fields(thread_id = %thread_id))]
    async fn create_thread(
        &self,
        thread_id: &ThreadId,
        owner: Option<&OwnerId>,
    ) -> Result<bool, Report<StoreError>> {
        // xmax is zero only for a row this statement inserted.
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO threads (thread_id, owner, turn_count, created_at, last_updated)
            VALUES ($1, $2, 0, NOW(), NOW())
            ON CONFLICT (thread_id) DO UPDATE SET
                owner = COALESCE(threads.owner, EXCLUDED.owner)
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(thread_id.as_str())
        .bind(owner.map(OwnerId::as_str))
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(inserted)
    }

    async fn thread_owner(
        &self,
        thread_id: &ThreadId,
    ) -> Result<Option<OwnerId>, Report<StoreError>> {
        let owner: Option<Option<String>> =
            sqlx::query_scalar("SELECT owner FROM threads WHERE thread_id = $1")
                .bind(thread_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;

        owner
            .flatten()
            .map(|owner| {
                OwnerId::parse(owner).map_err(|e| {
                    Report::from(StoreError::CorruptRecord {
                        thread_id: thread_id.clone(),
                        reason: e.to_string(),
                    })
                })
            })
            .transpose()
    }
}
