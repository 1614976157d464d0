//! Event store database schema.

use sqlx::PgPool;
use tracing::instrument;

/// SQL to create the stream registry table.
pub const CREATE_EVENT_STREAMS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS event_streams (
    stream_id   TEXT NOT NULL,
    stream_name TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT event_streams_pkey PRIMARY KEY (stream_id)
)
";

/// SQL to create the events table.
pub const CREATE_STORED_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS stored_events (
    stream_id   TEXT NOT NULL,
    version     BIGINT NOT NULL,
    event_type  TEXT NOT NULL,
    occurred_on TIMESTAMPTZ NOT NULL,
    event_body  TEXT NOT NULL,
    batch_id    UUID NOT NULL,
    CONSTRAINT stored_events_pkey PRIMARY KEY (stream_id, version),
    CONSTRAINT stored_events_stream_fkey FOREIGN KEY (stream_id)
        REFERENCES event_streams (stream_id)
)
";

/// SQL to index events by commit batch.
pub const CREATE_BATCH_ID_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_stored_events_batch_id
    ON stored_events (batch_id)
";

/// Creates the event store tables if they do not exist.
///
/// Statements run in order inside one transaction and are idempotent.
///
/// # Errors
///
/// Returns the underlying `sqlx::Error` if any statement fails.
#[instrument(skip_all)]
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in [
        CREATE_EVENT_STREAMS_TABLE,
        CREATE_STORED_EVENTS_TABLE,
        CREATE_BATCH_ID_INDEX,
    ] {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::debug!("event store schema is up to date");
    Ok(())
}
