//! `PostgreSQL` implementation of the `EventRepository` trait.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

use chronicle_core::error::DomainError;
use chronicle_core::repository::{
    EventRepository, StoredEvent, ensure_events, ensure_stream_name, ensure_version_range,
};
use chronicle_core::stream::{StreamId, ensure_stream_id};

use crate::schema;

const SELECT_EVENTS: &str = r"
SELECT event_type, occurred_on, event_body, batch_id, version
FROM stored_events
";

#[derive(Debug, FromRow)]
struct StoredEventRow {
    event_type: String,
    occurred_on: DateTime<Utc>,
    event_body: String,
    batch_id: Uuid,
    version: i64,
}

impl From<StoredEventRow> for StoredEvent {
    fn from(row: StoredEventRow) -> Self {
        Self {
            event_type: row.event_type,
            occurred_on: row.occurred_on,
            event_body: row.event_body,
            batch_id: row.batch_id,
            version: row.version,
        }
    }
}

/// PostgreSQL-backed event repository.
///
/// Stream ids are persisted in their `Display` form. Every write is a
/// single transaction, so a dropped future leaves the stream untouched.
#[derive(Debug)]
pub struct PgEventRepository<Id> {
    pool: PgPool,
    _id: PhantomData<fn() -> Id>,
}

impl<Id> Clone for PgEventRepository<Id> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<Id> PgEventRepository<Id> {
    /// Creates a new `PgEventRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _id: PhantomData,
        }
    }

    /// Creates the event store tables if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the DDL fails.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        schema::migrate(&self.pool).await.map_err(infrastructure)
    }

    async fn current_version(&self, stream_key: &str) -> Result<i64, DomainError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM stored_events WHERE stream_id = $1")
                .bind(stream_key)
                .fetch_one(&self.pool)
                .await
                .map_err(infrastructure)?;
        Ok(version.unwrap_or(0))
    }
}

#[async_trait]
impl<Id: StreamId> EventRepository for PgEventRepository<Id> {
    type Id = Id;

    #[instrument(skip_all, fields(stream_id = %stream_id, stream_name = %stream_name))]
    async fn create_stream(&self, stream_id: &Id, stream_name: &str) -> Result<(), DomainError> {
        ensure_stream_id(stream_id)?;
        ensure_stream_name(stream_name)?;

        sqlx::query("INSERT INTO event_streams (stream_id, stream_name) VALUES ($1, $2)")
            .bind(stream_id.to_string())
            .bind(stream_name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.as_database_error()
                    .is_some_and(|db| db.is_unique_violation())
                {
                    DomainError::DuplicateStream(stream_id.to_string())
                } else {
                    infrastructure(e)
                }
            })?;
        tracing::debug!("stream row inserted");
        Ok(())
    }

    #[instrument(skip_all, fields(stream_id = %stream_id))]
    async fn check_stream(&self, stream_id: &Id) -> Result<bool, DomainError> {
        ensure_stream_id(stream_id)?;

        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM event_streams WHERE stream_id = $1)")
            .bind(stream_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(infrastructure)
    }

    #[instrument(skip_all, fields(stream_id = %stream_id))]
    async fn get_all(&self, stream_id: &Id) -> Result<Vec<StoredEvent>, DomainError> {
        ensure_stream_id(stream_id)?;

        let rows: Vec<StoredEventRow> =
            sqlx::query_as(&format!("{SELECT_EVENTS} WHERE stream_id = $1 ORDER BY version"))
                .bind(stream_id.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(infrastructure)?;
        tracing::debug!(rows = rows.len(), "loaded stream");
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    #[instrument(skip_all, fields(stream_id = %stream_id))]
    async fn get_last(&self, stream_id: &Id) -> Result<Option<StoredEvent>, DomainError> {
        ensure_stream_id(stream_id)?;

        let row: Option<StoredEventRow> = sqlx::query_as(&format!(
            "{SELECT_EVENTS} WHERE stream_id = $1 ORDER BY version DESC LIMIT 1"
        ))
        .bind(stream_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?;
        Ok(row.map(StoredEvent::from))
    }

    #[instrument(skip_all, fields(stream_id = %stream_id, from_version = from_version, to_version = ?to_version))]
    async fn get_selected(
        &self,
        stream_id: &Id,
        from_version: i64,
        to_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        ensure_stream_id(stream_id)?;
        ensure_version_range(from_version, to_version)?;

        let rows: Vec<StoredEventRow> = sqlx::query_as(&format!(
            "{SELECT_EVENTS} WHERE stream_id = $1 AND version >= $2 \
             AND ($3::BIGINT IS NULL OR version <= $3) ORDER BY version"
        ))
        .bind(stream_id.to_string())
        .bind(from_version)
        .bind(to_version)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;
        tracing::debug!(rows = rows.len(), "loaded stream slice");
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    #[instrument(skip_all, fields(stream_id = %stream_id, events_len = events.len()))]
    async fn add(&self, stream_id: &Id, events: &[StoredEvent]) -> Result<(), DomainError> {
        ensure_stream_id(stream_id)?;
        ensure_events(events)?;

        let stream_key = stream_id.to_string();
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(
            "INSERT INTO stored_events \
             (stream_id, version, event_type, occurred_on, event_body, batch_id) ",
        );
        builder.push_values(events, |mut row, event| {
            row.push_bind(&stream_key)
                .push_bind(event.version)
                .push_bind(&event.event_type)
                .push_bind(event.occurred_on)
                .push_bind(&event.event_body)
                .push_bind(event.batch_id);
        });

        let inserted = builder.build().execute(&mut *tx).await;
        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                return Err(DomainError::StreamNotFound(stream_key));
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // The failed transaction is rolled back on drop.
                drop(tx);
                let actual = self.current_version(&stream_key).await?;
                tracing::debug!(actual, "lost append race");
                return Err(DomainError::ConcurrencyConflict {
                    stream_id: stream_key,
                    expected: events[0].version - 1,
                    actual,
                });
            }
            Err(e) => return Err(infrastructure(e)),
        }

        tx.commit().await.map_err(infrastructure)?;
        tracing::debug!("events committed");
        Ok(())
    }
}

fn infrastructure(error: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(error.to_string())
}
