//! `EventRepository` implementations for tests.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chronicle_core::error::DomainError;
use chronicle_core::repository::{
    EventRepository, StoredEvent, ensure_events, ensure_stream_name, ensure_version_range,
};
use chronicle_core::stream::{EventStream, StreamId, ensure_stream_id};

#[derive(Debug)]
struct StreamRecord<Id> {
    stream: EventStream<Id>,
    events: BTreeMap<i64, StoredEvent>,
}

/// A fully functional gateway held in memory.
///
/// Mirrors the storage constraints of the PostgreSQL gateway: unique stream
/// ids, unique versions per stream, and all-or-nothing batches.
#[derive(Debug)]
pub struct InMemoryEventRepository<Id> {
    streams: Mutex<HashMap<Id, StreamRecord<Id>>>,
    fail_next_add: AtomicBool,
}

impl<Id: StreamId> InMemoryEventRepository<Id> {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            fail_next_add: AtomicBool::new(false),
        }
    }

    /// Makes the next `add` fail with an infrastructure error after its
    /// argument checks, writing nothing. Later calls behave normally.
    pub fn fail_next_add(&self) {
        self.fail_next_add.store(true, Ordering::SeqCst);
    }

    /// Returns the stream row, if the stream exists.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stream(&self, stream_id: &Id) -> Option<EventStream<Id>> {
        self.streams
            .lock()
            .unwrap()
            .get(stream_id)
            .map(|record| record.stream.clone())
    }

    /// Returns the name a stream was created with.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn stream_name(&self, stream_id: &Id) -> Option<String> {
        self.stream(stream_id).map(|stream| stream.stream_name)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Id, StreamRecord<Id>>>, DomainError> {
        self.streams
            .lock()
            .map_err(|_| DomainError::Infrastructure("in-memory event store lock poisoned".into()))
    }

    fn select(
        &self,
        stream_id: &Id,
        from_version: i64,
        to_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        let streams = self.lock()?;
        Ok(streams
            .get(stream_id)
            .map(|record| {
                record
                    .events
                    .range(from_version..=to_version.unwrap_or(i64::MAX))
                    .map(|(_, event)| event.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl<Id: StreamId> Default for InMemoryEventRepository<Id> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<Id: StreamId> EventRepository for InMemoryEventRepository<Id> {
    type Id = Id;

    async fn create_stream(&self, stream_id: &Id, stream_name: &str) -> Result<(), DomainError> {
        ensure_stream_id(stream_id)?;
        ensure_stream_name(stream_name)?;

        let mut streams = self.lock()?;
        if streams.contains_key(stream_id) {
            return Err(DomainError::DuplicateStream(stream_id.to_string()));
        }
        streams.insert(
            stream_id.clone(),
            StreamRecord {
                stream: EventStream {
                    stream_id: stream_id.clone(),
                    stream_name: stream_name.to_owned(),
                },
                events: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn check_stream(&self, stream_id: &Id) -> Result<bool, DomainError> {
        ensure_stream_id(stream_id)?;
        Ok(self.lock()?.contains_key(stream_id))
    }

    async fn get_all(&self, stream_id: &Id) -> Result<Vec<StoredEvent>, DomainError> {
        ensure_stream_id(stream_id)?;
        self.select(stream_id, i64::MIN, None)
    }

    async fn get_last(&self, stream_id: &Id) -> Result<Option<StoredEvent>, DomainError> {
        ensure_stream_id(stream_id)?;
        let streams = self.lock()?;
        Ok(streams
            .get(stream_id)
            .and_then(|record| record.events.values().next_back().cloned()))
    }

    async fn get_selected(
        &self,
        stream_id: &Id,
        from_version: i64,
        to_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        ensure_stream_id(stream_id)?;
        ensure_version_range(from_version, to_version)?;
        self.select(stream_id, from_version, to_version)
    }

    async fn add(&self, stream_id: &Id, events: &[StoredEvent]) -> Result<(), DomainError> {
        ensure_stream_id(stream_id)?;
        ensure_events(events)?;
        if self.fail_next_add.swap(false, Ordering::SeqCst) {
            return Err(DomainError::Infrastructure("connection reset".into()));
        }

        let mut streams = self.lock()?;
        let record = streams
            .get_mut(stream_id)
            .ok_or_else(|| DomainError::StreamNotFound(stream_id.to_string()))?;

        let actual = record.events.keys().next_back().copied().unwrap_or(0);
        let mut batch_versions = Vec::with_capacity(events.len());
        for event in events {
            if record.events.contains_key(&event.version) || batch_versions.contains(&event.version)
            {
                return Err(DomainError::ConcurrencyConflict {
                    stream_id: stream_id.to_string(),
                    expected: events[0].version - 1,
                    actual,
                });
            }
            batch_versions.push(event.version);
        }

        for event in events {
            record.events.insert(event.version, event.clone());
        }
        Ok(())
    }
}

/// A gateway that reports a fixed stream and records every call made to
/// it. Writes are accepted but not reflected in later reads.
#[derive(Debug)]
pub struct RecordingEventRepository<Id> {
    exists: bool,
    stored: Vec<StoredEvent>,
    calls: Mutex<Vec<&'static str>>,
    created: Mutex<Vec<(Id, String)>>,
    added: Mutex<Vec<(Id, Vec<StoredEvent>)>>,
}

impl<Id: StreamId> RecordingEventRepository<Id> {
    /// Creates a repository whose stream exists and holds `stored`.
    #[must_use]
    pub fn new(stored: Vec<StoredEvent>) -> Self {
        Self {
            exists: true,
            stored,
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            added: Mutex::new(Vec::new()),
        }
    }

    /// Creates a repository for which no stream exists.
    #[must_use]
    pub fn without_stream() -> Self {
        Self {
            exists: false,
            ..Self::new(Vec::new())
        }
    }

    /// Returns the names of the gateway methods called so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns every `create_stream` call.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn created_streams(&self) -> Vec<(Id, String)> {
        self.created.lock().unwrap().clone()
    }

    /// Returns every batch passed to `add`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn added_events(&self) -> Vec<(Id, Vec<StoredEvent>)> {
        self.added.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl<Id: StreamId> EventRepository for RecordingEventRepository<Id> {
    type Id = Id;

    async fn create_stream(&self, stream_id: &Id, stream_name: &str) -> Result<(), DomainError> {
        self.record("create_stream");
        self.created
            .lock()
            .unwrap()
            .push((stream_id.clone(), stream_name.to_owned()));
        Ok(())
    }

    async fn check_stream(&self, _stream_id: &Id) -> Result<bool, DomainError> {
        self.record("check_stream");
        Ok(self.exists)
    }

    async fn get_all(&self, _stream_id: &Id) -> Result<Vec<StoredEvent>, DomainError> {
        self.record("get_all");
        Ok(self.stored.clone())
    }

    async fn get_last(&self, _stream_id: &Id) -> Result<Option<StoredEvent>, DomainError> {
        self.record("get_last");
        Ok(self.stored.last().cloned())
    }

    async fn get_selected(
        &self,
        _stream_id: &Id,
        from_version: i64,
        to_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        self.record("get_selected");
        Ok(self
            .stored
            .iter()
            .filter(|e| e.version >= from_version && to_version.is_none_or(|to| e.version <= to))
            .cloned()
            .collect())
    }

    async fn add(&self, stream_id: &Id, events: &[StoredEvent]) -> Result<(), DomainError> {
        self.record("add");
        self.added
            .lock()
            .unwrap()
            .push((stream_id.clone(), events.to_vec()));
        Ok(())
    }
}

/// An event repository that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingEventRepository<Id>(PhantomData<fn() -> Id>);

impl<Id> FailingEventRepository<Id> {
    /// Creates a new failing repository.
    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<Id> Default for FailingEventRepository<Id> {
    fn default() -> Self {
        Self::new()
    }
}

fn connection_refused() -> DomainError {
    DomainError::Infrastructure("connection refused".into())
}

#[async_trait]
impl<Id: StreamId> EventRepository for FailingEventRepository<Id> {
    type Id = Id;

    async fn create_stream(&self, _stream_id: &Id, _stream_name: &str) -> Result<(), DomainError> {
        Err(connection_refused())
    }

    async fn check_stream(&self, _stream_id: &Id) -> Result<bool, DomainError> {
        Err(connection_refused())
    }

    async fn get_all(&self, _stream_id: &Id) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn get_last(&self, _stream_id: &Id) -> Result<Option<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn get_selected(
        &self,
        _stream_id: &Id,
        _from_version: i64,
        _to_version: Option<i64>,
    ) -> Result<Vec<StoredEvent>, DomainError> {
        Err(connection_refused())
    }

    async fn add(&self, _stream_id: &Id, _events: &[StoredEvent]) -> Result<(), DomainError> {
        Err(connection_refused())
    }
}
