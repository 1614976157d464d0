//! A small ticket aggregate keyed by string ids, shared by the integration
//! suites.

#![allow(dead_code)]

use std::sync::Arc;

use chronicle_core::aggregate::{Aggregate, AggregateRoot, AggregateState};
use chronicle_core::clock::Clock;
use chronicle_core::error::DomainError;
use chronicle_core::event::{DomainEvent, EventMetadata};
use chronicle_core::repository::EventRepository;
use chronicle_core::serializer::JsonEventSerializer;
use chronicle_core::store::EventStore;
use chronicle_test_support::{FixedClock, SequenceBatchIds, fixed_now};
use serde::{Deserialize, Serialize};

pub const TICKET_OPENED: &str = "support.ticket_opened";
pub const TICKET_COMMENTED: &str = "support.ticket_commented";
pub const TICKET_CLOSED: &str = "support.ticket_closed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opened {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commented {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TicketEventKind {
    Opened(Opened),
    Commented(Commented),
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketEvent {
    pub metadata: EventMetadata<String>,
    pub kind: TicketEventKind,
}

impl DomainEvent for TicketEvent {
    type Id = String;

    fn event_type(&self) -> &'static str {
        match self.kind {
            TicketEventKind::Opened(_) => TICKET_OPENED,
            TicketEventKind::Commented(_) => TICKET_COMMENTED,
            TicketEventKind::Closed => TICKET_CLOSED,
        }
    }

    fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match &self.kind {
            TicketEventKind::Opened(p) => serde_json::to_value(p),
            TicketEventKind::Commented(p) => serde_json::to_value(p),
            TicketEventKind::Closed => Ok(serde_json::json!({})),
        }
    }

    fn metadata(&self) -> &EventMetadata<String> {
        &self.metadata
    }
}

pub fn ticket_serializer() -> JsonEventSerializer<TicketEvent> {
    JsonEventSerializer::new()
        .register(TICKET_OPENED, |metadata, payload| {
            Ok(TicketEvent {
                metadata,
                kind: TicketEventKind::Opened(serde_json::from_value(payload)?),
            })
        })
        .register(TICKET_COMMENTED, |metadata, payload| {
            Ok(TicketEvent {
                metadata,
                kind: TicketEventKind::Commented(serde_json::from_value(payload)?),
            })
        })
        .register(TICKET_CLOSED, |metadata, _| {
            Ok(TicketEvent {
                metadata,
                kind: TicketEventKind::Closed,
            })
        })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketState {
    pub title: String,
    pub comments: Vec<String>,
    pub closed: bool,
}

impl AggregateState for TicketState {
    type Event = TicketEvent;

    const AGGREGATE_TYPE: &'static str = "support.ticket";

    fn apply(&mut self, event: &TicketEvent) -> Result<(), DomainError> {
        match &event.kind {
            TicketEventKind::Opened(p) => self.title.clone_from(&p.title),
            TicketEventKind::Commented(p) => self.comments.push(p.text.clone()),
            TicketEventKind::Closed => self.closed = true,
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Ticket {
    root: AggregateRoot<TicketState>,
}

impl Ticket {
    pub fn open(&mut self, title: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        let metadata = self.root.next_metadata(TICKET_OPENED, clock);
        self.root.when(TicketEvent {
            metadata,
            kind: TicketEventKind::Opened(Opened {
                title: title.to_owned(),
            }),
        })
    }

    pub fn comment(&mut self, text: &str, clock: &dyn Clock) -> Result<(), DomainError> {
        if self.root.state().closed {
            return Err(DomainError::InvalidState("ticket is closed".into()));
        }
        let metadata = self.root.next_metadata(TICKET_COMMENTED, clock);
        self.root.when(TicketEvent {
            metadata,
            kind: TicketEventKind::Commented(Commented {
                text: text.to_owned(),
            }),
        })
    }
}

impl Aggregate for Ticket {
    type State = TicketState;

    fn from_root(root: AggregateRoot<TicketState>) -> Self {
        Self { root }
    }

    fn root(&self) -> &AggregateRoot<TicketState> {
        &self.root
    }

    fn root_mut(&mut self) -> &mut AggregateRoot<TicketState> {
        &mut self.root
    }
}

pub fn opened(stream_id: &str, version: i64, title: &str) -> TicketEvent {
    TicketEvent {
        metadata: EventMetadata::new(stream_id.to_owned(), version, fixed_now(), TICKET_OPENED),
        kind: TicketEventKind::Opened(Opened {
            title: title.to_owned(),
        }),
    }
}

pub fn commented(stream_id: &str, version: i64, text: &str) -> TicketEvent {
    TicketEvent {
        metadata: EventMetadata::new(stream_id.to_owned(), version, fixed_now(), TICKET_COMMENTED),
        kind: TicketEventKind::Commented(Commented {
            text: text.to_owned(),
        }),
    }
}

pub fn clock() -> FixedClock {
    FixedClock::default()
}

pub fn ticket_store(
    repository: Arc<dyn EventRepository<Id = String>>,
) -> EventStore<TicketEvent> {
    EventStore::new(
        repository,
        Arc::new(ticket_serializer()),
        Arc::new(SequenceBatchIds::new()),
    )
}
