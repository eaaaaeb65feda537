#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Observer channel for session, navigation and content events.
//!
//! Every published event gets a sequence number and lands in a bounded ring
//! as well as on a `tokio::broadcast` channel. Observers that attach late
//! (a view mounted after sign-in) ask for everything after a known sequence
//! number and then continue live. Overflow drops the oldest entries.

pub mod payloads;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast::{self, Receiver, Sender, error::RecvError};

pub use payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

/// Cloneable handle to one event channel.
#[derive(Clone)]
pub struct EventBus {
    live: Sender<EventEnvelope>,
    ring: Arc<Mutex<VecDeque<EventEnvelope>>>,
    seq: Arc<AtomicU64>,
    ring_len: usize,
}

impl EventBus {
    /// Bus keeping the last `capacity` events (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let ring_len = capacity.max(1);
        let (live, _) = broadcast::channel(ring_len);
        Self {
            live,
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(ring_len))),
            seq: Arc::new(AtomicU64::new(0)),
            ring_len,
        }
    }

    /// Bus with [`DEFAULT_REPLAY_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    fn ring(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `event` and fan it out; returns its sequence number.
    pub fn publish(&self, event: Event) -> EventId {
        let id = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(event_id = id, kind = event.kind(), "event");
        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        {
            let mut ring = self.ring();
            if ring.len() >= self.ring_len {
                ring.pop_front();
            }
            ring.push_back(envelope.clone());
        }
        // Sending fails only when nobody listens.
        let _ = self.live.send(envelope);
        id
    }

    /// Observe future events, first replaying retained ones after `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let live = self.live.subscribe();
        let pending = since_id.map_or_else(VecDeque::new, |since| {
            self.ring()
                .iter()
                .filter(|envelope| envelope.id > since)
                .cloned()
                .collect()
        });
        EventStream {
            pending,
            live,
            cursor: since_id,
        }
    }

    /// Sequence number of the newest retained event.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.ring().back().map(|envelope| envelope.id)
    }

    /// Retained events, oldest first.
    #[must_use]
    pub fn recent(&self) -> Vec<EventEnvelope> {
        self.ring().iter().cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered view over replayed and live events.
pub struct EventStream {
    pending: VecDeque<EventEnvelope>,
    live: Receiver<EventEnvelope>,
    cursor: Option<EventId>,
}

impl EventStream {
    /// Next event in sequence order; `None` once every bus handle is gone.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.pending.pop_front() {
            self.cursor = Some(envelope.id);
            return Some(envelope);
        }
        loop {
            match self.live.recv().await {
                Ok(envelope) if self.cursor.is_some_and(|seen| envelope.id <= seen) => {}
                Ok(envelope) => {
                    self.cursor = Some(envelope.id);
                    return Some(envelope);
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event observer fell behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
