//! Merge observability events.
//!
//! The orchestrator publishes one event per completed pass and one at the end
//! of every finalize loop. Subscribers receive events over bounded channels;
//! emission uses `try_send` and never blocks a merge pass.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

/// Which loop produced a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// A batch from one imported source.
    Source,
    /// One iteration of the whole-set finalize loop.
    Known,
}

/// Event emitted by a `MergeOrchestrator`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergeEvent {
    /// A pass finished its perform phase.
    PassCompleted {
        /// Loop that ran the pass.
        kind: PassKind,
        /// Source name for source passes, iteration number for finalize passes.
        label: String,
        /// Player merges applied.
        player_merges: usize,
        /// Team merges applied.
        team_merges: usize,
        /// Entities added to the reference sets.
        added: usize,
        /// Completion time.
        at: DateTime<Utc>,
    },
    /// The finalize loop reached a pass with zero merges.
    Converged {
        /// Passes run, including the final zero-merge pass.
        passes: usize,
        /// Completion time.
        at: DateTime<Utc>,
    },
    /// The finalize loop hit its iteration cap.
    ConvergenceFailed {
        /// Passes run.
        iterations: usize,
        /// Configured cap.
        cap: usize,
        /// Time the cap was hit.
        at: DateTime<Utc>,
    },
}

/// Fan-out of `MergeEvent`s to bounded subscriber channels.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<MergeEvent>>,
    dropped: AtomicU64,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber buffering at most `capacity` events.
    pub fn subscribe(&mut self, capacity: usize) -> Receiver<MergeEvent> {
        let (tx, rx) = bounded(capacity.max(1));
        self.subscribers.push(tx);
        rx
    }

    /// Delivers `event` to every subscriber without blocking.
    ///
    /// A full subscriber misses the event; a disconnected one is removed.
    /// Both count toward `dropped`.
    pub fn emit(&mut self, event: &MergeEvent) {
        let dropped = &self.dropped;
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        });
    }

    /// Events that could not be delivered.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Live subscriber count.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
