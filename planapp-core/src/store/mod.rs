//! The document-store collaborator seam.
//!
//! The store is the sole source of truth: reads arrive as full snapshots
//! pushed through a [`LiveQuery`], never as diffs, and writes are plain
//! request/response calls with no optimistic local mutation.

mod memory;

pub use memory::MemoryStore;

use crate::error::PlanResult;
use crate::event::{Event, EventChanges, EventDraft};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A snapshot delivery: the complete current result set, or the error that
/// ended it. Consumers replace their local list wholesale on every `Ok`.
pub type SnapshotResult = PlanResult<Vec<Event>>;

/// Operations consumed from the external document store.
///
/// Events are visible only through a subscription scoped to their owner;
/// owner checks on writes are the backend's concern, not enforced here.
pub trait EventStore: Send + Sync {
    /// Open a live query for the given user's events. Each delivery replaces
    /// the previous one; the handle must be canceled (or dropped) when the
    /// consumer goes away or changes user.
    fn subscribe(&self, uid: &str) -> impl Future<Output = PlanResult<LiveQuery>> + Send;

    /// Create an event from a draft. Validates the required title, attaches
    /// `owner_id = uid`, fills defaults, and returns the assigned id.
    fn add_event(&self, uid: &str, draft: EventDraft)
    -> impl Future<Output = PlanResult<String>> + Send;

    /// Replace an event's mutable fields wholesale.
    fn update_event(
        &self,
        uid: &str,
        id: &str,
        changes: EventChanges,
    ) -> impl Future<Output = PlanResult<()>> + Send;

    /// Delete an event. Irreversible; deleting an absent id is not an error.
    fn delete_event(&self, uid: &str, id: &str) -> impl Future<Output = PlanResult<()>> + Send;
}

/// A cancelable handle over a stream of full snapshots.
///
/// Dropping the handle tears the subscription down; no further deliveries
/// can arrive after that, which is what prevents duplicate callbacks and
/// cross-account leakage on user change.
pub struct LiveQuery {
    rx: mpsc::Receiver<SnapshotResult>,
    _guard: SubscriptionGuard,
}

impl LiveQuery {
    /// Wrap a snapshot channel and the producer task feeding it.
    pub fn new(rx: mpsc::Receiver<SnapshotResult>, producer: JoinHandle<()>) -> Self {
        LiveQuery {
            rx,
            _guard: SubscriptionGuard(producer),
        }
    }

    /// Wait for the next snapshot. `None` means the stream ended.
    pub async fn next(&mut self) -> Option<SnapshotResult> {
        self.rx.recv().await
    }

    /// Explicit teardown. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

struct SubscriptionGuard(JoinHandle<()>);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
