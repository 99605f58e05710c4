//! Live synchronization between the session, the store and the view.
//!
//! [`EventFeed`] keeps the UI-facing event list consistent with the store:
//! it follows the session, holds exactly one subscription at a time, and
//! replaces the list wholesale on every delivered snapshot. Filtering is a
//! pure derivation on top (`view`), so it costs no extra round-trips.

use crate::event::Event;
use crate::filter::EventFilter;
use crate::identity::AuthUser;
use crate::store::EventStore;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The in-memory, UI-facing event list for the current user.
pub struct EventFeed {
    snapshot: watch::Receiver<Vec<Event>>,
    task: JoinHandle<()>,
}

impl EventFeed {
    /// Spawn the feed task, driven by session changes.
    ///
    /// Contract, in order of precedence:
    /// - no user: the list is cleared immediately, independent of any pending
    ///   delivery, so no stale data survives across accounts;
    /// - user change: the prior subscription is torn down before a new one is
    ///   opened, so the old query can never deliver into the next account's
    ///   view and there are no duplicate callbacks;
    /// - subscription failure or stream end: logged, list degrades to empty,
    ///   no retry until the session changes again.
    pub fn spawn<S>(store: Arc<S>, users: watch::Receiver<Option<AuthUser>>) -> Self
    where
        S: EventStore + 'static,
    {
        let (tx, snapshot) = watch::channel(Vec::new());
        let task = tokio::spawn(run(store, users, tx));
        EventFeed { snapshot, task }
    }

    /// The latest snapshot, in store delivery order.
    pub fn snapshot(&self) -> Vec<Event> {
        self.snapshot.borrow().clone()
    }

    /// Derive a filtered view from the latest snapshot.
    pub fn view(&self, filter: &EventFilter) -> Vec<Event> {
        filter.apply(&self.snapshot.borrow())
    }

    /// Subscribe to snapshot replacements (for render loops).
    pub fn subscribe(&self) -> watch::Receiver<Vec<Event>> {
        self.snapshot.clone()
    }
}

impl Drop for EventFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Why the per-user delivery loop stopped.
enum Stop {
    /// The session changed (or its sender went away).
    SessionChanged { closed: bool },
    /// The store ended the stream.
    StreamEnded,
}

async fn run<S>(
    store: Arc<S>,
    mut users: watch::Receiver<Option<AuthUser>>,
    tx: watch::Sender<Vec<Event>>,
) where
    S: EventStore,
{
    loop {
        let Some(user) = users.borrow_and_update().clone() else {
            tx.send_replace(Vec::new());
            if users.changed().await.is_err() {
                return;
            }
            continue;
        };

        let mut query = match store.subscribe(&user.uid).await {
            Ok(query) => query,
            Err(error) => {
                warn!(%error, uid = %user.uid, "could not open live query");
                tx.send_replace(Vec::new());
                if users.changed().await.is_err() {
                    return;
                }
                continue;
            }
        };
        debug!(uid = %user.uid, "live query opened");

        let stop = loop {
            tokio::select! {
                changed = users.changed() => {
                    // Clear before resubscribing so nothing from the old
                    // account is ever visible under the new one.
                    tx.send_replace(Vec::new());
                    break Stop::SessionChanged { closed: changed.is_err() };
                }
                delivery = query.next() => match delivery {
                    Some(Ok(events)) => {
                        tx.send_replace(events);
                    }
                    Some(Err(error)) => {
                        warn!(%error, uid = %user.uid, "live query error");
                        tx.send_replace(Vec::new());
                    }
                    None => {
                        debug!(uid = %user.uid, "live query ended");
                        tx.send_replace(Vec::new());
                        break Stop::StreamEnded;
                    }
                }
            }
        };

        // Mandatory teardown before anything else happens.
        drop(query);

        match stop {
            Stop::SessionChanged { closed: true } => return,
            Stop::SessionChanged { closed: false } => continue,
            Stop::StreamEnded => {
                if users.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PlanError, PlanResult};
    use crate::event::{EventChanges, EventDraft, EventState};
    use crate::session::Session;
    use crate::store::{LiveQuery, MemoryStore};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);

    fn user(uid: &str) -> AuthUser {
        AuthUser {
            uid: uid.to_string(),
            email: None,
        }
    }

    fn draft(title: &str) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            ..Default::default()
        }
    }

    /// Wait until the feed's snapshot satisfies a predicate.
    async fn wait_for<F>(feed: &EventFeed, predicate: F) -> Vec<Event>
    where
        F: Fn(&[Event]) -> bool,
    {
        let mut rx = feed.subscribe();
        timeout(WAIT, async {
            loop {
                {
                    let snapshot = rx.borrow_and_update();
                    if predicate(&snapshot) {
                        return snapshot.clone();
                    }
                }
                rx.changed().await.expect("feed went away");
            }
        })
        .await
        .expect("timed out waiting for snapshot")
    }

    /// A store whose subscriptions always fail.
    struct BrokenStore;

    impl EventStore for BrokenStore {
        async fn subscribe(&self, _uid: &str) -> PlanResult<LiveQuery> {
            Err(PlanError::Subscription("backend unreachable".into()))
        }

        async fn add_event(&self, _uid: &str, _draft: EventDraft) -> PlanResult<String> {
            Err(PlanError::Store("backend unreachable".into()))
        }

        async fn update_event(
            &self,
            _uid: &str,
            _id: &str,
            _changes: EventChanges,
        ) -> PlanResult<()> {
            Err(PlanError::Store("backend unreachable".into()))
        }

        async fn delete_event(&self, _uid: &str, _id: &str) -> PlanResult<()> {
            Err(PlanError::Store("backend unreachable".into()))
        }
    }

    /// Delegates reads to a `MemoryStore` but fails every write.
    struct FailingWrites(MemoryStore);

    impl EventStore for FailingWrites {
        async fn subscribe(&self, uid: &str) -> PlanResult<LiveQuery> {
            self.0.subscribe(uid).await
        }

        async fn add_event(&self, _uid: &str, _draft: EventDraft) -> PlanResult<String> {
            Err(PlanError::Store("simulated network error".into()))
        }

        async fn update_event(
            &self,
            _uid: &str,
            _id: &str,
            _changes: EventChanges,
        ) -> PlanResult<()> {
            Err(PlanError::Store("simulated network error".into()))
        }

        async fn delete_event(&self, _uid: &str, _id: &str) -> PlanResult<()> {
            Err(PlanError::Store("simulated network error".into()))
        }
    }

    #[tokio::test]
    async fn feed_tracks_store_changes() {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(Some(user("user-1")));
        let feed = EventFeed::spawn(store.clone(), session.subscribe());

        store.add_event("user-1", draft("Standup")).await.unwrap();
        let snapshot = wait_for(&feed, |s| s.len() == 1).await;
        assert_eq!(snapshot[0].title, "Standup");

        store.delete_event("user-1", &snapshot[0].id).await.unwrap();
        wait_for(&feed, |s| s.is_empty()).await;
    }

    #[tokio::test]
    async fn other_owners_events_never_appear() {
        let store = Arc::new(MemoryStore::new());
        store.add_event("user-1", draft("Mine")).await.unwrap();
        store.add_event("user-2", draft("Theirs")).await.unwrap();

        let session = Session::new(Some(user("user-1")));
        let feed = EventFeed::spawn(store.clone(), session.subscribe());

        let snapshot = wait_for(&feed, |s| !s.is_empty()).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "Mine");
        assert!(snapshot.iter().all(|e| e.owner_id == "user-1"));
    }

    #[tokio::test]
    async fn sign_out_clears_the_list_immediately() {
        let store = Arc::new(MemoryStore::new());
        store.add_event("user-1", draft("Standup")).await.unwrap();

        let session = Session::new(Some(user("user-1")));
        let feed = EventFeed::spawn(store.clone(), session.subscribe());
        wait_for(&feed, |s| !s.is_empty()).await;

        session.sign_out();
        wait_for(&feed, |s| s.is_empty()).await;
    }

    #[tokio::test]
    async fn switching_user_swaps_the_scope() {
        let store = Arc::new(MemoryStore::new());
        store.add_event("user-1", draft("Mine")).await.unwrap();
        store.add_event("user-2", draft("Theirs")).await.unwrap();

        let session = Session::new(Some(user("user-1")));
        let feed = EventFeed::spawn(store.clone(), session.subscribe());
        wait_for(&feed, |s| s.iter().any(|e| e.title == "Mine")).await;

        session.sign_in(user("user-2"));
        let snapshot = wait_for(&feed, |s| s.iter().any(|e| e.title == "Theirs")).await;
        assert!(snapshot.iter().all(|e| e.owner_id == "user-2"));
    }

    #[tokio::test]
    async fn failed_subscription_degrades_to_empty_list() {
        let session = Session::new(Some(user("user-1")));
        let feed = EventFeed::spawn(Arc::new(BrokenStore), session.subscribe());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(feed.snapshot().is_empty());
    }

    #[tokio::test]
    async fn failed_write_leaves_the_list_unchanged() {
        let inner = MemoryStore::new();
        inner.add_event("user-1", draft("Standup")).await.unwrap();
        let store = Arc::new(FailingWrites(inner));

        let session = Session::new(Some(user("user-1")));
        let feed = EventFeed::spawn(store.clone(), session.subscribe());
        let before = wait_for(&feed, |s| !s.is_empty()).await;

        let changes = EventChanges {
            title: "Deploy".to_string(),
            description: String::new(),
            datetime: before[0].datetime,
            state: EventState::Urgent,
        };
        let result = store.update_event("user-1", &before[0].id, changes).await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        let after = feed.snapshot();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn filtered_view_derives_from_latest_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.add_event("user-1", draft("Standup")).await.unwrap();
        store
            .add_event(
                "user-1",
                EventDraft {
                    title: "Deploy".to_string(),
                    state: EventState::Urgent,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let session = Session::new(Some(user("user-1")));
        let feed = EventFeed::spawn(store.clone(), session.subscribe());
        wait_for(&feed, |s| s.len() == 2).await;

        let filter = EventFilter {
            status: "urgent".parse().unwrap(),
            ..Default::default()
        };
        let view = feed.view(&filter);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].title, "Deploy");
    }
}
