pub mod add;
pub mod calendar;
pub mod delete;
pub mod edit;
pub mod list;
pub mod login;
pub mod logout;
pub mod register;
pub mod watch;
pub mod whoami;

use anyhow::Result;
use planapp_core::event::Event;
use planapp_core::store::{EventStore, SnapshotResult};
use tracing::warn;

async fn first_snapshot(store: &impl EventStore, uid: &str) -> Result<Option<SnapshotResult>> {
    let mut query = store.subscribe(uid).await?;
    let delivery = query.next().await;
    query.cancel();
    Ok(delivery)
}

/// Fetch one snapshot of the user's events, surfacing any backend failure.
///
/// Commands that use the snapshot as a write precondition (`edit`) call
/// this: a broken backend must be reported as such, never as a missing
/// event.
pub async fn fetch_snapshot(store: &impl EventStore, uid: &str) -> Result<Vec<Event>> {
    match first_snapshot(store, uid).await? {
        Some(Ok(events)) => Ok(events),
        Some(Err(error)) => Err(error.into()),
        None => Ok(Vec::new()),
    }
}

/// Display variant: a failed delivery degrades to an empty list (logged,
/// not fatal); only being unable to reach the provider binary at all is
/// an error.
pub async fn fetch_snapshot_or_empty(store: &impl EventStore, uid: &str) -> Result<Vec<Event>> {
    match first_snapshot(store, uid).await? {
        Some(Ok(events)) => Ok(events),
        Some(Err(error)) => {
            warn!(%error, "live query failed");
            Ok(Vec::new())
        }
        None => Ok(Vec::new()),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use planapp_core::error::{PlanError, PlanResult};
    use planapp_core::event::{EventChanges, EventDraft};
    use planapp_core::store::{LiveQuery, MemoryStore};
    use tokio::sync::mpsc;

    /// Subscriptions open fine but every delivery is an error, like a
    /// provider whose backend query fails.
    struct ErrorDeliveries;

    impl EventStore for ErrorDeliveries {
        async fn subscribe(&self, _uid: &str) -> PlanResult<LiveQuery> {
            let (tx, rx) = mpsc::channel(1);
            let producer = tokio::spawn(async move {
                let _ = tx
                    .send(Err(PlanError::Subscription("backend unreachable".into())))
                    .await;
            });
            Ok(LiveQuery::new(rx, producer))
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

    #[tokio::test]
    async fn snapshot_returns_the_users_events() {
        let store = MemoryStore::new();
        store
            .add_event(
                "user-1",
                EventDraft {
                    title: "Standup".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let events = fetch_snapshot(&store, "user-1").await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Standup");
    }

    #[tokio::test]
    async fn failed_delivery_is_an_error_for_write_preconditions() {
        let error = fetch_snapshot(&ErrorDeliveries, "user-1")
            .await
            .unwrap_err();
        assert!(error.to_string().contains("backend unreachable"));
    }

    #[tokio::test]
    async fn failed_delivery_degrades_to_empty_for_display() {
        let events = fetch_snapshot_or_empty(&ErrorDeliveries, "user-1")
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
