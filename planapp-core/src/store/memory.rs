//! In-process event store.
//!
//! Ephemeral reference implementation of [`EventStore`]: documents live in a
//! mutex-guarded table and every change fans a tick out to subscribers, each
//! of which re-delivers the full owner-scoped result set. Used by the test
//! suite and as an offline backend for demos; real deployments speak to a
//! hosted store through a provider binary.

use super::{EventStore, LiveQuery};
use crate::error::{PlanError, PlanResult};
use crate::event::{Document, Event, EventChanges, EventDraft};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

const SNAPSHOT_BUFFER: usize = 16;

#[derive(Clone)]
pub struct MemoryStore {
    documents: Arc<Mutex<Vec<Document>>>,
    changes: broadcast::Sender<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(SNAPSHOT_BUFFER);
        MemoryStore {
            documents: Arc::new(Mutex::new(Vec::new())),
            changes,
        }
    }

    fn notify(&self) {
        // No subscribers is fine; they would recompute from the table anyway.
        let _ = self.changes.send(());
    }

    fn snapshot_for(documents: &Mutex<Vec<Document>>, uid: &str) -> Vec<Event> {
        documents
            .lock()
            .expect("document table poisoned")
            .iter()
            .filter(|doc| {
                doc.fields.get("owner_id").and_then(Value::as_str) == Some(uid)
            })
            .cloned()
            .map(Event::from_document)
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl EventStore for MemoryStore {
    async fn subscribe(&self, uid: &str) -> PlanResult<LiveQuery> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        // Subscribe before the first snapshot so no change can fall between.
        let mut changes = self.changes.subscribe();
        let documents = self.documents.clone();
        let uid = uid.to_string();

        let producer = tokio::spawn(async move {
            loop {
                let snapshot = Self::snapshot_for(&documents, &uid);
                if tx.send(Ok(snapshot)).await.is_err() {
                    break;
                }
                match changes.recv().await {
                    Ok(()) => {}
                    // Snapshots are recomputed from scratch, so missed ticks
                    // collapse into the next delivery.
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(LiveQuery::new(rx, producer))
    }

    async fn add_event(&self, uid: &str, draft: EventDraft) -> PlanResult<String> {
        draft.validate()?;

        let id = Uuid::new_v4().to_string();
        let document = Document {
            id: id.clone(),
            fields: draft.into_fields(uid),
        };

        self.documents
            .lock()
            .expect("document table poisoned")
            .push(document);
        self.notify();
        Ok(id)
    }

    async fn update_event(&self, _uid: &str, id: &str, changes: EventChanges) -> PlanResult<()> {
        changes.validate()?;

        {
            let mut documents = self.documents.lock().expect("document table poisoned");
            let document = documents
                .iter_mut()
                .find(|doc| doc.id == id)
                .ok_or_else(|| PlanError::Store(format!("no document with id '{id}'")))?;
            merge_fields(&mut document.fields, changes.into_fields());
        }
        self.notify();
        Ok(())
    }

    async fn delete_event(&self, _uid: &str, id: &str) -> PlanResult<()> {
        self.documents
            .lock()
            .expect("document table poisoned")
            .retain(|doc| doc.id != id);
        self.notify();
        Ok(())
    }
}

fn merge_fields(fields: &mut Map<String, Value>, replacements: Map<String, Value>) {
    for (key, value) in replacements {
        fields.insert(key, value);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventState;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(1);

    fn draft(title: &str) -> EventDraft {
        EventDraft {
            title: title.to_string(),
            ..Default::default()
        }
    }

    async fn next_snapshot(query: &mut LiveQuery) -> Vec<Event> {
        timeout(WAIT, query.next())
            .await
            .expect("timed out waiting for snapshot")
            .expect("stream ended")
            .expect("snapshot error")
    }

    #[tokio::test]
    async fn create_defaults_datetime_to_now_and_state_to_regular() {
        let store = MemoryStore::new();
        let before = Utc::now();
        store.add_event("user-1", draft("Standup")).await.unwrap();

        let mut query = store.subscribe("user-1").await.unwrap();
        let snapshot = next_snapshot(&mut query).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "Standup");
        assert_eq!(snapshot[0].state, EventState::Regular);
        assert!(snapshot[0].datetime >= before && snapshot[0].datetime <= Utc::now());
    }

    #[tokio::test]
    async fn create_rejects_empty_title() {
        let store = MemoryStore::new();
        assert!(store.add_event("user-1", draft("  ")).await.is_err());
    }

    #[tokio::test]
    async fn subscription_is_scoped_to_owner() {
        let store = MemoryStore::new();
        store.add_event("user-1", draft("Mine")).await.unwrap();
        store.add_event("user-2", draft("Theirs")).await.unwrap();

        let mut query = store.subscribe("user-1").await.unwrap();
        let snapshot = next_snapshot(&mut query).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "Mine");
    }

    #[tokio::test]
    async fn changes_push_a_fresh_snapshot() {
        let store = MemoryStore::new();
        let mut query = store.subscribe("user-1").await.unwrap();
        assert!(next_snapshot(&mut query).await.is_empty());

        store.add_event("user-1", draft("Standup")).await.unwrap();
        let snapshot = next_snapshot(&mut query).await;
        assert_eq!(snapshot.len(), 1);

        store
            .delete_event("user-1", &snapshot[0].id)
            .await
            .unwrap();
        assert!(next_snapshot(&mut query).await.is_empty());
    }

    #[tokio::test]
    async fn update_replaces_fields_and_is_idempotent() {
        let store = MemoryStore::new();
        let id = store.add_event("user-1", draft("Standup")).await.unwrap();

        let changes = EventChanges {
            title: "Deploy".to_string(),
            description: "ship it".to_string(),
            datetime: Utc.with_ymd_and_hms(2025, 3, 21, 9, 0, 0).unwrap(),
            state: EventState::Urgent,
        };

        store
            .update_event("user-1", &id, changes.clone())
            .await
            .unwrap();
        store
            .update_event("user-1", &id, changes.clone())
            .await
            .unwrap();

        let mut query = store.subscribe("user-1").await.unwrap();
        let snapshot = next_snapshot(&mut query).await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "Deploy");
        assert_eq!(snapshot[0].description, "ship it");
        assert_eq!(snapshot[0].state, EventState::Urgent);
        assert_eq!(snapshot[0].datetime, changes.datetime);
        // Owner survives the wholesale field replacement.
        assert_eq!(snapshot[0].owner_id, "user-1");
    }

    #[tokio::test]
    async fn update_of_unknown_id_fails() {
        let store = MemoryStore::new();
        let changes = EventChanges {
            title: "Deploy".to_string(),
            description: String::new(),
            datetime: Utc::now(),
            state: EventState::Regular,
        };
        assert!(store.update_event("user-1", "nope", changes).await.is_err());
    }

    #[tokio::test]
    async fn delete_of_unknown_id_is_not_an_error() {
        let store = MemoryStore::new();
        store.delete_event("user-1", "nope").await.unwrap();
    }

    #[tokio::test]
    async fn canceled_query_stops_delivering() {
        let store = MemoryStore::new();
        let mut query = store.subscribe("user-1").await.unwrap();
        next_snapshot(&mut query).await;
        query.cancel();

        // Writes after cancellation must not go anywhere.
        store.add_event("user-1", draft("Standup")).await.unwrap();
    }
}
