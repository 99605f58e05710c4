//! Edit an event.
//!
//! Flags that were not given keep the event's current value; the store call
//! itself always replaces all four mutable fields wholesale.

use anyhow::{Context, Result};
use planapp_core::event::EventChanges;
use planapp_core::remote::Provider;
use planapp_core::session::StoredSession;
use planapp_core::store::EventStore;

use crate::when;

use super::fetch_snapshot;

pub async fn run(
    provider: &Provider,
    session: &StoredSession,
    id: &str,
    title: Option<String>,
    description: Option<String>,
    at: Option<String>,
    state: Option<String>,
) -> Result<()> {
    let events = fetch_snapshot(provider, &session.uid)
        .await
        .context("Could not load events")?;
    let current = events
        .iter()
        .find(|e| e.id == id)
        .with_context(|| format!("No event with id '{id}'"))?;

    let changes = EventChanges {
        title: title.unwrap_or_else(|| current.title.clone()),
        description: description.unwrap_or_else(|| current.description.clone()),
        datetime: match at.as_deref() {
            Some(at) => when::parse_when(at)?,
            None => current.datetime,
        },
        state: state
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Invalid --state: {e}"))?
            .unwrap_or(current.state),
    };

    provider
        .update_event(&session.uid, id, changes)
        .await
        .context("Failed to update event")?;

    println!("Event updated.");
    Ok(())
}
