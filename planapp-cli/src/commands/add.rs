//! Create a new event.

use anyhow::{Context, Result};
use planapp_core::event::EventDraft;
use planapp_core::remote::Provider;
use planapp_core::session::StoredSession;
use planapp_core::store::EventStore;

use crate::when;

pub async fn run(
    provider: &Provider,
    session: &StoredSession,
    title: String,
    description: Option<String>,
    at: Option<String>,
    state: Option<String>,
) -> Result<()> {
    let draft = EventDraft {
        title,
        description: description.unwrap_or_default(),
        datetime: at.as_deref().map(when::parse_when).transpose()?,
        state: state
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(|e| anyhow::anyhow!("Invalid --state: {e}"))?
            .unwrap_or_default(),
    };

    let id = provider
        .add_event(&session.uid, draft)
        .await
        .context("Failed to create event")?;

    println!("Event created: {id}");
    Ok(())
}
