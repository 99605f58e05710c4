//! Delete an event. No undo, no trash.

use anyhow::{Context, Result};
use planapp_core::remote::Provider;
use planapp_core::session::StoredSession;
use planapp_core::store::EventStore;

pub async fn run(provider: &Provider, session: &StoredSession, id: &str) -> Result<()> {
    provider
        .delete_event(&session.uid, id)
        .await
        .context("Failed to delete event")?;

    println!("Event deleted.");
    Ok(())
}
