//! Flat, filterable event list.

use anyhow::Result;
use planapp_core::filter::EventFilter;
use planapp_core::remote::Provider;
use planapp_core::session::StoredSession;

use crate::render;

use super::fetch_snapshot_or_empty;

pub async fn run(
    provider: &Provider,
    session: &StoredSession,
    filter: &EventFilter,
) -> Result<()> {
    let events = fetch_snapshot_or_empty(provider, &session.uid).await?;
    let view = filter.apply(&events);
    render::event_list(&view, filter.day);
    Ok(())
}
