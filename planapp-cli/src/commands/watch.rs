//! Follow the event list live, re-rendering on every pushed snapshot.

use anyhow::Result;
use owo_colors::OwoColorize;
use planapp_core::filter::EventFilter;
use planapp_core::live::EventFeed;
use planapp_core::remote::Provider;
use planapp_core::session::{Session, StoredSession};
use std::sync::Arc;

use crate::render;

pub async fn run(provider: Provider, stored: &StoredSession, filter: EventFilter) -> Result<()> {
    let session = Session::new(Some(stored.user()));
    let feed = EventFeed::spawn(Arc::new(provider), session.subscribe());
    let mut snapshots = feed.subscribe();

    loop {
        render_screen(&feed, &filter);

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    anyhow::bail!("Event feed ended unexpectedly");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }
}

fn render_screen(feed: &EventFeed, filter: &EventFilter) {
    // Clear and home, terminal-dashboard style.
    print!("\x1b[2J\x1b[H");
    println!(
        "{} {}",
        "watching".dimmed(),
        chrono::Local::now().format("%H:%M:%S").to_string().dimmed()
    );

    let view = feed.view(filter);
    render::event_list(&view, filter.day);
}
