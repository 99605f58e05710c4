//! Terminal rendering of event views.

use chrono::{DateTime, Local, NaiveDate, Utc};
use owo_colors::OwoColorize;
use planapp_core::event::{Event, EventState};

/// Render a filtered list of events, in store delivery order.
///
/// `day` only affects the empty-state wording: a day view with no events is
/// a normal outcome, not a failed filter.
pub fn event_list(events: &[Event], day: Option<NaiveDate>) {
    if events.is_empty() {
        match day {
            Some(day) => println!(
                "{}",
                format!("No events scheduled for {}.", day.format("%a %b %-d")).dimmed()
            ),
            None => println!("{}", "No events match your filters.".dimmed()),
        }
        return;
    }

    for event in events {
        event_line(event);
    }
}

fn event_line(event: &Event) {
    let marker = state_marker(event.state);
    let time = format_time(&event.datetime);

    println!(
        "{} {}  {}  {}  {}",
        marker,
        time.dimmed(),
        event.title.bold(),
        state_label(event.state),
        format!("({})", event.id).dimmed()
    );
    if !event.description.is_empty() {
        println!("    {}", event.description.dimmed());
    }
}

/// Colored priority marker: urgent red, necessary yellow, regular green
/// (same scheme the state labels use everywhere else).
fn state_marker(state: EventState) -> String {
    match state {
        EventState::Urgent => "●".red().to_string(),
        EventState::Necessary => "●".yellow().to_string(),
        EventState::Regular => "●".green().to_string(),
    }
}

fn state_label(state: EventState) -> String {
    match state {
        EventState::Urgent => state.as_str().red().to_string(),
        EventState::Necessary => state.as_str().yellow().to_string(),
        EventState::Regular => state.as_str().green().to_string(),
    }
}

fn format_time(datetime: &DateTime<Utc>) -> String {
    datetime
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}
