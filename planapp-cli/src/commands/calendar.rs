//! Month-at-a-glance calendar view.
//!
//! Days with events are highlighted; `--day` drills into the day's list
//! (the calendar's day-selection mode, where title/status filters do not
//! apply).

use anyhow::Result;
use chrono::{Datelike, Local, NaiveDate};
use owo_colors::OwoColorize;
use planapp_core::event::Event;
use planapp_core::filter::{EventFilter, falls_on_day};
use planapp_core::remote::Provider;
use planapp_core::session::StoredSession;

use crate::render;
use crate::when;

use super::fetch_snapshot_or_empty;

pub async fn run(
    provider: &Provider,
    session: &StoredSession,
    month: Option<&str>,
    day: Option<&str>,
) -> Result<()> {
    let events = fetch_snapshot_or_empty(provider, &session.uid).await?;

    if let Some(day) = day {
        let day = when::parse_day(day)?;
        println!("{}\n", day.format("%A, %B %-d %Y").to_string().bold());
        let view = EventFilter::for_day(day).apply(&events);
        render::event_list(&view, Some(day));
        return Ok(());
    }

    let first = match month {
        Some(month) => when::parse_month(month)?,
        None => first_of_month(Local::now().date_naive()),
    };
    print_month(first, &events);
    Ok(())
}

fn print_month(first: NaiveDate, events: &[Event]) {
    let today = Local::now().date_naive();

    println!("      {}", first.format("%B %Y").to_string().bold());
    println!("{}", " Mo  Tu  We  Th  Fr  Sa  Su".dimmed());

    let offset = first.weekday().num_days_from_monday();
    let mut column = offset;
    print!("{}", "    ".repeat(offset as usize));

    let mut month_total = 0;
    for day_number in 1..=days_in_month(first) {
        let date = first.with_day(day_number).unwrap();
        let count = events.iter().filter(|e| falls_on_day(e, date)).count();
        month_total += count;

        let cell = format!("{day_number:>3}");
        if date == today {
            print!("{} ", cell.reversed());
        } else if count > 0 {
            print!("{} ", cell.green().bold());
        } else {
            print!("{cell} ");
        }

        column += 1;
        if column % 7 == 0 {
            println!();
        }
    }
    if column % 7 != 0 {
        println!();
    }

    println!(
        "\n{}",
        format!(
            "{} event{} in {}",
            month_total,
            if month_total == 1 { "" } else { "s" },
            first.format("%B")
        )
        .dimmed()
    );
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap()
}

fn days_in_month(first: NaiveDate) -> u32 {
    let (year, month) = (first.year(), first.month());
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .unwrap();
    next.signed_duration_since(first_of_month(first)).num_days() as u32
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_lengths() {
        let date = |y, m| NaiveDate::from_ymd_opt(y, m, 1).unwrap();
        assert_eq!(days_in_month(date(2025, 3)), 31);
        assert_eq!(days_in_month(date(2025, 4)), 30);
        assert_eq!(days_in_month(date(2025, 12)), 31);
        assert_eq!(days_in_month(date(2024, 2)), 29);
        assert_eq!(days_in_month(date(2025, 2)), 28);
    }

    #[test]
    fn first_of_month_snaps_back() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        assert_eq!(
            first_of_month(date),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
    }
}
