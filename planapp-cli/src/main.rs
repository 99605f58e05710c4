mod commands;
mod render;
mod when;

use anyhow::Result;
use clap::{Parser, Subcommand};
use planapp_core::filter::EventFilter;
use planapp_core::remote::Provider;
use planapp_core::session::StoredSession;
use tracing_subscriber::EnvFilter;

const DEFAULT_PROVIDER: &str = "firebase";

#[derive(Parser)]
#[command(name = "planapp")]
#[command(about = "Plan and track your events from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in to your account
    Login {
        /// Sign in with your Google account instead of a password
        #[arg(long)]
        google: bool,

        /// Backend provider to sign in with
        #[arg(long, default_value = DEFAULT_PROVIDER)]
        provider: String,
    },
    /// Create a new account
    Register {
        /// Backend provider to register with
        #[arg(long, default_value = DEFAULT_PROVIDER)]
        provider: String,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// List your events, optionally filtered
    List {
        /// Only events on this day (YYYY-MM-DD); disables the other filters
        #[arg(long)]
        day: Option<String>,

        /// Case-insensitive title substring
        #[arg(long)]
        title: Option<String>,

        /// Status filter: all, regular, necessary or urgent
        #[arg(long, default_value = "all")]
        status: String,
    },
    /// Show a month of events at a glance
    Calendar {
        /// Month to show (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Also list the events of one day (YYYY-MM-DD)
        #[arg(long)]
        day: Option<String>,
    },
    /// Create a new event
    Add {
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Date/time of the event (e.g. "2025-03-20T15:00" or "tomorrow 9am");
        /// defaults to now
        #[arg(long)]
        at: Option<String>,

        /// Priority state: regular, necessary or urgent
        #[arg(long)]
        state: Option<String>,
    },
    /// Edit an event (unspecified fields keep their current value)
    Edit {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// New date/time of the event
        #[arg(long)]
        at: Option<String>,

        /// New priority state
        #[arg(long)]
        state: Option<String>,
    },
    /// Delete an event
    Delete { id: String },
    /// Follow your events live, re-rendering on every change
    Watch {
        /// Only events on this day (YYYY-MM-DD); disables the other filters
        #[arg(long)]
        day: Option<String>,

        /// Case-insensitive title substring
        #[arg(long)]
        title: Option<String>,

        /// Status filter: all, regular, necessary or urgent
        #[arg(long, default_value = "all")]
        status: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Login { google, provider } => commands::login::run(&provider, google).await,
        Commands::Register { provider } => commands::register::run(&provider).await,
        Commands::Logout => commands::logout::run().await,
        Commands::Whoami => commands::whoami::run(),
        Commands::List { day, title, status } => {
            let (session, provider) = require_session()?;
            let filter = build_filter(day.as_deref(), title, &status)?;
            commands::list::run(&provider, &session, &filter).await
        }
        Commands::Calendar { month, day } => {
            let (session, provider) = require_session()?;
            commands::calendar::run(&provider, &session, month.as_deref(), day.as_deref()).await
        }
        Commands::Add {
            title,
            description,
            at,
            state,
        } => {
            let (session, provider) = require_session()?;
            commands::add::run(&provider, &session, title, description, at, state).await
        }
        Commands::Edit {
            id,
            title,
            description,
            at,
            state,
        } => {
            let (session, provider) = require_session()?;
            commands::edit::run(&provider, &session, &id, title, description, at, state).await
        }
        Commands::Delete { id } => {
            let (session, provider) = require_session()?;
            commands::delete::run(&provider, &session, &id).await
        }
        Commands::Watch { day, title, status } => {
            let (session, provider) = require_session()?;
            let filter = build_filter(day.as_deref(), title, &status)?;
            commands::watch::run(provider, &session, filter).await
        }
    }
}

/// Load the stored session or point the user at `planapp login`.
fn require_session() -> Result<(StoredSession, Provider)> {
    match StoredSession::load()? {
        Some(session) => {
            let provider = Provider::from_name(&session.provider);
            Ok((session, provider))
        }
        None => anyhow::bail!(
            "Not signed in.\n\n\
            Sign in with:\n  \
            planapp login\n\n\
            or create an account with:\n  \
            planapp register"
        ),
    }
}

fn build_filter(day: Option<&str>, title: Option<String>, status: &str) -> Result<EventFilter> {
    Ok(EventFilter {
        day: day.map(when::parse_day).transpose()?,
        title,
        status: status
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid --status: {e}"))?,
    })
}
