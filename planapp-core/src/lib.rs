//! Core types and live-sync engine for the planapp ecosystem.
//!
//! This crate provides everything shared by the planapp CLI and backend
//! providers:
//! - `Event` and related types, with normalization at the store boundary
//! - the pure view filters (`EventFilter`)
//! - the session context (`Session`) and the `Identity` collaborator seam
//! - the `EventStore` seam with cancelable live queries, plus the
//!   in-process `MemoryStore`
//! - `remote` module for the CLI-provider communication protocol

pub mod error;
pub mod event;
pub mod filter;
pub mod identity;
pub mod live;
pub mod remote;
pub mod session;
pub mod store;

pub use error::{PlanError, PlanResult};
pub use event::{Document, Event, EventChanges, EventDraft, EventState};
pub use filter::{EventFilter, StatusFilter};
pub use identity::{AuthUser, FederatedChallenge, Identity};
pub use live::EventFeed;
pub use session::Session;
pub use store::{EventStore, LiveQuery};
