//! Communication with external backend providers.
//!
//! A provider is any executable named `planapp-provider-<name>` on PATH that
//! speaks the JSON protocol in [`protocol`]. Providers own every vendor
//! concern (credentials, tokens, wire formats); this side only sees
//! [`Document`](crate::event::Document) records and [`AuthUser`](crate::identity::AuthUser)s.

pub mod protocol;
pub mod provider;

pub use provider::Provider;
