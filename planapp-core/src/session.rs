//! The session context.
//!
//! Current-user state is an explicitly constructed, explicitly passed object
//! with a subscribe/notify contract, not ambient global state. Components
//! that need to react to sign-in/sign-out hold a [`watch`] receiver and are
//! notified on every change.
//!
//! The CLI additionally persists the signed-in user between invocations as
//! `session.toml` under the user config dir ([`StoredSession`]).

use crate::error::{PlanError, PlanResult};
use crate::identity::AuthUser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::watch;

/// In-process session context: who is signed in right now.
#[derive(Debug)]
pub struct Session {
    users: watch::Sender<Option<AuthUser>>,
}

impl Session {
    pub fn new(initial: Option<AuthUser>) -> Self {
        let (users, _) = watch::channel(initial);
        Session { users }
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.users.borrow().clone()
    }

    /// Subscribe to user changes. The receiver sees the current value
    /// immediately and is notified on every sign-in/sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.users.subscribe()
    }

    pub fn sign_in(&self, user: AuthUser) {
        self.users.send_replace(Some(user));
    }

    pub fn sign_out(&self) {
        self.users.send_replace(None);
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(None)
    }
}

/// The session persisted between CLI invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub uid: String,
    pub email: Option<String>,
    /// Name of the backend provider the session was created with.
    pub provider: String,
}

impl StoredSession {
    fn path() -> PlanResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| PlanError::Config("could not determine config directory".into()))?;
        Ok(config_dir.join("planapp").join("session.toml"))
    }

    /// Load the stored session, or `None` when nobody is signed in.
    pub fn load() -> PlanResult<Option<StoredSession>> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let session =
            toml::from_str(&content).map_err(|e| PlanError::Serialization(e.to_string()))?;
        Ok(Some(session))
    }

    pub fn save(&self) -> PlanResult<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PlanError::Serialization(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn clear() -> PlanResult<()> {
        let path = Self::path()?;
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(())
    }

    pub fn user(&self) -> AuthUser {
        AuthUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: &str) -> AuthUser {
        AuthUser {
            uid: uid.to_string(),
            email: Some(format!("{uid}@example.com")),
        }
    }

    #[tokio::test]
    async fn subscribers_are_notified_of_changes() {
        let session = Session::default();
        let mut rx = session.subscribe();
        assert_eq!(*rx.borrow_and_update(), None);

        session.sign_in(user("user-1"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().uid, "user-1");

        session.sign_out();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), None);
    }

    #[test]
    fn current_user_reflects_latest_state() {
        let session = Session::default();
        assert!(session.current_user().is_none());

        session.sign_in(user("user-1"));
        assert_eq!(session.current_user().unwrap().uid, "user-1");

        session.sign_out();
        assert!(session.current_user().is_none());
    }

    #[test]
    fn stored_session_roundtrips_through_toml() {
        let stored = StoredSession {
            uid: "user-1".to_string(),
            email: Some("user-1@example.com".to_string()),
            provider: "firebase".to_string(),
        };
        let content = toml::to_string_pretty(&stored).unwrap();
        let parsed: StoredSession = toml::from_str(&content).unwrap();
        assert_eq!(parsed.uid, stored.uid);
        assert_eq!(parsed.email, stored.email);
        assert_eq!(parsed.provider, stored.provider);
    }
}
