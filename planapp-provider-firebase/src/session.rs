//! Per-account Firebase token storage.
//!
//! One TOML file per signed-in account:
//!   ~/.config/planapp/providers/firebase/sessions/{uid}.toml

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::auth;
use crate::config::base_dir;

/// ID tokens are refreshed this long before their actual expiry so that
/// a token handed to a Firestore call does not expire mid-request.
const REFRESH_MARGIN_SECS: i64 = 60;

pub struct Session {
    uid: String,
    data: SessionData,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionData {
    pub fn from_tokens(
        email: Option<String>,
        id_token: String,
        refresh_token: String,
        expires_in: i64,
    ) -> Self {
        SessionData {
            email,
            id_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(expires_in),
        }
    }
}

fn path_for_uid(uid: &str) -> Result<PathBuf> {
    let uid_slug = uid.replace(['/', '\\', ':'], "_");

    Ok(base_dir()?
        .join("sessions")
        .join(format!("{}.toml", uid_slug)))
}

impl Session {
    pub fn new(uid: &str, data: SessionData) -> Self {
        Session {
            uid: uid.to_string(),
            data,
        }
    }

    // Load a session and refresh the id token if it is about to expire:
    pub async fn load_valid(uid: &str) -> Result<Self> {
        let mut session = Self::load(uid)?;

        if session.is_expiring() {
            session.refresh().await?;
        }

        Ok(session)
    }

    fn load(uid: &str) -> Result<Self> {
        let path = path_for_uid(uid)?;

        if !path.exists() {
            anyhow::bail!("No Firebase session for {}. Sign in first.", uid);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session from {}", path.display()))?;

        let data: SessionData = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse session from {}", path.display()))?;

        Ok(Session {
            uid: uid.to_string(),
            data,
        })
    }

    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(&self.data).context("Failed to serialize session")?;

        let path = path_for_uid(&self.uid)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write session to {}", path.display()))?;

        // Set to owner-only (0600) since file contains auth tokens:
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }

    pub fn id_token(&self) -> &str {
        &self.data.id_token
    }

    fn is_expiring(&self) -> bool {
        Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS) >= self.data.expires_at
    }

    async fn refresh(&mut self) -> Result<()> {
        let tokens = auth::refresh_id_token(&self.data.refresh_token).await?;

        self.data.id_token = tokens.id_token;
        self.data.refresh_token = tokens.refresh_token;
        self.data.expires_at = Utc::now() + Duration::seconds(tokens.expires_in);
        self.save()?;

        Ok(())
    }
}

/// Remove the stored session for an account. Missing file is not an error.
pub fn delete(uid: &str) -> Result<()> {
    let path = path_for_uid(uid)?;

    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove session at {}", path.display()))?;
    }

    Ok(())
}
