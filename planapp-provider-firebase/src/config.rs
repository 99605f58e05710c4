//! App-level configuration for the Firebase provider.
//!
//! User-provided project settings stored at:
//!   ~/.config/planapp/providers/firebase/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Firebase project settings (user-provided).
///
/// The OAuth client fields are only needed for federated (Google) sign-in;
/// password sign-in works with just the API key and project id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
}

pub fn base_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("planapp")
        .join("providers")
        .join("firebase"))
}

pub fn load() -> Result<FirebaseConfig> {
    let path = base_dir()?.join("config.toml");

    if !path.exists() {
        anyhow::bail!(
            "Firebase project settings not found.\n\n\
            Create {} with:\n\n\
            api_key = \"your-web-api-key\"\n\
            project_id = \"your-project-id\"\n\n\
            Optionally, for Google sign-in:\n\n\
            oauth_client_id = \"your-client-id.apps.googleusercontent.com\"\n\
            oauth_client_secret = \"your-client-secret\"\n\n\
            Both values are under Project settings in the Firebase console.",
            path.display()
        );
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;

    let config: FirebaseConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

    Ok(config)
}

impl FirebaseConfig {
    /// OAuth client credentials, required for federated sign-in.
    pub fn oauth_client(&self) -> Result<(String, String)> {
        match (&self.oauth_client_id, &self.oauth_client_secret) {
            (Some(id), Some(secret)) => Ok((id.clone(), secret.clone())),
            _ => anyhow::bail!(
                "Google sign-in requires oauth_client_id and oauth_client_secret \
                in the firebase provider settings."
            ),
        }
    }
}
