//! Sign out: end the provider-side session and forget the stored one.

use anyhow::Result;
use planapp_core::identity::Identity;
use planapp_core::remote::Provider;
use planapp_core::session::StoredSession;
use tracing::warn;

pub async fn run() -> Result<()> {
    let Some(session) = StoredSession::load()? else {
        println!("Not signed in.");
        return Ok(());
    };

    // Provider-side sign-out failing is not worth keeping the user logged
    // in for; log it and clear the local session regardless.
    let provider = Provider::from_name(&session.provider);
    if let Err(error) = provider.sign_out(&session.uid).await {
        warn!(%error, "provider sign-out failed");
    }

    StoredSession::clear()?;
    println!("Signed out.");
    Ok(())
}
