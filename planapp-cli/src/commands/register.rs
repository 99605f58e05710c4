//! Create a new account with email and password.

use anyhow::{Context, Result};
use planapp_core::identity::Identity;
use planapp_core::remote::Provider;

use super::login::{display_name, store_session};

pub async fn run(provider_name: &str) -> Result<()> {
    let provider = Provider::from_name(provider_name);

    let email: String = dialoguer::Input::new()
        .with_prompt("Email")
        .interact_text()?;
    let password = rpassword::prompt_password("Password: ")?;
    let confirmation = rpassword::prompt_password("Confirm password: ")?;

    if password != confirmation {
        anyhow::bail!("Passwords do not match");
    }

    let user = provider
        .register(&email, &password)
        .await
        .context("Registration failed")?;

    store_session(provider_name, &user)?;
    println!("Account created. Signed in as {}", display_name(&user));
    Ok(())
}
