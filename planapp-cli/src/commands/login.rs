//! Sign in with a password or through the federated browser flow.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use planapp_core::identity::{AuthUser, Identity};
use planapp_core::remote::Provider;
use planapp_core::session::StoredSession;
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

const REDIRECT_PORT: u16 = 8085;

pub async fn run(provider_name: &str, google: bool) -> Result<()> {
    let provider = Provider::from_name(provider_name);

    let user = if google {
        federated_sign_in(&provider).await?
    } else {
        let email: String = dialoguer::Input::new()
            .with_prompt("Email")
            .interact_text()?;
        let password = rpassword::prompt_password("Password: ")?;

        provider
            .sign_in(&email, &password)
            .await
            .context("Sign-in failed")?
    };

    store_session(provider_name, &user)?;
    println!("Signed in as {}", display_name(&user));
    Ok(())
}

pub fn store_session(provider_name: &str, user: &AuthUser) -> Result<()> {
    StoredSession {
        uid: user.uid.clone(),
        email: user.email.clone(),
        provider: provider_name.to_string(),
    }
    .save()?;
    Ok(())
}

pub fn display_name(user: &AuthUser) -> String {
    user.email.clone().unwrap_or_else(|| user.uid.clone())
}

/// The browser redirect dance: ask the provider for an authorization URL,
/// send the user there, collect the code on a localhost callback, and hand
/// it back to the provider.
async fn federated_sign_in(provider: &Provider) -> Result<AuthUser> {
    let redirect_uri = format!("http://localhost:{REDIRECT_PORT}/callback");

    let challenge = provider
        .federated_init(&redirect_uri)
        .await
        .context("Could not start federated sign-in")?;

    println!("Open this URL in your browser to sign in:\n");
    println!("{}\n", challenge.authorization_url);

    if open::that(&challenge.authorization_url).is_err() {
        println!("(Could not open browser automatically, please copy the URL above)");
    }

    let spinner = ProgressBar::new_spinner()
        .with_style(ProgressStyle::default_spinner())
        .with_message("Waiting for browser sign-in...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let params = wait_for_callback(REDIRECT_PORT).await?;
    spinner.finish_and_clear();

    let code = params
        .get("code")
        .ok_or_else(|| anyhow::anyhow!("No code in callback"))?;
    let state = params
        .get("state")
        .ok_or_else(|| anyhow::anyhow!("No state in callback"))?;

    if state != &challenge.state {
        anyhow::bail!("OAuth state mismatch - possible CSRF attack");
    }

    println!("Received authorization code, completing sign-in...");

    provider
        .federated_submit(code, &redirect_uri)
        .await
        .context("Federated sign-in failed")
}

/// Accept one HTTP request on localhost and return its query parameters.
async fn wait_for_callback(port: u16) -> Result<HashMap<String, String>> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .with_context(|| format!("Could not listen on port {port}"))?;

    let (mut stream, _) = listener.accept().await?;

    let mut reader = BufReader::new(&mut stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // "GET /callback?code=...&state=... HTTP/1.1"
    let path = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("Malformed callback request"))?;

    let url = url::Url::parse(&format!("http://localhost{path}"))?;
    let params: HashMap<String, String> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let body = "You are signed in. You can close this tab.";
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;

    Ok(params)
}
