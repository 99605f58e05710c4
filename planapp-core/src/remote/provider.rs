//! Provider subprocess client.
//!
//! This module handles communication with external provider binaries
//! (e.g., `planapp-provider-firebase`) using JSON over stdin/stdout.
//!
//! The protocol is designed to be language-agnostic: any executable that
//! speaks the JSON protocol can be a backend. Providers manage their own
//! credentials and tokens; this side never sees them.

use crate::error::{PlanError, PlanResult};
use crate::event::{Event, EventChanges, EventDraft};
use crate::identity::{AuthUser, FederatedChallenge, Identity};
use crate::remote::protocol::{
    AddEvent, Command, DeleteEvent, FederatedInit, FederatedSubmit, ProviderCommand, Register,
    Request, Response, SignIn, SignOut, Subscribe, UpdateEvent,
};
use crate::store::{EventStore, LiveQuery, SnapshotResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command as TokioCommand;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::debug;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
/// No tight timeout for auth commands since they can involve user interaction.
const AUTH_TIMEOUT: Duration = Duration::from_secs(300);

const SNAPSHOT_BUFFER: usize = 16;

/// Handle to a backend provider binary, looked up on PATH by name.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    fn binary_path(&self) -> PlanResult<std::path::PathBuf> {
        let binary_name = format!("planapp-provider-{}", self.0);
        let binary_path = which::which(&binary_name).map_err(|_| {
            PlanError::ProviderNotInstalled(format!(
                "Provider '{}' not found. Install it with:\n  cargo install {}",
                self.0, binary_name
            ))
        })?;
        Ok(binary_path)
    }

    /// Call a typed provider command and return the raw response.
    async fn call<C: ProviderCommand>(&self, cmd: C) -> PlanResult<Response<C::Response>> {
        timeout(PROVIDER_TIMEOUT, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| PlanError::ProviderTimeout(PROVIDER_TIMEOUT.as_secs()))?
    }

    /// Same without the tight timeout, for commands that wait on a human.
    async fn call_slow<C: ProviderCommand>(&self, cmd: C) -> PlanResult<Response<C::Response>> {
        timeout(AUTH_TIMEOUT, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| PlanError::ProviderTimeout(AUTH_TIMEOUT.as_secs()))?
    }

    /// Low-level one-shot call: spawn, send the request, await the response.
    async fn call_raw<P: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> PlanResult<Response<R>> {
        let params =
            serde_json::to_value(params).map_err(|e| PlanError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json =
            serde_json::to_string(&request).map_err(|e| PlanError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;

        let mut child = TokioCommand::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .map_err(|e| {
                PlanError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        // Write request to stdin (unwrap safe: we piped stdin above)
        let mut stdin = child.stdin.take().unwrap();
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(PlanError::Provider(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.is_empty() {
            return Err(PlanError::Provider("Provider returned no response".into()));
        }

        serde_json::from_str(&response_str)
            .map_err(|e| PlanError::Provider(format!("Failed to parse response: {}", e)))
    }
}

/// Decode one stdout line of a subscribed provider into a snapshot
/// delivery. This is the store-to-domain boundary: documents are decoded
/// and normalized exactly once, right here.
fn decode_snapshot_line(line: &str) -> SnapshotResult {
    match serde_json::from_str::<Response<Vec<crate::event::Document>>>(line) {
        Ok(Response::Success { data }) => {
            Ok(data.into_iter().map(Event::from_document).collect())
        }
        Ok(Response::Error { error }) => Err(PlanError::Subscription(error)),
        Err(e) => Err(PlanError::Subscription(format!("malformed snapshot: {e}"))),
    }
}

fn auth_result<T>(response: Response<T>) -> PlanResult<T> {
    match response {
        Response::Success { data } => Ok(data),
        Response::Error { error } => Err(PlanError::Auth(error)),
    }
}

fn store_result<T>(response: Response<T>) -> PlanResult<T> {
    match response {
        Response::Success { data } => Ok(data),
        Response::Error { error } => Err(PlanError::Store(error)),
    }
}

impl Identity for Provider {
    async fn sign_in(&self, email: &str, password: &str) -> PlanResult<AuthUser> {
        auth_result(
            self.call_slow(SignIn {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?,
        )
    }

    async fn register(&self, email: &str, password: &str) -> PlanResult<AuthUser> {
        auth_result(
            self.call_slow(Register {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?,
        )
    }

    async fn federated_init(&self, redirect_uri: &str) -> PlanResult<FederatedChallenge> {
        auth_result(
            self.call_slow(FederatedInit {
                redirect_uri: redirect_uri.to_string(),
            })
            .await?,
        )
    }

    async fn federated_submit(&self, code: &str, redirect_uri: &str) -> PlanResult<AuthUser> {
        auth_result(
            self.call_slow(FederatedSubmit {
                code: code.to_string(),
                redirect_uri: redirect_uri.to_string(),
            })
            .await?,
        )
    }

    async fn sign_out(&self, uid: &str) -> PlanResult<()> {
        auth_result(
            self.call(SignOut {
                uid: uid.to_string(),
            })
            .await?,
        )
    }
}

impl EventStore for Provider {
    /// Spawn the provider with a `subscribe` request and keep it alive,
    /// decoding one snapshot per stdout line. Killing the child (on handle
    /// drop) is the teardown.
    async fn subscribe(&self, uid: &str) -> PlanResult<LiveQuery> {
        let request = Request {
            command: Command::Subscribe,
            params: serde_json::to_value(Subscribe {
                uid: uid.to_string(),
            })
            .map_err(|e| PlanError::Serialization(e.to_string()))?,
        };
        let request_json =
            serde_json::to_string(&request).map_err(|e| PlanError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;

        let mut child = TokioCommand::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PlanError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child.stdin.take().unwrap();
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let stdout = child.stdout.take().unwrap();
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);

        // The child is owned by the producer task; aborting the task drops
        // (and thus kills) the provider process.
        let producer = tokio::spawn(async move {
            let _child = child;
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if tx.send(decode_snapshot_line(&line)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("provider closed the snapshot stream");
                        break;
                    }
                    Err(e) => {
                        let _ = tx.send(Err(PlanError::Subscription(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(LiveQuery::new(rx, producer))
    }

    async fn add_event(&self, uid: &str, draft: EventDraft) -> PlanResult<String> {
        draft.validate()?;
        store_result(
            self.call(AddEvent {
                uid: uid.to_string(),
                fields: draft.into_fields(uid),
            })
            .await?,
        )
    }

    async fn update_event(&self, uid: &str, id: &str, changes: EventChanges) -> PlanResult<()> {
        changes.validate()?;
        store_result(
            self.call(UpdateEvent {
                uid: uid.to_string(),
                id: id.to_string(),
                fields: changes.into_fields(),
            })
            .await?,
        )
    }

    async fn delete_event(&self, uid: &str, id: &str) -> PlanResult<()> {
        store_result(
            self.call(DeleteEvent {
                uid: uid.to_string(),
                id: id.to_string(),
            })
            .await?,
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
