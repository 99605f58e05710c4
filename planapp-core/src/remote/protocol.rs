//! Defines the JSON protocol used for communication between planapp
//! and backend provider binaries over stdin/stdout.
//!
//! Every command is a single request/response round trip except
//! `subscribe`, which keeps the provider process alive and streams one
//! `Response<Vec<Document>>` line per snapshot until the process is killed.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::event::Document;
use crate::identity::{AuthUser, FederatedChallenge};

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    SignIn,
    Register,
    FederatedInit,
    FederatedSubmit,
    SignOut,
    Subscribe,
    AddEvent,
    UpdateEvent,
    DeleteEvent,
}

/// Request sent from planapp to a provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from a provider to planapp.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T) -> String {
        serde_json::to_string(&Response::Success { data }).unwrap()
    }
}

impl Response<()> {
    pub fn error(msg: &str) -> String {
        serde_json::to_string(&Response::<()>::Error {
            error: msg.to_string(),
        })
        .unwrap()
    }
}

// ============================================================================
// Identity commands
// ============================================================================

/// Password sign-in against the identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignIn {
    pub email: String,
    pub password: String,
}

impl ProviderCommand for SignIn {
    type Response = AuthUser;
    fn command() -> Command {
        Command::SignIn
    }
}

/// Create a new account with email and password.
#[derive(Debug, Serialize, Deserialize)]
pub struct Register {
    pub email: String,
    pub password: String,
}

impl ProviderCommand for Register {
    type Response = AuthUser;
    fn command() -> Command {
        Command::Register
    }
}

/// Start a federated sign-in. The provider returns the authorization URL;
/// the caller runs the browser redirect on `redirect_uri`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FederatedInit {
    pub redirect_uri: String,
}

impl ProviderCommand for FederatedInit {
    type Response = FederatedChallenge;
    fn command() -> Command {
        Command::FederatedInit
    }
}

/// Complete a federated sign-in with the code from the redirect callback.
///
/// The OAuth state is verified by the caller against the challenge it got
/// from `federated_init`; the provider is a fresh process per request and
/// could not check it.
#[derive(Debug, Serialize, Deserialize)]
pub struct FederatedSubmit {
    pub code: String,
    pub redirect_uri: String,
}

impl ProviderCommand for FederatedSubmit {
    type Response = AuthUser;
    fn command() -> Command {
        Command::FederatedSubmit
    }
}

/// End the provider-side session for an account.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignOut {
    pub uid: String,
}

impl ProviderCommand for SignOut {
    type Response = ();
    fn command() -> Command {
        Command::SignOut
    }
}

// ============================================================================
// Store commands
// ============================================================================

/// Open a live query scoped to the user's events. Streaming: the provider
/// answers with one snapshot line now and another on every change.
#[derive(Debug, Serialize, Deserialize)]
pub struct Subscribe {
    pub uid: String,
}

impl ProviderCommand for Subscribe {
    type Response = Vec<Document>;
    fn command() -> Command {
        Command::Subscribe
    }
}

/// Create a document in the events collection. Responds with the new id.
#[derive(Debug, Serialize, Deserialize)]
pub struct AddEvent {
    pub uid: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ProviderCommand for AddEvent {
    type Response = String;
    fn command() -> Command {
        Command::AddEvent
    }
}

/// Replace a document's mutable fields.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub uid: String,
    pub id: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl ProviderCommand for UpdateEvent {
    type Response = ();
    fn command() -> Command {
        Command::UpdateEvent
    }
}

/// Delete a document by id.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub uid: String,
    pub id: String,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_use_snake_case_commands() {
        let request = Request {
            command: Command::AddEvent,
            params: serde_json::json!({ "uid": "user-1" }),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"add_event\""));
    }

    #[test]
    fn federated_submit_carries_only_code_and_redirect() {
        let params = serde_json::to_value(FederatedSubmit {
            code: "auth-code".to_string(),
            redirect_uri: "http://localhost:8085/callback".to_string(),
        })
        .unwrap();
        assert_eq!(
            params,
            serde_json::json!({
                "code": "auth-code",
                "redirect_uri": "http://localhost:8085/callback",
            })
        );
    }

    #[test]
    fn responses_are_status_tagged() {
        let ok = Response::success(vec![Document {
            id: "doc-1".to_string(),
            fields: serde_json::Map::new(),
        }]);
        assert!(ok.contains("\"status\":\"success\""));

        let err = Response::error("nope");
        let parsed: Response<Vec<Document>> = serde_json::from_str(&err).unwrap();
        assert!(matches!(parsed, Response::Error { error } if error == "nope"));
    }
}
