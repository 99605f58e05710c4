//! planapp-provider-firebase - Firebase backend provider for planapp
//!
//! This binary implements the planapp provider protocol, communicating
//! with planapp via JSON over stdin/stdout. It talks to Firebase Auth and
//! Firestore through their REST surfaces.
//!
//! The provider manages its own configuration and tokens:
//!   ~/.config/planapp/providers/firebase/config.toml
//!   ~/.config/planapp/providers/firebase/sessions/{uid}.toml

mod auth;
mod config;
mod firestore;
mod session;

use planapp_core::remote::protocol::{
    AddEvent, Command, DeleteEvent, FederatedInit, FederatedSubmit, Register, Request, Response,
    SignIn, SignOut, Subscribe, UpdateEvent,
};
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// How often the owner-scoped query is re-run while subscribed. The REST
/// surface has no push channel, so snapshots are polled at the vendor edge
/// and only re-emitted when the result set actually changed.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Failed to read stdin: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                let response = Response::error(&format!("Failed to parse request: {}", e));
                writeln!(stdout, "{}", response).unwrap();
                stdout.flush().unwrap();
                continue;
            }
        };

        // Streaming: subscribe takes over stdout until the parent kills us.
        if request.command == Command::Subscribe {
            run_subscribe(request.params, &mut stdout).await;
            break;
        }

        let response = handle_request(request).await;

        writeln!(stdout, "{}", response).unwrap();
        stdout.flush().unwrap();
    }
}

async fn handle_request(request: Request) -> String {
    match request.command {
        Command::SignIn => handle_sign_in(request.params).await,
        Command::Register => handle_register(request.params).await,
        Command::FederatedInit => handle_federated_init(request.params).await,
        Command::FederatedSubmit => handle_federated_submit(request.params).await,
        Command::SignOut => handle_sign_out(request.params).await,
        Command::Subscribe => unreachable!("subscribe is handled by the streaming path"),
        Command::AddEvent => handle_add_event(request.params).await,
        Command::UpdateEvent => handle_update_event(request.params).await,
        Command::DeleteEvent => handle_delete_event(request.params).await,
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: serde_json::Value,
) -> Result<T, String> {
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {}", e))
}

async fn handle_sign_in(params: serde_json::Value) -> String {
    let params: SignIn = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return Response::error(&e),
    };

    match auth::sign_in(&params.email, &params.password).await {
        Ok(user) => Response::success(user),
        Err(e) => Response::error(&format!("{:#}", e)),
    }
}

async fn handle_register(params: serde_json::Value) -> String {
    let params: Register = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return Response::error(&e),
    };

    match auth::register(&params.email, &params.password).await {
        Ok(user) => Response::success(user),
        Err(e) => Response::error(&format!("{:#}", e)),
    }
}

async fn handle_federated_init(params: serde_json::Value) -> String {
    let params: FederatedInit = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return Response::error(&e),
    };

    match auth::federated_init(&params.redirect_uri) {
        Ok(challenge) => Response::success(challenge),
        Err(e) => Response::error(&format!("{:#}", e)),
    }
}

async fn handle_federated_submit(params: serde_json::Value) -> String {
    let params: FederatedSubmit = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return Response::error(&e),
    };

    match auth::federated_submit(&params.code, &params.redirect_uri).await {
        Ok(user) => Response::success(user),
        Err(e) => Response::error(&format!("{:#}", e)),
    }
}

async fn handle_sign_out(params: serde_json::Value) -> String {
    let params: SignOut = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return Response::error(&e),
    };

    match session::delete(&params.uid) {
        Ok(()) => Response::success(()),
        Err(e) => Response::error(&format!("{:#}", e)),
    }
}

async fn handle_add_event(params: serde_json::Value) -> String {
    let params: AddEvent = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return Response::error(&e),
    };

    match firestore::add_event(&params.uid, &params.fields).await {
        Ok(id) => Response::success(id),
        Err(e) => Response::error(&format!("{:#}", e)),
    }
}

async fn handle_update_event(params: serde_json::Value) -> String {
    let params: UpdateEvent = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return Response::error(&e),
    };

    match firestore::update_event(&params.uid, &params.id, &params.fields).await {
        Ok(()) => Response::success(()),
        Err(e) => Response::error(&format!("{:#}", e)),
    }
}

async fn handle_delete_event(params: serde_json::Value) -> String {
    let params: DeleteEvent = match parse_params(params) {
        Ok(p) => p,
        Err(e) => return Response::error(&e),
    };

    match firestore::delete_event(&params.uid, &params.id).await {
        Ok(()) => Response::success(()),
        Err(e) => Response::error(&format!("{:#}", e)),
    }
}

/// The streaming subscribe loop: poll the owner-scoped query and emit a
/// snapshot line whenever the result set (or the failure) changes.
async fn run_subscribe(params: serde_json::Value, stdout: &mut io::Stdout) {
    let params: Subscribe = match parse_params(params) {
        Ok(p) => p,
        Err(e) => {
            writeln!(stdout, "{}", Response::error(&e)).unwrap();
            stdout.flush().unwrap();
            return;
        }
    };

    let mut last_line: Option<String> = None;
    loop {
        let line = match firestore::query_events(&params.uid).await {
            Ok(documents) => Response::success(documents),
            Err(e) => Response::error(&format!("{:#}", e)),
        };

        if last_line.as_ref() != Some(&line) {
            writeln!(stdout, "{}", line).unwrap();
            stdout.flush().unwrap();
            last_line = Some(line);
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
