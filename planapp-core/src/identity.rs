//! The identity collaborator seam.
//!
//! All credential handling lives behind this trait; the rest of the crate
//! only ever sees an [`AuthUser`] (or none). Federated sign-in is two-phase:
//! the provider hands back an authorization URL, the caller runs the browser
//! redirect and returns the resulting code.

use crate::error::PlanResult;
use serde::{Deserialize, Serialize};

/// The authenticated user, as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Opaque identifier assigned by the identity provider.
    pub uid: String,
    pub email: Option<String>,
}

/// First phase of a federated sign-in: where to send the user's browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedChallenge {
    pub authorization_url: String,
    /// Callers must verify this against the state query parameter of the
    /// callback before submitting the code.
    pub state: String,
}

/// Operations consumed from the external identity provider.
///
/// Every operation is asynchronous and may fail with a provider-defined
/// error, surfaced as [`PlanError::Auth`](crate::PlanError::Auth).
pub trait Identity: Send + Sync {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = PlanResult<AuthUser>> + Send;

    fn register(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = PlanResult<AuthUser>> + Send;

    fn federated_init(
        &self,
        redirect_uri: &str,
    ) -> impl Future<Output = PlanResult<FederatedChallenge>> + Send;

    fn federated_submit(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> impl Future<Output = PlanResult<AuthUser>> + Send;

    fn sign_out(&self, uid: &str) -> impl Future<Output = PlanResult<()>> + Send;
}
