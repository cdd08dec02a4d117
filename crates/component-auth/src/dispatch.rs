//! Credential-guarded execution of authenticated operations
//!
//! Every call that needs the platform credential runs through
//! [`Dispatcher::dispatch`]. Per call:
//!
//! ```text
//! Start -> AwaitingCredential -> Invoking -> Done
//!                                   |
//!                                   +-- stale (first attempt only)
//!                                   v
//!                                Retrying -> Invoking -> Done
//! ```
//!
//! The credential is handed to the operation inside a [`CallContext`] built
//! for that attempt alone, so concurrent dispatches never observe each
//! other's token.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::credential::ComponentToken;
use crate::error::Result;
use crate::manager::CredentialManager;
use crate::store::BoxFuture;

/// Everything an operation may read while it runs: transport, platform
/// app id, and the credential staged for this attempt.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub api: &'a ApiClient,
    pub component_appid: &'a str,
    pub token: &'a ComponentToken,
}

impl CallContext<'_> {
    /// Query pair carrying the platform credential.
    pub fn token_query(&self) -> (&str, &str) {
        ("component_access_token", self.token.token())
    }
}

/// A remote call that needs the platform credential.
///
/// Implementations must be pure with respect to the context: build the
/// request from `ctx` and `self`, send it once, decode the response. The
/// stale-credential sentinel must surface as `Error::Api { errcode: 40001 }`,
/// which `ApiClient` already does.
pub trait AuthenticatedOperation: Send + Sync {
    type Output: Send;

    /// Short label for logs and metrics.
    fn name(&self) -> &'static str;

    fn execute<'a>(&'a self, ctx: CallContext<'a>) -> BoxFuture<'a, Result<Self::Output>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

/// Runs operations with a valid credential and recovers once from
/// server-side invalidation.
///
/// Only the stale-credential sentinel triggers a retry. Transport errors,
/// other API errors, and credential acquisition failures are returned as-is.
#[derive(Clone)]
pub struct Dispatcher {
    manager: Arc<CredentialManager>,
}

impl Dispatcher {
    pub fn new(manager: Arc<CredentialManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &CredentialManager {
        &self.manager
    }

    pub async fn dispatch<O: AuthenticatedOperation>(&self, op: &O) -> Result<O::Output> {
        let name = op.name();
        let mut attempt = Attempt::First;

        loop {
            // The rejected token may still look time-valid in the store, so
            // the retry always mints instead of reloading.
            let acquired = match attempt {
                Attempt::First => self.manager.usable().await,
                Attempt::Retry => self.manager.mint().await,
            };
            let token = match acquired {
                Ok(token) => token,
                Err(e) => {
                    warn!(operation = name, error = %e, "could not acquire component token");
                    record_outcome(name, "credential_error");
                    return Err(e);
                }
            };

            let ctx = CallContext {
                api: self.manager.api(),
                component_appid: self.manager.identity().appid(),
                token: &token,
            };

            match op.execute(ctx).await {
                Err(e) if e.is_stale_credential() && attempt == Attempt::First => {
                    warn!(operation = name, "component token rejected by remote, retrying once");
                    metrics::counter!("component_auth_stale_retries_total", "operation" => name)
                        .increment(1);
                    attempt = Attempt::Retry;
                }
                result => {
                    match &result {
                        Ok(_) => {
                            let retried = attempt == Attempt::Retry;
                            debug!(operation = name, retried, "operation succeeded");
                            record_outcome(name, "ok");
                        }
                        Err(e) => {
                            debug!(operation = name, error = %e, "operation failed");
                            record_outcome(name, "error");
                        }
                    }
                    return result;
                }
            }
        }
    }
}

fn record_outcome(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "component_auth_dispatch_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
