//! Platform credential lifecycle
//!
//! The manager decides whether the stored `component_access_token` is still
//! usable and mints a new one when it is not. It never refreshes a token that
//! has not expired yet; the 100-second margin applied at mint time is the
//! only early renewal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::constants::COMPONENT_TOKEN_PATH;
use crate::credential::{AppIdentity, ComponentToken, now_millis};
use crate::error::{Error, Result};
use crate::store::CredentialStore;
use crate::ticket::TicketSource;

#[derive(Serialize)]
struct IssuanceRequest<'a> {
    component_appid: &'a str,
    component_appsecret: &'a str,
    component_verify_ticket: &'a str,
}

/// Issuance endpoint payload. `expires_in` is a delta in seconds.
#[derive(Debug, Deserialize)]
struct IssuanceResponse {
    component_access_token: String,
    expires_in: u64,
}

/// Mints and hands out the platform credential.
///
/// Holds no token itself: the store is the single source of truth, and
/// each caller receives its own clone.
pub struct CredentialManager {
    identity: AppIdentity,
    api: ApiClient,
    tickets: Arc<dyn TicketSource>,
    store: Arc<dyn CredentialStore>,
}

impl CredentialManager {
    pub fn new(
        identity: AppIdentity,
        api: ApiClient,
        tickets: Arc<dyn TicketSource>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            identity,
            api,
            tickets,
            store,
        }
    }

    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Obtain a new token from the issuance endpoint and persist it.
    ///
    /// The verify ticket is fetched fresh on every call. When the store
    /// rejects the new token the result is `Error::Persist`, which still
    /// carries the token.
    pub async fn mint(&self) -> Result<ComponentToken> {
        let ticket = self.tickets.fetch().await.map_err(|e| match e {
            Error::TicketFetch(_) => e,
            other => Error::TicketFetch(other.to_string()),
        })?;

        let issued = self.issue(&ticket).await;
        let outcome = if issued.is_ok() { "ok" } else { "error" };
        metrics::counter!("component_auth_token_mints_total", "outcome" => outcome).increment(1);
        let token = issued?;

        if let Err(e) = self.store.save(&token).await {
            warn!(error = %e, "failed to persist component token");
            return Err(Error::Persist {
                token,
                reason: e.to_string(),
            });
        }

        Ok(token)
    }

    /// One call to the issuance endpoint, without persisting the result.
    async fn issue(&self, ticket: &str) -> Result<ComponentToken> {
        let request = IssuanceRequest {
            component_appid: self.identity.appid(),
            component_appsecret: self.identity.secret().expose(),
            component_verify_ticket: ticket,
        };

        let response: IssuanceResponse = self
            .api
            .post_json(COMPONENT_TOKEN_PATH, &[], &request)
            .await
            .map_err(|e| match e {
                Error::Api { errcode, errmsg } => Error::Issuance { errcode, errmsg },
                other => other,
            })?;

        if response.component_access_token.is_empty() {
            return Err(Error::InvalidResponse(
                "issuance returned an empty component_access_token".into(),
            ));
        }

        info!(
            appid = self.identity.appid(),
            expires_in = response.expires_in,
            "minted component token"
        );
        Ok(ComponentToken::issued(
            response.component_access_token,
            response.expires_in,
            now_millis(),
        ))
    }

    /// Return the stored token if still valid, otherwise mint a new one.
    ///
    /// Performs at most one issuance call. A stored token past its expiry is
    /// treated exactly like an empty store.
    pub async fn usable(&self) -> Result<ComponentToken> {
        match self.store.load().await {
            Ok(Some(token)) if token.is_valid() => {
                debug!(expires_at = token.expires_at(), "using stored component token");
                return Ok(token);
            }
            Ok(Some(token)) => {
                debug!(expires_at = token.expires_at(), "stored component token expired");
            }
            Ok(None) => debug!("no stored component token"),
            Err(e) => {
                return Err(match e {
                    Error::StoreLoad(_) => e,
                    other => Error::StoreLoad(other.to_string()),
                });
            }
        }

        self.mint().await
    }
}
