//! Error types for component authorization operations

use crate::constants::STALE_CREDENTIAL_ERRCODE;
use crate::credential::ComponentToken;

/// Errors from credential acquisition and authenticated API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("verify ticket unavailable: {0}")]
    TicketFetch(String),

    #[error("component token issuance failed ({errcode}): {errmsg}")]
    Issuance { errcode: i64, errmsg: String },

    /// The token was issued but the store rejected it. The token is still
    /// usable for this process; see [`Error::into_unpersisted_token`].
    #[error("component token issued but not persisted: {reason}")]
    Persist { token: ComponentToken, reason: String },

    #[error("credential store load failed: {0}")]
    StoreLoad(String),

    #[error("API error ({errcode}): {errmsg}")]
    Api { errcode: i64, errmsg: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Whether the remote rejected the platform credential used for the call.
    pub fn is_stale_credential(&self) -> bool {
        matches!(self, Error::Api { errcode, .. } if *errcode == STALE_CREDENTIAL_ERRCODE)
    }

    /// Recover the freshly issued token from a persistence failure.
    pub fn into_unpersisted_token(self) -> Option<ComponentToken> {
        match self {
            Error::Persist { token, .. } => Some(token),
            _ => None,
        }
    }
}

/// Result alias for component auth operations.
pub type Result<T> = std::result::Result<T, Error>;
