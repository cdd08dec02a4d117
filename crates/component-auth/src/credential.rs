//! Platform credential value and application identity
//!
//! `ComponentToken` is immutable once built. The expiry is fixed at issuance
//! time (declared lifetime minus the safety margin) and never adjusted later;
//! a newer token replaces it wholesale in the caller's store.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::constants::EXPIRY_SAFETY_MARGIN_SECS;

/// The platform-level `component_access_token`.
///
/// `expires_at` is a unix timestamp in milliseconds (absolute, not a delta).
/// The serialized field names match what the remote returns, so stores can
/// keep the JSON as-is.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentToken {
    #[serde(rename = "component_access_token")]
    token: String,
    expires_at: u64,
}

impl ComponentToken {
    pub fn new(token: impl Into<String>, expires_at: u64) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Build a token from an issuance response received at `issued_at`
    /// (unix millis). `expires_in` is the remote-declared lifetime in seconds.
    ///
    /// A lifetime shorter than the safety margin yields a token that is
    /// already expired. Absurdly large lifetimes clamp to `u64::MAX`.
    pub fn issued(token: impl Into<String>, expires_in: u64, issued_at: u64) -> Self {
        let lifetime_millis = expires_in
            .saturating_sub(EXPIRY_SAFETY_MARGIN_SECS)
            .saturating_mul(1000);
        Self::new(token, issued_at.saturating_add(lifetime_millis))
    }

    /// Opaque token string sent as `component_access_token`.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Expiry as unix timestamp in milliseconds.
    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_millis())
    }

    /// Valid iff the token is non-empty and `now` is strictly before expiry.
    pub fn is_valid_at(&self, now_millis: u64) -> bool {
        !self.token.is_empty() && now_millis < self.expires_at
    }
}

impl fmt::Debug for ComponentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Secret string, redacted in Debug/Display and wiped on drop.
#[derive(Clone)]
pub struct AppSecret(String);

impl AppSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AppSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for AppSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for AppSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Static identity of the third-party platform, fixed for the manager's life.
#[derive(Debug, Clone)]
pub struct AppIdentity {
    appid: String,
    secret: AppSecret,
}

impl AppIdentity {
    pub fn new(appid: impl Into<String>, secret: AppSecret) -> Self {
        Self {
            appid: appid.into(),
            secret,
        }
    }

    /// The platform's own `component_appid`.
    pub fn appid(&self) -> &str {
        &self.appid
    }

    pub fn secret(&self) -> &AppSecret {
        &self.secret
    }
}

/// Current wall-clock time as unix milliseconds.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
