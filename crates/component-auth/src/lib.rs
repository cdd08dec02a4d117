//! WeChat Open Platform third-party component authorization
//!
//! Obtains and refreshes the platform-level `component_access_token`,
//! exchanges authorization codes for per-authorizer credentials, and runs
//! authenticated calls on behalf of authorized accounts.
//!
//! Credential flow:
//! 1. Embedding app receives `component_verify_ticket` pushes and exposes
//!    them through a `ticket::TicketSource`
//! 2. `CredentialManager::usable()` loads the token from the caller's
//!    `store::CredentialStore`, minting a new one when missing or expired
//! 3. `Dispatcher::dispatch()` runs an operation with that token and, if the
//!    remote answers `errcode 40001`, mints again and retries exactly once
//! 4. `ComponentAuth` exposes one method per remote operation on top of this

pub mod api;
pub mod component;
pub mod constants;
pub mod credential;
pub mod dispatch;
pub mod error;
pub mod manager;
pub mod oauth;
pub mod operations;
pub mod store;
pub mod ticket;

#[cfg(test)]
mod testing;

pub use api::ApiClient;
pub use component::ComponentAuth;
pub use credential::{AppIdentity, AppSecret, ComponentToken};
pub use dispatch::{AuthenticatedOperation, CallContext, Dispatcher};
pub use error::{Error, Result};
pub use manager::CredentialManager;
pub use oauth::{build_login_page_url, build_oauth_url};
pub use store::{BoxFuture, CredentialStore, FileStore, MemoryStore};
pub use ticket::{FileTicket, StaticTicket, TicketSource};
