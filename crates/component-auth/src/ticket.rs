//! Verification ticket sources
//!
//! WeChat pushes a fresh `component_verify_ticket` to the platform's event
//! endpoint roughly every ten minutes. Receiving that push is the embedding
//! app's job; the manager only asks for the latest value on each mint.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::store::BoxFuture;

/// Accessor for the current verification ticket.
pub trait TicketSource: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, Result<String>>;
}

/// A fixed ticket, for tests and one-off scripts.
pub struct StaticTicket(String);

impl StaticTicket {
    pub fn new(ticket: impl Into<String>) -> Self {
        Self(ticket.into())
    }
}

impl TicketSource for StaticTicket {
    fn fetch(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move { Ok(self.0.clone()) })
    }
}

/// Reads the ticket from a file kept current by the push receiver.
///
/// Surrounding whitespace is trimmed. A missing or empty file is an error:
/// minting without a ticket always fails remotely.
pub struct FileTicket {
    path: PathBuf,
}

impl FileTicket {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TicketSource for FileTicket {
    fn fetch(&self) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
                Error::TicketFetch(format!("reading {}: {e}", self.path.display()))
            })?;
            let ticket = contents.trim();
            if ticket.is_empty() {
                return Err(Error::TicketFetch(format!(
                    "{} is empty",
                    self.path.display()
                )));
            }
            Ok(ticket.to_owned())
        })
    }
}
