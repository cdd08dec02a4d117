//! Shared helpers for unit tests that need a live HTTP endpoint.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Json;
use axum::extract::State;
use axum::routing::post;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::constants::COMPONENT_TOKEN_PATH;
use crate::credential::ComponentToken;
use crate::error::{Error, Result};
use crate::store::{BoxFuture, CredentialStore, MemoryStore};

/// Serve `app` on an ephemeral localhost port and return its base URL.
pub async fn spawn_mock(app: axum::Router) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), handle)
}

/// Issuance endpoint that counts calls and hands out `T{hits}` after
/// incrementing, so a counter seeded at 1 issues `T2` first.
pub fn issuance_route(hits: Arc<AtomicUsize>, expires_in: u64) -> axum::Router {
    axum::Router::new().route(
        COMPONENT_TOKEN_PATH,
        post(
            move |State(hits): State<Arc<AtomicUsize>>, Json(_body): Json<Value>| async move {
                let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                Json(json!({
                    "component_access_token": format!("T{n}"),
                    "expires_in": expires_in,
                }))
            },
        )
        .with_state(hits),
    )
}

/// Store wrapper that counts calls and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    pub loads: AtomicUsize,
    pub saves: AtomicUsize,
    pub fail_load: bool,
    pub fail_save: bool,
}

impl RecordingStore {
    pub fn with_token(token: ComponentToken) -> Self {
        Self {
            inner: MemoryStore::with_token(token),
            ..Self::default()
        }
    }
}

impl CredentialStore for RecordingStore {
    fn load(&self) -> BoxFuture<'_, Result<Option<ComponentToken>>> {
        Box::pin(async move {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_load {
                return Err(Error::Io("cache unreachable".into()));
            }
            self.inner.load().await
        })
    }

    fn save<'a>(&'a self, token: &'a ComponentToken) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_save {
                return Err(Error::Io("cache read-only".into()));
            }
            self.inner.save(token).await
        })
    }
}
