/// Backend collaborator contract
///
/// The hosted service owns authentication and storage; the bridge only
/// ever sees it through the `Backend` trait. Two implementations ship:
/// - `RestBackend`: the hosted service over HTTPS
/// - `MemoryBackend`: an in-process fake with the same contract

pub mod document;
pub mod memory;
pub mod rest;

use crate::core::{BackendKind, BridgeConfig, Credential, Record, RecordFields, SessionChange, SessionUser};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// Authentication, session notification, and a document store holding a
/// single collection keyed by an opaque string id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Backend: Send + Sync {
    /// Sign in with an identifier/secret pair
    ///
    /// A successful sign-in also publishes a `SessionChange` to session
    /// subscribers.
    async fn authenticate(&self, credential: &Credential) -> Result<SessionUser>;

    /// Subscribe to session changes pushed by the backend
    fn subscribe_session(&self) -> broadcast::Receiver<SessionChange>;

    /// Insert a record; the backend assigns its id
    async fn insert(&self, fields: &RecordFields) -> Result<Record>;

    /// Fetch one record. `Ok(None)` means it does not exist.
    async fn get(&self, id: &str) -> Result<Option<Record>>;

    /// Fetch every record in the collection
    async fn get_all(&self) -> Result<Vec<Record>>;

    /// Replace the fields of an existing record
    async fn update(&self, id: &str, fields: &RecordFields) -> Result<()>;

    /// Remove an existing record
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Build the backend selected by the configuration
pub fn connect(config: &BridgeConfig) -> Result<Arc<dyn Backend>> {
    match config.backend {
        BackendKind::Rest => {
            info!(
                "Using rest backend (project '{}', collection '{}')",
                config.project_id, config.collection
            );
            Ok(Arc::new(RestBackend::new(config)?))
        }
        BackendKind::Memory => {
            info!(
                "Using memory backend with {} seeded account(s)",
                config.accounts.len()
            );
            Ok(Arc::new(MemoryBackend::with_accounts(config.accounts.iter().cloned())))
        }
    }
}

/// Whether `id` can name a document in the collection
///
/// Ids are opaque, but they become a single URL path segment. Other
/// reserved characters are percent-encoded; empty ids, separators and the
/// dot segments never match anything.
pub(crate) fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && !id.contains('/') && id != "." && id != ".."
}
