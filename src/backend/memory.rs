/// In-process backend
///
/// Holds accounts and records in memory and honours the same contract as
/// the hosted service. Used by tests and by the `memory` backend mode.

use crate::backend::{is_valid_id, Backend};
use crate::core::{Credential, EventBus, Record, RecordFields, SessionChange, SessionUser};
use crate::error::{BridgeError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Memory-backed implementation of `Backend`
pub struct MemoryBackend {
    /// identifier -> secret
    accounts: RwLock<HashMap<String, String>>,
    records: RwLock<BTreeMap<String, RecordFields>>,
    offline: AtomicBool,
    events: EventBus,
}

impl MemoryBackend {
    /// Create an empty backend with no accounts
    pub fn new() -> Self {
        Self::with_accounts(std::iter::empty())
    }

    /// Create a backend seeded with accounts
    pub fn with_accounts(accounts: impl IntoIterator<Item = Credential>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|c| (c.identifier, c.secret))
            .collect();

        Self {
            accounts: RwLock::new(accounts),
            records: RwLock::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
            events: EventBus::new(),
        }
    }

    /// Register an account
    pub async fn add_account(&self, credential: Credential) {
        debug!("Adding account '{}'", credential.identifier);
        self.accounts
            .write()
            .await
            .insert(credential.identifier, credential.secret);
    }

    /// Make every call fail with `BridgeError::Unavailable` while set
    pub fn set_offline(&self, offline: bool) {
        info!("Memory backend offline={}", offline);
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Publish a signed-out session change
    pub fn sign_out(&self) {
        self.events.publish(SessionChange::signed_out());
    }

    /// Push an arbitrary session change, as the hosted service would
    pub fn push_session_change(&self, change: SessionChange) {
        self.events.publish(change);
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BridgeError::Unavailable);
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn authenticate(&self, credential: &Credential) -> Result<SessionUser> {
        self.check_online()?;

        let accounts = self.accounts.read().await;
        match accounts.get(&credential.identifier) {
            Some(secret) if *secret == credential.secret => {
                debug!("Account '{}' signed in", credential.identifier);
                let user = SessionUser {
                    identifier: credential.identifier.clone(),
                };
                self.events.publish(SessionChange {
                    user: Some(user.clone()),
                });
                Ok(user)
            }
            Some(_) => Err(BridgeError::AuthRejected {
                identifier: credential.identifier.clone(),
                reason: "INVALID_PASSWORD".to_string(),
            }),
            None => Err(BridgeError::AuthRejected {
                identifier: credential.identifier.clone(),
                reason: "EMAIL_NOT_FOUND".to_string(),
            }),
        }
    }

    fn subscribe_session(&self) -> broadcast::Receiver<SessionChange> {
        self.events.subscribe()
    }

    async fn insert(&self, fields: &RecordFields) -> Result<Record> {
        self.check_online()?;

        let id = Uuid::new_v4().simple().to_string();
        self.records.write().await.insert(id.clone(), fields.clone());

        debug!("Inserted record {}", id);
        Ok(Record::new(id, fields.clone()))
    }

    async fn get(&self, id: &str) -> Result<Option<Record>> {
        self.check_online()?;

        if !is_valid_id(id) {
            return Ok(None);
        }

        Ok(self
            .records
            .read()
            .await
            .get(id)
            .map(|fields| Record::new(id, fields.clone())))
    }

    async fn get_all(&self) -> Result<Vec<Record>> {
        self.check_online()?;

        Ok(self
            .records
            .read()
            .await
            .iter()
            .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
            .collect())
    }

    async fn update(&self, id: &str, fields: &RecordFields) -> Result<()> {
        self.check_online()?;

        match self.records.write().await.get_mut(id) {
            Some(stored) => {
                *stored = fields.clone();
                debug!("Updated record {}", id);
                Ok(())
            }
            None => Err(BridgeError::RecordNotFound { id: id.to_string() }),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.check_online()?;

        match self.records.write().await.remove(id) {
            Some(_) => {
                debug!("Deleted record {}", id);
                Ok(())
            }
            None => Err(BridgeError::RecordNotFound { id: id.to_string() }),
        }
    }
}
