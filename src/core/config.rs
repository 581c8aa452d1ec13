/// Bridge configuration
///
/// The static settings object supplied at process start: which backend to
/// talk to, its endpoints and credentials, and the collection records live
/// in. Loaded from a JSON file with environment overrides on top.

use crate::core::record::Credential;
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "RECORD_BRIDGE_CONFIG";
pub const API_KEY_ENV: &str = "RECORD_BRIDGE_API_KEY";
pub const PROJECT_ID_ENV: &str = "RECORD_BRIDGE_PROJECT_ID";
pub const COLLECTION_ENV: &str = "RECORD_BRIDGE_COLLECTION";

/// Which backend implementation the bridge talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted service over HTTPS
    #[default]
    Rest,
    /// In-process fake, for offline development
    Memory,
}

/// Bridge configuration with backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Hosted service API key
    #[serde(default)]
    pub api_key: String,

    /// Document store project
    #[serde(default)]
    pub project_id: String,

    #[serde(default = "default_auth_endpoint")]
    pub auth_endpoint: String,

    #[serde(default = "default_firestore_endpoint")]
    pub firestore_endpoint: String,

    /// Where expired id tokens are renewed with the refresh token
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,

    /// The single collection records are stored in
    #[serde(default = "default_collection")]
    pub collection: String,

    /// HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Accounts seeded into the memory backend
    #[serde(default)]
    pub accounts: Vec<Credential>,
}

fn default_auth_endpoint() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_firestore_endpoint() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

fn default_token_endpoint() -> String {
    "https://securetoken.googleapis.com/v1".to_string()
}

fn default_collection() -> String {
    "records".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            api_key: String::new(),
            project_id: String::new(),
            auth_endpoint: default_auth_endpoint(),
            firestore_endpoint: default_firestore_endpoint(),
            token_endpoint: default_token_endpoint(),
            collection: default_collection(),
            timeout_secs: default_timeout(),
            accounts: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Create a builder for custom configuration
    ///
    /// # Examples
    /// ```ignore
    /// let config = BridgeConfig::builder()
    ///     .api_key("AIza...")
    ///     .project_id("my-project")
    ///     .collection("todos")
    ///     .build()?;
    /// ```
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::new()
    }

    /// Parse and validate a JSON config document
    ///
    /// # Errors
    /// - `BridgeError::JsonError`: the document is not valid config JSON
    /// - Any validation errors from `validate()`
    pub fn from_json(json: &str) -> Result<Self> {
        Self::parse(json, |_| None)
    }

    /// Load configuration for process start
    ///
    /// Reads `path` when given, falls back to defaults otherwise, then
    /// applies environment overrides and validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let json = match path {
            Some(path) => {
                info!("Loading config from {}", path.display());
                std::fs::read_to_string(path).map_err(|e| BridgeError::ConfigRead {
                    path: path.display().to_string(),
                    source: e,
                })?
            }
            None => {
                info!("No config file given, using defaults");
                "{}".to_string()
            }
        };

        Self::parse(&json, |key| std::env::var(key).ok())
    }

    /// Parse, apply overrides, then validate
    fn parse<F>(json: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!("Parsing bridge config ({} bytes)", json.len());

        let mut config: BridgeConfig = serde_json::from_str(json)?;
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up by environment variable name
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            debug!("API key overridden from {}", API_KEY_ENV);
            self.api_key = key;
        }
        if let Some(project) = lookup(PROJECT_ID_ENV) {
            debug!("Project overridden from {}", PROJECT_ID_ENV);
            self.project_id = project;
        }
        if let Some(collection) = lookup(COLLECTION_ENV) {
            debug!("Collection overridden from {}", COLLECTION_ENV);
            self.collection = collection;
        }
    }

    /// Validate configuration
    ///
    /// - Rest mode needs a non-empty API key and project id
    /// - Collection must be non-empty and a single path segment
    /// - Timeout must be positive
    /// - Endpoints must be http(s) URLs
    ///
    /// # Errors
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendKind::Rest {
            if self.api_key.trim().is_empty() {
                warn!("Validation failed: empty api_key");
                return Err(config_error("api_key", "API key is required for the rest backend"));
            }
            if self.project_id.trim().is_empty() {
                warn!("Validation failed: empty project_id");
                return Err(config_error("project_id", "Project id is required for the rest backend"));
            }
        }

        let collection = self.collection.trim();
        if collection.is_empty() {
            warn!("Validation failed: empty collection");
            return Err(config_error("collection", "Collection cannot be empty"));
        }
        if collection.contains('/') {
            warn!("Validation failed: collection '{}' has a path separator", self.collection);
            return Err(config_error("collection", "Collection cannot contain '/'"));
        }

        if self.timeout_secs == 0 {
            warn!("Validation failed: timeout cannot be 0");
            return Err(config_error("timeout_secs", "Timeout must be at least 1 second"));
        }

        for (field, url) in [
            ("auth_endpoint", &self.auth_endpoint),
            ("firestore_endpoint", &self.firestore_endpoint),
            ("token_endpoint", &self.token_endpoint),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                warn!("Validation failed: {} '{}' is not an http(s) URL", field, url);
                return Err(config_error(field, "Endpoint must be an http(s) URL"));
            }
        }

        debug!("Config validation passed ({:?} backend)", self.backend);
        Ok(())
    }
}

fn config_error(field: &str, reason: &str) -> BridgeError {
    BridgeError::ConfigError {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Builder for BridgeConfig
#[derive(Debug, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
        }
    }

    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.config.backend = kind;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn project_id(mut self, project: impl Into<String>) -> Self {
        self.config.project_id = project.into();
        self
    }

    pub fn auth_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.auth_endpoint = url.into();
        self
    }

    pub fn firestore_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.firestore_endpoint = url.into();
        self
    }

    pub fn token_endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.token_endpoint = url.into();
        self
    }

    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn account(mut self, credential: Credential) -> Self {
        self.config.accounts.push(credential);
        self
    }

    pub fn build(self) -> Result<BridgeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
