/// Transient payload types exchanged between the UI and the backend
///
/// None of these are cached by the bridge; they live for one request.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Login credentials submitted by the UI
///
/// `Debug` output masks the secret so credentials can be logged safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "userId")]
    pub identifier: String,

    #[serde(rename = "password")]
    pub secret: String,
}

impl Credential {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"***")
            .finish()
    }
}

/// Title/description pair written by insert and update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,
}

impl RecordFields {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// A stored record, identified by a backend-assigned id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: RecordFields) -> Self {
        Self {
            id: id.into(),
            title: fields.title,
            description: fields.description,
        }
    }

    /// The not-found / failure sentinel: every field empty
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.title.is_empty() && self.description.is_empty()
    }

    pub fn fields(&self) -> RecordFields {
        RecordFields::new(self.title.clone(), self.description.clone())
    }
}

/// User reported by the backend's session state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub identifier: String,
}

/// Push notification that the authenticated-user state changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionChange {
    pub user: Option<SessionUser>,
}

impl SessionChange {
    pub fn signed_in(identifier: impl Into<String>) -> Self {
        Self {
            user: Some(SessionUser {
                identifier: identifier.into(),
            }),
        }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}
