/// Document store wire types
///
/// The REST document store wraps every field in a typed value object:
/// `{"fields": {"title": {"stringValue": "A"}}}`. Records only use string
/// fields; anything else decodes as an empty string.

use crate::core::{Record, RecordFields};
use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TITLE: &str = "title";
const DESCRIPTION: &str = "description";

/// A single typed field value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_value: Option<String>,
}

impl FieldValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            string_value: Some(value.into()),
        }
    }
}

/// A stored document. `name` is the full resource path, ending in the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Build the request body for an insert or update
    pub fn from_fields(fields: &RecordFields) -> Self {
        let mut map = BTreeMap::new();
        map.insert(TITLE.to_string(), FieldValue::string(fields.title.clone()));
        map.insert(
            DESCRIPTION.to_string(),
            FieldValue::string(fields.description.clone()),
        );

        Self {
            name: String::new(),
            fields: map,
        }
    }

    /// The backend-assigned id: last segment of the resource name
    pub fn id(&self) -> Option<&str> {
        self.name.rsplit('/').next().filter(|id| !id.is_empty())
    }

    fn string_field(&self, key: &str) -> String {
        self.fields
            .get(key)
            .and_then(|v| v.string_value.clone())
            .unwrap_or_default()
    }

    /// Convert into a record
    ///
    /// # Errors
    /// - `BridgeError::MalformedDocument`: the document has no resource name
    pub fn into_record(self) -> Result<Record> {
        let id = self
            .id()
            .ok_or_else(|| BridgeError::MalformedDocument(format!("no id in name '{}'", self.name)))?
            .to_string();

        Ok(Record {
            id,
            title: self.string_field(TITLE),
            description: self.string_field(DESCRIPTION),
        })
    }
}

/// One page of a collection listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}
