use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{MpxError, Namespace, Result};

/// Wire envelope of a data service feed or write payload.
///
/// A page is a staging structure: it is decoded from a response body and
/// converted into [`crate::Entries`], or built from them to be sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Namespace declarations for the custom fields found in `entries`.
    #[serde(rename = "$xmlns", alias = "xmlns", default)]
    pub namespace: Namespace,
    #[serde(default)]
    pub entries: Vec<Map<String, Value>>,
    #[serde(rename = "startIndex", default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u64>,
    #[serde(rename = "itemsPerPage", default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u64>,
    #[serde(rename = "entryCount", default, skip_serializing_if = "Option::is_none")]
    pub entry_count: Option<u64>,
    #[serde(rename = "totalResults", default, skip_serializing_if = "Option::is_none")]
    pub total_results: Option<u64>,
}

impl Page {
    pub fn new(namespace: Namespace, entries: Vec<Map<String, Value>>) -> Self {
        Self {
            namespace,
            entries,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decodes a page from a response body value.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|error| MpxError::decode("page", error.to_string(), String::new()))
    }

    /// Serializes the page as a request payload.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let encoded = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        encoded.map_err(|error| MpxError::decode("page", error.to_string(), String::new()))
    }
}
