//! Typed service catalog entries.
//!
//! Descriptors are plain immutable data. Loading and validation of the
//! bundled reference files happens in `mpx-registry`.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::MpxError;

/// Kind of backend a service is, which decides its path and query shape.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// Feed-style CRUD services (`.../data/<Endpoint>/feed`).
    Data,
    /// RPC-style services taking `{method: {args}}` payloads.
    Web,
    /// Bulk ingest endpoints taking opaque payloads.
    Ingest,
}

impl ServiceType {
    /// All types, in the order the reference files are loaded.
    pub const ALL: [ServiceType; 3] = [ServiceType::Web, ServiceType::Data, ServiceType::Ingest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Web => "web",
            Self::Ingest => "ingest",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = MpxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(Self::Data),
            "web" => Ok(Self::Web),
            "ingest" => Ok(Self::Ingest),
            other => Err(MpxError::validation("service type", other, "expected one of data, web, ingest")),
        }
    }
}

/// JSON dialect a service speaks, sent as the `form` query parameter.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireForm {
    #[default]
    Json,
    Cjson,
}

impl WireForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Cjson => "cjson",
        }
    }
}

impl fmt::Display for WireForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One endpoint (resource collection) of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// Endpoint name as it appears in paths (e.g. `Media`).
    pub name: String,
    /// Endpoint level schema version; web endpoints always carry one.
    #[serde(default)]
    pub schema: Option<String>,
    /// Web methods keyed by name, each with the argument names it accepts.
    #[serde(default)]
    pub methods: IndexMap<String, Vec<String>>,
}

impl EndpointDescriptor {
    /// An endpoint with no schema override and no methods.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            methods: IndexMap::new(),
        }
    }
}

/// Reference data for one cataloged service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service title, identical to the key used by tenant domains.
    pub name: String,
    pub service_type: ServiceType,
    /// Substring of the service host used for reverse lookups and shard splicing.
    pub uri_hint: String,
    /// Segment placed between the base path and the endpoint (`data`, `web`, ...).
    pub path_segment: String,
    pub wire_form: WireForm,
    pub schema_version: String,
    pub search_schema_version: String,
    pub read_only: bool,
    pub endpoints: Vec<EndpointDescriptor>,
    /// URL used when a tenant domain does not list the service.
    pub default_url: Option<String>,
}

impl ServiceDescriptor {
    pub fn endpoint(&self, name: &str) -> Option<&EndpointDescriptor> {
        self.endpoints.iter().find(|endpoint| endpoint.name == name)
    }

    pub fn has_endpoint(&self, name: &str) -> bool {
        self.endpoint(name).is_some()
    }

    pub fn is_data(&self) -> bool {
        self.service_type == ServiceType::Data
    }
}

/// Splits a trailing single shard digit off a service name.
///
/// `"Media Data Service 3"` yields `("Media Data Service", Some(3))`; names
/// without a ` <digit>` suffix are returned unchanged.
pub fn split_shard(name: &str) -> (&str, Option<u8>) {
    let bytes = name.as_bytes();
    if bytes.len() < 3 {
        return (name, None);
    }
    let last = bytes[bytes.len() - 1];
    let before = bytes[bytes.len() - 2];
    if last.is_ascii_digit() && before == b' ' && !bytes[bytes.len() - 3].is_ascii_digit() {
        return (&name[..name.len() - 2], Some(last - b'0'));
    }
    (name, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_shard_strips_a_single_trailing_digit() {
        assert_eq!(split_shard("Media Data Service 3"), ("Media Data Service", Some(3)));
        assert_eq!(split_shard("Media Data Service"), ("Media Data Service", None));
    }

    #[test]
    fn split_shard_ignores_multi_digit_suffixes() {
        assert_eq!(split_shard("Media Data Service 12"), ("Media Data Service 12", None));
        assert_eq!(split_shard("Service3"), ("Service3", None));
    }

    #[test]
    fn service_type_parses_catalog_keys() {
        assert_eq!("data".parse::<ServiceType>().unwrap(), ServiceType::Data);
        assert!("rpc".parse::<ServiceType>().is_err());
        assert_eq!(ServiceType::Ingest.to_string(), "ingest");
    }
}
