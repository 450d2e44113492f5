//! Static service reference data.
//!
//! The catalog is built once from the bundled `config/*_services.json` files
//! (folded into one document by the build script) or from a directory holding
//! the same three files. Every raw record is validated into a typed
//! [`ServiceDescriptor`] at load time, so request paths never see a partially
//! described service.

use std::{collections::HashSet, fs, path::Path};

use indexmap::IndexMap;
use mpx_types::{
    EndpointDescriptor, MpxError, ReferenceResolver, ReferenceTarget, Result, ServiceDescriptor, ServiceType, WireForm, split_shard,
    validators,
};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::CatalogError;

const EMBEDDED_CATALOG: &str = include_str!(concat!(env!("OUT_DIR"), "/catalog.json"));

#[derive(Debug, Deserialize)]
struct RawService {
    #[serde(default)]
    uri_hint: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    form: WireForm,
    #[serde(default)]
    schema: Option<String>,
    #[serde(default)]
    search_schema: Option<String>,
    #[serde(default)]
    read_only: bool,
    endpoints: RawEndpoints,
    #[serde(default)]
    url: Option<String>,
}

/// Data and ingest files list endpoint names; web files describe each one.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEndpoints {
    Names(Vec<String>),
    Described(IndexMap<String, RawEndpoint>),
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    #[serde(default)]
    schema: Option<String>,
    #[serde(default)]
    methods: IndexMap<String, Vec<String>>,
}

type RawServices = IndexMap<String, RawService>;

/// Lookup table of every known service.
#[derive(Debug, Clone, Default)]
pub struct ServiceCatalog {
    services: Vec<ServiceDescriptor>,
}

impl ServiceCatalog {
    /// Builds a catalog from already validated descriptors, rejecting duplicate names.
    pub fn new(services: Vec<ServiceDescriptor>) -> std::result::Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for service in &services {
            if !seen.insert(service.name.as_str()) {
                return Err(CatalogError::invalid_service(&service.name, "declared more than once"));
            }
        }
        debug!(service_count = services.len(), "service catalog loaded");
        Ok(Self { services })
    }

    /// The catalog embedded at build time.
    pub fn from_embedded() -> std::result::Result<Self, CatalogError> {
        Self::from_document(EMBEDDED_CATALOG)
    }

    /// Parses a document of the form `{"web": {...}, "data": {...}, "ingest": {...}}`.
    pub fn from_document(content: &str) -> std::result::Result<Self, CatalogError> {
        let raw: IndexMap<ServiceType, RawServices> =
            serde_json::from_str(content).map_err(|error| CatalogError::json("service catalog", error))?;
        let mut services = Vec::new();
        for (service_type, entries) in raw {
            for (name, service) in entries {
                services.push(into_descriptor(name, service_type, service)?);
            }
        }
        Self::new(services)
    }

    /// Reads `web_services.json`, `data_services.json` and `ingest_services.json` from `dir`.
    pub fn from_dir(dir: &Path) -> std::result::Result<Self, CatalogError> {
        let mut services = Vec::new();
        for service_type in ServiceType::ALL {
            let path = dir.join(format!("{service_type}_services.json"));
            let content = fs::read_to_string(&path).map_err(|error| CatalogError::io(&path, error))?;
            let entries: RawServices =
                serde_json::from_str(&content).map_err(|error| CatalogError::json(path.display().to_string(), error))?;
            for (name, service) in entries {
                services.push(into_descriptor(name, service_type, service)?);
            }
        }
        Self::new(services)
    }

    /// Descriptor for `name`, ignoring a trailing shard digit.
    pub fn lookup(&self, name: &str) -> Result<&ServiceDescriptor> {
        if let Some(service) = self.find(name) {
            return Ok(service);
        }
        let (base, shard) = split_shard(name);
        shard
            .and_then(|_| self.find(base))
            .ok_or_else(|| MpxError::not_found("service", name))
    }

    /// Descriptor for `name` when it declares `endpoint`.
    pub fn find_by_endpoint(&self, name: &str, endpoint: &str) -> Result<&ServiceDescriptor> {
        let service = self.lookup(name)?;
        if service.has_endpoint(endpoint) {
            Ok(service)
        } else {
            Err(MpxError::not_found("endpoint", format!("{name}/{endpoint}")))
        }
    }

    /// Maps a reference URL onto the service and endpoint it addresses.
    ///
    /// The URL is a data reference when one of its path segments is a data
    /// service path segment, a web reference otherwise. Among services of that
    /// type whose hint occurs in the host, the longest hint wins. The endpoint
    /// is the segment right after the service's path segment.
    pub fn resolve_reference(&self, reference: &str) -> Result<ReferenceTarget> {
        validators::require_reference(reference)?;
        let url = Url::parse(reference).map_err(|error| MpxError::address(reference, error.to_string()))?;
        let host = url.host_str().unwrap_or_default();
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();

        let is_data = self
            .services_of_type(ServiceType::Data)
            .any(|service| segments.contains(&service.path_segment.as_str()));
        let service_type = if is_data { ServiceType::Data } else { ServiceType::Web };

        let service = self
            .services_of_type(service_type)
            .filter(|service| !service.uri_hint.is_empty() && host.contains(service.uri_hint.as_str()))
            .max_by_key(|service| service.uri_hint.len())
            .ok_or_else(|| MpxError::address(reference, format!("no {service_type} service matches host '{host}'")))?;

        let endpoint = segments
            .iter()
            .position(|segment| *segment == service.path_segment)
            .and_then(|index| segments.get(index + 1))
            .ok_or_else(|| MpxError::address(reference, format!("no endpoint after '/{}/'", service.path_segment)))?;
        if !service.has_endpoint(endpoint) {
            return Err(MpxError::address(
                reference,
                format!("'{endpoint}' is not an endpoint of {}", service.name),
            ));
        }

        Ok(ReferenceTarget {
            service: service.name.clone(),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn services_of_type(&self, service_type: ServiceType) -> impl Iterator<Item = &ServiceDescriptor> {
        self.services.iter().filter(move |service| service.service_type == service_type)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceDescriptor> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn find(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|service| service.name == name)
    }
}

impl ReferenceResolver for ServiceCatalog {
    fn resolve_reference(&self, reference: &str) -> Result<ReferenceTarget> {
        ServiceCatalog::resolve_reference(self, reference)
    }
}

impl<'a> IntoIterator for &'a ServiceCatalog {
    type Item = &'a ServiceDescriptor;
    type IntoIter = std::slice::Iter<'a, ServiceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.services.iter()
    }
}

fn into_descriptor(name: String, service_type: ServiceType, raw: RawService) -> std::result::Result<ServiceDescriptor, CatalogError> {
    let path_segment = raw
        .path
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| CatalogError::invalid_service(&name, "missing path"))?;
    let uri_hint = raw.uri_hint.unwrap_or_default();
    if service_type == ServiceType::Data && uri_hint.is_empty() {
        return Err(CatalogError::invalid_service(&name, "data services need a uri_hint"));
    }
    if let Some(url) = &raw.url
        && !validators::is_reference(url)
    {
        return Err(CatalogError::invalid_service(&name, format!("url '{url}' is not a platform reference")));
    }

    let endpoints = match raw.endpoints {
        RawEndpoints::Names(names) => {
            if service_type == ServiceType::Web {
                return Err(CatalogError::invalid_service(&name, "web endpoints must declare a schema"));
            }
            names.into_iter().map(EndpointDescriptor::named).collect::<Vec<_>>()
        }
        RawEndpoints::Described(described) => described
            .into_iter()
            .map(|(endpoint, raw_endpoint)| {
                if service_type == ServiceType::Web && raw_endpoint.schema.is_none() {
                    return Err(CatalogError::invalid_service(&name, format!("endpoint {endpoint} has no schema")));
                }
                Ok(EndpointDescriptor {
                    name: endpoint,
                    schema: raw_endpoint.schema,
                    methods: raw_endpoint.methods,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };
    if endpoints.is_empty() {
        return Err(CatalogError::invalid_service(&name, "no endpoints"));
    }

    Ok(ServiceDescriptor {
        name,
        service_type,
        uri_hint,
        path_segment,
        wire_form: raw.form,
        schema_version: raw.schema.unwrap_or_default(),
        search_schema_version: raw.search_schema.unwrap_or_default(),
        read_only: raw.read_only,
        endpoints,
        default_url: raw.url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "data": {
            "Media Data Service": {"uri_hint": "data.media", "path": "data", "form": "cjson", "schema": "1.10", "endpoints": ["Media"]},
            "Media Pipeline Data Service": {"uri_hint": "data.media.pipeline", "path": "data", "endpoints": ["Job"]}
        },
        "web": {
            "User Data Service": {"uri_hint": "identity.auth", "path": "web", "endpoints": {"Authentication": {"schema": "1.1", "methods": {"signIn": []}}}}
        }
    }"#;

    fn fixture() -> ServiceCatalog {
        ServiceCatalog::from_document(FIXTURE).unwrap()
    }

    #[test]
    fn lookup_strips_the_shard_suffix() {
        let catalog = fixture();
        assert_eq!(catalog.lookup("Media Data Service 3").unwrap().name, "Media Data Service");
        assert!(matches!(catalog.lookup("Media Data Service 33"), Err(MpxError::NotFound { .. })));
    }

    #[test]
    fn find_by_endpoint_requires_the_pair() {
        let catalog = fixture();
        assert!(catalog.find_by_endpoint("Media Data Service", "Media").is_ok());
        assert!(matches!(
            catalog.find_by_endpoint("Media Data Service", "Job"),
            Err(MpxError::NotFound { .. })
        ));
    }

    #[test]
    fn longest_matching_hint_wins() {
        let target = fixture()
            .resolve_reference("http://data.media.pipeline.theplatform.com/pipeline/data/Job/7")
            .unwrap();
        assert_eq!(target.service, "Media Pipeline Data Service");
        assert_eq!(target.endpoint, "Job");
    }

    #[test]
    fn web_references_resolve_against_web_services() {
        let target = fixture()
            .resolve_reference("https://identity.auth.theplatform.com/idm/web/Authentication")
            .unwrap();
        assert_eq!(target.service, "User Data Service");
        assert_eq!(target.endpoint, "Authentication");
    }

    #[test]
    fn unknown_hosts_and_endpoints_are_address_errors() {
        let catalog = fixture();
        for reference in [
            "http://data.player.theplatform.com/player/data/Player/1",
            "http://data.media.theplatform.com/media/data/Release/1",
            "http://data.media.theplatform.com/media/data",
            "https://example.com/media/data/Media/1",
        ] {
            assert!(
                matches!(catalog.resolve_reference(reference), Err(MpxError::Address { .. })),
                "{reference} should not resolve"
            );
        }
    }

    #[test]
    fn rejects_incomplete_descriptors() {
        let cases = [
            r#"{"data": {"X": {"path": "data", "endpoints": ["A"]}}}"#,
            r#"{"data": {"X": {"uri_hint": "x", "endpoints": ["A"]}}}"#,
            r#"{"data": {"X": {"uri_hint": "x", "path": "data", "endpoints": []}}}"#,
            r#"{"web": {"X": {"path": "web", "endpoints": ["A"]}}}"#,
            r#"{"web": {"X": {"path": "web", "endpoints": {"A": {"methods": {}}}}}}"#,
            r#"{"data": {"X": {"uri_hint": "x", "path": "data", "endpoints": ["A"], "url": "http://example.com"}}}"#,
        ];
        for case in cases {
            assert!(
                matches!(ServiceCatalog::from_document(case), Err(CatalogError::InvalidService { .. })),
                "{case} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_unknown_types_and_forms() {
        assert!(matches!(
            ServiceCatalog::from_document(r#"{"rpc": {}}"#),
            Err(CatalogError::Json { .. })
        ));
        assert!(matches!(
            ServiceCatalog::from_document(r#"{"data": {"X": {"uri_hint": "x", "path": "data", "form": "xml", "endpoints": ["A"]}}}"#),
            Err(CatalogError::Json { .. })
        ));
    }

    #[test]
    fn from_dir_reads_the_three_type_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("data_services.json"), r#"{"D": {"uri_hint": "data.d", "path": "data", "endpoints": ["E"]}}"#).unwrap();
        fs::write(dir.path().join("web_services.json"), "{}").unwrap();
        fs::write(dir.path().join("ingest_services.json"), "{}").unwrap();

        let catalog = ServiceCatalog::from_dir(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);

        fs::remove_file(dir.path().join("ingest_services.json")).unwrap();
        assert!(matches!(ServiceCatalog::from_dir(dir.path()), Err(CatalogError::Io { .. })));
    }
}
