//! Per-tenant service domains.
//!
//! Every tenant (account) may be served from its own set of hosts. The
//! [`TenantRegistry`] caches one [`TenantDomain`] per tenant for the lifetime
//! of the client: the root tenant comes from the bundled snapshot and the
//! others are fetched on first use through a [`DomainResolver`].

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{Arc, PoisonError, RwLock},
    time::Instant,
};

use async_trait::async_trait;
use indexmap::IndexMap;
use mpx_types::{MpxError, ROOT_ACCOUNT_ID, Result, validators};
use serde_json::Value;
use tracing::{debug, info};

use crate::CatalogError;

const EMBEDDED_ROOT_SNAPSHOT: &str = include_str!(concat!(env!("OUT_DIR"), "/root_registry_sea1.json"));

/// Key of the service map inside a registry answer.
pub const RESOLVE_DOMAIN_RESPONSE: &str = "resolveDomainResponse";

/// Service name to base URL.
pub type ServiceUrls = IndexMap<String, String>;

/// The resolved service map of one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantDomain {
    tenant: String,
    services: ServiceUrls,
}

impl TenantDomain {
    pub fn new(tenant: impl Into<String>, services: ServiceUrls) -> Self {
        Self {
            tenant: tenant.into(),
            services,
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn service_url(&self, service: &str) -> Option<&str> {
        self.services.get(service).map(String::as_str)
    }

    pub fn services(&self) -> &ServiceUrls {
        &self.services
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Reads the service map out of `{"resolveDomainResponse": {name: url, ...}}`.
pub fn parse_resolve_domain_response(value: &Value) -> Result<ServiceUrls> {
    let Some(Value::Object(map)) = value.get(RESOLVE_DOMAIN_RESPONSE) else {
        return Err(MpxError::decode(
            "registry answer",
            format!("missing object '{RESOLVE_DOMAIN_RESPONSE}'"),
            String::new(),
        ));
    };
    map.iter()
        .map(|(service, url)| match url {
            Value::String(url) => Ok((service.clone(), url.clone())),
            other => Err(MpxError::decode(
                "registry answer",
                format!("url of '{service}' is not a string"),
                other.to_string(),
            )),
        })
        .collect()
}

/// Fetches the service map of a tenant that is not cached yet.
#[async_trait]
pub trait DomainResolver: Send + Sync {
    async fn resolve_domain(&self, tenant: &str) -> Result<ServiceUrls>;
}

/// Cache of tenant domains. Values are replaced whole, never edited in place.
#[derive(Debug)]
pub struct TenantRegistry {
    domains: RwLock<HashMap<String, Arc<TenantDomain>>>,
}

impl TenantRegistry {
    /// A registry seeded with the root tenant's services.
    pub fn new(root_services: ServiceUrls) -> Self {
        let root = Arc::new(TenantDomain::new(ROOT_ACCOUNT_ID, root_services));
        Self {
            domains: RwLock::new(HashMap::from([(ROOT_ACCOUNT_ID.to_string(), root)])),
        }
    }

    /// Seeded from the snapshot bundled at build time.
    pub fn from_embedded() -> std::result::Result<Self, CatalogError> {
        Self::from_snapshot_str(EMBEDDED_ROOT_SNAPSHOT)
    }

    pub fn from_snapshot_file(path: &Path) -> std::result::Result<Self, CatalogError> {
        let content = fs::read_to_string(path).map_err(|error| CatalogError::io(path, error))?;
        Self::from_snapshot_str(&content)
    }

    pub fn from_snapshot_str(content: &str) -> std::result::Result<Self, CatalogError> {
        let value: Value = serde_json::from_str(content).map_err(|error| CatalogError::json("registry snapshot", error))?;
        let services = parse_resolve_domain_response(&value).map_err(|error| CatalogError::InvalidSnapshot {
            reason: error.to_string(),
        })?;
        Ok(Self::new(services))
    }

    /// Cached domain of `tenant`, without fetching.
    pub fn get(&self, tenant: &str) -> Option<Arc<TenantDomain>> {
        self.domains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant)
            .cloned()
    }

    pub fn root(&self) -> Option<Arc<TenantDomain>> {
        self.get(ROOT_ACCOUNT_ID)
    }

    /// Cached domain of `tenant`, fetched through `resolver` on a miss.
    ///
    /// `None` means the root tenant, which is never fetched. Two concurrent
    /// misses for the same tenant may both fetch; the later store wins.
    pub async fn resolve(&self, tenant: Option<&str>, resolver: &dyn DomainResolver) -> Result<Arc<TenantDomain>> {
        let tenant = tenant.unwrap_or(ROOT_ACCOUNT_ID);
        if let Some(domain) = self.get(tenant) {
            debug!(tenant, "tenant domain cache hit");
            return Ok(domain);
        }
        if tenant == ROOT_ACCOUNT_ID {
            return Err(MpxError::not_found("tenant domain", tenant));
        }
        validators::require_account_id(tenant)?;

        let start = Instant::now();
        debug!(tenant, "tenant domain cache miss");
        let services = resolver.resolve_domain(tenant).await?;
        let domain = self.store(tenant, services)?;
        info!(
            tenant,
            service_count = domain.len(),
            duration_ms = start.elapsed().as_millis(),
            "tenant domain resolved"
        );
        Ok(domain)
    }

    /// Caches `services` for `tenant`, replacing any previous value.
    pub fn store(&self, tenant: &str, services: ServiceUrls) -> Result<Arc<TenantDomain>> {
        validators::require_account_id(tenant)?;
        let domain = Arc::new(TenantDomain::new(tenant, services));
        self.domains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant.to_string(), Arc::clone(&domain));
        debug!(tenant, service_count = domain.len(), "tenant domain stored");
        Ok(domain)
    }

    /// Base URL of `service` for an already cached `tenant`.
    pub fn service_url(&self, tenant: &str, service: &str) -> Option<String> {
        self.get(tenant)?.service_url(service).map(str::to_string)
    }

    /// Tenants currently cached, sorted.
    pub fn tenants(&self) -> Vec<String> {
        let mut tenants: Vec<String> = self
            .domains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        tenants.sort();
        tenants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_registry_answers() {
        let services = parse_resolve_domain_response(&json!({
            "resolveDomainResponse": {"Media Data Service": "http://data.media.theplatform.com/media"}
        }))
        .unwrap();
        assert_eq!(services.get("Media Data Service").map(String::as_str), Some("http://data.media.theplatform.com/media"));
    }

    #[test]
    fn rejects_malformed_registry_answers() {
        assert!(matches!(parse_resolve_domain_response(&json!({})), Err(MpxError::Decode { .. })));
        assert!(matches!(
            parse_resolve_domain_response(&json!({"resolveDomainResponse": {"Media Data Service": 1}})),
            Err(MpxError::Decode { .. })
        ));
    }

    #[test]
    fn store_validates_the_tenant() {
        let registry = TenantRegistry::new(ServiceUrls::new());
        let error = registry.store("not-an-account", ServiceUrls::new()).unwrap_err();
        assert!(matches!(error, MpxError::Validation { .. }));
        assert_eq!(registry.tenants(), vec![ROOT_ACCOUNT_ID.to_string()]);
    }

    #[test]
    fn store_replaces_the_whole_domain() {
        let registry = TenantRegistry::new(ServiceUrls::new());
        let tenant = "http://access.auth.theplatform.com/data/Account/42";
        registry
            .store(tenant, ServiceUrls::from([("A".to_string(), "http://a.theplatform.com".to_string())]))
            .unwrap();
        let before = registry.get(tenant).unwrap();
        registry
            .store(tenant, ServiceUrls::from([("B".to_string(), "http://b.theplatform.com".to_string())]))
            .unwrap();

        assert_eq!(before.service_url("A"), Some("http://a.theplatform.com"));
        assert_eq!(registry.service_url(tenant, "A"), None);
        assert_eq!(registry.service_url(tenant, "B").as_deref(), Some("http://b.theplatform.com"));
    }

    #[test]
    fn snapshot_without_response_key_is_rejected() {
        assert!(matches!(
            TenantRegistry::from_snapshot_str(r#"{"services": {}}"#),
            Err(CatalogError::InvalidSnapshot { .. })
        ));
    }
}
