//! Host, path and query assembly.
//!
//! Every request URL is derived from three sources: the service catalog
//! (path segment, schema, form), the tenant registry (base URL of the service
//! for the tenant) and the token provider. Nothing here performs I/O; the
//! tenant's domain must already be cached (see `MpxClient::resolve_domain`).

use mpx_api::{SIGN_IN_TOKEN, TokenProvider};
use mpx_registry::{ServiceCatalog, TenantRegistry};
use mpx_types::{MpxError, ROOT_ACCOUNT_ID, Result, ServiceDescriptor, split_shard};
use serde_json::{Map, Value};
use tracing::warn;
use url::Url;

/// Data service paging and shaping parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataOptions {
    /// Opaque range expression, e.g. `1-100`.
    pub range: Option<String>,
    /// Sent only when true.
    pub count: Option<bool>,
    /// Sent only when true.
    pub entries: Option<bool>,
    /// Opaque sort expression, e.g. `title|desc`.
    pub sort: Option<String>,
}

impl DataOptions {
    fn apply(&self, query: &mut Map<String, Value>) {
        if let Some(range) = &self.range {
            query.insert("range".into(), Value::String(range.clone()));
        }
        if self.count == Some(true) {
            query.insert("count".into(), Value::Bool(true));
        }
        if self.entries == Some(true) {
            query.insert("entries".into(), Value::Bool(true));
        }
        if let Some(sort) = &self.sort {
            query.insert("sort".into(), Value::String(sort.clone()));
        }
    }
}

/// Derives request addresses from the catalog and a tenant registry.
#[derive(Clone, Copy)]
pub struct AddressAssembler<'a> {
    catalog: &'a ServiceCatalog,
    registry: &'a TenantRegistry,
    tokens: &'a dyn TokenProvider,
}

impl<'a> AddressAssembler<'a> {
    pub fn new(catalog: &'a ServiceCatalog, registry: &'a TenantRegistry, tokens: &'a dyn TokenProvider) -> Self {
        Self {
            catalog,
            registry,
            tokens,
        }
    }

    /// `scheme://host[:port]` serving `service` for `tenant` (root when `None`).
    ///
    /// A shard digit on a data service name is spliced into the host right
    /// after the service's uri hint: `Media Data Service 3` on
    /// `data.media.theplatform.com` is served from `data.media3.theplatform.com`.
    pub fn host(&self, tenant: Option<&str>, service: &str) -> Result<String> {
        self.tokens.current_token()?;
        let descriptor = self.catalog.lookup(service)?;
        let base = self.base_url(tenant, descriptor)?;
        let mut host = base
            .host_str()
            .ok_or_else(|| MpxError::address(base.as_str(), "base url has no host"))?
            .to_string();

        if let (_, Some(shard)) = split_shard(service)
            && descriptor.is_data()
        {
            host = splice_shard(&host, &descriptor.uri_hint, shard);
        }

        Ok(match base.port() {
            Some(port) => format!("{}://{}:{}", base.scheme(), host, port),
            None => format!("{}://{}", base.scheme(), host),
        })
    }

    /// `{base path}/{path segment}/{endpoint}[/{extra_path}][/feed][/{ids}]`.
    ///
    /// `/feed` is only added for data services; `ids` are short ids joined with `,`.
    pub fn path(
        &self,
        service: &str,
        endpoint: &str,
        extra_path: Option<&str>,
        ids: &[String],
        tenant: Option<&str>,
    ) -> Result<String> {
        let descriptor = self.catalog.find_by_endpoint(service, endpoint)?;
        let base = self.base_url(tenant, descriptor)?;

        let mut path = format!(
            "{}/{}/{}",
            base.path().trim_end_matches('/'),
            descriptor.path_segment,
            endpoint
        );
        if let Some(extra_path) = extra_path.filter(|extra| !extra.is_empty()) {
            path.push('/');
            path.push_str(extra_path.trim_matches('/'));
        }
        if descriptor.is_data() {
            path.push_str("/feed");
        }
        if !ids.is_empty() {
            path.push('/');
            path.push_str(&ids.join(","));
        }
        Ok(path)
    }

    /// Query parameters for a call to `endpoint` of `service`.
    ///
    /// Always `schema` and `form`; `token` unless the current token is the
    /// sign-in placeholder; `account` for tenants other than root; the data
    /// options for data services. `extra` is applied last and wins.
    pub fn query(
        &self,
        tenant: Option<&str>,
        service: &str,
        endpoint: &str,
        extra: &Map<String, Value>,
        options: &DataOptions,
    ) -> Result<Map<String, Value>> {
        let token = self.tokens.current_token()?;
        let descriptor = self.catalog.find_by_endpoint(service, endpoint)?;

        let schema = if descriptor.is_data() {
            descriptor.schema_version.clone()
        } else {
            descriptor
                .endpoint(endpoint)
                .and_then(|endpoint| endpoint.schema.clone())
                .unwrap_or_else(|| descriptor.schema_version.clone())
        };

        let mut query = Map::new();
        if token != SIGN_IN_TOKEN {
            query.insert("token".into(), Value::String(token));
        }
        query.insert("schema".into(), Value::String(schema));
        query.insert("form".into(), Value::String(descriptor.wire_form.to_string()));
        if descriptor.is_data() {
            options.apply(&mut query);
        }
        if let Some(tenant) = tenant.filter(|tenant| *tenant != ROOT_ACCOUNT_ID) {
            query.insert("account".into(), Value::String(tenant.to_string()));
        }
        for (key, value) in extra {
            query.insert(key.clone(), value.clone());
        }
        Ok(query)
    }

    /// Host and path joined.
    pub fn url(
        &self,
        tenant: Option<&str>,
        service: &str,
        endpoint: &str,
        extra_path: Option<&str>,
        ids: &[String],
    ) -> Result<String> {
        let host = self.host(tenant, service)?;
        let path = self.path(service, endpoint, extra_path, ids, tenant)?;
        Ok(format!("{host}{path}"))
    }

    /// The tenant's base URL for the service, else the cataloged default.
    fn base_url(&self, tenant: Option<&str>, descriptor: &ServiceDescriptor) -> Result<Url> {
        let tenant = tenant.unwrap_or(ROOT_ACCOUNT_ID);
        let raw = self
            .registry
            .service_url(tenant, &descriptor.name)
            .or_else(|| descriptor.default_url.clone())
            .ok_or_else(|| MpxError::not_found("service url", format!("{} for {tenant}", descriptor.name)))?;
        Url::parse(&raw).map_err(|error| MpxError::address(raw.as_str(), error.to_string()))
    }
}

fn splice_shard(host: &str, hint: &str, shard: u8) -> String {
    match host.find(hint) {
        Some(start) => {
            let end = start + hint.len();
            format!("{}{}{}", &host[..end], shard, &host[end..])
        }
        None => {
            warn!(host, hint, shard, "shard requested but the host does not contain the service hint");
            host.to_string()
        }
    }
}
