//! Service verbs on top of the address layer.
//!
//! [`MpxClient`] owns the catalog, the tenant registry and the two
//! collaborators (transport and token provider). Each verb follows the same
//! sequence: check the token, validate the (service, endpoint) pair, make sure
//! the tenant's domain is cached, assemble host/path/query, and hand the
//! request to the transport. Responses are returned as [`Response`] so the
//! caller decides how strictly to read them.

use std::{sync::Arc, time::Instant};

use anyhow::Context;
use async_trait::async_trait;
use indexmap::IndexMap;
use mpx_api::{HttpMethod, HttpRequest, HttpTransport, StaticToken, TokenProvider, Transport, TransportConfig};
use mpx_registry::{
    DomainResolver, RegistryConfig, ServiceCatalog, ServiceUrls, TenantDomain, TenantRegistry, parse_resolve_domain_response,
};
use mpx_types::{Entries, Entry, MpxError, Page, Result, ServiceDescriptor, ServiceType};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{AddressAssembler, DataOptions, Response, redact_sensitive};

const ACCESS_DATA_SERVICE: &str = "Access Data Service";
const REGISTRY_ENDPOINT: &str = "Registry";
const RESOLVE_DOMAIN_METHOD: &str = "resolveDomain";

/// A data service call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataRequest {
    pub service: String,
    pub endpoint: String,
    /// Tenant the call is made for; root when `None`.
    pub account: Option<String>,
    pub extra_path: Option<String>,
    /// Short ids appended to the feed path.
    pub ids: Vec<String>,
    /// Comma separated field list, sent as `fields`.
    pub fields: Option<String>,
    pub query: Map<String, Value>,
    pub headers: IndexMap<String, String>,
    pub options: DataOptions,
}

impl DataRequest {
    pub fn new(service: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }
}

/// A web (RPC) service call: `{method: arguments}` posted to the endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebRequest {
    pub service: String,
    pub endpoint: String,
    pub method: String,
    pub arguments: Map<String, Value>,
    pub account: Option<String>,
    pub extra_path: Option<String>,
    pub query: Map<String, Value>,
    pub headers: IndexMap<String, String>,
}

impl WebRequest {
    pub fn new(service: impl Into<String>, endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            endpoint: endpoint.into(),
            method: method.into(),
            ..Self::default()
        }
    }
}

/// An ingest call: an opaque payload posted without query parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestRequest {
    pub service: String,
    pub endpoint: String,
    pub account: Option<String>,
    pub extra_path: Option<String>,
    pub payload: String,
    pub headers: IndexMap<String, String>,
}

impl IngestRequest {
    pub fn new(service: impl Into<String>, endpoint: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            endpoint: endpoint.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }
}

/// Entry point of the SDK.
pub struct MpxClient {
    catalog: Arc<ServiceCatalog>,
    registry: TenantRegistry,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenProvider>,
}

impl MpxClient {
    pub fn new(
        catalog: Arc<ServiceCatalog>,
        registry: TenantRegistry,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            catalog,
            registry,
            transport,
            tokens,
        }
    }

    /// A client wired from the environment: registry config file, transport
    /// timeouts and `MPX_TOKEN`.
    pub fn from_env() -> anyhow::Result<Self> {
        let config = RegistryConfig::load()?;
        let catalog = config.load_catalog().context("load service catalog")?;
        let registry = config.load_registry().context("load root registry snapshot")?;
        let transport = HttpTransport::new(&TransportConfig::from_env()).context("build http transport")?;
        Ok(Self::new(
            Arc::new(catalog),
            registry,
            Arc::new(transport),
            Arc::new(StaticToken::from_env()),
        ))
    }

    pub fn catalog(&self) -> &ServiceCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &TenantRegistry {
        &self.registry
    }

    pub fn assembler(&self) -> AddressAssembler<'_> {
        AddressAssembler::new(&self.catalog, &self.registry, self.tokens.as_ref())
    }

    /// Cached domain of `tenant`, asking the Access Data Service on a miss.
    pub async fn resolve_domain(&self, tenant: Option<&str>) -> Result<Arc<TenantDomain>> {
        self.registry.resolve(tenant, &WebDomainResolver { client: self }).await
    }

    /// Assembles a data call without sending it.
    pub fn data_request(&self, method: HttpMethod, request: &DataRequest) -> Result<HttpRequest> {
        let assembler = self.assembler();
        let account = request.account.as_deref();
        let url = assembler.url(
            account,
            &request.service,
            &request.endpoint,
            request.extra_path.as_deref(),
            &request.ids,
        )?;
        let mut extra = Map::new();
        if let Some(fields) = &request.fields {
            extra.insert("fields".into(), Value::String(fields.clone()));
        }
        extra.extend(request.query.clone());
        let query = assembler.query(account, &request.service, &request.endpoint, &extra, &request.options)?;
        let mut http_request = HttpRequest::new(method, url).with_query(query);
        http_request.headers = request.headers.clone();
        Ok(http_request)
    }

    pub async fn data_get(&self, request: &DataRequest) -> Result<Response> {
        self.prepare(&request.service, &request.endpoint, ServiceType::Data, request.account.as_deref())
            .await?;
        let http_request = self.data_request(HttpMethod::Get, request)?;
        self.send(http_request).await
    }

    pub async fn data_delete(&self, request: &DataRequest) -> Result<Response> {
        let service = self
            .prepare(&request.service, &request.endpoint, ServiceType::Data, request.account.as_deref())
            .await?;
        reject_read_only(service)?;
        let http_request = self.data_request(HttpMethod::Delete, request)?;
        self.send(http_request).await
    }

    pub async fn data_post(&self, request: &DataRequest, page: &Page) -> Result<Response> {
        self.data_write(HttpMethod::Post, request, page).await
    }

    pub async fn data_put(&self, request: &DataRequest, page: &Page) -> Result<Response> {
        self.data_write(HttpMethod::Put, request, page).await
    }

    /// Posts `{method: arguments}` after checking both against the catalog.
    pub async fn web_post(&self, request: &WebRequest) -> Result<Response> {
        self.prepare(&request.service, &request.endpoint, ServiceType::Web, request.account.as_deref())
            .await?;
        self.send_web(request).await
    }

    pub async fn ingest_post(&self, request: &IngestRequest) -> Result<Response> {
        self.prepare(&request.service, &request.endpoint, ServiceType::Ingest, request.account.as_deref())
            .await?;
        let url = self.assembler().url(
            request.account.as_deref(),
            &request.service,
            &request.endpoint,
            request.extra_path.as_deref(),
            &[],
        )?;
        let mut http_request = HttpRequest::new(HttpMethod::Post, url).with_body(request.payload.clone());
        http_request.headers = request.headers.clone();
        self.send(http_request).await
    }

    /// Loads the record `id` refers to.
    pub async fn load_entry(&self, id: &str, fields: Option<&str>, account: Option<&str>) -> Result<Entry> {
        let target = self.catalog.resolve_reference(id)?;
        let short_id = id
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| MpxError::address(id, "no short id in the reference"))?;

        let request = DataRequest {
            account: account.map(str::to_string),
            ids: vec![short_id.to_string()],
            fields: fields.map(str::to_string),
            ..DataRequest::new(target.service, target.endpoint)
        };
        let page = self.data_get(&request).await?.page()?;
        let mut entry = Entries::from_page(&page, self.catalog.as_ref())?
            .into_iter()
            .next()
            .ok_or_else(|| MpxError::not_found("entry", id))?;
        if !entry.is_identified() {
            entry.set_id(Some(id), self.catalog.as_ref())?;
        }
        Ok(entry)
    }

    /// Updates an identified entry, creates an unidentified one.
    pub async fn save_entry(&self, entry: &Entry, account: Option<&str>) -> Result<Response> {
        let (Some(service), Some(endpoint)) = (entry.service(), entry.endpoint()) else {
            return Err(MpxError::validation(
                "entry",
                entry.id().unwrap_or("<new>"),
                "service and endpoint must be set before saving",
            ));
        };
        let request = DataRequest {
            account: account.map(str::to_string),
            ..DataRequest::new(service, endpoint)
        };
        let page = entry.to_page();
        if entry.is_identified() {
            self.data_put(&request, &page).await
        } else {
            self.data_post(&request, &page).await
        }
    }

    async fn data_write(&self, method: HttpMethod, request: &DataRequest, page: &Page) -> Result<Response> {
        let service = self
            .prepare(&request.service, &request.endpoint, ServiceType::Data, request.account.as_deref())
            .await?;
        reject_read_only(service)?;

        let assembler = self.assembler();
        let account = request.account.as_deref();
        let url = assembler.url(account, &request.service, &request.endpoint, request.extra_path.as_deref(), &[])?;
        let query = assembler.query(account, &request.service, &request.endpoint, &request.query, &DataOptions::default())?;
        let mut http_request = HttpRequest::new(method, url)
            .with_query(query)
            .with_body(page.to_json(false)?);
        http_request.headers = request.headers.clone();
        self.send(http_request).await
    }

    /// Common checks of every verb; returns the service descriptor.
    async fn prepare(&self, service: &str, endpoint: &str, expected: ServiceType, account: Option<&str>) -> Result<&ServiceDescriptor> {
        self.tokens.current_token()?;
        let descriptor = self.catalog.find_by_endpoint(service, endpoint)?;
        if descriptor.service_type != expected {
            return Err(MpxError::validation(
                "service",
                service,
                format!("is a {} service, expected {expected}", descriptor.service_type),
            ));
        }
        self.resolve_domain(account).await?;
        Ok(descriptor)
    }

    /// Web post without tenant resolution; the domain must already be cached.
    async fn send_web(&self, request: &WebRequest) -> Result<Response> {
        let descriptor = self.catalog.find_by_endpoint(&request.service, &request.endpoint)?;
        let payload = assemble_payload(descriptor, &request.endpoint, &request.method, &request.arguments)?;

        let assembler = self.assembler();
        let account = request.account.as_deref();
        let url = assembler.url(account, &request.service, &request.endpoint, request.extra_path.as_deref(), &[])?;
        let query = assembler.query(account, &request.service, &request.endpoint, &request.query, &DataOptions::default())?;
        let body = serde_json::to_string(&payload).map_err(|error| MpxError::decode("web payload", error.to_string(), String::new()))?;

        let mut http_request = HttpRequest::new(HttpMethod::Post, url).with_query(query).with_body(body);
        http_request.headers = request.headers.clone();
        self.send(http_request).await
    }

    async fn send(&self, request: HttpRequest) -> Result<Response> {
        let start = Instant::now();
        let method = request.method;
        let url = request.url.clone();
        debug!(
            method = %method,
            url = %url,
            query = %redact_sensitive(&render_query(&request.query)),
            "mpx call started"
        );
        let response = Response::from(self.transport.perform(request).await?);
        debug!(
            method = %method,
            url = %url,
            status = response.status(),
            healthy = response.is_healthy(),
            duration_ms = start.elapsed().as_millis(),
            "mpx call completed"
        );
        Ok(response)
    }
}

/// Builds `{method: arguments}` after checking the method exists on the
/// endpoint and every argument is one it accepts.
pub fn assemble_payload(
    service: &ServiceDescriptor,
    endpoint: &str,
    method: &str,
    arguments: &Map<String, Value>,
) -> Result<Value> {
    let accepted = service
        .endpoint(endpoint)
        .and_then(|descriptor| descriptor.methods.get(method))
        .ok_or_else(|| MpxError::validation("method", method, format!("not a method of {}/{endpoint}", service.name)))?;
    if let Some(unknown) = arguments.keys().find(|argument| !accepted.contains(argument)) {
        return Err(MpxError::validation(
            "argument",
            unknown.as_str(),
            format!("{method} accepts {}", accepted.join(", ")),
        ));
    }
    Ok(Value::Object(Map::from_iter([(method.to_string(), Value::Object(arguments.clone()))])))
}

fn reject_read_only(service: &ServiceDescriptor) -> Result<()> {
    if service.read_only {
        return Err(MpxError::validation("service", service.name.as_str(), "is read only"));
    }
    Ok(())
}

fn render_query(query: &Map<String, Value>) -> String {
    query
        .iter()
        .map(|(key, value)| match value {
            Value::String(text) => format!("{key}={text}"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Resolves tenants through `Access Data Service` / `Registry` / `resolveDomain`.
struct WebDomainResolver<'a> {
    client: &'a MpxClient,
}

#[async_trait]
impl DomainResolver for WebDomainResolver<'_> {
    async fn resolve_domain(&self, tenant: &str) -> Result<ServiceUrls> {
        let mut request = WebRequest::new(ACCESS_DATA_SERVICE, REGISTRY_ENDPOINT, RESOLVE_DOMAIN_METHOD);
        request.arguments.insert("accountId".into(), Value::String(tenant.to_string()));
        let data = self.client.send_web(&request).await?.data()?;
        parse_resolve_domain_response(&data)
    }
}
