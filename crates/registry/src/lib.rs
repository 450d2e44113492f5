//! Reference data for the mpx SDK.
//!
//! - [`ServiceCatalog`]: which services exist, their paths, schemas and endpoints
//! - [`TenantRegistry`]: where each tenant's services live, cached per client
//! - [`RegistryConfig`]: optional on-disk overrides for both

pub mod catalog;
pub mod config;
pub mod error;
pub mod tenant;

pub use catalog::ServiceCatalog;
pub use config::{REGISTRY_CONFIG_ENV, RegistryConfig, default_config_path};
pub use error::CatalogError;
pub use tenant::{
    DomainResolver, RESOLVE_DOMAIN_RESPONSE, ServiceUrls, TenantDomain, TenantRegistry, parse_resolve_domain_response,
};
