use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use mpx_registry::{DomainResolver, ServiceUrls, TenantRegistry};
use mpx_types::{MpxError, ROOT_ACCOUNT_ID, Result};

const TENANT: &str = "http://access.auth.theplatform.com/data/Account/2051509925";

#[derive(Default)]
struct CountingResolver {
    calls: AtomicUsize,
}

#[async_trait]
impl DomainResolver for CountingResolver {
    async fn resolve_domain(&self, tenant: &str) -> Result<ServiceUrls> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(tenant, TENANT);
        Ok(ServiceUrls::from([(
            "Media Data Service".to_string(),
            "http://data.media.theplatform.com/media".to_string(),
        )]))
    }
}

struct FailingResolver;

#[async_trait]
impl DomainResolver for FailingResolver {
    async fn resolve_domain(&self, _tenant: &str) -> Result<ServiceUrls> {
        Err(MpxError::transport("connection refused"))
    }
}

#[tokio::test]
async fn root_tenant_is_served_from_the_snapshot() {
    let registry = TenantRegistry::from_embedded().expect("embedded snapshot");
    let resolver = CountingResolver::default();

    let root = registry.resolve(None, &resolver).await.unwrap();
    let explicit = registry.resolve(Some(ROOT_ACCOUNT_ID), &resolver).await.unwrap();

    assert_eq!(root, explicit);
    assert_eq!(
        root.service_url("Media Data Service"),
        Some("http://data.media.theplatform.com/media")
    );
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn other_tenants_are_fetched_once_then_cached() {
    let registry = TenantRegistry::from_embedded().expect("embedded snapshot");
    let resolver = CountingResolver::default();

    let first = registry.resolve(Some(TENANT), &resolver).await.unwrap();
    let second = registry.resolve(Some(TENANT), &resolver).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert!(registry.tenants().contains(&TENANT.to_string()));
}

#[tokio::test]
async fn invalid_tenants_are_rejected_before_fetching() {
    let registry = TenantRegistry::from_embedded().expect("embedded snapshot");
    let resolver = CountingResolver::default();

    let error = registry.resolve(Some("account 42"), &resolver).await.unwrap_err();

    assert!(matches!(error, MpxError::Validation { .. }));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn resolver_failures_leave_the_cache_untouched() {
    let registry = TenantRegistry::from_embedded().expect("embedded snapshot");

    let error = registry.resolve(Some(TENANT), &FailingResolver).await.unwrap_err();

    assert!(matches!(error, MpxError::Transport { .. }));
    assert!(registry.get(TENANT).is_none());
}

/// Yields before answering so concurrent misses overlap.
#[derive(Default)]
struct SlowResolver {
    calls: AtomicUsize,
}

fn full_domain() -> ServiceUrls {
    ServiceUrls::from([
        (
            "Media Data Service".to_string(),
            "http://data.media.theplatform.eu/media".to_string(),
        ),
        (
            "Access Data Service".to_string(),
            "https://access.auth.theplatform.eu".to_string(),
        ),
    ])
}

#[async_trait]
impl DomainResolver for SlowResolver {
    async fn resolve_domain(&self, _tenant: &str) -> Result<ServiceUrls> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        Ok(full_domain())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_converge_on_a_complete_domain() {
    let registry = Arc::new(TenantRegistry::from_embedded().expect("embedded snapshot"));
    let resolver = Arc::new(SlowResolver::default());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let resolver = Arc::clone(&resolver);
            tokio::spawn(async move { registry.resolve(Some(TENANT), resolver.as_ref()).await })
        })
        .collect();

    let mut domains = Vec::new();
    for handle in handles {
        domains.push(handle.await.expect("task").expect("resolve"));
    }

    let calls = resolver.calls.load(Ordering::SeqCst);
    assert!((1..=8).contains(&calls));
    for domain in &domains {
        assert_eq!(domain.tenant(), TENANT);
        assert_eq!(domain.services(), &full_domain());
    }
    let cached = registry.get(TENANT).expect("cached after resolve");
    assert_eq!(cached.services(), &full_domain());
    assert!(domains.iter().any(|domain| Arc::ptr_eq(domain, &cached)));
}
