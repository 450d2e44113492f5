//! Request plumbing for the mpx SDK.
//!
//! [`AddressAssembler`] turns (service, endpoint, tenant) into host, path and
//! query; [`MpxClient`] drives it together with the tenant registry and the
//! transport to offer the data, web and ingest verbs; [`Query`] is a small
//! data-service query object built on top of those verbs.

pub mod client;
pub mod http;
pub mod query;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub use client::{DataRequest, IngestRequest, MpxClient, WebRequest};
pub use http::{AddressAssembler, DataOptions, Response};
pub use query::Query;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+]+)",
        r"(?i)(token=)([^&\s]+)",
        r#"(?i)("(?:token|password)"\s*:\s*")([^"]*)"#,
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s&]+)",
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts values that look like secrets in a string.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for re in SENSITIVE_PATTERNS.iter() {
        redacted = re
            .replace_all(&redacted, |caps: &Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{}<redacted>", prefix)
            })
            .to_string();
    }
    redacted
}
