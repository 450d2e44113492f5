//! Predicates over platform identifiers.
//!
//! A *reference* is the canonical long-form URL of one platform object. An
//! *account id* is either the root tenant identifier or a reference to an
//! `Account` object.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::{MpxError, Result};

/// Identifier of the bootstrap tenant whose domain ships with the SDK.
pub const ROOT_ACCOUNT_ID: &str = "urn:theplatform:auth:root";

/// Every service host lives under this domain.
pub const PLATFORM_DOMAIN: &str = ".theplatform.com";

const WEB_HOST: &str = "web.theplatform.com";
const FEED_HOST_PREFIX: &str = "feed.media.theplatform";

static ACCOUNT_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/account/\d+$").expect("account path pattern"));

/// Returns `true` when `candidate` is a well-formed platform reference.
///
/// Public web and feed hosts are excluded; they serve content, not objects.
pub fn is_reference(candidate: &str) -> bool {
    let Ok(parsed) = Url::parse(candidate) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    host != WEB_HOST && host.ends_with(PLATFORM_DOMAIN) && !host.starts_with(FEED_HOST_PREFIX)
}

/// Returns `true` for the root tenant or a reference to an account object.
pub fn is_account_id(candidate: &str) -> bool {
    if candidate == ROOT_ACCOUNT_ID {
        return true;
    }
    is_reference(candidate) && ACCOUNT_PATH.is_match(&candidate.to_ascii_lowercase())
}

/// Fails with [`MpxError::Address`] unless `candidate` is a reference.
pub fn require_reference(candidate: &str) -> Result<()> {
    if is_reference(candidate) {
        return Ok(());
    }
    Err(MpxError::address(candidate, "expected an http(s) URL on a platform host"))
}

/// Fails with [`MpxError::Validation`] unless `candidate` is an account id.
pub fn require_account_id(candidate: &str) -> Result<()> {
    if is_account_id(candidate) {
        return Ok(());
    }
    Err(MpxError::validation(
        "account_id",
        candidate,
        "expected the root tenant or an .../data/Account/<number> reference",
    ))
}
