//! Transport and auth collaborators for the mpx SDK.
//!
//! The address and entity layers never talk HTTP themselves. They hand a
//! fully assembled [`HttpRequest`] to a [`Transport`] and read the current
//! token from a [`TokenProvider`]. This crate defines both seams and ships
//! the default implementations:
//!
//! - [`HttpTransport`], a pooled `reqwest` client that refuses non-platform URLs
//! - [`StaticToken`], a token handed in by the caller or read from `MPX_TOKEN`
//! - [`TransportConfig`], timeouts and user agent from the environment

pub mod auth;
pub mod config;
pub mod transport;

pub use auth::{SIGN_IN_TOKEN, StaticToken, TOKEN_ENV, TokenProvider};
pub use config::TransportConfig;
pub use transport::{HttpMethod, HttpRequest, HttpTransport, RawResponse, Transport, build_query_pairs};
