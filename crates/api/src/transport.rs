use std::{fmt, str::FromStr, time::Instant};

use async_trait::async_trait;
use indexmap::IndexMap;
use mpx_types::{MpxError, Result, validators};
use reqwest::{Client, header};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::TransportConfig;

/// Verbs the platform accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = MpxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            _ => Err(MpxError::transport(format!("unsupported method '{s}'; expected GET, PUT, POST or DELETE"))),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request ready to be sent: absolute URL without query, query pairs kept apart.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Map<String, Value>,
    pub headers: IndexMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Map::new(),
            headers: IndexMap::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// What came back, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: IndexMap<String, String>,
    pub body: String,
}

/// Executes assembled requests. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: HttpRequest) -> Result<RawResponse>;
}

/// [`Transport`] backed by a single pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .build()
            .map_err(|error| MpxError::transport(format!("could not build the http client: {error}")))?;

        Ok(Self {
            http,
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(&self, request: HttpRequest) -> Result<RawResponse> {
        if !validators::is_reference(&request.url) {
            return Err(MpxError::transport(format!(
                "refusing to send to '{}': not a platform reference",
                request.url
            )));
        }

        let start = Instant::now();
        let method = request.method;
        debug!(
            method = %method,
            url = %request.url,
            query_parameter_count = request.query.len(),
            has_body = request.body.is_some(),
            "http request started"
        );

        let mut builder = self
            .http
            .request(method.into(), &request.url)
            .header(header::USER_AGENT, &self.user_agent);
        if !request.query.is_empty() {
            builder = builder.query(&build_query_pairs(request.query));
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.header(header::CONTENT_TYPE, "application/json").body(body);
        }

        // reqwest errors embed the full url, query token included
        let response = builder.send().await.map_err(|error| {
            let error = error.without_url();
            warn!(
                method = %method,
                url = %request.url,
                error = %error,
                duration_ms = start.elapsed().as_millis(),
                "http request failed"
            );
            MpxError::transport(error.to_string())
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string())))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|error| MpxError::transport(error.without_url().to_string()))?;

        debug!(
            method = %method,
            url = %request.url,
            status,
            body_len = body.len(),
            duration_ms = start.elapsed().as_millis(),
            "http request completed"
        );
        Ok(RawResponse { status, headers, body })
    }
}

/// Flattens query values into string pairs, repeating the key for arrays.
pub fn build_query_pairs(query_parameters: Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in query_parameters {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), query_value_to_string(item)));
                }
            }
            Value::Null => {}
            other => pairs.push((key, query_value_to_string(other))),
        }
    }
    pairs
}

fn query_value_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn build_query_pairs_repeats_array_values_and_drops_nulls() {
        let query = Map::from_iter([
            ("byCategories".to_string(), json!(["news", "sports"])),
            ("count".to_string(), json!(true)),
            ("range".to_string(), Value::Null),
        ]);

        let pairs = build_query_pairs(query);

        assert_eq!(
            pairs,
            vec![
                ("byCategories".to_string(), "news".to_string()),
                ("byCategories".to_string(), "sports".to_string()),
                ("count".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn methods_parse_case_insensitively() {
        assert_eq!("put".parse::<HttpMethod>().unwrap(), HttpMethod::Put);
        assert!(matches!("PATCH".parse::<HttpMethod>(), Err(MpxError::Transport { .. })));
    }

    #[tokio::test]
    async fn non_platform_urls_are_refused_before_sending() {
        let transport = HttpTransport::new(&TransportConfig::default()).unwrap();
        let request = HttpRequest::new(HttpMethod::Get, "https://example.com/data/Media/feed");

        let error = transport.perform(request).await.unwrap_err();

        assert!(matches!(error, MpxError::Transport { .. }));
        assert!(error.to_string().contains("example.com"));
    }
}
