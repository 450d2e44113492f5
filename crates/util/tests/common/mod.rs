#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use mpx_api::{HttpRequest, RawResponse, StaticToken, Transport};
use mpx_registry::{ServiceCatalog, TenantRegistry};
use mpx_types::Result;
use mpx_util::MpxClient;
use serde_json::Value;

pub const TOKEN: &str = "test-token";
pub const TENANT: &str = "http://access.auth.theplatform.com/data/Account/2051509925";
pub const MEDIA_ID: &str = "http://data.media.theplatform.com/media/data/Media/1";

/// Records every request and answers from a queue (`{}` with 200 when empty).
#[derive(Default)]
pub struct RecordingTransport {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<VecDeque<RawResponse>>,
}

impl RecordingTransport {
    pub fn respond(&self, status: u16, body: Value) {
        self.responses.lock().unwrap().push_back(RawResponse {
            status,
            body: body.to_string(),
            ..RawResponse::default()
        });
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn perform(&self, request: HttpRequest) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request);
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or(RawResponse {
            status: 200,
            body: "{}".to_string(),
            ..RawResponse::default()
        }))
    }
}

pub fn catalog() -> ServiceCatalog {
    ServiceCatalog::from_embedded().expect("embedded catalog")
}

pub fn registry() -> TenantRegistry {
    TenantRegistry::from_embedded().expect("embedded root snapshot")
}

pub fn client(transport: Arc<RecordingTransport>, token: StaticToken) -> MpxClient {
    MpxClient::new(Arc::new(catalog()), registry(), transport, Arc::new(token))
}
