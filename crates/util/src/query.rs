use mpx_types::{Entries, MpxError, Page, ReferenceResolver, Result};
use serde_json::{Map, Value};

use crate::{DataOptions, DataRequest, MpxClient};

/// A reusable data service query.
///
/// Configure the public fields, [`Query::run`] it, then read the last page
/// with [`Query::page`] or convert it with [`Query::entries`].
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub service: String,
    pub endpoint: String,
    pub account: Option<String>,
    pub extra_path: Option<String>,
    pub fields: Option<String>,
    pub ids: Vec<String>,
    pub query: Map<String, Value>,
    pub range: Option<String>,
    pub sort: Option<String>,
    pub return_count: bool,
    pub return_entries: bool,
    page: Page,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            service: String::new(),
            endpoint: String::new(),
            account: None,
            extra_path: None,
            fields: None,
            ids: Vec::new(),
            query: Map::new(),
            range: None,
            sort: None,
            return_count: false,
            return_entries: true,
            page: Page::default(),
        }
    }
}

impl Query {
    pub fn new(service: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// The request [`Query::run`] sends. Only flags that are switched on are
    /// sent, so the service defaults apply otherwise.
    pub fn params(&self) -> DataRequest {
        DataRequest {
            service: self.service.clone(),
            endpoint: self.endpoint.clone(),
            account: self.account.clone(),
            extra_path: self.extra_path.clone(),
            ids: self.ids.clone(),
            fields: self.fields.clone(),
            query: self.query.clone(),
            headers: Default::default(),
            options: DataOptions {
                range: self.range.clone(),
                count: self.return_count.then_some(true),
                entries: self.return_entries.then_some(true),
                sort: self.sort.clone(),
            },
        }
    }

    /// Fetches the page and keeps it on the query.
    pub async fn run(&mut self, client: &MpxClient) -> Result<&Page> {
        if self.service.is_empty() {
            return Err(MpxError::validation("query", "service", "must be set"));
        }
        if self.endpoint.is_empty() {
            return Err(MpxError::validation("query", "endpoint", "must be set"));
        }
        self.page = client.data_get(&self.params()).await?.page()?;
        Ok(&self.page)
    }

    /// The page of the last successful run; empty before the first one.
    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn entries(&self, resolver: &dyn ReferenceResolver) -> Result<Entries> {
        Entries::from_page(&self.page, resolver)
    }
}
