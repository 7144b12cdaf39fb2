use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::domain::ResourceDescriptor;
use crate::error::SelectorError;

pub const RESOURCES_PATH: &str = "/api/rag/resources";

pub trait CatalogClient: Send + Sync {
    fn list_resources(&self, query: Option<&str>)
    -> Result<Vec<ResourceDescriptor>, SelectorError>;
}

#[derive(Clone)]
pub struct CatalogHttpClient {
    client: Client,
    base_url: String,
}

impl CatalogHttpClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SelectorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("source-selector/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SelectorError::CatalogHttp(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| SelectorError::CatalogHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn resources_url(&self) -> String {
        format!("{}{RESOURCES_PATH}", self.base_url)
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, SelectorError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "catalog request failed".to_string());
        Err(SelectorError::CatalogStatus { status, message })
    }
}

impl CatalogClient for CatalogHttpClient {
    fn list_resources(
        &self,
        query: Option<&str>,
    ) -> Result<Vec<ResourceDescriptor>, SelectorError> {
        let url = self.resources_url();
        let mut request = self.client.get(&url);
        if let Some(query) = query.filter(|q| !q.trim().is_empty()) {
            request = request.query(&[("query", query)]);
        }
        debug!(%url, ?query, "catalog.request");
        let response = request
            .send()
            .map_err(|err| SelectorError::CatalogHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let body = response
            .bytes()
            .map_err(|err| SelectorError::CatalogHttp(err.to_string()))?;
        parse_catalog_response(&body)
    }
}

// A missing or null `resources` field is an empty catalog.
pub fn parse_catalog_response(body: &[u8]) -> Result<Vec<ResourceDescriptor>, SelectorError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| SelectorError::CatalogDecode(err.to_string()))?;
    let Value::Object(mut fields) = value else {
        return Err(SelectorError::CatalogDecode(
            "expected a JSON object".to_string(),
        ));
    };
    let entries = match fields.remove("resources") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(SelectorError::CatalogDecode(
                "`resources` is not an array".to_string(),
            ));
        }
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(index, value)| decode_descriptor(index, value))
        .collect()
}

fn decode_descriptor(index: usize, value: Value) -> Result<ResourceDescriptor, SelectorError> {
    if !value.is_object() {
        return Err(SelectorError::CatalogDecode(format!(
            "resources[{index}]: expected an object"
        )));
    }
    serde_json::from_value(value)
        .map_err(|err| SelectorError::CatalogDecode(format!("resources[{index}]: {err}")))
}

pub fn filter_resources(
    resources: &[ResourceDescriptor],
    query: Option<&str>,
) -> Vec<ResourceDescriptor> {
    let needle = query
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());
    match needle {
        Some(needle) => resources
            .iter()
            .filter(|resource| resource.title.to_lowercase().contains(&needle))
            .cloned()
            .collect(),
        None => resources.to_vec(),
    }
}
