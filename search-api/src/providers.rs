use crate::errors::SearchError;
use crate::types::{RawHotel, SearchQuery};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

/// Pooled HTTP client shared by all providers.
pub type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// One upstream hotel source.
///
/// Implementations are stateless from the caller's perspective and may be
/// invoked concurrently. Any error return means "this provider failed for
/// this call"; retries are the upstream's business, not ours.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawHotel>, SearchError>;
}

/// Provider backed by a real HTTP endpoint speaking the
/// `GET <base>/search?city&checkin&nights&adults` protocol with a JSON array
/// response.
pub struct HttpProvider {
    name: String,
    base_url: Url,
    client: HttpClient,
    timeout: Duration,
}

impl HttpProvider {
    pub fn new(name: String, base_url: Url, client: HttpClient, timeout: Duration) -> Self {
        Self {
            name,
            base_url,
            client,
            timeout,
        }
    }
}

#[async_trait]
impl Provider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    /// Full round trip (request, status check, body collection) bounded by
    /// the configured timeout. Non-200 statuses and undecodable bodies count
    /// as provider failures.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawHotel>, SearchError> {
        let mut url = self.base_url.clone();
        url.set_path("/search");
        url.query_pairs_mut()
            .append_pair("city", &query.city)
            .append_pair("checkin", &query.checkin)
            .append_pair("nights", &query.nights.to_string())
            .append_pair("adults", &query.adults.to_string());

        let request = Request::builder()
            .method(Method::GET)
            .uri(url.as_str())
            .body(Full::new(Bytes::new()))
            .map_err(|e| SearchError::Internal(format!("failed to build provider request: {e}")))?;

        let body_bytes = timeout(self.timeout, async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| SearchError::ProviderRequest(self.name.clone(), e.to_string()))?;

            if response.status() != StatusCode::OK {
                return Err(SearchError::ProviderStatus(
                    self.name.clone(),
                    response.status().as_u16(),
                ));
            }

            response
                .into_body()
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .map_err(|e| SearchError::ProviderRequest(self.name.clone(), e.to_string()))
        })
        .await
        .map_err(|_| SearchError::ProviderTimeout(self.name.clone()))??;

        serde_json::from_slice(&body_bytes)
            .map_err(|e| SearchError::ProviderDecode(self.name.clone(), e.to_string()))
    }
}
