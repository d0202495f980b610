pub mod aggregator;
pub mod cache;
pub mod config;
pub mod errors;
pub mod handler;
pub mod metrics_defs;
pub mod normalize;
pub mod providers;
pub mod ratelimit;
pub mod types;

#[cfg(test)]
mod testutils;

use crate::aggregator::Aggregator;
use crate::cache::SearchCache;
use crate::config::Config;
use crate::errors::SearchApiError;
use crate::handler::SearchHandler;
use crate::providers::{HttpClient, HttpProvider, Provider};
use crate::ratelimit::RateLimiter;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use metrics_exporter_prometheus::PrometheusHandle;
use shared::http::make_error_response;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// Builds the pipeline from config and serves it until SIGINT/SIGTERM.
pub async fn run(config: Config, metrics_handle: PrometheusHandle) -> Result<(), SearchApiError> {
    shared::metrics::register_metrics(metrics_defs::ALL_METRICS);

    let service = SearchApiService::new(&config, metrics_handle);

    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        providers = config.providers.len(),
        "starting search api"
    );
    shared::http::run_http_service(
        &config.listener.host,
        config.listener.port,
        service,
        shared::http::shutdown_signal(),
    )
    .await
}

pub struct SearchApiService {
    handler: Arc<SearchHandler>,
    metrics_handle: PrometheusHandle,
}

impl SearchApiService {
    pub fn new(config: &Config, metrics_handle: PrometheusHandle) -> Self {
        let client: HttpClient = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let providers = config
            .providers
            .iter()
            .map(|p| {
                Arc::new(HttpProvider::new(
                    p.name.clone(),
                    p.base_url.clone(),
                    client.clone(),
                    config.provider_timeout,
                )) as Arc<dyn Provider>
            })
            .collect();

        Self::with_providers(config, providers, metrics_handle)
    }

    /// Seam for substituting provider implementations.
    pub fn with_providers(
        config: &Config,
        providers: Vec<Arc<dyn Provider>>,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        let aggregator = Arc::new(Aggregator::new(providers, config.provider_timeout));
        let cache = SearchCache::new(config.cache_ttl);
        let limiter = RateLimiter::new(config.rate_limit.rate, config.rate_limit.window);

        Self {
            handler: Arc::new(SearchHandler::new(aggregator, cache, limiter)),
            metrics_handle,
        }
    }
}

impl<B> Service<Request<B>> for SearchApiService
where
    B: Send + Sync + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = SearchApiError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let metrics_handle = self.metrics_handle.clone();

        Box::pin(async move {
            let started = Instant::now();
            let request_id = request_id(&req);
            let method = req.method().clone();
            let path = req.uri().path().to_string();

            let span = tracing::info_span!(
                "request",
                request_id = %request_id,
                method = %method,
                path = %path,
            );

            let mut response = async {
                match (method.as_str(), path.as_str()) {
                    ("GET", "/search") => handler.handle_search(&req).await,
                    ("GET", "/healthz") => health_response(),
                    ("GET", "/metrics") => metrics_response(&metrics_handle),
                    (_, "/search" | "/healthz" | "/metrics") => {
                        make_error_response(StatusCode::METHOD_NOT_ALLOWED).map(Full::new)
                    }
                    _ => make_error_response(StatusCode::NOT_FOUND).map(Full::new),
                }
            }
            .instrument(span.clone())
            .await;

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response.headers_mut().insert("x-request-id", value);
            }

            span.in_scope(|| {
                tracing::info!(
                    status = response.status().as_u16(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "request completed"
                );
            });

            Ok(response)
        })
    }
}

/// Inbound `x-request-id` wins; otherwise a fresh v4 UUID.
fn request_id<B>(req: &Request<B>) -> String {
    req.headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn health_response() -> Response<Full<Bytes>> {
    Response::new(Full::new(Bytes::from("OK")))
}

fn metrics_response(handle: &PrometheusHandle) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(handle.render())));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4"),
    );
    response
}
