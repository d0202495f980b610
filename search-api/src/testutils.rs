//! Helpers shared by the unit and service-level tests.

use crate::config::{Config, Listener, ProviderConfig, RateLimitConfig};
use crate::errors::SearchError;
use crate::providers::Provider;
use crate::types::{RawHotel, SearchQuery};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

pub(crate) fn test_query() -> SearchQuery {
    SearchQuery {
        city: "paris".to_string(),
        checkin: "2025-12-01".to_string(),
        nights: 2,
        adults: 2,
    }
}

pub(crate) fn raw_hotel(id: &str, name: &str, currency: &str, price: f64) -> RawHotel {
    RawHotel {
        hotel_id: id.to_string(),
        name: name.to_string(),
        city: "paris".to_string(),
        currency: currency.to_string(),
        price,
        nights: 2,
    }
}

/// Provider with a scripted outcome and optional delay.
pub(crate) struct ScriptedProvider {
    name: &'static str,
    hotels: Vec<RawHotel>,
    err: Option<SearchError>,
    delay: Duration,
}

impl ScriptedProvider {
    pub(crate) fn returning(name: &'static str, hotels: Vec<RawHotel>) -> Self {
        Self {
            name,
            hotels,
            err: None,
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn failing(name: &'static str, err: SearchError) -> Self {
        Self {
            name,
            hotels: Vec::new(),
            err: Some(err),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(&self, _query: &SearchQuery) -> Result<Vec<RawHotel>, SearchError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(self.hotels.clone()),
        }
    }
}

/// Canned reply for a mock upstream server.
pub(crate) struct UpstreamReply {
    pub(crate) status: StatusCode,
    pub(crate) body: String,
    pub(crate) delay: Duration,
}

impl UpstreamReply {
    pub(crate) fn ok(body: &str) -> Self {
        Self::status(StatusCode::OK, body)
    }

    pub(crate) fn status(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Starts a loopback HTTP server answering every request with `respond()`.
/// Returns the bound port.
pub(crate) async fn spawn_upstream<F>(respond: F) -> u16
where
    F: Fn() -> UpstreamReply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let respond = Arc::clone(&respond);

            tokio::spawn(async move {
                let service = service_fn(move |_req: Request<Incoming>| {
                    let respond = Arc::clone(&respond);
                    async move {
                        let reply = respond();
                        if !reply.delay.is_zero() {
                            tokio::time::sleep(reply.delay).await;
                        }
                        let mut response = Response::new(Full::new(Bytes::from(reply.body)));
                        *response.status_mut() = reply.status;
                        Ok::<_, Infallible>(response)
                    }
                });

                let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await;
            });
        }
    });

    port
}

/// Config pointing at the given upstream ports, with tight timings suitable
/// for tests.
pub(crate) fn test_config(upstream_ports: &[u16]) -> Config {
    let providers = upstream_ports
        .iter()
        .enumerate()
        .map(|(i, port)| ProviderConfig {
            name: format!("provider{}", i + 1),
            base_url: Url::parse(&format!("http://127.0.0.1:{port}")).unwrap(),
        })
        .collect();

    Config {
        listener: Listener {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        providers,
        provider_timeout: Duration::from_millis(500),
        cache_ttl: Duration::from_secs(30),
        rate_limit: RateLimitConfig {
            rate: 100,
            window: Duration::from_secs(60),
        },
    }
}
