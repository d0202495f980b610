pub mod catalog;

pub use catalog::ProviderKind;

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use shared::http::make_error_response;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use url::form_urlencoded;

#[derive(Error, Debug)]
pub enum MockProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves one mock provider until SIGINT/SIGTERM.
pub async fn run(kind: ProviderKind, host: &str, port: u16) -> Result<(), MockProviderError> {
    tracing::info!(provider = kind.as_str(), port, "starting mock provider");
    shared::http::run_http_service(
        host,
        port,
        MockProviderService::new(kind),
        shared::http::shutdown_signal(),
    )
    .await
}

/// One upstream hotel source with simulated latency and failures.
pub struct MockProviderService {
    kind: ProviderKind,
}

impl MockProviderService {
    pub fn new(kind: ProviderKind) -> Self {
        Self { kind }
    }
}

impl<B> Service<Request<B>> for MockProviderService
where
    B: Send + 'static,
{
    type Response = Response<Full<Bytes>>;
    type Error = MockProviderError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<B>) -> Self::Future {
        let kind = self.kind;

        Box::pin(async move {
            let response = match (req.method().as_str(), req.uri().path()) {
                ("GET", "/search") => handle_search(kind, req.uri().query()).await,
                ("GET", "/healthz") => Response::new(Full::new(Bytes::from("OK"))),
                _ => make_error_response(StatusCode::NOT_FOUND).map(Full::new),
            };
            Ok(response)
        })
    }
}

#[derive(Debug)]
struct MockQuery {
    city: String,
    nights: u32,
}

async fn handle_search(kind: ProviderKind, raw_query: Option<&str>) -> Response<Full<Bytes>> {
    let query = match parse_params(raw_query) {
        Ok(query) => query,
        Err(message) => return text_response(StatusCode::BAD_REQUEST, message),
    };

    // Take all the random draws before the first await; the RNG must not be
    // held across a suspension point.
    let (latency, failed, hotels) = {
        let mut rng = rand::thread_rng();
        (
            catalog::draw_latency(kind, &mut rng),
            catalog::draw_failure(kind, &mut rng),
            catalog::generate_hotels(kind, &query.city, query.nights, &mut rng),
        )
    };

    tokio::time::sleep(latency).await;

    if failed {
        return text_response(StatusCode::SERVICE_UNAVAILABLE, "provider unavailable");
    }

    match serde_json::to_vec(&hotels) {
        Ok(body) => {
            let mut response = Response::new(Full::new(Bytes::from(body)));
            response.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("application/json"),
            );
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "encoding failed")
        }
    }
}

fn parse_params(raw_query: Option<&str>) -> Result<MockQuery, &'static str> {
    let mut city = None;
    let mut checkin = None;
    let mut nights = None;
    let mut adults = None;

    for (name, value) in form_urlencoded::parse(raw_query.unwrap_or("").as_bytes()) {
        match name.as_ref() {
            "city" if city.is_none() => city = Some(value.into_owned()),
            "checkin" if checkin.is_none() => checkin = Some(value.into_owned()),
            "nights" if nights.is_none() => nights = Some(value.into_owned()),
            "adults" if adults.is_none() => adults = Some(value.into_owned()),
            _ => {}
        }
    }

    let city = city.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
    let checkin = checkin
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    let nights = nights.filter(|n| !n.is_empty());
    let adults = adults.filter(|a| !a.is_empty());

    let (Some(city), Some(_checkin), Some(nights), Some(adults)) = (city, checkin, nights, adults)
    else {
        return Err("missing required parameters");
    };

    let nights: u32 = match nights.parse() {
        Ok(n) if n > 0 => n,
        _ => return Err("invalid nights"),
    };

    match adults.parse::<u32>() {
        Ok(n) if n > 0 => {}
        _ => return Err("invalid adults"),
    }

    Ok(MockQuery { city, nights })
}

fn text_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_string())));
    *response.status_mut() = status;
    response
}
