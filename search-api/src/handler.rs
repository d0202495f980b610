use crate::aggregator::Aggregator;
use crate::cache::SearchCache;
use crate::metrics_defs::{CACHE_HITS_TOTAL, REQUESTS_TOTAL};
use crate::ratelimit::RateLimiter;
use crate::types::{Hotel, SearchQuery};
use bytes::Bytes;
use chrono::NaiveDate;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use shared::counter;
use shared::http::PeerAddr;
use std::sync::Arc;
use std::time::Instant;
use url::form_urlencoded;

/// The complete `/search` response payload.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub search: SearchQuery,
    pub stats: SearchStats,
    pub hotels: Vec<Hotel>,
}

#[derive(Debug, Serialize)]
pub struct SearchStats {
    pub providers_total: usize,
    pub providers_succeeded: usize,
    pub providers_failed: usize,
    pub cache: &'static str,
    pub duration_ms: u64,
}

/// Coordinates one search request: rate limit, validate, consult the cache,
/// fan out, shape the response.
pub struct SearchHandler {
    aggregator: Arc<Aggregator>,
    cache: SearchCache,
    limiter: RateLimiter,
}

impl SearchHandler {
    pub fn new(aggregator: Arc<Aggregator>, cache: SearchCache, limiter: RateLimiter) -> Self {
        Self {
            aggregator,
            cache,
            limiter,
        }
    }

    pub async fn handle_search<B>(&self, req: &Request<B>) -> Response<Full<Bytes>> {
        let started = Instant::now();
        counter!(REQUESTS_TOTAL).increment(1);

        let client_ip = extract_client_ip(req.headers(), req.extensions().get::<PeerAddr>());
        if !self.limiter.allow(&client_ip) {
            tracing::warn!(ip = %client_ip, "rate limit exceeded");
            return json_error(StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded");
        }

        let query = match parse_search_params(req.uri().query()) {
            Ok(query) => query,
            Err(message) => {
                tracing::debug!(ip = %client_ip, error = message, "invalid request parameters");
                return json_error(StatusCode::BAD_REQUEST, message);
            }
        };

        let key = SearchCache::key(&query);
        let aggregator = Arc::clone(&self.aggregator);
        let fetch_query = query.clone();
        let outcome = self
            .cache
            .get_or_fetch(&key, move || async move {
                aggregator.search(&fetch_query).await
            })
            .await;

        let (result, cache_hit) = match outcome {
            Ok(settled) => settled,
            Err(err) => {
                // The detailed cause stays in the logs; clients get an opaque message
                tracing::error!(
                    error = %err,
                    city = %query.city,
                    checkin = %query.checkin,
                    ip = %client_ip,
                    "search failed"
                );
                return json_error(StatusCode::INTERNAL_SERVER_ERROR, "search failed");
            }
        };

        if cache_hit {
            counter!(CACHE_HITS_TOTAL).increment(1);
        }

        let response = SearchResponse {
            stats: SearchStats {
                providers_total: result.providers_total,
                providers_succeeded: result.providers_succeeded,
                providers_failed: result.providers_failed,
                cache: if cache_hit { "hit" } else { "miss" },
                duration_ms: started.elapsed().as_millis() as u64,
            },
            hotels: result.hotels.clone(),
            search: query,
        };

        json_response(StatusCode::OK, &response)
    }
}

/// Parses and validates `/search` query parameters. The first violated rule
/// wins; messages are part of the API contract.
pub fn parse_search_params(raw_query: Option<&str>) -> Result<SearchQuery, &'static str> {
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

    let city = city.map(|c| c.trim().to_string()).unwrap_or_default();
    if city.is_empty() {
        return Err("city is required");
    }

    let checkin = checkin.map(|c| c.trim().to_string()).unwrap_or_default();
    if checkin.is_empty() {
        return Err("checkin is required");
    }
    // chrono accepts unpadded dates, so the length check keeps this strict
    if checkin.len() != 10 || NaiveDate::parse_from_str(&checkin, "%Y-%m-%d").is_err() {
        return Err("checkin must be in YYYY-MM-DD format");
    }

    let nights = nights.unwrap_or_default();
    if nights.is_empty() {
        return Err("nights is required");
    }
    let nights: u32 = match nights.parse() {
        Ok(n) if n > 0 => n,
        _ => return Err("nights must be a positive integer"),
    };

    let adults = adults.unwrap_or_default();
    if adults.is_empty() {
        return Err("adults is required");
    }
    let adults: u32 = match adults.parse() {
        Ok(n) if n > 0 => n,
        _ => return Err("adults must be a positive integer"),
    };

    Ok(SearchQuery {
        city,
        checkin,
        nights,
        adults,
    })
}

/// Client identity for rate limiting: first entry of `X-Forwarded-For`, then
/// `X-Real-IP`, then the connection's peer address.
pub fn extract_client_ip(headers: &HeaderMap, peer: Option<&PeerAddr>) -> String {
    if let Some(xff) = headers.get("x-forwarded-for")
        && let Ok(value) = xff.to_str()
        && let Some(first) = value.split(',').next()
    {
        let first = first.trim();
        if !first.is_empty() {
            return first.to_string();
        }
    }

    if let Some(xri) = headers.get("x-real-ip")
        && let Ok(value) = xri.to_str()
    {
        let value = value.trim();
        if !value.is_empty() {
            return value.to_string();
        }
    }

    match peer {
        Some(PeerAddr(addr)) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

pub(crate) fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Full<Bytes>> {
    let body = match serde_json::to_vec(value) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode response");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "search failed");
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

pub(crate) fn json_error(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message }).to_string();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
