//! Canned hotel inventory for the mock providers.
//!
//! Each provider kind has its own latency band, failure rate and data quirk,
//! so an aggregator pointed at all three sees realistic overlap, casing
//! inconsistencies, invalid rows and duplicates.

use rand::Rng;
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Mock1,
    Mock2,
    Mock3,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Mock1 => "mock1",
            ProviderKind::Mock2 => "mock2",
            ProviderKind::Mock3 => "mock3",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mock1" => Ok(ProviderKind::Mock1),
            "mock2" => Ok(ProviderKind::Mock2),
            "mock3" => Ok(ProviderKind::Mock3),
            other => Err(format!("unknown provider type: {other}")),
        }
    }
}

/// Wire shape of one hotel row.
#[derive(Debug, Clone, Serialize)]
pub struct Hotel {
    pub hotel_id: String,
    pub name: String,
    pub city: String,
    pub currency: String,
    pub price: f64,
    pub nights: u32,
}

/// Simulated upstream latency for one request.
pub fn draw_latency(kind: ProviderKind, rng: &mut impl Rng) -> Duration {
    let (base_ms, span_ms) = match kind {
        ProviderKind::Mock1 => (50, 150),
        ProviderKind::Mock2 => (75, 225),
        ProviderKind::Mock3 => (60, 180),
    };
    Duration::from_millis(base_ms + rng.gen_range(0..span_ms))
}

/// Whether this request should fail with a 503.
pub fn draw_failure(kind: ProviderKind, rng: &mut impl Rng) -> bool {
    let rate = match kind {
        ProviderKind::Mock1 | ProviderKind::Mock3 => 0.10,
        ProviderKind::Mock2 => 0.15,
    };
    rng.gen_bool(rate)
}

pub fn generate_hotels(
    kind: ProviderKind,
    city: &str,
    nights: u32,
    rng: &mut impl Rng,
) -> Vec<Hotel> {
    let city = city.trim().to_lowercase();
    let hotel = |hotel_id: &str, name: &str, currency: &str, price: f64| Hotel {
        hotel_id: hotel_id.to_string(),
        name: name.to_string(),
        city: city.clone(),
        currency: currency.to_string(),
        price,
        nights,
    };

    match kind {
        ProviderKind::Mock1 => vec![
            hotel("H001", "Grand Hotel", "EUR", total_price(rng, 100.0, 200.0, nights)),
            // Inconsistent casing on purpose
            hotel("H002", "City Center Inn", "eur", total_price(rng, 80.0, 150.0, nights)),
            hotel("H003", "Budget Stay", "EUR", total_price(rng, 50.0, 100.0, nights)),
            hotel("H004", "Luxury Palace", "EUR", total_price(rng, 200.0, 400.0, nights)),
        ],
        ProviderKind::Mock2 => {
            let mut hotels = vec![
                hotel("H001", "Grand Hotel", "EUR", random_price(rng, 100.0, 200.0)),
                hotel("H002", "City Center Inn", "eur", random_price(rng, 80.0, 150.0)),
                hotel("H003", "Budget Stay", "EUR", random_price(rng, 50.0, 100.0)),
                hotel("H005", "Seaside Resort", "EUR", random_price(rng, 150.0, 300.0)),
            ];
            // Sometimes an invalid row the aggregator must filter out
            if rng.gen_bool(0.3) {
                hotels.push(hotel("", "Mystery Hotel", "EUR", 100.0));
            }
            hotels
        }
        ProviderKind::Mock3 => {
            let mut hotels = vec![
                hotel("H001", "Grand Hotel", "EUR", random_price(rng, 100.0, 200.0)),
                hotel("H002", "City Center Inn", "eur", random_price(rng, 80.0, 150.0)),
                hotel("H003", "Budget Stay", "EUR", random_price(rng, 50.0, 100.0)),
                hotel("H006", "Mountain Lodge", "EUR", random_price(rng, 120.0, 250.0)),
            ];
            // Sometimes a duplicate id at another price, to exercise dedup
            if rng.gen_bool(0.5) {
                hotels.push(hotel("H001", "Grand Hotel", "EUR", random_price(rng, 90.0, 180.0)));
            }
            hotels
        }
    }
}

fn random_price(rng: &mut impl Rng, min: f64, max: f64) -> f64 {
    let price = rng.gen_range(min..max);
    (price * 100.0).trunc() / 100.0
}

fn total_price(rng: &mut impl Rng, min_per_night: f64, max_per_night: f64, nights: u32) -> f64 {
    let total = random_price(rng, min_per_night, max_per_night) * f64::from(nights);
    (total * 100.0).trunc() / 100.0
}
