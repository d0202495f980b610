use serde::{Deserialize, Serialize};

/// A validated search. Only the query parser constructs these, so every
/// instance has a non-empty trimmed city, a well-formed check-in date and
/// positive nights/adults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub city: String,
    pub checkin: String,
    pub nights: u32,
    pub adults: u32,
}

/// A hotel exactly as a provider reported it. No guarantees on any field;
/// absent fields deserialize to their zero values and are rejected during
/// normalization.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawHotel {
    pub hotel_id: String,
    pub name: String,
    pub city: String,
    pub currency: String,
    pub price: f64,
    pub nights: i64,
}

/// A normalized hotel: non-empty id and name, uppercase currency, positive
/// price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub hotel_id: String,
    pub name: String,
    pub currency: String,
    pub price: f64,
}

/// Merged output of one fan-out: hotels sorted by ascending price, no two
/// entries sharing a `hotel_id`, and `succeeded + failed == total`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub hotels: Vec<Hotel>,
    pub providers_total: usize,
    pub providers_succeeded: usize,
    pub providers_failed: usize,
}
