use crate::types::{Hotel, RawHotel};

/// Canonicalizes one provider row, or rejects it.
///
/// Rules, in order: trimmed `hotel_id` and `name` must be non-empty, `price`
/// must be positive (NaN rejected), currency is trimmed and uppercased with
/// `EUR` substituted when empty. `city` and `nights` are dropped. Rejection
/// is silent; bad rows are simply skipped by the aggregator.
pub fn normalize(raw: RawHotel) -> Option<Hotel> {
    let hotel_id = raw.hotel_id.trim();
    if hotel_id.is_empty() {
        return None;
    }

    let name = raw.name.trim();
    if name.is_empty() {
        return None;
    }

    if !(raw.price > 0.0) {
        return None;
    }

    let mut currency = raw.currency.trim().to_uppercase();
    if currency.is_empty() {
        currency = "EUR".to_string();
    }

    Some(Hotel {
        hotel_id: hotel_id.to_string(),
        name: name.to_string(),
        currency,
        price: raw.price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(hotel_id: &str, name: &str, currency: &str, price: f64) -> RawHotel {
        RawHotel {
            hotel_id: hotel_id.to_string(),
            name: name.to_string(),
            city: "paris".to_string(),
            currency: currency.to_string(),
            price,
            nights: 2,
        }
    }

    #[test]
    fn test_valid_hotel_passes() {
        let hotel = normalize(raw("H001", "Grand Hotel", "EUR", 100.0)).unwrap();
        assert_eq!(hotel.hotel_id, "H001");
        assert_eq!(hotel.name, "Grand Hotel");
        assert_eq!(hotel.currency, "EUR");
        assert_eq!(hotel.price, 100.0);
    }

    #[test]
    fn test_fields_are_trimmed() {
        let hotel = normalize(raw("  H001 ", " Grand Hotel\t", " eur ", 100.0)).unwrap();
        assert_eq!(hotel.hotel_id, "H001");
        assert_eq!(hotel.name, "Grand Hotel");
        assert_eq!(hotel.currency, "EUR");
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(normalize(raw("", "Grand Hotel", "EUR", 100.0)).is_none());
        assert!(normalize(raw("   ", "Grand Hotel", "EUR", 100.0)).is_none());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(normalize(raw("H001", "", "EUR", 100.0)).is_none());
        assert!(normalize(raw("H001", " \t ", "EUR", 100.0)).is_none());
    }

    #[test]
    fn test_bad_price_rejected() {
        assert!(normalize(raw("H001", "Grand Hotel", "EUR", 0.0)).is_none());
        assert!(normalize(raw("H001", "Grand Hotel", "EUR", -50.0)).is_none());
        assert!(normalize(raw("H001", "Grand Hotel", "EUR", f64::NAN)).is_none());
    }

    #[test]
    fn test_currency_uppercased() {
        let hotel = normalize(raw("H001", "Grand Hotel", "usd", 100.0)).unwrap();
        assert_eq!(hotel.currency, "USD");
    }

    #[test]
    fn test_empty_currency_defaults_to_eur() {
        let hotel = normalize(raw("H001", "Grand Hotel", "", 100.0)).unwrap();
        assert_eq!(hotel.currency, "EUR");
        let hotel = normalize(raw("H001", "Grand Hotel", "  ", 100.0)).unwrap();
        assert_eq!(hotel.currency, "EUR");
    }
}
