use crate::errors::SearchError;
use crate::metrics_defs::PROVIDER_ERRORS_TOTAL;
use crate::normalize::normalize;
use crate::providers::Provider;
use crate::types::{AggregateResult, Hotel, SearchQuery};
use shared::counter;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Fans one query out to every configured provider and merges the results.
pub struct Aggregator {
    providers: Vec<Arc<dyn Provider>>,
    timeout: Duration,
}

impl Aggregator {
    pub fn new(providers: Vec<Arc<dyn Provider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Queries all providers concurrently, each bounded by the configured
    /// timeout, and merges whatever comes back.
    ///
    /// Individual failures are counted and logged, never surfaced; only when
    /// every provider fails does the first collected failure propagate.
    /// Dropping the returned future aborts all outstanding provider calls.
    pub async fn search(&self, query: &SearchQuery) -> Result<AggregateResult, SearchError> {
        let mut join_set = JoinSet::new();

        for provider in &self.providers {
            let provider = Arc::clone(provider);
            let query = query.clone();
            let timeout = self.timeout;
            join_set.spawn(async move {
                let name = provider.name().to_string();
                let outcome = match tokio::time::timeout(timeout, provider.search(&query)).await {
                    Ok(result) => result,
                    Err(_) => Err(SearchError::ProviderTimeout(name.clone())),
                };
                (name, outcome)
            });
        }

        let mut merged: HashMap<String, Hotel> = HashMap::new();
        let mut succeeded = 0;
        let mut failed = 0;
        let mut errors = Vec::new();

        while let Some(joined) = join_set.join_next().await {
            let (name, outcome) = match joined {
                Ok(settled) => settled,
                Err(e) => {
                    failed += 1;
                    counter!(PROVIDER_ERRORS_TOTAL).increment(1);
                    errors.push(SearchError::Internal(format!("provider task failed: {e}")));
                    continue;
                }
            };

            match outcome {
                Ok(raw_hotels) => {
                    succeeded += 1;
                    for raw in raw_hotels {
                        let Some(hotel) = normalize(raw) else { continue };

                        // Dedup by hotel_id, keep lowest price
                        match merged.entry(hotel.hotel_id.clone()) {
                            Entry::Occupied(mut slot) => {
                                if hotel.price < slot.get().price {
                                    slot.insert(hotel);
                                }
                            }
                            Entry::Vacant(slot) => {
                                slot.insert(hotel);
                            }
                        }
                    }
                }
                Err(err) => {
                    failed += 1;
                    counter!(PROVIDER_ERRORS_TOTAL).increment(1);
                    tracing::warn!(
                        provider = %name,
                        error = %err,
                        city = %query.city,
                        "provider search failed"
                    );
                    errors.push(err);
                }
            }
        }

        if failed == self.providers.len()
            && let Some(err) = errors.into_iter().next()
        {
            tracing::error!(city = %query.city, failed_count = failed, "all providers failed");
            return Err(err);
        }

        let mut hotels: Vec<Hotel> = merged.into_values().collect();
        hotels.sort_by(|a, b| a.price.total_cmp(&b.price));

        Ok(AggregateResult {
            hotels,
            providers_total: self.providers.len(),
            providers_succeeded: succeeded,
            providers_failed: failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{ScriptedProvider, raw_hotel, test_query};
    use std::time::Instant;

    fn aggregator(providers: Vec<ScriptedProvider>) -> Aggregator {
        let providers = providers
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn Provider>)
            .collect();
        Aggregator::new(providers, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_merging_and_sorting() {
        let agg = aggregator(vec![
            ScriptedProvider::returning(
                "provider1",
                vec![
                    raw_hotel("H001", "Hotel A", "EUR", 100.0),
                    raw_hotel("H002", "Hotel B", "EUR", 150.0),
                ],
            ),
            ScriptedProvider::returning(
                "provider2",
                vec![
                    raw_hotel("H003", "Hotel C", "EUR", 120.0),
                    raw_hotel("H004", "Hotel D", "EUR", 200.0),
                ],
            ),
        ]);

        let result = agg.search(&test_query()).await.unwrap();

        assert_eq!(result.providers_total, 2);
        assert_eq!(result.providers_succeeded, 2);
        assert_eq!(result.providers_failed, 0);

        let ids: Vec<&str> = result.hotels.iter().map(|h| h.hotel_id.as_str()).collect();
        assert_eq!(ids, vec!["H001", "H003", "H002", "H004"]);
        let prices: Vec<f64> = result.hotels.iter().map(|h| h.price).collect();
        assert_eq!(prices, vec![100.0, 120.0, 150.0, 200.0]);
    }

    #[tokio::test]
    async fn test_dedup_keeps_lowest_price() {
        let agg = aggregator(vec![
            ScriptedProvider::returning(
                "provider1",
                vec![
                    raw_hotel("H001", "Hotel A", "EUR", 150.0),
                    raw_hotel("H002", "Hotel B", "EUR", 200.0),
                ],
            ),
            ScriptedProvider::returning(
                "provider2",
                vec![
                    raw_hotel("H001", "Hotel A", "EUR", 120.0),
                    raw_hotel("H003", "Hotel C", "EUR", 180.0),
                ],
            ),
        ]);

        let result = agg.search(&test_query()).await.unwrap();

        assert_eq!(result.hotels.len(), 3);
        let h001 = result
            .hotels
            .iter()
            .find(|h| h.hotel_id == "H001")
            .expect("H001 missing");
        assert_eq!(h001.price, 120.0);
    }

    #[tokio::test]
    async fn test_partial_failure_still_succeeds() {
        let agg = aggregator(vec![
            ScriptedProvider::returning(
                "success-provider",
                vec![raw_hotel("H001", "Hotel A", "EUR", 100.0)],
            ),
            ScriptedProvider::failing(
                "failed-provider",
                SearchError::ProviderRequest("failed-provider".to_string(), "unavailable".to_string()),
            ),
        ]);

        let result = agg.search(&test_query()).await.unwrap();

        assert_eq!(result.providers_succeeded, 1);
        assert_eq!(result.providers_failed, 1);
        assert_eq!(result.hotels.len(), 1);
        assert_eq!(result.hotels[0].hotel_id, "H001");
    }

    #[tokio::test]
    async fn test_all_providers_fail() {
        let err = SearchError::ProviderRequest("p".to_string(), "down".to_string());
        let agg = aggregator(vec![
            ScriptedProvider::failing("provider1", err.clone()),
            ScriptedProvider::failing("provider2", err.clone()),
        ]);

        let result = agg.search(&test_query()).await;
        assert_eq!(result.unwrap_err(), err);
    }

    #[tokio::test]
    async fn test_slow_provider_bounded_by_timeout() {
        let providers: Vec<Arc<dyn Provider>> = vec![
            Arc::new(
                ScriptedProvider::returning(
                    "fast-provider",
                    vec![raw_hotel("H001", "Hotel A", "EUR", 100.0)],
                )
                .with_delay(Duration::from_millis(50)),
            ),
            Arc::new(
                ScriptedProvider::returning(
                    "slow-provider",
                    vec![raw_hotel("H002", "Hotel B", "EUR", 150.0)],
                )
                .with_delay(Duration::from_secs(2)),
            ),
        ];
        let agg = Aggregator::new(providers, Duration::from_millis(500));

        let started = Instant::now();
        let result = agg.search(&test_query()).await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(1_000));
        assert_eq!(result.providers_succeeded, 1);
        assert_eq!(result.providers_failed, 1);
        assert_eq!(result.hotels.len(), 1);
        assert_eq!(result.hotels[0].hotel_id, "H001");
    }

    #[tokio::test]
    async fn test_invalid_rows_are_filtered() {
        let agg = aggregator(vec![ScriptedProvider::returning(
            "provider1",
            vec![
                raw_hotel("H001", "Valid Hotel", "EUR", 100.0),
                raw_hotel("", "No Id", "EUR", 150.0),
                raw_hotel("H003", "", "EUR", 120.0),
                raw_hotel("H004", "Zero Price", "EUR", 0.0),
                raw_hotel("H005", "Negative Price", "EUR", -50.0),
                raw_hotel("H006", "Valid Hotel 2", "usd", 200.0),
            ],
        )]);

        let result = agg.search(&test_query()).await.unwrap();

        assert_eq!(result.providers_succeeded, 1);
        assert_eq!(result.hotels.len(), 2);
        let h006 = result
            .hotels
            .iter()
            .find(|h| h.hotel_id == "H006")
            .expect("H006 missing");
        assert_eq!(h006.currency, "USD");
    }

    #[tokio::test]
    async fn test_empty_provider_counts_as_success() {
        let agg = aggregator(vec![
            ScriptedProvider::returning("empty-provider", vec![]),
            ScriptedProvider::returning(
                "provider2",
                vec![raw_hotel("H001", "Hotel A", "EUR", 100.0)],
            ),
        ]);

        let result = agg.search(&test_query()).await.unwrap();

        assert_eq!(result.providers_succeeded, 2);
        assert_eq!(result.providers_failed, 0);
        assert_eq!(result.hotels.len(), 1);
    }

    #[tokio::test]
    async fn test_no_providers_yields_empty_success() {
        let agg = Aggregator::new(Vec::new(), Duration::from_secs(1));

        let result = agg.search(&test_query()).await.unwrap();

        assert_eq!(result.providers_total, 0);
        assert_eq!(result.providers_succeeded, 0);
        assert_eq!(result.providers_failed, 0);
        assert!(result.hotels.is_empty());
    }
}
