//! Metrics definitions for the search API.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS_TOTAL: MetricDef = MetricDef {
    name: "requests_total",
    metric_type: MetricType::Counter,
    description: "Total number of requests",
};

pub const CACHE_HITS_TOTAL: MetricDef = MetricDef {
    name: "cache_hits_total",
    metric_type: MetricType::Counter,
    description: "Total number of cache hits",
};

pub const PROVIDER_ERRORS_TOTAL: MetricDef = MetricDef {
    name: "provider_errors_total",
    metric_type: MetricType::Counter,
    description: "Total number of provider errors",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUESTS_TOTAL, CACHE_HITS_TOTAL, PROVIDER_ERRORS_TOTAL];
