use crate::metrics_defs::{MetricDef, MetricType};

/// Counter handle for a [`MetricDef`].
///
/// `counter!(REQUESTS_TOTAL).increment(1)`
#[macro_export]
macro_rules! counter {
    ($def:expr) => {
        ::metrics::counter!($def.name)
    };
}

/// Register descriptions for all definitions and zero the counters, so the
/// exposition endpoint lists every metric before its first increment.
pub fn register_metrics(defs: &[MetricDef]) {
    for def in defs {
        match def.metric_type {
            MetricType::Counter => {
                metrics::describe_counter!(def.name, def.description);
                metrics::counter!(def.name).absolute(0);
            }
            MetricType::Gauge => {
                metrics::describe_gauge!(def.name, def.description);
            }
            MetricType::Histogram => {
                metrics::describe_histogram!(def.name, def.description);
            }
        }
    }
}
