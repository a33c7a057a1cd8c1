//! Metrics definitions for the resolver.

use shared::metrics_defs::{MetricDef, MetricType};

pub const RESPONSE_CACHE_HIT: MetricDef = MetricDef {
    name: "response_cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of requests served from the response cache",
};

pub const RESPONSE_CACHE_MISS: MetricDef = MetricDef {
    name: "response_cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of requests that were resolved against the parameter store",
};

pub const RESPONSE_CACHE_BYPASS: MetricDef = MetricDef {
    name: "response_cache.bypass",
    metric_type: MetricType::Counter,
    description: "Number of requests that skipped the response cache (latest or debug mode)",
};

pub const REFERENCE_CACHE_HIT: MetricDef = MetricDef {
    name: "reference_cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of composite blobs reused from the reference cache",
};

pub const REFERENCE_CACHE_MISS: MetricDef = MetricDef {
    name: "reference_cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of composite blobs fetched from the parameter store",
};

pub const GATEWAY_REQUEST_DURATION: MetricDef = MetricDef {
    name: "gateway.request.duration",
    metric_type: MetricType::Histogram,
    description: "Time to complete a parameter store call in seconds",
};

pub const GATEWAY_ERRORS: MetricDef = MetricDef {
    name: "gateway.errors",
    metric_type: MetricType::Counter,
    description: "Number of failed parameter store calls",
};

pub const PARAMETERS_OMITTED: MetricDef = MetricDef {
    name: "parameters.omitted",
    metric_type: MetricType::Counter,
    description: "Number of parameters left out of a document because no version matched",
};

pub const REQUESTS: MetricDef = MetricDef {
    name: "requests",
    metric_type: MetricType::Counter,
    description: "Number of inbound requests by route and status",
};

pub const ALL_METRICS: &[MetricDef] = &[
    RESPONSE_CACHE_HIT,
    RESPONSE_CACHE_MISS,
    RESPONSE_CACHE_BYPASS,
    REFERENCE_CACHE_HIT,
    REFERENCE_CACHE_MISS,
    GATEWAY_REQUEST_DURATION,
    GATEWAY_ERRORS,
    PARAMETERS_OMITTED,
    REQUESTS,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_unique() {
        let names: HashSet<&str> = ALL_METRICS.iter().map(|def| def.name).collect();
        assert_eq!(names.len(), ALL_METRICS.len());
    }
}
