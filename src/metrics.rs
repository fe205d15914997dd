//! Prometheus metrics.

use lazy_static::lazy_static;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    // Registry for holding metric state
    pub static ref REGISTRY: Registry = Registry::new();
    // Griddap query counter by kind (axis or grid)
    pub static ref QUERIES: IntCounterVec = IntCounterVec::new(
        Opts::new("xtracto_queries", "The number of griddap queries sent"),
        &["kind"]
    ).unwrap();
    // Responses by HTTP status
    pub static ref RESPONSES: IntCounterVec = IntCounterVec::new(
        Opts::new("xtracto_responses", "The number of successful responses by status"),
        &["status"]
    ).unwrap();
    // Points answered from a remembered row
    pub static ref DEDUPLICATED_POINTS: IntCounter = IntCounter::new(
        "xtracto_deduplicated_points",
        "The number of trajectory points answered without fetching"
    ).unwrap();
    // Points that failed in best-effort mode
    pub static ref FAILED_POINTS: IntCounter = IntCounter::new(
        "xtracto_failed_points",
        "The number of trajectory points whose extraction failed"
    ).unwrap();
}

/// Register every metric with [REGISTRY].
///
/// Registering twice is harmless.
pub fn register_metrics() {
    // Duplicate registration is the only failure mode of Registry::register.
    let _ = REGISTRY.register(Box::new(QUERIES.clone()));
    let _ = REGISTRY.register(Box::new(RESPONSES.clone()));
    let _ = REGISTRY.register(Box::new(DEDUPLICATED_POINTS.clone()));
    let _ = REGISTRY.register(Box::new(FAILED_POINTS.clone()));
}

/// Returns the registered metrics in the Prometheus text format.
pub fn gather() -> String {
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_registered() {
        register_metrics();
        register_metrics();
        QUERIES.with_label_values(&["axis"]).inc();
        RESPONSES.with_label_values(&["200"]).inc();
        let output = gather();
        assert!(output.contains("xtracto_queries{kind=\"axis\"}"));
        assert!(output.contains("xtracto_responses{status=\"200\"}"));
        assert!(output.contains("xtracto_deduplicated_points"));
        assert!(output.contains("xtracto_failed_points"));
    }
}
