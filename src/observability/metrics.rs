//! Metrics collection and exposition.
//!
//! # Metrics
//! - `prerender_requests_total` (counter): HTTP render requests by status
//! - `prerender_render_duration_seconds` (histogram): end-to-end render latency
//! - `prerender_cache_lookups_total` (counter): cache lookups by result
//! - `prerender_cache_entries` (gauge): stored cache entries
//! - `prerender_fetch_attempts_total` (counter): browser fetch attempts by outcome
//! - `prerender_sessions_allocated_total` (counter): browser sessions launched
//! - `prerender_session_active` (gauge): 1 while a browser session is live
//! - `prerender_meta_scripts` (gauge): registered meta scripts

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    counter!("prerender_requests_total", "status" => status.to_string()).increment(1);
    histogram!("prerender_render_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("prerender_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("prerender_cache_entries").set(entries as f64);
}

pub fn record_fetch_attempt(outcome: &'static str) {
    counter!("prerender_fetch_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_session_allocated() {
    counter!("prerender_sessions_allocated_total").increment(1);
    gauge!("prerender_session_active").set(1.0);
}

pub fn record_session_destroyed() {
    gauge!("prerender_session_active").set(0.0);
}

pub fn record_meta_scripts(count: usize) {
    gauge!("prerender_meta_scripts").set(count as f64);
}
