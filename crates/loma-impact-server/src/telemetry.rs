// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Per-route request counters and latency samples, rendered as plain
/// text by the /metrics endpoint.
#[derive(Default)]
pub struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: u16, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts.entry((route.to_string(), status)).or_insert(0) += 1;
        drop(counts);
        let mut latency_map = self.latency_ns.lock().await;
        latency_map
            .entry(route.to_string())
            .or_default()
            .push(latency.as_nanos() as u64);
    }

    pub(crate) async fn render(&self) -> String {
        let mut out = String::new();
        let counts = self.counts.lock().await;
        let mut entries: Vec<_> = counts.iter().collect();
        entries.sort();
        for ((route, status), count) in entries {
            out.push_str(&format!(
                "impact_requests_total{{route=\"{route}\",status=\"{status}\"}} {count}\n"
            ));
        }
        drop(counts);
        let latency = self.latency_ns.lock().await;
        let mut routes: Vec<_> = latency.iter().collect();
        routes.sort_by_key(|(route, _)| route.clone());
        for (route, samples) in routes {
            if samples.is_empty() {
                continue;
            }
            let mut sorted = samples.clone();
            sorted.sort_unstable();
            let p95 = sorted[((sorted.len() as f64 * 0.95).ceil() as usize).saturating_sub(1)];
            out.push_str(&format!(
                "impact_request_latency_p95_ns{{route=\"{route}\"}} {p95}\n"
            ));
        }
        out
    }
}
