// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
    pub shutdown_drain: Duration,
    pub sqlite_busy_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 16 * 1024,
            request_timeout: Duration::from_secs(5),
            shutdown_drain: Duration::from_secs(5),
            sqlite_busy_timeout_ms: 5_000,
        }
    }
}
