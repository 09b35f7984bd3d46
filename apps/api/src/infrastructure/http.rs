// Shared outbound HTTP client for the mail and payment providers

use std::time::Duration;

use reqwest::Client;

/// Upper bound on a whole provider call, connect through body
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

pub fn provider_client(timeout: Duration) -> Client {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build HTTP client, falling back to defaults");
            Client::new()
        })
}
