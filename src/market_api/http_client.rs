use std::time::Duration;

const USER_AGENT: &str = concat!("market-advisor/", env!("CARGO_PKG_VERSION"));

/// Shared client settings for both collaborators. The timeout bounds every
/// request end to end; there is no retry layer on top.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| format!("Client error: {}", e))
}
