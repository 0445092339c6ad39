use reqwest::Client as HttpClient;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const INITIAL_DELAY: Duration = Duration::from_secs(30);
pub const PING_INTERVAL: Duration = Duration::from_secs(14 * 60);
const PING_TIMEOUT: Duration = Duration::from_secs(10);

pub fn health_url(base: &str) -> String {
    format!("{}/health", base.trim_end_matches('/'))
}

/// Ping `{base_url}/health` every [`PING_INTERVAL`] after [`INITIAL_DELAY`].
pub fn spawn(base_url: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let client = match HttpClient::builder().timeout(PING_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "keep-alive disabled: cannot build HTTP client");
                return;
            }
        };
        let url = health_url(&base_url);

        tokio::time::sleep(INITIAL_DELAY).await;
        let mut interval = tokio::time::interval(PING_INTERVAL);
        loop {
            interval.tick().await;
            match client.get(&url).send().await {
                Ok(resp) => tracing::info!(status = %resp.status(), url = %url, "keep-alive ping"),
                Err(e) => tracing::warn!(error = %e, url = %url, "keep-alive ping failed"),
            }
        }
    })
}
