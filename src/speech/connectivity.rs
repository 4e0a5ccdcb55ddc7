//! Single-shot reachability check used to pick the session [`Mode`].
//!
//! [`Mode`]: crate::speech::Mode

use std::time::Duration;

use crate::config::SpeechConfig;

/// Performs one bounded HTTP GET against a fixed URL.
///
/// Any response, whatever its status code, means the network is usable.
/// DNS failures, refused connections and timeouts all mean it is not.
#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    url: String,
    timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &SpeechConfig) -> Self {
        Self::new(config.probe_url.clone(), config.probe_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns `true` when the probe URL answered within the timeout.
    ///
    /// Never fails: every network-layer error is logged and reported as
    /// `false`. No retries are made.
    pub async fn is_online(&self) -> bool {
        let client = match reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                log::warn!("connectivity: cannot build HTTP client ({e}); assuming offline");
                return false;
            }
        };

        match client.get(&self.url).send().await {
            Ok(response) => {
                log::info!(
                    "Internet connection found ({} answered {})",
                    self.url,
                    response.status()
                );
                true
            }
            Err(e) if e.is_timeout() => {
                log::info!("No internet connection ({} timed out)", self.url);
                false
            }
            Err(e) => {
                log::info!("No internet connection ({e})");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
