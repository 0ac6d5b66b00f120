use std::time::Duration;

use async_trait::async_trait;

use crate::foundation::error::{RelayError, RelayResult};
use crate::route::Route;

/// Hands a route to the next host.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Delivers `route` to the relay endpoint at `address` (`host[:port]`).
    async fn forward(&self, address: &str, route: &Route) -> RelayResult<()>;
}

/// POSTs the route as JSON to `{scheme}://{address}/relay`.
#[derive(Clone, Debug)]
pub struct HttpForwarder {
    client: reqwest::Client,
    scheme: String,
}

impl HttpForwarder {
    pub fn new(scheme: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| RelayError::upstream(format!("forward client: {e}")))?;
        Ok(Self {
            client,
            scheme: scheme.into(),
        })
    }

    pub fn relay_url(&self, address: &str) -> String {
        format!("{}://{}/relay", self.scheme, address)
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, address: &str, route: &Route) -> RelayResult<()> {
        if address.is_empty() {
            return Err(RelayError::validation("next host has no private address"));
        }
        let url = self.relay_url(address);
        self.client
            .post(&url)
            .json(route)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RelayError::upstream(format!("could not relay to {url}: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collab/forward.rs"]
mod tests;
