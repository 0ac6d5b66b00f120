use std::time::Duration;

use async_trait::async_trait;

use crate::foundation::error::{RelayError, RelayResult};
use crate::route::Host;

/// Compute Engine metadata server, reachable from any instance.
pub const METADATA_BASE_URL: &str = "http://metadata.google.internal/computeMetadata/v1";

const USER_AGENT: &str = "postcard-relay-query";

/// A fact about the machine this process runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityKind {
    ExternalIp,
    PrivateIp,
    Name,
    ProjectId,
}

impl IdentityKind {
    fn metadata_path(self) -> &'static str {
        match self {
            Self::ExternalIp => "instance/network-interfaces/0/access-configs/0/external-ip",
            Self::PrivateIp => "instance/network-interfaces/0/ip",
            Self::Name => "instance/name",
            Self::ProjectId => "project/project-id",
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identity(&self, kind: IdentityKind) -> RelayResult<String>;

    /// This machine as a route host.
    async fn host(&self) -> RelayResult<Host> {
        Ok(Host {
            name: self.identity(IdentityKind::Name).await?,
            endpoint: self.identity(IdentityKind::ExternalIp).await?,
            private: self.identity(IdentityKind::PrivateIp).await?,
        })
    }
}

/// Identity read from the cloud metadata server.
#[derive(Clone, Debug)]
pub struct MetadataIdentity {
    client: reqwest::Client,
    base_url: String,
}

impl MetadataIdentity {
    pub fn new(timeout: Duration) -> RelayResult<Self> {
        Self::with_base_url(METADATA_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> RelayResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RelayError::upstream(format!("metadata client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for MetadataIdentity {
    async fn identity(&self, kind: IdentityKind) -> RelayResult<String> {
        let url = format!("{}/{}", self.base_url, kind.metadata_path());
        let resp = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RelayError::upstream(format!("metadata {kind:?}: {e}")))?;
        let body = resp
            .text()
            .await
            .map_err(|e| RelayError::upstream(format!("metadata {kind:?}: {e}")))?;
        Ok(body.trim().to_string())
    }
}

/// Identity fixed at startup, for machines outside the cloud.
#[derive(Clone, Debug, Default)]
pub struct StaticIdentity {
    pub host: Host,
    pub project_id: String,
}

impl StaticIdentity {
    pub fn new(host: Host, project_id: impl Into<String>) -> Self {
        Self {
            host,
            project_id: project_id.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn identity(&self, kind: IdentityKind) -> RelayResult<String> {
        let value = match kind {
            IdentityKind::ExternalIp => &self.host.endpoint,
            IdentityKind::PrivateIp => &self.host.private,
            IdentityKind::Name => &self.host.name,
            IdentityKind::ProjectId => &self.project_id,
        };
        if value.is_empty() {
            return Err(RelayError::validation(format!(
                "static identity has no value for {kind:?}"
            )));
        }
        Ok(value.clone())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collab/identity.rs"]
mod tests;
