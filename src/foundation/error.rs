pub type RelayResult<T> = Result<T, RelayError>;

#[derive(thiserror::Error, Debug)]
pub enum RelayError {
    /// Every node already carries a timestamp for the requested direction.
    #[error("there are no more entries to stamp")]
    NoMoreToStamp,

    #[error("no operation selected")]
    NoOperationSelected,

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("asset not found: {0}")]
    AssetNotFound(String),

    #[error("decode failure: {0}")]
    DecodeFailure(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RelayError {
    pub fn node_not_found(name: impl Into<String>) -> Self {
        Self::NodeNotFound(name.into())
    }

    pub fn asset_not_found(name: impl Into<String>) -> Self {
        Self::AssetNotFound(name.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailure(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamUnavailable(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
