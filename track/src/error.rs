use thiserror::Error;

/// Failures raised anywhere in the geotagging pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input fields.
    #[error("{0}")]
    Validation(String),
    /// Degenerate waypoint sets that no interpolant can be fitted to.
    #[error("{0}")]
    Interpolation(String),
    /// A geotagging run was driven out of order.
    #[error("{0}")]
    Precondition(String),
    /// A lookup against an empty table.
    #[error("{0}")]
    NotFound(String),
    /// Caller-supplied media that could not be decoded or parsed.
    #[error("{0}")]
    Media(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }

    /// Whether the failure was caused by the request rather than the server.
    pub fn is_caller_fault(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Interpolation(_) | Self::NotFound(_) | Self::Media(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
