use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The platform answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("invalid platform response: {0}")]
    Decode(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A caller-supplied argument cannot be sent to the platform.
    #[error("{0}")]
    InvalidArgument(String),
}

impl PlatformError {
    /// HTTP status returned by the platform, if the failure came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
