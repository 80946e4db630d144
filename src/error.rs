use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// How a non-200 response from the marketboard API is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFailure {
    /// 400, the query parameters were rejected.
    InvalidParameters,
    /// 404, the world/datacenter or item id is unknown.
    UnknownTarget,
    Generic,
}

impl RequestFailure {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::InvalidParameters,
            404 => Self::UnknownTarget,
            _ => Self::Generic,
        }
    }
}

impl std::fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParameters => write!(f, "invalid parameters"),
            Self::UnknownTarget => write!(f, "invalid World/DC or Item ID"),
            Self::Generic => write!(f, "generic http request"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Request failed with status {status} ({failure}): {url}")]
    Request {
        status: u16,
        url: String,
        failure: RequestFailure,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid item id: {0:?}")]
    InvalidItemId(String),

    #[error("Unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn request(status: u16, url: impl Into<String>) -> Self {
        Self::Request {
            status,
            url: url.into(),
            failure: RequestFailure::from_status(status),
        }
    }

    /// The HTTP status carried by a [`Error::Request`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}
