use thiserror::Error;

/// Failures of the outbound collaborators (completion and image services).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("empty response: {0}")]
    EmptyResponse(String),
    #[error("prediction {status}: {message}")]
    PredictionFailed { status: String, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ClientError::Status {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None if err.is_decode() => ClientError::Decode(err.to_string()),
            None => ClientError::Http(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("menu text is required")]
    InvalidInput,
    #[error("text is not a food menu")]
    NotAMenu,
    #[error("could not parse model reply as JSON: {0}")]
    ParseError(String),
    #[error("model reply is not a non-empty dish list: {0}")]
    MalformedResult(String),
    #[error("completion service failed: {0}")]
    UpstreamError(#[from] ClientError),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("dishes array is required")]
    InvalidInput,
    #[error("image generation backend is not configured")]
    BackendUnavailable,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
