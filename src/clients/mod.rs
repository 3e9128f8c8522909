//! Outbound collaborators: the completion service used to read menus and the
//! image service used to draw dishes. The pipeline only sees the two traits.

pub mod image_client;
pub mod text_client;

use crate::{
    error::{ClientError, ConfigError, Result},
    models::{CompletionRequest, ImageRequest},
};
use async_trait::async_trait;
use std::time::Duration;

pub use image_client::ReplicateImageClient;
pub use text_client::OpenAiTextClient;

/// Text in, text out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

/// Prompt and parameters in, image URLs out.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate(&self, request: &ImageRequest) -> Result<Vec<String>>;
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout(timeout.as_secs())
    } else {
        err.into()
    }
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Client(e.to_string()))
}
