//! Menu-to-picture relay.
//!
//! [`MenuAnalyzer`] asks a completion model for the most appealing dishes on a
//! menu; [`ImageBatchGenerator`] asks a text-to-image model for a photo of each.
//! The [`server`] module exposes both over HTTP.

pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod pipeline;
pub mod server;

pub use clients::{CompletionService, ImageService, OpenAiTextClient, ReplicateImageClient};
pub use config::{Config, CorsPolicy, OpenAiConfig, ReplicateConfig};
pub use error::{AnalysisError, ClientError, ConfigError, GenerationError};
pub use models::{Dish, DishBatch, ImageOutcome, ImagePreset, ImageResult, MAX_DISHES};
pub use pipeline::{extract_json, ImageBatchGenerator, MenuAnalyzer};
