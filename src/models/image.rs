use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::Dish;

/// Named prompt-qualifier and resolution setting, applied to every dish of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePreset {
    /// 1024x1024, studio-style qualifiers tuned for SDXL.
    #[default]
    HighDetail,
    /// 512x512 with a shorter qualifier set.
    Baseline,
}

impl ImagePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImagePreset::HighDetail => "high-detail",
            ImagePreset::Baseline => "baseline",
        }
    }

    pub fn resolution(&self) -> u32 {
        match self {
            ImagePreset::HighDetail => 1024,
            ImagePreset::Baseline => 512,
        }
    }

    pub fn params(&self) -> GenerationParams {
        let size = self.resolution();
        GenerationParams {
            width: size,
            height: size,
            ..GenerationParams::default()
        }
    }

    pub fn prompt_for(&self, dish: &Dish) -> String {
        match self {
            ImagePreset::HighDetail => format!(
                "A photorealistic, beautifully plated dish on a white ceramic plate: {}. {} \
                 Professional food photography, restaurant menu style, ultra high detail, \
                 vibrant colors, no text, no watermark, no people, the dish is properly plated \
                 on a clean white plate, 4k, studio lighting, shallow depth of field, \
                 mouthwatering, delicious looking, food photography, culinary art, masterpiece, \
                 award-winning photography, elegant plating.",
                dish.name, dish.description
            ),
            ImagePreset::Baseline => format!(
                "A photorealistic photo of {}. {} Professional food photography, restaurant \
                 menu style, plated on a white plate, soft natural lighting, high detail, \
                 no text, no watermark, no people, 512x512.",
                dish.name, dish.description
            ),
        }
    }
}

impl fmt::Display for ImagePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImagePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high-detail" | "sdxl" => Ok(ImagePreset::HighDetail),
            "baseline" | "sd" => Ok(ImagePreset::Baseline),
            other => Err(format!("unknown image preset: {}", other)),
        }
    }
}

/// Deployment-level constants sent with every image call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParams {
    pub width: u32,
    pub height: u32,
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub scheduler: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            num_inference_steps: 25,
            guidance_scale: 7.5,
            scheduler: "K_EULER".to_string(),
        }
    }
}

/// One image call: serialized as the model's `input` object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(flatten)]
    pub params: GenerationParams,
}

/// Per-dish result. On the wire `Failed` collapses to `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Ready(String),
    Failed(String),
}

impl ImageOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageOutcome::Ready(url) => Some(url),
            ImageOutcome::Failed(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ImageOutcome::Ready(_))
    }
}

impl Serialize for ImageOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.url().serialize(serializer)
    }
}

pub type ImageResult = Vec<ImageOutcome>;

#[derive(Serialize)]
pub struct PredictionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<&'a str>,
    pub input: &'a ImageRequest,
}

#[derive(Debug, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionStatus::Starting => "starting",
            PredictionStatus::Processing => "processing",
            PredictionStatus::Succeeded => "succeeded",
            PredictionStatus::Failed => "failed",
            PredictionStatus::Canceled => "canceled",
            PredictionStatus::Unknown => "unknown",
        }
    }
}
