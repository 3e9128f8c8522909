use serde::{Deserialize, Serialize};

use super::{Dish, ImageOutcome};

#[derive(Debug, Deserialize)]
pub struct AnalyzeMenuRequest {
    #[serde(rename = "menuText", default)]
    pub menu_text: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeMenuResponse {
    pub dishes: Vec<Dish>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateImagesRequest {
    #[serde(default)]
    pub dishes: Vec<Dish>,
}

#[derive(Debug, Serialize)]
pub struct GenerateImagesResponse {
    pub images: Vec<ImageOutcome>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub port: String,
}

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub port: String,
    pub timestamp: f64,
}
