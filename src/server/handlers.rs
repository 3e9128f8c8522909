use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::AssertUnwindSafe;
use thiserror::Error;
use uuid::Uuid;

use super::AppState;
use crate::{
    error::{AnalysisError, GenerationError},
    models::{
        AnalyzeMenuRequest, AnalyzeMenuResponse, ErrorResponse, GenerateImagesRequest,
        GenerateImagesResponse, HealthResponse, RootResponse,
    },
};

pub const MSG_MENU_REQUIRED: &str = "Menu text is required";
pub const MSG_NOT_A_MENU: &str =
    "The uploaded image does not appear to be a food menu. Please try again.";
pub const MSG_NO_DISHES: &str = "Failed to extract dishes from menu. Please try another image.";
pub const MSG_PARSE_FAILED: &str = "Failed to parse menu analysis. Please try again.";
pub const MSG_ANALYSIS_FAILED: &str =
    "An error occurred while analyzing the menu. Please try again.";
pub const MSG_DISHES_REQUIRED: &str = "Dishes array is required";
pub const MSG_BACKEND_UNAVAILABLE: &str = "Image generation backend is not configured";
pub const MSG_GENERATION_FAILED: &str =
    "An error occurred while generating images. Please try again.";
pub const MSG_INVALID_BODY: &str = "Invalid JSON request body";

/// Errors as the HTTP caller sees them. Only fixed messages leave the process.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("menu analysis aborted unexpectedly")]
    AnalysisAborted,
    #[error("image generation aborted unexpectedly")]
    GenerationAborted,
}

impl ApiError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ApiError::Analysis(err) => match err {
                AnalysisError::InvalidInput => MSG_MENU_REQUIRED,
                AnalysisError::NotAMenu => MSG_NOT_A_MENU,
                AnalysisError::MalformedResult(_) => MSG_NO_DISHES,
                AnalysisError::ParseError(_) => MSG_PARSE_FAILED,
                AnalysisError::UpstreamError(_) => MSG_ANALYSIS_FAILED,
            },
            ApiError::Generation(err) => match err {
                GenerationError::InvalidInput => MSG_DISHES_REQUIRED,
                GenerationError::BackendUnavailable => MSG_BACKEND_UNAVAILABLE,
            },
            ApiError::AnalysisAborted => MSG_ANALYSIS_FAILED,
            ApiError::GenerationAborted => MSG_GENERATION_FAILED,
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Analysis(AnalysisError::UpstreamError(_))
            | ApiError::Generation(GenerationError::BackendUnavailable)
            | ApiError::AnalysisAborted
            | ApiError::GenerationAborted => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Analysis(_) | ApiError::Generation(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.user_message()))
    }
}

pub async fn analyze_menu(
    state: web::Data<AppState>,
    body: web::Json<AnalyzeMenuRequest>,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let menu_text = body.into_inner().menu_text;
    log::info!("[req:{}] analyze-menu ({} chars)", request_id, menu_text.len());

    let outcome = AssertUnwindSafe(state.analyzer.analyze(&menu_text))
        .catch_unwind()
        .await;

    let result = match outcome {
        Ok(result) => result.map_err(ApiError::from),
        Err(panic) => {
            log_panic(request_id, "analyze-menu", panic, state.debug);
            Err(ApiError::AnalysisAborted)
        }
    };

    match result {
        Ok(dishes) => {
            log::info!("[req:{}] returning {} dishes", request_id, dishes.len());
            Ok(HttpResponse::Ok().json(AnalyzeMenuResponse { dishes }))
        }
        Err(err) => {
            report(request_id, "analyze-menu", &err, state.debug);
            Err(err)
        }
    }
}

pub async fn generate_images(
    state: web::Data<AppState>,
    body: web::Json<GenerateImagesRequest>,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let dishes = body.into_inner().dishes;
    log::info!("[req:{}] generate-images ({} dishes)", request_id, dishes.len());

    let outcome = AssertUnwindSafe(state.generator.generate(&dishes))
        .catch_unwind()
        .await;

    let result = match outcome {
        Ok(result) => result.map_err(ApiError::from),
        Err(panic) => {
            log_panic(request_id, "generate-images", panic, state.debug);
            Err(ApiError::GenerationAborted)
        }
    };

    match result {
        Ok(images) => Ok(HttpResponse::Ok().json(GenerateImagesResponse { images })),
        Err(err) => {
            report(request_id, "generate-images", &err, state.debug);
            Err(err)
        }
    }
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        port: state.port.to_string(),
    })
}

pub async fn root(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(RootResponse {
        message: "Food Visualization Backend is running!",
        port: state.port.to_string(),
        timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
    })
}

/// Client mistakes are warnings, server-side failures are errors.
fn report(request_id: Uuid, endpoint: &str, err: &ApiError, debug: bool) {
    if err.status_code().is_client_error() {
        log::warn!("[req:{}] {} rejected: {}", request_id, endpoint, err);
        return;
    }

    log::error!("[req:{}] Error in {}: {}", request_id, endpoint, err);
    if debug {
        log::error!(
            "[req:{}] {:?}\nbacktrace:\n{}",
            request_id,
            err,
            Backtrace::force_capture()
        );
    }
}

fn log_panic(request_id: Uuid, endpoint: &str, panic: Box<dyn Any + Send>, debug: bool) {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());

    log::error!("[req:{}] {} panicked: {}", request_id, endpoint, message);
    if debug {
        log::error!("[req:{}] backtrace:\n{}", request_id, Backtrace::force_capture());
    }
}

pub(crate) fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    log::warn!("Rejected request body: {}", err);
    let response = HttpResponse::BadRequest().json(ErrorResponse::new(MSG_INVALID_BODY));
    actix_web::error::InternalError::from_response(err, response).into()
}
