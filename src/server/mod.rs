pub mod handlers;

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use std::sync::Arc;

use crate::{
    clients::{ImageService, OpenAiTextClient, ReplicateImageClient},
    config::{Config, CorsPolicy},
    error::ConfigError,
    pipeline::{ImageBatchGenerator, MenuAnalyzer},
};

pub use handlers::ApiError;

/// Per-process state shared by every request. Holds no mutable data.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: MenuAnalyzer,
    pub generator: ImageBatchGenerator,
    pub port: u16,
    pub debug: bool,
}

impl AppState {
    pub fn new(analyzer: MenuAnalyzer, generator: ImageBatchGenerator, config: &Config) -> Self {
        Self {
            analyzer,
            generator,
            port: config.port,
            debug: config.debug,
        }
    }

    /// Builds the real collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let completion = Arc::new(OpenAiTextClient::new(&config.openai)?);

        let images: Option<Arc<dyn ImageService>> =
            match ReplicateImageClient::from_config(&config.replicate)? {
                Some(client) => Some(Arc::new(client)),
                None => {
                    log::warn!("REPLICATE_API_TOKEN not set, image generation is disabled");
                    None
                }
            };

        Ok(Self::new(
            MenuAnalyzer::new(completion),
            ImageBatchGenerator::new(images, config.image_preset),
            config,
        ))
    }
}

/// Registers every route; shared by the server and the endpoint tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(handlers::json_error_handler))
        .route("/", web::get().to(handlers::root))
        .service(
            web::scope("/api")
                .route("/analyze-menu", web::post().to(handlers::analyze_menu))
                .route("/generate-images", web::post().to(handlers::generate_images))
                .route("/health", web::get().to(handlers::health)),
        );
}

pub fn cors(policy: &CorsPolicy) -> Cors {
    let base = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .supports_credentials()
        .max_age(3600);

    match policy {
        CorsPolicy::AllowList(origins) => origins
            .iter()
            .fold(base, |cors, origin| cors.allowed_origin(origin)),
        CorsPolicy::EchoOrigin => base.allowed_origin_fn(|_origin, _head| true),
    }
}

pub async fn run(config: Config, state: AppState) -> std::io::Result<()> {
    let data = web::Data::new(state);
    let policy = config.cors.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(cors(&policy))
            .wrap(middleware::Logger::new("%r %s %Dms"))
            .app_data(data.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
