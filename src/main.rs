use menuvis::{
    logger::{self, LoggerConfig},
    server::{self, AppState},
    Config,
};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();

    let config = Config::from_env()?;
    let mut logger_config = LoggerConfig::for_debug(config.debug);
    if let Some(path) = &config.log_file {
        logger_config = logger_config.with_file_output(path);
    }
    logger::init_with_config(logger_config)?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    logger::log_startup_info(
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        &config.host,
        config.port,
    );
    logger::log_config_info(&config);

    let state = AppState::from_config(&config)?;
    server::run(config, state).await?;

    Ok(())
}
