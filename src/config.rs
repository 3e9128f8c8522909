use crate::error::ConfigError;
use crate::models::ImagePreset;
use actix_web::http::{header::HeaderValue, Uri};
use std::env;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Origins admitted by the allow-list policy when `CORS_ORIGINS` is unset.
pub const DEFAULT_ORIGINS: [&str; 4] = [
    "http://localhost:8080",
    "http://localhost:5173",
    "http://localhost:3000",
    "https://ai-powered-food-visualization-frontend.onrender.com",
];

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_REPLICATE_MODEL: &str =
    "stability-ai/sdxl:39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b";
pub const DEFAULT_REPLICATE_BASE_URL: &str = "https://api.replicate.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
}

/// Cross-origin policy for the HTTP surface. The two modes are never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    /// Only the listed origins are admitted.
    AllowList(Vec<String>),
    /// Any request origin is reflected back.
    EchoOrigin,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub openai: OpenAiConfig,
    pub replicate: ReplicateConfig,
    pub image_preset: ImagePreset,
    pub cors: CorsPolicy,
    pub debug: bool,
    pub log_file: Option<String>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl OpenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        ReplicateConfig {
            api_token: None,
            model: DEFAULT_REPLICATE_MODEL.to_string(),
            base_url: DEFAULT_REPLICATE_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl ReplicateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// True when a token is present; without one the image backend is unavailable.
    pub fn is_configured(&self) -> bool {
        self.api_token.as_deref().map_or(false, |t| !t.is_empty())
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        CorsPolicy::AllowList(DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            openai: OpenAiConfig::default(),
            replicate: ReplicateConfig::default(),
            image_preset: ImagePreset::default(),
            cors: CorsPolicy::default(),
            debug: false,
            log_file: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => DEFAULT_PORT,
        };

        let mut openai = OpenAiConfig::default();
        openai.api_key = var("OPENAI_API_KEY");
        if let Some(model) = var("OPENAI_MODEL") {
            openai.model = model;
        }
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            openai.base_url = base_url;
        }

        let mut replicate = ReplicateConfig::default();
        replicate.api_token = var("REPLICATE_API_TOKEN");
        if let Some(model) = var("REPLICATE_MODEL") {
            replicate.model = model;
        }

        let image_preset = match var("IMAGE_PRESET") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "IMAGE_PRESET",
                value: raw,
            })?,
            None => ImagePreset::default(),
        };

        let cors = match var("CORS_MODE").as_deref().map(str::trim) {
            None | Some("allow-list") => match var("CORS_ORIGINS") {
                Some(raw) => CorsPolicy::AllowList(parse_origins(&raw)?),
                None => CorsPolicy::default(),
            },
            Some("echo") => CorsPolicy::EchoOrigin,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "CORS_MODE",
                    value: other.to_string(),
                })
            }
        };

        let debug = var("APP_ENV").map_or(false, |val| val == "development");

        Ok(Config {
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            openai,
            replicate,
            image_preset,
            cors,
            debug,
            log_file: var("LOG_FILE"),
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_openai(mut self, config: OpenAiConfig) -> Self {
        self.openai = config;
        self
    }

    pub fn with_replicate(mut self, config: ReplicateConfig) -> Self {
        self.replicate = config;
        self
    }

    pub fn with_image_preset(mut self, preset: ImagePreset) -> Self {
        self.image_preset = preset;
        self
    }

    pub fn with_cors(mut self, policy: CorsPolicy) -> Self {
        self.cors = policy;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<String>) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            let origin = origin.trim_end_matches('/');
            if is_valid_origin(origin) {
                Ok(origin.to_string())
            } else {
                Err(ConfigError::Invalid {
                    name: "CORS_ORIGINS",
                    value: origin.to_string(),
                })
            }
        })
        .collect()
}

/// An origin must be an http(s) URI with a host that is also a valid header value.
fn is_valid_origin(origin: &str) -> bool {
    let uri_ok = origin.parse::<Uri>().map_or(false, |uri| {
        matches!(uri.scheme_str(), Some("http" | "https")) && uri.host().is_some()
    });
    uri_ok && HeaderValue::from_str(origin).is_ok()
}
