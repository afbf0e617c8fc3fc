use std::{fmt, str::FromStr, time::Duration};

use anyhow::anyhow;
use tracing::{info, warn};

use crate::registry::media::PhotoFallback;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    pub max_upload_bytes: usize,
    pub request_timeout: Duration,
    pub photo_fallback: PhotoFallback,

    pub openai: ServiceConfig,
    pub perplexity: ServiceConfig,
    pub gemini: ServiceConfig,
}

/// Endpoint and key of one third-party API. A missing key disables the feature.
#[derive(Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

const DEFAULT_PORT: &str = "8080";
const DEFAULT_DATABASE_URL: &str = "sqlite://wedding.db?mode=rwc";
const DEFAULT_MAX_CONNECTIONS: &str = "16";
const DEFAULT_MAX_UPLOAD_BYTES: &str = "26214400";
const DEFAULT_REQUEST_TIMEOUT_SECS: &str = "30";
const DEFAULT_PHOTO_FALLBACK: &str = "drop";

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const DEFAULT_PERPLEXITY_URL: &str = "https://api.perplexity.ai";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl Config {
    /// Reads the process environment. Call `dotenv::dotenv()` first to pick up `.env`.
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            port: try_load("PORT", DEFAULT_PORT)?,
            database_url: try_load("DATABASE_URL", DEFAULT_DATABASE_URL)?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            max_upload_bytes: try_load("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            request_timeout: Duration::from_secs(try_load(
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            photo_fallback: try_load("PHOTO_FALLBACK", DEFAULT_PHOTO_FALLBACK)?,

            openai: ServiceConfig {
                base_url: try_load("OPENAI_BASE_URL", DEFAULT_OPENAI_URL)?,
                api_key: secret("OPENAI_API_KEY"),
            },
            perplexity: ServiceConfig {
                base_url: try_load("PERPLEXITY_BASE_URL", DEFAULT_PERPLEXITY_URL)?,
                api_key: secret("PERPLEXITY_API_KEY"),
            },
            gemini: ServiceConfig {
                base_url: try_load("GEMINI_BASE_URL", DEFAULT_GEMINI_URL)?,
                api_key: secret("GOOGLE_API_KEY"),
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        let service = |base_url: &str| ServiceConfig {
            base_url: base_url.to_owned(),
            api_key: None,
        };

        Self {
            port: 8080,
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            max_connections: 16,
            max_upload_bytes: 25 * 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            photo_fallback: PhotoFallback::default(),
            openai: service(DEFAULT_OPENAI_URL),
            perplexity: service(DEFAULT_PERPLEXITY_URL),
            gemini: service(DEFAULT_GEMINI_URL),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: fmt::Display,
{
    let raw = dotenv::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_owned()
    });

    raw.trim()
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value {raw:?}: {e}"))
}

fn secret(key: &str) -> Option<String> {
    let value = dotenv::var(key)
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty());
    if value.is_none() {
        warn!("{key} not set, features depending on it are disabled");
    }
    value
}
