// src/config.rs

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got `{value}`")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be one of {allowed}, got `{value}`")]
    UnknownChoice {
        key: &'static str,
        value: String,
        allowed: &'static str,
    },

    #[error("{key} must be true or false, got `{value}`")]
    InvalidBool { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    Groq,
    Gemini,
    /// No chat model: link selection falls back to path keywords and listing
    /// extraction is unavailable.
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeocodingService {
    OpenCage,
    Google,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScraperKind {
    Direct,
    ZenRows,
}

/// Runtime settings, read once at startup and passed down.
#[derive(Debug, Clone)]
pub struct Settings {
    pub max_workers: usize,
    pub waiting_time: Duration,
    pub max_words: usize,
    pub max_address_rows: usize,
    pub results_dir: PathBuf,
    pub websites_csv: PathBuf,

    pub ai_provider: AiProvider,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub ai_request_delay: Duration,

    pub geocoding_service: GeocodingService,
    pub opencage_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub inline_geocoding: bool,

    pub scraper: ScraperKind,
    pub zenrows_api_key: Option<String>,

    pub retry_max_attempts: usize,
    pub retry_wait_time: Duration,
    pub retry_data_wait_time: Duration,
    pub save_attempts: usize,

    pub log_dir: PathBuf,
    pub log_file: String,
}

impl Settings {
    /// Reads the process environment. Load `.env` before calling this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup: &lookup };

        Ok(Self {
            max_workers: env.number("MAX_WORKERS", 5usize)?.max(1),
            waiting_time: env.seconds("WAITING_TIME", 30)?,
            max_words: env.number("MAX_WORDS", 1000usize)?.max(1),
            max_address_rows: env.number("MAX_ADDRESS_ROWS", 100)?,
            results_dir: env.path("RESULTS_DIR", "results"),
            websites_csv: env.path("WEBSITES_CSV", "data/websites.csv"),

            ai_provider: env.choice(
                "AI_PROVIDER",
                AiProvider::Groq,
                "groq, gemini, keyword",
                |v| match v {
                    "groq" => Some(AiProvider::Groq),
                    "gemini" => Some(AiProvider::Gemini),
                    "keyword" => Some(AiProvider::Keyword),
                    _ => None,
                },
            )?,
            groq_api_key: env.secret("GROQ_API_KEY"),
            groq_model: env.text("GROQ_MODEL", "llama-3.1-70b-versatile"),
            gemini_api_key: env.secret("GEMINI_API_KEY"),
            gemini_model: env.text("GEMINI_MODEL", "gemini-1.5-flash"),
            ai_request_delay: env.seconds("AI_REQUEST_DELAY", 5)?,

            geocoding_service: env.choice(
                "GEOCODING_SERVICE",
                GeocodingService::OpenCage,
                "opencage, google",
                |v| match v {
                    "opencage" => Some(GeocodingService::OpenCage),
                    "google" => Some(GeocodingService::Google),
                    _ => None,
                },
            )?,
            opencage_api_key: env.secret("OPENCAGE_API_KEY"),
            google_api_key: env.secret("GOOGLE_API_KEY"),
            inline_geocoding: env.flag("INLINE_GEOCODING", false)?,

            scraper: env.choice("SCRAPER", ScraperKind::Direct, "direct, zenrows", |v| {
                match v {
                    "direct" => Some(ScraperKind::Direct),
                    "zenrows" => Some(ScraperKind::ZenRows),
                    _ => None,
                }
            })?,
            zenrows_api_key: env.secret("ZENROWS_API_KEY"),

            retry_max_attempts: env.number("RETRY_MAX_ATTEMPTS", 1usize)?.max(1),
            retry_wait_time: env.seconds("RETRY_WAIT_TIME", 15)?,
            retry_data_wait_time: env.seconds("RETRY_DATA_WAIT_TIME", 10)?,
            save_attempts: env.number("SAVE_ATTEMPTS", 2usize)?.max(1),

            log_dir: env.path("LOG_DIR", "logs"),
            log_file: env.text("LOG_FILE", "scraper.log"),
        })
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    /// Set and non-blank, trimmed.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn secret(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    fn text(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn path(&self, key: &str, default: &str) -> PathBuf {
        PathBuf::from(self.text(key, default))
    }

    fn number<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { key, value }),
        }
    }

    fn seconds(&self, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
        self.number(key, default).map(Duration::from_secs)
    }

    fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidBool { key, value }),
            },
        }
    }

    fn choice<T>(
        &self,
        key: &'static str,
        default: T,
        allowed: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => parse(&value.to_ascii_lowercase())
                .ok_or(ConfigError::UnknownChoice { key, value, allowed }),
        }
    }
}
