use thiserror::Error;

pub const DEFAULT_DEEPGRAM_MODEL: &str = "nova-2";
pub const DEFAULT_MISTRAL_MODEL: &str = "mistral-small-latest";
const DEFAULT_DEEPGRAM_API_URL: &str = "https://api.deepgram.com";
const DEFAULT_DEEPGRAM_LIVE_URL: &str = "wss://api.deepgram.com/v1/listen";
const DEFAULT_MISTRAL_API_URL: &str = "https://api.mistral.ai";
const DEFAULT_MAX_AUDIO_SIZE_MB: u64 = 100;
const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable '{0}' is not set")]
    Missing(&'static str),

    #[error("Environment variable '{key}' has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Application configuration loaded from environment variables.
/// Startup aborts if a required provider key is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub deepgram_api_key: String,
    pub deepgram_model: String,
    pub deepgram_api_url: String,
    pub deepgram_live_url: String,
    pub mistral_api_key: String,
    pub mistral_model: String,
    pub mistral_api_url: String,
    pub max_audio_size_mb: u64,
    pub realtime_enabled: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a fixed map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Config {
            deepgram_api_key: require(&lookup, "DEEPGRAM_API_KEY")?,
            deepgram_model: optional("DEEPGRAM_MODEL", DEFAULT_DEEPGRAM_MODEL),
            deepgram_api_url: trim_slash(optional("DEEPGRAM_API_URL", DEFAULT_DEEPGRAM_API_URL)),
            deepgram_live_url: optional("DEEPGRAM_LIVE_URL", DEFAULT_DEEPGRAM_LIVE_URL),
            mistral_api_key: require(&lookup, "MISTRAL_API_KEY")?,
            mistral_model: optional("MISTRAL_MODEL", DEFAULT_MISTRAL_MODEL),
            mistral_api_url: trim_slash(optional("MISTRAL_API_URL", DEFAULT_MISTRAL_API_URL)),
            max_audio_size_mb: parse_or(&lookup, "MAX_AUDIO_SIZE_MB", DEFAULT_MAX_AUDIO_SIZE_MB)?,
            realtime_enabled: parse_flag(&lookup, "ENABLE_REALTIME_TRANSCRIPTION", true)?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            rust_log: optional("RUST_LOG", "info"),
        })
    }

    pub fn max_audio_bytes(&self) -> usize {
        (self.max_audio_size_mb as usize).saturating_mul(1024 * 1024)
    }
}

fn require<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
        _ => Ok(default),
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => {
            let normalized = value.trim().to_ascii_lowercase();
            match normalized.as_str() {
                "" => Ok(default),
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid { key, value }),
            }
        }
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
impl Config {
    /// Config with fixed test keys and every other value defaulted.
    pub fn for_tests() -> Self {
        Self::from_lookup(|key| match key {
            "DEEPGRAM_API_KEY" => Some("test-deepgram-key".to_string()),
            "MISTRAL_API_KEY" => Some("test-mistral-key".to_string()),
            _ => None,
        })
        .expect("test config is valid")
    }
}
