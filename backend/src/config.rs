use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::services::ai::FallbackDefaults;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub ai: AiConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Generative Language API settings (`[ai]`) plus fallback defaults
/// (`[ai.fallback]`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Per-call timeout in seconds (accepts "30s", "1m")
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Pause between features in the self-test harness
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub self_test_delay_secs: u64,
    /// Candidates tried in order by the model probe
    pub probe_models: Vec<String>,
    pub fallback: FallbackDefaults,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Where the OAuth credential is presented (Identity Toolkit `requestUri`)
    pub request_uri: String,
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub session_ttl_secs: u64,
}

impl Config {
    /// Load configuration with environment variable override support
    ///
    /// Loading order:
    /// 1. Load from the given path, or the first config.toml found
    /// 2. Override with environment variables
    /// 3. Validate the final configuration
    pub fn load(path: Option<&str>) -> Result<Self, anyhow::Error> {
        let path = path.map(str::to_string).or_else(Self::find_config_file);

        let mut config = if let Some(config_path) = path {
            tracing::info!("Loading configuration from {}", config_path);
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    ///
    /// Supported keys:
    /// - APP_SERVER_HOST / APP_SERVER_PORT
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,waystay=debug")
    /// - GEMINI_API_KEY, or NEXT_PUBLIC_GEMINI_API_KEY when the former is unset
    /// - APP_GEMINI_MODEL / APP_GEMINI_BASE_URL
    /// - APP_GEMINI_TIMEOUT: accepts "30s", "1m"
    /// - FIREBASE_API_KEY / APP_IDENTITY_BASE_URL
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Some(port) = lookup("APP_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
            tracing::info!("Override server.port from env: {}", self.server.port);
        }

        if let Some(level) = lookup("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Some(key) = lookup("GEMINI_API_KEY").or_else(|| lookup("NEXT_PUBLIC_GEMINI_API_KEY"))
            && !key.trim().is_empty()
        {
            self.ai.api_key = Some(key);
            tracing::info!("Override ai.api_key from env");
        }

        if let Some(model) = lookup("APP_GEMINI_MODEL") {
            self.ai.model = model;
            tracing::info!("Override ai.model from env: {}", self.ai.model);
        }

        if let Some(base_url) = lookup("APP_GEMINI_BASE_URL") {
            self.ai.base_url = base_url;
            tracing::info!("Override ai.base_url from env: {}", self.ai.base_url);
        }

        if let Some(timeout) = lookup("APP_GEMINI_TIMEOUT") {
            match parse_duration_to_secs(&timeout) {
                Ok(val) => {
                    self.ai.timeout_secs = val;
                    tracing::info!("Override ai.timeout_secs from env: {}", self.ai.timeout_secs);
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_GEMINI_TIMEOUT '{}': {} (keep {})",
                    timeout,
                    e,
                    self.ai.timeout_secs
                ),
            }
        }

        if let Some(key) = lookup("FIREBASE_API_KEY")
            && !key.trim().is_empty()
        {
            self.identity.api_key = Some(key);
            tracing::info!("Override identity.api_key from env");
        }

        if let Some(base_url) = lookup("APP_IDENTITY_BASE_URL") {
            self.identity.base_url = base_url;
            tracing::info!("Override identity.base_url from env: {}", self.identity.base_url);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.ai.timeout_secs == 0 {
            anyhow::bail!("ai.timeout_secs must be > 0");
        }

        if self.ai.model.trim().is_empty() {
            anyhow::bail!("ai.model cannot be empty");
        }

        let shares = self.ai.fallback.shares();
        if let Some((name, share)) = shares.iter().find(|(_, share)| *share < 0.0) {
            anyhow::bail!("ai.fallback.{}_share cannot be negative ({})", name, share);
        }
        let total: f64 = shares.iter().map(|(_, share)| share).sum();
        if total > 1.0 + f64::EPSILON {
            anyhow::bail!("ai.fallback shares must sum to at most 1.0 (got {:.2})", total);
        }
        if self.ai.fallback.daily_rate_per_traveler < 0.0 {
            anyhow::bail!("ai.fallback.daily_rate_per_traveler cannot be negative");
        }

        if self.ai.api_key.is_none() {
            tracing::warn!("No Gemini API key configured; AI features will fail with an auth error");
        }
        if self.identity.api_key.is_none() {
            tracing::warn!("No identity API key configured; sign-in will be rejected upstream");
        }

        Ok(())
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, anyhow::Error> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,waystay=debug".to_string(), file: None }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 30,
            temperature: 0.7,
            max_output_tokens: 8192,
            self_test_delay_secs: 1,
            probe_models: [
                "gemini-2.5-flash",
                "gemini-2.0-flash-exp",
                "gemini-1.5-flash",
                "gemini-1.5-pro",
                "gemini-pro",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            fallback: FallbackDefaults::default(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
            request_uri: "http://localhost".to_string(),
            session_ttl_secs: 60 * 60,
        }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    // Plain numbers are seconds
    if let Ok(val) = input.parse::<u64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Ok(n),
        "m" | "min" | "mins" | "minute" | "minutes" => Ok(n * 60),
        "h" | "hr" | "hour" | "hours" => Ok(n * 60 * 60),
        _ => Err(format!("unsupported unit: {}", unit)),
    }
}

// Accepts numeric seconds or human-friendly strings
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '30s', '5m', '1h'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}
