use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Model every chat request is relayed to.
pub const CHAT_MODEL: &str = "gemini-1.5-flash-8b";

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRelayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    /// Empty when `GOOGLE_GENERATIVE_AI_API_KEY` is unset; the upstream
    /// rejects such calls.
    pub api_key: Secret<String>,
    pub api_base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticsConfig {
    /// Answer `/api/ip` with a loopback placeholder instead of failing when
    /// no client address can be resolved.
    pub ip_dev_fallback: bool,
}

impl ChatRelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(ChatRelayConfig {
            common,
            google: GoogleConfig {
                api_key: Secret::new(env::var("GOOGLE_GENERATIVE_AI_API_KEY").unwrap_or_default()),
                api_base_url: get_env("GEMINI_API_BASE_URL", DEFAULT_GEMINI_API_BASE),
            },
            diagnostics: DiagnosticsConfig {
                ip_dev_fallback: parse_flag(&get_env("IP_DEV_FALLBACK", "false")),
            },
        })
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
