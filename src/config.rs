//! Environment-driven configuration
//!
//! Every setting has a default; unparsable values are logged and ignored.
//! Only the API key has no default, and the binary refuses to start without it.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::analysis::{LengthLimits, ModelConfig, PromptStyle};
use crate::llm_engine::providers::openai_compat_provider::DEFAULT_ENDPOINT;
use crate::llm_engine::OpenAiCompatConfig;

pub const ENV_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "LLM_API_KEY";
pub const ENV_API_URL: &str = "ANALYZER_API_URL";
pub const ENV_MODEL: &str = "ANALYZER_MODEL";
pub const ENV_TEMPERATURE: &str = "ANALYZER_TEMPERATURE";
pub const ENV_MAX_TOKENS: &str = "ANALYZER_MAX_TOKENS";
pub const ENV_TIMEOUT_SECS: &str = "ANALYZER_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "ANALYZER_MAX_RETRIES";
pub const ENV_RETRY_DELAY_SECS: &str = "ANALYZER_RETRY_DELAY_SECS";
pub const ENV_MAX_CHARS: &str = "ANALYZER_MAX_CHARS";
pub const ENV_WARN_CHARS: &str = "ANALYZER_WARN_CHARS";
pub const ENV_PROMPT_STYLE: &str = "ANALYZER_PROMPT_STYLE";
pub const ENV_BATCH_DELAY_MS: &str = "ANALYZER_BATCH_DELAY_MS";
pub const ENV_RESULT_LOG: &str = "ANALYZER_RESULT_LOG";
pub const ENV_BIND_ADDR: &str = "ANALYZER_BIND_ADDR";

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    /// Per-attempt HTTP timeout handed to the provider
    pub timeout_secs: u64,
    pub model: ModelConfig,
    pub limits: LengthLimits,
    pub prompt_style: PromptStyle,
    pub batch_delay: Duration,
    pub result_log_path: PathBuf,
    pub bind_addr: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
            model: ModelConfig::default(),
            limits: LengthLimits::default(),
            prompt_style: PromptStyle::default(),
            batch_delay: Duration::from_millis(500),
            result_log_path: PathBuf::from("call_analysis.csv"),
            bind_addr: "0.0.0.0:5000".to_string(),
        }
    }
}

impl AnalyzerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = get(ENV_API_KEY).or_else(|| get(ENV_API_KEY_FALLBACK));

        let model = ModelConfig {
            model: get(ENV_MODEL).unwrap_or(defaults.model.model),
            temperature: parse_or(&get, ENV_TEMPERATURE, defaults.model.temperature),
            max_tokens: parse_or(&get, ENV_MAX_TOKENS, defaults.model.max_tokens),
            max_retries: parse_or(&get, ENV_MAX_RETRIES, defaults.model.max_retries),
            retry_base_delay: secs_f64_or(&get, ENV_RETRY_DELAY_SECS, defaults.model.retry_base_delay),
        };

        let limits = LengthLimits {
            max_chars: limit_or(&get, ENV_MAX_CHARS, defaults.limits.max_chars),
            warn_chars: limit_or(&get, ENV_WARN_CHARS, defaults.limits.warn_chars),
        };

        let prompt_style = match get(ENV_PROMPT_STYLE) {
            Some(raw) => PromptStyle::parse(&raw).unwrap_or_else(|| {
                log::warn!("Ignoring invalid {}={:?}", ENV_PROMPT_STYLE, raw);
                defaults.prompt_style
            }),
            None => defaults.prompt_style,
        };

        Self {
            api_key,
            api_url: get(ENV_API_URL).unwrap_or(defaults.api_url),
            timeout_secs: positive_or(&get, ENV_TIMEOUT_SECS, defaults.timeout_secs),
            model,
            limits,
            prompt_style,
            batch_delay: Duration::from_millis(parse_or(
                &get,
                ENV_BATCH_DELAY_MS,
                defaults.batch_delay.as_millis() as u64,
            )),
            result_log_path: get(ENV_RESULT_LOG)
                .map(PathBuf::from)
                .unwrap_or(defaults.result_log_path),
            bind_addr: get(ENV_BIND_ADDR).unwrap_or(defaults.bind_addr),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Provider settings; `None` when no key is configured.
    pub fn provider_config(&self) -> Option<OpenAiCompatConfig> {
        self.api_key.as_ref().map(|key| OpenAiCompatConfig {
            endpoint: self.api_url.clone(),
            api_key: key.clone(),
            timeout_secs: self.timeout_secs,
        })
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> T
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}", name, raw);
            default
        }),
        None => default,
    }
}

fn positive_or<G>(get: &G, name: &str, default: u64) -> u64
where
    G: Fn(&str) -> Option<String>,
{
    match parse_or(get, name, default) {
        0 => {
            log::warn!("Ignoring {}=0, must be at least 1", name);
            default
        }
        n => n,
    }
}

fn secs_f64_or<G>(get: &G, name: &str, default: Duration) -> Duration
where
    G: Fn(&str) -> Option<String>,
{
    let secs = parse_or(get, name, default.as_secs_f64());
    Duration::try_from_secs_f64(secs).unwrap_or_else(|_| {
        log::warn!("Ignoring out-of-range {}={}", name, secs);
        default
    })
}

/// `0` switches a length check off.
fn limit_or<G>(get: &G, name: &str, default: Option<usize>) -> Option<usize>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(0) => None,
            Ok(n) => Some(n),
            Err(_) => {
                log::warn!("Ignoring invalid {}={:?}", name, raw);
                default
            }
        },
        None => default,
    }
}
