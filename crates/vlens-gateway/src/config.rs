//! Gateway configuration.

use std::time::Duration;

use crate::error::{GatewayError, GatewayResult};
use crate::request::ModelTier;
use crate::retry::RetryPolicy;

/// Default Gemini API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model name for each tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierModels {
    pub fast: String,
    pub standard: String,
    pub pro: String,
}

impl Default for TierModels {
    fn default() -> Self {
        Self {
            fast: "gemini-2.5-flash-lite".to_string(),
            standard: "gemini-2.5-flash".to_string(),
            pro: "gemini-2.5-pro".to_string(),
        }
    }
}

impl TierModels {
    pub fn for_tier(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Standard => &self.standard,
            ModelTier::Pro => &self.pro,
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API key for the inference service
    pub api_key: String,
    /// Service base URL (overridable for tests and proxies)
    pub base_url: String,
    /// Model per tier
    pub models: TierModels,
    /// Retry budget and backoff
    pub retry: RetryPolicy,
    /// Minimum spacing between admissions on the serialized lane
    pub min_spacing: Duration,
    /// Concurrent slots on the parallel lane
    pub parallel_slots: usize,
    /// Per-attempt HTTP timeout
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            models: TierModels::default(),
            retry: RetryPolicy::default(),
            min_spacing: Duration::from_secs(1),
            parallel_slots: 4,
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl GatewayConfig {
    /// Create config from environment variables.
    pub fn from_env() -> GatewayResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GatewayError::config("GEMINI_API_KEY not set"))?;
        if api_key.trim().is_empty() {
            return Err(GatewayError::config("GEMINI_API_KEY is empty"));
        }

        let defaults = Self::default();
        let default_models = TierModels::default();

        Ok(Self {
            api_key,
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            models: TierModels {
                fast: std::env::var("GEMINI_MODEL_FAST").unwrap_or(default_models.fast),
                standard: std::env::var("GEMINI_MODEL_STANDARD").unwrap_or(default_models.standard),
                pro: std::env::var("GEMINI_MODEL_PRO").unwrap_or(default_models.pro),
            },
            retry: RetryPolicy {
                retry_budget: env_parse("GATEWAY_RETRY_BUDGET", 2),
                base_delay: Duration::from_millis(env_parse("GATEWAY_BASE_DELAY_MS", 1000)),
                max_delay: Duration::from_millis(env_parse("GATEWAY_MAX_DELAY_MS", 30_000)),
                retry_after_margin: Duration::from_millis(env_parse("GATEWAY_RETRY_AFTER_MARGIN_MS", 500)),
            },
            min_spacing: Duration::from_millis(env_parse("GATEWAY_MIN_SPACING_MS", 1000)),
            parallel_slots: env_parse::<usize>("GATEWAY_PARALLEL_SLOTS", 4).max(1),
            request_timeout: Duration::from_secs(env_parse("GATEWAY_TIMEOUT_SECS", 120)),
        })
    }

    /// Config suitable for tests: no spacing, millisecond backoff.
    pub fn for_testing() -> Self {
        Self {
            api_key: "test-key".to_string(),
            retry: RetryPolicy {
                retry_budget: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
                retry_after_margin: Duration::from_millis(1),
            },
            min_spacing: Duration::ZERO,
            ..Self::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
