use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::application::market_research::GatewayConfig;
use crate::domain::error::DomainError;
use crate::domain::values::thresholds::{ScoringWeights, TradingThresholds};
use crate::infrastructure::feeds::ebay::FINDING_API_URL;
use crate::infrastructure::resilience::circuit_breaker::BreakerConfig;
use crate::infrastructure::resilience::retry::RetryPolicy;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// eBay Finding API app id (EBAY_APP_ID). Empty means live fetches fail.
    pub ebay_app_id: String,
    pub ebay_base_url: String,
    pub log_level: String,
    pub breaker_failure_threshold: u32,
    pub breaker_recovery_timeout_secs: u64,
    /// Explicit half-open lease. Unset derives it from the retry budget.
    pub breaker_probe_lease_secs: Option<u64>,
    pub cache_ttl_secs: u64,
    pub fetch_max_retries: u32,
    pub fetch_backoff_base_ms: u64,
    pub fetch_backoff_max_ms: u64,
    pub fetch_timeout_secs: u64,
    pub max_result_limit: u32,
    pub min_sample_count: usize,
    pub liquidity_window_days: u32,
    pub thresholds: TradingThresholds,
    pub weights: ScoringWeights,
}

/// Slack added on top of the slowest possible guarded call when the
/// half-open lease is derived.
const LEASE_MARGIN: Duration = Duration::from_secs(5);

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ebay_app_id: String::new(),
            ebay_base_url: FINDING_API_URL.to_string(),
            log_level: "info".to_string(),
            breaker_failure_threshold: 5,
            breaker_recovery_timeout_secs: 60,
            breaker_probe_lease_secs: None,
            cache_ttl_secs: 900,
            fetch_max_retries: 3,
            fetch_backoff_base_ms: 500,
            fetch_backoff_max_ms: 8000,
            fetch_timeout_secs: 30,
            max_result_limit: 100,
            min_sample_count: 5,
            liquidity_window_days: 30,
            thresholds: TradingThresholds::default(),
            weights: ScoringWeights::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, DomainError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup. Unset keys take defaults; set but
    /// unparseable keys are an error, never silently defaulted.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DomainError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = AppConfig::default();
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let thresholds = TradingThresholds::new(
            parse(&var, "BUY_THRESHOLD", d.thresholds.buy_threshold())?,
            parse(&var, "HOLD_THRESHOLD", d.thresholds.hold_threshold())?,
            parse(&var, "ENTRY_DISCOUNT", dec!(0.95))?,
            parse(&var, "TARGET_MULTIPLIER", dec!(1.25))?,
            parse::<Decimal, _>(&var, "STOP_LOSS_DISCOUNT", dec!(0.85))?,
        )?;

        let dw = &d.weights;
        let weights = ScoringWeights {
            performance: parse(&var, "SCORE_WEIGHT_PERFORMANCE", dw.performance)?,
            liquidity: parse(&var, "SCORE_WEIGHT_LIQUIDITY", dw.liquidity)?,
            price_trend: parse(&var, "SCORE_WEIGHT_PRICE_TREND", dw.price_trend)?,
            trend_adjustment: parse(&var, "TREND_ADJUSTMENT", dw.trend_adjustment)?,
            risk_penalty: parse(&var, "RISK_PENALTY", dw.risk_penalty)?,
            depth_saturation: parse(&var, "DEPTH_SATURATION", dw.depth_saturation)?,
            full_confidence_samples: parse(&var, "FULL_CONFIDENCE_SAMPLES", dw.full_confidence_samples)?,
            confidence_margin: parse(&var, "CONFIDENCE_MARGIN", dw.confidence_margin)?,
            confidence_floor: parse(&var, "CONFIDENCE_FLOOR", dw.confidence_floor)?,
            insufficient_confidence_ceiling: parse(
                &var,
                "INSUFFICIENT_CONFIDENCE_CEILING",
                dw.insufficient_confidence_ceiling,
            )?,
        };

        let config = Self {
            ebay_app_id: var("EBAY_APP_ID").unwrap_or(d.ebay_app_id),
            ebay_base_url: var("EBAY_BASE_URL").unwrap_or(d.ebay_base_url),
            log_level: var("LOG_LEVEL").unwrap_or(d.log_level),
            breaker_failure_threshold: parse(&var, "BREAKER_FAILURE_THRESHOLD", d.breaker_failure_threshold)?,
            breaker_recovery_timeout_secs: parse(&var, "BREAKER_RECOVERY_TIMEOUT_SECS", d.breaker_recovery_timeout_secs)?,
            breaker_probe_lease_secs: parse_opt(&var, "BREAKER_PROBE_LEASE_SECS")?,
            cache_ttl_secs: parse(&var, "CACHE_TTL_SECS", d.cache_ttl_secs)?,
            fetch_max_retries: parse(&var, "FETCH_MAX_RETRIES", d.fetch_max_retries)?,
            fetch_backoff_base_ms: parse(&var, "FETCH_BACKOFF_BASE_MS", d.fetch_backoff_base_ms)?,
            fetch_backoff_max_ms: parse(&var, "FETCH_BACKOFF_MAX_MS", d.fetch_backoff_max_ms)?,
            fetch_timeout_secs: parse(&var, "FETCH_TIMEOUT_SECS", d.fetch_timeout_secs)?,
            max_result_limit: parse(&var, "MAX_RESULT_LIMIT", d.max_result_limit)?,
            min_sample_count: parse(&var, "MIN_SAMPLE_COUNT", d.min_sample_count)?,
            liquidity_window_days: parse(&var, "LIQUIDITY_WINDOW_DAYS", d.liquidity_window_days)?,
            thresholds,
            weights,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let positive = [
            ("BREAKER_FAILURE_THRESHOLD", u64::from(self.breaker_failure_threshold)),
            ("BREAKER_RECOVERY_TIMEOUT_SECS", self.breaker_recovery_timeout_secs),
            ("FETCH_TIMEOUT_SECS", self.fetch_timeout_secs),
            ("MAX_RESULT_LIMIT", u64::from(self.max_result_limit)),
            ("LIQUIDITY_WINDOW_DAYS", u64::from(self.liquidity_window_days)),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(DomainError::InvalidConfiguration(format!("{name} must be positive")));
        }
        if self.fetch_backoff_base_ms > self.fetch_backoff_max_ms {
            return Err(DomainError::InvalidConfiguration(
                "FETCH_BACKOFF_BASE_MS must not exceed FETCH_BACKOFF_MAX_MS".into(),
            ));
        }
        if let Some(secs) = self.breaker_probe_lease_secs {
            let minimum = self.min_half_open_lease();
            if Duration::from_secs(secs) < minimum {
                return Err(DomainError::InvalidConfiguration(format!(
                    "BREAKER_PROBE_LEASE_SECS={secs} is shorter than the slowest fetch with retries ({:.1}s)",
                    minimum.as_secs_f64()
                )));
            }
        }
        self.weights.validate()
    }

    /// Longest a single guarded fetch can run: every attempt hitting the
    /// fetch timeout plus all backoff in between.
    pub fn min_half_open_lease(&self) -> Duration {
        self.retry_policy()
            .worst_case(Duration::from_secs(self.fetch_timeout_secs))
    }

    pub fn half_open_lease(&self) -> Duration {
        match self.breaker_probe_lease_secs {
            Some(secs) => Duration::from_secs(secs),
            None => self.min_half_open_lease().saturating_add(LEASE_MARGIN),
        }
    }

    pub fn breaker_config(&self) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.breaker_failure_threshold,
            recovery_timeout: Duration::from_secs(self.breaker_recovery_timeout_secs),
            probe_lease: self.half_open_lease(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.fetch_max_retries,
            base_delay: Duration::from_millis(self.fetch_backoff_base_ms),
            max_delay: Duration::from_millis(self.fetch_backoff_max_ms),
        }
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_result_limit: self.max_result_limit,
            min_sample_count: self.min_sample_count,
            liquidity_window_days: self.liquidity_window_days,
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn parse<T, F>(var: &F, name: &str, default: T) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(var, name)?.unwrap_or(default))
}

fn parse_opt<T, F>(var: &F, name: &str) -> Result<Option<T>, DomainError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| DomainError::InvalidConfiguration(format!("{name}={raw}: {e}")))
        })
        .transpose()
}
