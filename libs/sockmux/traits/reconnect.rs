use crate::traits::close_code::CloseCode;
use crate::traits::error::{Result, SockmuxError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Upper bound of the random jitter, as a fraction of the computed delay
pub const JITTER_FACTOR: f64 = 0.3;

/// Automatic reconnection policy for one connection
///
/// Delays grow exponentially: `initial_delay_ms * backoff_multiplier^(attempt - 1)`,
/// capped at `max_delay_ms`. With `jitter` enabled a uniformly random amount in
/// `[0, 0.3 * delay]` is added (the result is still capped).
///
/// Field names follow the wire format (`maxRetries`, `initialDelayMs`, ...);
/// snake_case aliases are accepted so the same type loads from YAML config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectPolicy {
    /// Maximum number of consecutive reconnection attempts (None = unlimited)
    #[serde(alias = "max_retries")]
    pub max_retries: Option<u32>,
    /// Delay before the first reconnection attempt
    #[serde(alias = "initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Cap for any single delay
    #[serde(alias = "max_delay_ms")]
    pub max_delay_ms: u64,
    /// Growth factor between attempts (>= 1)
    #[serde(alias = "backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Add random jitter to each delay
    pub jitter: bool,
    /// Close codes that must never trigger a reconnection
    #[serde(alias = "skip_codes")]
    pub skip_codes: HashSet<CloseCode>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: None,
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
            jitter: true,
            skip_codes: [CloseCode::Normal, CloseCode::PolicyViolation]
                .into_iter()
                .collect(),
        }
    }
}

/// Outcome of consulting the policy after an unintentional close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// The close code is in the skip set: stay closed, say nothing
    Skip,
    /// Retry budget spent: report failure and stay closed
    Exhausted,
    /// Reconnect after `delay_ms`; `attempt` is the new retry count
    Retry { attempt: u32, delay_ms: u64 },
}

impl ReconnectPolicy {
    /// Create a policy with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of reconnection attempts
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Retry forever
    pub fn unlimited(mut self) -> Self {
        self.max_retries = None;
        self
    }

    /// Set the initial delay
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the maximum delay
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the backoff multiplier
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Replace the skip set
    ///
    /// Codes are stored normalized, so `Custom(1000)` is kept as `Normal`.
    pub fn skip_codes(mut self, codes: impl IntoIterator<Item = CloseCode>) -> Self {
        self.skip_codes = codes.into_iter().map(CloseCode::normalized).collect();
        self
    }

    /// Check the policy values are usable
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(SockmuxError::Configuration(format!(
                "backoffMultiplier must be a finite number >= 1 (got {})",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(SockmuxError::Configuration(format!(
                "initialDelayMs ({}) exceeds maxDelayMs ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    /// Whether a close with this code must not be followed by a reconnect
    ///
    /// Compares numeric values, so a `Custom` variant inserted directly into
    /// `skip_codes` still matches its standard counterpart.
    pub fn should_skip(&self, code: CloseCode) -> bool {
        let code = code.as_u16();
        self.skip_codes.iter().any(|skip| skip.as_u16() == code)
    }

    /// Whether `retry_count` consecutive attempts already spent the budget
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        self.max_retries.map_or(false, |max| retry_count >= max)
    }

    /// Capped delay for an attempt (1-indexed), before jitter
    pub fn base_delay_ms(&self, attempt: u32) -> f64 {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        delay.min(self.max_delay_ms as f64)
    }

    /// Delay for an attempt (1-indexed), with jitter applied when enabled
    pub fn delay_for_attempt<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> u64 {
        let base = self.base_delay_ms(attempt);
        let delay = if self.jitter && base > 0.0 {
            base + rng.gen_range(0.0..=JITTER_FACTOR * base)
        } else {
            base
        };
        (delay.round() as u64).min(self.max_delay_ms)
    }

    /// Decide what follows an unintentional close
    pub fn decide(&self, retry_count: u32, code: CloseCode) -> ReconnectDecision {
        self.decide_with(retry_count, code, &mut rand::thread_rng())
    }

    /// [`decide`](Self::decide) with an explicit random source
    ///
    /// # Arguments
    /// * `retry_count` - Consecutive attempts already made since the last successful open
    /// * `code` - Close code of the unintentional close being handled
    /// * `rng` - Source for the jitter (seed it to make delays reproducible)
    ///
    /// # Returns
    /// [`ReconnectDecision::Skip`] when `code` is in the skip set (checked
    /// first), [`ReconnectDecision::Exhausted`] when `retry_count` reached
    /// `max_retries`, otherwise a retry numbered `retry_count + 1` with its delay
    pub fn decide_with<R: Rng + ?Sized>(
        &self,
        retry_count: u32,
        code: CloseCode,
        rng: &mut R,
    ) -> ReconnectDecision {
        if self.should_skip(code) {
            return ReconnectDecision::Skip;
        }
        if self.is_exhausted(retry_count) {
            return ReconnectDecision::Exhausted;
        }
        let attempt = retry_count.saturating_add(1);
        ReconnectDecision::Retry {
            attempt,
            delay_ms: self.delay_for_attempt(attempt, rng),
        }
    }
}
