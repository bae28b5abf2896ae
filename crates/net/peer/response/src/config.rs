//! Configuration for peer response tracking.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Window capacity to use when the first-responder window is enabled without
/// an explicit size.
pub const DEFAULT_WINDOW_CAPACITY: usize = 1000;

/// Tolerance when checking that alpha and beta sum to one.
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

/// Which scoring policy the tracker ranks peers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Reciprocal of the weighted want-have and block latencies.
    #[default]
    LatencyWeighted,
    /// First-responder credits plus one.
    FirstResponder,
}

/// Scoring parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Scoring policy (default: latency weighted).
    pub strategy: ScoringStrategy,
    /// Weight of the last want-have latency (default: 0.1).
    pub alpha: f64,
    /// Weight of the average block latency (default: 0.9).
    pub beta: f64,
    /// Latency assumed for a signal that has no observation yet (default: 1000ms).
    pub unknown_latency_ms: u64,
    /// Floor applied to every observed latency before scoring (default: 1µs).
    pub min_latency_us: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strategy: ScoringStrategy::LatencyWeighted,
            alpha: 0.1,
            beta: 0.9,
            unknown_latency_ms: 1000,
            min_latency_us: 1,
        }
    }
}

impl ScoringConfig {
    /// Latency assumed for a signal that has no observation yet.
    pub fn unknown_latency(&self) -> Duration {
        Duration::from_millis(self.unknown_latency_ms)
    }

    /// Floor applied to observed latencies before scoring.
    pub fn min_latency(&self) -> Duration {
        Duration::from_micros(self.min_latency_us)
    }

    /// Check weights and latency bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }

        let sum = self.alpha + self.beta;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ConfigError::WeightsNotNormalized { sum });
        }
        if self.alpha >= self.beta {
            return Err(ConfigError::ProbeWeightNotBelowBlockWeight {
                alpha: self.alpha,
                beta: self.beta,
            });
        }

        if self.unknown_latency_ms == 0 {
            return Err(ConfigError::InvalidUnknownLatency);
        }
        if self.min_latency_us == 0 || self.min_latency() > self.unknown_latency() {
            return Err(ConfigError::InvalidMinLatency);
        }

        Ok(())
    }
}

/// Configuration for a session's peer response tracker.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Scoring strategy and its parameters.
    pub scoring: ScoringConfig,
    /// Maximum number of first-responder credits kept (default: 0, disabled).
    pub window_capacity: usize,
}

impl TrackerConfig {
    /// Create config with a custom scoring strategy.
    pub fn with_strategy(mut self, strategy: ScoringStrategy) -> Self {
        self.scoring.strategy = strategy;
        self
    }

    /// Create config with custom want-have and block latency weights.
    pub fn with_weights(mut self, alpha: f64, beta: f64) -> Self {
        self.scoring.alpha = alpha;
        self.scoring.beta = beta;
        self
    }

    /// Create config with a custom latency assumed for unobserved peers.
    ///
    /// The sentinel is kept in whole milliseconds: sub-millisecond precision
    /// is truncated, so anything below 1 ms becomes 0 and fails
    /// [`validate`](Self::validate).
    pub fn with_unknown_latency(mut self, latency: Duration) -> Self {
        self.scoring.unknown_latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable the first-responder window with the given capacity (0 disables it).
    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }

    /// Enable the first-responder window at [`DEFAULT_WINDOW_CAPACITY`].
    pub fn with_default_window(self) -> Self {
        self.with_window_capacity(DEFAULT_WINDOW_CAPACITY)
    }

    /// Whether first-responder credits are bounded by a window.
    pub fn window_enabled(&self) -> bool {
        self.window_capacity > 0
    }

    /// Check the scoring parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrackerConfig::default();
        assert_eq!(config.scoring.strategy, ScoringStrategy::LatencyWeighted);
        assert_eq!(config.scoring.alpha, 0.1);
        assert_eq!(config.scoring.beta, 0.9);
        assert_eq!(config.scoring.unknown_latency(), Duration::from_millis(1000));
        assert!(!config.window_enabled());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_config_builder() {
        let config = TrackerConfig::default()
            .with_weights(0.3, 0.7)
            .with_unknown_latency(Duration::from_secs(2))
            .with_default_window();

        assert_eq!(config.scoring.alpha, 0.3);
        assert_eq!(config.scoring.unknown_latency_ms, 2000);
        assert_eq!(config.window_capacity, DEFAULT_WINDOW_CAPACITY);
        assert!(config.window_enabled());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_unknown_latency_truncates_to_millis() {
        let config = TrackerConfig::default().with_unknown_latency(Duration::from_micros(1500));
        assert_eq!(config.scoring.unknown_latency(), Duration::from_millis(1));
        assert_eq!(config.validate(), Ok(()));

        let config = TrackerConfig::default().with_unknown_latency(Duration::from_micros(500));
        assert_eq!(config.scoring.unknown_latency_ms, 0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidUnknownLatency));
    }

    #[test]
    fn test_rejects_unnormalized_weights() {
        let config = TrackerConfig::default().with_weights(0.2, 0.9);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeightsNotNormalized { .. })
        ));
    }

    #[test]
    fn test_rejects_probe_weight_above_block_weight() {
        let config = TrackerConfig::default().with_weights(0.6, 0.4);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ProbeWeightNotBelowBlockWeight { .. })
        ));

        let config = TrackerConfig::default().with_weights(0.5, 0.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_weights_and_latencies() {
        let config = TrackerConfig::default().with_weights(f64::NAN, 0.9);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { name: "alpha", .. })
        ));

        let config = TrackerConfig::default().with_weights(-0.1, 1.1);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { name: "alpha", .. })
        ));

        let config = TrackerConfig::default().with_unknown_latency(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::InvalidUnknownLatency));

        let mut config = TrackerConfig::default();
        config.scoring.min_latency_us = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMinLatency));
    }

    #[test]
    fn test_weights_checked_for_every_strategy() {
        let config = TrackerConfig::default()
            .with_strategy(ScoringStrategy::FirstResponder)
            .with_weights(0.9, 0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_partial_config() {
        let config: TrackerConfig = toml::from_str(
            r#"
            window_capacity = 500

            [scoring]
            alpha = 0.3
            beta = 0.7
            "#,
        )
        .unwrap();

        assert_eq!(config.window_capacity, 500);
        assert_eq!(config.scoring.alpha, 0.3);
        assert_eq!(config.scoring.unknown_latency_ms, 1000);
        assert_eq!(config.scoring.strategy, ScoringStrategy::LatencyWeighted);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_toml_strategy_name() {
        let config: TrackerConfig = toml::from_str(
            r#"
            [scoring]
            strategy = "first_responder"
            "#,
        )
        .unwrap();
        assert_eq!(config.scoring.strategy, ScoringStrategy::FirstResponder);
    }
}
