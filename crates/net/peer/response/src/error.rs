//! Configuration errors.

/// Rejected tracker configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} weight must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("alpha + beta must equal 1, got {sum}")]
    WeightsNotNormalized { sum: f64 },

    #[error("want-have weight {alpha} must be below block weight {beta}")]
    ProbeWeightNotBelowBlockWeight { alpha: f64, beta: f64 },

    #[error("unknown latency sentinel must be positive")]
    InvalidUnknownLatency,

    #[error("minimum latency must be positive and not exceed the unknown latency sentinel")]
    InvalidMinLatency,
}
