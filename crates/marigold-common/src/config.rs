//! Configuration types and utilities

use crate::error::{MarigoldError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;


/// Hyperparameters consumed by the kernels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub optimizer: OptimizerConfig,
    pub normalization: NormalizationConfig,
    pub dropout: DropoutConfig,
}

/// Adam update hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    /// Reserved. Accepted but not applied by the update rule.
    pub weight_decay: f32,
    /// Reserved. Accepted but not applied by the update rule.
    pub schedule_multiplier: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-6,
            weight_decay: 0.0,
            schedule_multiplier: 1.0,
        }
    }
}

impl OptimizerConfig {
    /// Whether the reserved parameters hold anything other than their inert values.
    #[must_use]
    pub fn uses_reserved_parameters(&self) -> bool {
        self.weight_decay != 0.0 || self.schedule_multiplier != 1.0
    }
}

/// Instance normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub epsilon: f32,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self { epsilon: 1e-4 }
    }
}

/// Channel dropout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropoutConfig {
    pub probability: f32,
}

impl Default for DropoutConfig {
    fn default() -> Self {
        Self { probability: 0.05 }
    }
}

impl KernelConfig {
    /// Load a configuration from a `.toml` or `.json` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&text).map_err(|e| MarigoldError::Parse {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Some("json") => serde_json::from_str(&text).map_err(|e| MarigoldError::Parse {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?,
            other => {
                return Err(MarigoldError::Config(format!(
                    "unsupported config extension {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                )));
            }
        };
        tracing::debug!(path = %path.display(), ?config, "loaded kernel config");
        Ok(config)
    }

    /// Defaults overridden by `MARIGOLD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// File (if any), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields in place from `MARIGOLD_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_value("MARIGOLD_LEARNING_RATE")? {
            self.optimizer.learning_rate = v;
        }
        if let Some(v) = env_value("MARIGOLD_BETA1")? {
            self.optimizer.beta1 = v;
        }
        if let Some(v) = env_value("MARIGOLD_BETA2")? {
            self.optimizer.beta2 = v;
        }
        if let Some(v) = env_value("MARIGOLD_ADAM_EPSILON")? {
            self.optimizer.epsilon = v;
        }
        if let Some(v) = env_value("MARIGOLD_NORM_EPSILON")? {
            self.normalization.epsilon = v;
        }
        if let Some(v) = env_value("MARIGOLD_DROPOUT_P")? {
            self.dropout.probability = v;
        }
        tracing::debug!(config = ?self, "applied environment overrides");
        Ok(())
    }

    // ── Validation ──────────────────────────────────────────────

    pub fn validate(&self) -> Result<()> {
        let opt = &self.optimizer;
        check_finite("optimizer.learning_rate", opt.learning_rate)?;
        if opt.learning_rate <= 0.0 {
            return Err(MarigoldError::Config("learning_rate must be > 0".into()));
        }
        for (name, beta) in [("beta1", opt.beta1), ("beta2", opt.beta2)] {
            check_finite(name, beta)?;
            if !(0.0..1.0).contains(&beta) {
                return Err(MarigoldError::Config(format!("{name} must be in [0, 1), got {beta}")));
            }
        }
        check_finite("optimizer.epsilon", opt.epsilon)?;
        if opt.epsilon <= 0.0 {
            return Err(MarigoldError::Config("optimizer epsilon must be > 0".into()));
        }
        check_finite("optimizer.weight_decay", opt.weight_decay)?;
        check_finite("optimizer.schedule_multiplier", opt.schedule_multiplier)?;

        check_finite("normalization.epsilon", self.normalization.epsilon)?;
        if self.normalization.epsilon < 0.0 {
            return Err(MarigoldError::Config("normalization epsilon must be >= 0".into()));
        }

        let p = self.dropout.probability;
        check_finite("dropout.probability", p)?;
        if !(0.0..1.0).contains(&p) {
            return Err(MarigoldError::Config(format!(
                "dropout probability must be in [0, 1), got {p}"
            )));
        }
        Ok(())
    }
}

fn check_finite(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() {
        return Err(MarigoldError::Config(format!("{name} must be finite, got {value}")));
    }
    Ok(())
}

fn env_value<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| MarigoldError::Parse { key: key.to_string(), reason: e.to_string() }),
        Err(_) => Ok(None),
    }
}
