use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{FEE_PIPS_DENOMINATOR, MAX_TICK_SPACING, MAX_WIDTH};
use crate::errors::{SfpmError, SfpmResult};

/// Position manager configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ManagerConfig {
    /// Largest leg width accepted by validation (at most 4095)
    #[serde(default = "default_max_leg_width")]
    pub max_leg_width: u16,

    /// Fee tiers pools may be created with
    #[serde(default = "default_fee_tiers")]
    pub fee_tiers: Vec<FeeTierConfig>,
}

/// Pool fee and the tick spacing that goes with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeeTierConfig {
    /// Swap fee in pips (1,000,000 = 100%)
    pub fee_pips: u32,

    /// Tick spacing for pools in this tier
    pub tick_spacing: i32,
}

fn default_max_leg_width() -> u16 {
    MAX_WIDTH
}

fn default_fee_tiers() -> Vec<FeeTierConfig> {
    [(100, 1), (500, 10), (3_000, 60), (10_000, 200)]
        .into_iter()
        .map(|(fee_pips, tick_spacing)| FeeTierConfig {
            fee_pips,
            tick_spacing,
        })
        .collect()
}

impl ManagerConfig {
    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> SfpmResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SfpmError::invalid_config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> SfpmResult<Self> {
        let config: ManagerConfig = toml::from_str(content)
            .map_err(|e| SfpmError::invalid_config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> SfpmResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SfpmError::invalid_config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path.as_ref(), content).map_err(|e| {
            SfpmError::invalid_config(format!(
                "Failed to write config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> SfpmResult<()> {
        if self.max_leg_width == 0 || self.max_leg_width > MAX_WIDTH {
            return Err(SfpmError::invalid_parameter(
                "max_leg_width",
                &self.max_leg_width.to_string(),
                &format!("between 1 and {}", MAX_WIDTH),
            ));
        }

        if self.fee_tiers.is_empty() {
            return Err(SfpmError::invalid_parameter("fee_tiers", "empty", "at least one tier"));
        }

        for (i, tier) in self.fee_tiers.iter().enumerate() {
            tier.validate()?;
            if self.fee_tiers[..i].iter().any(|t| t.fee_pips == tier.fee_pips) {
                return Err(SfpmError::invalid_parameter(
                    "fee_tiers.fee_pips",
                    &tier.fee_pips.to_string(),
                    "unique per tier",
                ));
            }
        }

        Ok(())
    }

    /// Tick spacing configured for a fee tier
    pub fn tick_spacing_for_fee(&self, fee_pips: u32) -> SfpmResult<i32> {
        self.fee_tiers
            .iter()
            .find(|t| t.fee_pips == fee_pips)
            .map(|t| t.tick_spacing)
            .ok_or_else(|| {
                SfpmError::invalid_parameter("fee_pips", &fee_pips.to_string(), "a configured fee tier")
            })
    }
}

impl FeeTierConfig {
    fn validate(&self) -> SfpmResult<()> {
        if self.fee_pips >= FEE_PIPS_DENOMINATOR {
            return Err(SfpmError::invalid_parameter(
                "fee_pips",
                &self.fee_pips.to_string(),
                "below 1000000 (100%)",
            ));
        }

        validate_tick_spacing(self.tick_spacing)
    }
}

/// Tick spacing must be positive and at most half the tick domain
pub fn validate_tick_spacing(tick_spacing: i32) -> SfpmResult<()> {
    if tick_spacing <= 0 || tick_spacing > MAX_TICK_SPACING {
        return Err(SfpmError::invalid_parameter(
            "tick_spacing",
            &tick_spacing.to_string(),
            &format!("between 1 and {}", MAX_TICK_SPACING),
        ));
    }
    Ok(())
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            max_leg_width: default_max_leg_width(),
            fee_tiers: default_fee_tiers(),
        }
    }
}
