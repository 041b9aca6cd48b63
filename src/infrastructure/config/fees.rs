//! Fee rate configuration.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::profit::{
    DEFAULT_COMMISSION_RATE, DEFAULT_PROCESSOR_FIXED_FEE, DEFAULT_PROCESSOR_RATE,
};
use crate::domain::{Cents, FeeSchedule, SourcePlatform};
use crate::error::ConfigError;

/// `[fees]` section. Rates are fractions (`0.06` = 6%).
#[derive(Debug, Clone, Deserialize)]
pub struct FeesConfig {
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,
    #[serde(default = "default_processor_rate")]
    pub processor_rate: Decimal,
    /// Fixed processor fee in cents.
    #[serde(default = "default_processor_fixed_fee")]
    pub processor_fixed_fee: Cents,
    /// Intermediary fee per source platform. Missing platforms pay nothing.
    #[serde(default = "default_platform_rates")]
    pub platform_rates: BTreeMap<SourcePlatform, Decimal>,
}

const fn default_commission_rate() -> Decimal {
    DEFAULT_COMMISSION_RATE
}

const fn default_processor_rate() -> Decimal {
    DEFAULT_PROCESSOR_RATE
}

const fn default_processor_fixed_fee() -> Cents {
    DEFAULT_PROCESSOR_FIXED_FEE
}

fn default_platform_rates() -> BTreeMap<SourcePlatform, Decimal> {
    FeeSchedule::default().platform_rates
}

impl Default for FeesConfig {
    fn default() -> Self {
        Self {
            commission_rate: default_commission_rate(),
            processor_rate: default_processor_rate(),
            processor_fixed_fee: default_processor_fixed_fee(),
            platform_rates: default_platform_rates(),
        }
    }
}

impl FeesConfig {
    /// The schedule handed to the profit calculator.
    #[must_use]
    pub fn schedule(&self) -> FeeSchedule {
        FeeSchedule {
            commission_rate: self.commission_rate,
            processor_rate: self.processor_rate,
            processor_fixed_fee: self.processor_fixed_fee,
            platform_rates: self.platform_rates.clone(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        check_rate("commission_rate", self.commission_rate)?;
        check_rate("processor_rate", self.processor_rate)?;
        for rate in self.platform_rates.values() {
            check_rate("platform_rates", *rate)?;
        }
        if self.processor_fixed_fee < 0 {
            return Err(ConfigError::InvalidValue {
                field: "processor_fixed_fee",
                reason: "must be 0 or greater".to_string(),
            });
        }
        Ok(())
    }
}

fn check_rate(field: &'static str, rate: Decimal) -> Result<(), ConfigError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("must be between 0 and 1, got {rate}"),
        });
    }
    Ok(())
}
