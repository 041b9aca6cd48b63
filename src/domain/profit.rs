//! Profit split for an arbitrage sale.
//!
//! All money is integer minor units. Each fee component is rounded half-up on
//! its own, never on the aggregate, so the components of a breakdown always sum
//! exactly to `total_costs`.
//!
//! # Example
//!
//! ```
//! use arbfill::domain::platform::SourcePlatform;
//! use arbfill::domain::profit::{FeeSchedule, ProfitCalculator};
//!
//! let calc = ProfitCalculator::new(FeeSchedule::default());
//! let b = calc.compute(1500, 800, SourcePlatform::RapidApi).unwrap();
//! assert_eq!(b.commission, 90);
//! assert_eq!(b.processor_fee, 74);
//! assert_eq!(b.net_profit, 536);
//! ```

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::money::{apply_rate, Cents, Rate};
use super::platform::SourcePlatform;

/// Default marketplace commission (6%).
pub const DEFAULT_COMMISSION_RATE: Rate = dec!(0.06);
/// Default payment-processor percentage (2.9%).
pub const DEFAULT_PROCESSOR_RATE: Rate = dec!(0.029);
/// Default payment-processor fixed fee (30 cents).
pub const DEFAULT_PROCESSOR_FIXED_FEE: Cents = 30;

/// Fee rates for a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSchedule {
    pub commission_rate: Rate,
    pub processor_rate: Rate,
    pub processor_fixed_fee: Cents,
    /// Intermediary fee charged by the source platform, applied to buyer paid.
    /// Platforms absent from the map pay no intermediary fee.
    pub platform_rates: BTreeMap<SourcePlatform, Rate>,
}

impl FeeSchedule {
    /// Source-platform fee rate for `platform`.
    #[must_use]
    pub fn platform_rate(&self, platform: SourcePlatform) -> Rate {
        self.platform_rates
            .get(&platform)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            processor_rate: DEFAULT_PROCESSOR_RATE,
            processor_fixed_fee: DEFAULT_PROCESSOR_FIXED_FEE,
            platform_rates: BTreeMap::from([
                (SourcePlatform::Fiverr, dec!(0.05)),
                (SourcePlatform::Upwork, dec!(0.03)),
            ]),
        }
    }
}

/// Fee breakdown and margin for one sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitBreakdown {
    pub platform: SourcePlatform,
    pub buyer_paid: Cents,
    pub source_cost: Cents,
    pub commission: Cents,
    pub processor_fee: Cents,
    pub platform_fee: Cents,
    pub total_costs: Cents,
    pub gross_profit: Cents,
    pub net_profit: Cents,
    /// Display only; two decimal places.
    pub margin_percent: Decimal,
}

impl ProfitBreakdown {
    /// Sum of the individual cost components.
    #[must_use]
    pub const fn components_sum(&self) -> Cents {
        self.source_cost + self.commission + self.processor_fee + self.platform_fee
    }
}

/// Pure, stateless profit calculator with injected rates.
#[derive(Debug, Clone, Default)]
pub struct ProfitCalculator {
    fees: FeeSchedule,
}

impl ProfitCalculator {
    #[must_use]
    pub const fn new(fees: FeeSchedule) -> Self {
        Self { fees }
    }

    #[must_use]
    pub const fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Compute the breakdown for a sale.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input [`DomainError`] when either amount is negative,
    /// the source cost exceeds what the buyer paid, or the fees overflow.
    pub fn compute(
        &self,
        buyer_paid: Cents,
        source_cost: Cents,
        platform: SourcePlatform,
    ) -> Result<ProfitBreakdown, DomainError> {
        Self::validate(buyer_paid, source_cost)?;

        let too_large = || DomainError::AmountTooLarge { buyer_paid };
        let fee = |rate: Rate| apply_rate(buyer_paid, rate).ok_or_else(too_large);

        let commission = fee(self.fees.commission_rate)?;
        let processor_fee = fee(self.fees.processor_rate)?
            .checked_add(self.fees.processor_fixed_fee)
            .ok_or_else(too_large)?;
        let platform_fee = fee(self.fees.platform_rate(platform))?;

        let total_costs = [commission, processor_fee, platform_fee]
            .into_iter()
            .try_fold(source_cost, Cents::checked_add)
            .ok_or_else(too_large)?;
        let net_profit = buyer_paid.checked_sub(total_costs).ok_or_else(too_large)?;
        let margin_percent = if buyer_paid == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(net_profit) / Decimal::from(buyer_paid) * Decimal::ONE_HUNDRED)
                .round_dp(2)
        };

        Ok(ProfitBreakdown {
            platform,
            buyer_paid,
            source_cost,
            commission,
            processor_fee,
            platform_fee,
            total_costs,
            gross_profit: buyer_paid - source_cost,
            net_profit,
            margin_percent,
        })
    }

    /// Check the arguments without computing anything.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::compute`].
    pub fn validate(buyer_paid: Cents, source_cost: Cents) -> Result<(), DomainError> {
        if buyer_paid < 0 {
            return Err(DomainError::NegativeBuyerPaid { buyer_paid });
        }
        if source_cost < 0 {
            return Err(DomainError::NegativeSourceCost { source_cost });
        }
        if source_cost > buyer_paid {
            return Err(DomainError::SourceCostExceedsPaid {
                buyer_paid,
                source_cost,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc() -> ProfitCalculator {
        ProfitCalculator::new(FeeSchedule::default())
    }

    #[test]
    fn automated_example_breakdown() {
        let b = calc().compute(1500, 800, SourcePlatform::RapidApi).unwrap();
        assert_eq!(b.commission, 90);
        assert_eq!(b.processor_fee, 74);
        assert_eq!(b.platform_fee, 0);
        assert_eq!(b.total_costs, 964);
        assert_eq!(b.gross_profit, 700);
        assert_eq!(b.net_profit, 536);
        assert_eq!(b.margin_percent, dec!(35.73));
    }

    #[test]
    fn manual_example_breakdown() {
        let b = calc().compute(5000, 2500, SourcePlatform::Fiverr).unwrap();
        assert_eq!(b.commission, 300);
        assert_eq!(b.processor_fee, 175);
        assert_eq!(b.platform_fee, 250);
        assert_eq!(b.total_costs, 3225);
        assert_eq!(b.net_profit, 1775);
        assert_eq!(b.margin_percent, dec!(35.50));
    }

    #[test]
    fn components_always_sum_to_total() {
        let calc = calc();
        for buyer_paid in (0..=10_000).step_by(37) {
            for source_cost in [0, buyer_paid / 3, buyer_paid / 2, buyer_paid] {
                for platform in SourcePlatform::ALL {
                    let b = calc.compute(buyer_paid, source_cost, platform).unwrap();
                    assert_eq!(b.components_sum(), b.total_costs);
                    assert_eq!(b.net_profit, b.buyer_paid - b.total_costs);
                    assert_eq!(b.gross_profit, b.buyer_paid - b.source_cost);
                }
            }
        }
    }

    #[test]
    fn overflowing_amounts_are_invalid_input() {
        let err = calc()
            .compute(Cents::MAX, Cents::MAX, SourcePlatform::RapidApi)
            .unwrap_err();
        assert_eq!(err, DomainError::AmountTooLarge { buyer_paid: Cents::MAX });
        assert!(err.is_invalid_input());

        let b = calc().compute(Cents::MAX, 0, SourcePlatform::Fiverr).unwrap();
        assert_eq!(b.components_sum(), b.total_costs);
    }

    #[test]
    fn zero_buyer_paid_has_zero_margin() {
        let b = calc().compute(0, 0, SourcePlatform::GitHub).unwrap();
        assert_eq!(b.margin_percent, Decimal::ZERO);
        assert_eq!(b.processor_fee, DEFAULT_PROCESSOR_FIXED_FEE);
    }

    #[test]
    fn rejects_invalid_input() {
        let calc = calc();
        assert!(calc
            .compute(-1, 0, SourcePlatform::Fiverr)
            .unwrap_err()
            .is_invalid_input());
        assert!(calc
            .compute(100, -5, SourcePlatform::Fiverr)
            .unwrap_err()
            .is_invalid_input());
        assert_eq!(
            calc.compute(100, 101, SourcePlatform::Fiverr).unwrap_err(),
            DomainError::SourceCostExceedsPaid {
                buyer_paid: 100,
                source_cost: 101
            }
        );
    }

    #[test]
    fn injected_rates_are_used() {
        let fees = FeeSchedule {
            commission_rate: dec!(0.10),
            processor_rate: Decimal::ZERO,
            processor_fixed_fee: 0,
            platform_rates: BTreeMap::new(),
        };
        let b = ProfitCalculator::new(fees)
            .compute(1000, 500, SourcePlatform::Fiverr)
            .unwrap();
        assert_eq!(b.commission, 100);
        assert_eq!(b.processor_fee, 0);
        assert_eq!(b.platform_fee, 0);
        assert_eq!(b.net_profit, 400);
    }
}
