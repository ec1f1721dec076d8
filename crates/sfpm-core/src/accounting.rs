//! # Pool Accounting
//!
//! Pool-wide token totals fed by every committed mint, burn and fee
//! realization. For each token the aggregator keeps
//!
//! - `total_balance`: deposit accounting, moved only by the vault hooks
//! - `in_amm`: notional currently deployed as option liquidity
//! - `total_collected`: cumulative realized fees
//! - `balance`: tokens the pool controls, `total_balance - in_amm + total_collected`

use serde::{Deserialize, Serialize};

use crate::constants::BPS_DENOMINATOR;
use crate::errors::{SfpmError, SfpmResult};
use crate::math::safe_math::u128_to_i128;
use crate::types::{Leg, SignedPair, TokenSide};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccounting {
    pub balance: i128,
    pub total_balance: u128,
    pub in_amm: i128,
    pub total_collected: u128,
}

impl TokenAccounting {
    /// Share of deposits deployed in the AMM, in basis points, rounded down
    pub fn utilization(&self) -> u128 {
        if self.in_amm <= 0 || self.total_balance == 0 {
            return 0;
        }
        (self.in_amm as u128).saturating_mul(BPS_DENOMINATOR) / self.total_balance
    }

    /// `balance == total_balance - in_amm + total_collected`
    pub fn is_consistent(&self) -> bool {
        let (Ok(total), Ok(collected)) = (
            i128::try_from(self.total_balance),
            i128::try_from(self.total_collected),
        ) else {
            return false;
        };
        total
            .checked_sub(self.in_amm)
            .and_then(|v| v.checked_add(collected))
            == Some(self.balance)
    }

    fn shift_to_amm(&mut self, amount: i128) -> SfpmResult<()> {
        self.in_amm = self.in_amm.checked_add(amount).ok_or(SfpmError::MathOverflow)?;
        self.balance = self.balance.checked_sub(amount).ok_or(SfpmError::MathOverflow)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAccounting {
    tokens: [TokenAccounting; 2],
}

impl PoolAccounting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self, side: TokenSide) -> &TokenAccounting {
        &self.tokens[side.index()]
    }

    pub fn utilization(&self, side: TokenSide) -> u128 {
        self.token(side).utilization()
    }

    pub fn is_consistent(&self) -> bool {
        self.tokens.iter().all(TokenAccounting::is_consistent)
    }

    /// Vault deposit hook
    pub fn deposit(&mut self, side: TokenSide, amount: u128) -> SfpmResult<()> {
        let signed = u128_to_i128(amount)?;
        let token = &mut self.tokens[side.index()];
        token.total_balance = token
            .total_balance
            .checked_add(amount)
            .ok_or(SfpmError::MathOverflow)?;
        token.balance = token.balance.checked_add(signed).ok_or(SfpmError::MathOverflow)?;
        Ok(())
    }

    /// Vault withdrawal hook; cannot take out more than is idle
    pub fn withdraw(&mut self, side: TokenSide, amount: u128) -> SfpmResult<()> {
        let signed = u128_to_i128(amount)?;
        let token = &mut self.tokens[side.index()];
        if token.balance < signed || token.total_balance < amount {
            return Err(SfpmError::BalanceExceeded {
                held: token.balance.max(0) as u128,
                requested: amount,
            });
        }
        token.total_balance -= amount;
        token.balance -= signed;
        Ok(())
    }

    /// Account for one leg's notional moving into or out of the AMM.
    /// Only the leg's settlement token (`token_type`) is tracked.
    pub fn record_leg(&mut self, leg: &Leg, notional: (u128, u128), is_burn: bool) -> SfpmResult<()> {
        let amount = match leg.token_type {
            TokenSide::Token0 => notional.0,
            TokenSide::Token1 => notional.1,
        };
        let amount = u128_to_i128(amount)?;
        // short mint and long burn put liquidity into the AMM
        let delta = if leg.is_long == is_burn { amount } else { -amount };
        self.tokens[leg.token_type.index()].shift_to_amm(delta)
    }

    /// Account for realized fees
    pub fn record_fees(&mut self, fees: SignedPair) -> SfpmResult<()> {
        for (token, amount) in self.tokens.iter_mut().zip([fees.token0(), fees.token1()]) {
            if amount < 0 {
                return Err(SfpmError::MathUnderflow);
            }
            token.total_collected = token
                .total_collected
                .checked_add(amount as u128)
                .ok_or(SfpmError::MathOverflow)?;
            token.balance = token.balance.checked_add(amount).ok_or(SfpmError::MathOverflow)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_put() -> Leg {
        Leg::new(0, TokenSide::Token1, false, -100, 2)
    }

    #[test]
    fn test_short_leg_moves_notional_into_amm() {
        let mut acc = PoolAccounting::new();
        acc.deposit(TokenSide::Token1, 10_000).unwrap();
        acc.record_leg(&short_put(), (0, 2_500), false).unwrap();

        let t1 = acc.token(TokenSide::Token1);
        assert_eq!(t1.in_amm, 2_500);
        assert_eq!(t1.balance, 7_500);
        assert_eq!(acc.utilization(TokenSide::Token1), 2_500);
        assert_eq!(acc.token(TokenSide::Token0).in_amm, 0);
        assert!(acc.is_consistent());

        acc.record_leg(&short_put(), (0, 2_500), true).unwrap();
        assert_eq!(acc.token(TokenSide::Token1).in_amm, 0);
        assert!(acc.is_consistent());
    }

    #[test]
    fn test_long_leg_pulls_notional_out() {
        let mut acc = PoolAccounting::new();
        acc.record_leg(&short_put().flipped(), (0, 100), false).unwrap();
        assert_eq!(acc.token(TokenSide::Token1).in_amm, -100);
        assert_eq!(acc.utilization(TokenSide::Token1), 0);
        assert!(acc.is_consistent());
    }

    #[test]
    fn test_fees_increase_balance_and_collected() {
        let mut acc = PoolAccounting::new();
        acc.record_fees(SignedPair::pack(7, 3)).unwrap();
        assert_eq!(acc.token(TokenSide::Token0).total_collected, 7);
        assert_eq!(acc.token(TokenSide::Token1).balance, 3);
        assert!(acc.is_consistent());
        assert_eq!(acc.record_fees(SignedPair::pack(-1, 0)), Err(SfpmError::MathUnderflow));
    }

    #[test]
    fn test_withdraw_limited_to_idle_balance() {
        let mut acc = PoolAccounting::new();
        acc.deposit(TokenSide::Token0, 1_000).unwrap();
        acc.record_leg(&Leg::new(0, TokenSide::Token0, false, 100, 2), (900, 0), false)
            .unwrap();
        assert_eq!(
            acc.withdraw(TokenSide::Token0, 200),
            Err(SfpmError::BalanceExceeded { held: 100, requested: 200 })
        );
        acc.withdraw(TokenSide::Token0, 100).unwrap();
        assert!(acc.is_consistent());
    }
}
