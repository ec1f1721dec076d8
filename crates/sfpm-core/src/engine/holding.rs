//! What an owner's balance of one TokenId stands for.
//!
//! Mints add the freshly computed chunk of every leg. Burns and transfers
//! take a pro-rata share rounded down, and the whole balance always takes
//! whatever is left, so closing a balance releases exactly what opened it.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_LEGS;
use crate::errors::{SfpmError, SfpmResult};
use crate::math::big_int::{mul_div_u128, Rounding};

/// Liquidity and notional behind one leg
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegShare {
    pub liquidity: u128,
    pub notional: (u128, u128),
}

impl LegShare {
    fn checked_add(self, other: LegShare) -> Option<LegShare> {
        Some(LegShare {
            liquidity: self.liquidity.checked_add(other.liquidity)?,
            notional: (
                self.notional.0.checked_add(other.notional.0)?,
                self.notional.1.checked_add(other.notional.1)?,
            ),
        })
    }

    fn checked_sub(self, other: LegShare) -> Option<LegShare> {
        Some(LegShare {
            liquidity: self.liquidity.checked_sub(other.liquidity)?,
            notional: (
                self.notional.0.checked_sub(other.notional.0)?,
                self.notional.1.checked_sub(other.notional.1)?,
            ),
        })
    }
}

/// An owner's balance of one TokenId and the per-leg amounts behind it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub size: u128,
    pub legs: [LegShare; MAX_LEGS],
}

impl Holding {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Part of leg `index` that `size` units of this holding stand for
    pub fn share(&self, index: usize, size: u128) -> SfpmResult<LegShare> {
        if self.size == 0 || size == 0 {
            return Err(SfpmError::OptionsBalanceZero);
        }
        if size > self.size {
            return Err(SfpmError::BalanceExceeded {
                held: self.size,
                requested: size,
            });
        }
        let whole = *self.legs.get(index).ok_or(SfpmError::TooManyLegs(index + 1))?;
        if size == self.size {
            return Ok(whole);
        }
        let part = |amount: u128| mul_div_u128(amount, size, self.size, Rounding::Down);
        Ok(LegShare {
            liquidity: part(whole.liquidity)?,
            notional: (part(whole.notional.0)?, part(whole.notional.1)?),
        })
    }

    pub(crate) fn add(&mut self, size: u128, shares: &[LegShare]) -> SfpmResult<()> {
        if shares.len() > MAX_LEGS {
            return Err(SfpmError::TooManyLegs(shares.len()));
        }
        self.size = self.size.checked_add(size).ok_or(SfpmError::MathOverflow)?;
        for (leg, share) in self.legs.iter_mut().zip(shares) {
            *leg = leg.checked_add(*share).ok_or(SfpmError::MathOverflow)?;
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, size: u128, shares: &[LegShare]) -> SfpmResult<()> {
        if shares.len() > MAX_LEGS {
            return Err(SfpmError::TooManyLegs(shares.len()));
        }
        self.size = self.size.checked_sub(size).ok_or(SfpmError::BalanceExceeded {
            held: self.size,
            requested: size,
        })?;
        for (leg, share) in self.legs.iter_mut().zip(shares) {
            *leg = leg.checked_sub(*share).ok_or(SfpmError::MathUnderflow)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn leg(liquidity: u128, n0: u128, n1: u128) -> LegShare {
        LegShare {
            liquidity,
            notional: (n0, n1),
        }
    }

    #[test]
    fn test_whole_balance_takes_everything() {
        let mut holding = Holding::default();
        holding.add(3, &[leg(1_000, 30, 7)]).unwrap();
        holding.add(4, &[leg(1_334, 40, 9)]).unwrap();

        assert_eq!(holding.share(0, 7).unwrap(), leg(2_334, 70, 16));
        // 2334 * 2 / 7 rounds down
        assert_eq!(holding.share(0, 2).unwrap(), leg(666, 20, 4));
    }

    #[test]
    fn test_share_rejects_empty_and_oversized() {
        let mut holding = Holding::default();
        assert_eq!(holding.share(0, 1), Err(SfpmError::OptionsBalanceZero));
        holding.add(5, &[leg(10, 1, 1)]).unwrap();
        assert_eq!(holding.share(0, 0), Err(SfpmError::OptionsBalanceZero));
        assert_eq!(
            holding.share(0, 6),
            Err(SfpmError::BalanceExceeded { held: 5, requested: 6 })
        );
    }

    #[test]
    fn test_remove_reports_shortfall() {
        let mut holding = Holding::default();
        holding.add(5, &[leg(10, 1, 1)]).unwrap();
        assert_eq!(
            holding.remove(6, &[leg(10, 1, 1)]),
            Err(SfpmError::BalanceExceeded { held: 5, requested: 6 })
        );
        holding.remove(5, &[leg(10, 1, 1)]).unwrap();
        assert!(holding.is_empty());
        assert_eq!(holding, Holding::default());
    }

    proptest! {
        /// Any sequence of partial closes ending with the full balance
        /// releases exactly what was added
        #[test]
        fn prop_partial_closes_sum_to_whole(
            liquidity in 1u128..1_000_000_000_000,
            size in 2u128..1_000_000,
            cuts in prop::collection::vec(1u128..1_000, 0..8),
        ) {
            let mut holding = Holding::default();
            holding.add(size, &[leg(liquidity, size, liquidity / 3)]).unwrap();

            let mut released = LegShare::default();
            for cut in cuts {
                if cut >= holding.size {
                    break;
                }
                let share = holding.share(0, cut).unwrap();
                holding.remove(cut, &[share]).unwrap();
                released = released.checked_add(share).unwrap();
            }
            let rest = holding.share(0, holding.size).unwrap();
            holding.remove(holding.size, &[rest]).unwrap();
            released = released.checked_add(rest).unwrap();

            prop_assert_eq!(released, leg(liquidity, size, liquidity / 3));
            prop_assert_eq!(holding, Holding::default());
        }
    }
}
