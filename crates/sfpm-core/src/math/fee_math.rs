//! # Fee Math
//!
//! Fee growth is tracked as Q128 fees-per-unit-liquidity. All counters are
//! modular; only differences between two readings are meaningful.

use crate::constants::Q128;
use crate::errors::SfpmResult;
use crate::math::big_int::{mul_div, Rounding, U256};

/// Fee growth inside `[tick_lower, tick_upper)` for one token
pub fn fee_growth_inside(
    tick_current: i32,
    tick_lower: i32,
    tick_upper: i32,
    lower_outside: U256,
    upper_outside: U256,
    global: U256,
) -> U256 {
    let below = if tick_current >= tick_lower {
        lower_outside
    } else {
        global.wrapping_sub(lower_outside)
    };
    let above = if tick_current < tick_upper {
        upper_outside
    } else {
        global.wrapping_sub(upper_outside)
    };
    global.wrapping_sub(below).wrapping_sub(above)
}

/// Token amount earned by `liquidity` between two fee growth readings
pub fn fees_owed(growth_now: U256, growth_last: U256, liquidity: u128) -> SfpmResult<U256> {
    mul_div(
        growth_now.wrapping_sub(growth_last),
        U256::from_u128(liquidity),
        Q128,
        Rounding::Down,
    )
}

/// Fee growth increment for `fee_amount` shared by `liquidity`
pub fn growth_for_fee(fee_amount: u128, liquidity: u128) -> SfpmResult<U256> {
    mul_div(
        U256::from_u128(fee_amount),
        Q128,
        U256::from_u128(liquidity),
        Rounding::Down,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SfpmError;

    #[test]
    fn test_fee_growth_inside_current_in_range() {
        let global = U256::from_u128(1_000);
        let inside = fee_growth_inside(0, -10, 10, U256::from_u128(100), U256::from_u128(200), global);
        assert_eq!(inside, U256::from_u128(700));
    }

    #[test]
    fn test_fee_growth_inside_current_below() {
        let global = U256::from_u128(1_000);
        // below the range the inside growth is lower_outside - upper_outside
        let inside = fee_growth_inside(-20, -10, 10, U256::from_u128(900), U256::from_u128(50), global);
        assert_eq!(inside, U256::from_u128(850));
    }

    #[test]
    fn test_fee_growth_inside_wraps() {
        let inside = fee_growth_inside(0, -10, 10, U256::from_u128(5), U256::ZERO, U256::ZERO);
        assert_eq!(inside, U256::ZERO.wrapping_sub(U256::from_u128(5)));
        // difference of two wrapped readings is still exact
        let later = inside.wrapping_add(U256::from_u128(7) << 128);
        assert_eq!(fees_owed(later, inside, 3).unwrap(), U256::from_u128(21));
    }

    #[test]
    fn test_growth_for_fee() {
        let growth = growth_for_fee(500, 1_000).unwrap();
        assert_eq!(growth, Q128 >> 1);
        assert_eq!(growth_for_fee(1, 0), Err(SfpmError::DivisionByZero));
    }
}
