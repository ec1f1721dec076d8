//! # Safe Math Operations
//!
//! Overflow-checked arithmetic and narrowing casts.

use crate::errors::{SfpmError, SfpmResult};
use crate::math::big_int::U256;

/// Macro to generate safe arithmetic functions
macro_rules! safe_arith {
    // Binary operations with checked methods
    ($fn_name:ident, $type:ty, $checked_method:ident, $error:expr) => {
        pub fn $fn_name(a: $type, b: $type) -> SfpmResult<$type> {
            a.$checked_method(b).ok_or($error)
        }
    };

    // Division operations with zero check
    (div, $fn_name:ident, $type:ty) => {
        pub fn $fn_name(a: $type, b: $type) -> SfpmResult<$type> {
            if b == 0 {
                return Err(SfpmError::DivisionByZero);
            }
            a.checked_div(b).ok_or(SfpmError::MathOverflow)
        }
    };
}

safe_arith!(safe_add_u128, u128, checked_add, SfpmError::MathOverflow);
safe_arith!(safe_sub_u128, u128, checked_sub, SfpmError::MathUnderflow);
safe_arith!(safe_mul_u128, u128, checked_mul, SfpmError::MathOverflow);
safe_arith!(div, safe_div_u128, u128);

safe_arith!(safe_add_i128, i128, checked_add, SfpmError::MathOverflow);
safe_arith!(safe_sub_i128, i128, checked_sub, SfpmError::MathUnderflow);
safe_arith!(safe_mul_i128, i128, checked_mul, SfpmError::MathOverflow);
safe_arith!(div, safe_div_i128, i128);

/// Apply a signed liquidity delta to an unsigned liquidity value
pub fn add_liquidity_delta(liquidity: u128, delta: i128) -> SfpmResult<u128> {
    if delta < 0 {
        liquidity
            .checked_sub(delta.unsigned_abs())
            .ok_or(SfpmError::MathUnderflow)
    } else {
        liquidity
            .checked_add(delta as u128)
            .ok_or(SfpmError::MathOverflow)
    }
}

pub fn u128_to_i128(value: u128) -> SfpmResult<i128> {
    i128::try_from(value).map_err(|_| SfpmError::MathOverflow)
}

pub fn u256_to_u128(value: U256) -> SfpmResult<u128> {
    value.to_u128().ok_or(SfpmError::MathOverflow)
}

pub fn u256_to_i128(value: U256) -> SfpmResult<i128> {
    u128_to_i128(u256_to_u128(value)?)
}

/// Negate an unsigned magnitude into i128
pub fn neg_u128(value: u128) -> SfpmResult<i128> {
    if value == 1u128 << 127 {
        return Ok(i128::MIN);
    }
    Ok(-u128_to_i128(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_liquidity_delta() {
        assert_eq!(add_liquidity_delta(100, -40).unwrap(), 60);
        assert_eq!(add_liquidity_delta(100, 40).unwrap(), 140);
        assert_eq!(add_liquidity_delta(10, -11), Err(SfpmError::MathUnderflow));
        assert_eq!(add_liquidity_delta(u128::MAX, 1), Err(SfpmError::MathOverflow));
        assert_eq!(add_liquidity_delta(u128::MAX, i128::MIN).unwrap(), u128::MAX >> 1);
    }

    #[test]
    fn test_casts() {
        assert_eq!(u128_to_i128(5).unwrap(), 5);
        assert!(u128_to_i128(u128::MAX).is_err());
        assert!(u256_to_u128(U256::new(0, 1)).is_err());
        assert_eq!(neg_u128(1u128 << 127).unwrap(), i128::MIN);
        assert_eq!(neg_u128(7).unwrap(), -7);
    }

    #[test]
    fn test_safe_div() {
        assert_eq!(safe_div_u128(7, 0), Err(SfpmError::DivisionByZero));
        assert_eq!(safe_div_i128(i128::MIN, -1), Err(SfpmError::MathOverflow));
        assert_eq!(safe_sub_u128(1, 2), Err(SfpmError::MathUnderflow));
    }
}
