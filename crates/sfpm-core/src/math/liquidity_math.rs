//! # Liquidity Math
//!
//! Amount <-> liquidity conversions over a sqrt-price range, next-price
//! computation for swaps, and token conversions at a spot sqrt price.
//! All prices are Q64.96 values held in [`U256`].

use crate::constants::{Q192, Q96};
use crate::errors::{SfpmError, SfpmResult};
use crate::math::big_int::{div_rounding_up, mul_div, Rounding, U256};
use crate::math::safe_math::{neg_u128, u256_to_i128, u256_to_u128};

fn sorted(a: U256, b: U256) -> (U256, U256) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

fn q96() -> U256 {
    U256::from_u128(Q96)
}

// ============================================================================
// Amount -> Liquidity
// ============================================================================

/// Liquidity received for `amount0` of token0 spread over the whole range
pub fn get_liquidity_for_amount0(sqrt_a: U256, sqrt_b: U256, amount0: u128) -> SfpmResult<u128> {
    let (sqrt_a, sqrt_b) = sorted(sqrt_a, sqrt_b);
    let diff = sqrt_b.wrapping_sub(sqrt_a);
    if diff.is_zero() {
        return Err(SfpmError::InvalidPriceRange);
    }
    let intermediate = mul_div(sqrt_a, sqrt_b, q96(), Rounding::Down)?;
    u256_to_u128(mul_div(U256::from_u128(amount0), intermediate, diff, Rounding::Down)?)
}

/// Liquidity received for `amount1` of token1 spread over the whole range
pub fn get_liquidity_for_amount1(sqrt_a: U256, sqrt_b: U256, amount1: u128) -> SfpmResult<u128> {
    let (sqrt_a, sqrt_b) = sorted(sqrt_a, sqrt_b);
    let diff = sqrt_b.wrapping_sub(sqrt_a);
    if diff.is_zero() {
        return Err(SfpmError::InvalidPriceRange);
    }
    u256_to_u128(mul_div(U256::from_u128(amount1), q96(), diff, Rounding::Down)?)
}

/// Maximum liquidity for the given amounts at the current price
pub fn get_liquidity_for_amounts(
    sqrt_price: U256,
    sqrt_a: U256,
    sqrt_b: U256,
    amount0: u128,
    amount1: u128,
) -> SfpmResult<u128> {
    let (sqrt_a, sqrt_b) = sorted(sqrt_a, sqrt_b);
    if sqrt_price <= sqrt_a {
        get_liquidity_for_amount0(sqrt_a, sqrt_b, amount0)
    } else if sqrt_price < sqrt_b {
        let l0 = get_liquidity_for_amount0(sqrt_price, sqrt_b, amount0)?;
        let l1 = get_liquidity_for_amount1(sqrt_a, sqrt_price, amount1)?;
        Ok(l0.min(l1))
    } else {
        get_liquidity_for_amount1(sqrt_a, sqrt_b, amount1)
    }
}

// ============================================================================
// Liquidity -> Amount
// ============================================================================

/// Token0 value of `liquidity` over the whole range, rounded down
pub fn get_amount0_for_liquidity(sqrt_a: U256, sqrt_b: U256, liquidity: u128) -> SfpmResult<u128> {
    u256_to_u128(get_amount0_delta(sqrt_a, sqrt_b, liquidity, false)?)
}

/// Token1 value of `liquidity` over the whole range, rounded down
pub fn get_amount1_for_liquidity(sqrt_a: U256, sqrt_b: U256, liquidity: u128) -> SfpmResult<u128> {
    u256_to_u128(get_amount1_delta(sqrt_a, sqrt_b, liquidity, false)?)
}

/// Token amounts backing `liquidity` at the current price
pub fn get_amounts_for_liquidity(
    sqrt_price: U256,
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
) -> SfpmResult<(u128, u128)> {
    let (sqrt_a, sqrt_b) = sorted(sqrt_a, sqrt_b);
    if sqrt_price <= sqrt_a {
        Ok((get_amount0_for_liquidity(sqrt_a, sqrt_b, liquidity)?, 0))
    } else if sqrt_price < sqrt_b {
        Ok((
            get_amount0_for_liquidity(sqrt_price, sqrt_b, liquidity)?,
            get_amount1_for_liquidity(sqrt_a, sqrt_price, liquidity)?,
        ))
    } else {
        Ok((0, get_amount1_for_liquidity(sqrt_a, sqrt_b, liquidity)?))
    }
}

/// L * (sqrt_b - sqrt_a) / (sqrt_a * sqrt_b), in Q96
pub fn get_amount0_delta(
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
    round_up: bool,
) -> SfpmResult<U256> {
    let (sqrt_a, sqrt_b) = sorted(sqrt_a, sqrt_b);
    if sqrt_a.is_zero() {
        return Err(SfpmError::InvalidSqrtPrice);
    }
    let numerator1 = U256::from_u128(liquidity) << 96;
    let numerator2 = sqrt_b.wrapping_sub(sqrt_a);

    if round_up {
        let inner = mul_div(numerator1, numerator2, sqrt_b, Rounding::Up)?;
        div_rounding_up(inner, sqrt_a)
    } else {
        let inner = mul_div(numerator1, numerator2, sqrt_b, Rounding::Down)?;
        Ok(inner.div_rem(sqrt_a).ok_or(SfpmError::DivisionByZero)?.0)
    }
}

/// L * (sqrt_b - sqrt_a), in Q96
pub fn get_amount1_delta(
    sqrt_a: U256,
    sqrt_b: U256,
    liquidity: u128,
    round_up: bool,
) -> SfpmResult<U256> {
    let (sqrt_a, sqrt_b) = sorted(sqrt_a, sqrt_b);
    let rounding = if round_up { Rounding::Up } else { Rounding::Down };
    mul_div(
        U256::from_u128(liquidity),
        sqrt_b.wrapping_sub(sqrt_a),
        q96(),
        rounding,
    )
}

/// Signed token0 delta for a signed liquidity change.
/// Adding liquidity rounds up (owed to the pool), removing rounds down.
pub fn get_amount0_delta_signed(sqrt_a: U256, sqrt_b: U256, liquidity: i128) -> SfpmResult<i128> {
    if liquidity < 0 {
        let amount = get_amount0_delta(sqrt_a, sqrt_b, liquidity.unsigned_abs(), false)?;
        neg_u128(u256_to_u128(amount)?)
    } else {
        u256_to_i128(get_amount0_delta(sqrt_a, sqrt_b, liquidity as u128, true)?)
    }
}

pub fn get_amount1_delta_signed(sqrt_a: U256, sqrt_b: U256, liquidity: i128) -> SfpmResult<i128> {
    if liquidity < 0 {
        let amount = get_amount1_delta(sqrt_a, sqrt_b, liquidity.unsigned_abs(), false)?;
        neg_u128(u256_to_u128(amount)?)
    } else {
        u256_to_i128(get_amount1_delta(sqrt_a, sqrt_b, liquidity as u128, true)?)
    }
}

// ============================================================================
// Next Sqrt Price
// ============================================================================

fn next_sqrt_price_from_amount0_rounding_up(
    sqrt_price: U256,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> SfpmResult<U256> {
    if amount == 0 {
        return Ok(sqrt_price);
    }
    let numerator1 = U256::from_u128(liquidity) << 96;
    let amount = U256::from_u128(amount);

    if add {
        if let Some(product) = amount.checked_mul(sqrt_price) {
            if let Some(denominator) = numerator1.checked_add(product) {
                return mul_div(numerator1, sqrt_price, denominator, Rounding::Up);
            }
        }
        let (q, _) = numerator1
            .div_rem(sqrt_price)
            .ok_or(SfpmError::DivisionByZero)?;
        let denominator = q.checked_add(amount).ok_or(SfpmError::MathOverflow)?;
        div_rounding_up(numerator1, denominator)
    } else {
        let product = amount
            .checked_mul(sqrt_price)
            .ok_or(SfpmError::MathOverflow)?;
        if numerator1 <= product {
            return Err(SfpmError::InvalidSqrtPrice);
        }
        mul_div(
            numerator1,
            sqrt_price,
            numerator1.wrapping_sub(product),
            Rounding::Up,
        )
    }
}

fn next_sqrt_price_from_amount1_rounding_down(
    sqrt_price: U256,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> SfpmResult<U256> {
    let liquidity = U256::from_u128(liquidity);
    let shifted = U256::from_u128(amount) << 96;
    if add {
        let (quotient, _) = shifted.div_rem(liquidity).ok_or(SfpmError::DivisionByZero)?;
        sqrt_price
            .checked_add(quotient)
            .ok_or(SfpmError::MathOverflow)
    } else {
        let quotient = div_rounding_up(shifted, liquidity)?;
        if sqrt_price <= quotient {
            return Err(SfpmError::InvalidSqrtPrice);
        }
        Ok(sqrt_price.wrapping_sub(quotient))
    }
}

/// Sqrt price after adding `amount_in` of the input token
pub fn get_next_sqrt_price_from_input(
    sqrt_price: U256,
    liquidity: u128,
    amount_in: u128,
    zero_for_one: bool,
) -> SfpmResult<U256> {
    if sqrt_price.is_zero() || liquidity == 0 {
        return Err(SfpmError::InvalidSqrtPrice);
    }
    if zero_for_one {
        next_sqrt_price_from_amount0_rounding_up(sqrt_price, liquidity, amount_in, true)
    } else {
        next_sqrt_price_from_amount1_rounding_down(sqrt_price, liquidity, amount_in, true)
    }
}

/// Sqrt price after removing `amount_out` of the output token
pub fn get_next_sqrt_price_from_output(
    sqrt_price: U256,
    liquidity: u128,
    amount_out: u128,
    zero_for_one: bool,
) -> SfpmResult<U256> {
    if sqrt_price.is_zero() || liquidity == 0 {
        return Err(SfpmError::InvalidSqrtPrice);
    }
    if zero_for_one {
        next_sqrt_price_from_amount1_rounding_down(sqrt_price, liquidity, amount_out, false)
    } else {
        next_sqrt_price_from_amount0_rounding_up(sqrt_price, liquidity, amount_out, false)
    }
}

// ============================================================================
// Spot Conversions
// ============================================================================

/// Token0 amount expressed in token1 at `sqrt_price`, rounded down
pub fn convert0to1(amount: u128, sqrt_price: U256) -> SfpmResult<U256> {
    let amount = U256::from_u128(amount);
    if sqrt_price.hi == 0 {
        let price_x192 = sqrt_price
            .checked_mul(sqrt_price)
            .ok_or(SfpmError::MathOverflow)?;
        mul_div(amount, price_x192, Q192, Rounding::Down)
    } else {
        let price_x128 = mul_div(sqrt_price, sqrt_price, U256::ONE << 64, Rounding::Down)?;
        mul_div(amount, price_x128, U256::ONE << 128, Rounding::Down)
    }
}

/// Token1 amount expressed in token0 at `sqrt_price`, rounded down
pub fn convert1to0(amount: u128, sqrt_price: U256) -> SfpmResult<U256> {
    let amount = U256::from_u128(amount);
    if sqrt_price.hi == 0 {
        let price_x192 = sqrt_price
            .checked_mul(sqrt_price)
            .ok_or(SfpmError::MathOverflow)?;
        mul_div(amount, Q192, price_x192, Rounding::Down)
    } else {
        let price_x128 = mul_div(sqrt_price, sqrt_price, U256::ONE << 64, Rounding::Down)?;
        mul_div(amount, U256::ONE << 128, price_x128, Rounding::Down)
    }
}

/// Signed variant of [`convert1to0`]; the sign carries through
pub fn convert1to0_signed(amount: i128, sqrt_price: U256) -> SfpmResult<i128> {
    let magnitude = u256_to_u128(convert1to0(amount.unsigned_abs(), sqrt_price)?)?;
    if amount < 0 {
        neg_u128(magnitude)
    } else {
        crate::math::safe_math::u128_to_i128(magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick_math::get_sqrt_ratio_at_tick;

    fn sqrt(tick: i32) -> U256 {
        get_sqrt_ratio_at_tick(tick).unwrap()
    }

    #[test]
    fn test_liquidity_amount_roundtrip_token1() {
        let (a, b) = (sqrt(-110), sqrt(-90));
        let amount = 3_396_000_000u128;
        let liquidity = get_liquidity_for_amount1(a, b, amount).unwrap();
        assert!(liquidity > 0);
        let back = get_amount1_for_liquidity(a, b, liquidity).unwrap();
        assert!(back <= amount);
        // loss bounded by one unit of liquidity worth of token1
        assert!(amount - back <= 1);
    }

    #[test]
    fn test_liquidity_amount_roundtrip_token0() {
        let (a, b) = (sqrt(100), sqrt(300));
        let amount = 1_000_000_000u128;
        let liquidity = get_liquidity_for_amount0(a, b, amount).unwrap();
        let back = get_amount0_for_liquidity(a, b, liquidity).unwrap();
        assert!(back <= amount);
        assert!(amount - back <= 2);
    }

    #[test]
    fn test_zero_width_range_rejected() {
        let a = sqrt(0);
        assert_eq!(
            get_liquidity_for_amount1(a, a, 10),
            Err(SfpmError::InvalidPriceRange)
        );
    }

    #[test]
    fn test_amounts_for_liquidity_by_price_position() {
        let (a, b) = (sqrt(-100), sqrt(100));
        let liquidity = 1_000_000_000_000u128;
        let (below0, below1) = get_amounts_for_liquidity(sqrt(-200), a, b, liquidity).unwrap();
        assert!(below0 > 0);
        assert_eq!(below1, 0);
        let (above0, above1) = get_amounts_for_liquidity(sqrt(200), a, b, liquidity).unwrap();
        assert_eq!(above0, 0);
        assert!(above1 > 0);
        let (in0, in1) = get_amounts_for_liquidity(sqrt(0), a, b, liquidity).unwrap();
        assert!(in0 > 0 && in1 > 0);
    }

    #[test]
    fn test_delta_rounding_direction() {
        let (a, b) = (sqrt(-60), sqrt(60));
        let up = get_amount0_delta(a, b, 123_456_789, true).unwrap();
        let down = get_amount0_delta(a, b, 123_456_789, false).unwrap();
        assert!(up >= down);
        assert!(up.checked_sub(down).unwrap() <= U256::ONE);
        assert!(get_amount0_delta_signed(a, b, -123_456_789).unwrap() < 0);
        assert!(get_amount1_delta_signed(a, b, 123_456_789).unwrap() > 0);
    }

    #[test]
    fn test_next_price_moves_in_swap_direction() {
        let price = sqrt(0);
        let liquidity = 10u128.pow(18);
        let down = get_next_sqrt_price_from_input(price, liquidity, 10u128.pow(15), true).unwrap();
        let up = get_next_sqrt_price_from_input(price, liquidity, 10u128.pow(15), false).unwrap();
        assert!(down < price);
        assert!(up > price);
        let out_down = get_next_sqrt_price_from_output(price, liquidity, 10u128.pow(15), true).unwrap();
        assert!(out_down < price);
    }

    #[test]
    fn test_conversions_at_unit_price() {
        let price = U256::from_u128(Q96);
        assert_eq!(convert0to1(1_000, price).unwrap(), U256::from_u128(1_000));
        assert_eq!(convert1to0(1_000, price).unwrap(), U256::from_u128(1_000));
        assert_eq!(convert1to0_signed(-1_000, price).unwrap(), -1_000);
    }

    #[test]
    fn test_conversion_at_price_four() {
        // sqrt price 2.0 -> price 4.0
        let price = U256::from_u128(Q96 * 2);
        assert_eq!(convert0to1(100, price).unwrap(), U256::from_u128(400));
        assert_eq!(convert1to0(400, price).unwrap(), U256::from_u128(100));
    }
}
