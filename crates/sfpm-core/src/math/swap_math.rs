//! # Swap Math
//!
//! One step of a swap inside a single initialized-tick interval.

use serde::{Deserialize, Serialize};

use crate::constants::FEE_PIPS_DENOMINATOR;
use crate::errors::{SfpmError, SfpmResult};
use crate::math::big_int::{mul_div, Rounding, U256};
use crate::math::liquidity_math::{
    get_amount0_delta, get_amount1_delta, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};
use crate::math::safe_math::u256_to_u128;

/// Result of a single swap step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapStep {
    pub sqrt_price_next: U256,
    pub amount_in: u128,
    pub amount_out: u128,
    pub fee_amount: u128,
}

/// Compute how far a swap moves toward `sqrt_price_target` given the
/// remaining amount. Positive `amount_remaining` is exact input, negative is
/// exact output. `fee_pips` is out of 1,000,000.
pub fn compute_swap_step(
    sqrt_price_current: U256,
    sqrt_price_target: U256,
    liquidity: u128,
    amount_remaining: i128,
    fee_pips: u32,
) -> SfpmResult<SwapStep> {
    if fee_pips >= FEE_PIPS_DENOMINATOR {
        return Err(SfpmError::invalid_config("fee must be below 100%"));
    }
    let zero_for_one = sqrt_price_current >= sqrt_price_target;
    let exact_in = amount_remaining >= 0;
    let remaining_abs = U256::from_u128(amount_remaining.unsigned_abs());
    let fee_complement = U256::from(FEE_PIPS_DENOMINATOR - fee_pips);
    let denominator = U256::from(FEE_PIPS_DENOMINATOR);

    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;
    let sqrt_price_next;

    if exact_in {
        let remaining_less_fee = mul_div(remaining_abs, fee_complement, denominator, Rounding::Down)?;
        amount_in = if zero_for_one {
            get_amount0_delta(sqrt_price_target, sqrt_price_current, liquidity, true)?
        } else {
            get_amount1_delta(sqrt_price_current, sqrt_price_target, liquidity, true)?
        };
        sqrt_price_next = if remaining_less_fee >= amount_in {
            sqrt_price_target
        } else {
            get_next_sqrt_price_from_input(
                sqrt_price_current,
                liquidity,
                u256_to_u128(remaining_less_fee)?,
                zero_for_one,
            )?
        };
    } else {
        amount_out = if zero_for_one {
            get_amount1_delta(sqrt_price_target, sqrt_price_current, liquidity, false)?
        } else {
            get_amount0_delta(sqrt_price_current, sqrt_price_target, liquidity, false)?
        };
        sqrt_price_next = if remaining_abs >= amount_out {
            sqrt_price_target
        } else {
            get_next_sqrt_price_from_output(
                sqrt_price_current,
                liquidity,
                u256_to_u128(remaining_abs)?,
                zero_for_one,
            )?
        };
    }

    let reached_target = sqrt_price_next == sqrt_price_target;

    if zero_for_one {
        if !(reached_target && exact_in) {
            amount_in = get_amount0_delta(sqrt_price_next, sqrt_price_current, liquidity, true)?;
        }
        if !(reached_target && !exact_in) {
            amount_out = get_amount1_delta(sqrt_price_next, sqrt_price_current, liquidity, false)?;
        }
    } else {
        if !(reached_target && exact_in) {
            amount_in = get_amount1_delta(sqrt_price_current, sqrt_price_next, liquidity, true)?;
        }
        if !(reached_target && !exact_in) {
            amount_out = get_amount0_delta(sqrt_price_current, sqrt_price_next, liquidity, false)?;
        }
    }

    // exact output never pays out more than asked
    if !exact_in && amount_out > remaining_abs {
        amount_out = remaining_abs;
    }

    let fee_amount = if exact_in && !reached_target {
        // the remainder of the input is taken as fee
        remaining_abs
            .checked_sub(amount_in)
            .ok_or(SfpmError::MathUnderflow)?
    } else {
        mul_div(amount_in, U256::from(fee_pips), fee_complement, Rounding::Up)?
    };

    Ok(SwapStep {
        sqrt_price_next,
        amount_in: u256_to_u128(amount_in)?,
        amount_out: u256_to_u128(amount_out)?,
        fee_amount: u256_to_u128(fee_amount)?,
    })
}
