//! ITM settlement swap and tick-limit checks.

use tracing::debug;

use crate::amm::AmmPool;
use crate::constants::{MAX_SQRT_RATIO, MIN_SQRT_RATIO};
use crate::engine::TickLimits;
use crate::errors::{SfpmError, SfpmResult};
use crate::math::big_int::U256;
use crate::math::liquidity_math::convert1to0_signed;
use crate::math::tick_math::get_sqrt_ratio_at_tick;
use crate::types::SignedPair;

/// Direction and exact amount of the netting swap for `itm`, or `None`
/// when nothing needs converting.
///
/// With ITM amounts in both tokens, token1 is valued in token0 at the
/// current price and only the net is swapped.
pub(crate) fn netting_swap(itm: SignedPair, sqrt_price_x96: U256) -> SfpmResult<Option<(bool, i128)>> {
    let (itm0, itm1) = itm.unpack();
    let (zero_for_one, swap_amount) = if itm0 != 0 && itm1 != 0 {
        let net0 = itm0
            .checked_sub(convert1to0_signed(itm1, sqrt_price_x96)?)
            .ok_or(SfpmError::Overflow)?;
        (net0 < 0, net0.checked_neg().ok_or(SfpmError::Overflow)?)
    } else if itm0 != 0 {
        (itm0 < 0, itm0.checked_neg().ok_or(SfpmError::Overflow)?)
    } else {
        (itm1 > 0, itm1.checked_neg().ok_or(SfpmError::Overflow)?)
    };
    if swap_amount == 0 {
        return Ok(None);
    }
    Ok(Some((zero_for_one, swap_amount)))
}

/// Swap the ITM token mix into the settlement tokens.
///
/// The price may move up to the caller's lower limit when selling token0
/// and up to the upper limit otherwise. Anything short of a full fill is a
/// price bound failure. Returns the swap deltas paid by the position.
pub(crate) fn swap_in_amm<A: AmmPool>(amm: &mut A, itm: SignedPair, limits: &TickLimits) -> SfpmResult<SignedPair> {
    let Some((zero_for_one, swap_amount)) = netting_swap(itm, amm.slot0().sqrt_price_x96)? else {
        return Ok(SignedPair::ZERO);
    };

    let (low, high) = limits.sorted();
    let limit_tick = if zero_for_one { low } else { high };
    let sqrt_limit = get_sqrt_ratio_at_tick(limit_tick)?
        .max(MIN_SQRT_RATIO.wrapping_add(U256::ONE))
        .min(MAX_SQRT_RATIO.wrapping_sub(U256::ONE));

    let result = amm.swap(zero_for_one, swap_amount, sqrt_limit)?;
    let specified = if zero_for_one == (swap_amount > 0) {
        result.amount0
    } else {
        result.amount1
    };
    if specified != swap_amount {
        debug!(
            "Settlement swap filled {} of {} before reaching tick {}",
            specified, swap_amount, result.tick
        );
        return Err(SfpmError::PriceBoundFail);
    }

    debug!(
        "Settlement swap zero_for_one={} amount0={} amount1={} tick={}",
        zero_for_one, result.amount0, result.amount1, result.tick
    );
    Ok(SignedPair::pack(result.amount0, result.amount1))
}

/// The current tick must lie strictly inside the sorted limits
pub(crate) fn check_tick_limits(tick: i32, limits: &TickLimits) -> SfpmResult<()> {
    let (low, high) = limits.sorted();
    if tick <= low || tick >= high {
        return Err(SfpmError::PriceBoundFail);
    }
    Ok(())
}
