//! # Tick Math
//!
//! Conversions between ticks and Q64.96 sqrt prices, bit-compatible with the
//! concentrated-liquidity AMM the positions are deployed into.

use crate::constants::{MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK};
use crate::errors::{SfpmError, SfpmResult};
use crate::math::big_int::{mul_shr_128, U256};

/// sqrt(1.0001)^-(2^i) in Q128, for i in 1..20
const MAGIC_SQRT_RATIOS: [u128; 19] = [
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x9aa508b5b7a84e1c677de54f3e99bc9,
    0x5d6af8dedb81196699c329225ee604,
    0x2216e584f5fa1ea926041bedfe98,
    0x48a170391f7dc42444e8fa2,
];

/// sqrt(1.0001)^-1 in Q128
const ODD_TICK_RATIO: u128 = 0xfffcb933bd6fad37aa2d162d1a594001;

pub fn check_tick(tick: i32) -> SfpmResult<()> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(SfpmError::InvalidTick(tick));
    }
    Ok(())
}

/// Get the Q64.96 sqrt price at a tick
pub fn get_sqrt_ratio_at_tick(tick: i32) -> SfpmResult<U256> {
    check_tick(tick)?;

    let abs_tick = tick.unsigned_abs();
    let mut ratio = if abs_tick & 1 != 0 {
        U256::from_u128(ODD_TICK_RATIO)
    } else {
        U256::new(0, 1)
    };

    for (i, magic) in MAGIC_SQRT_RATIOS.iter().enumerate() {
        if abs_tick & (2 << i) != 0 {
            ratio = mul_shr_128(ratio, U256::from_u128(*magic)).ok_or(SfpmError::MathOverflow)?;
        }
    }

    if tick > 0 {
        ratio = U256::MAX
            .div_rem(ratio)
            .ok_or(SfpmError::DivisionByZero)?
            .0;
    }

    // Q128.128 -> Q64.96, rounding up so the result never undershoots
    let shifted = ratio >> 32;
    if ratio.lo as u32 != 0 {
        Ok(shifted.checked_add(U256::ONE).ok_or(SfpmError::MathOverflow)?)
    } else {
        Ok(shifted)
    }
}

/// Greatest tick whose sqrt price is at or below `sqrt_price_x96`
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U256) -> SfpmResult<i32> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(SfpmError::InvalidSqrtPrice);
    }

    let mut low = MIN_TICK;
    let mut high = MAX_TICK - 1;
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if get_sqrt_ratio_at_tick(mid)? <= sqrt_price_x96 {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}

/// Round a tick down to a multiple of `tick_spacing`
pub fn floor_to_spacing(tick: i32, tick_spacing: i32) -> i32 {
    tick.div_euclid(tick_spacing) * tick_spacing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Q96;

    #[test]
    fn test_tick_to_sqrt_price_conversion() {
        assert_eq!(get_sqrt_ratio_at_tick(0).unwrap(), U256::from_u128(Q96));
        assert_eq!(get_sqrt_ratio_at_tick(MIN_TICK).unwrap(), MIN_SQRT_RATIO);
        assert_eq!(get_sqrt_ratio_at_tick(MAX_TICK).unwrap(), MAX_SQRT_RATIO);
        assert_eq!(
            get_sqrt_ratio_at_tick(1).unwrap(),
            U256::from_u128(79232123823359799118286999568)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(-1).unwrap(),
            U256::from_u128(79224201403219477170569942574)
        );
    }

    #[test]
    fn test_out_of_range_ticks_rejected() {
        assert_eq!(
            get_sqrt_ratio_at_tick(MIN_TICK - 1),
            Err(SfpmError::InvalidTick(MIN_TICK - 1))
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(MAX_TICK + 1),
            Err(SfpmError::InvalidTick(MAX_TICK + 1))
        );
        assert_eq!(
            get_tick_at_sqrt_ratio(MAX_SQRT_RATIO),
            Err(SfpmError::InvalidSqrtPrice)
        );
    }

    #[test]
    fn test_sqrt_price_to_tick_conversion() {
        for tick in [MIN_TICK, -100_000, -1000, -110, -1, 0, 1, 60, 1000, 100_000, MAX_TICK - 1] {
            let sqrt_price = get_sqrt_ratio_at_tick(tick).unwrap();
            assert_eq!(get_tick_at_sqrt_ratio(sqrt_price).unwrap(), tick);
            // one unit below the boundary belongs to the previous tick
            if tick > MIN_TICK {
                let below = sqrt_price.checked_sub(U256::ONE).unwrap();
                assert_eq!(get_tick_at_sqrt_ratio(below).unwrap(), tick - 1);
            }
        }
    }

    #[test]
    fn test_floor_to_spacing() {
        assert_eq!(floor_to_spacing(15, 10), 10);
        assert_eq!(floor_to_spacing(-15, 10), -20);
        assert_eq!(floor_to_spacing(-20, 10), -20);
    }
}
