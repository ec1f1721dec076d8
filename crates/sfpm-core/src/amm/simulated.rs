//! # Simulated Pool
//!
//! In-memory concentrated-liquidity pool with tick crossing, per-tick fee
//! growth and a single position book. Used to run the engine off-chain and
//! in tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::amm::{AmmPool, Slot0, SwapResult};
use crate::config::{validate_tick_spacing, ManagerConfig};
use crate::constants::{MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK};
use crate::errors::{SfpmError, SfpmResult};
use crate::math::big_int::U256;
use crate::math::fee_math::{fee_growth_inside, growth_for_fee};
use crate::math::liquidity_math::{get_amount0_delta_signed, get_amount1_delta_signed};
use crate::math::safe_math::{add_liquidity_delta, u128_to_i128};
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_math::{get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio};

/// Per-tick bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInfo {
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
    pub fee_growth_outside: [U256; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedPool {
    fee_pips: u32,
    tick_spacing: i32,
    sqrt_price_x96: U256,
    tick: i32,
    liquidity: u128,
    fee_growth_global: [U256; 2],
    ticks: BTreeMap<i32, TickInfo>,
    positions: BTreeMap<(i32, i32), u128>,
}

impl SimulatedPool {
    pub fn new(sqrt_price_x96: U256, tick_spacing: i32, fee_pips: u32) -> SfpmResult<Self> {
        validate_tick_spacing(tick_spacing)?;
        let tick = get_tick_at_sqrt_ratio(sqrt_price_x96)?;
        Ok(Self {
            fee_pips,
            tick_spacing,
            sqrt_price_x96,
            tick,
            liquidity: 0,
            fee_growth_global: [U256::ZERO; 2],
            ticks: BTreeMap::new(),
            positions: BTreeMap::new(),
        })
    }

    /// Pool initialized exactly at `tick`
    pub fn at_tick(tick: i32, tick_spacing: i32, fee_pips: u32) -> SfpmResult<Self> {
        Self::new(get_sqrt_ratio_at_tick(tick)?, tick_spacing, fee_pips)
    }

    /// Pool using the tick spacing configured for `fee_pips`
    pub fn from_fee_tier(config: &ManagerConfig, fee_pips: u32, initial_tick: i32) -> SfpmResult<Self> {
        let tick_spacing = config.tick_spacing_for_fee(fee_pips)?;
        Self::at_tick(initial_tick, tick_spacing, fee_pips)
    }

    pub fn fee_pips(&self) -> u32 {
        self.fee_pips
    }

    /// Active liquidity at the current price
    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn fee_growth_global(&self) -> (U256, U256) {
        (self.fee_growth_global[0], self.fee_growth_global[1])
    }

    pub fn tick_info(&self, tick: i32) -> Option<&TickInfo> {
        self.ticks.get(&tick)
    }

    pub fn position_liquidity(&self, tick_lower: i32, tick_upper: i32) -> u128 {
        self.positions.get(&(tick_lower, tick_upper)).copied().unwrap_or(0)
    }

    /// Credit fees to in-range liquidity as if swaps had paid them
    pub fn donate(&mut self, amount0: u128, amount1: u128) -> SfpmResult<()> {
        if self.liquidity == 0 {
            return Err(SfpmError::NotEnoughLiquidity);
        }
        for (token, amount) in [amount0, amount1].into_iter().enumerate() {
            if amount > 0 {
                let growth = growth_for_fee(amount, self.liquidity)?;
                self.fee_growth_global[token] = self.fee_growth_global[token].wrapping_add(growth);
            }
        }
        Ok(())
    }

    fn check_range(&self, tick_lower: i32, tick_upper: i32) -> SfpmResult<()> {
        if tick_lower >= tick_upper {
            return Err(SfpmError::InvalidPriceRange);
        }
        for tick in [tick_lower, tick_upper] {
            if !(MIN_TICK..=MAX_TICK).contains(&tick) || tick % self.tick_spacing != 0 {
                return Err(SfpmError::InvalidTick(tick));
            }
        }
        Ok(())
    }

    fn update_tick(&mut self, tick: i32, delta: i128, upper: bool) -> SfpmResult<()> {
        let current = self.tick;
        let global = self.fee_growth_global;
        let info = self.ticks.entry(tick).or_default();

        let gross_before = info.liquidity_gross;
        let gross_after = add_liquidity_delta(gross_before, delta)?;
        if gross_before == 0 && tick <= current {
            // growth below a freshly initialized tick is assumed to have happened below it
            info.fee_growth_outside = global;
        }
        info.liquidity_gross = gross_after;
        info.liquidity_net = if upper {
            info.liquidity_net.checked_sub(delta)
        } else {
            info.liquidity_net.checked_add(delta)
        }
        .ok_or(SfpmError::MathOverflow)?;

        if gross_after == 0 {
            self.ticks.remove(&tick);
        }
        Ok(())
    }

    /// Signed token deltas of a liquidity change; positive is owed to the pool
    fn modify_position(&mut self, tick_lower: i32, tick_upper: i32, delta: i128) -> SfpmResult<(i128, i128)> {
        self.check_range(tick_lower, tick_upper)?;

        let position = self.positions.entry((tick_lower, tick_upper)).or_insert(0);
        *position = add_liquidity_delta(*position, delta).map_err(|_| SfpmError::NotEnoughLiquidity)?;
        if *position == 0 {
            self.positions.remove(&(tick_lower, tick_upper));
        }

        self.update_tick(tick_lower, delta, false)?;
        self.update_tick(tick_upper, delta, true)?;

        let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
        let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;

        if self.tick < tick_lower {
            Ok((get_amount0_delta_signed(sqrt_lower, sqrt_upper, delta)?, 0))
        } else if self.tick < tick_upper {
            let amount0 = get_amount0_delta_signed(self.sqrt_price_x96, sqrt_upper, delta)?;
            let amount1 = get_amount1_delta_signed(sqrt_lower, self.sqrt_price_x96, delta)?;
            self.liquidity = add_liquidity_delta(self.liquidity, delta)?;
            Ok((amount0, amount1))
        } else {
            Ok((0, get_amount1_delta_signed(sqrt_lower, sqrt_upper, delta)?))
        }
    }

    /// Next initialized tick in the swap direction, clamped to the domain
    fn next_initialized_tick(&self, zero_for_one: bool) -> (i32, bool) {
        let found = if zero_for_one {
            self.ticks.range(..=self.tick).next_back()
        } else {
            self.ticks.range(self.tick.saturating_add(1)..).next()
        };
        match found {
            Some((tick, _)) => (*tick, true),
            None if zero_for_one => (MIN_TICK, false),
            None => (MAX_TICK, false),
        }
    }

    fn cross_tick(&mut self, tick: i32) -> i128 {
        let global = self.fee_growth_global;
        match self.ticks.get_mut(&tick) {
            Some(info) => {
                for token in 0..2 {
                    info.fee_growth_outside[token] = global[token].wrapping_sub(info.fee_growth_outside[token]);
                }
                info.liquidity_net
            }
            None => 0,
        }
    }
}

impl AmmPool for SimulatedPool {
    fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    fn slot0(&self) -> Slot0 {
        Slot0 {
            sqrt_price_x96: self.sqrt_price_x96,
            tick: self.tick,
        }
    }

    fn fee_growth_inside(&self, tick_lower: i32, tick_upper: i32) -> SfpmResult<(U256, U256)> {
        self.check_range(tick_lower, tick_upper)?;
        let empty = TickInfo::default();
        let lower = self.ticks.get(&tick_lower).unwrap_or(&empty);
        let upper = self.ticks.get(&tick_upper).unwrap_or(&empty);
        let inside = |token: usize| {
            fee_growth_inside(
                self.tick,
                tick_lower,
                tick_upper,
                lower.fee_growth_outside[token],
                upper.fee_growth_outside[token],
                self.fee_growth_global[token],
            )
        };
        Ok((inside(0), inside(1)))
    }

    fn mint(&mut self, tick_lower: i32, tick_upper: i32, liquidity: u128) -> SfpmResult<(u128, u128)> {
        let delta = u128_to_i128(liquidity)?;
        let (amount0, amount1) = self.modify_position(tick_lower, tick_upper, delta)?;
        trace!(tick_lower, tick_upper, liquidity, amount0, amount1, "pool mint");
        Ok((amount0 as u128, amount1 as u128))
    }

    fn burn(&mut self, tick_lower: i32, tick_upper: i32, liquidity: u128) -> SfpmResult<(u128, u128)> {
        if self.position_liquidity(tick_lower, tick_upper) < liquidity {
            return Err(SfpmError::NotEnoughLiquidity);
        }
        let delta = u128_to_i128(liquidity)?;
        let (amount0, amount1) = self.modify_position(tick_lower, tick_upper, -delta)?;
        trace!(tick_lower, tick_upper, liquidity, amount0, amount1, "pool burn");
        Ok((amount0.unsigned_abs(), amount1.unsigned_abs()))
    }

    fn swap(
        &mut self,
        zero_for_one: bool,
        amount_specified: i128,
        sqrt_price_limit_x96: U256,
    ) -> SfpmResult<SwapResult> {
        if amount_specified == 0 {
            return Err(SfpmError::invalid_parameter("amount_specified", "0", "non-zero"));
        }
        let limit_ok = if zero_for_one {
            sqrt_price_limit_x96 < self.sqrt_price_x96 && sqrt_price_limit_x96 > MIN_SQRT_RATIO
        } else {
            sqrt_price_limit_x96 > self.sqrt_price_x96 && sqrt_price_limit_x96 < MAX_SQRT_RATIO
        };
        if !limit_ok {
            return Err(SfpmError::PriceBoundFail);
        }

        let exact_in = amount_specified > 0;
        let input_token = if zero_for_one { 0 } else { 1 };
        let mut remaining = amount_specified;
        let mut calculated: i128 = 0;

        while remaining != 0 && self.sqrt_price_x96 != sqrt_price_limit_x96 {
            let sqrt_price_start = self.sqrt_price_x96;
            let (tick_next, initialized) = self.next_initialized_tick(zero_for_one);
            let sqrt_price_next = get_sqrt_ratio_at_tick(tick_next)?;

            let target = if zero_for_one {
                sqrt_price_next.max(sqrt_price_limit_x96)
            } else {
                sqrt_price_next.min(sqrt_price_limit_x96)
            };

            let step = compute_swap_step(sqrt_price_start, target, self.liquidity, remaining, self.fee_pips)?;
            self.sqrt_price_x96 = step.sqrt_price_next;

            let paid_in = u128_to_i128(
                step.amount_in
                    .checked_add(step.fee_amount)
                    .ok_or(SfpmError::MathOverflow)?,
            )?;
            let paid_out = u128_to_i128(step.amount_out)?;
            if exact_in {
                remaining = remaining.checked_sub(paid_in).ok_or(SfpmError::MathOverflow)?;
                calculated = calculated.checked_sub(paid_out).ok_or(SfpmError::MathOverflow)?;
            } else {
                remaining = remaining.checked_add(paid_out).ok_or(SfpmError::MathOverflow)?;
                calculated = calculated.checked_add(paid_in).ok_or(SfpmError::MathOverflow)?;
            }

            if self.liquidity > 0 && step.fee_amount > 0 {
                let growth = growth_for_fee(step.fee_amount, self.liquidity)?;
                self.fee_growth_global[input_token] =
                    self.fee_growth_global[input_token].wrapping_add(growth);
            }

            if self.sqrt_price_x96 == sqrt_price_next {
                if initialized {
                    let net = self.cross_tick(tick_next);
                    let net = if zero_for_one { -net } else { net };
                    self.liquidity = add_liquidity_delta(self.liquidity, net)?;
                }
                self.tick = if zero_for_one { tick_next - 1 } else { tick_next };
            } else if self.sqrt_price_x96 != sqrt_price_start {
                self.tick = get_tick_at_sqrt_ratio(self.sqrt_price_x96)?;
            }
        }

        let filled = amount_specified - remaining;
        let (amount0, amount1) = if zero_for_one == exact_in {
            (filled, calculated)
        } else {
            (calculated, filled)
        };
        trace!(zero_for_one, amount0, amount1, tick = self.tick, "pool swap");

        Ok(SwapResult {
            amount0,
            amount1,
            sqrt_price_x96: self.sqrt_price_x96,
            tick: self.tick,
        })
    }
}
