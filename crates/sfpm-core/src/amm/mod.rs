//! # AMM Collaborator
//!
//! The engine never talks to a concrete pool. Everything it needs from the
//! underlying concentrated-liquidity AMM goes through [`AmmPool`], including
//! the settlement swap for in-the-money legs.

pub mod simulated;

use serde::{Deserialize, Serialize};

use crate::errors::SfpmResult;
use crate::math::big_int::U256;

pub use simulated::{SimulatedPool, TickInfo};

/// Current price state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

/// Token deltas of a swap from the pool's point of view: positive amounts
/// were paid into the pool, negative amounts were paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapResult {
    pub amount0: i128,
    pub amount1: i128,
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

/// Capabilities consumed from the underlying AMM pool.
///
/// `Clone` lets the engine stage a pool copy per operation and drop it when
/// the operation fails.
pub trait AmmPool: Clone {
    fn tick_spacing(&self) -> i32;

    fn slot0(&self) -> Slot0;

    /// Per-token Q128 fee growth inside `[tick_lower, tick_upper)`
    fn fee_growth_inside(&self, tick_lower: i32, tick_upper: i32) -> SfpmResult<(U256, U256)>;

    /// Add liquidity; returns the token amounts paid in
    fn mint(&mut self, tick_lower: i32, tick_upper: i32, liquidity: u128) -> SfpmResult<(u128, u128)>;

    /// Remove liquidity; returns the token amounts paid out.
    /// Fails with `NotEnoughLiquidity` if the range holds less than asked.
    fn burn(&mut self, tick_lower: i32, tick_upper: i32, liquidity: u128) -> SfpmResult<(u128, u128)>;

    /// Swap against the pool. Positive `amount_specified` is exact input,
    /// negative is exact output. Stops early at `sqrt_price_limit_x96`.
    fn swap(
        &mut self,
        zero_for_one: bool,
        amount_specified: i128,
        sqrt_price_limit_x96: U256,
    ) -> SfpmResult<SwapResult>;
}
