//! Per-leg AMM and ledger work.
//!
//! A leg moves one liquidity chunk in or out of the AMM. Short mints and
//! long burns add the chunk, long mints and short burns take it out.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::amm::AmmPool;
use crate::engine::holding::LegShare;
use crate::engine::transaction::Transaction;
use crate::errors::{SfpmError, SfpmResult};
use crate::ledger::{LedgerKey, LedgerStore};
use crate::math::big_int::U256;
use crate::math::liquidity_math::{
    get_amount0_for_liquidity, get_amount1_for_liquidity, get_liquidity_for_amount0,
    get_liquidity_for_amount1,
};
use crate::math::safe_math::{neg_u128, safe_mul_u128, u128_to_i128};
use crate::math::tick_math::get_sqrt_ratio_at_tick;
use crate::types::{Address, Leg, SignedPair, TokenSide};

/// Result of moving one leg through the AMM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegOutcome {
    pub index: usize,
    pub tick_lower: i32,
    pub tick_upper: i32,
    /// Liquidity chunk the leg represents
    pub liquidity: u128,
    /// Tokens paid into the AMM (positive) or received from it (negative)
    pub moved: SignedPair,
    /// Fees realized on the leg's ledger entry before the change
    pub collected: SignedPair,
    /// Portion of `moved` in the token the leg does not settle in
    pub itm: SignedPair,
    /// Token amounts the chunk is worth across its full range
    pub notional: (u128, u128),
}

impl LegOutcome {
    pub fn share(&self) -> LegShare {
        LegShare {
            liquidity: self.liquidity,
            notional: self.notional,
        }
    }
}

/// Liquidity for `size * ratio` of the leg's asset token spread over
/// `[sqrt_lower, sqrt_upper]`. Independent of the current price.
pub fn liquidity_chunk(leg: &Leg, size: u128, sqrt_lower: U256, sqrt_upper: U256) -> SfpmResult<u128> {
    let amount = safe_mul_u128(size, leg.ratio as u128)?;
    let liquidity = match leg.asset {
        TokenSide::Token0 => get_liquidity_for_amount0(sqrt_lower, sqrt_upper, amount)?,
        TokenSide::Token1 => get_liquidity_for_amount1(sqrt_lower, sqrt_upper, amount)?,
    };
    if liquidity == 0 {
        return Err(SfpmError::OptionsBalanceZero);
    }
    Ok(liquidity)
}

/// Notional of a leg in both tokens: `size * ratio` of the asset token and
/// the full-range value of the chunk in the other one.
pub fn notional_amounts(
    leg: &Leg,
    size: u128,
    sqrt_lower: U256,
    sqrt_upper: U256,
    liquidity: u128,
) -> SfpmResult<(u128, u128)> {
    let amount = safe_mul_u128(size, leg.ratio as u128)?;
    Ok(match leg.asset {
        TokenSide::Token0 => (amount, get_amount1_for_liquidity(sqrt_lower, sqrt_upper, liquidity)?),
        TokenSide::Token1 => (get_amount0_for_liquidity(sqrt_lower, sqrt_upper, liquidity)?, amount),
    })
}

/// Liquidity and notional that minting `size` of `leg` puts behind it
pub(crate) fn mint_share<A: AmmPool>(
    tx: &mut Transaction<'_, A>,
    pool_id: u64,
    leg: &Leg,
    size: u128,
) -> SfpmResult<LegShare> {
    let (tick_lower, tick_upper) = leg.ticks(tx.pool(pool_id)?.amm.tick_spacing())?;
    let sqrt_lower = get_sqrt_ratio_at_tick(tick_lower)?;
    let sqrt_upper = get_sqrt_ratio_at_tick(tick_upper)?;
    let liquidity = liquidity_chunk(leg, size, sqrt_lower, sqrt_upper)?;
    Ok(LegShare {
        liquidity,
        notional: notional_amounts(leg, size, sqrt_lower, sqrt_upper, liquidity)?,
    })
}

/// Move one leg's share in or out of the AMM and mirror it in the ledger.
///
/// The entry is touched before the liquidity change. It is touched again
/// against the post-operation growth whenever it holds no liquidity, since
/// initializing or clearing the range's ticks shifts the growth reading.
pub(crate) fn create_leg_in_amm<A: AmmPool>(
    tx: &mut Transaction<'_, A>,
    pool_id: u64,
    owner: Address,
    leg: &Leg,
    index: usize,
    share: LegShare,
    is_burn: bool,
) -> SfpmResult<LegOutcome> {
    let chunk = share.liquidity;
    if chunk == 0 {
        return Err(SfpmError::OptionsBalanceZero);
    }
    let tick_spacing = tx.pool(pool_id)?.amm.tick_spacing();
    let (tick_lower, tick_upper) = leg.ticks(tick_spacing)?;
    let delta = u128_to_i128(chunk)?;

    let key = LedgerKey::new(pool_id, owner, leg.token_type, tick_lower, tick_upper);
    let adds_liquidity = leg.is_long == is_burn;
    let net_before = tx.ledger.get_liquidity(&key);
    if !adds_liquidity && net_before < chunk {
        // a long mint buys liquidity the owner never supplied; a short burn
        // finds its own supply already bought back by a long leg
        return Err(if is_burn {
            SfpmError::InsufficientLiquidity
        } else {
            SfpmError::NotEnoughLiquidity
        });
    }

    let (g0, g1) = tx.pool(pool_id)?.amm.fee_growth_inside(tick_lower, tick_upper)?;
    let collected = tx.ledger.touch(&key, g0, g1)?;

    let moved = {
        let amm = &mut tx.pool(pool_id)?.amm;
        if adds_liquidity {
            let (amount0, amount1) = amm.mint(tick_lower, tick_upper, chunk)?;
            SignedPair::pack(u128_to_i128(amount0)?, u128_to_i128(amount1)?)
        } else {
            let (amount0, amount1) = amm.burn(tick_lower, tick_upper, chunk)?;
            SignedPair::pack(neg_u128(amount0)?, neg_u128(amount1)?)
        }
    };

    let (g0, g1) = tx.pool(pool_id)?.amm.fee_growth_inside(tick_lower, tick_upper)?;
    if net_before == 0 {
        tx.ledger.touch(&key, g0, g1)?;
    }
    let net_after = tx
        .ledger
        .adjust_liquidity(&key, if adds_liquidity { delta } else { -delta })?;
    if leg.is_long {
        tx.ledger
            .adjust_removed_liquidity(&key, if is_burn { -delta } else { delta })?;
    }
    if net_after == 0 {
        tx.ledger.touch(&key, g0, g1)?;
    }

    let itm = match leg.token_type {
        TokenSide::Token0 => SignedPair::pack(0, moved.token1()),
        TokenSide::Token1 => SignedPair::pack(moved.token0(), 0),
    };

    debug!(
        "{} leg {} of pool {:#x} [{}, {}): liquidity {}, moved {}, collected {}",
        if is_burn { "Burned" } else { "Minted" },
        index,
        pool_id,
        tick_lower,
        tick_upper,
        chunk,
        moved,
        collected
    );

    Ok(LegOutcome {
        index,
        tick_lower,
        tick_upper,
        liquidity: chunk,
        moved,
        collected,
        itm,
        notional: share.notional,
    })
}
