//! # Protocol Constants
//!
//! Fixed-point scales, tick domain bounds and TokenId bit layout.

use crate::math::big_int::U256;

// ============================================================================
// Mathematical Constants
// ============================================================================

/// Q96 fixed-point scale used by sqrt prices: 2^96
pub const Q96: u128 = 1u128 << 96;

/// Q128 fixed-point scale used by fee growth: 2^128
pub const Q128: U256 = U256::new(0, 1);

/// Q192 = 2^192, price scale of a squared Q64.96 value
pub const Q192: U256 = U256::new(0, 1u128 << 64);

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Fee pips denominator (1,000,000 = 100%)
pub const FEE_PIPS_DENOMINATOR: u32 = 1_000_000;

// ============================================================================
// Tick Domain
// ============================================================================

/// Minimum tick supported by the AMM
pub const MIN_TICK: i32 = -887_272;

/// Maximum tick supported by the AMM
pub const MAX_TICK: i32 = 887_272;

/// Largest tick spacing a pool may use
pub const MAX_TICK_SPACING: i32 = MAX_TICK / 2;

/// sqrt(1.0001^MIN_TICK) in Q64.96
pub const MIN_SQRT_RATIO: U256 = U256::new(4_295_128_739, 0);

/// sqrt(1.0001^MAX_TICK) in Q64.96
pub const MAX_SQRT_RATIO: U256 = U256::new(
    0xefd1fc6a506488495d951d5263988d26,
    0xfffd8963,
);

// ============================================================================
// TokenId Layout
// ============================================================================

/// Maximum number of legs packed into one TokenId
pub const MAX_LEGS: usize = 4;

/// Bits reserved for the pool id at the bottom of a TokenId
pub const POOL_ID_BITS: u32 = 64;

/// Stride between consecutive leg blocks
pub const LEG_STRIDE: u32 = 48;

pub const ASSET_OFFSET: u32 = 0;
pub const RATIO_OFFSET: u32 = 1;
pub const RATIO_BITS: u32 = 7;
pub const IS_LONG_OFFSET: u32 = 8;
pub const TOKEN_TYPE_OFFSET: u32 = 9;
pub const RISK_PARTNER_OFFSET: u32 = 10;
pub const RISK_PARTNER_BITS: u32 = 2;
pub const STRIKE_OFFSET: u32 = 12;
pub const STRIKE_BITS: u32 = 24;
pub const WIDTH_OFFSET: u32 = 36;

/// Bits left for width before the next leg block starts
pub const WIDTH_BITS: u32 = LEG_STRIDE - WIDTH_OFFSET;

/// Largest width that does not spill into the next leg
pub const MAX_WIDTH: u16 = (1u16 << WIDTH_BITS) - 1;

/// Largest ratio representable in 7 bits
pub const MAX_RATIO: u8 = (1u8 << RATIO_BITS) - 1;

/// Strike range representable in 24-bit two's complement
pub const MIN_ENCODED_STRIKE: i32 = -(1 << (STRIKE_BITS - 1));
pub const MAX_ENCODED_STRIKE: i32 = (1 << (STRIKE_BITS - 1)) - 1;
