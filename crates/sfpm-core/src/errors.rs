//! # Core Error Types
//!
//! Every fallible operation in the crate returns [`SfpmResult`]. A failure
//! aborts the whole multi-leg operation; staged state is discarded by the
//! engine before the error reaches the caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural defect found while encoding or validating a TokenId.
///
/// The numeric [`code`](LegDefect::code) is stable and is what off-chain
/// tooling should match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegDefect {
    /// Pool id bits are all zero
    ZeroPoolId,
    /// First leg is empty
    NoLegs,
    /// A present leg has ratio 0
    ZeroRatio,
    /// A present leg has width 0
    ZeroWidth,
    /// Non-zero bits follow the terminating leg
    TrailingData,
    /// Width exceeds the configured or representable limit
    WidthTooLarge,
    /// Strike lies outside the tick domain
    StrikeOutOfRange,
    /// Strike +/- half width leaves the tick domain
    RangeOutOfBounds,
    /// Risk partner points at a leg that is not present
    PartnerOutOfRange,
    /// Risk partner does not point back
    PartnerNotSymmetric,
    /// Partnered legs differ in ratio
    PartnerRatioMismatch,
    /// Partnered legs differ in token type
    PartnerTokenTypeMismatch,
    /// Partnered legs are both long or both short
    PartnerSameDirection,
    /// A field does not fit its bit range
    FieldOverflow,
    /// Two TokenIds that must share a pool do not
    PoolMismatch,
}

impl LegDefect {
    pub const fn code(&self) -> u8 {
        match self {
            LegDefect::ZeroPoolId => 0,
            LegDefect::NoLegs => 1,
            LegDefect::ZeroRatio => 2,
            LegDefect::ZeroWidth => 3,
            LegDefect::TrailingData => 4,
            LegDefect::WidthTooLarge => 5,
            LegDefect::StrikeOutOfRange => 6,
            LegDefect::RangeOutOfBounds => 7,
            LegDefect::PartnerOutOfRange => 8,
            LegDefect::PartnerNotSymmetric => 9,
            LegDefect::PartnerRatioMismatch => 10,
            LegDefect::PartnerTokenTypeMismatch => 11,
            LegDefect::PartnerSameDirection => 12,
            LegDefect::FieldOverflow => 13,
            LegDefect::PoolMismatch => 14,
        }
    }
}

/// Errors raised by the position manager core
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SfpmError {
    // ========================================================================
    // TokenId / Validation Errors
    // ========================================================================
    #[error("Invalid TokenId parameter: {reason:?} (code {}) at leg {leg}", .reason.code())]
    InvalidTokenIdParameter { reason: LegDefect, leg: u8 },

    #[error("Too many legs: {0} (max 4)")]
    TooManyLegs(usize),

    #[error("Pool {0:#x} is not initialized")]
    UniswapPoolNotInitialized(u64),

    #[error("Pool {0:#x} is already initialized")]
    PoolAlreadyInitialized(u64),

    // ========================================================================
    // Position Errors
    // ========================================================================
    #[error("Options balance is zero")]
    OptionsBalanceZero,

    #[error("Balance exceeded: held {held}, requested {requested}")]
    BalanceExceeded { held: u128, requested: u128 },

    #[error("Price bound violated")]
    PriceBoundFail,

    #[error("Not enough liquidity in the AMM for the requested range")]
    NotEnoughLiquidity,

    #[error("Insufficient liquidity in ledger entry")]
    InsufficientLiquidity,

    #[error("Transfer failed")]
    TransferFailed,

    #[error("Insufficient collateral")]
    InsufficientCollateral,

    #[error("Signed pair overflow")]
    Overflow,

    // ========================================================================
    // Math Errors
    // ========================================================================
    #[error("Math overflow")]
    MathOverflow,

    #[error("Math underflow")]
    MathUnderflow,

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid tick: {0}")]
    InvalidTick(i32),

    #[error("Invalid sqrt price")]
    InvalidSqrtPrice,

    #[error("Invalid price range")]
    InvalidPriceRange,

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for core operations
pub type SfpmResult<T> = Result<T, SfpmError>;

impl SfpmError {
    pub fn invalid_leg(reason: LegDefect, leg: usize) -> Self {
        SfpmError::InvalidTokenIdParameter {
            reason,
            leg: leg as u8,
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SfpmError::InvalidConfig(msg.into())
    }

    pub fn invalid_parameter(name: &str, value: &str, expected: &str) -> Self {
        SfpmError::InvalidConfig(format!("{} = {} (expected {})", name, value, expected))
    }
}
