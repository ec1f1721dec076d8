//! # Option Legs
//!
//! A leg is one strike/width/direction component of a position. Its tick
//! range in the AMM is `strike - width*spacing/2 .. strike + width*spacing/2`.

use serde::{Deserialize, Serialize};

use crate::config::validate_tick_spacing;
use crate::constants::{MAX_TICK, MIN_TICK};
use crate::errors::{SfpmError, SfpmResult};

/// Which of the pool's two tokens a field refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TokenSide {
    Token0,
    Token1,
}

impl TokenSide {
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            TokenSide::Token1
        } else {
            TokenSide::Token0
        }
    }

    pub const fn bit(self) -> bool {
        matches!(self, TokenSide::Token1)
    }

    pub const fn index(self) -> usize {
        match self {
            TokenSide::Token0 => 0,
            TokenSide::Token1 => 1,
        }
    }

    pub const fn other(self) -> Self {
        match self {
            TokenSide::Token0 => TokenSide::Token1,
            TokenSide::Token1 => TokenSide::Token0,
        }
    }
}

/// Decoded view of one leg block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leg {
    /// Token the notional `size * ratio` is denominated in
    pub asset: TokenSide,
    /// Relative sizing, at least 1
    pub ratio: u8,
    /// Buyer (removes liquidity) when true, seller (adds liquidity) when false
    pub is_long: bool,
    /// Token the option settles in; call vs put
    pub token_type: TokenSide,
    /// Index of the paired leg, own index when unpaired
    pub risk_partner: u8,
    /// Center of the range in ticks
    pub strike: i32,
    /// Full range width in tick-spacing units
    pub width: u16,
}

impl Leg {
    /// Unpaired ratio-1 leg whose asset matches its token type
    pub fn new(index: u8, token_type: TokenSide, is_long: bool, strike: i32, width: u16) -> Self {
        Leg {
            asset: token_type,
            ratio: 1,
            is_long,
            token_type,
            risk_partner: index,
            strike,
            width,
        }
    }

    pub fn with_ratio(mut self, ratio: u8) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_asset(mut self, asset: TokenSide) -> Self {
        self.asset = asset;
        self
    }

    pub fn with_partner(mut self, risk_partner: u8) -> Self {
        self.risk_partner = risk_partner;
        self
    }

    /// Distance below and above the strike, in ticks. An odd span puts the
    /// extra tick above the strike. `None` when the span overflows `i32`.
    pub fn range_offsets(&self, tick_spacing: i32) -> Option<(i32, i32)> {
        let span = (self.width as i32).checked_mul(tick_spacing)?;
        let down = span / 2;
        Some((down, span - down))
    }

    /// Tick bounds without alignment or domain checks
    pub fn tick_span(&self, tick_spacing: i32) -> Option<(i32, i32)> {
        let (down, up) = self.range_offsets(tick_spacing)?;
        Some((self.strike.checked_sub(down)?, self.strike.checked_add(up)?))
    }

    /// Tick bounds of the leg's AMM range; both must be multiples of the
    /// pool's tick spacing
    pub fn ticks(&self, tick_spacing: i32) -> SfpmResult<(i32, i32)> {
        validate_tick_spacing(tick_spacing)?;
        let (lower, upper) = self
            .tick_span(tick_spacing)
            .filter(|(lower, upper)| *lower >= MIN_TICK && *upper <= MAX_TICK)
            .ok_or(SfpmError::InvalidPriceRange)?;
        if lower % tick_spacing != 0 || upper % tick_spacing != 0 {
            return Err(SfpmError::PriceBoundFail);
        }
        Ok((lower, upper))
    }

    /// Same leg seen from the opposite side of the trade
    pub fn flipped(mut self) -> Self {
        self.is_long = !self.is_long;
        self
    }
}
