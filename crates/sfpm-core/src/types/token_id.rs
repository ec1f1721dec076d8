//! # TokenId Codec
//!
//! A TokenId packs a 64-bit pool id and up to four 48-bit leg blocks into a
//! single 256-bit word:
//!
//! ```text
//! bits   0..64   pool id
//! bits  64..112  leg 0
//! bits 112..160  leg 1
//! bits 160..208  leg 2
//! bits 208..256  leg 3
//! ```
//!
//! Inside a leg block, from low to high: asset (1), ratio (7), isLong (1),
//! tokenType (1), riskPartner (2), strike (24, two's complement), width
//! (12). A block whose ratio is zero terminates the leg list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ASSET_OFFSET, IS_LONG_OFFSET, LEG_STRIDE, MAX_ENCODED_STRIKE, MAX_LEGS, MAX_RATIO, MAX_TICK,
    MAX_WIDTH, MIN_ENCODED_STRIKE, MIN_TICK, POOL_ID_BITS, RATIO_BITS, RATIO_OFFSET,
    RISK_PARTNER_BITS, RISK_PARTNER_OFFSET, STRIKE_BITS, STRIKE_OFFSET, TOKEN_TYPE_OFFSET,
    WIDTH_BITS, WIDTH_OFFSET,
};
use crate::errors::{LegDefect, SfpmError, SfpmResult};
use crate::math::big_int::U256;
use crate::types::leg::{Leg, TokenSide};

const LEG_MASK: u64 = (1u64 << LEG_STRIDE) - 1;
const STRIKE_MASK: u64 = (1u64 << STRIKE_BITS) - 1;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TokenId(U256);

impl TokenId {
    pub const fn from_bits(bits: U256) -> Self {
        TokenId(bits)
    }

    pub const fn to_bits(self) -> U256 {
        self.0
    }

    pub const fn pool_id(&self) -> u64 {
        self.0.lo as u64
    }

    /// Encode a pool id and up to four legs
    pub fn encode(pool_id: u64, legs: &[Leg]) -> SfpmResult<Self> {
        if legs.len() > MAX_LEGS {
            return Err(SfpmError::TooManyLegs(legs.len()));
        }
        let mut id = TokenId(U256::from_u64(pool_id));
        for (index, leg) in legs.iter().enumerate() {
            id = id.add_leg(index, leg)?;
        }
        Ok(id)
    }

    /// Write `leg` into block `index`, replacing whatever was there
    pub fn add_leg(self, index: usize, leg: &Leg) -> SfpmResult<Self> {
        if index >= MAX_LEGS {
            return Err(SfpmError::TooManyLegs(index + 1));
        }
        let block = encode_block(index, leg)?;
        let shift = leg_shift(index);
        let cleared = self.0 & !(U256::from_u64(LEG_MASK) << shift);
        Ok(TokenId(cleared | (U256::from_u64(block) << shift)))
    }

    /// Pool id and the present legs, stopping at the first zero-ratio block
    pub fn decode(&self) -> (u64, Vec<Leg>) {
        (self.pool_id(), self.legs())
    }

    pub fn legs(&self) -> Vec<Leg> {
        (0..MAX_LEGS)
            .map(|i| self.leg_bits(i))
            .take_while(|block| ratio_of(*block) != 0)
            .map(decode_block)
            .collect()
    }

    pub fn leg_count(&self) -> usize {
        (0..MAX_LEGS)
            .take_while(|i| ratio_of(self.leg_bits(*i)) != 0)
            .count()
    }

    pub fn leg(&self, index: usize) -> Option<Leg> {
        if index < self.leg_count() {
            Some(decode_block(self.leg_bits(index)))
        } else {
            None
        }
    }

    /// Raw 48-bit block of leg `index`
    pub fn leg_bits(&self, index: usize) -> u64 {
        if index >= MAX_LEGS {
            return 0;
        }
        ((self.0 >> leg_shift(index)).lo as u64) & LEG_MASK
    }

    // Field accessors read the raw block and ignore the terminator.

    pub fn asset(&self, index: usize) -> TokenSide {
        TokenSide::from_bit(field(self.leg_bits(index), ASSET_OFFSET, 1) == 1)
    }

    pub fn ratio(&self, index: usize) -> u8 {
        ratio_of(self.leg_bits(index))
    }

    pub fn is_long(&self, index: usize) -> bool {
        field(self.leg_bits(index), IS_LONG_OFFSET, 1) == 1
    }

    pub fn token_type(&self, index: usize) -> TokenSide {
        TokenSide::from_bit(field(self.leg_bits(index), TOKEN_TYPE_OFFSET, 1) == 1)
    }

    pub fn risk_partner(&self, index: usize) -> u8 {
        field(self.leg_bits(index), RISK_PARTNER_OFFSET, RISK_PARTNER_BITS) as u8
    }

    pub fn strike(&self, index: usize) -> i32 {
        strike_of(self.leg_bits(index))
    }

    pub fn width(&self, index: usize) -> u16 {
        field(self.leg_bits(index), WIDTH_OFFSET, WIDTH_BITS) as u16
    }

    /// Structural validation of the encoded position.
    ///
    /// Checks run rule by rule across all legs, so the first reported
    /// defect is the lowest-numbered rule that fails. Pool registration is
    /// the caller's concern; only a zero pool id is rejected here.
    pub fn validate(&self, tick_spacing: i32, max_width: u16) -> SfpmResult<Vec<Leg>> {
        if self.pool_id() == 0 {
            return Err(SfpmError::invalid_leg(LegDefect::ZeroPoolId, 0));
        }
        let legs = self.legs();
        if legs.is_empty() {
            return Err(SfpmError::invalid_leg(LegDefect::NoLegs, 0));
        }
        if let Some(index) = (legs.len()..MAX_LEGS).find(|i| self.leg_bits(*i) != 0) {
            return Err(SfpmError::invalid_leg(LegDefect::TrailingData, index));
        }
        validate_legs(&legs, tick_spacing, max_width)?;
        Ok(legs)
    }
}

/// Validate a decoded leg list against the pool's tick spacing
pub fn validate_legs(legs: &[Leg], tick_spacing: i32, max_width: u16) -> SfpmResult<()> {
    if legs.is_empty() {
        return Err(SfpmError::invalid_leg(LegDefect::NoLegs, 0));
    }
    if legs.len() > MAX_LEGS {
        return Err(SfpmError::TooManyLegs(legs.len()));
    }
    let max_width = max_width.min(MAX_WIDTH);

    for (i, leg) in legs.iter().enumerate() {
        if leg.ratio == 0 {
            return Err(SfpmError::invalid_leg(LegDefect::ZeroRatio, i));
        }
        if leg.width == 0 {
            return Err(SfpmError::invalid_leg(LegDefect::ZeroWidth, i));
        }
        if leg.width > max_width {
            return Err(SfpmError::invalid_leg(LegDefect::WidthTooLarge, i));
        }
    }

    for (i, leg) in legs.iter().enumerate() {
        if !(MIN_TICK..=MAX_TICK).contains(&leg.strike) {
            return Err(SfpmError::invalid_leg(LegDefect::StrikeOutOfRange, i));
        }
        let in_domain = leg
            .tick_span(tick_spacing)
            .is_some_and(|(lower, upper)| lower >= MIN_TICK && upper <= MAX_TICK);
        if !in_domain {
            return Err(SfpmError::invalid_leg(LegDefect::RangeOutOfBounds, i));
        }
    }

    for (i, leg) in legs.iter().enumerate() {
        let partner = leg.risk_partner as usize;
        if partner >= legs.len() {
            return Err(SfpmError::invalid_leg(LegDefect::PartnerOutOfRange, i));
        }
        if legs[partner].risk_partner as usize != i {
            return Err(SfpmError::invalid_leg(LegDefect::PartnerNotSymmetric, i));
        }
    }

    for (i, leg) in legs.iter().enumerate() {
        let partner = leg.risk_partner as usize;
        if partner == i {
            continue;
        }
        let other = &legs[partner];
        if other.ratio != leg.ratio {
            return Err(SfpmError::invalid_leg(LegDefect::PartnerRatioMismatch, i));
        }
        if other.token_type != leg.token_type {
            return Err(SfpmError::invalid_leg(LegDefect::PartnerTokenTypeMismatch, i));
        }
        if other.is_long == leg.is_long {
            return Err(SfpmError::invalid_leg(LegDefect::PartnerSameDirection, i));
        }
    }

    Ok(())
}

const fn leg_shift(index: usize) -> u32 {
    POOL_ID_BITS + LEG_STRIDE * index as u32
}

const fn field(block: u64, offset: u32, bits: u32) -> u64 {
    (block >> offset) & ((1u64 << bits) - 1)
}

const fn ratio_of(block: u64) -> u8 {
    field(block, RATIO_OFFSET, RATIO_BITS) as u8
}

const fn strike_of(block: u64) -> i32 {
    let raw = field(block, STRIKE_OFFSET, STRIKE_BITS) as i32;
    if raw > MAX_ENCODED_STRIKE {
        raw - (1 << STRIKE_BITS)
    } else {
        raw
    }
}

fn encode_block(index: usize, leg: &Leg) -> SfpmResult<u64> {
    if leg.ratio == 0 {
        return Err(SfpmError::invalid_leg(LegDefect::ZeroRatio, index));
    }
    let fits = leg.ratio <= MAX_RATIO
        && leg.risk_partner < (1 << RISK_PARTNER_BITS)
        && (MIN_ENCODED_STRIKE..=MAX_ENCODED_STRIKE).contains(&leg.strike)
        && leg.width <= MAX_WIDTH;
    if !fits {
        return Err(SfpmError::invalid_leg(LegDefect::FieldOverflow, index));
    }

    let strike_bits = (leg.strike as i64 as u64) & STRIKE_MASK;
    Ok(((leg.asset.bit() as u64) << ASSET_OFFSET)
        | ((leg.ratio as u64) << RATIO_OFFSET)
        | ((leg.is_long as u64) << IS_LONG_OFFSET)
        | ((leg.token_type.bit() as u64) << TOKEN_TYPE_OFFSET)
        | ((leg.risk_partner as u64) << RISK_PARTNER_OFFSET)
        | (strike_bits << STRIKE_OFFSET)
        | ((leg.width as u64) << WIDTH_OFFSET))
}

fn decode_block(block: u64) -> Leg {
    Leg {
        asset: TokenSide::from_bit(field(block, ASSET_OFFSET, 1) == 1),
        ratio: ratio_of(block),
        is_long: field(block, IS_LONG_OFFSET, 1) == 1,
        token_type: TokenSide::from_bit(field(block, TOKEN_TYPE_OFFSET, 1) == 1),
        risk_partner: field(block, RISK_PARTNER_OFFSET, RISK_PARTNER_BITS) as u8,
        strike: strike_of(block),
        width: field(block, WIDTH_OFFSET, WIDTH_BITS) as u16,
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId(pool={:#x}, legs={:?})", self.pool_id(), self.legs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: u64 = 0xdead_beef_0000_0001;

    fn short_put() -> Leg {
        Leg::new(0, TokenSide::Token1, false, -100, 2)
    }

    #[test]
    fn test_encode_layout() {
        let id = TokenId::encode(POOL, &[short_put()]).unwrap();
        let bits = id.to_bits();
        assert_eq!(bits.lo as u64, POOL);
        let block = id.leg_bits(0);
        // asset=1, ratio=1, tokenType=1
        assert_eq!(block & 0x3ff, 0b10_0000_0011);
        assert_eq!((block >> 12) & STRIKE_MASK, (1 << 24) - 100);
        assert_eq!(block >> 36, 2);
    }

    #[test]
    fn test_decode_round_trip_multi_leg() {
        let legs = vec![
            Leg::new(0, TokenSide::Token0, false, 1200, 4).with_partner(1).with_ratio(3),
            Leg::new(1, TokenSide::Token0, true, 1500, 4).with_partner(0).with_ratio(3),
            Leg::new(2, TokenSide::Token1, false, MIN_ENCODED_STRIKE, MAX_WIDTH)
                .with_asset(TokenSide::Token0),
        ];
        let id = TokenId::encode(POOL, &legs).unwrap();
        assert_eq!(id.decode(), (POOL, legs));
        assert_eq!(id.leg_count(), 3);
        assert_eq!(id.leg(3), None);
        assert_eq!(id.strike(2), MIN_ENCODED_STRIKE);
        assert_eq!(id.width(2), MAX_WIDTH);
    }

    #[test]
    fn test_too_many_legs() {
        let legs = vec![short_put(); 5];
        assert_eq!(TokenId::encode(POOL, &legs), Err(SfpmError::TooManyLegs(5)));
    }

    #[test]
    fn test_encode_rejects_oversized_fields() {
        let wide = Leg::new(0, TokenSide::Token0, false, 0, MAX_WIDTH + 1);
        assert_eq!(
            TokenId::encode(POOL, &[wide]),
            Err(SfpmError::invalid_leg(LegDefect::FieldOverflow, 0))
        );
        let big_ratio = short_put().with_ratio(128);
        assert_eq!(
            TokenId::encode(POOL, &[short_put(), big_ratio.with_partner(1)]),
            Err(SfpmError::invalid_leg(LegDefect::FieldOverflow, 1))
        );
    }

    #[test]
    fn test_zero_ratio_terminates() {
        let id = TokenId::encode(POOL, &[short_put()]).unwrap();
        // garbage in leg 2 with leg 1 empty
        let dirty = TokenId::from_bits(id.to_bits() | (U256::from_u64(1 << 12) << leg_shift(2)));
        assert_eq!(dirty.legs().len(), 1);
        assert_eq!(
            dirty.validate(10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::TrailingData, 2))
        );
    }

    #[test]
    fn test_validate_rules() {
        let zero_pool = TokenId::encode(0, &[short_put()]).unwrap();
        assert_eq!(
            zero_pool.validate(10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::ZeroPoolId, 0))
        );

        let empty = TokenId::encode(POOL, &[]).unwrap();
        assert_eq!(
            empty.validate(10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::NoLegs, 0))
        );

        let zero_width = TokenId::encode(POOL, &[Leg::new(0, TokenSide::Token0, false, 0, 0)]).unwrap();
        assert_eq!(
            zero_width.validate(10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::ZeroWidth, 0))
        );

        let narrow_limit = TokenId::encode(POOL, &[short_put()]).unwrap();
        assert_eq!(
            narrow_limit.validate(10, 1),
            Err(SfpmError::invalid_leg(LegDefect::WidthTooLarge, 0))
        );

        let far = TokenId::encode(POOL, &[Leg::new(0, TokenSide::Token0, false, 887_270, 2)]).unwrap();
        assert_eq!(
            far.validate(10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::RangeOutOfBounds, 0))
        );

        let beyond = TokenId::encode(POOL, &[Leg::new(0, TokenSide::Token0, false, 900_000, 2)]).unwrap();
        assert_eq!(
            beyond.validate(10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::StrikeOutOfRange, 0))
        );
    }

    #[test]
    fn test_validate_partners() {
        let a = Leg::new(0, TokenSide::Token0, false, 100, 2).with_partner(1);
        let b = Leg::new(1, TokenSide::Token0, true, 200, 2).with_partner(0);
        assert!(validate_legs(&[a, b], 10, MAX_WIDTH).is_ok());

        assert_eq!(
            validate_legs(&[a, b.with_partner(1)], 10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::PartnerNotSymmetric, 0))
        );
        assert_eq!(
            validate_legs(&[a.with_partner(3), b], 10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::PartnerOutOfRange, 0))
        );
        assert_eq!(
            validate_legs(&[a, b.with_ratio(2)], 10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::PartnerRatioMismatch, 0))
        );
        let b_other_type = Leg { token_type: TokenSide::Token1, ..b };
        assert_eq!(
            validate_legs(&[a, b_other_type], 10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::PartnerTokenTypeMismatch, 0))
        );
        assert_eq!(
            validate_legs(&[a, b.flipped()], 10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::PartnerSameDirection, 0))
        );
    }

    #[test]
    fn test_overflowing_span_reported_as_range_defect() {
        let wide = Leg::new(0, TokenSide::Token1, false, 0, 4_000);
        assert_eq!(
            validate_legs(&[wide], 600_000, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::RangeOutOfBounds, 0))
        );
    }

    #[test]
    fn test_width_rule_reported_before_partner_rule() {
        let a = Leg::new(0, TokenSide::Token0, false, 100, 2).with_partner(1);
        let b = Leg::new(1, TokenSide::Token0, false, 200, 0).with_partner(1);
        assert_eq!(
            validate_legs(&[a, b], 10, MAX_WIDTH),
            Err(SfpmError::invalid_leg(LegDefect::ZeroWidth, 1))
        );
    }
}
