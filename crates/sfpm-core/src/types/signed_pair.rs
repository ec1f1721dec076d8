//! # Signed Pair
//!
//! Two independent `i128` quantities packed into one 256-bit word: token0
//! in the low half, token1 in the high half. Arithmetic is checked per half
//! and never wraps.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{SfpmError, SfpmResult};
use crate::math::big_int::U256;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SignedPair(U256);

impl SignedPair {
    pub const ZERO: SignedPair = SignedPair(U256::ZERO);

    pub const fn pack(token0: i128, token1: i128) -> Self {
        SignedPair(U256::new(token0 as u128, token1 as u128))
    }

    pub const fn unpack(self) -> (i128, i128) {
        (self.token0(), self.token1())
    }

    pub const fn token0(&self) -> i128 {
        self.0.lo as i128
    }

    pub const fn token1(&self) -> i128 {
        self.0.hi as i128
    }

    pub const fn from_bits(bits: U256) -> Self {
        SignedPair(bits)
    }

    pub const fn to_bits(self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(self, other: SignedPair) -> SfpmResult<SignedPair> {
        let token0 = self
            .token0()
            .checked_add(other.token0())
            .ok_or(SfpmError::Overflow)?;
        let token1 = self
            .token1()
            .checked_add(other.token1())
            .ok_or(SfpmError::Overflow)?;
        Ok(SignedPair::pack(token0, token1))
    }

    pub fn sub(self, other: SignedPair) -> SfpmResult<SignedPair> {
        let token0 = self
            .token0()
            .checked_sub(other.token0())
            .ok_or(SfpmError::Overflow)?;
        let token1 = self
            .token1()
            .checked_sub(other.token1())
            .ok_or(SfpmError::Overflow)?;
        Ok(SignedPair::pack(token0, token1))
    }

    pub fn negate(self) -> SfpmResult<SignedPair> {
        let token0 = self.token0().checked_neg().ok_or(SfpmError::Overflow)?;
        let token1 = self.token1().checked_neg().ok_or(SfpmError::Overflow)?;
        Ok(SignedPair::pack(token0, token1))
    }

    /// Sum a sequence of pairs, failing on the first overflow
    pub fn sum<I: IntoIterator<Item = SignedPair>>(pairs: I) -> SfpmResult<SignedPair> {
        pairs
            .into_iter()
            .try_fold(SignedPair::ZERO, |acc, pair| acc.add(pair))
    }
}

impl fmt::Debug for SignedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedPair({}, {})", self.token0(), self.token1())
    }
}

impl fmt::Display for SignedPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.token0(), self.token1())
    }
}
