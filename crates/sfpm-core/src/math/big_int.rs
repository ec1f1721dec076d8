//! Big integer operations for high-precision math
//!
//! This module provides the U256 type used for Q64.96 sqrt prices, Q128
//! fee growth and TokenId bit storage, plus an exact 512-bit `mul_div`.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not, Shl, Shr};

use serde::{Deserialize, Serialize};

use crate::errors::{SfpmError, SfpmResult};

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// Round down (towards zero)
    Down,
    /// Round up (away from zero)
    Up,
}

/// 256-bit unsigned integer
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct U256 {
    /// Low 128 bits
    pub lo: u128,
    /// High 128 bits
    pub hi: u128,
}

impl U256 {
    pub const ZERO: U256 = U256::new(0, 0);
    pub const ONE: U256 = U256::new(1, 0);
    pub const MAX: U256 = U256::new(u128::MAX, u128::MAX);

    /// Create a new U256 from low and high parts
    pub const fn new(lo: u128, hi: u128) -> Self {
        Self { lo, hi }
    }

    /// Create from a single u128 value
    pub const fn from_u128(value: u128) -> Self {
        Self { lo: value, hi: 0 }
    }

    /// Create from a single u64 value
    pub const fn from_u64(value: u64) -> Self {
        Self {
            lo: value as u128,
            hi: 0,
        }
    }

    /// Check if the value is zero
    pub const fn is_zero(&self) -> bool {
        self.lo == 0 && self.hi == 0
    }

    /// Convert to u128, returning None if overflow
    pub const fn to_u128(&self) -> Option<u128> {
        if self.hi == 0 {
            Some(self.lo)
        } else {
            None
        }
    }

    /// Little-endian 64-bit limbs
    const fn to_limbs(self) -> [u64; 4] {
        [
            self.lo as u64,
            (self.lo >> 64) as u64,
            self.hi as u64,
            (self.hi >> 64) as u64,
        ]
    }

    const fn from_limbs(limbs: [u64; 4]) -> Self {
        Self {
            lo: (limbs[0] as u128) | ((limbs[1] as u128) << 64),
            hi: (limbs[2] as u128) | ((limbs[3] as u128) << 64),
        }
    }

    pub fn overflowing_add(self, other: U256) -> (U256, bool) {
        let (lo, carry) = self.lo.overflowing_add(other.lo);
        let (hi, o1) = self.hi.overflowing_add(other.hi);
        let (hi, o2) = hi.overflowing_add(carry as u128);
        (U256::new(lo, hi), o1 || o2)
    }

    pub fn overflowing_sub(self, other: U256) -> (U256, bool) {
        let (lo, borrow) = self.lo.overflowing_sub(other.lo);
        let (hi, o1) = self.hi.overflowing_sub(other.hi);
        let (hi, o2) = hi.overflowing_sub(borrow as u128);
        (U256::new(lo, hi), o1 || o2)
    }

    pub fn checked_add(self, other: U256) -> Option<U256> {
        match self.overflowing_add(other) {
            (v, false) => Some(v),
            _ => None,
        }
    }

    pub fn checked_sub(self, other: U256) -> Option<U256> {
        match self.overflowing_sub(other) {
            (v, false) => Some(v),
            _ => None,
        }
    }

    /// Modular addition, used by fee growth counters
    pub fn wrapping_add(self, other: U256) -> U256 {
        self.overflowing_add(other).0
    }

    /// Modular subtraction, used by fee growth counters
    pub fn wrapping_sub(self, other: U256) -> U256 {
        self.overflowing_sub(other).0
    }

    pub fn checked_mul(self, other: U256) -> Option<U256> {
        let (high, low) = full_mul(self, other);
        if high.is_zero() {
            Some(low)
        } else {
            None
        }
    }

    pub fn bit(&self, index: u32) -> bool {
        if index < 128 {
            (self.lo >> index) & 1 == 1
        } else if index < 256 {
            (self.hi >> (index - 128)) & 1 == 1
        } else {
            false
        }
    }

    pub fn set_bit(&mut self, index: u32) {
        if index < 128 {
            self.lo |= 1u128 << index;
        } else if index < 256 {
            self.hi |= 1u128 << (index - 128);
        }
    }

    /// Number of significant bits
    pub fn bits(&self) -> u32 {
        if self.hi != 0 {
            256 - self.hi.leading_zeros()
        } else {
            128 - self.lo.leading_zeros()
        }
    }

    /// Quotient and remainder, None on a zero divisor
    pub fn div_rem(self, divisor: U256) -> Option<(U256, U256)> {
        if divisor.is_zero() {
            return None;
        }
        if self < divisor {
            return Some((U256::ZERO, self));
        }
        if self.hi == 0 && divisor.hi == 0 {
            return Some((
                U256::from_u128(self.lo / divisor.lo),
                U256::from_u128(self.lo % divisor.lo),
            ));
        }
        Some(long_divide(U256::ZERO, self, divisor, self.bits()))
    }

    /// Divide by a small divisor, returning the remainder as u64
    pub fn div_rem_u64(self, divisor: u64) -> Option<(U256, u64)> {
        if divisor == 0 {
            return None;
        }
        let limbs = self.to_limbs();
        let mut out = [0u64; 4];
        let mut rem: u128 = 0;
        for i in (0..4).rev() {
            let cur = (rem << 64) | limbs[i] as u128;
            out[i] = (cur / divisor as u128) as u64;
            rem = cur % divisor as u128;
        }
        Some((U256::from_limbs(out), rem as u64))
    }

    /// Big-endian byte representation
    pub fn to_be_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..16].copy_from_slice(&self.hi.to_be_bytes());
        out[16..].copy_from_slice(&self.lo.to_be_bytes());
        out
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut hi = [0u8; 16];
        let mut lo = [0u8; 16];
        hi.copy_from_slice(&bytes[..16]);
        lo.copy_from_slice(&bytes[16..]);
        U256::new(u128::from_be_bytes(lo), u128::from_be_bytes(hi))
    }
}

/// Full 512-bit product as (high, low)
pub fn full_mul(a: U256, b: U256) -> (U256, U256) {
    let r = mul_limbs(a, b);
    (
        U256::from_limbs([r[4], r[5], r[6], r[7]]),
        U256::from_limbs([r[0], r[1], r[2], r[3]]),
    )
}

fn mul_limbs(a: U256, b: U256) -> [u64; 8] {
    let a = a.to_limbs();
    let b = b.to_limbs();
    let mut r = [0u64; 8];
    for i in 0..4 {
        if a[i] == 0 {
            continue;
        }
        let mut carry: u128 = 0;
        for j in 0..4 {
            let t = (a[i] as u128) * (b[j] as u128) + r[i + j] as u128 + carry;
            r[i + j] = t as u64;
            carry = t >> 64;
        }
        r[i + 4] = carry as u64;
    }
    r
}

/// Multiply two u128 values to a U256 result
pub fn mul_u128_to_u256(a: u128, b: u128) -> U256 {
    full_mul(U256::from_u128(a), U256::from_u128(b)).1
}

/// (a * b) >> 128, None if the result does not fit in 256 bits
pub fn mul_shr_128(a: U256, b: U256) -> Option<U256> {
    let r = mul_limbs(a, b);
    if r[6] != 0 || r[7] != 0 {
        return None;
    }
    Some(U256::from_limbs([r[2], r[3], r[4], r[5]]))
}

/// Shift-subtract division of the 512-bit value `(high, low)` by `divisor`.
/// `high` must already be below `divisor`; only the low `bits` of `low` are
/// fed in.
fn long_divide(high: U256, low: U256, divisor: U256, bits: u32) -> (U256, U256) {
    let mut quotient = U256::ZERO;
    let mut rem = high;
    for i in (0..bits).rev() {
        let carry = rem.bit(255);
        rem = rem << 1;
        if low.bit(i) {
            rem.lo |= 1;
        }
        if carry || rem >= divisor {
            rem = rem.wrapping_sub(divisor);
            quotient.set_bit(i);
        }
    }
    (quotient, rem)
}

/// Compute (a * b) / denominator with a 512-bit intermediate
pub fn mul_div(a: U256, b: U256, denominator: U256, rounding: Rounding) -> SfpmResult<U256> {
    if denominator.is_zero() {
        return Err(SfpmError::DivisionByZero);
    }
    let (high, low) = full_mul(a, b);
    let (quotient, rem) = if high.is_zero() {
        low.div_rem(denominator).ok_or(SfpmError::DivisionByZero)?
    } else {
        if high >= denominator {
            return Err(SfpmError::MathOverflow);
        }
        long_divide(high, low, denominator, 256)
    };

    match rounding {
        Rounding::Up if !rem.is_zero() => quotient
            .checked_add(U256::ONE)
            .ok_or(SfpmError::MathOverflow),
        _ => Ok(quotient),
    }
}

/// u128 convenience wrapper around [`mul_div`]
pub fn mul_div_u128(a: u128, b: u128, denominator: u128, rounding: Rounding) -> SfpmResult<u128> {
    mul_div(
        U256::from_u128(a),
        U256::from_u128(b),
        U256::from_u128(denominator),
        rounding,
    )?
    .to_u128()
    .ok_or(SfpmError::MathOverflow)
}

/// Ceiling division
pub fn div_rounding_up(a: U256, b: U256) -> SfpmResult<U256> {
    let (q, r) = a.div_rem(b).ok_or(SfpmError::DivisionByZero)?;
    if r.is_zero() {
        Ok(q)
    } else {
        q.checked_add(U256::ONE).ok_or(SfpmError::MathOverflow)
    }
}

impl Ord for U256 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hi.cmp(&other.hi).then(self.lo.cmp(&other.lo))
    }
}

impl PartialOrd for U256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Shl<u32> for U256 {
    type Output = U256;

    fn shl(self, shift: u32) -> U256 {
        match shift {
            0 => self,
            1..=127 => U256::new(
                self.lo << shift,
                (self.hi << shift) | (self.lo >> (128 - shift)),
            ),
            128..=255 => U256::new(0, self.lo << (shift - 128)),
            _ => U256::ZERO,
        }
    }
}

impl Shr<u32> for U256 {
    type Output = U256;

    fn shr(self, shift: u32) -> U256 {
        match shift {
            0 => self,
            1..=127 => U256::new(
                (self.lo >> shift) | (self.hi << (128 - shift)),
                self.hi >> shift,
            ),
            128..=255 => U256::new(self.hi >> (shift - 128), 0),
            _ => U256::ZERO,
        }
    }
}

impl BitAnd for U256 {
    type Output = U256;

    fn bitand(self, rhs: U256) -> U256 {
        U256::new(self.lo & rhs.lo, self.hi & rhs.hi)
    }
}

impl BitOr for U256 {
    type Output = U256;

    fn bitor(self, rhs: U256) -> U256 {
        U256::new(self.lo | rhs.lo, self.hi | rhs.hi)
    }
}

impl BitXor for U256 {
    type Output = U256;

    fn bitxor(self, rhs: U256) -> U256 {
        U256::new(self.lo ^ rhs.lo, self.hi ^ rhs.hi)
    }
}

impl Not for U256 {
    type Output = U256;

    fn not(self) -> U256 {
        U256::new(!self.lo, !self.hi)
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        U256::from_u128(value)
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        U256::from_u64(value)
    }
}

impl From<u32> for U256 {
    fn from(value: u32) -> Self {
        U256::from_u128(value as u128)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.to_u128() {
            return write!(f, "{}", v);
        }
        const CHUNK: u64 = 10_000_000_000_000_000_000;
        let mut chunks = Vec::new();
        let mut rest = *self;
        while !rest.is_zero() {
            // CHUNK is non-zero
            let (q, r) = rest.div_rem_u64(CHUNK).unwrap_or((U256::ZERO, 0));
            chunks.push(r);
            rest = q;
        }
        let mut out = String::new();
        for (i, chunk) in chunks.iter().rev().enumerate() {
            if i == 0 {
                out.push_str(&chunk.to_string());
            } else {
                out.push_str(&format!("{:019}", chunk));
            }
        }
        f.pad_integral(true, "", &out)
    }
}

impl fmt::LowerHex for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = if self.hi == 0 {
            format!("{:x}", self.lo)
        } else {
            format!("{:x}{:032x}", self.hi, self.lo)
        };
        f.pad_integral(true, "0x", &digits)
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({:#x})", self)
    }
}
