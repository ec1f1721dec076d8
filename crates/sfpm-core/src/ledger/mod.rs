//! # Tick-Range Liquidity Ledger
//!
//! Per `(pool, owner, tokenType, tickLower, tickUpper)` record of the
//! liquidity an account owns in the AMM and the fee checkpoint it was last
//! settled at.
//!
//! Fee accrual happens only in [`LedgerStore::touch`]. Every liquidity
//! change must be preceded by a touch of the same key, otherwise fees earned
//! by the old liquidity would be attributed to the new amount.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::Q128;
use crate::errors::{SfpmError, SfpmResult};
use crate::math::big_int::{mul_div, Rounding, U256};
use crate::math::fee_math::fees_owed;
use crate::math::safe_math::add_liquidity_delta;
use crate::types::{Address, SignedPair, TokenSide};

/// Composite ledger key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub pool_id: u64,
    pub owner: Address,
    pub token_type: TokenSide,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

impl LedgerKey {
    pub fn new(
        pool_id: u64,
        owner: Address,
        token_type: TokenSide,
        tick_lower: i32,
        tick_upper: i32,
    ) -> Self {
        LedgerKey {
            pool_id,
            owner,
            token_type,
            tick_lower,
            tick_upper,
        }
    }

    pub fn with_owner(self, owner: Address) -> Self {
        LedgerKey { owner, ..self }
    }
}

/// State stored per key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Net liquidity currently deployed in the AMM
    pub liquidity: u128,
    /// Liquidity taken out of this range by long legs
    pub removed_liquidity: u128,
    /// `fee_growth_inside_last * liquidity / 2^128`, modulo 2^128
    pub fees_base: SignedPair,
    /// Per-token fee growth inside the range at the last touch
    pub fee_growth_inside_last: [U256; 2],
}

impl LedgerEntry {
    fn rebase(&mut self) {
        self.fees_base = fees_base(self.fee_growth_inside_last, self.liquidity);
    }
}

/// Token-unit fee checkpoint. The growth counters are modular, so only the
/// low 128 bits of the product are kept.
fn fees_base(growth: [U256; 2], liquidity: u128) -> SignedPair {
    let base = |g: U256| {
        mul_div(g, U256::from_u128(liquidity), Q128, Rounding::Down)
            .map(|v| v.lo as i128)
            .unwrap_or(0)
    };
    SignedPair::pack(base(growth[0]), base(growth[1]))
}

fn owed(growth_now: U256, growth_last: U256, liquidity: u128) -> SfpmResult<i128> {
    let amount = fees_owed(growth_now, growth_last, liquidity)?;
    let amount = amount.to_u128().ok_or(SfpmError::Overflow)?;
    i128::try_from(amount).map_err(|_| SfpmError::Overflow)
}

/// Storage seam for ledger entries.
///
/// Implementors provide raw entry access; all accounting rules live in the
/// provided methods so the committed [`Ledger`] and a staging overlay behave
/// identically.
pub trait LedgerStore {
    fn entry(&self, key: &LedgerKey) -> Option<LedgerEntry>;

    fn put(&mut self, key: LedgerKey, entry: LedgerEntry);

    /// Net liquidity, 0 for unknown keys
    fn get_liquidity(&self, key: &LedgerKey) -> u128 {
        self.entry(key).map(|e| e.liquidity).unwrap_or(0)
    }

    /// `(removed, net)` liquidity
    fn get_account_liquidity(&self, key: &LedgerKey) -> (u128, u128) {
        self.entry(key)
            .map(|e| (e.removed_liquidity, e.liquidity))
            .unwrap_or((0, 0))
    }

    fn get_fees_base(&self, key: &LedgerKey) -> (i128, i128) {
        self.entry(key)
            .map(|e| e.fees_base.unpack())
            .unwrap_or((0, 0))
    }

    /// Fees `touch` would realize right now, without moving the checkpoint
    fn project_fees(&self, key: &LedgerKey, growth0: U256, growth1: U256) -> SfpmResult<SignedPair> {
        let entry = self.entry(key).unwrap_or_default();
        Ok(SignedPair::pack(
            owed(growth0, entry.fee_growth_inside_last[0], entry.liquidity)?,
            owed(growth1, entry.fee_growth_inside_last[1], entry.liquidity)?,
        ))
    }

    /// Realize fees since the last checkpoint and advance it
    fn touch(&mut self, key: &LedgerKey, growth0: U256, growth1: U256) -> SfpmResult<SignedPair> {
        let realized = self.project_fees(key, growth0, growth1)?;
        let mut entry = self.entry(key).unwrap_or_default();
        entry.fee_growth_inside_last = [growth0, growth1];
        entry.rebase();
        self.put(*key, entry);
        Ok(realized)
    }

    /// Apply a signed change to net liquidity. Does not touch.
    fn adjust_liquidity(&mut self, key: &LedgerKey, delta: i128) -> SfpmResult<u128> {
        let mut entry = self.entry(key).unwrap_or_default();
        entry.liquidity = add_liquidity_delta(entry.liquidity, delta).map_err(|e| match e {
            SfpmError::MathUnderflow => SfpmError::InsufficientLiquidity,
            other => other,
        })?;
        entry.rebase();
        self.put(*key, entry);
        Ok(entry.liquidity)
    }

    /// Apply a signed change to removed liquidity
    fn adjust_removed_liquidity(&mut self, key: &LedgerKey, delta: i128) -> SfpmResult<u128> {
        let mut entry = self.entry(key).unwrap_or_default();
        entry.removed_liquidity =
            add_liquidity_delta(entry.removed_liquidity, delta).map_err(|e| match e {
                SfpmError::MathUnderflow => SfpmError::InsufficientLiquidity,
                other => other,
            })?;
        self.put(*key, entry);
        Ok(entry.removed_liquidity)
    }

    /// Move liquidity ownership to `to`, settling fees on both sides first.
    /// Returns the fees realized by the sender and by the recipient.
    fn transfer(
        &mut self,
        from: &LedgerKey,
        to: Address,
        net: u128,
        removed: u128,
        growth0: U256,
        growth1: U256,
    ) -> SfpmResult<(SignedPair, SignedPair)> {
        let to_key = from.with_owner(to);
        let from_fees = self.touch(from, growth0, growth1)?;
        let to_fees = self.touch(&to_key, growth0, growth1)?;
        if to_key == *from {
            return Ok((from_fees, to_fees));
        }

        let mut source = self.entry(from).unwrap_or_default();
        if source.liquidity < net || source.removed_liquidity < removed {
            return Err(SfpmError::TransferFailed);
        }
        let mut dest = self.entry(&to_key).unwrap_or_default();

        source.liquidity -= net;
        source.removed_liquidity -= removed;
        dest.liquidity = dest.liquidity.checked_add(net).ok_or(SfpmError::TransferFailed)?;
        dest.removed_liquidity = dest
            .removed_liquidity
            .checked_add(removed)
            .ok_or(SfpmError::TransferFailed)?;
        source.rebase();
        dest.rebase();

        self.put(*from, source);
        self.put(to_key, dest);
        Ok((from_fees, to_fees))
    }
}

/// Committed ledger state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: BTreeMap<LedgerKey, LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LedgerKey, &LedgerEntry)> {
        self.entries.iter()
    }

    pub(crate) fn apply(&mut self, staged: BTreeMap<LedgerKey, LedgerEntry>) {
        self.entries.extend(staged);
    }
}

impl LedgerStore for Ledger {
    fn entry(&self, key: &LedgerKey) -> Option<LedgerEntry> {
        self.entries.get(key).copied()
    }

    fn put(&mut self, key: LedgerKey, entry: LedgerEntry) {
        self.entries.insert(key, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(owner: u64) -> LedgerKey {
        LedgerKey::new(7, Address::from_low_u64(owner), TokenSide::Token0, -120, 120)
    }

    fn growth(tokens_per_liquidity: u128) -> U256 {
        U256::from_u128(tokens_per_liquidity) << 128
    }

    #[test]
    fn test_unknown_key_reads_zero_without_creating() {
        let ledger = Ledger::new();
        assert_eq!(ledger.get_liquidity(&key(1)), 0);
        assert_eq!(ledger.get_fees_base(&key(1)), (0, 0));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_touch_realizes_growth_times_liquidity() {
        let mut ledger = Ledger::new();
        let k = key(1);
        assert!(ledger.touch(&k, U256::ZERO, U256::ZERO).unwrap().is_zero());
        ledger.adjust_liquidity(&k, 1_000).unwrap();

        let fees = ledger.touch(&k, growth(3), growth(5)).unwrap();
        assert_eq!(fees.unpack(), (3_000, 5_000));
        assert_eq!(ledger.get_fees_base(&k), (3_000, 5_000));

        // unchanged growth realizes nothing
        assert!(ledger.touch(&k, growth(3), growth(5)).unwrap().is_zero());
    }

    #[test]
    fn test_adjust_below_zero_fails() {
        let mut ledger = Ledger::new();
        let k = key(1);
        ledger.touch(&k, U256::ZERO, U256::ZERO).unwrap();
        ledger.adjust_liquidity(&k, 10).unwrap();
        assert_eq!(ledger.adjust_liquidity(&k, -11), Err(SfpmError::InsufficientLiquidity));
        assert_eq!(ledger.get_liquidity(&k), 10);
        assert_eq!(ledger.adjust_liquidity(&k, -10).unwrap(), 0);
        // fully drained entries stay in place
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_adjust_rebases_fees_base() {
        let mut ledger = Ledger::new();
        let k = key(1);
        ledger.touch(&k, growth(2), growth(0)).unwrap();
        ledger.adjust_liquidity(&k, 50).unwrap();
        assert_eq!(ledger.get_fees_base(&k), (100, 0));
        // no fee was earned between the checkpoint and the adjust
        assert!(ledger.project_fees(&k, growth(2), U256::ZERO).unwrap().is_zero());
    }

    #[test]
    fn test_transfer_moves_liquidity_and_checkpoints_both_sides() {
        let mut ledger = Ledger::new();
        let from = key(1);
        ledger.touch(&from, U256::ZERO, U256::ZERO).unwrap();
        ledger.adjust_liquidity(&from, 100).unwrap();

        let to = Address::from_low_u64(2);
        let (from_fees, to_fees) = ledger
            .transfer(&from, to, 40, 0, growth(1), growth(1))
            .unwrap();
        assert_eq!(from_fees.unpack(), (100, 100));
        assert!(to_fees.is_zero());

        let to_key = from.with_owner(to);
        assert_eq!(ledger.get_liquidity(&from), 60);
        assert_eq!(ledger.get_liquidity(&to_key), 40);
        assert_eq!(ledger.get_fees_base(&from), (60, 60));
        assert_eq!(ledger.get_fees_base(&to_key), (40, 40));

        // recipient does not inherit fees earned before the transfer
        let later = ledger.project_fees(&to_key, growth(2), growth(1)).unwrap();
        assert_eq!(later.unpack(), (40, 0));
    }

    #[test]
    fn test_transfer_shortfall_fails() {
        let mut ledger = Ledger::new();
        let from = key(1);
        ledger.touch(&from, U256::ZERO, U256::ZERO).unwrap();
        ledger.adjust_liquidity(&from, 10).unwrap();
        assert_eq!(
            ledger.transfer(&from, Address::from_low_u64(2), 11, 0, U256::ZERO, U256::ZERO),
            Err(SfpmError::TransferFailed)
        );
        assert_eq!(
            ledger.transfer(&from, Address::from_low_u64(2), 0, 1, U256::ZERO, U256::ZERO),
            Err(SfpmError::TransferFailed)
        );
    }

    #[test]
    fn test_removed_liquidity_tracked_separately() {
        let mut ledger = Ledger::new();
        let k = key(1);
        ledger.adjust_removed_liquidity(&k, 25).unwrap();
        assert_eq!(ledger.get_account_liquidity(&k), (25, 0));
        assert_eq!(
            ledger.adjust_removed_liquidity(&k, -26),
            Err(SfpmError::InsufficientLiquidity)
        );
    }
}
