//! # Position Engine
//!
//! [`PositionManager`] turns TokenIds into AMM liquidity. Every public
//! mutating call runs against a staged [`transaction`] and commits only when
//! all of its legs, the settlement swap and the price check succeeded, so a
//! failed call leaves pools, ledger, balances and accounting exactly as
//! they were.

pub mod holding;
pub mod leg_ops;
pub mod settlement;
pub(crate) mod transaction;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::accounting::PoolAccounting;
use crate::amm::AmmPool;
use crate::collateral::CollateralCheck;
use crate::config::{validate_tick_spacing, ManagerConfig};
use crate::constants::{MAX_TICK, MIN_TICK};
use crate::errors::{LegDefect, SfpmError, SfpmResult};
use crate::ledger::{Ledger, LedgerKey, LedgerStore};
use crate::types::{Address, Leg, SignedPair, TokenId, TokenSide};

pub use holding::{Holding, LegShare};
pub use leg_ops::{liquidity_chunk, notional_amounts, LegOutcome};

use leg_ops::{create_leg_in_amm, mint_share};
use settlement::{check_tick_limits, swap_in_amm};
use transaction::{BalanceKey, Changes, Transaction};

// ============================================================================
// Call Parameters and Results
// ============================================================================

/// Caller's acceptable tick range for the pool price after the operation.
///
/// Passing `low > high` additionally asks for the ITM netting swap; the
/// bounds are used in sorted order either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickLimits {
    pub low: i32,
    pub high: i32,
}

impl TickLimits {
    pub const fn new(low: i32, high: i32) -> Self {
        TickLimits { low, high }
    }

    pub const fn unbounded() -> Self {
        TickLimits::new(MIN_TICK, MAX_TICK)
    }

    pub const fn unbounded_with_swap() -> Self {
        TickLimits::new(MAX_TICK, MIN_TICK)
    }

    pub const fn swap_at_mint(&self) -> bool {
        self.low > self.high
    }

    pub fn sorted(&self) -> (i32, i32) {
        (self.low.min(self.high), self.low.max(self.high))
    }
}

/// Result of minting or burning one TokenId
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOutcome {
    pub token_id: TokenId,
    pub size: u128,
    pub legs: Vec<LegOutcome>,
    /// Net tokens owed by the position (negative: owed to it), swap included
    pub total_moved: SignedPair,
    /// Deltas of the ITM settlement swap, zero when none ran
    pub total_swapped: SignedPair,
    pub total_collected: SignedPair,
}

/// Result of a roll. `burned` and `minted` report their legs without any
/// swap; the single settlement swap is in `total_swapped`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub burned: PositionOutcome,
    pub minted: PositionOutcome,
    pub total_swapped: SignedPair,
    pub net: SignedPair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub token_id: TokenId,
    pub amount: u128,
    /// Fees realized on the sender's entries at transfer time
    pub from_collected: SignedPair,
    /// Fees realized on the recipient's existing entries
    pub to_collected: SignedPair,
}

/// A registered AMM pool and its aggregated accounting
#[derive(Debug, Clone)]
pub struct PoolRecord<A> {
    pub address: Address,
    pub amm: A,
    pub accounting: PoolAccounting,
}

impl<A> PoolRecord<A> {
    pub fn new(address: Address, amm: A) -> Self {
        PoolRecord {
            address,
            amm,
            accounting: PoolAccounting::new(),
        }
    }
}

// ============================================================================
// Position Manager
// ============================================================================

pub struct PositionManager<A: AmmPool> {
    config: ManagerConfig,
    pools: BTreeMap<u64, PoolRecord<A>>,
    ledger: Ledger,
    balances: BTreeMap<BalanceKey, Holding>,
}

impl<A: AmmPool> PositionManager<A> {
    pub fn new(config: ManagerConfig) -> SfpmResult<Self> {
        config.validate()?;
        Ok(PositionManager {
            config,
            pools: BTreeMap::new(),
            ledger: Ledger::new(),
            balances: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Register an AMM pool under the low 64 bits of its address
    pub fn initialize_pool(&mut self, address: Address, amm: A) -> SfpmResult<u64> {
        let pool_id = address.pool_id();
        if pool_id == 0 {
            return Err(SfpmError::invalid_leg(LegDefect::ZeroPoolId, 0));
        }
        if self.pools.contains_key(&pool_id) {
            return Err(SfpmError::PoolAlreadyInitialized(pool_id));
        }
        validate_tick_spacing(amm.tick_spacing())?;
        info!(
            "Initialized pool {} as {:#x} with tick spacing {}",
            address,
            pool_id,
            amm.tick_spacing()
        );
        self.pools.insert(pool_id, PoolRecord::new(address, amm));
        Ok(pool_id)
    }

    pub fn pool(&self, pool_id: u64) -> Option<&PoolRecord<A>> {
        self.pools.get(&pool_id)
    }

    /// Direct access to a registered AMM for activity outside the manager,
    /// such as third-party swaps
    pub fn amm_mut(&mut self, pool_id: u64) -> SfpmResult<&mut A> {
        self.pools
            .get_mut(&pool_id)
            .map(|record| &mut record.amm)
            .ok_or(SfpmError::UniswapPoolNotInitialized(pool_id))
    }

    pub fn pool_accounting(&self, pool_id: u64) -> Option<&PoolAccounting> {
        self.pools.get(&pool_id).map(|record| &record.accounting)
    }

    // ------------------------------------------------------------------
    // Vault hooks
    // ------------------------------------------------------------------

    pub fn deposit(&mut self, pool_id: u64, token: TokenSide, amount: u128) -> SfpmResult<()> {
        self.pools
            .get_mut(&pool_id)
            .ok_or(SfpmError::UniswapPoolNotInitialized(pool_id))?
            .accounting
            .deposit(token, amount)
    }

    pub fn withdraw(&mut self, pool_id: u64, token: TokenSide, amount: u128) -> SfpmResult<()> {
        self.pools
            .get_mut(&pool_id)
            .ok_or(SfpmError::UniswapPoolNotInitialized(pool_id))?
            .accounting
            .withdraw(token, amount)
    }

    // ------------------------------------------------------------------
    // Position operations
    // ------------------------------------------------------------------

    /// Mint `size` of every TokenId for `owner`. All or nothing.
    pub fn mint(
        &mut self,
        owner: Address,
        token_ids: &[TokenId],
        size: u128,
        limits: TickLimits,
    ) -> SfpmResult<Vec<PositionOutcome>> {
        self.execute("mint", |tx| {
            token_ids
                .iter()
                .map(|token_id| open_position(tx, owner, *token_id, size, limits))
                .collect()
        })
    }

    /// Like [`mint`](Self::mint), after `check` approved every position
    pub fn mint_checked<C: CollateralCheck>(
        &mut self,
        owner: Address,
        token_ids: &[TokenId],
        size: u128,
        limits: TickLimits,
        check: &C,
    ) -> SfpmResult<Vec<PositionOutcome>> {
        self.execute("mint_checked", |tx| {
            for token_id in token_ids {
                let legs = validated_legs(tx, *token_id)?;
                if !check.check_sufficient(owner, &legs, size) {
                    return Err(SfpmError::InsufficientCollateral);
                }
            }
            token_ids
                .iter()
                .map(|token_id| open_position(tx, owner, *token_id, size, limits))
                .collect()
        })
    }

    /// Burn `size` of a held TokenId
    pub fn burn(
        &mut self,
        owner: Address,
        token_id: TokenId,
        size: u128,
        limits: TickLimits,
    ) -> SfpmResult<PositionOutcome> {
        self.execute("burn", |tx| {
            require_balance(tx, owner, token_id, size)?;
            let mut outcome = apply_legs(tx, owner, token_id, size, true)?;
            settle(tx, token_id.pool_id(), &mut outcome, limits)?;
            Ok(outcome)
        })
    }

    /// Burn `size` of `old` and mint the same size of `new` in one step.
    /// Both must live in the same pool; ITM amounts of both sides are
    /// settled by one netting swap.
    pub fn roll(
        &mut self,
        owner: Address,
        old: TokenId,
        new: TokenId,
        size: u128,
        limits: TickLimits,
    ) -> SfpmResult<RollOutcome> {
        if old.pool_id() != new.pool_id() {
            return Err(SfpmError::invalid_leg(LegDefect::PoolMismatch, 0));
        }
        self.execute("roll", |tx| {
            require_balance(tx, owner, old, size)?;
            let burned = apply_legs(tx, owner, old, size, true)?;
            let minted = apply_legs(tx, owner, new, size, false)?;

            let pool_id = new.pool_id();
            let itm = SignedPair::sum(burned.legs.iter().chain(&minted.legs).map(|leg| leg.itm))?;
            let record = tx.pool(pool_id)?;
            let total_swapped = if limits.swap_at_mint() {
                swap_in_amm(&mut record.amm, itm, &limits)?
            } else {
                SignedPair::ZERO
            };
            check_tick_limits(record.amm.slot0().tick, &limits)?;

            let net = burned
                .total_moved
                .add(minted.total_moved)?
                .add(total_swapped)?;
            Ok(RollOutcome {
                burned,
                minted,
                total_swapped,
                net,
            })
        })
    }

    /// Move `amount` of a TokenId and the liquidity behind it
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        token_id: TokenId,
        amount: u128,
    ) -> SfpmResult<TransferOutcome> {
        self.execute("transfer", |tx| transfer_position(tx, from, to, token_id, amount))
    }

    pub fn transfer_batch(
        &mut self,
        from: Address,
        to: Address,
        transfers: &[(TokenId, u128)],
    ) -> SfpmResult<Vec<TransferOutcome>> {
        self.execute("transfer_batch", |tx| {
            transfers
                .iter()
                .map(|(token_id, amount)| transfer_position(tx, from, to, *token_id, *amount))
                .collect()
        })
    }

    /// Realize the fees accrued on every leg range of `token_id`
    pub fn poke(&mut self, owner: Address, token_id: TokenId) -> SfpmResult<SignedPair> {
        self.execute("poke", |tx| {
            let legs = validated_legs(tx, token_id)?;
            let pool_id = token_id.pool_id();
            let mut collected = SignedPair::ZERO;
            for leg in &legs {
                let key = leg_key(tx, pool_id, owner, leg)?;
                let (g0, g1) = tx
                    .pool(pool_id)?
                    .amm
                    .fee_growth_inside(key.tick_lower, key.tick_upper)?;
                collected = collected.add(tx.ledger.touch(&key, g0, g1)?)?;
            }
            tx.pool(pool_id)?.accounting.record_fees(collected)?;
            Ok(collected)
        })
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn balance_of(&self, owner: Address, token_id: TokenId) -> u128 {
        self.holding(owner, token_id).size
    }

    /// Balance together with the liquidity and notional behind each leg
    pub fn holding(&self, owner: Address, token_id: TokenId) -> Holding {
        self.balances.get(&(owner, token_id)).copied().unwrap_or_default()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// `(removed, net)` liquidity of one ledger key
    pub fn get_account_liquidity(
        &self,
        pool_id: u64,
        owner: Address,
        token_type: TokenSide,
        tick_lower: i32,
        tick_upper: i32,
    ) -> (u128, u128) {
        self.ledger.get_account_liquidity(&LedgerKey::new(
            pool_id, owner, token_type, tick_lower, tick_upper,
        ))
    }

    pub fn get_account_fees_base(
        &self,
        pool_id: u64,
        owner: Address,
        token_type: TokenSide,
        tick_lower: i32,
        tick_upper: i32,
    ) -> (i128, i128) {
        self.ledger
            .get_fees_base(&LedgerKey::new(pool_id, owner, token_type, tick_lower, tick_upper))
    }

    /// Fees a poke of every listed position would realize right now.
    /// Ranges shared between positions are counted once.
    pub fn calculate_accumulated_fees(&self, owner: Address, token_ids: &[TokenId]) -> SfpmResult<SignedPair> {
        let mut keys = BTreeSet::new();
        for token_id in token_ids {
            let pool_id = token_id.pool_id();
            if pool_id == 0 {
                return Err(SfpmError::invalid_leg(LegDefect::ZeroPoolId, 0));
            }
            let record = self
                .pools
                .get(&pool_id)
                .ok_or(SfpmError::UniswapPoolNotInitialized(pool_id))?;
            let tick_spacing = record.amm.tick_spacing();
            for leg in token_id.validate(tick_spacing, self.config.max_leg_width)? {
                let (tick_lower, tick_upper) = leg.ticks(tick_spacing)?;
                keys.insert(LedgerKey::new(pool_id, owner, leg.token_type, tick_lower, tick_upper));
            }
        }

        let mut total = SignedPair::ZERO;
        for key in &keys {
            let amm = &self
                .pools
                .get(&key.pool_id)
                .ok_or(SfpmError::UniswapPoolNotInitialized(key.pool_id))?
                .amm;
            let (g0, g1) = amm.fee_growth_inside(key.tick_lower, key.tick_upper)?;
            total = total.add(self.ledger.project_fees(key, g0, g1)?)?;
        }
        Ok(total)
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    fn execute<T>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Transaction<'_, A>) -> SfpmResult<T>,
    ) -> SfpmResult<T> {
        let mut tx = Transaction::new(&self.config, &self.pools, &self.ledger, &self.balances);
        match f(&mut tx) {
            Ok(value) => {
                let changes = tx.into_changes();
                self.commit(operation, changes);
                Ok(value)
            }
            Err(err) => {
                warn!("{} reverted: {}", operation, err);
                Err(err)
            }
        }
    }

    fn commit(&mut self, operation: &'static str, changes: Changes<A>) {
        let Changes {
            pools,
            ledger,
            balances,
        } = changes;
        debug!(
            "Committing {}: {} pools, {} ledger entries, {} balances",
            operation,
            pools.len(),
            ledger.len(),
            balances.len()
        );
        self.pools.extend(pools);
        self.ledger.apply(ledger);
        for (key, holding) in balances {
            if holding.is_empty() {
                self.balances.remove(&key);
            } else {
                self.balances.insert(key, holding);
            }
        }
        info!("{} committed", operation);
    }
}

// ============================================================================
// Transaction Steps
// ============================================================================

fn validated_legs<A: AmmPool>(tx: &mut Transaction<'_, A>, token_id: TokenId) -> SfpmResult<Vec<Leg>> {
    let pool_id = token_id.pool_id();
    if pool_id == 0 {
        return Err(SfpmError::invalid_leg(LegDefect::ZeroPoolId, 0));
    }
    let max_width = tx.config.max_leg_width;
    let tick_spacing = tx.pool(pool_id)?.amm.tick_spacing();
    token_id.validate(tick_spacing, max_width)
}

fn leg_key<A: AmmPool>(tx: &mut Transaction<'_, A>, pool_id: u64, owner: Address, leg: &Leg) -> SfpmResult<LedgerKey> {
    let (tick_lower, tick_upper) = leg.ticks(tx.pool(pool_id)?.amm.tick_spacing())?;
    Ok(LedgerKey::new(pool_id, owner, leg.token_type, tick_lower, tick_upper))
}

fn require_balance<A: AmmPool>(
    tx: &Transaction<'_, A>,
    owner: Address,
    token_id: TokenId,
    size: u128,
) -> SfpmResult<()> {
    let held = tx.balance(owner, token_id);
    if held == 0 || size == 0 {
        return Err(SfpmError::OptionsBalanceZero);
    }
    if size > held {
        return Err(SfpmError::BalanceExceeded {
            held,
            requested: size,
        });
    }
    Ok(())
}

/// Move every leg through the AMM and ledger, update accounting and the
/// owner's balance. No settlement swap and no price check.
///
/// Mints size each leg afresh; burns release the owner's pro-rata share of
/// what their balance was minted with.
fn apply_legs<A: AmmPool>(
    tx: &mut Transaction<'_, A>,
    owner: Address,
    token_id: TokenId,
    size: u128,
    is_burn: bool,
) -> SfpmResult<PositionOutcome> {
    if size == 0 {
        return Err(SfpmError::OptionsBalanceZero);
    }
    let legs = validated_legs(tx, token_id)?;
    let pool_id = token_id.pool_id();
    let held = tx.holding(owner, token_id);

    let mut outcomes = Vec::with_capacity(legs.len());
    for (index, leg) in legs.iter().enumerate() {
        let share = if is_burn {
            held.share(index, size)?
        } else {
            mint_share(tx, pool_id, leg, size)?
        };
        outcomes.push(create_leg_in_amm(tx, pool_id, owner, leg, index, share, is_burn)?);
    }
    let shares: Vec<LegShare> = outcomes.iter().map(LegOutcome::share).collect();

    let total_moved = SignedPair::sum(outcomes.iter().map(|leg| leg.moved))?;
    let total_collected = SignedPair::sum(outcomes.iter().map(|leg| leg.collected))?;

    let accounting = &mut tx.pool(pool_id)?.accounting;
    for (leg, outcome) in legs.iter().zip(&outcomes) {
        accounting.record_leg(leg, outcome.notional, is_burn)?;
    }
    accounting.record_fees(total_collected)?;

    if is_burn {
        tx.debit(owner, token_id, size, &shares)?;
    } else {
        tx.credit(owner, token_id, size, &shares)?;
    }

    Ok(PositionOutcome {
        token_id,
        size,
        legs: outcomes,
        total_moved,
        total_swapped: SignedPair::ZERO,
        total_collected,
    })
}

/// Run the optional netting swap and check the final price
fn settle<A: AmmPool>(
    tx: &mut Transaction<'_, A>,
    pool_id: u64,
    outcome: &mut PositionOutcome,
    limits: TickLimits,
) -> SfpmResult<()> {
    let record = tx.pool(pool_id)?;
    if limits.swap_at_mint() {
        let itm = SignedPair::sum(outcome.legs.iter().map(|leg| leg.itm))?;
        outcome.total_swapped = swap_in_amm(&mut record.amm, itm, &limits)?;
        outcome.total_moved = outcome.total_moved.add(outcome.total_swapped)?;
    }
    check_tick_limits(record.amm.slot0().tick, &limits)
}

fn open_position<A: AmmPool>(
    tx: &mut Transaction<'_, A>,
    owner: Address,
    token_id: TokenId,
    size: u128,
    limits: TickLimits,
) -> SfpmResult<PositionOutcome> {
    let mut outcome = apply_legs(tx, owner, token_id, size, false)?;
    settle(tx, token_id.pool_id(), &mut outcome, limits)?;
    Ok(outcome)
}

/// Ledger side of a TokenId transfer: short legs hand over net liquidity,
/// long legs the liquidity they removed. The recipient's holding receives
/// the same shares the sender's gives up.
fn transfer_position<A: AmmPool>(
    tx: &mut Transaction<'_, A>,
    from: Address,
    to: Address,
    token_id: TokenId,
    amount: u128,
) -> SfpmResult<TransferOutcome> {
    require_balance(tx, from, token_id, amount)?;
    let legs = validated_legs(tx, token_id)?;
    let pool_id = token_id.pool_id();
    let held = tx.holding(from, token_id);

    let mut shares = Vec::with_capacity(legs.len());
    let mut from_collected = SignedPair::ZERO;
    let mut to_collected = SignedPair::ZERO;
    for (index, leg) in legs.iter().enumerate() {
        let key = leg_key(tx, pool_id, from, leg)?;
        let share = held.share(index, amount)?;
        if share.liquidity == 0 {
            return Err(SfpmError::OptionsBalanceZero);
        }
        let (net, removed) = if leg.is_long {
            (0, share.liquidity)
        } else {
            (share.liquidity, 0)
        };

        let (g0, g1) = tx
            .pool(pool_id)?
            .amm
            .fee_growth_inside(key.tick_lower, key.tick_upper)?;
        let (sent, received) = tx.ledger.transfer(&key, to, net, removed, g0, g1)?;
        from_collected = from_collected.add(sent)?;
        to_collected = to_collected.add(received)?;
        shares.push(share);
    }

    tx.pool(pool_id)?
        .accounting
        .record_fees(from_collected.add(to_collected)?)?;
    tx.debit(from, token_id, amount, &shares)?;
    tx.credit(to, token_id, amount, &shares)?;

    debug!(
        "Transferred {} of {} from {} to {}",
        amount, token_id, from, to
    );
    Ok(TransferOutcome {
        token_id,
        amount,
        from_collected,
        to_collected,
    })
}
