//! Staging area for one engine operation.
//!
//! Reads fall through to committed state, writes stay local. The manager
//! commits the collected changes only after the whole operation succeeded;
//! dropping a transaction discards everything it did.

use std::collections::BTreeMap;

use crate::amm::AmmPool;
use crate::config::ManagerConfig;
use crate::engine::holding::{Holding, LegShare};
use crate::engine::PoolRecord;
use crate::errors::{SfpmError, SfpmResult};
use crate::ledger::{Ledger, LedgerEntry, LedgerKey, LedgerStore};
use crate::types::{Address, TokenId};

pub(crate) type BalanceKey = (Address, TokenId);

/// Copy-on-write view over the committed ledger
pub(crate) struct LedgerOverlay<'a> {
    base: &'a Ledger,
    staged: BTreeMap<LedgerKey, LedgerEntry>,
}

impl LedgerStore for LedgerOverlay<'_> {
    fn entry(&self, key: &LedgerKey) -> Option<LedgerEntry> {
        self.staged
            .get(key)
            .copied()
            .or_else(|| self.base.entry(key))
    }

    fn put(&mut self, key: LedgerKey, entry: LedgerEntry) {
        self.staged.insert(key, entry);
    }
}

pub(crate) struct Transaction<'a, A: AmmPool> {
    pub(crate) config: &'a ManagerConfig,
    pub(crate) ledger: LedgerOverlay<'a>,
    base_pools: &'a BTreeMap<u64, PoolRecord<A>>,
    pools: BTreeMap<u64, PoolRecord<A>>,
    base_balances: &'a BTreeMap<BalanceKey, Holding>,
    balances: BTreeMap<BalanceKey, Holding>,
}

/// Everything a successful transaction wants written back
pub(crate) struct Changes<A: AmmPool> {
    pub(crate) pools: BTreeMap<u64, PoolRecord<A>>,
    pub(crate) ledger: BTreeMap<LedgerKey, LedgerEntry>,
    pub(crate) balances: BTreeMap<BalanceKey, Holding>,
}

impl<'a, A: AmmPool> Transaction<'a, A> {
    pub(crate) fn new(
        config: &'a ManagerConfig,
        pools: &'a BTreeMap<u64, PoolRecord<A>>,
        ledger: &'a Ledger,
        balances: &'a BTreeMap<BalanceKey, Holding>,
    ) -> Self {
        Transaction {
            config,
            ledger: LedgerOverlay {
                base: ledger,
                staged: BTreeMap::new(),
            },
            base_pools: pools,
            pools: BTreeMap::new(),
            base_balances: balances,
            balances: BTreeMap::new(),
        }
    }

    /// Staged copy of a registered pool, cloned on first access
    pub(crate) fn pool(&mut self, pool_id: u64) -> SfpmResult<&mut PoolRecord<A>> {
        if !self.pools.contains_key(&pool_id) {
            let record = self
                .base_pools
                .get(&pool_id)
                .ok_or(SfpmError::UniswapPoolNotInitialized(pool_id))?
                .clone();
            self.pools.insert(pool_id, record);
        }
        self.pools
            .get_mut(&pool_id)
            .ok_or(SfpmError::UniswapPoolNotInitialized(pool_id))
    }

    pub(crate) fn holding(&self, owner: Address, token_id: TokenId) -> Holding {
        let key = (owner, token_id);
        self.balances
            .get(&key)
            .or_else(|| self.base_balances.get(&key))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn balance(&self, owner: Address, token_id: TokenId) -> u128 {
        self.holding(owner, token_id).size
    }

    pub(crate) fn credit(
        &mut self,
        owner: Address,
        token_id: TokenId,
        size: u128,
        shares: &[LegShare],
    ) -> SfpmResult<u128> {
        let mut holding = self.holding(owner, token_id);
        holding.add(size, shares)?;
        self.balances.insert((owner, token_id), holding);
        Ok(holding.size)
    }

    pub(crate) fn debit(
        &mut self,
        owner: Address,
        token_id: TokenId,
        size: u128,
        shares: &[LegShare],
    ) -> SfpmResult<u128> {
        let mut holding = self.holding(owner, token_id);
        holding.remove(size, shares)?;
        self.balances.insert((owner, token_id), holding);
        Ok(holding.size)
    }

    pub(crate) fn into_changes(self) -> Changes<A> {
        Changes {
            pools: self.pools,
            ledger: self.ledger.staged,
            balances: self.balances,
        }
    }
}
