//! # SFPM Core - Semi-Fungible Option Position Manager
//!
//! Option positions built from concentrated-liquidity AMM ranges. This
//! crate provides:
//!
//! - The 256-bit TokenId codec and leg validator
//! - The packed signed-pair accumulator
//! - The per-account tick-range liquidity and fee ledger
//! - The mint / burn / roll / transfer engine with ITM settlement swaps
//! - Pool-level balance aggregation
//! - Uniswap-V3-style fixed-point math and an in-memory pool to run against

// Re-export all modules
pub mod accounting;
pub mod amm;
pub mod collateral;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod math;
pub mod types;

// Re-export commonly used items
pub use accounting::{PoolAccounting, TokenAccounting};
pub use amm::{AmmPool, SimulatedPool, Slot0, SwapResult};
pub use collateral::{CollateralCheck, NotionalCap};
pub use config::{FeeTierConfig, ManagerConfig};
pub use engine::{
    Holding, LegOutcome, LegShare, PoolRecord, PositionManager, PositionOutcome, RollOutcome,
    TickLimits, TransferOutcome,
};
pub use errors::{LegDefect, SfpmError, SfpmResult};
pub use ledger::{Ledger, LedgerEntry, LedgerKey, LedgerStore};
pub use math::big_int::U256;
pub use types::*;
