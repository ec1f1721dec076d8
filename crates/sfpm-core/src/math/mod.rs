//! # Mathematical Functions
//!
//! Fixed-point AMM math shared by the ledger, the engine and the simulated
//! pool.

pub mod big_int;
pub mod fee_math;
pub mod liquidity_math;
pub mod safe_math;
pub mod swap_math;
pub mod tick_math;

// Re-export commonly used functions
pub use big_int::*;
pub use fee_math::*;
pub use liquidity_math::*;
pub use safe_math::*;
pub use swap_math::*;
pub use tick_math::*;
