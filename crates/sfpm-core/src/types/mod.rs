//! # Core Types
//!
//! Value types shared by the codec, ledger and engine.

pub mod address;
pub mod leg;
pub mod signed_pair;
pub mod token_id;

pub use address::Address;
pub use leg::{Leg, TokenSide};
pub use signed_pair::SignedPair;
pub use token_id::{validate_legs, TokenId};
