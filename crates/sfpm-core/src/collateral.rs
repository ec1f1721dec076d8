//! # Collateral Check
//!
//! The sufficiency formula belongs to the collateral layer. The engine only
//! asks for a yes or no before minting through
//! [`PositionManager::mint_checked`](crate::engine::PositionManager::mint_checked).

use crate::types::{Address, Leg};

pub trait CollateralCheck {
    /// Whether `owner` can carry `size` of a position made of `legs`
    fn check_sufficient(&self, owner: Address, legs: &[Leg], size: u128) -> bool;
}

impl<F> CollateralCheck for F
where
    F: Fn(Address, &[Leg], u128) -> bool,
{
    fn check_sufficient(&self, owner: Address, legs: &[Leg], size: u128) -> bool {
        self(owner, legs, size)
    }
}

/// Approves up to a fixed notional per leg; handy for tests and dry runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotionalCap(pub u128);

impl CollateralCheck for NotionalCap {
    fn check_sufficient(&self, _owner: Address, legs: &[Leg], size: u128) -> bool {
        legs.iter()
            .all(|leg| size.checked_mul(leg.ratio as u128).is_some_and(|n| n <= self.0))
    }
}
