//! Property tests for the tick-range ledger

use proptest::prelude::*;
use sfpm_core::{Address, Ledger, LedgerKey, LedgerStore, SfpmError, TokenSide, U256};

fn key(owner: u64) -> LedgerKey {
    LedgerKey::new(0xbeef, Address::from_low_u64(owner), TokenSide::Token1, -600, 600)
}

/// Growth of `units / 2^32` tokens per unit of liquidity, in Q128
fn growth(units: u64) -> U256 {
    U256::from_u64(units) << 96
}

#[derive(Debug, Clone)]
enum Op {
    Adjust(i128),
    TransferOut(u128),
    TransferIn(u128),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (-1_000_000i128..1_000_000).prop_map(Op::Adjust),
        (0u128..1_000_000).prop_map(Op::TransferOut),
        (0u128..1_000_000).prop_map(Op::TransferIn),
    ]
}

proptest! {
    /// Liquidity equals the sum of accepted deltas and never goes negative
    #[test]
    fn prop_ledger_conservation(ops in prop::collection::vec(op(), 1..40)) {
        let mut ledger = Ledger::new();
        let me = key(1);
        let other = key(2);
        ledger.touch(&other, U256::ZERO, U256::ZERO).unwrap();
        ledger.adjust_liquidity(&other, 10_000_000).unwrap();

        let mut expected: i128 = 0;
        let mut adjusted: i128 = 0;
        for op in &ops {
            let before = ledger.get_liquidity(&me);
            ledger.touch(&me, U256::ZERO, U256::ZERO).unwrap();
            let (result, delta) = match *op {
                Op::Adjust(delta) => (ledger.adjust_liquidity(&me, delta).map(|_| ()), delta),
                Op::TransferOut(amount) => (
                    ledger
                        .transfer(&me, other.owner, amount, 0, U256::ZERO, U256::ZERO)
                        .map(|_| ()),
                    -(amount as i128),
                ),
                Op::TransferIn(amount) => (
                    ledger
                        .transfer(&other, me.owner, amount, 0, U256::ZERO, U256::ZERO)
                        .map(|_| ()),
                    amount as i128,
                ),
            };
            match result {
                Ok(()) => {
                    expected += delta;
                    if let Op::Adjust(_) = op {
                        adjusted += delta;
                    }
                }
                Err(err) => {
                    let is_shortfall = matches!(
                        err,
                        SfpmError::InsufficientLiquidity | SfpmError::TransferFailed
                    );
                    prop_assert!(is_shortfall);
                    prop_assert_eq!(ledger.get_liquidity(&me), before);
                }
            }
            prop_assert_eq!(ledger.get_liquidity(&me) as i128, expected);
        }
        prop_assert_eq!(
            (ledger.get_liquidity(&me) + ledger.get_liquidity(&other)) as i128,
            10_000_000 + adjusted
        );
    }

    /// Unchanged growth realizes nothing; grown growth realizes a
    /// non-negative amount proportional to held liquidity
    #[test]
    fn prop_fee_monotonicity(
        liquidity in 1u128..1_000_000_000_000,
        start in 0u64..1_000_000,
        step0 in 0u64..1_000_000,
        step1 in 0u64..1_000_000,
    ) {
        let mut ledger = Ledger::new();
        let k = key(1);
        ledger.touch(&k, growth(start), growth(start)).unwrap();
        ledger.adjust_liquidity(&k, liquidity as i128).unwrap();

        let again = ledger.touch(&k, growth(start), growth(start)).unwrap();
        prop_assert!(again.is_zero());

        let fees = ledger
            .touch(&k, growth(start + step0), growth(start + step1))
            .unwrap();
        let (fee0, fee1) = fees.unpack();
        prop_assert!(fee0 >= 0 && fee1 >= 0);
        prop_assert_eq!(fee0 as u128, (liquidity * step0 as u128) >> 32);
        prop_assert_eq!(fee1 as u128, (liquidity * step1 as u128) >> 32);
        prop_assert!(ledger.touch(&k, growth(start + step0), growth(start + step1)).unwrap().is_zero());
    }

    /// A transfer never changes the combined liquidity of the two owners
    #[test]
    fn prop_transfer_preserves_total(
        held in 0u128..1_000_000,
        amount in 0u128..1_000_000,
        grown in 0u64..1_000,
    ) {
        let mut ledger = Ledger::new();
        let from = key(1);
        ledger.touch(&from, U256::ZERO, U256::ZERO).unwrap();
        ledger.adjust_liquidity(&from, held as i128).unwrap();

        let to = key(2);
        let result = ledger.transfer(&from, to.owner, amount, 0, growth(grown), growth(grown));
        prop_assert_eq!(result.is_ok(), amount <= held);
        prop_assert_eq!(ledger.get_liquidity(&from) + ledger.get_liquidity(&to), held);
    }
}
