//! Property tests for the TokenId codec and the risk-partner rules

use proptest::prelude::*;
use sfpm_core::constants::{MAX_ENCODED_STRIKE, MAX_WIDTH, MIN_ENCODED_STRIKE};
use sfpm_core::{Leg, SfpmError, TokenId, TokenSide};

// ============================================================================
// Test Strategies
// ============================================================================

fn token_side() -> impl Strategy<Value = TokenSide> {
    any::<bool>().prop_map(TokenSide::from_bit)
}

prop_compose! {
    /// Any leg whose fields fit their bit ranges
    fn encodable_leg()(
        asset in token_side(),
        ratio in 1u8..=127,
        is_long in any::<bool>(),
        token_type in token_side(),
        risk_partner in 0u8..4,
        strike in MIN_ENCODED_STRIKE..=MAX_ENCODED_STRIKE,
        width in 0u16..=MAX_WIDTH,
    ) -> Leg {
        Leg { asset, ratio, is_long, token_type, risk_partner, strike, width }
    }
}

prop_compose! {
    /// Aligned strike for spacing 10 well inside the tick domain
    fn aligned_strike()(units in -50_000i32..50_000) -> i32 {
        units * 10
    }
}

// ============================================================================
// Codec Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_encode_decode_round_trip(
        pool_id in any::<u64>(),
        legs in prop::collection::vec(encodable_leg(), 1..=4),
    ) {
        let id = TokenId::encode(pool_id, &legs).unwrap();
        prop_assert_eq!(id.decode(), (pool_id, legs.clone()));
        prop_assert_eq!(id.leg_count(), legs.len());
        prop_assert_eq!(TokenId::from_bits(id.to_bits()), id);
    }

    #[test]
    fn prop_field_accessors_match_decoded_legs(
        pool_id in 1u64..=u64::MAX,
        legs in prop::collection::vec(encodable_leg(), 1..=4),
    ) {
        let id = TokenId::encode(pool_id, &legs).unwrap();
        for (i, leg) in legs.iter().enumerate() {
            prop_assert_eq!(id.strike(i), leg.strike);
            prop_assert_eq!(id.width(i), leg.width);
            prop_assert_eq!(id.ratio(i), leg.ratio);
            prop_assert_eq!(id.risk_partner(i), leg.risk_partner);
            prop_assert_eq!(id.is_long(i), leg.is_long);
            prop_assert_eq!(id.asset(i), leg.asset);
            prop_assert_eq!(id.token_type(i), leg.token_type);
        }
    }

    #[test]
    fn prop_rewriting_a_leg_leaves_neighbours_intact(
        legs in prop::collection::vec(encodable_leg(), 4..=4),
        replacement in encodable_leg(),
        slot in 0usize..4,
    ) {
        let id = TokenId::encode(77, &legs).unwrap().add_leg(slot, &replacement).unwrap();
        for (i, leg) in legs.iter().enumerate() {
            let expected = if i == slot { replacement } else { *leg };
            prop_assert_eq!(id.leg(i), Some(expected));
        }
        prop_assert_eq!(id.pool_id(), 77);
    }
}

// ============================================================================
// Risk Partner Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_partner_pair_accepted_iff_symmetric(
        strike_a in aligned_strike(),
        strike_b in aligned_strike(),
        ratio_a in 1u8..=3,
        ratio_b in 1u8..=3,
        long_a in any::<bool>(),
        long_b in any::<bool>(),
        type_a in token_side(),
        type_b in token_side(),
    ) {
        let legs = [
            Leg::new(0, type_a, long_a, strike_a, 2).with_ratio(ratio_a).with_partner(1),
            Leg::new(1, type_b, long_b, strike_b, 2).with_ratio(ratio_b).with_partner(0),
        ];
        let id = TokenId::encode(0xfeed, &legs).unwrap();
        let expected = ratio_a == ratio_b && type_a == type_b && long_a != long_b;
        let result = id.validate(10, MAX_WIDTH);
        prop_assert_eq!(result.is_ok(), expected);
        if let Err(err) = result {
            let is_leg_defect = matches!(err, SfpmError::InvalidTokenIdParameter { .. });
            prop_assert!(is_leg_defect);
        }
    }

    #[test]
    fn prop_one_sided_partner_rejected(
        strike in aligned_strike(),
        token_type in token_side(),
    ) {
        // leg 0 points at leg 1, leg 1 points at itself
        let legs = [
            Leg::new(0, token_type, false, strike, 2).with_partner(1),
            Leg::new(1, token_type, true, strike, 2),
        ];
        let id = TokenId::encode(0xfeed, &legs).unwrap();
        let err = id.validate(10, MAX_WIDTH).unwrap_err();
        prop_assert_eq!(
            err,
            SfpmError::invalid_leg(sfpm_core::LegDefect::PartnerNotSymmetric, 0)
        );
    }
}
