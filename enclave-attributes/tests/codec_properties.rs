//! Property tests for the attribute codec.

use chrono::{DateTime, NaiveDate, Utc};
use enclave_attributes::{AttributeSlots, AttributeValue};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn value_strategy() -> impl Strategy<Value = AttributeValue> {
    prop_oneof![
        Just(AttributeValue::Null),
        any::<String>().prop_map(AttributeValue::Text),
        any::<i64>().prop_map(AttributeValue::Int),
        any::<bool>().prop_map(AttributeValue::Bool),
        (any::<i64>(), 0u32..=10)
            .prop_map(|(m, s)| AttributeValue::Decimal(Decimal::new(m, s))),
        (-100_000i32..100_000)
            .prop_map(|d| AttributeValue::Date(
                NaiveDate::from_num_days_from_ce_opt(730_000 + d).unwrap()
            )),
        (0i64..4_000_000_000, 0u32..1_000_000_000).prop_map(|(secs, nanos)| {
            AttributeValue::Timestamp(DateTime::<Utc>::from_timestamp(secs, nanos).unwrap())
        }),
        prop::collection::btree_map("[a-z]{1,8}", any::<i32>(), 0..5).prop_map(|m| {
            AttributeValue::Json(serde_json::to_value(m).unwrap())
        }),
    ]
}

proptest! {
    #[test]
    fn set_then_read_returns_same_value(value in value_strategy()) {
        let slots = AttributeSlots::from_value(value.clone());
        prop_assert_eq!(slots.value(), value);
    }

    #[test]
    fn at_most_one_slot_after_any_sequence(values in prop::collection::vec(value_strategy(), 1..8)) {
        let mut slots = AttributeSlots::new();
        for value in values {
            let expect_empty = value.is_null();
            slots.set(value);
            prop_assert!(slots.populated_count() <= 1);
            prop_assert_eq!(slots.populated().is_none(), expect_empty);
        }
    }

    #[test]
    fn ints_never_land_in_bool_slot(v in any::<i64>()) {
        let slots = AttributeSlots::from_value(v);
        prop_assert_eq!(slots.bool(), None);
        prop_assert_eq!(slots.int(), Some(v));
    }
}
