//! The final match set does not depend on insertion order

mod common;

use common::{any_fact, network};
use proptest::prelude::*;
use std::collections::BTreeSet;
use trellis_core::{NetworkConfig, WorkingMemory};
use trellis_types::{Fact, FactHandle};

/// Insert facts under handles fixed by their position in `facts`, in `order`
fn matches_for(
    facts: &[Fact],
    order: &[usize],
    config: NetworkConfig,
) -> BTreeSet<(String, Vec<FactHandle>)> {
    let mut wm = WorkingMemory::new(network(config));
    // Handles must increase, so identity comes from the position and insertion
    // order only decides which handle each fact is inserted under.
    let mut positions = vec![FactHandle(0); facts.len()];
    for (n, i) in order.iter().enumerate() {
        let handle = FactHandle(n as u64 + 1);
        // A malformed fact is kept with whatever entries it could reach.
        let _ = wm.insert_with_handle(handle, facts[*i].clone());
        positions[*i] = handle;
    }
    let rename = |handle: FactHandle| {
        positions.iter().position(|h| *h == handle).map_or(FactHandle(0), |i| FactHandle(i as u64))
    };
    common::RULES
        .iter()
        .flat_map(|rule| {
            wm.matches(rule)
                .into_iter()
                .map(|m| (rule.to_string(), m.into_iter().map(&rename).collect()))
                .collect::<Vec<_>>()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn any_permutation_gives_the_same_matches(
        (facts, order) in prop::collection::vec(any_fact(), 1..14)
            .prop_flat_map(|facts| {
                let order: Vec<usize> = (0..facts.len()).collect();
                (Just(facts), Just(order).prop_shuffle())
            })
    ) {
        let identity: Vec<usize> = (0..facts.len()).collect();
        for depth in [0, 3] {
            let config = NetworkConfig::default().with_composite_key_depth(depth);
            prop_assert_eq!(
                matches_for(&facts, &identity, config.clone()),
                matches_for(&facts, &order, config)
            );
        }
    }
}

#[test]
fn test_all_permutations_of_a_small_chain() {
    let facts = vec![
        common::order(1, 7, 120.0, "north"),
        common::customer(7, "north", 1),
        common::shipment(1, "north", 3.0),
    ];
    let permutations = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
    let expected = matches_for(&facts, &permutations[0], NetworkConfig::default());
    assert!(expected.iter().any(|(rule, _)| rule == "regional-shipment"));
    for order in &permutations[1..] {
        assert_eq!(matches_for(&facts, order, NetworkConfig::default()), expected);
    }
}
