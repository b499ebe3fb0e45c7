//! Update propagation: selective re-propagation and equivalence with full re-propagation

mod common;

use common::{Op, any_op, apply, customer, network, order, shipment, snapshot};
use proptest::prelude::*;
use trellis_core::{FactValue, NetworkConfig, PropagationError, TrellisError, WorkingMemory};

#[test]
fn test_irrelevant_update_touches_no_memory() {
    let mut wm = WorkingMemory::new(network(NetworkConfig::default()));
    wm.insert(customer(1, "north", 2)).unwrap();
    let o = wm.insert(order(10, 1, 150.0, "north")).unwrap();
    wm.insert(shipment(10, "north", 5.0)).unwrap();

    let before = wm.node_stats();
    let activations = wm.sink().activation_count();

    // `note` is read by no join and no alpha test.
    wm.update(o, order(10, 1, 150.0, "north").with("note", "gift")).unwrap();

    let after = wm.node_stats();
    assert_eq!(after.total_counters(), before.total_counters());
    assert_eq!(wm.sink().activation_count(), activations);
    assert_eq!(wm.sink().deactivation_count(), 0);
    // One entry node per rule holding an Order.
    assert_eq!(after.propagation.skipped_updates, 3);
}

#[test]
fn test_key_change_moves_the_match() {
    let mut wm = WorkingMemory::new(network(NetworkConfig::default()));
    let c1 = wm.insert(customer(1, "north", 0)).unwrap();
    let c2 = wm.insert(customer(2, "north", 0)).unwrap();
    let o = wm.insert(order(10, 1, 150.0, "north")).unwrap();
    assert_eq!(wm.matches("big-order-customer"), vec![vec![o, c1]]);

    wm.update(o, order(10, 2, 150.0, "north")).unwrap();
    assert_eq!(wm.matches("big-order-customer"), vec![vec![o, c2]]);
    assert_eq!(wm.matches("tier-limit"), vec![vec![c2, o]]);
    assert_eq!(wm.sink().deactivation_count(), 2);
}

#[test]
fn test_update_changing_fact_type() {
    let mut wm = WorkingMemory::new(network(NetworkConfig::default()));
    let c = wm.insert(customer(1, "north", 3)).unwrap();
    let x = wm.insert(order(10, 1, 150.0, "north")).unwrap();
    assert_eq!(wm.matches("big-order-customer"), vec![vec![x, c]]);

    wm.update(x, shipment(10, "north", 1.0)).unwrap();
    assert!(wm.matches("big-order-customer").is_empty());
    assert!(wm.matches("tier-limit").is_empty());
    assert_eq!(wm.matches("priority-shipment"), vec![vec![c, x]]);
    assert_eq!(wm.get(x).unwrap().fact_type, "Shipment");
}

#[test]
fn test_updates_without_skipping_give_same_state() {
    let mut skipping = WorkingMemory::new(network(NetworkConfig::default()));
    let mut full =
        WorkingMemory::new(network(NetworkConfig::default().with_skip_unaffected_updates(false)));
    for wm in [&mut skipping, &mut full] {
        wm.insert(customer(1, "north", 1)).unwrap();
        let o = wm.insert(order(10, 1, 150.0, "north")).unwrap();
        wm.update(o, order(10, 1, 150.0, "north").with("note", "x")).unwrap();
    }
    assert_eq!(snapshot(&skipping), snapshot(&full));
    assert!(full.stats().tuples.tuples_created > skipping.stats().tuples.tuples_created);
    assert_eq!(full.stats().skipped_updates, 0);
}

#[test]
fn test_update_changing_value_kind_is_never_skipped() {
    let mut outcomes = Vec::new();
    for skip in [true, false] {
        for depth in [0, 3] {
            let config = NetworkConfig::default()
                .with_composite_key_depth(depth)
                .with_skip_unaffected_updates(skip);
            let mut wm = WorkingMemory::new(network(config));
            let o = wm.insert(order(1, 7, 150.0, "north")).unwrap();

            // 7.0 equals 7 numerically but is not an integer key.
            let float_key = order(1, 7, 150.0, "north").with("customerId", 7.0);
            let err = wm.update(o, float_key).unwrap_err();
            let TrellisError::Propagation { handle, source, .. } = &err else {
                panic!("unexpected error {err:?}");
            };
            assert_eq!(*handle, o);
            assert!(matches!(
                source,
                PropagationError::FieldTypeMismatch { field, .. } if field == "customerId"
            ));
            assert_eq!(wm.get(o).unwrap().get("customerId"), Some(&FactValue::Integer(7)));

            let c = wm.insert(customer(7, "north", 0)).unwrap();
            assert_eq!(wm.matches("big-order-customer"), vec![vec![o, c]]);
            outcomes.push((err, snapshot(&wm)));
        }
    }
    for outcome in &outcomes[1..] {
        assert_eq!(outcome, &outcomes[0]);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn skipping_unaffected_updates_is_invisible(ops in prop::collection::vec(any_op(), 1..40)) {
        let mut skipping = WorkingMemory::new(network(NetworkConfig::default()));
        let mut full = WorkingMemory::new(network(
            NetworkConfig::default().with_skip_unaffected_updates(false),
        ));
        for op in &ops {
            let a = apply(&mut skipping, op);
            let b = apply(&mut full, op);
            prop_assert_eq!(a, b);
            prop_assert_eq!(snapshot(&skipping), snapshot(&full));
            prop_assert_eq!(skipping.sink().active_count(), full.sink().active_count());
        }
        let updates = ops.iter().filter(|op| matches!(op, Op::Update(..))).count() as u64;
        prop_assert!(skipping.stats().updates <= updates);
    }
}
