//! Deleting facts removes every derived tuple and withdraws dependent activations

mod common;

use common::{customer, network, order, shipment, snapshot};
use trellis_core::{ActivationLog, NetworkConfig, WorkingMemory};

fn populated() -> (WorkingMemory<ActivationLog>, Vec<trellis_types::FactHandle>) {
    let mut wm = WorkingMemory::new(network(NetworkConfig::default()));
    let handles = vec![
        wm.insert(customer(1, "north", 2)).unwrap(),
        wm.insert(customer(2, "south", 0)).unwrap(),
        wm.insert(order(10, 1, 150.0, "north")).unwrap(),
        wm.insert(order(11, 1, 20.0, "north")).unwrap(),
        wm.insert(order(12, 2, 300.0, "south")).unwrap(),
        wm.insert(shipment(10, "north", 5.0)).unwrap(),
        wm.insert(shipment(11, "north", 50.0)).unwrap(),
        wm.insert(shipment(12, "south", 1.0)).unwrap(),
    ];
    (wm, handles)
}

#[test]
fn test_fixture_matches() {
    let (wm, h) = populated();
    assert_eq!(wm.matches("big-order-customer"), vec![vec![h[2], h[0]], vec![h[4], h[1]]]);
    // Shipment of order 11 weighs more than the order amount.
    assert_eq!(
        wm.matches("regional-shipment"),
        vec![vec![h[2], h[0], h[5]], vec![h[4], h[1], h[7]]]
    );
    assert_eq!(
        wm.matches("tier-limit"),
        vec![vec![h[0], h[2]], vec![h[0], h[3]], vec![h[1], h[4]]]
    );
    assert_eq!(
        wm.matches("priority-shipment"),
        vec![vec![h[0], h[5]], vec![h[0], h[6]], vec![h[0], h[7]]]
    );
}

#[test]
fn test_delete_everything_leaves_nothing_behind() {
    let (mut wm, handles) = populated();
    let active_before = wm.sink().active_count() as u64;
    assert!(active_before > 0);

    for handle in handles.iter().rev() {
        wm.delete(*handle).unwrap();
    }
    assert_eq!(wm.tuple_count(), 0);
    assert_eq!(wm.fact_count(), 0);
    assert_eq!(wm.sink().active_count(), 0);
    assert_eq!(wm.sink().deactivation_count(), active_before);
    for (id, _) in wm.network().nodes() {
        assert_eq!((wm.left_count(id), wm.right_count(id)), (0, 0), "node {id}");
    }
    let stats = wm.node_stats();
    assert!(stats.nodes.iter().all(|node| node.left_buckets == 0 && node.right_buckets == 0));
    assert_eq!(stats.propagation.tuples.tuples_created, stats.propagation.tuples.tuples_deleted);
}

#[test]
fn test_delete_middle_of_chain_removes_descendants() {
    let (mut wm, h) = populated();
    // Customer 1 sits in the middle of the regional-shipment chain and heads tier-limit.
    wm.delete(h[0]).unwrap();
    assert_eq!(wm.matches("big-order-customer"), vec![vec![h[4], h[1]]]);
    assert_eq!(wm.matches("regional-shipment"), vec![vec![h[4], h[1], h[7]]]);
    assert_eq!(wm.matches("tier-limit"), vec![vec![h[1], h[4]]]);
    assert!(wm.matches("priority-shipment").is_empty());
    assert_eq!(wm.sink().active_count(), 3);
}

#[test]
fn test_reinsert_reproduces_tuple_set() {
    let (mut wm, h) = populated();
    let before = snapshot(&wm);

    let removed = wm.delete(h[0]).unwrap();
    assert_ne!(snapshot(&wm), before);
    let again = wm.insert(removed).unwrap();

    // Same structure, with the new handle standing in for the old one.
    let after = snapshot(&wm);
    assert_eq!(after.counts, before.counts);
    assert_eq!(after.tuples, before.tuples);
    for (rule, matches) in &before.matches {
        let mut renamed: Vec<Vec<_>> = matches
            .iter()
            .map(|m| m.iter().map(|x| if *x == h[0] { again } else { *x }).collect())
            .collect();
        renamed.sort();
        assert_eq!(&after.matches[rule], &renamed, "rule {rule}");
    }
}

#[test]
fn test_delete_is_not_repeatable() {
    let (mut wm, h) = populated();
    wm.delete(h[5]).unwrap();
    assert!(wm.delete(h[5]).is_err());
    assert!(wm.get(h[5]).is_none());
}
