//! One compiled network shared by independent sessions on several threads

mod common;

use common::{customer, network, order, shipment};
use std::sync::Arc;
use std::thread;
use trellis_core::{NetworkConfig, ReteNetwork, WorkingMemory};

fn assert_send_sync<T: Send + Sync>() {}
fn assert_send<T: Send>() {}

#[test]
fn test_network_and_sessions_cross_threads() {
    assert_send_sync::<ReteNetwork>();
    assert_send::<WorkingMemory>();
}

#[test]
fn test_sessions_do_not_see_each_other() {
    let network = network(NetworkConfig::default());

    let results: Vec<(usize, usize, usize)> = thread::scope(|scope| {
        let workers: Vec<_> = (0..4i64)
            .map(|worker| {
                let network = Arc::clone(&network);
                scope.spawn(move || {
                    let mut wm = WorkingMemory::new(network);
                    // Worker n inserts n + 1 customers, each with one big order.
                    for id in 0..=worker {
                        wm.insert(customer(id, "north", 2)).unwrap();
                        wm.insert(order(100 + id, id, 500.0, "north")).unwrap();
                    }
                    wm.insert(shipment(100, "north", 1.0)).unwrap();
                    (
                        wm.fact_count(),
                        wm.matches("big-order-customer").len(),
                        wm.matches("regional-shipment").len(),
                    )
                })
            })
            .collect();
        workers.into_iter().map(|worker| worker.join().unwrap()).collect()
    });

    for (worker, (facts, big, regional)) in results.into_iter().enumerate() {
        assert_eq!(facts, 2 * (worker + 1) + 1);
        assert_eq!(big, worker + 1);
        assert_eq!(regional, 1);
    }
    // Sessions are gone; the network is shared by nobody else.
    assert_eq!(Arc::strong_count(&network), 1);
}
