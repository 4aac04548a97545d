//! Concurrency tests: snapshot swaps racing readers and validations

use std::sync::Arc;
use std::thread;

use ticketcheck::{
    AttendeeClaim, AttributeMapper, FixtureBackend, FixtureData, Sale, SnapshotStore, TicketType,
    ValidationPolicy, Validator,
};

const ORDERS: [&str; 4] = ["AAAAA", "BBBBB", "CCCCC", "DDDDD"];

fn ticket_types() -> Vec<TicketType> {
    vec![TicketType::new(1i64, "Business (In Person)").with_activities(["on_site"])]
}

/// Every sale of generation `marker` carries the marker in both its name and
/// its email, so a reader can tell whether two indices came from the same
/// snapshot.
fn sales_for(marker: usize) -> Vec<Sale> {
    ORDERS
        .iter()
        .map(|order| {
            Sale::new(
                format!("{order}-1"),
                *order,
                format!("Gen {marker}"),
                format!("{}-{marker}@example.com", order.to_lowercase()),
                1i64,
            )
        })
        .collect()
}

#[test]
fn readers_never_observe_a_torn_snapshot() {
    let store = Arc::new(SnapshotStore::default());
    store.replace_snapshot(sales_for(0), ticket_types()).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for marker in 1..=200 {
                store
                    .replace_snapshot(sales_for(marker), ticket_types())
                    .expect("replace should succeed");
            }
        })
    };

    let readers: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    let snapshot = store.current();
                    let order = ORDERS[i % ORDERS.len()];

                    let by_order = snapshot.find_by_order(order);
                    assert_eq!(by_order.len(), 1, "order {order} missing");
                    let sale = by_order[0];
                    let marker = sale.name.trim_start_matches("Gen ");

                    let by_email = snapshot.find_by_email(&sale.email);
                    assert_eq!(by_email.len(), 1);
                    assert_eq!(by_email[0].reference, sale.reference);
                    assert!(
                        by_email[0].email.ends_with(&format!("-{marker}@example.com")),
                        "email index from a different generation than the order index",
                    );

                    let exact = snapshot
                        .find_by_order_and_name(order, &sale.name)
                        .expect("order/name index must agree with the order index");
                    assert_eq!(exact.reference, sale.reference);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.stats().generation, 201);
    assert_eq!(store.current().find_by_order("AAAAA")[0].name, "Gen 200");
}

#[test]
fn generation_never_goes_backwards() {
    let store = Arc::new(SnapshotStore::default());

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for marker in 0..50 {
                    store
                        .replace_snapshot(sales_for(w * 100 + marker), ticket_types())
                        .unwrap();
                }
            })
        })
        .collect();

    let observer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..2_000 {
                let generation = store.current().generation();
                assert!(generation >= last, "generation went from {last} to {generation}");
                last = generation;
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    observer.join().unwrap();
    assert_eq!(store.stats().generation, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn validations_keep_succeeding_during_refreshes() {
    let backend = Arc::new(FixtureBackend::from_data(FixtureData::new(
        ticket_types(),
        sales_for(7),
    )));
    let validator = Arc::new(Validator::new(
        Arc::new(SnapshotStore::default()),
        backend,
        AttributeMapper::default(),
        ValidationPolicy::default(),
    ));
    validator.refresh().await.unwrap();

    let refresher = {
        let validator = Arc::clone(&validator);
        tokio::spawn(async move {
            for _ in 0..25 {
                validator.refresh().await.unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let validations: Vec<_> = (0..32)
        .map(|i| {
            let validator = Arc::clone(&validator);
            tokio::spawn(async move {
                let claim = AttendeeClaim::default()
                    .with_order(ORDERS[i % ORDERS.len()])
                    .with_name("gen 7");
                for _ in 0..10 {
                    let verdict = validator.validate_attendee(&claim).await.unwrap();
                    assert!(verdict.is_attendee(), "rejected mid-refresh: {}", verdict.hint);
                }
            })
        })
        .collect();

    refresher.await.unwrap();
    for handle in validations {
        handle.await.unwrap();
    }
    assert_eq!(validator.store().stats().generation, 26);
}
