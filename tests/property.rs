use offer_book_reconstructor::partition::partition_by_instrument;
use offer_book_reconstructor::{
    CarryForwardPolicy, Event, Offer, OfferBook, OrderType, ReconstructionEngine, ReplayConfig,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum BookOp {
    Upsert { id: u8, tick: u8 },
    Remove { id: u8 },
}

fn any_book_op() -> impl Strategy<Value = BookOp> {
    prop_oneof![
        3 => (0u8..24, 0u8..12).prop_map(|(id, tick)| BookOp::Upsert { id, tick }),
        1 => (0u8..24).prop_map(|id| BookOp::Remove { id }),
    ]
}

fn build_book(ops: &[BookOp]) -> OfferBook {
    let mut book = OfferBook::new();
    for (seq, op) in ops.iter().enumerate() {
        match op {
            BookOp::Upsert { id, tick } => {
                book.upsert(Offer::new(
                    format!("q{id}"),
                    99.0 + *tick as f64 * 0.25,
                    1_000.0,
                    "7",
                    seq,
                    "10:00:00",
                ));
            }
            BookOp::Remove { id } => {
                book.remove(&format!("q{id}"));
            }
        }
    }
    book
}

fn any_kind() -> impl Strategy<Value = OrderType> {
    prop_oneof![
        Just(OrderType::Purchase),
        Just(OrderType::Sale),
        Just(OrderType::Dealer),
        Just(OrderType::BidWanted),
        Just(OrderType::Other("INQUIRY".to_string())),
    ]
}

/// Row template: (instrument, 0 = quote, 1 = delete, 2 = trade, id, tick, kind)
fn any_batch() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(
        (0usize..3, 0u8..3, 0u8..8, 0u8..12, any_kind()),
        0..200,
    )
    .prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(row, (inst, op, id, tick, kind))| {
                let cusip = ["X", "Y", "Z"][inst];
                let ts = format!("10:{:02}:{:02}", row / 60 % 60, row % 60);
                match op {
                    0 => Event::offering(
                        row,
                        cusip,
                        format!("q{id}"),
                        99.0 + tick as f64 * 0.25,
                        500.0,
                        "7",
                        ts,
                    ),
                    1 => Event::delete(row, cusip, format!("q{id}"), ts),
                    _ => Event::trade(row, cusip, kind, ts),
                }
            })
            .collect()
    })
}

fn quiet(policy: CarryForwardPolicy) -> ReconstructionEngine {
    ReconstructionEngine::with_config(
        ReplayConfig::new(10)
            .with_carry_forward(policy)
            .with_logging(false),
    )
}

proptest! {
    #[test]
    fn top_k_is_sorted_and_bounded(ops in prop::collection::vec(any_book_op(), 0..300)) {
        let book = build_book(&ops);
        let top = book.top_k(10);

        prop_assert!(top.len() <= 10);
        prop_assert_eq!(top.len(), book.len().min(10));
        for pair in top.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            prop_assert!(
                a.price < b.price || (a.price == b.price && a.sequence < b.sequence),
                "{:?} ranked before {:?}", a, b
            );
        }
    }

    #[test]
    fn upsert_then_remove_restores_view(
        ops in prop::collection::vec(any_book_op(), 0..200),
        tick in 0u8..12,
    ) {
        let mut book = build_book(&ops);
        let before = book.snapshot(10);

        book.upsert(Offer::new("fresh", 99.0 + tick as f64 * 0.25, 1.0, "9", ops.len(), "10:30:00"));
        book.remove("fresh");

        prop_assert_eq!(book.snapshot(10), before);
    }

    #[test]
    fn replay_is_idempotent(events in any_batch()) {
        let mut engine = quiet(CarryForwardPolicy::GlobalPrevious);
        let first = engine.replay(&events).unwrap();
        let second = engine.replay(&events).unwrap();

        prop_assert_eq!(first.len(), events.len());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn snapshots_are_ranked_prefixes(events in any_batch()) {
        let snapshots = quiet(CarryForwardPolicy::GlobalPrevious).replay(&events).unwrap();

        for snapshot in snapshots.iter().flatten() {
            prop_assert_eq!(snapshot.depth(), 10);
            let filled = snapshot.len();
            prop_assert!(snapshot.slots()[filled..].iter().all(Option::is_none));

            let prices = snapshot.prices();
            prop_assert!(prices.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn same_instrument_partitions_are_independent(events in any_batch()) {
        let full = quiet(CarryForwardPolicy::SameInstrument).replay(&events).unwrap();

        for positions in partition_by_instrument(&events).values() {
            let subset: Vec<Event> = positions.iter().map(|&p| events[p].clone()).collect();
            let alone = quiet(CarryForwardPolicy::SameInstrument).replay(&subset).unwrap();

            for (i, &p) in positions.iter().enumerate() {
                prop_assert_eq!(&alone[i], &full[p]);
            }
        }
    }
}
