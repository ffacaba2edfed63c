//! Overload, ordering and ownership behaviour of both transport strategies.

#![cfg(not(feature = "loom"))]

use std::sync::Arc;
use std::thread;

use transport::{
    CopyTransport, DropReason, EmitOutcome, PoolTransport, Record, Strategy, StrategyKind,
    Transport,
};

const PAYLOAD: usize = 256;

fn record(sequence: u32) -> Record<PAYLOAD> {
    let mut record = Record::zeroed();
    record.sequence = sequence;
    record.timestamp = 10_000 + i64::from(sequence);
    for (i, byte) in record.payload.iter_mut().enumerate() {
        *byte = (i as u32).wrapping_mul(31).wrapping_add(sequence) as u8;
    }
    record.stamp_markers();
    record
}

fn emit_all<T: Transport<PAYLOAD>>(transport: &T, count: u32) -> Vec<EmitOutcome> {
    (0..count).map(|seq| transport.emit(&record(seq))).collect()
}

#[test]
fn copy_channel_of_ten_drops_two_of_twelve() {
    let transport = CopyTransport::<PAYLOAD>::new(10).expect("copy transport");
    let outcomes = emit_all(&transport, 12);

    let sent = outcomes.iter().filter(|o| o.is_sent()).count();
    let full = outcomes
        .iter()
        .filter(|o| **o == EmitOutcome::Dropped(DropReason::QueueFull))
        .count();
    assert_eq!(sent, 10);
    assert_eq!(full, 2);
    assert_eq!(&outcomes[10..], &[EmitOutcome::Dropped(DropReason::QueueFull); 2]);

    for expected in 0..10 {
        let received = transport.receive();
        assert_eq!(received.sequence, expected);
        assert_eq!(*received, record(expected), "payload must survive byte-exact");
        transport.release(received);
    }
    assert!(transport.try_receive().is_none());
}

#[test]
fn copy_channel_overflow_by_one() {
    const N: u32 = 7;
    let transport = CopyTransport::<PAYLOAD>::new(N).expect("copy transport");
    let outcomes = emit_all(&transport, N + 1);
    assert!(outcomes[..N as usize].iter().all(|o| o.is_sent()));
    assert_eq!(
        outcomes[N as usize],
        EmitOutcome::Dropped(DropReason::QueueFull)
    );
    let drained: Vec<u32> = std::iter::from_fn(|| transport.try_receive().map(|r| r.sequence))
        .collect();
    assert_eq!(drained, (0..N).collect::<Vec<_>>());
}

#[test]
fn pool_of_sixteen_drops_four_of_twenty() {
    let transport = PoolTransport::<PAYLOAD>::new(16).expect("pool transport");
    let outcomes = emit_all(&transport, 20);

    let sent = outcomes.iter().filter(|o| o.is_sent()).count();
    let exhausted = outcomes
        .iter()
        .filter(|o| **o == EmitOutcome::Dropped(DropReason::PoolExhausted))
        .count();
    assert_eq!(sent, 16);
    assert_eq!(exhausted, 4);
    assert_eq!(transport.occupancy().in_transit, 16);
    assert_eq!(transport.occupancy().free, 0);
}

#[test]
fn pool_overflow_by_one_preserves_order() {
    const M: u32 = 5;
    let transport = PoolTransport::<PAYLOAD>::new(M).expect("pool transport");
    let outcomes = emit_all(&transport, M + 1);
    assert!(outcomes[..M as usize].iter().all(|o| o.is_sent()));
    assert_eq!(
        outcomes[M as usize],
        EmitOutcome::Dropped(DropReason::PoolExhausted)
    );

    let mut previous = None;
    for expected in 0..M {
        let received = transport.receive();
        assert_eq!(*received, record(expected));
        if let Some(prev) = previous {
            assert_eq!(received.sequence, prev + 1);
        }
        previous = Some(received.sequence);
        transport.release(received);
    }
    assert_eq!(transport.occupancy().free, M);
}

#[test]
fn strategy_selection_reports_distinct_drop_reasons() {
    let copy = Strategy::<PAYLOAD>::init(StrategyKind::Copy, 1).expect("copy");
    let pool = Strategy::<PAYLOAD>::init(StrategyKind::Pool, 1).expect("pool");
    for strategy in [&copy, &pool] {
        assert!(strategy.emit(&record(0)).is_sent());
    }
    assert_eq!(
        copy.emit(&record(1)),
        EmitOutcome::Dropped(DropReason::QueueFull)
    );
    assert_eq!(
        pool.emit(&record(1)),
        EmitOutcome::Dropped(DropReason::PoolExhausted)
    );
}

fn cross_thread_roundtrip(strategy: Strategy<PAYLOAD>) {
    const COUNT: u32 = 20_000;
    let strategy = Arc::new(strategy);
    let producer = {
        let strategy = Arc::clone(&strategy);
        thread::spawn(move || {
            let mut dropped = 0u32;
            for seq in 0..COUNT {
                while !strategy.emit(&record(seq)).is_sent() {
                    dropped += 1;
                    thread::yield_now();
                }
            }
            dropped
        })
    };

    for expected in 0..COUNT {
        let received = strategy.receive();
        assert_eq!(received.sequence, expected);
        assert_eq!(received.payload, record(expected).payload);
        assert!(received.verify_markers().is_ok());
        strategy.release(received);
    }
    producer.join().expect("producer thread");
    if let Some(occupancy) = strategy.occupancy() {
        assert_eq!(occupancy.free, strategy.capacity());
    }
}

#[test]
fn copy_strategy_crosses_threads_in_order() {
    cross_thread_roundtrip(Strategy::init(StrategyKind::Copy, 4).expect("copy"));
}

#[test]
fn pool_strategy_crosses_threads_in_order() {
    cross_thread_roundtrip(Strategy::init(StrategyKind::Pool, 4).expect("pool"));
}

mod prop {
    use super::{record, DropReason, EmitOutcome, PoolTransport, Transport, PAYLOAD};
    use proptest::collection;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Op {
        Emit,
        Receive,
        Release,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Emit),
            2 => Just(Op::Receive),
            2 => Just(Op::Release),
        ]
    }

    proptest! {
        /// Every slot is accounted for after every operation, and emitted
        /// records arrive in order.
        #[test]
        fn pool_conserves_slots(size in 1u32..12, ops in collection::vec(op(), 1..300)) {
            let transport = PoolTransport::<PAYLOAD>::new(size).expect("pool transport");
            let mut held = std::collections::VecDeque::new();
            let mut next_seq = 0u32;
            let mut last_seen: Option<u32> = None;

            for op in ops {
                match op {
                    Op::Emit => {
                        let exhausted = transport.occupancy().free == 0;
                        let outcome = transport.emit(&record(next_seq));
                        next_seq += 1;
                        if exhausted {
                            prop_assert_eq!(outcome, EmitOutcome::Dropped(DropReason::PoolExhausted));
                        } else {
                            prop_assert_eq!(outcome, EmitOutcome::Sent);
                        }
                    }
                    Op::Receive => {
                        if let Some(received) = transport.try_receive() {
                            if let Some(prev) = last_seen {
                                prop_assert!(received.sequence > prev);
                            }
                            last_seen = Some(received.sequence);
                            prop_assert_eq!(&*received, &record(received.sequence));
                            held.push_back(received);
                        }
                    }
                    Op::Release => {
                        if let Some(received) = held.pop_front() {
                            transport.release(received);
                        }
                    }
                }
                let occupancy = transport.occupancy();
                prop_assert_eq!(occupancy.acquired, 0);
                prop_assert_eq!(occupancy.owned as usize, held.len());
                prop_assert_eq!(occupancy.total(), size);
            }
        }
    }
}
