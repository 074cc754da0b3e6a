#[path = "../common/mod.rs"]
mod common;

use std::collections::BTreeMap;

use cardsession::card::Card;
use cardsession::config::SessionConfig;
use cardsession::constants::INS_WRITE_RECORD;
use cardsession::reader::{ContactlessReader, Reader, ReaderChannel, share};
use cardsession::session::{CommandQueue, Exchange, SessionState};
use cardsession::test_support::{SimulatedCard, SimulatedReader, SimulatedReaderHandle};
use cardsession::types::{AccessLevel, SerialNumber};
use cardsession::Error;
use proptest::prelude::*;

fn setup(present_records: u8, batch_limit: usize) -> (Card, ReaderChannel, SimulatedReaderHandle) {
    let serial = SerialNumber::from_bytes([0, 0, 0, 0, 0x12, 0x34, 0x56, 0x78]);
    let mut sim = SimulatedCard::new(serial, common::aid().as_bytes());
    for rec in 1..=present_records {
        sim = sim.with_record(common::sfi_contracts().as_u8(), rec, &[rec; 4]);
    }
    let (reader, handle) = SimulatedReader::with_card(sim);
    handle.set_batch_limit(batch_limit);
    let rf: Reader = ContactlessReader::new("rf", share(Box::new(reader))).into();
    let card = Card::new(serial, common::aid().as_bytes().to_vec(), None);
    (card, rf.channel().clone(), handle)
}

#[test]
fn empty_queue_sends_nothing() {
    let (mut card, rf, handle) = setup(1, usize::MAX);
    CommandQueue::new().flush(&mut card, &rf, None).unwrap();
    assert!(handle.sent().is_empty());
}

#[test]
fn flushed_exchanges_are_logged_in_order() {
    let (mut card, rf, _handle) = setup(3, 2);
    let mut queue = CommandQueue::new();
    for rec in [3, 1, 2] {
        queue.prepare_read_record(common::sfi_contracts(), rec).unwrap();
    }
    let mut log: Vec<Exchange> = Vec::new();
    queue.flush(&mut card, &rf, Some(&mut log)).unwrap();

    let records: Vec<u8> = log.iter().map(|e| e.command.encode()[2]).collect();
    assert_eq!(records, vec![3, 1, 2]);
    assert!(log.iter().all(|e| e.response.is_success()));
    assert!(queue.is_empty());
}

#[derive(Debug, Clone, Copy)]
enum RecordWrite {
    Update(u8),
    Write(u8),
}

fn record_write() -> impl Strategy<Value = RecordWrite> {
    prop_oneof![
        (2u8..5).prop_map(RecordWrite::Update),
        (2u8..5).prop_map(RecordWrite::Write),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rejection_keeps_the_confirmed_prefix(
        present in 0u8..5,
        wanted in proptest::collection::vec(1u8..6, 1..8),
        batch_limit in 1usize..4,
    ) {
        let (mut card, rf, handle) = setup(present, batch_limit);
        let mut queue = CommandQueue::new();
        for &rec in &wanted {
            queue.prepare_read_record(common::sfi_contracts(), rec).unwrap();
        }
        let result = queue.flush(&mut card, &rf, None);

        let confirmed = wanted.iter().take_while(|&&r| r <= present).count();
        let sent: Vec<u8> = handle.sent().iter().map(|apdu| apdu[2]).collect();
        if confirmed == wanted.len() {
            prop_assert!(result.is_ok());
            prop_assert_eq!(&sent, &wanted);
        } else {
            let is_not_found = matches!(result, Err(Error::Command { sw: 0x6A83, .. }));
            prop_assert!(is_not_found);
            prop_assert_eq!(&sent[..], &wanted[..=confirmed]);
        }
        for (i, &rec) in wanted.iter().enumerate() {
            let stored = card.file(common::sfi_contracts()).and_then(|f| f.record(rec)).is_some();
            if i < confirmed {
                prop_assert!(stored);
            }
        }
        prop_assert!(queue.is_empty());
    }

    #[test]
    fn record_writes_in_open_session_keep_the_confirmed_prefix(
        ops in proptest::collection::vec(record_write(), 1..8),
        writes_rejected in any::<bool>(),
        batch_limit in 1usize..4,
    ) {
        let mut sim = SimulatedCard::calypso();
        if writes_rejected {
            sim = sim.reject(INS_WRITE_RECORD, 0x6400);
        }
        let mut rig = common::rig_with(sim, SessionConfig::default());
        rig.reader.set_batch_limit(batch_limit);
        prop_assert!(rig.select());
        rig.session.process_opening(AccessLevel::Load).unwrap();
        rig.reader.clear_sent();

        let sfi = common::sfi_contracts();
        for (i, op) in ops.iter().enumerate() {
            let data = [1u8 << (i % 8); 4];
            match *op {
                RecordWrite::Update(rec) => rig.session.prepare_update_record(sfi, rec, &data).unwrap(),
                RecordWrite::Write(rec) => rig.session.prepare_write_record(sfi, rec, &data).unwrap(),
            }
        }
        let result = rig.session.process_commands();

        let confirmed = if writes_rejected {
            ops.iter().take_while(|op| matches!(op, RecordWrite::Update(_))).count()
        } else {
            ops.len()
        };
        let mut expected: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
        for (i, op) in ops.iter().take(confirmed).enumerate() {
            let data = vec![1u8 << (i % 8); 4];
            match *op {
                RecordWrite::Update(rec) => {
                    expected.insert(rec, data);
                }
                RecordWrite::Write(rec) => {
                    let record = expected.entry(rec).or_insert_with(|| vec![0; 4]);
                    record.iter_mut().zip(&data).for_each(|(d, s)| *d |= *s);
                }
            }
        }

        let sent = rig.reader.sent_instructions();
        if confirmed == ops.len() {
            prop_assert!(result.is_ok());
            prop_assert_eq!(sent.len(), ops.len());
        } else {
            let is_rejected = matches!(result, Err(Error::Command { sw: 0x6400, .. }));
            prop_assert!(is_rejected);
            prop_assert_eq!(sent.len(), confirmed + 1);
        }
        let expected_ins: Vec<u8> = ops
            .iter()
            .take(sent.len())
            .map(|op| match op {
                RecordWrite::Update(_) => 0xDC,
                RecordWrite::Write(_) => 0xD2,
            })
            .collect();
        prop_assert_eq!(&sent, &expected_ins);

        prop_assert_eq!(rig.session.state(), SessionState::Open);
        let card = rig.session.card().unwrap();
        for rec in 2u8..5 {
            let stored = card.file(sfi).and_then(|f| f.record(rec));
            prop_assert_eq!(stored, expected.get(&rec).map(|r| r.as_slice()));
        }
        let log = rig.session.security_session().unwrap().log();
        prop_assert_eq!(log.len(), 1 + sent.len());
        prop_assert!(rig.session.queue().is_empty());
    }
}
