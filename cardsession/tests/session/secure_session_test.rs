#[path = "../common/mod.rs"]
mod common;

use std::sync::atomic::Ordering;

use cardsession::config::SessionConfig;
use cardsession::event_sink::SinkKind;
use cardsession::session::SessionState;
use cardsession::test_support::SimulatedCard;
use cardsession::types::AccessLevel;
use cardsession::Error;

#[test]
fn increase_under_load_is_committed() {
    let mut rig = common::rig();
    assert!(rig.select());
    let sfi = common::sfi_event_log();

    rig.session.prepare_read_record(sfi, 1).unwrap();
    rig.session.process_opening(AccessLevel::Load).unwrap();
    assert_eq!(rig.session.state(), SessionState::Open);
    let before = rig.session.card().unwrap().counter(sfi, 1).unwrap();

    rig.session.prepare_increase_counter(sfi, 1, 10).unwrap();
    let card = rig.session.process_closing().unwrap();

    assert_eq!(card.counter(sfi, 1), Some(before + 10));
    assert!(card.is_valid());
    assert_eq!(rig.session.state(), SessionState::Idle);
    assert!(rig.session.card().is_none());
    assert_eq!(rig.sam.verifications.load(Ordering::SeqCst), 1);
    assert_eq!(rig.reader.with_card(|c| c.counter(0x08, 1)), Some(Some(before + 10)));
    assert!(rig.reader.with_card(|c| c.ratified()).unwrap());
    assert_eq!(
        rig.sink.results(),
        vec!["Opening session: SUCCESS", "Closing session: SUCCESS"]
    );
    let entries = rig.sink.entries();
    assert_eq!(entries[0].kind, SinkKind::Header);
    assert_eq!(entries[0].text, "Card 0000000012345678 selected");
}

#[test]
fn opening_carries_queued_commands_in_one_batch() {
    let mut rig = common::rig();
    rig.select();
    rig.reader.clear_sent();

    rig.session.prepare_read_record(common::sfi_counter(), 1).unwrap();
    rig.session.prepare_read_record(common::sfi_event_log(), 1).unwrap();
    rig.session.process_opening(AccessLevel::Debit).unwrap();

    assert_eq!(rig.reader.sent_instructions(), vec![0x8A, 0xB2, 0xB2]);
    let session = rig.session.security_session().unwrap();
    assert_eq!(session.log().len(), 3);
    assert_eq!(session.level(), AccessLevel::Debit);
    assert!(session.card_challenge().is_some());
    assert!(rig.session.queue().is_empty());
}

#[test]
fn verification_failure_rolls_back_exactly() {
    for _ in 0..2 {
        let mut rig = common::rig();
        rig.select();
        let sfi = common::sfi_counter();
        rig.read(sfi, 1);
        let before = rig.session.card().unwrap().counter(sfi, 1);
        assert_eq!(before, Some(0x0100));
        rig.session.process_opening(AccessLevel::Debit).unwrap();

        rig.session.prepare_decrease_counter(sfi, 1, 1).unwrap();
        rig.session.process_commands().unwrap();
        assert_eq!(rig.session.card().unwrap().counter(sfi, 1), Some(0x00FF));

        rig.sam.reject_signatures.store(true, Ordering::SeqCst);
        match rig.session.process_closing() {
            Err(Error::SessionVerification(_)) => {}
            other => panic!("expected verification failure, got {:?}", other),
        }
        assert_eq!(rig.session.state(), SessionState::Aborted);
        let card = rig.session.card().unwrap();
        assert_eq!(card.counter(sfi, 1), before);
        assert!(!card.is_valid());
        assert!(rig.session.security_session().is_none());

        rig.session.reset();
        assert_eq!(rig.session.state(), SessionState::Idle);
    }
}

#[test]
fn unplugged_sam_aborts_closing() {
    let mut rig = common::rig();
    rig.select();
    let sfi = common::sfi_counter();
    rig.read(sfi, 1);
    rig.session.process_opening(AccessLevel::Load).unwrap();
    rig.session.prepare_increase_counter(sfi, 1, 5).unwrap();

    rig.sam.unplugged.store(true, Ordering::SeqCst);
    let err = rig.session.process_closing().unwrap_err();
    assert!(matches!(err, Error::SamUnavailable(_)));
    assert_eq!(err.category(), cardsession::ErrorCategory::SecurityModule);
    assert_eq!(rig.session.state(), SessionState::Aborted);
    assert_eq!(rig.session.card().unwrap().counter(sfi, 1), Some(0x0100));
}

#[test]
fn removal_while_open_skips_end_session() {
    let mut rig = common::rig();
    rig.select();
    let sfi = common::sfi_counter();
    rig.session.prepare_read_record(sfi, 1).unwrap();
    rig.session.process_opening(AccessLevel::Debit).unwrap();
    rig.session.prepare_decrease_counter(sfi, 1, 1).unwrap();

    let removed = rig.reader.remove().unwrap();
    rig.session.on_card_removed();

    assert_eq!(rig.session.state(), SessionState::Idle);
    assert!(rig.session.card().is_none());
    assert!(rig.session.queue().is_empty());
    assert_eq!(rig.sam.verifications.load(Ordering::SeqCst), 0);
    assert_eq!(removed.counter(0x19, 1), Some(0x0100));
    assert!(!rig.rf.session_open());
}

#[test]
fn one_session_per_reader() {
    let mut rig = common::rig();
    rig.select();
    rig.session.process_opening(AccessLevel::Read).unwrap();

    // A second session engine bound to the same reader channel.
    let mut twin = cardsession::session::CardSession::new(rig.rf.clone(), SessionConfig::default())
        .with_sam(rig.gateway.clone());
    let selected = rig.selection_result();
    assert!(twin.activate(selected).unwrap());
    assert!(matches!(
        twin.process_opening(AccessLevel::Read),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn io_error_during_closing_goes_idle() {
    let mut rig = common::rig();
    rig.select();
    rig.session.process_opening(AccessLevel::Load).unwrap();
    rig.reader.fail_next(1);
    assert!(matches!(rig.session.process_closing(), Err(Error::Io(_))));
    assert_eq!(rig.session.state(), SessionState::Idle);
    assert!(rig.session.card().is_none());
    assert!(!rig.rf.session_open());
}

#[test]
fn card_rejection_inside_session_keeps_it_open() {
    let card = SimulatedCard::calypso().reject(0xDC, 0x6982);
    let mut rig = common::rig_with(card, SessionConfig::default().ratification(false));
    rig.select();
    rig.session.process_opening(AccessLevel::Load).unwrap();
    rig.session
        .prepare_update_record(common::sfi_contracts(), 1, &[0x01, 0x02])
        .unwrap();
    match rig.session.process_commands() {
        Err(Error::Command { sw: 0x6982, .. }) => {}
        other => panic!("expected card rejection, got {:?}", other),
    }
    assert_eq!(rig.session.state(), SessionState::Open);
    let card = rig.session.process_closing().unwrap();
    assert_eq!(card.file(common::sfi_contracts()).and_then(|f| f.content()), None);
}
