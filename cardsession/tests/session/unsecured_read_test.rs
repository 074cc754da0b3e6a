#[path = "../common/mod.rs"]
mod common;

use cardsession::Error;
use cardsession::session::SessionState;
use cardsession::test_support::SimulatedCard;

#[test]
fn reads_flush_without_security_module() {
    let mut rig = common::rig();
    assert!(rig.select());
    rig.reader.clear_sent();

    rig.session.prepare_read_record(common::sfi_event_log(), 1).unwrap();
    rig.session.prepare_read_record(common::sfi_contracts(), 1).unwrap();
    rig.session.process_commands().unwrap();

    let card = rig.session.card().unwrap();
    assert_eq!(card.counter(common::sfi_event_log(), 1), Some(100));
    assert_eq!(
        card.file(common::sfi_contracts()).unwrap().content(),
        Some(&[0x11u8; 29][..])
    );
    assert_eq!(rig.reader.sent_instructions(), vec![0xB2, 0xB2]);
    assert_eq!(rig.session.state(), SessionState::Selected);
}

#[test]
fn missing_record_stops_the_batch() {
    let mut rig = common::rig();
    rig.select();
    rig.session.prepare_read_record(common::sfi_event_log(), 1).unwrap();
    rig.session.prepare_read_record(common::sfi_event_log(), 9).unwrap();
    rig.session.prepare_read_record(common::sfi_contracts(), 1).unwrap();

    match rig.session.process_commands() {
        Err(Error::Command { sw: 0x6A83, .. }) => {}
        other => panic!("expected record not found, got {:?}", other),
    }
    let card = rig.session.card().unwrap();
    assert!(card.file(common::sfi_event_log()).unwrap().record(1).is_some());
    assert!(card.file(common::sfi_contracts()).is_none());
    assert!(rig.session.queue().is_empty());
    assert_eq!(rig.session.state(), SessionState::Selected);
}

#[test]
fn queueing_without_selection_is_a_configuration_error() {
    let mut rig = common::rig_with(SimulatedCard::calypso(), Default::default());
    assert!(matches!(
        rig.session.prepare_read_record(common::sfi_env(), 1),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn reader_loss_during_flush_returns_to_idle() {
    let mut rig = common::rig();
    rig.select();
    rig.session.prepare_read_record(common::sfi_env(), 1).unwrap();
    rig.reader.fail_next(1);
    assert!(matches!(rig.session.process_commands(), Err(Error::Io(_))));
    assert_eq!(rig.session.state(), SessionState::Idle);
    assert!(rig.session.card().is_none());
}
