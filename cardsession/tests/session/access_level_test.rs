#[path = "../common/mod.rs"]
mod common;

use cardsession::Error;
use cardsession::session::SessionState;
use cardsession::types::{AccessLevel, CommandKind};

const LEVELS: [AccessLevel; 3] = [AccessLevel::Read, AccessLevel::Load, AccessLevel::Debit];

#[test]
fn increase_queued_before_opening_under_read_is_refused() {
    let mut rig = common::rig();
    rig.select();
    rig.session
        .prepare_increase_counter(common::sfi_event_log(), 1, 10)
        .unwrap();
    let sent = rig.sent_count();

    match rig.session.process_opening(AccessLevel::Read) {
        Err(Error::AccessLevelViolation {
            command: CommandKind::Increase,
            level: Some(AccessLevel::Read),
        }) => {}
        other => panic!("expected access violation, got {:?}", other),
    }
    assert_eq!(rig.sent_count(), sent);
    assert_eq!(rig.session.state(), SessionState::Selected);
    assert!(!rig.rf.session_open());
}

#[test]
fn counter_operations_follow_access_level() {
    for level in LEVELS {
        let mut rig = common::rig();
        rig.select();
        rig.session.process_opening(level).unwrap();
        let sent = rig.sent_count();
        let sfi = common::sfi_counter();

        let inc = rig.session.prepare_increase_counter(sfi, 1, 1);
        let dec = rig.session.prepare_decrease_counter(sfi, 1, 1);

        assert_eq!(inc.is_ok(), level == AccessLevel::Load, "increase under {}", level);
        assert_eq!(dec.is_ok(), level == AccessLevel::Debit, "decrease under {}", level);
        if let Err(e) = inc {
            assert!(matches!(e, Error::AccessLevelViolation { level: Some(l), .. } if l == level));
        }
        if let Err(e) = dec {
            assert!(matches!(e, Error::AccessLevelViolation { .. }));
        }
        assert_eq!(rig.sent_count(), sent);
    }
}

#[test]
fn record_writes_need_load_or_debit() {
    for level in LEVELS {
        let mut rig = common::rig();
        rig.select();
        rig.session.process_opening(level).unwrap();
        let r = rig
            .session
            .prepare_update_record(common::sfi_contracts(), 1, &[0xAB]);
        assert_eq!(r.is_ok(), level != AccessLevel::Read);
    }
}

#[test]
fn modifying_without_session_is_refused_before_transmission() {
    let mut rig = common::rig();
    rig.select();
    rig.session
        .prepare_decrease_counter(common::sfi_counter(), 1, 1)
        .unwrap();
    let sent = rig.sent_count();
    match rig.session.process_commands() {
        Err(Error::AccessLevelViolation {
            command: CommandKind::Decrease,
            level: None,
        }) => {}
        other => panic!("expected access violation, got {:?}", other),
    }
    assert_eq!(rig.sent_count(), sent);
    assert!(rig.session.queue().is_empty());
}
