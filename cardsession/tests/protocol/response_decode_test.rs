#[path = "../common/mod.rs"]
mod common;

use cardsession::Error;
use cardsession::protocol::{ApduResponse, CardCommand, CardResponse, decode_fci, encode_fci};
use cardsession::types::{AccessLevel, CommandKind, SerialNumber};

fn response(hex_str: &str) -> ApduResponse {
    ApduResponse::parse(&hex::decode(hex_str).unwrap()).unwrap()
}

#[test]
fn fci_fields_are_extracted() {
    let serial = SerialNumber::from_bytes([0, 0, 0, 0, 0x12, 0x34, 0x56, 0x78]);
    let data = encode_fci(common::aid().as_bytes(), &serial, &[0x0A, 0x3C, 0x11]).unwrap();
    let fci = decode_fci(&data).unwrap();
    assert_eq!(fci.df_name, common::aid().as_bytes());
    assert_eq!(fci.serial_number, serial);
    assert_eq!(fci.startup_info, Some(vec![0x0A, 0x3C, 0x11]));
}

#[test]
fn fci_without_serial_is_malformed() {
    // 6F { 84 "1TIC." }
    assert!(matches!(
        decode_fci(&hex::decode("6F078405315449432E").unwrap()),
        Err(Error::MalformedResponse(_))
    ));
}

#[test]
fn counter_response_holds_new_value() {
    let cmd = CardCommand::Increase {
        sfi: common::sfi_counter(),
        record: 1,
        delta: 10,
    };
    assert_eq!(
        CardResponse::decode(&cmd, &response("00006E9000")).unwrap(),
        CardResponse::Counter(Some(110))
    );
}

#[test]
fn open_session_response() {
    let cmd = CardCommand::OpenSession {
        level: AccessLevel::Load,
        challenge: vec![0; 4],
    };
    match CardResponse::decode(&cmd, &response("C1A11E0600799000")).unwrap() {
        CardResponse::SessionOpened(opened) => {
            assert_eq!(opened.card_challenge, vec![0xC1, 0xA1, 0x1E, 0x06]);
            assert!(opened.previous_ratified);
            assert_eq!(opened.kvc, 0x79);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn rejection_is_reported_with_status_word() {
    let cmd = CardCommand::ReadRecord {
        sfi: common::sfi_event_log(),
        record: 3,
    };
    match CardResponse::decode(&cmd, &response("6A83")) {
        Err(Error::Command {
            command: CommandKind::ReadRecord,
            sw: 0x6A83,
        }) => {}
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn ratification_ignores_status() {
    assert_eq!(
        CardResponse::decode(&CardCommand::Ratification, &response("6B00")).unwrap(),
        CardResponse::Done
    );
}

#[test]
fn short_response_is_rejected() {
    assert!(matches!(
        ApduResponse::parse(&[0x90]),
        Err(Error::InvalidLength { expected: 2, actual: 1 })
    ));
}
