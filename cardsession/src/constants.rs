// cardsession/src/constants.rs
//! Common protocol constants used across the crate

/// ISO 7816-4 interindustry class byte
pub const CLA_ISO: u8 = 0x00;

/// Instruction bytes
pub const INS_SELECT: u8 = 0xA4;
pub const INS_READ_RECORD: u8 = 0xB2;
pub const INS_UPDATE_RECORD: u8 = 0xDC;
pub const INS_WRITE_RECORD: u8 = 0xD2;
pub const INS_INCREASE: u8 = 0x32;
pub const INS_DECREASE: u8 = 0x30;
pub const INS_OPEN_SESSION: u8 = 0x8A;
pub const INS_CLOSE_SESSION: u8 = 0x8E;

/// SELECT by DF name, first occurrence
pub const SELECT_P1_BY_NAME: u8 = 0x04;
pub const SELECT_P2_FIRST: u8 = 0x00;

/// READ/UPDATE/WRITE RECORD P2 low bits: "record number in P1"
pub const RECORD_P2_NUMBER_IN_P1: u8 = 0x04;

/// CLOSE SECURE SESSION P1 when a ratification command follows
pub const CLOSE_P1_RATIFICATION_ASKED: u8 = 0x80;

/// Status words
pub const SW_SUCCESS: u16 = 0x9000;
pub const SW_INVALIDATED: u16 = 0x6283;
pub const SW_RECORD_NOT_FOUND: u16 = 0x6A83;
pub const SW_FILE_NOT_FOUND: u16 = 0x6A82;
pub const SW_SECURITY_NOT_SATISFIED: u16 = 0x6982;
pub const SW_CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
pub const SW_COUNTER_OVERFLOW: u16 = 0x6400;
pub const SW_INS_NOT_SUPPORTED: u16 = 0x6D00;

/// FCI tags
pub const TAG_FCI_TEMPLATE: u8 = 0x6F;
pub const TAG_DF_NAME: u8 = 0x84;
pub const TAG_PROPRIETARY: u8 = 0xA5;
pub const TAG_DISCRETIONARY: [u8; 2] = [0xBF, 0x0C];
pub const TAG_SERIAL_NUMBER: u8 = 0xC7;
pub const TAG_STARTUP_INFO: u8 = 0x53;

/// Counters are 3-byte big-endian values
pub const COUNTER_WIDTH: usize = 3;
pub const COUNTER_MAX: u32 = 0x00FF_FFFF;

/// Largest record payload accepted in a single UPDATE/WRITE RECORD
pub const MAX_RECORD_DATA_LEN: usize = 250;

/// Challenge exchanged at OPEN SECURE SESSION
pub const SESSION_CHALLENGE_LEN: usize = 4;

/// Calypso "classic" demo application
pub const CALYPSO_CLASSIC_AID: &str = "315449432E49434131";
pub const SFI_ENVIRONMENT_AND_HOLDER: u8 = 0x07;
pub const SFI_EVENT_LOG: u8 = 0x08;
pub const SFI_CONTRACTS: u8 = 0x09;
pub const SFI_COUNTER_1: u8 = 0x19;
pub const RECORD_NUMBER_1: u8 = 1;

/// Reader names exposed by the plugin registry
pub const CONTACTLESS_READER_NAME: &str = "Cone2ContactlessReader";
pub const CONTACT_READER_NAME: &str = "Cone2ContactReader";
