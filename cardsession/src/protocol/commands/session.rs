use crate::constants::{
    CLA_ISO, CLOSE_P1_RATIFICATION_ASKED, INS_CLOSE_SESSION, INS_OPEN_SESSION, INS_READ_RECORD,
};
use crate::protocol::apdu::ApduCommand;
use crate::types::AccessLevel;

/// OPEN SECURE SESSION without record read:
/// `00 8A keyIndex 01 Lc challenge 00`
pub fn encode_open_session(level: AccessLevel, challenge: &[u8]) -> Vec<u8> {
    ApduCommand::new(CLA_ISO, INS_OPEN_SESSION, level.key_index(), 0x01)
        .data(challenge)
        .le(0x00)
        .build()
}

/// CLOSE SECURE SESSION carrying the terminal half of the session signature.
pub fn encode_close_session(signature: &[u8], ratification_asked: bool) -> Vec<u8> {
    let p1 = if ratification_asked {
        CLOSE_P1_RATIFICATION_ASKED
    } else {
        0x00
    };
    ApduCommand::new(CLA_ISO, INS_CLOSE_SESSION, p1, 0x00)
        .data(signature)
        .le(0x00)
        .build()
}

/// Ratification: an innocuous READ RECORD whose response is ignored.
pub fn encode_ratification() -> Vec<u8> {
    ApduCommand::new(CLA_ISO, INS_READ_RECORD, 0x00, 0x00)
        .le(0x00)
        .build()
}
