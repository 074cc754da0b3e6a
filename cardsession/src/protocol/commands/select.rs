use crate::constants::{CLA_ISO, INS_SELECT, SELECT_P1_BY_NAME, SELECT_P2_FIRST};
use crate::protocol::apdu::ApduCommand;
use crate::types::Aid;

/// SELECT by DF name: `00 A4 04 00 Lc AID 00`
pub fn encode_select(aid: &Aid) -> Vec<u8> {
    ApduCommand::new(CLA_ISO, INS_SELECT, SELECT_P1_BY_NAME, SELECT_P2_FIRST)
        .data(aid.as_bytes())
        .le(0x00)
        .build()
}
