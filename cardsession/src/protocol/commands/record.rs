use crate::constants::{
    CLA_ISO, INS_READ_RECORD, INS_UPDATE_RECORD, INS_WRITE_RECORD, RECORD_P2_NUMBER_IN_P1,
};
use crate::protocol::apdu::ApduCommand;
use crate::types::Sfi;

/// READ RECORD: `00 B2 rec (sfi<<3|4) 00`
pub fn encode_read_record(sfi: Sfi, record: u8) -> Vec<u8> {
    ApduCommand::new(CLA_ISO, INS_READ_RECORD, record, p2(sfi))
        .le(0x00)
        .build()
}

/// UPDATE RECORD (replace): `00 DC rec (sfi<<3|4) Lc data`
pub fn encode_update_record(sfi: Sfi, record: u8, data: &[u8]) -> Vec<u8> {
    ApduCommand::new(CLA_ISO, INS_UPDATE_RECORD, record, p2(sfi))
        .data(data)
        .build()
}

/// WRITE RECORD (bitwise OR into the record): `00 D2 rec (sfi<<3|4) Lc data`
pub fn encode_write_record(sfi: Sfi, record: u8, data: &[u8]) -> Vec<u8> {
    ApduCommand::new(CLA_ISO, INS_WRITE_RECORD, record, p2(sfi))
        .data(data)
        .build()
}

fn p2(sfi: Sfi) -> u8 {
    sfi.p2_bits() | RECORD_P2_NUMBER_IN_P1
}
