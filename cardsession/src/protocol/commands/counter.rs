use crate::constants::{CLA_ISO, COUNTER_WIDTH, INS_DECREASE, INS_INCREASE};
use crate::protocol::apdu::ApduCommand;
use crate::protocol::parser::be_uint_bytes;
use crate::types::Sfi;

/// INCREASE: `00 32 counter (sfi<<3) 03 value(3) 00`
pub fn encode_increase(sfi: Sfi, counter: u8, delta: u32) -> Vec<u8> {
    encode_counter(INS_INCREASE, sfi, counter, delta)
}

/// DECREASE: `00 30 counter (sfi<<3) 03 value(3) 00`
pub fn encode_decrease(sfi: Sfi, counter: u8, delta: u32) -> Vec<u8> {
    encode_counter(INS_DECREASE, sfi, counter, delta)
}

fn encode_counter(ins: u8, sfi: Sfi, counter: u8, delta: u32) -> Vec<u8> {
    ApduCommand::new(CLA_ISO, ins, counter, sfi.p2_bits())
        .data(&be_uint_bytes(delta, COUNTER_WIDTH))
        .le(0x00)
        .build()
}
