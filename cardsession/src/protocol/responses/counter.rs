use crate::constants::COUNTER_WIDTH;
use crate::protocol::parser::be_uint_at;
use crate::Result;

/// INCREASE/DECREASE answer with the new counter value; some cards answer
/// with no data at all, which yields `None`.
pub fn decode_counter_value(data: &[u8]) -> Result<Option<u32>> {
    if data.is_empty() {
        return Ok(None);
    }
    be_uint_at(data, 0, COUNTER_WIDTH).map(Some)
}
