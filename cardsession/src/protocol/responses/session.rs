use crate::constants::SESSION_CHALLENGE_LEN;
use crate::protocol::parser::{byte_at, ensure_len, slice_at};
use crate::Result;

/// Answer to OPEN SECURE SESSION: `card challenge(4) ratified(1) kvc(1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSessionResponse {
    pub card_challenge: Vec<u8>,
    /// False when the previous session was never ratified.
    pub previous_ratified: bool,
    pub kvc: u8,
}

pub fn decode_open_session(data: &[u8]) -> Result<OpenSessionResponse> {
    ensure_len(data, SESSION_CHALLENGE_LEN + 2)?;
    let card_challenge = slice_at(data, 0, SESSION_CHALLENGE_LEN)?.to_vec();
    let ratified = byte_at(data, SESSION_CHALLENGE_LEN)?;
    let kvc = byte_at(data, SESSION_CHALLENGE_LEN + 1)?;
    Ok(OpenSessionResponse {
        card_challenge,
        previous_ratified: ratified == 0x00,
        kvc,
    })
}

/// Answer to CLOSE SECURE SESSION: the card half of the session signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseSessionResponse {
    pub signature: Vec<u8>,
}

pub fn decode_close_session(data: &[u8]) -> Result<CloseSessionResponse> {
    ensure_len(data, 1)?;
    Ok(CloseSessionResponse {
        signature: data.to_vec(),
    })
}
