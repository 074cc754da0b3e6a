// cardsession/src/protocol/responses/mod.rs

pub mod counter;
pub mod fci;
pub mod session;

pub use counter::decode_counter_value;
pub use fci::{Fci, decode_fci, encode_fci};
pub use session::{CloseSessionResponse, OpenSessionResponse, decode_close_session, decode_open_session};

use crate::protocol::apdu::ApduResponse;
use crate::protocol::commands::CardCommand;
use crate::{Error, Result};

/// Decoded answer to a [`CardCommand`]. Per-command decoders live in
/// `protocol::responses::<family>.rs` and are dispatched here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardResponse {
    Selected(Fci),
    Record(Vec<u8>),
    Counter(Option<u32>),
    SessionOpened(OpenSessionResponse),
    SessionClosed(CloseSessionResponse),
    /// Status-only answer (record updates, ratification)
    Done,
}

impl CardResponse {
    /// Decode a successful response for `command`. Unsuccessful status words
    /// are reported as `Error::Command` before any data is interpreted.
    pub fn decode(command: &CardCommand, apdu: &ApduResponse) -> Result<Self> {
        if !apdu.is_success() && !matches!(command, CardCommand::Ratification) {
            return Err(Error::Command {
                command: command.kind(),
                sw: apdu.sw,
            });
        }

        match command {
            CardCommand::Select { .. } => decode_fci(&apdu.data).map(Self::Selected),
            CardCommand::ReadRecord { .. } => {
                if apdu.data.is_empty() {
                    return Err(Error::MalformedResponse("empty record".into()));
                }
                Ok(Self::Record(apdu.data.clone()))
            }
            CardCommand::Increase { .. } | CardCommand::Decrease { .. } => {
                decode_counter_value(&apdu.data).map(Self::Counter)
            }
            CardCommand::OpenSession { .. } => {
                decode_open_session(&apdu.data).map(Self::SessionOpened)
            }
            CardCommand::CloseSession { .. } => {
                decode_close_session(&apdu.data).map(Self::SessionClosed)
            }
            CardCommand::UpdateRecord { .. }
            | CardCommand::WriteRecord { .. }
            | CardCommand::Ratification => Ok(Self::Done),
        }
    }
}
