// cardsession/src/protocol/commands/mod.rs

pub mod counter;
pub mod record;
pub mod select;
pub mod session;

pub use counter::{encode_decrease, encode_increase};
pub use record::{encode_read_record, encode_update_record, encode_write_record};
pub use select::encode_select;
pub use session::{encode_close_session, encode_open_session, encode_ratification};

use crate::types::{AccessLevel, Aid, CommandKind, Sfi};

/// High-level card command. New commands should be added here and
/// their encoder placed in `protocol::commands::<family>.rs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardCommand {
    Select {
        aid: Aid,
    },
    ReadRecord {
        sfi: Sfi,
        record: u8,
    },
    UpdateRecord {
        sfi: Sfi,
        record: u8,
        data: Vec<u8>,
    },
    WriteRecord {
        sfi: Sfi,
        record: u8,
        data: Vec<u8>,
    },
    Increase {
        sfi: Sfi,
        record: u8,
        delta: u32,
    },
    Decrease {
        sfi: Sfi,
        record: u8,
        delta: u32,
    },
    OpenSession {
        level: AccessLevel,
        challenge: Vec<u8>,
    },
    CloseSession {
        signature: Vec<u8>,
        ratification_asked: bool,
    },
    Ratification,
}

impl CardCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Select { .. } => CommandKind::Select,
            Self::ReadRecord { .. } => CommandKind::ReadRecord,
            Self::UpdateRecord { .. } => CommandKind::UpdateRecord,
            Self::WriteRecord { .. } => CommandKind::WriteRecord,
            Self::Increase { .. } => CommandKind::Increase,
            Self::Decrease { .. } => CommandKind::Decrease,
            Self::OpenSession { .. } => CommandKind::OpenSession,
            Self::CloseSession { .. } => CommandKind::CloseSession,
            Self::Ratification => CommandKind::Ratification,
        }
    }

    /// Encode the command into its APDU bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Select { aid } => encode_select(aid),
            Self::ReadRecord { sfi, record } => encode_read_record(*sfi, *record),
            Self::UpdateRecord { sfi, record, data } => encode_update_record(*sfi, *record, data),
            Self::WriteRecord { sfi, record, data } => encode_write_record(*sfi, *record, data),
            Self::Increase { sfi, record, delta } => encode_increase(*sfi, *record, *delta),
            Self::Decrease { sfi, record, delta } => encode_decrease(*sfi, *record, *delta),
            Self::OpenSession { level, challenge } => encode_open_session(*level, challenge),
            Self::CloseSession {
                signature,
                ratification_asked,
            } => encode_close_session(signature, *ratification_asked),
            Self::Ratification => encode_ratification(),
        }
    }
}
