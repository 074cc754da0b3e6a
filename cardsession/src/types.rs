// cardsession/src/types.rs

use crate::Error;
use derive_more::Display;
use std::convert::TryFrom;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Short File Identifier (1..=30)
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "{:#04x}", _0)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sfi(u8);

impl Sfi {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 30;

    pub fn new(sfi: u8) -> crate::Result<Self> {
        Self::try_from(sfi)
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// SFI shifted into the upper five bits of a P2 byte.
    pub fn p2_bits(&self) -> u8 {
        self.0 << 3
    }
}

impl TryFrom<u8> for Sfi {
    type Error = Error;

    fn try_from(sfi: u8) -> Result<Self, Self::Error> {
        if !(Self::MIN..=Self::MAX).contains(&sfi) {
            return Err(Error::InvalidOperand(format!(
                "sfi {:#04x} outside {:#04x}..={:#04x}",
                sfi,
                Self::MIN,
                Self::MAX
            )));
        }
        Ok(Self(sfi))
    }
}

/// Application Identifier (5..=16 bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aid(Vec<u8>);

impl Aid {
    pub const MIN_LEN: usize = 5;
    pub const MAX_LEN: usize = 16;

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(&self.0).to_uppercase()
    }

    /// True when `df_name` starts with this AID (partial selection).
    pub fn matches(&self, df_name: &[u8]) -> bool {
        df_name.starts_with(&self.0)
    }
}

impl TryFrom<&[u8]> for Aid {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < Self::MIN_LEN || bytes.len() > Self::MAX_LEN {
            return Err(Error::InvalidLength {
                expected: Self::MIN_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes.to_vec()))
    }
}

impl FromStr for Aid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = crate::utils::parse_hex(s).map_err(Error::Configuration)?;
        Self::try_from(&bytes[..])
    }
}

impl std::fmt::Display for Aid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Card serial number - Newtype Pattern (8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SerialNumber([u8; 8]);

impl SerialNumber {
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        crate::utils::bytes_to_hex(self.as_bytes())
    }
}

impl TryFrom<&[u8]> for SerialNumber {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != 8 {
            return Err(Error::InvalidLength {
                expected: 8,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

/// Radio or contact protocol a card answered with.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CardProtocol {
    #[display(fmt = "ISO_14443_3A")]
    Iso14443A,
    #[display(fmt = "ISO_14443_3B")]
    Iso14443B,
    #[display(fmt = "ISO_14443_INNO")]
    InnovatronB,
    #[display(fmt = "INNOVATRON_HIGH_SPEED")]
    InnovatronHighSpeed,
}

impl CardProtocol {
    pub fn is_contactless(&self) -> bool {
        !matches!(self, Self::InnovatronHighSpeed)
    }
}

/// Session access level; also selects the SAM key used for the session.
#[repr(u8)]
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AccessLevel {
    #[display(fmt = "READ")]
    Read = 1,
    #[display(fmt = "LOAD")]
    Load = 2,
    #[display(fmt = "DEBIT")]
    Debit = 3,
}

impl AccessLevel {
    pub fn key_index(&self) -> u8 {
        *self as u8
    }

    pub fn permits_increase(&self) -> bool {
        matches!(self, Self::Load)
    }

    pub fn permits_decrease(&self) -> bool {
        matches!(self, Self::Debit)
    }

    pub fn permits_record_writes(&self) -> bool {
        matches!(self, Self::Load | Self::Debit)
    }
}

/// What to do with an application the card reports as invalidated (SW 6283).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InvalidationPolicy {
    #[default]
    Reject,
    Accept,
}

/// Evaluation policy when several selection cases are registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MultiSelectionProcessing {
    #[default]
    FirstMatch,
    ProcessAll,
}

/// Which insertions are reported to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NotificationMode {
    #[default]
    MatchedOnly,
    Always,
}

/// Whether card detection keeps running after the first removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PollingMode {
    #[default]
    Repeating,
    SingleShot,
}

/// Contact slot of the SAM readers.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SamSlot {
    #[display(fmt = "1")]
    One,
    #[display(fmt = "2")]
    Two,
}

/// Physical interface of the shared reader a request is addressed to.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    #[display(fmt = "contactless")]
    Contactless,
    #[display(fmt = "contact slot {}", _0)]
    Contact(SamSlot),
}

/// Card command families, used for error reporting and access checks.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    #[display(fmt = "SELECT")]
    Select,
    #[display(fmt = "READ RECORD")]
    ReadRecord,
    #[display(fmt = "UPDATE RECORD")]
    UpdateRecord,
    #[display(fmt = "WRITE RECORD")]
    WriteRecord,
    #[display(fmt = "INCREASE")]
    Increase,
    #[display(fmt = "DECREASE")]
    Decrease,
    #[display(fmt = "OPEN SECURE SESSION")]
    OpenSession,
    #[display(fmt = "CLOSE SECURE SESSION")]
    CloseSession,
    #[display(fmt = "RATIFICATION")]
    Ratification,
}

impl CommandKind {
    /// Commands that change card content.
    pub fn is_modifying(&self) -> bool {
        matches!(
            self,
            Self::UpdateRecord | Self::WriteRecord | Self::Increase | Self::Decrease
        )
    }

    /// Whether `level` allows this command inside a secure session.
    pub fn permitted_under(&self, level: AccessLevel) -> bool {
        match self {
            Self::Increase => level.permits_increase(),
            Self::Decrease => level.permits_decrease(),
            Self::UpdateRecord | Self::WriteRecord => level.permits_record_writes(),
            _ => true,
        }
    }
}
