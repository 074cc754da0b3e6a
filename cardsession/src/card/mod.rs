// cardsession/src/card/mod.rs

use std::collections::BTreeMap;

use crate::protocol::{CardCommand, CardResponse};
use crate::types::{CardProtocol, SerialNumber, Sfi};
use crate::{Error, Result};

mod file;
pub use file::ElementaryFile;

pub mod builder;
pub use builder::CardBuilder;

/// Saved file model, restored when a secure session aborts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot(BTreeMap<Sfi, ElementaryFile>);

/// In-memory model of a selected card. Files only ever reflect commands the
/// card confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    serial_number: SerialNumber,
    df_name: Vec<u8>,
    startup_info: Option<Vec<u8>>,
    protocol: Option<CardProtocol>,
    files: BTreeMap<Sfi, ElementaryFile>,
    valid: bool,
}

impl Card {
    pub fn new(serial_number: SerialNumber, df_name: Vec<u8>, protocol: Option<CardProtocol>) -> Self {
        Self {
            serial_number,
            df_name,
            startup_info: None,
            protocol,
            files: BTreeMap::new(),
            valid: true,
        }
    }

    pub fn serial_number(&self) -> &SerialNumber {
        &self.serial_number
    }

    pub fn df_name(&self) -> &[u8] {
        &self.df_name
    }

    pub fn startup_info(&self) -> Option<&[u8]> {
        self.startup_info.as_deref()
    }

    pub(crate) fn set_startup_info(&mut self, info: Option<Vec<u8>>) {
        self.startup_info = info;
    }

    pub fn protocol(&self) -> Option<CardProtocol> {
        self.protocol
    }

    pub fn file(&self, sfi: Sfi) -> Option<&ElementaryFile> {
        self.files.get(&sfi)
    }

    /// File for `sfi`, created empty on first access.
    pub fn file_mut(&mut self, sfi: Sfi) -> &mut ElementaryFile {
        self.files.entry(sfi).or_insert_with(|| ElementaryFile::new(sfi))
    }

    pub fn files(&self) -> impl Iterator<Item = &ElementaryFile> {
        self.files.values()
    }

    /// Counter view of `record` in file `sfi`.
    pub fn counter(&self, sfi: Sfi, record: u8) -> Option<u32> {
        self.file(sfi).and_then(|f| f.counter(record))
    }

    /// False once a secure session closed with an error: the physical card
    /// state is unknown until a fresh selection.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }

    pub(crate) fn snapshot(&self) -> FileSnapshot {
        FileSnapshot(self.files.clone())
    }

    pub(crate) fn restore(&mut self, snapshot: FileSnapshot) {
        self.files = snapshot.0;
    }

    /// Apply the effect of a command the card confirmed.
    pub fn apply(&mut self, command: &CardCommand, response: &CardResponse) -> Result<()> {
        match (command, response) {
            (CardCommand::ReadRecord { sfi, record }, CardResponse::Record(data)) => {
                self.file_mut(*sfi).set_record(*record, data.clone());
            }
            (CardCommand::UpdateRecord { sfi, record, data }, CardResponse::Done) => {
                self.file_mut(*sfi).set_record(*record, data.clone());
            }
            (CardCommand::WriteRecord { sfi, record, data }, CardResponse::Done) => {
                self.file_mut(*sfi).or_record(*record, data);
            }
            (CardCommand::Increase { sfi, record, delta }, CardResponse::Counter(value)) => {
                let value = match value {
                    Some(v) => *v,
                    None => self.known_counter(*sfi, *record, command)?.saturating_add(*delta),
                };
                self.file_mut(*sfi).set_counter(*record, value)?;
            }
            (CardCommand::Decrease { sfi, record, delta }, CardResponse::Counter(value)) => {
                let value = match value {
                    Some(v) => *v,
                    None => self.known_counter(*sfi, *record, command)?.saturating_sub(*delta),
                };
                self.file_mut(*sfi).set_counter(*record, value)?;
            }
            (
                CardCommand::Select { .. }
                | CardCommand::OpenSession { .. }
                | CardCommand::CloseSession { .. }
                | CardCommand::Ratification,
                _,
            ) => {}
            (command, response) => {
                return Err(Error::MalformedResponse(format!(
                    "{} answered with {:?}",
                    command.kind(),
                    response
                )));
            }
        }
        Ok(())
    }

    fn known_counter(&self, sfi: Sfi, record: u8, command: &CardCommand) -> Result<u32> {
        self.counter(sfi, record).ok_or_else(|| {
            Error::MalformedResponse(format!(
                "{} on unread counter {}/{} returned no value",
                command.kind(),
                sfi,
                record
            ))
        })
    }
}
