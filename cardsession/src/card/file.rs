use std::collections::BTreeMap;

use crate::constants::COUNTER_WIDTH;
use crate::protocol::parser::{be_uint_at, be_uint_bytes};
use crate::types::Sfi;
use crate::{Error, Result};

/// Elementary file: records keyed by record number, plus the width used
/// when a record is read as a big-endian counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementaryFile {
    sfi: Sfi,
    records: BTreeMap<u8, Vec<u8>>,
    counter_width: usize,
}

impl ElementaryFile {
    pub fn new(sfi: Sfi) -> Self {
        Self {
            sfi,
            records: BTreeMap::new(),
            counter_width: COUNTER_WIDTH,
        }
    }

    pub fn sfi(&self) -> Sfi {
        self.sfi
    }

    pub fn record(&self, number: u8) -> Option<&[u8]> {
        self.records.get(&number).map(|r| r.as_slice())
    }

    /// Content of record 1, the usual single-record view.
    pub fn content(&self) -> Option<&[u8]> {
        self.record(1)
    }

    pub fn records(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.records.iter().map(|(n, r)| (*n, r.as_slice()))
    }

    pub fn counter_width(&self) -> usize {
        self.counter_width
    }

    /// Width (1..=4 bytes) of the counter view; other values are clamped.
    pub fn set_counter_width(&mut self, width: usize) {
        self.counter_width = width.clamp(1, 4);
    }

    /// Big-endian integer view of the first `counter_width` bytes of a record.
    pub fn counter(&self, number: u8) -> Option<u32> {
        let record = self.records.get(&number)?;
        be_uint_at(record, 0, self.counter_width).ok()
    }

    pub fn set_record(&mut self, number: u8, data: Vec<u8>) {
        self.records.insert(number, data);
    }

    /// WRITE RECORD semantics: OR `data` into the known content. Unknown
    /// records take `data` as is.
    pub fn or_record(&mut self, number: u8, data: &[u8]) {
        let record = self.records.entry(number).or_default();
        if record.len() < data.len() {
            record.resize(data.len(), 0);
        }
        for (dst, src) in record.iter_mut().zip(data) {
            *dst |= *src;
        }
    }

    /// Store `value` in the counter view of a record. Values wider than the
    /// configured counter width are refused.
    pub fn set_counter(&mut self, number: u8, value: u32) -> Result<()> {
        if self.counter_width < 4 && value >> (8 * self.counter_width) != 0 {
            return Err(Error::MalformedResponse(format!(
                "counter value {:#x} does not fit {} byte(s) of {}/{}",
                value, self.counter_width, self.sfi, number
            )));
        }
        let bytes = be_uint_bytes(value, self.counter_width);
        let record = self.records.entry(number).or_default();
        if record.len() < bytes.len() {
            record.resize(bytes.len(), 0);
        }
        record[..bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }
}
