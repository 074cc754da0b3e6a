// cardsession/src/protocol/apdu.rs

use crate::constants::SW_SUCCESS;
use crate::{Error, Result};

/// Response APDU: data followed by the two status bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    pub data: Vec<u8>,
    pub sw: u16,
}

impl ApduResponse {
    pub fn new(data: Vec<u8>, sw: u16) -> Self {
        Self { data, sw }
    }

    /// Split raw response bytes into data and status word.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.len() < 2 {
            return Err(Error::InvalidLength {
                expected: 2,
                actual: raw.len(),
            });
        }
        let split = raw.len() - 2;
        let sw = u16::from_be_bytes([raw[split], raw[split + 1]]);
        Ok(Self {
            data: raw[..split].to_vec(),
            sw,
        })
    }

    pub fn is_success(&self) -> bool {
        self.sw == SW_SUCCESS
    }

    /// Raw bytes as sent on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        out.extend_from_slice(&self.sw.to_be_bytes());
        out
    }
}

/// Command APDU builder (short length encoding only).
#[derive(Debug, Clone)]
pub struct ApduCommand {
    cla: u8,
    ins: u8,
    p1: u8,
    p2: u8,
    data: Vec<u8>,
    le: Option<u8>,
}

impl ApduCommand {
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    pub fn data(mut self, data: &[u8]) -> Self {
        self.data = data.to_vec();
        self
    }

    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];
        if !self.data.is_empty() {
            apdu.push(self.data.len() as u8);
            apdu.extend_from_slice(&self.data);
        }
        if let Some(le) = self.le {
            apdu.push(le);
        }
        apdu
    }
}
