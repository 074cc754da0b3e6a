// cardsession/src/transport/mock.rs

use crate::transport::traits::Transport;
use crate::types::{CardProtocol, Interface};
use crate::{Error, Result};

/// Mock transport for unit tests. It records sent APDUs and returns queued
/// responses; presence probes consume a scripted sequence.
#[derive(Debug)]
pub struct MockTransport {
    pub sent: Vec<(Interface, Vec<u8>)>,
    pub responses: Vec<Vec<u8>>,
    /// Scripted presence answers; when exhausted `present` is repeated.
    pub presence: Vec<bool>,
    pub present: bool,
    pub protocol: Option<CardProtocol>,
    /// Testing hook: number of upcoming calls that should fail with Io
    pub io_failures: usize,
    pub batch_limit: usize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            responses: Vec::new(),
            presence: Vec::new(),
            present: false,
            protocol: Some(CardProtocol::Iso14443B),
            io_failures: 0,
            batch_limit: usize::MAX,
        }
    }

    /// Set how many subsequent calls should fail (for tests).
    pub fn set_io_failures(&mut self, n: usize) {
        self.io_failures = n;
    }

    pub fn push_response(&mut self, resp: Vec<u8>) {
        self.responses.push(resp);
    }

    pub fn push_presence(&mut self, present: bool) {
        self.presence.push(present);
    }

    fn take_failure(&mut self) -> Result<()> {
        if self.io_failures > 0 {
            self.io_failures -= 1;
            return Err(Error::Io("simulated link failure".into()));
        }
        Ok(())
    }
}

impl Transport for MockTransport {
    fn transmit(&mut self, interface: Interface, apdu: &[u8]) -> Result<Vec<u8>> {
        self.take_failure()?;
        self.sent.push((interface, apdu.to_vec()));
        if self.responses.is_empty() {
            Err(Error::Io("no response queued".into()))
        } else {
            Ok(self.responses.remove(0))
        }
    }

    fn is_card_present(&mut self, _interface: Interface) -> Result<bool> {
        self.take_failure()?;
        if !self.presence.is_empty() {
            self.present = self.presence.remove(0);
        }
        Ok(self.present)
    }

    fn card_protocol(&mut self, _interface: Interface) -> Result<Option<CardProtocol>> {
        Ok(self.protocol)
    }

    fn max_batch_len(&self) -> usize {
        self.batch_limit
    }
}
