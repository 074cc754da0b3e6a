// cardsession/src/reader/mod.rs

//! Readers over one shared, locked transport.
//!
//! A physical reader exposes a contactless antenna and up to two contact
//! slots (where the SAM sits). Every [`Reader`] variant holds a
//! [`ReaderChannel`] on the same `Arc<Mutex<Box<dyn Transport>>>`, so a
//! presence probe can never interleave with a command exchange.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::protocol::ApduResponse;
use crate::transport::Transport;
use crate::types::{CardProtocol, Interface, SamSlot};
use crate::{Error, Result};

pub mod dispatcher;
pub mod event;

pub use dispatcher::{
    CardDetector, DetectionHandle, ObservableReader, ObservationErrorHandler, PresenceChange,
    ReaderEventDispatcher, ReaderObserver,
};
pub use event::{ReaderEvent, ReaderEventKind};

/// Transport handle shared by every reader of a plugin.
pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

/// Wrap a transport so several readers can share it.
pub fn share(transport: Box<dyn Transport>) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}

/// Addressed view of the shared transport. Clones share both the transport
/// and the single secure-session slot of the reader.
#[derive(Clone)]
pub struct ReaderChannel {
    name: String,
    interface: Interface,
    transport: SharedTransport,
    session_slot: Arc<AtomicBool>,
}

impl std::fmt::Debug for ReaderChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderChannel")
            .field("name", &self.name)
            .field("interface", &self.interface)
            .field("session_open", &self.session_open())
            .finish()
    }
}

impl ReaderChannel {
    pub fn new(name: impl Into<String>, interface: Interface, transport: SharedTransport) -> Self {
        Self {
            name: name.into(),
            interface,
            transport,
            session_slot: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interface(&self) -> Interface {
        self.interface
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn Transport>>> {
        self.transport
            .lock()
            .map_err(|_| Error::Io(format!("{}: transport lock poisoned", self.name)))
    }

    /// One command/response exchange, holding the lock until the response
    /// is in.
    pub fn transmit(&self, apdu: &[u8]) -> Result<ApduResponse> {
        let mut transport = self.lock()?;
        let raw = transport.transmit(self.interface, apdu)?;
        ApduResponse::parse(&raw)
    }

    /// Ordered exchange of several APDUs under a single lock acquisition.
    pub fn transmit_batch(&self, apdus: &[Vec<u8>]) -> Result<Vec<ApduResponse>> {
        let mut transport = self.lock()?;
        log::debug!("{}: transmitting {} apdu(s)", self.name, apdus.len());
        transport.transmit_batch(self.interface, apdus)
    }

    pub fn is_card_present(&self) -> Result<bool> {
        self.lock()?.is_card_present(self.interface)
    }

    pub fn card_protocol(&self) -> Result<Option<CardProtocol>> {
        self.lock()?.card_protocol(self.interface)
    }

    pub fn max_batch_len(&self) -> Result<usize> {
        Ok(self.lock()?.max_batch_len().max(1))
    }

    /// Claim the reader's only secure-session slot. The slot is released
    /// when the returned claim is dropped.
    pub fn claim_session(&self) -> Result<SessionClaim> {
        if self
            .session_slot
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Configuration(format!(
                "{}: a secure session is already open on this reader",
                self.name
            )));
        }
        Ok(SessionClaim {
            slot: Arc::clone(&self.session_slot),
        })
    }

    pub fn session_open(&self) -> bool {
        self.session_slot.load(Ordering::Acquire)
    }
}

/// Held while a secure session is open on a reader.
#[derive(Debug)]
pub struct SessionClaim {
    slot: Arc<AtomicBool>,
}

impl Drop for SessionClaim {
    fn drop(&mut self) {
        self.slot.store(false, Ordering::Release);
    }
}

/// Contactless antenna of the reader.
#[derive(Debug, Clone)]
pub struct ContactlessReader {
    channel: ReaderChannel,
}

impl ContactlessReader {
    pub fn new(name: impl Into<String>, transport: SharedTransport) -> Self {
        Self {
            channel: ReaderChannel::new(name, Interface::Contactless, transport),
        }
    }
}

/// Contact slot holding a SAM.
#[derive(Debug, Clone)]
pub struct ContactReader {
    channel: ReaderChannel,
    slot: SamSlot,
}

impl ContactReader {
    pub fn new(name: impl Into<String>, slot: SamSlot, transport: SharedTransport) -> Self {
        Self {
            channel: ReaderChannel::new(name, Interface::Contact(slot), transport),
            slot,
        }
    }

    pub fn slot(&self) -> SamSlot {
        self.slot
    }
}

/// Reader variants, fixed when the plugin builds its registry.
#[derive(Debug, Clone)]
pub enum Reader {
    Contactless(ContactlessReader),
    Contact(ContactReader),
}

impl Reader {
    pub fn channel(&self) -> &ReaderChannel {
        match self {
            Reader::Contactless(r) => &r.channel,
            Reader::Contact(r) => &r.channel,
        }
    }

    pub fn name(&self) -> &str {
        self.channel().name()
    }

    pub fn is_contactless(&self) -> bool {
        matches!(self, Reader::Contactless(_))
    }

    pub fn is_card_present(&self) -> Result<bool> {
        self.channel().is_card_present()
    }
}

impl From<ContactlessReader> for Reader {
    fn from(r: ContactlessReader) -> Self {
        Reader::Contactless(r)
    }
}

impl From<ContactReader> for Reader {
    fn from(r: ContactReader) -> Self {
        Reader::Contact(r)
    }
}
