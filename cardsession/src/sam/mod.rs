// cardsession/src/sam/mod.rs

//! Security module gateway.
//!
//! The SAM is an opaque capability: it hands out the terminal challenge for
//! a session, signs the terminal half of the closing and verifies the
//! card's half. The gateway serializes access to it and tracks whether its
//! channel is open.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::protocol::{CardCommand, decode_close_session};
use crate::reader::ReaderChannel;
use crate::session::{Exchange, SecuritySession};
use crate::types::AccessLevel;
use crate::{Error, Result};

/// Security module capability.
pub trait SecurityModule: Send {
    /// Bring the module up; called once per channel.
    fn open(&mut self) -> Result<()>;

    /// Terminal challenge for a session at `level`.
    fn begin_session(&mut self, level: AccessLevel) -> Result<Vec<u8>>;

    /// Terminal half of the closing signature over `log`.
    fn sign(&mut self, log: &[Exchange]) -> Result<Vec<u8>>;

    /// Check the card half of the signature against `log`.
    fn verify(&mut self, log: &[Exchange], card_signature: &[u8]) -> Result<bool>;
}

/// Token for an open SAM channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamHandle {
    id: u64,
}

impl SamHandle {
    pub fn id(&self) -> u64 {
        self.id
    }
}

struct SamState {
    module: Box<dyn SecurityModule>,
    reader: Option<ReaderChannel>,
    handle: Option<SamHandle>,
    opened: u64,
}

/// Shared, locked access to one security module.
#[derive(Clone)]
pub struct SamGateway {
    inner: Arc<Mutex<SamState>>,
}

impl std::fmt::Debug for SamGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamGateway").finish_non_exhaustive()
    }
}

impl SamGateway {
    pub fn new(module: Box<dyn SecurityModule>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SamState {
                module,
                reader: None,
                handle: None,
                opened: 0,
            })),
        }
    }

    /// Gateway whose channel only opens while a SAM sits in `reader`.
    pub fn with_reader(module: Box<dyn SecurityModule>, reader: ReaderChannel) -> Self {
        let gateway = Self::new(module);
        if let Ok(mut state) = gateway.inner.lock() {
            state.reader = Some(reader);
        }
        gateway
    }

    fn lock(&self) -> Result<MutexGuard<'_, SamState>> {
        self.inner
            .lock()
            .map_err(|_| Error::SamUnavailable("security module lock poisoned".into()))
    }

    /// Open the channel, or return the handle of the one already open.
    pub fn open_channel(&self) -> Result<SamHandle> {
        let mut state = self.lock()?;
        if let Some(handle) = state.handle {
            return Ok(handle);
        }
        if let Some(reader) = &state.reader {
            let present = reader.is_card_present().map_err(unavailable)?;
            if !present {
                return Err(Error::SamUnavailable(format!("no SAM in {}", reader.name())));
            }
        }
        state.module.open().map_err(unavailable)?;
        state.opened += 1;
        let handle = SamHandle { id: state.opened };
        state.handle = Some(handle);
        log::info!("SAM channel {} open", handle.id);
        Ok(handle)
    }

    pub fn is_open(&self) -> bool {
        self.lock().map(|s| s.handle.is_some()).unwrap_or(false)
    }

    /// Drop the channel; the next `open_channel` reopens the module.
    pub fn close_channel(&self) -> Result<()> {
        self.lock()?.handle = None;
        Ok(())
    }

    pub fn begin_session(&self, handle: &SamHandle, level: AccessLevel) -> Result<SecuritySession> {
        let mut state = self.lock()?;
        if state.handle != Some(*handle) {
            return Err(Error::SamUnavailable(format!(
                "channel {} is not open",
                handle.id
            )));
        }
        let challenge = state.module.begin_session(level).map_err(unavailable)?;
        log::debug!("SAM session begun at {}", level);
        Ok(SecuritySession::new(level, challenge))
    }

    /// Terminal signature carried by CLOSE SECURE SESSION.
    pub fn session_signature(&self, session: &SecuritySession) -> Result<Vec<u8>> {
        let mut state = self.ensure_open()?;
        state.module.sign(session.log()).map_err(unavailable)
    }

    /// Verify the closing recorded at the end of the session's log. Only a
    /// successful return makes the session's effects durable.
    pub fn end_session(&self, session: SecuritySession) -> Result<()> {
        let (close, signed) = session
            .log()
            .split_last()
            .filter(|(last, _)| matches!(last.command, CardCommand::CloseSession { .. }))
            .ok_or_else(|| Error::SessionVerification("log does not end with a closing".into()))?;
        let card_signature = decode_close_session(&close.response.data)
            .map_err(|e| Error::SessionVerification(e.to_string()))?
            .signature;

        let mut state = self.ensure_open()?;
        let verified = state
            .module
            .verify(signed, &card_signature)
            .map_err(unavailable)?;
        if !verified {
            return Err(Error::SessionVerification(format!(
                "card signature rejected after {} exchange(s)",
                signed.len()
            )));
        }
        log::info!("SAM verified session at {}", session.level());
        Ok(())
    }

    fn ensure_open(&self) -> Result<MutexGuard<'_, SamState>> {
        let state = self.lock()?;
        if state.handle.is_none() {
            return Err(Error::SamUnavailable("channel closed".into()));
        }
        Ok(state)
    }
}

fn unavailable(e: Error) -> Error {
    match e {
        Error::SamUnavailable(_) | Error::SessionVerification(_) => e,
        other => Error::SamUnavailable(other.to_string()),
    }
}
