//! Test support helpers intended for use by unit and integration tests.
//!
//! Simulated hardware speaking the same APDUs as a real card: a
//! [`SimulatedCard`] behind a [`SimulatedReader`] transport, a
//! [`SimulatedSam`] security module and, with the `async` feature, a
//! [`SimulatedHardware`] platform for plugin tests and demos. Handles are
//! shared so tests can inspect what was sent after the transport has been
//! boxed away.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::*;
use crate::protocol::encode_fci;
use crate::protocol::parser::{be_uint_at, be_uint_bytes};
use crate::sam::SecurityModule;
use crate::session::Exchange;
use crate::transport::Transport;
use crate::types::{AccessLevel, CardProtocol, Interface, SamSlot, SerialNumber};
use crate::utils::parse_hex;
use crate::{Error, Result};

const SALT_TERMINAL: u8 = 0x01;
const SALT_CARD: u8 = 0x02;

/// Toy MAC shared by the simulated card and SAM. Not cryptography.
#[doc(hidden)]
pub fn session_digest<'a>(
    challenge: &[u8],
    apdus: impl IntoIterator<Item = &'a [u8]>,
    salt: u8,
) -> Vec<u8> {
    let mut acc: u32 = 0x811C_9DC5 ^ salt as u32;
    let mut feed = |b: u8| {
        acc ^= b as u32;
        acc = acc.wrapping_mul(0x0100_0193);
    };
    challenge.iter().copied().for_each(&mut feed);
    for apdu in apdus {
        apdu.iter().copied().for_each(&mut feed);
    }
    acc.to_be_bytes().to_vec()
}

#[derive(Debug, Clone)]
struct CardSessionState {
    challenge: Vec<u8>,
    received: Vec<Vec<u8>>,
    backup: BTreeMap<(u8, u8), Vec<u8>>,
}

/// Calypso-like card model driven by raw APDUs.
#[derive(Debug, Clone)]
pub struct SimulatedCard {
    serial: SerialNumber,
    df_name: Vec<u8>,
    startup_info: Vec<u8>,
    invalidated: bool,
    records: BTreeMap<(u8, u8), Vec<u8>>,
    session: Option<CardSessionState>,
    rejections: Vec<(u8, u16)>,
    ratified: bool,
}

impl SimulatedCard {
    pub fn new(serial: SerialNumber, df_name: &[u8]) -> Self {
        Self {
            serial,
            df_name: df_name.to_vec(),
            startup_info: vec![0x0A, 0x3C, 0x23, 0x05, 0x14, 0x10, 0x01],
            invalidated: false,
            records: BTreeMap::new(),
            session: None,
            rejections: Vec::new(),
            ratified: true,
        }
    }

    /// Calypso "classic" application with environment, event log, contract
    /// and counter files populated.
    pub fn calypso() -> Self {
        let df_name = parse_hex(CALYPSO_CLASSIC_AID).unwrap_or_default();
        Self::new(SerialNumber::from_bytes([0, 0, 0, 0, 0x12, 0x34, 0x56, 0x78]), &df_name)
            .with_record(SFI_ENVIRONMENT_AND_HOLDER, 1, &[0x24, 0xB9, 0x28, 0x48, 0x08, 0x05])
            .with_record(SFI_EVENT_LOG, 1, &[0x00, 0x00, 0x64, 0x12, 0x34])
            .with_record(SFI_CONTRACTS, 1, &[0x11; 29])
            .with_record(SFI_COUNTER_1, 1, &[0x00, 0x01, 0x00])
    }

    pub fn with_record(mut self, sfi: u8, record: u8, data: &[u8]) -> Self {
        self.records.insert((sfi, record), data.to_vec());
        self
    }

    /// Answer SELECT with 6283.
    pub fn invalidated(mut self) -> Self {
        self.invalidated = true;
        self
    }

    /// Answer every command with instruction `ins` by `sw`.
    pub fn reject(mut self, ins: u8, sw: u16) -> Self {
        self.rejections.push((ins, sw));
        self
    }

    pub fn record(&self, sfi: u8, record: u8) -> Option<&[u8]> {
        self.records.get(&(sfi, record)).map(|r| r.as_slice())
    }

    pub fn counter(&self, sfi: u8, record: u8) -> Option<u32> {
        self.record(sfi, record)
            .and_then(|r| be_uint_at(r, 0, COUNTER_WIDTH).ok())
    }

    pub fn in_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn ratified(&self) -> bool {
        self.ratified
    }

    /// Field lost: an unclosed session is cancelled on the card.
    pub fn power_off(&mut self) {
        if let Some(s) = self.session.take() {
            self.records = s.backup;
        }
    }

    pub fn process(&mut self, apdu: &[u8]) -> Vec<u8> {
        let (data, sw) = self.respond(apdu);
        let mut out = data;
        out.extend_from_slice(&sw.to_be_bytes());
        out
    }

    fn respond(&mut self, apdu: &[u8]) -> (Vec<u8>, u16) {
        if apdu.len() < 4 {
            return (Vec::new(), 0x6700);
        }
        let (ins, p1, p2) = (apdu[1], apdu[2], apdu[3]);
        let body = if apdu.len() > 5 {
            let lc = apdu[4] as usize;
            apdu.get(5..5 + lc).unwrap_or(&[])
        } else {
            &[]
        };

        if let Some(session) = self.session.as_mut() {
            if ins != INS_CLOSE_SESSION {
                session.received.push(apdu.to_vec());
            }
        }
        if let Some(&(_, sw)) = self.rejections.iter().find(|(i, _)| *i == ins) {
            return (Vec::new(), sw);
        }

        let sfi = p2 >> 3;
        match ins {
            INS_SELECT => {
                if self.df_name.starts_with(body) && !body.is_empty() {
                    match encode_fci(&self.df_name, &self.serial, &self.startup_info) {
                        Ok(fci) if self.invalidated => (fci, SW_INVALIDATED),
                        Ok(fci) => (fci, SW_SUCCESS),
                        Err(_) => (Vec::new(), 0x6F00),
                    }
                } else {
                    (Vec::new(), SW_FILE_NOT_FOUND)
                }
            }
            INS_READ_RECORD if p1 == 0 => {
                // Ratification
                self.ratified = true;
                (Vec::new(), 0x6B00)
            }
            INS_READ_RECORD => match self.records.get(&(sfi, p1)) {
                Some(r) => (r.clone(), SW_SUCCESS),
                None => (Vec::new(), SW_RECORD_NOT_FOUND),
            },
            INS_UPDATE_RECORD => {
                self.records.insert((sfi, p1), body.to_vec());
                (Vec::new(), SW_SUCCESS)
            }
            INS_WRITE_RECORD => {
                let record = self.records.entry((sfi, p1)).or_default();
                if record.len() < body.len() {
                    record.resize(body.len(), 0);
                }
                record.iter_mut().zip(body).for_each(|(d, s)| *d |= *s);
                (Vec::new(), SW_SUCCESS)
            }
            INS_INCREASE | INS_DECREASE => self.counter_op(ins, sfi, p1, body),
            INS_OPEN_SESSION => {
                if let Some(s) = self.session.take() {
                    self.records = s.backup;
                }
                self.session = Some(CardSessionState {
                    challenge: body.to_vec(),
                    received: vec![apdu.to_vec()],
                    backup: self.records.clone(),
                });
                let ratified = if self.ratified { 0x00 } else { 0x01 };
                (vec![0xC1, 0xA1, 0x1E, 0x06, ratified, 0x79], SW_SUCCESS)
            }
            INS_CLOSE_SESSION => match self.session.take() {
                Some(s) => {
                    let apdus = s.received.iter().map(|a| a.as_slice());
                    let expected = session_digest(&s.challenge, apdus.clone(), SALT_TERMINAL);
                    if body != expected.as_slice() {
                        self.records = s.backup;
                        return (Vec::new(), 0x6988);
                    }
                    self.ratified = p1 & CLOSE_P1_RATIFICATION_ASKED == 0;
                    (session_digest(&s.challenge, apdus, SALT_CARD), SW_SUCCESS)
                }
                None => (Vec::new(), SW_CONDITIONS_NOT_SATISFIED),
            },
            _ => (Vec::new(), SW_INS_NOT_SUPPORTED),
        }
    }

    fn counter_op(&mut self, ins: u8, sfi: u8, record: u8, body: &[u8]) -> (Vec<u8>, u16) {
        let Ok(delta) = be_uint_at(body, 0, COUNTER_WIDTH) else {
            return (Vec::new(), 0x6700);
        };
        let Some(current) = self.counter(sfi, record) else {
            return (Vec::new(), SW_RECORD_NOT_FOUND);
        };
        let next = if ins == INS_INCREASE {
            current.checked_add(delta).filter(|v| *v <= COUNTER_MAX)
        } else {
            current.checked_sub(delta)
        };
        match next {
            Some(v) => {
                let bytes = be_uint_bytes(v, COUNTER_WIDTH);
                if let Some(r) = self.records.get_mut(&(sfi, record)) {
                    r[..COUNTER_WIDTH].copy_from_slice(&bytes);
                }
                (bytes, SW_SUCCESS)
            }
            None => (Vec::new(), SW_COUNTER_OVERFLOW),
        }
    }
}

#[derive(Debug)]
struct ReaderState {
    card: Option<SimulatedCard>,
    protocol: CardProtocol,
    sams: Vec<SamSlot>,
    sent: Vec<(Interface, Vec<u8>)>,
    io_failures: usize,
    batch_limit: usize,
}

/// Shared view of a [`SimulatedReader`].
#[derive(Debug, Clone)]
pub struct SimulatedReaderHandle {
    state: Arc<Mutex<ReaderState>>,
}

impl SimulatedReaderHandle {
    fn lock(&self) -> MutexGuard<'_, ReaderState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert(&self, card: SimulatedCard) {
        self.lock().card = Some(card);
    }

    /// Take the card out of the field.
    pub fn remove(&self) -> Option<SimulatedCard> {
        let mut card = self.lock().card.take()?;
        card.power_off();
        Some(card)
    }

    /// Inspect the card currently in the field.
    pub fn with_card<T>(&self, f: impl FnOnce(&SimulatedCard) -> T) -> Option<T> {
        self.lock().card.as_ref().map(f)
    }

    pub fn set_protocol(&self, protocol: CardProtocol) {
        self.lock().protocol = protocol;
    }

    pub fn set_sam_present(&self, slot: SamSlot, present: bool) {
        let mut s = self.lock();
        s.sams.retain(|s| *s != slot);
        if present {
            s.sams.push(slot);
        }
    }

    /// The next `n` transport calls fail with an I/O error.
    pub fn fail_next(&self, n: usize) {
        self.lock().io_failures = n;
    }

    pub fn set_batch_limit(&self, limit: usize) {
        self.lock().batch_limit = limit;
    }

    /// APDUs sent on the contactless interface.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.lock()
            .sent
            .iter()
            .filter(|(i, _)| *i == Interface::Contactless)
            .map(|(_, a)| a.clone())
            .collect()
    }

    /// Instruction bytes of everything sent on the contactless interface.
    pub fn sent_instructions(&self) -> Vec<u8> {
        self.sent().iter().filter_map(|a| a.get(1).copied()).collect()
    }

    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }
}

/// Transport over a simulated field and two SAM slots.
#[derive(Debug)]
pub struct SimulatedReader {
    handle: SimulatedReaderHandle,
}

impl SimulatedReader {
    /// Reader with SAMs in both slots and an empty field.
    pub fn new() -> (Self, SimulatedReaderHandle) {
        let handle = SimulatedReaderHandle {
            state: Arc::new(Mutex::new(ReaderState {
                card: None,
                protocol: CardProtocol::Iso14443B,
                sams: vec![SamSlot::One, SamSlot::Two],
                sent: Vec::new(),
                io_failures: 0,
                batch_limit: usize::MAX,
            })),
        };
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }

    pub fn with_card(card: SimulatedCard) -> (Self, SimulatedReaderHandle) {
        let (reader, handle) = Self::new();
        handle.insert(card);
        (reader, handle)
    }
}

fn take_failure(state: &mut ReaderState) -> Result<()> {
    if state.io_failures > 0 {
        state.io_failures -= 1;
        return Err(Error::Io("simulated link failure".into()));
    }
    Ok(())
}

impl Transport for SimulatedReader {
    fn transmit(&mut self, interface: Interface, apdu: &[u8]) -> Result<Vec<u8>> {
        let mut state = self.handle.lock();
        take_failure(&mut state)?;
        state.sent.push((interface, apdu.to_vec()));
        match interface {
            Interface::Contactless => match state.card.as_mut() {
                Some(card) => Ok(card.process(apdu)),
                None => Err(Error::Io("no card in the field".into())),
            },
            Interface::Contact(slot) if state.sams.contains(&slot) => {
                Ok(SW_INS_NOT_SUPPORTED.to_be_bytes().to_vec())
            }
            Interface::Contact(slot) => Err(Error::Io(format!("no SAM in slot {}", slot))),
        }
    }

    fn is_card_present(&mut self, interface: Interface) -> Result<bool> {
        let mut state = self.handle.lock();
        take_failure(&mut state)?;
        Ok(match interface {
            Interface::Contactless => state.card.is_some(),
            Interface::Contact(slot) => state.sams.contains(&slot),
        })
    }

    fn card_protocol(&mut self, interface: Interface) -> Result<Option<CardProtocol>> {
        let state = self.handle.lock();
        Ok(match interface {
            Interface::Contactless if state.card.is_some() => Some(state.protocol),
            _ => None,
        })
    }

    fn max_batch_len(&self) -> usize {
        self.handle.lock().batch_limit
    }
}

/// Counters observable from tests after the SAM has been boxed away.
#[derive(Debug, Default)]
pub struct SamProbe {
    pub opens: AtomicUsize,
    pub sessions: AtomicUsize,
    pub verifications: AtomicUsize,
    /// Make the next verifications fail.
    pub reject_signatures: AtomicBool,
    /// Make every call fail as if the SAM were unplugged.
    pub unplugged: AtomicBool,
}

/// Security module checking the signatures of [`SimulatedCard`].
#[derive(Debug)]
pub struct SimulatedSam {
    probe: Arc<SamProbe>,
    challenge: Option<Vec<u8>>,
    next: u8,
}

impl SimulatedSam {
    pub fn new() -> (Self, Arc<SamProbe>) {
        let probe = Arc::new(SamProbe::default());
        (
            Self {
                probe: Arc::clone(&probe),
                challenge: None,
                next: 0,
            },
            probe,
        )
    }

    fn check_plugged(&self) -> Result<()> {
        if self.probe.unplugged.load(Ordering::SeqCst) {
            return Err(Error::Io("SAM not answering".into()));
        }
        Ok(())
    }

    fn digest(&self, log: &[Exchange], salt: u8) -> Result<Vec<u8>> {
        let challenge = self
            .challenge
            .as_ref()
            .ok_or_else(|| Error::SamUnavailable("no session begun".into()))?;
        let apdus: Vec<Vec<u8>> = log.iter().map(|e| e.command.encode()).collect();
        Ok(session_digest(challenge, apdus.iter().map(|a| a.as_slice()), salt))
    }
}

impl SecurityModule for SimulatedSam {
    fn open(&mut self) -> Result<()> {
        self.check_plugged()?;
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn begin_session(&mut self, _level: AccessLevel) -> Result<Vec<u8>> {
        self.check_plugged()?;
        self.probe.sessions.fetch_add(1, Ordering::SeqCst);
        self.next = self.next.wrapping_add(1);
        let challenge = vec![0x5A, 0xA5, 0x00, self.next];
        self.challenge = Some(challenge.clone());
        Ok(challenge)
    }

    fn sign(&mut self, log: &[Exchange]) -> Result<Vec<u8>> {
        self.check_plugged()?;
        self.digest(log, SALT_TERMINAL)
    }

    fn verify(&mut self, log: &[Exchange], card_signature: &[u8]) -> Result<bool> {
        self.check_plugged()?;
        self.probe.verifications.fetch_add(1, Ordering::SeqCst);
        if self.probe.reject_signatures.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.digest(log, SALT_CARD)? == card_signature)
    }
}

#[cfg(feature = "async")]
pub use hardware::SimulatedHardware;

#[cfg(feature = "async")]
mod hardware {
    use super::*;
    use crate::plugin::HardwarePlatform;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Power-up and reader acquisition with configurable latency.
    pub struct SimulatedHardware {
        reader: Option<SimulatedReader>,
        pub power_up_delay: Duration,
        pub reader_delay: Duration,
        pub power_downs: Arc<AtomicUsize>,
    }

    impl SimulatedHardware {
        pub fn new(reader: SimulatedReader) -> Self {
            Self {
                reader: Some(reader),
                power_up_delay: Duration::ZERO,
                reader_delay: Duration::ZERO,
                power_downs: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl HardwarePlatform for SimulatedHardware {
        async fn power_up(&mut self) -> Result<()> {
            tokio::time::sleep(self.power_up_delay).await;
            Ok(())
        }

        async fn open_reader(&mut self) -> Result<Box<dyn Transport>> {
            tokio::time::sleep(self.reader_delay).await;
            let reader = self
                .reader
                .take()
                .ok_or_else(|| Error::ReaderNotFound("reader already handed out".into()))?;
            Ok(Box::new(reader))
        }

        async fn firmware_version(&mut self) -> Result<String> {
            Ok("ASK-CONE2 1.0.0".into())
        }

        fn power_down(&mut self) -> Result<()> {
            self.power_downs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
