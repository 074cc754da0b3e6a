// cardsession/src/session/mod.rs

//! Card session state machine.
//!
//! ```text
//! IDLE -> SELECTED -> OPEN -> CLOSING -> IDLE
//!                       \-> ABORTED -> IDLE
//! any state -> IDLE on card removal
//! ```
//!
//! The card model only ever reflects commands the card confirmed. Effects of
//! a secure session are rolled back when its closing fails.

pub mod queue;
pub mod state;

pub use queue::{CommandQueue, PendingCommand};
pub use state::{Exchange, SecuritySession, SessionState};

use crate::card::{Card, FileSnapshot};
use crate::config::SessionConfig;
use crate::event_sink::{EventSink, LogSink};
use crate::protocol::{CardCommand, decode_open_session};
use crate::reader::{ReaderChannel, ReaderEvent, ReaderEventKind, SessionClaim};
use crate::sam::SamGateway;
use crate::selection::{SelectionResult, SelectionService};
use crate::types::{AccessLevel, CommandKind, Sfi};
use crate::{Error, Result};

use queue::transmit_commands;

/// Secure session bookkeeping while OPEN.
struct OpenSession {
    session: SecuritySession,
    snapshot: FileSnapshot,
    _claim: SessionClaim,
}

/// Drives one card through selection, optional secure session and closing.
pub struct CardSession {
    channel: ReaderChannel,
    sam: Option<SamGateway>,
    config: SessionConfig,
    sink: Box<dyn EventSink>,
    state: SessionState,
    card: Option<Card>,
    queue: CommandQueue,
    open: Option<OpenSession>,
}

impl std::fmt::Debug for CardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardSession")
            .field("reader", &self.channel.name())
            .field("state", &self.state)
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl CardSession {
    pub fn new(channel: ReaderChannel, config: SessionConfig) -> Self {
        Self {
            channel,
            sam: None,
            config,
            sink: Box::new(LogSink),
            state: SessionState::Idle,
            card: None,
            queue: CommandQueue::new(),
            open: None,
        }
    }

    /// Security module used by `process_opening`.
    pub fn with_sam(mut self, sam: SamGateway) -> Self {
        self.sam = Some(sam);
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn card(&self) -> Option<&Card> {
        self.card.as_ref()
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// The open secure session, present only in OPEN and CLOSING.
    pub fn security_session(&self) -> Option<&SecuritySession> {
        self.open.as_ref().map(|o| &o.session)
    }

    pub fn reader(&self) -> &ReaderChannel {
        &self.channel
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state != next {
            log::debug!("{}: {} -> {}", self.channel.name(), self.state, next);
            self.state = next;
        }
    }

    /// Drop card, queue and any secure session without talking to the SAM.
    fn discard(&mut self) {
        self.open = None;
        self.card = None;
        self.queue.clear();
        self.set_state(SessionState::Idle);
    }

    /// Take the active card of a selection. Returns false, and goes IDLE,
    /// when nothing matched.
    pub fn activate(&mut self, selection: SelectionResult) -> Result<bool> {
        if matches!(self.state, SessionState::Open | SessionState::Closing) {
            return Err(Error::Configuration(format!(
                "cannot activate a selection while {}",
                self.state
            )));
        }
        self.discard();
        match selection.into_active_card() {
            Some(card) => {
                log::info!(
                    "{}: card {} selected",
                    self.channel.name(),
                    card.serial_number().to_hex()
                );
                self.sink
                    .header(&format!("Card {} selected", card.serial_number().to_hex()));
                self.card = Some(card);
                self.set_state(SessionState::Selected);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn require_card(&self) -> Result<()> {
        match self.state {
            SessionState::Selected | SessionState::Open => Ok(()),
            other => Err(Error::Configuration(format!(
                "no selected card to queue commands for ({})",
                other
            ))),
        }
    }

    /// Inside a secure session, refuse what the access level forbids before
    /// it reaches the queue.
    fn check_level(&self, kind: CommandKind) -> Result<()> {
        if let Some(open) = &self.open {
            let level = open.session.level();
            if !kind.permitted_under(level) {
                return Err(Error::AccessLevelViolation {
                    command: kind,
                    level: Some(level),
                });
            }
        }
        Ok(())
    }

    pub fn prepare_read_record(&mut self, sfi: Sfi, record: u8) -> Result<()> {
        self.require_card()?;
        self.queue.prepare_read_record(sfi, record)
    }

    pub fn prepare_update_record(&mut self, sfi: Sfi, record: u8, data: &[u8]) -> Result<()> {
        self.require_card()?;
        self.check_level(CommandKind::UpdateRecord)?;
        self.queue.prepare_update_record(sfi, record, data)
    }

    pub fn prepare_write_record(&mut self, sfi: Sfi, record: u8, data: &[u8]) -> Result<()> {
        self.require_card()?;
        self.check_level(CommandKind::WriteRecord)?;
        self.queue.prepare_write_record(sfi, record, data)
    }

    pub fn prepare_increase_counter(&mut self, sfi: Sfi, record: u8, delta: u32) -> Result<()> {
        self.require_card()?;
        self.check_level(CommandKind::Increase)?;
        self.queue.prepare_increase_counter(sfi, record, delta)
    }

    pub fn prepare_decrease_counter(&mut self, sfi: Sfi, record: u8, delta: u32) -> Result<()> {
        self.require_card()?;
        self.check_level(CommandKind::Decrease)?;
        self.queue.prepare_decrease_counter(sfi, record, delta)
    }

    /// Flush the queue. Outside a session this is the unsecured read path:
    /// modifying commands are refused before anything is sent.
    pub fn process_commands(&mut self) -> Result<()> {
        match self.state {
            SessionState::Selected => {
                let modifying = self.queue.iter().map(|p| p.kind()).find(|k| k.is_modifying());
                if let Some(kind) = modifying {
                    self.queue.clear();
                    return Err(Error::AccessLevelViolation {
                        command: kind,
                        level: None,
                    });
                }
                let card = self.card.as_mut().ok_or_else(no_card)?;
                let result = self.queue.flush(card, &self.channel, None);
                self.after_exchange(result)
            }
            SessionState::Open => {
                let open = self.open.as_mut().ok_or_else(no_session)?;
                let card = self.card.as_mut().ok_or_else(no_card)?;
                let result = self
                    .queue
                    .flush(card, &self.channel, Some(open.session.log_mut()));
                self.after_exchange(result)
            }
            other => Err(Error::Configuration(format!(
                "cannot process commands while {}",
                other
            ))),
        }
    }

    /// Reader I/O failures leave nothing worth keeping.
    fn after_exchange(&mut self, result: Result<()>) -> Result<()> {
        if let Err(Error::Io(e)) = &result {
            log::warn!("{}: reader lost ({}), back to IDLE", self.channel.name(), e);
            self.discard();
        }
        result
    }

    /// Open a secure session at `level`. Commands queued so far travel in
    /// the same batch as OPEN SECURE SESSION.
    pub fn process_opening(&mut self, level: AccessLevel) -> Result<()> {
        if self.state != SessionState::Selected {
            return Err(Error::Configuration(format!(
                "cannot open a session while {}",
                self.state
            )));
        }
        let sam = self
            .sam
            .clone()
            .ok_or_else(|| Error::Configuration("no security module configured".into()))?;
        let forbidden = self
            .queue
            .iter()
            .map(|p| p.kind())
            .find(|k| !k.permitted_under(level));
        if let Some(kind) = forbidden {
            return Err(Error::AccessLevelViolation {
                command: kind,
                level: Some(level),
            });
        }

        self.sink.action("Process PO Opening session for transactions");
        let claim = self.channel.claim_session()?;
        let mut session = match sam
            .open_channel()
            .and_then(|handle| sam.begin_session(&handle, level))
        {
            Ok(session) => session,
            Err(e) => {
                self.sink.result(&format!("Opening session: FAILURE ({})", e));
                return Err(e);
            }
        };

        let card = self.card.as_mut().ok_or_else(no_card)?;
        let snapshot = card.snapshot();
        let mut commands = vec![CardCommand::OpenSession {
            level,
            challenge: session.terminal_challenge().to_vec(),
        }];
        commands.extend(self.queue.take());

        let result = transmit_commands(card, &self.channel, &commands, Some(session.log_mut()));
        let opened = session
            .log()
            .first()
            .filter(|_| session.is_opened_on_card())
            .and_then(|e| decode_open_session(&e.response.data).ok());
        if let Some(opened) = opened {
            session.set_card_challenge(opened.card_challenge);
        }

        match result {
            Ok(_) => {
                self.open = Some(OpenSession {
                    session,
                    snapshot,
                    _claim: claim,
                });
                self.set_state(SessionState::Open);
                self.sink.result("Opening session: SUCCESS");
                Ok(())
            }
            Err(Error::Io(e)) => {
                self.sink.result("Opening session: FAILURE (reader lost)");
                self.discard();
                Err(Error::Io(e))
            }
            Err(e) if session.is_opened_on_card() => {
                // The card is in session; a queued command was refused.
                self.open = Some(OpenSession {
                    session,
                    snapshot,
                    _claim: claim,
                });
                self.set_state(SessionState::Open);
                self.sink.result(&format!("Opening session: SUCCESS, {}", e));
                Err(e)
            }
            Err(e) => {
                card.restore(snapshot);
                self.sink.result(&format!("Opening session: FAILURE ({})", e));
                Err(e)
            }
        }
    }

    /// Close the secure session. On success the committed card is returned
    /// and the machine goes IDLE; on failure the card is rolled back to its
    /// state before opening, marked invalid, and the machine goes ABORTED.
    pub fn process_closing(&mut self) -> Result<Card> {
        if self.state != SessionState::Open {
            return Err(Error::Configuration(format!(
                "cannot close a session while {}",
                self.state
            )));
        }
        let sam = self.sam.clone().ok_or_else(no_session)?;
        let OpenSession {
            mut session,
            snapshot,
            _claim,
        } = self.open.take().ok_or_else(no_session)?;
        self.set_state(SessionState::Closing);
        self.sink.action("Process PO Closing session");

        let outcome = self.close_on_card(&sam, &mut session).and_then(|()| {
            sam.end_session(session)
        });

        match outcome {
            Ok(()) => {
                if self.config.ratification {
                    self.ratify();
                }
                let card = self.card.take().ok_or_else(no_card)?;
                self.discard();
                self.sink.result("Closing session: SUCCESS");
                Ok(card)
            }
            Err(Error::Io(e)) => {
                self.sink.result("Closing session: FAILURE (reader lost)");
                self.discard();
                Err(Error::Io(e))
            }
            Err(e) => {
                if let Some(card) = self.card.as_mut() {
                    card.restore(snapshot);
                    card.invalidate();
                }
                self.queue.clear();
                self.set_state(SessionState::Aborted);
                self.sink.result(&format!("Closing session: FAILURE ({})", e));
                log::warn!("{}: session aborted: {}", self.channel.name(), e);
                Err(e)
            }
        }
    }

    /// Flush what is still queued, then exchange CLOSE SECURE SESSION.
    fn close_on_card(&mut self, sam: &SamGateway, session: &mut SecuritySession) -> Result<()> {
        let card = self.card.as_mut().ok_or_else(no_card)?;
        self.queue.flush(card, &self.channel, Some(session.log_mut()))?;
        let signature = sam.session_signature(session)?;
        let close = [CardCommand::CloseSession {
            signature,
            ratification_asked: self.config.ratification,
        }];
        transmit_commands(card, &self.channel, &close, Some(session.log_mut()))?;
        Ok(())
    }

    fn ratify(&mut self) {
        let apdu = CardCommand::Ratification.encode();
        if let Err(e) = self.channel.transmit(&apdu) {
            log::warn!("{}: ratification not delivered: {}", self.channel.name(), e);
        }
    }

    /// Card left the field: back to IDLE without closing anything.
    pub fn on_card_removed(&mut self) {
        if self.open.is_some() {
            log::warn!("{}: card removed with a session open", self.channel.name());
        }
        self.discard();
    }

    pub fn reset(&mut self) {
        self.discard();
    }

    /// Follow a notification of this session's reader. Removal and reader
    /// failures discard everything. An inserted or matched card with
    /// selection responses goes through `selection` and is activated.
    /// Returns true when a card became active.
    pub fn on_reader_event(
        &mut self,
        event: ReaderEvent,
        selection: &mut SelectionService,
    ) -> Result<bool> {
        if event.reader_name() != self.channel.name() {
            log::debug!("{}: ignoring {}", self.channel.name(), event);
            return Ok(false);
        }
        match event.kind() {
            ReaderEventKind::CardRemoved => {
                self.on_card_removed();
                Ok(false)
            }
            ReaderEventKind::IoError => {
                log::warn!("{}: reader failure, dropping the card: {}", self.channel.name(), event);
                self.discard();
                Ok(false)
            }
            ReaderEventKind::CardInserted | ReaderEventKind::CardMatched => {
                let Some(responses) = event.into_selection() else {
                    return Ok(false);
                };
                let result = selection.process_selection_response(&responses)?;
                self.activate(result)
            }
        }
    }
}

fn no_card() -> Error {
    Error::Configuration("no card model".into())
}

fn no_session() -> Error {
    Error::Configuration("no open secure session".into())
}
