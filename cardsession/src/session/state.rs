// cardsession/src/session/state.rs

use derive_more::Display;

use crate::protocol::{ApduResponse, CardCommand};
use crate::types::AccessLevel;

/// Card session states.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    #[display(fmt = "IDLE")]
    Idle,
    #[display(fmt = "SELECTED")]
    Selected,
    #[display(fmt = "OPEN")]
    Open,
    #[display(fmt = "CLOSING")]
    Closing,
    #[display(fmt = "ABORTED")]
    Aborted,
}

/// One command sent inside a secure session with the card's raw answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub command: CardCommand,
    pub response: ApduResponse,
}

/// State of an open secure session: access level, SAM challenge and the
/// log of everything exchanged with the card since OPEN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecuritySession {
    level: AccessLevel,
    terminal_challenge: Vec<u8>,
    card_challenge: Option<Vec<u8>>,
    log: Vec<Exchange>,
}

impl SecuritySession {
    pub(crate) fn new(level: AccessLevel, terminal_challenge: Vec<u8>) -> Self {
        Self {
            level,
            terminal_challenge,
            card_challenge: None,
            log: Vec::new(),
        }
    }

    pub fn level(&self) -> AccessLevel {
        self.level
    }

    pub fn terminal_challenge(&self) -> &[u8] {
        &self.terminal_challenge
    }

    pub fn card_challenge(&self) -> Option<&[u8]> {
        self.card_challenge.as_deref()
    }

    pub(crate) fn set_card_challenge(&mut self, challenge: Vec<u8>) {
        self.card_challenge = Some(challenge);
    }

    pub fn log(&self) -> &[Exchange] {
        &self.log
    }

    pub(crate) fn log_mut(&mut self) -> &mut Vec<Exchange> {
        &mut self.log
    }

    /// True once the card confirmed OPEN SECURE SESSION.
    pub fn is_opened_on_card(&self) -> bool {
        self.log.first().is_some_and(|e| {
            matches!(e.command, CardCommand::OpenSession { .. }) && e.response.is_success()
        })
    }
}
