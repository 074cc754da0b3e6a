// cardsession/src/session/queue.rs

use crate::card::Card;
use crate::constants::{COUNTER_MAX, MAX_RECORD_DATA_LEN};
use crate::protocol::{CardCommand, CardResponse};
use crate::reader::ReaderChannel;
use crate::session::state::Exchange;
use crate::types::{CommandKind, Sfi};
use crate::{Error, Result};

/// A queued card command, not yet confirmed by the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand(CardCommand);

impl PendingCommand {
    pub fn command(&self) -> &CardCommand {
        &self.0
    }

    pub fn kind(&self) -> CommandKind {
        self.0.kind()
    }

    pub fn into_command(self) -> CardCommand {
        self.0
    }
}

/// Ordered list of pending commands.
#[derive(Debug, Default, Clone)]
pub struct CommandQueue {
    pending: Vec<PendingCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingCommand> {
        self.pending.iter()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Drain the queue, in submission order.
    pub(crate) fn take(&mut self) -> Vec<CardCommand> {
        self.pending.drain(..).map(PendingCommand::into_command).collect()
    }

    pub(crate) fn push(&mut self, command: CardCommand) {
        self.pending.push(PendingCommand(command));
    }

    pub fn prepare_read_record(&mut self, sfi: Sfi, record: u8) -> Result<()> {
        check_record(record)?;
        self.push(CardCommand::ReadRecord { sfi, record });
        Ok(())
    }

    /// Replace the content of a record.
    pub fn prepare_update_record(&mut self, sfi: Sfi, record: u8, data: &[u8]) -> Result<()> {
        check_record(record)?;
        check_data(data)?;
        self.push(CardCommand::UpdateRecord {
            sfi,
            record,
            data: data.to_vec(),
        });
        Ok(())
    }

    /// OR `data` into the content of a record.
    pub fn prepare_write_record(&mut self, sfi: Sfi, record: u8, data: &[u8]) -> Result<()> {
        check_record(record)?;
        check_data(data)?;
        self.push(CardCommand::WriteRecord {
            sfi,
            record,
            data: data.to_vec(),
        });
        Ok(())
    }

    pub fn prepare_increase_counter(&mut self, sfi: Sfi, record: u8, delta: u32) -> Result<()> {
        check_record(record)?;
        check_delta(delta)?;
        self.push(CardCommand::Increase { sfi, record, delta });
        Ok(())
    }

    pub fn prepare_decrease_counter(&mut self, sfi: Sfi, record: u8, delta: u32) -> Result<()> {
        check_record(record)?;
        check_delta(delta)?;
        self.push(CardCommand::Decrease { sfi, record, delta });
        Ok(())
    }

    /// Send every queued command and apply confirmed effects to `card` in
    /// submission order. Stops at the first rejection; effects confirmed
    /// before it stay. The queue is empty afterwards whatever the outcome.
    pub fn flush(
        &mut self,
        card: &mut Card,
        channel: &ReaderChannel,
        log: Option<&mut Vec<Exchange>>,
    ) -> Result<()> {
        let commands = self.take();
        if commands.is_empty() {
            return Ok(());
        }
        transmit_commands(card, channel, &commands, log).map(|_| ())
    }
}

fn check_record(record: u8) -> Result<()> {
    if record == 0 {
        return Err(Error::InvalidOperand("record number must be at least 1".into()));
    }
    Ok(())
}

fn check_delta(delta: u32) -> Result<()> {
    if delta > COUNTER_MAX {
        return Err(Error::InvalidOperand(format!(
            "counter delta {} exceeds {}",
            delta, COUNTER_MAX
        )));
    }
    Ok(())
}

fn check_data(data: &[u8]) -> Result<()> {
    if data.is_empty() || data.len() > MAX_RECORD_DATA_LEN {
        return Err(Error::InvalidOperand(format!(
            "record data length {} outside 1..={}",
            data.len(),
            MAX_RECORD_DATA_LEN
        )));
    }
    Ok(())
}

/// Exchange `commands` in sub-batches the transport accepts, decoding and
/// applying each confirmed answer before looking at the next one. Every
/// transmitted command is appended to `log` when given.
pub(crate) fn transmit_commands(
    card: &mut Card,
    channel: &ReaderChannel,
    commands: &[CardCommand],
    mut log: Option<&mut Vec<Exchange>>,
) -> Result<Vec<CardResponse>> {
    let limit = channel.max_batch_len()?;
    let mut decoded = Vec::with_capacity(commands.len());

    for chunk in commands.chunks(limit) {
        let apdus: Vec<Vec<u8>> = chunk.iter().map(CardCommand::encode).collect();
        let responses = channel.transmit_batch(&apdus)?;
        let received = responses.len();

        for (command, apdu) in chunk.iter().zip(responses) {
            if let Some(log) = log.as_deref_mut() {
                log.push(Exchange {
                    command: command.clone(),
                    response: apdu.clone(),
                });
            }
            let response = CardResponse::decode(command, &apdu).inspect_err(|e| {
                log::warn!("{}: {}", channel.name(), e);
            })?;
            card.apply(command, &response)?;
            decoded.push(response);
        }

        if received < chunk.len() {
            return Err(Error::MalformedResponse(format!(
                "reader answered {} of {} commands",
                received,
                chunk.len()
            )));
        }
    }
    Ok(decoded)
}
