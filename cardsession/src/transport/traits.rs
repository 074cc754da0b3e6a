// cardsession/src/transport/traits.rs

use crate::Result;
use crate::protocol::ApduResponse;
use crate::types::{CardProtocol, Interface};

/// Transport trait abstracts the reader hardware away from the session
/// engine. One transport serves every interface of a physical reader; the
/// caller addresses the antenna or a contact slot with `interface`.
pub trait Transport: Send {
    /// Send one command APDU and return the raw response (data + SW).
    fn transmit(&mut self, interface: Interface, apdu: &[u8]) -> Result<Vec<u8>>;

    /// Presence probe for the card (or SAM) behind `interface`.
    fn is_card_present(&mut self, interface: Interface) -> Result<bool>;

    /// Protocol the present card answered with, when the reader knows it.
    fn card_protocol(&mut self, _interface: Interface) -> Result<Option<CardProtocol>> {
        Ok(None)
    }

    /// Largest number of APDUs the reader accepts in one exchange.
    fn max_batch_len(&self) -> usize {
        usize::MAX
    }

    /// Send APDUs in order, stopping after the first unsuccessful status
    /// word. The returned list is therefore shorter than `apdus` only when
    /// its last entry is a rejection.
    fn transmit_batch(&mut self, interface: Interface, apdus: &[Vec<u8>]) -> Result<Vec<ApduResponse>> {
        let mut responses = Vec::with_capacity(apdus.len());
        for apdu in apdus {
            let response = ApduResponse::parse(&self.transmit(interface, apdu)?)?;
            let success = response.is_success();
            responses.push(response);
            if !success {
                break;
            }
        }
        Ok(responses)
    }
}
