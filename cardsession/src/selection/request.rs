// cardsession/src/selection/request.rs

use crate::protocol::{ApduResponse, CardCommand, decode_fci};
use crate::reader::ReaderChannel;
use crate::selection::SelectionCase;
use crate::types::{Aid, CardProtocol, MultiSelectionProcessing};
use crate::Result;

/// APDUs of one armed selection case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRequest {
    pub aid: Aid,
    pub select_apdu: Vec<u8>,
    pub read_apdus: Vec<Vec<u8>>,
    pub accepted_status_words: Vec<u16>,
    pub protocol: Option<CardProtocol>,
}

impl CaseRequest {
    pub(crate) fn from_case(case: &SelectionCase) -> Self {
        let select_apdu = CardCommand::Select {
            aid: case.aid().clone(),
        }
        .encode();
        let read_apdus = case
            .reads()
            .iter()
            .map(|&(sfi, record)| CardCommand::ReadRecord { sfi, record }.encode())
            .collect();
        Self {
            aid: case.aid().clone(),
            select_apdu,
            read_apdus,
            accepted_status_words: case.accepted_status_words(),
            protocol: case.protocol_filter(),
        }
    }

    /// Status word accepted, protocol filter held and FCI DF name starting
    /// with the AID.
    pub fn matches(&self, response: &CardSelectionResponse) -> bool {
        self.accepted_status_words.contains(&response.select.sw)
            && self.protocol.is_none_or(|p| response.protocol == Some(p))
            && decode_fci(&response.select.data).is_ok_and(|fci| self.aid.matches(&fci.df_name))
    }
}

/// Selection scenario handed to a reader; executed on every card insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultSelectionRequest {
    cases: Vec<CaseRequest>,
    processing: MultiSelectionProcessing,
}

impl DefaultSelectionRequest {
    pub(crate) fn new(cases: Vec<CaseRequest>, processing: MultiSelectionProcessing) -> Self {
        Self { cases, processing }
    }

    pub fn cases(&self) -> &[CaseRequest] {
        &self.cases
    }

    pub fn processing(&self) -> MultiSelectionProcessing {
        self.processing
    }

    /// Run the scenario against the card behind `channel`. Reads only follow
    /// a SELECT whose FCI matches the case. Cases skipped by the protocol
    /// filter, or after a first match under `FirstMatch`, get no response.
    pub fn execute(&self, channel: &ReaderChannel) -> Result<SelectionResponses> {
        let protocol = channel.card_protocol()?;
        let mut responses = Vec::with_capacity(self.cases.len());
        let mut matched = false;

        for case in &self.cases {
            let skip = (matched && self.processing == MultiSelectionProcessing::FirstMatch)
                || case.protocol.is_some_and(|p| protocol != Some(p));
            if skip {
                responses.push(None);
                continue;
            }

            let select = channel.transmit(&case.select_apdu)?;
            let mut response = CardSelectionResponse::new(select, protocol);
            let case_matched = case.matches(&response);
            if case_matched && !case.read_apdus.is_empty() {
                response.reads = channel.transmit_batch(&case.read_apdus)?;
            }
            log::debug!(
                "{}: select answered {:#06x}, {} read(s)",
                channel.name(),
                response.select.sw,
                response.reads.len()
            );
            matched |= case_matched;
            responses.push(Some(response));
        }
        Ok(SelectionResponses(responses))
    }
}

/// What the card answered for one selection case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSelectionResponse {
    select: ApduResponse,
    protocol: Option<CardProtocol>,
    reads: Vec<ApduResponse>,
}

impl CardSelectionResponse {
    pub fn new(select: ApduResponse, protocol: Option<CardProtocol>) -> Self {
        Self {
            select,
            protocol,
            reads: Vec::new(),
        }
    }

    /// Responses to the case's post-selection reads, in registration order.
    pub fn with_reads(mut self, reads: Vec<ApduResponse>) -> Self {
        self.reads = reads;
        self
    }

    pub fn select(&self) -> &ApduResponse {
        &self.select
    }

    pub fn protocol(&self) -> Option<CardProtocol> {
        self.protocol
    }

    pub fn reads(&self) -> &[ApduResponse] {
        &self.reads
    }
}

/// One optional response per registered case, in registration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionResponses(Vec<Option<CardSelectionResponse>>);

impl SelectionResponses {
    pub fn new(responses: Vec<Option<CardSelectionResponse>>) -> Self {
        Self(responses)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CardSelectionResponse> {
        self.0.get(index).and_then(|r| r.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&CardSelectionResponse>> {
        self.0.iter().map(|r| r.as_ref())
    }

    /// True when at least one case of `request` matched the card.
    pub fn any_match(&self, request: &DefaultSelectionRequest) -> bool {
        self.0
            .iter()
            .zip(request.cases())
            .any(|(r, case)| r.as_ref().is_some_and(|r| case.matches(r)))
    }
}
