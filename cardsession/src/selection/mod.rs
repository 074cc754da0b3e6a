// cardsession/src/selection/mod.rs

//! Card selection: register cases, arm the default selection request for
//! the reader, evaluate what the card answered.

mod case;
mod request;
mod result;

pub use case::SelectionCase;
pub use request::{CardSelectionResponse, CaseRequest, DefaultSelectionRequest, SelectionResponses};
pub use result::SelectionResult;

use crate::card::{Card, CardBuilder};
use crate::protocol::decode_fci;
use crate::types::MultiSelectionProcessing;
use crate::{Error, Result};

#[derive(Debug, Default)]
pub struct SelectionService {
    cases: Vec<SelectionCase>,
    processing: MultiSelectionProcessing,
    in_flight: bool,
}

impl SelectionService {
    pub fn new(processing: MultiSelectionProcessing) -> Self {
        Self {
            cases: Vec::new(),
            processing,
            in_flight: false,
        }
    }

    pub fn processing(&self) -> MultiSelectionProcessing {
        self.processing
    }

    pub fn cases(&self) -> &[SelectionCase] {
        &self.cases
    }

    /// True between `default_selection_request` and the next
    /// `process_selection_response`.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Register a case and return its index.
    pub fn prepare_selection(&mut self, case: SelectionCase) -> Result<usize> {
        if self.in_flight {
            return Err(Error::Configuration(
                "cannot prepare a selection case while a selection is in flight".into(),
            ));
        }
        if let Some(&(sfi, _)) = case.reads().iter().find(|(_, record)| *record == 0) {
            return Err(Error::InvalidOperand(format!(
                "record number 0 in post-selection read of {}",
                sfi
            )));
        }
        self.cases.push(case);
        Ok(self.cases.len() - 1)
    }

    /// Arm the selection and produce the request the reader executes on
    /// card insertion.
    pub fn default_selection_request(&mut self) -> Result<DefaultSelectionRequest> {
        if self.cases.is_empty() {
            return Err(Error::Configuration("no selection case registered".into()));
        }
        self.in_flight = true;
        let cases = self.cases.iter().map(CaseRequest::from_case).collect();
        Ok(DefaultSelectionRequest::new(cases, self.processing))
    }

    /// Evaluate the captured responses against the registered cases, in
    /// registration order.
    pub fn process_selection_response(
        &mut self,
        responses: &SelectionResponses,
    ) -> Result<SelectionResult> {
        self.in_flight = false;
        if responses.len() != self.cases.len() {
            return Err(Error::Configuration(format!(
                "{} selection response(s) for {} case(s)",
                responses.len(),
                self.cases.len()
            )));
        }

        let mut result = SelectionResult::default();
        for (index, (case, response)) in self.cases.iter().zip(responses.iter()).enumerate() {
            let Some(response) = response else {
                continue;
            };
            if let Some(card) = materialize(case, response)? {
                log::info!("selection case {} matched card {}", index, card.serial_number().to_hex());
                result.push_match(index, card);
                if self.processing == MultiSelectionProcessing::FirstMatch {
                    break;
                }
            }
        }
        if !result.has_active_selection() {
            log::debug!("no selection case matched");
        }
        Ok(result)
    }
}

fn materialize(case: &SelectionCase, response: &CardSelectionResponse) -> Result<Option<Card>> {
    let select = response.select();
    if !case.accepts(select.sw) {
        log::debug!("{}: select status {:#06x} not accepted", case.aid(), select.sw);
        return Ok(None);
    }
    if !case.accepts_protocol(response.protocol()) {
        return Ok(None);
    }
    let fci = match decode_fci(&select.data) {
        Ok(fci) => fci,
        Err(e) => {
            log::warn!("{}: unreadable FCI: {}", case.aid(), e);
            return Ok(None);
        }
    };
    if !case.aid().matches(&fci.df_name) {
        return Ok(None);
    }

    let mut builder = CardBuilder::new().fci(fci).protocol(response.protocol());
    for &(sfi, width) in case.counter_widths() {
        builder = builder.counter_width(sfi, width);
    }
    let mut card = builder.build()?;

    for (i, &(sfi, record)) in case.reads().iter().enumerate() {
        match response.reads().get(i) {
            Some(r) if r.is_success() && !r.data.is_empty() => {
                card.file_mut(sfi).set_record(record, r.data.clone());
            }
            Some(r) => log::warn!("read of {}/{} failed: {:#06x}", sfi, record, r.sw),
            None => log::warn!("read of {}/{} not performed", sfi, record),
        }
    }
    Ok(Some(card))
}
