// cardsession/src/selection/case.rs

use crate::constants::{SW_INVALIDATED, SW_SUCCESS};
use crate::types::{Aid, CardProtocol, InvalidationPolicy, Sfi};

/// One candidate selection: target AID, optional protocol filter,
/// invalidation policy and the records to read right after selection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectionCase {
    aid: Aid,
    protocol: Option<CardProtocol>,
    invalidation: InvalidationPolicy,
    reads: Vec<(Sfi, u8)>,
    counter_widths: Vec<(Sfi, usize)>,
}

impl SelectionCase {
    pub fn new(aid: Aid) -> Self {
        Self {
            aid,
            protocol: None,
            invalidation: InvalidationPolicy::default(),
            reads: Vec::new(),
            counter_widths: Vec::new(),
        }
    }

    /// Only match cards that answered with `protocol`.
    pub fn protocol(mut self, protocol: CardProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn invalidation(mut self, policy: InvalidationPolicy) -> Self {
        self.invalidation = policy;
        self
    }

    /// Read `record` of `sfi` as part of the selection.
    pub fn read_record(mut self, sfi: Sfi, record: u8) -> Self {
        self.reads.push((sfi, record));
        self
    }

    /// Interpret records of `sfi` as `width`-byte counters.
    pub fn counter_width(mut self, sfi: Sfi, width: usize) -> Self {
        self.counter_widths.push((sfi, width));
        self
    }

    pub fn aid(&self) -> &Aid {
        &self.aid
    }

    pub fn protocol_filter(&self) -> Option<CardProtocol> {
        self.protocol
    }

    pub fn invalidation_policy(&self) -> InvalidationPolicy {
        self.invalidation
    }

    pub fn reads(&self) -> &[(Sfi, u8)] {
        &self.reads
    }

    pub fn counter_widths(&self) -> &[(Sfi, usize)] {
        &self.counter_widths
    }

    /// Status words of the SELECT answer this case accepts.
    pub fn accepted_status_words(&self) -> Vec<u16> {
        match self.invalidation {
            InvalidationPolicy::Reject => vec![SW_SUCCESS],
            InvalidationPolicy::Accept => vec![SW_SUCCESS, SW_INVALIDATED],
        }
    }

    pub fn accepts(&self, sw: u16) -> bool {
        self.accepted_status_words().contains(&sw)
    }

    pub fn accepts_protocol(&self, protocol: Option<CardProtocol>) -> bool {
        match self.protocol {
            Some(wanted) => protocol == Some(wanted),
            None => true,
        }
    }
}
