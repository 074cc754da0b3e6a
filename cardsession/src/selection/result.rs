// cardsession/src/selection/result.rs

use crate::card::Card;

/// Outcome of evaluating a selection. No match is a normal result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionResult {
    matches: Vec<(usize, Card)>,
}

impl SelectionResult {
    pub(crate) fn push_match(&mut self, index: usize, card: Card) {
        self.matches.push((index, card));
    }

    pub fn has_active_selection(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Index of the active (first matching) case.
    pub fn active_index(&self) -> Option<usize> {
        self.matches.first().map(|(i, _)| *i)
    }

    pub fn active_card(&self) -> Option<&Card> {
        self.matches.first().map(|(_, c)| c)
    }

    pub fn into_active_card(self) -> Option<Card> {
        self.matches.into_iter().next().map(|(_, c)| c)
    }

    /// Every matching case with its card; more than one only under
    /// `ProcessAll`.
    pub fn matches(&self) -> impl Iterator<Item = (usize, &Card)> {
        self.matches.iter().map(|(i, c)| (*i, c))
    }
}
