// cardsession/src/reader/event.rs

use derive_more::Display;

use crate::selection::SelectionResponses;

/// Kind of a reader notification.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderEventKind {
    #[display(fmt = "CARD_INSERTED")]
    CardInserted,
    #[display(fmt = "CARD_MATCHED")]
    CardMatched,
    #[display(fmt = "CARD_REMOVED")]
    CardRemoved,
    #[display(fmt = "IO_ERROR")]
    IoError,
}

/// Immutable reader notification. Not `Clone`: it is moved into the
/// observer and consumed there.
#[derive(Debug)]
pub struct ReaderEvent {
    reader_name: String,
    kind: ReaderEventKind,
    selection: Option<SelectionResponses>,
    error: Option<String>,
}

impl ReaderEvent {
    pub fn inserted(reader_name: impl Into<String>, selection: Option<SelectionResponses>) -> Self {
        Self {
            reader_name: reader_name.into(),
            kind: ReaderEventKind::CardInserted,
            selection,
            error: None,
        }
    }

    pub fn matched(reader_name: impl Into<String>, selection: SelectionResponses) -> Self {
        Self {
            reader_name: reader_name.into(),
            kind: ReaderEventKind::CardMatched,
            selection: Some(selection),
            error: None,
        }
    }

    pub fn removed(reader_name: impl Into<String>) -> Self {
        Self {
            reader_name: reader_name.into(),
            kind: ReaderEventKind::CardRemoved,
            selection: None,
            error: None,
        }
    }

    pub fn io_error(reader_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            reader_name: reader_name.into(),
            kind: ReaderEventKind::IoError,
            selection: None,
            error: Some(error.into()),
        }
    }

    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    pub fn kind(&self) -> ReaderEventKind {
        self.kind
    }

    pub fn selection(&self) -> Option<&SelectionResponses> {
        self.selection.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Take the attached selection responses out of the event.
    pub fn into_selection(self) -> Option<SelectionResponses> {
        self.selection
    }
}

impl std::fmt::Display for ReaderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on {}", self.kind, self.reader_name)?;
        if let Some(e) = &self.error {
            write!(f, " ({})", e)?;
        }
        Ok(())
    }
}
