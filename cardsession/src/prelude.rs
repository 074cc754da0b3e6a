// cardsession/src/prelude.rs

pub use crate::card::{Card, ElementaryFile};
pub use crate::config::{PluginConfig, SessionConfig};
pub use crate::event_sink::{EventSink, LogSink, MemorySink};
#[cfg(feature = "async")]
pub use crate::plugin::{HardwarePlatform, Initialized, Plugin, ReaderRegistry, Uninitialized};
pub use crate::reader::{
    ObservableReader, Reader, ReaderChannel, ReaderEvent, ReaderEventKind, ReaderObserver,
};
pub use crate::sam::{SamGateway, SamHandle, SecurityModule};
pub use crate::selection::{SelectionCase, SelectionResult, SelectionService};
pub use crate::session::{CardSession, SessionState};
pub use crate::transport::Transport;
pub use crate::{
    AccessLevel, Aid, CardProtocol, Error, ErrorCategory, InvalidationPolicy,
    MultiSelectionProcessing, NotificationMode, PollingMode, Result, SamSlot, SerialNumber, Sfi,
};

pub use crate::utils::{bytes_to_hex, bytes_to_hex_spaced, ms, parse_hex};
