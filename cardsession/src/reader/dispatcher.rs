// cardsession/src/reader/dispatcher.rs

//! Card presence polling and event delivery.
//!
//! A background thread polls the reader, runs the default selection on
//! insertion and hands each [`ReaderEvent`] to the single registered
//! observer. The next presence change is only looked at once the observer
//! returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::reader::{Reader, ReaderChannel, ReaderEvent, ReaderEventKind};
use crate::selection::DefaultSelectionRequest;
use crate::types::{NotificationMode, PollingMode};
use crate::{Error, Result};

/// Receives reader events, one at a time.
pub trait ReaderObserver: Send {
    fn update(&mut self, event: ReaderEvent);
}

impl<F> ReaderObserver for F
where
    F: FnMut(ReaderEvent) + Send,
{
    fn update(&mut self, event: ReaderEvent) {
        self(event)
    }
}

/// Told about reader I/O failures before the observer sees the event.
pub trait ObservationErrorHandler: Send {
    fn on_reader_error(&mut self, reader_name: &str, error: &Error);
}

impl<F> ObservationErrorHandler for F
where
    F: FnMut(&str, &Error) + Send,
{
    fn on_reader_error(&mut self, reader_name: &str, error: &Error) {
        self(reader_name, error)
    }
}

/// Holds at most one observer.
#[derive(Default)]
pub struct ReaderEventDispatcher {
    observer: Option<Box<dyn ReaderObserver>>,
    error_handler: Option<Box<dyn ObservationErrorHandler>>,
}

impl std::fmt::Debug for ReaderEventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderEventDispatcher")
            .field("observer", &self.observer.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl ReaderEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the observer, replacing any previous one.
    pub fn set_observer(&mut self, observer: Box<dyn ReaderObserver>) {
        if self.observer.replace(observer).is_some() {
            log::debug!("reader observer replaced");
        }
    }

    pub fn remove_observer(&mut self) -> Option<Box<dyn ReaderObserver>> {
        self.observer.take()
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    pub fn set_error_handler(&mut self, handler: Box<dyn ObservationErrorHandler>) {
        self.error_handler = Some(handler);
    }

    /// Deliver `event`; returns false when nobody was listening.
    pub fn dispatch(&mut self, event: ReaderEvent) -> bool {
        if event.kind() == ReaderEventKind::IoError {
            if let Some(handler) = self.error_handler.as_mut() {
                let error = Error::Io(event.error().unwrap_or_default().to_string());
                handler.on_reader_error(event.reader_name(), &error);
            }
        }
        match self.observer.as_mut() {
            Some(observer) => {
                log::debug!("dispatching {}", event);
                observer.update(event);
                true
            }
            None => {
                log::debug!("no observer for {}", event);
                false
            }
        }
    }
}

/// Presence transition seen by the detector.
#[derive(Debug)]
pub enum PresenceChange {
    Inserted,
    Removed,
    IoError(Error),
}

/// Polls card presence under the reader lock and yields transitions. The
/// sequence never ends on its own; it only stops once its stop flag is set.
#[derive(Debug)]
pub struct CardDetector {
    channel: ReaderChannel,
    interval: Duration,
    present: bool,
    started: bool,
    stop: Arc<AtomicBool>,
}

impl CardDetector {
    pub fn new(channel: ReaderChannel, interval: Duration) -> Self {
        Self {
            channel,
            interval,
            present: false,
            started: false,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Forget the last seen presence; a card still in the field is
    /// reported as inserted again.
    pub fn restart(&mut self) {
        self.present = false;
        self.started = false;
    }

    pub fn is_card_present(&self) -> bool {
        self.present
    }
}

impl Iterator for CardDetector {
    type Item = PresenceChange;

    fn next(&mut self) -> Option<PresenceChange> {
        loop {
            if self.started {
                thread::sleep(self.interval);
            }
            self.started = true;
            if self.stop.load(Ordering::Acquire) {
                return None;
            }
            match self.channel.is_card_present() {
                Ok(present) if present != self.present => {
                    self.present = present;
                    return Some(if present {
                        PresenceChange::Inserted
                    } else {
                        PresenceChange::Removed
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    self.present = false;
                    return Some(PresenceChange::IoError(e));
                }
            }
        }
    }
}

/// Reader with card detection, default selection and an event dispatcher.
#[derive(Debug)]
pub struct ObservableReader {
    reader: Reader,
    selection: Option<DefaultSelectionRequest>,
    notification_mode: NotificationMode,
    polling_mode: PollingMode,
    polling_interval: Duration,
    dispatcher: ReaderEventDispatcher,
}

impl ObservableReader {
    pub fn new(reader: Reader, polling_interval: Duration) -> Self {
        Self {
            reader,
            selection: None,
            notification_mode: NotificationMode::default(),
            polling_mode: PollingMode::Repeating,
            polling_interval,
            dispatcher: ReaderEventDispatcher::new(),
        }
    }

    pub fn reader(&self) -> &Reader {
        &self.reader
    }

    pub fn name(&self) -> &str {
        self.reader.name()
    }

    /// Selection run on every insertion, and which insertions are reported.
    pub fn set_default_selection_request(
        &mut self,
        request: DefaultSelectionRequest,
        mode: NotificationMode,
    ) {
        self.selection = Some(request);
        self.notification_mode = mode;
    }

    pub fn polling_mode(&self) -> PollingMode {
        self.polling_mode
    }

    /// `SingleShot` detection ends after the first removal.
    pub fn set_polling_mode(&mut self, mode: PollingMode) {
        self.polling_mode = mode;
    }

    pub fn set_observer(&mut self, observer: Box<dyn ReaderObserver>) {
        self.dispatcher.set_observer(observer);
    }

    pub fn set_error_handler(&mut self, handler: Box<dyn ObservationErrorHandler>) {
        self.dispatcher.set_error_handler(handler);
    }

    pub fn dispatcher_mut(&mut self) -> &mut ReaderEventDispatcher {
        &mut self.dispatcher
    }

    pub fn detector(&self) -> CardDetector {
        CardDetector::new(self.reader.channel().clone(), self.polling_interval)
    }

    /// Turn one presence change into at most one event for the observer.
    pub fn process(&mut self, change: PresenceChange) {
        let name = self.reader.name().to_string();
        let event = match change {
            PresenceChange::Inserted => self.on_insertion(&name),
            PresenceChange::Removed => Some(ReaderEvent::removed(name)),
            PresenceChange::IoError(e) => Some(ReaderEvent::io_error(name, e.to_string())),
        };
        if let Some(event) = event {
            self.dispatcher.dispatch(event);
        }
    }

    fn on_insertion(&self, name: &str) -> Option<ReaderEvent> {
        let Some(request) = &self.selection else {
            return Some(ReaderEvent::inserted(name, None));
        };
        match request.execute(self.reader.channel()) {
            Ok(responses) if responses.any_match(request) => {
                Some(ReaderEvent::matched(name, responses))
            }
            Ok(responses) => match self.notification_mode {
                NotificationMode::Always => Some(ReaderEvent::inserted(name, Some(responses))),
                NotificationMode::MatchedOnly => {
                    log::debug!("{}: card did not match the default selection", name);
                    None
                }
            },
            Err(e) => Some(ReaderEvent::io_error(name, e.to_string())),
        }
    }

    /// Start polling on a background thread in the configured polling mode.
    pub fn start_detection(self) -> DetectionHandle {
        let mode = self.polling_mode;
        let stop = Arc::new(AtomicBool::new(false));
        let detector = self.detector().with_stop(Arc::clone(&stop));
        log::info!("{}: card detection started ({:?})", self.name(), mode);

        let mut this = self;
        let thread = thread::spawn(move || {
            for change in detector {
                let removed = matches!(change, PresenceChange::Removed);
                this.process(change);
                if removed && mode == PollingMode::SingleShot {
                    break;
                }
            }
            log::info!("{}: card detection stopped", this.name());
            this
        });
        DetectionHandle {
            stop,
            thread: Some(thread),
        }
    }
}

/// Running detection loop. Dropping it stops and joins the thread.
#[derive(Debug)]
pub struct DetectionHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<ObservableReader>>,
}

impl DetectionHandle {
    /// True once the loop ended (single shot completed, or stopped).
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }

    /// Stop polling and get the reader back.
    pub fn stop(mut self) -> Result<ObservableReader> {
        self.stop.store(true, Ordering::Release);
        let thread = self
            .thread
            .take()
            .ok_or_else(|| Error::Configuration("detection already stopped".into()))?;
        thread
            .join()
            .map_err(|_| Error::Io("card detection thread panicked".into()))
    }
}

impl Drop for DetectionHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
