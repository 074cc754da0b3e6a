#[path = "../common/mod.rs"]
mod common;

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cardsession::reader::{ObservableReader, PresenceChange, ReaderEvent};
use cardsession::selection::SelectionService;
use cardsession::session::{CardSession, SessionState};
use cardsession::types::{AccessLevel, NotificationMode};
use cardsession::Error;

type Shared = Arc<Mutex<(CardSession, SelectionService)>>;

/// Observable reader on the rig's antenna feeding every event to the session.
fn wired(rig: &mut common::Rig) -> (ObservableReader, Shared, Arc<Mutex<Vec<bool>>>) {
    let session = std::mem::replace(
        &mut rig.session,
        CardSession::new(rig.rf.clone(), Default::default()),
    );
    let selection = std::mem::take(&mut rig.selection);
    let shared: Shared = Arc::new(Mutex::new((session, selection)));
    let outcomes = Arc::new(Mutex::new(Vec::new()));

    let mut observable = ObservableReader::new(rig.contactless.clone(), Duration::from_millis(5));
    let target = Arc::clone(&shared);
    let seen = Arc::clone(&outcomes);
    observable.set_observer(Box::new(move |event: ReaderEvent| {
        let mut guard = target.lock().unwrap();
        let (session, selection) = &mut *guard;
        let activated = session.on_reader_event(event, selection).unwrap();
        seen.lock().unwrap().push(activated);
    }));
    (observable, shared, outcomes)
}

#[test]
fn removal_while_open_goes_idle_through_the_observer() {
    let mut rig = common::rig();
    rig.select();
    let sfi = common::sfi_counter();
    rig.session.prepare_read_record(sfi, 1).unwrap();
    rig.session.process_opening(AccessLevel::Debit).unwrap();
    rig.session.prepare_decrease_counter(sfi, 1, 1).unwrap();
    rig.reader.clear_sent();

    let (mut observable, shared, outcomes) = wired(&mut rig);
    let removed = rig.reader.remove().unwrap();
    observable.process(PresenceChange::Removed);

    let guard = shared.lock().unwrap();
    let session = &guard.0;
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.card().is_none());
    assert!(session.queue().is_empty());
    assert!(session.security_session().is_none());
    assert_eq!(*outcomes.lock().unwrap(), vec![false]);
    assert!(rig.reader.sent().is_empty());
    assert_eq!(rig.sam.verifications.load(Ordering::SeqCst), 0);
    assert_eq!(removed.counter(0x19, 1), Some(0x0100));
    assert!(!rig.rf.session_open());
}

#[test]
fn reader_failure_drops_the_selected_card() {
    let mut rig = common::rig();
    assert!(rig.select());

    let (mut observable, shared, _) = wired(&mut rig);
    observable.process(PresenceChange::IoError(Error::Io("antenna lost".into())));

    let guard = shared.lock().unwrap();
    assert_eq!(guard.0.state(), SessionState::Idle);
    assert!(guard.0.card().is_none());
}

#[test]
fn matched_insertion_activates_the_card() {
    let mut rig = common::rig();
    let request = rig.selection.default_selection_request().unwrap();

    let (mut observable, shared, outcomes) = wired(&mut rig);
    observable.set_default_selection_request(request, NotificationMode::MatchedOnly);
    observable.process(PresenceChange::Inserted);

    let guard = shared.lock().unwrap();
    let session = &guard.0;
    assert_eq!(*outcomes.lock().unwrap(), vec![true]);
    assert_eq!(session.state(), SessionState::Selected);
    let card = session.card().unwrap();
    assert_eq!(card.serial_number().to_hex(), "0000000012345678");
    assert!(card.file(common::sfi_env()).unwrap().content().is_some());
}

#[test]
fn events_of_another_reader_are_ignored() {
    let mut rig = common::rig();
    assert!(rig.select());
    let mut selection = SelectionService::default();

    let activated = rig
        .session
        .on_reader_event(ReaderEvent::removed("Cone2ContactReader_1"), &mut selection)
        .unwrap();
    assert!(!activated);
    assert_eq!(rig.session.state(), SessionState::Selected);
}
