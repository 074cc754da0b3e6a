// fixtures.rs: Calypso selection cases and a simulated reader/SAM setup

use std::sync::Arc;

use cardsession::config::SessionConfig;
use cardsession::constants::{
    CALYPSO_CLASSIC_AID, SFI_CONTRACTS, SFI_COUNTER_1, SFI_ENVIRONMENT_AND_HOLDER, SFI_EVENT_LOG,
};
use cardsession::event_sink::MemorySink;
use cardsession::reader::{ContactReader, ContactlessReader, Reader, ReaderChannel, share};
use cardsession::sam::SamGateway;
use cardsession::selection::{SelectionCase, SelectionResult, SelectionService};
use cardsession::session::CardSession;
use cardsession::test_support::{SamProbe, SimulatedCard, SimulatedReader, SimulatedReaderHandle, SimulatedSam};
use cardsession::types::{Aid, SamSlot, Sfi};

pub fn aid() -> Aid {
    CALYPSO_CLASSIC_AID.parse().unwrap()
}

pub fn sfi_env() -> Sfi {
    Sfi::new(SFI_ENVIRONMENT_AND_HOLDER).unwrap()
}

pub fn sfi_event_log() -> Sfi {
    Sfi::new(SFI_EVENT_LOG).unwrap()
}

pub fn sfi_contracts() -> Sfi {
    Sfi::new(SFI_CONTRACTS).unwrap()
}

pub fn sfi_counter() -> Sfi {
    Sfi::new(SFI_COUNTER_1).unwrap()
}

/// Calypso case reading the environment file at selection time.
pub fn calypso_case() -> SelectionCase {
    SelectionCase::new(aid()).read_record(sfi_env(), 1)
}

/// Everything a session test needs, wired on one simulated reader.
pub struct Rig {
    pub session: CardSession,
    pub selection: SelectionService,
    pub reader: SimulatedReaderHandle,
    pub contactless: Reader,
    pub rf: ReaderChannel,
    pub sam: Arc<SamProbe>,
    pub gateway: SamGateway,
    pub sink: MemorySink,
}

pub fn rig_with(card: SimulatedCard, config: SessionConfig) -> Rig {
    let (reader, handle) = SimulatedReader::with_card(card);
    let transport = share(Box::new(reader));
    let rf = ContactlessReader::new("Cone2ContactlessReader", transport.clone());
    let sam_reader = ContactReader::new("Cone2ContactReader_1", SamSlot::One, transport);
    let rf: Reader = rf.into();
    let sam_reader: Reader = sam_reader.into();

    let (sam, probe) = SimulatedSam::new();
    let gateway = SamGateway::with_reader(Box::new(sam), sam_reader.channel().clone());
    let sink = MemorySink::new();
    let session = CardSession::new(rf.channel().clone(), config)
        .with_sam(gateway.clone())
        .with_sink(Box::new(sink.clone()));

    let mut selection = SelectionService::default();
    selection.prepare_selection(calypso_case()).unwrap();

    Rig {
        session,
        selection,
        reader: handle,
        rf: rf.channel().clone(),
        contactless: rf,
        sam: probe,
        gateway,
        sink,
    }
}

pub fn rig() -> Rig {
    rig_with(SimulatedCard::calypso(), SessionConfig::default())
}

impl Rig {
    /// Select the simulated card and activate the result.
    pub fn select(&mut self) -> bool {
        let result = self.selection_result();
        self.session.activate(result).unwrap()
    }

    /// Run the default selection against the simulated card.
    pub fn selection_result(&mut self) -> SelectionResult {
        let request = self.selection.default_selection_request().unwrap();
        let responses = request.execute(&self.rf).unwrap();
        self.selection.process_selection_response(&responses).unwrap()
    }

    /// Unsecured read of `sfi`/`record` while SELECTED.
    pub fn read(&mut self, sfi: cardsession::types::Sfi, record: u8) {
        self.session.prepare_read_record(sfi, record).unwrap();
        self.session.process_commands().unwrap();
    }

    pub fn sent_count(&self) -> usize {
        self.reader.sent().len()
    }
}
