// Calypso transactions against a simulated Cone2 reader
//
// Runs the four demo transactions in turn: a plain read, a read inside a
// secure session, a counter increase and a counter decrease. Each one waits
// for the card to be presented, consumes the default selection reported by
// the observer and drives a card session. Run with `RUST_LOG=info`.

use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, bail};
use cardsession::constants::{
    CALYPSO_CLASSIC_AID, SFI_CONTRACTS, SFI_COUNTER_1, SFI_ENVIRONMENT_AND_HOLDER, SFI_EVENT_LOG,
};
use cardsession::prelude::*;
use cardsession::reader::ReaderEvent;
use cardsession::test_support::{SimulatedCard, SimulatedHardware, SimulatedReader, SimulatedSam};

#[derive(Debug, Clone, Copy)]
enum Transaction {
    Read,
    ReadWithSam,
    Increase,
    Decrease,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let (reader, field) = SimulatedReader::with_card(SimulatedCard::calypso());
    let plugin = Plugin::new(Box::new(SimulatedHardware::new(reader)), PluginConfig::default())
        .initialize()
        .await
        .context("plugin initialization")?;
    println!("readers: {:?}", plugin.registry().names());

    let environment = Sfi::new(SFI_ENVIRONMENT_AND_HOLDER)?;
    let event_log = Sfi::new(SFI_EVENT_LOG)?;
    let contracts = Sfi::new(SFI_CONTRACTS)?;
    let counter = Sfi::new(SFI_COUNTER_1)?;

    let mut selection = SelectionService::default();
    selection.prepare_selection(
        SelectionCase::new(CALYPSO_CLASSIC_AID.parse()?).read_record(environment, 1),
    )?;

    let contactless = plugin.config().contactless_reader_name.clone();
    let mut observable = plugin.observable_reader(&contactless)?;
    observable.set_default_selection_request(
        selection.default_selection_request()?,
        plugin.config().notification_mode,
    );
    let (tx, rx) = mpsc::channel();
    observable.set_observer(Box::new(move |event: ReaderEvent| {
        let _ = tx.send(event);
    }));
    let detection = observable.start_detection();

    let (sam, _probe) = SimulatedSam::new();
    let gateway = plugin.sam_gateway(SamSlot::One, Box::new(sam))?;
    let mut session = plugin
        .card_session(SessionConfig::default())?
        .with_sam(gateway);

    let transactions = [
        Transaction::Read,
        Transaction::ReadWithSam,
        Transaction::Increase,
        Transaction::Decrease,
    ];
    for transaction in transactions {
        let activated = loop {
            let event = rx
                .recv_timeout(Duration::from_secs(5))
                .context("no card presented")?;
            println!("event: {}", event);
            match event.kind() {
                ReaderEventKind::CardMatched | ReaderEventKind::CardInserted => {
                    break session.on_reader_event(event, &mut selection)?;
                }
                ReaderEventKind::IoError => bail!("reader failure: {}", event),
                ReaderEventKind::CardRemoved => {}
            }
        };
        if !activated {
            println!("no Calypso application on the card");
            continue;
        }
        let card = session.card().context("selected card")?;
        println!(
            "{:?}: card {} environment {}",
            transaction,
            card.serial_number().to_hex(),
            card.file(environment)
                .and_then(|f| f.content())
                .map(bytes_to_hex)
                .unwrap_or_default()
        );

        match transaction {
            Transaction::Read => {
                session.prepare_read_record(event_log, 1)?;
                session.prepare_read_record(contracts, 1)?;
                session.process_commands()?;
            }
            Transaction::ReadWithSam => {
                session.prepare_read_record(event_log, 1)?;
                session.process_opening(AccessLevel::Debit)?;
                session.prepare_read_record(contracts, 1)?;
                session.process_commands()?;
                session.process_closing()?;
            }
            Transaction::Increase => {
                session.prepare_read_record(counter, 1)?;
                session.process_opening(AccessLevel::Load)?;
                session.prepare_increase_counter(counter, 1, 10)?;
                session.process_commands()?;
                let card = session.process_closing()?;
                println!("counter now {:?}", card.counter(counter, 1));
            }
            Transaction::Decrease => {
                session.prepare_read_record(counter, 1)?;
                session.process_opening(AccessLevel::Debit)?;
                session.prepare_decrease_counter(counter, 1, 1)?;
                session.process_commands()?;
                let card = session.process_closing()?;
                println!("counter now {:?}", card.counter(counter, 1));
            }
        }

        // Present the card again for the next transaction.
        let card = field.remove().context("card left the field")?;
        loop {
            let event = rx.recv_timeout(Duration::from_secs(5))?;
            if event.kind() == ReaderEventKind::CardRemoved {
                session.on_reader_event(event, &mut selection)?;
                break;
            }
        }
        field.insert(card);
    }

    detection.stop()?;
    plugin.shutdown()?;
    Ok(())
}
