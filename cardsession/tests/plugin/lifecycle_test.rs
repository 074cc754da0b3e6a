#[path = "../common/mod.rs"]
mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use cardsession::Error;
use cardsession::config::{PluginConfig, SessionConfig};
use cardsession::plugin::Plugin;
use cardsession::selection::SelectionService;
use cardsession::session::SessionState;
use cardsession::test_support::{SimulatedCard, SimulatedHardware, SimulatedReader, SimulatedSam};
use cardsession::types::{AccessLevel, PollingMode, SamSlot};

#[tokio::test]
async fn initialized_plugin_exposes_all_readers() {
    let (reader, _handle) = SimulatedReader::new();
    let plugin = Plugin::new(Box::new(SimulatedHardware::new(reader)), PluginConfig::default())
        .initialize()
        .await
        .unwrap();

    assert_eq!(
        plugin.registry().names(),
        vec!["Cone2ContactlessReader", "Cone2ContactReader_1", "Cone2ContactReader_2"]
    );
    assert!(plugin.reader("Cone2ContactlessReader").unwrap().is_contactless());
    assert!(matches!(plugin.reader("nope"), Err(Error::ReaderNotFound(_))));
    assert_eq!(plugin.firmware_version(), Some("ASK-CONE2 1.0.0"));
}

#[tokio::test]
async fn observable_reader_follows_configured_polling_mode() {
    let (reader, _handle) = SimulatedReader::new();
    let config = PluginConfig::default().polling_mode(PollingMode::SingleShot);
    let plugin = Plugin::new(Box::new(SimulatedHardware::new(reader)), config)
        .initialize()
        .await
        .unwrap();

    let observable = plugin.observable_reader("Cone2ContactlessReader").unwrap();
    assert_eq!(observable.polling_mode(), PollingMode::SingleShot);
    assert_eq!(observable.name(), "Cone2ContactlessReader");
}

#[tokio::test]
async fn slow_reader_acquisition_times_out_and_powers_down() {
    let (reader, _handle) = SimulatedReader::new();
    let mut hardware = SimulatedHardware::new(reader);
    hardware.reader_delay = Duration::from_millis(500);
    let power_downs = hardware.power_downs.clone();
    let config = PluginConfig::default().reader_init_timeout(20);

    match Plugin::new(Box::new(hardware), config).initialize().await {
        Err(Error::Timeout {
            operation,
            timeout_ms,
        }) => {
            assert_eq!(operation, "reader acquisition");
            assert_eq!(timeout_ms, 20);
        }
        other => panic!("expected timeout, got {:?}", other.map(|_| ())),
    }
    assert_eq!(power_downs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_powers_down_once() {
    let (reader, _handle) = SimulatedReader::new();
    let hardware = SimulatedHardware::new(reader);
    let power_downs = hardware.power_downs.clone();
    let plugin = Plugin::new(Box::new(hardware), PluginConfig::default())
        .initialize()
        .await
        .unwrap();
    plugin.shutdown().unwrap();
    assert_eq!(power_downs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn debit_session_through_plugin_readers() {
    let (reader, handle) = SimulatedReader::with_card(SimulatedCard::calypso());
    let plugin = Plugin::new(Box::new(SimulatedHardware::new(reader)), PluginConfig::default())
        .initialize()
        .await
        .unwrap();

    let (sam, probe) = SimulatedSam::new();
    let gateway = plugin.sam_gateway(SamSlot::One, Box::new(sam)).unwrap();
    let mut session = plugin
        .card_session(SessionConfig::default())
        .unwrap()
        .with_sam(gateway);

    let mut selection = SelectionService::default();
    selection.prepare_selection(common::calypso_case()).unwrap();
    let request = selection.default_selection_request().unwrap();
    let rf = plugin.registry().contactless().unwrap();
    let responses = request.execute(rf.channel()).unwrap();
    let result = selection.process_selection_response(&responses).unwrap();
    assert!(session.activate(result).unwrap());

    session.process_opening(AccessLevel::Debit).unwrap();
    session
        .prepare_decrease_counter(common::sfi_counter(), 1, 1)
        .unwrap();
    session.process_commands().unwrap();
    let card = session.process_closing().unwrap();

    assert_eq!(card.counter(common::sfi_counter(), 1), Some(0x0000FF));
    assert_eq!(
        handle.with_card(|c| c.counter(common::sfi_counter().as_u8(), 1)),
        Some(Some(0x0000FF))
    );
    assert_eq!(probe.verifications.load(Ordering::SeqCst), 1);
    assert_eq!(session.state(), SessionState::Idle);
}
