//! MQTT status routing and the broker session worker, against a
//! recording transport.

use std::sync::Arc;

use crate::mock_hw::{MockHardware, RecordingTransport};

use tankpump::adapters::mqtt::{LinkEvent, MqttSession, MqttStatusPublisher};
use tankpump::app::events::{DistanceStatus, StatusEvent};
use tankpump::app::ports::{EventSink, SharedSink};
use tankpump::app::service::PumpController;
use tankpump::config::{SystemConfig, TopicConfig};
use tankpump::control::state::{Mode, ThresholdKind};
use tankpump::drivers::status_led::IndicatorLed;

fn publisher() -> MqttStatusPublisher<RecordingTransport> {
    MqttStatusPublisher::new(RecordingTransport::new(), TopicConfig::default())
}

// ── Status publisher ──────────────────────────────────────────

#[test]
fn events_map_to_status_topics() {
    let mut p = publisher();
    p.emit(&StatusEvent::Mode(Mode::Manual));
    p.emit(&StatusEvent::Pump(true));
    p.emit(&StatusEvent::Distance(DistanceStatus::Reading(57.26)));
    p.emit(&StatusEvent::Threshold { kind: ThresholdKind::On, value_cm: 70.0 });
    p.emit(&StatusEvent::Threshold { kind: ThresholdKind::Off, value_cm: 15.0 });

    let published: Vec<(&str, &str)> = p
        .transport()
        .published
        .iter()
        .map(|(t, m)| (t.as_str(), m.as_str()))
        .collect();
    assert_eq!(
        published,
        vec![
            ("esp32/status/modo", "MANUAL"),
            ("esp32/status/bomba", "LIGADA"),
            ("esp32/status/distancia", "57.3"),
            ("esp32/status/dist_ligar", "70.0"),
            ("esp32/status/dist_desligar", "15.0"),
        ]
    );
}

#[test]
fn distance_markers_go_to_distance_topic() {
    let mut p = publisher();
    for status in [
        DistanceStatus::OutOfRange,
        DistanceStatus::NoEcho,
        DistanceStatus::Waiting,
        DistanceStatus::Inactive,
    ] {
        p.emit(&StatusEvent::Distance(status));
    }
    assert_eq!(
        p.transport().on_topic("esp32/status/distancia"),
        vec![
            "Fora de alcance",
            "Sem eco (timeout)",
            "Aguardando leitura...",
            "Sensor inativo (modo manual)",
        ]
    );
}

#[test]
fn publish_failure_is_swallowed() {
    let mut transport = RecordingTransport::new();
    transport.fail_publish = true;
    let mut p = MqttStatusPublisher::new(transport, TopicConfig::default());
    p.emit(&StatusEvent::Pump(false));
    assert!(p.transport().published.is_empty());
}

#[test]
fn custom_status_topics() {
    let mut topics = TopicConfig::default();
    topics.pump_status = "tank/1/pump".into();
    let mut p = MqttStatusPublisher::new(RecordingTransport::new(), topics);
    assert_eq!(p.topic_for(&StatusEvent::Pump(true)), "tank/1/pump");
    p.emit(&StatusEvent::Pump(true));
    assert_eq!(p.transport().on_topic("tank/1/pump"), vec!["LIGADA"]);
}

// ── Session worker ────────────────────────────────────────────

type Session = MqttSession<MockHardware, RecordingTransport>;

fn session(
    transport: RecordingTransport,
) -> (Session, Arc<PumpController<MockHardware>>, SharedSink<MqttStatusPublisher<RecordingTransport>>) {
    let controller = Arc::new(PumpController::new(&SystemConfig::default(), MockHardware::new()));
    let shared = SharedSink::new(MqttStatusPublisher::new(transport, TopicConfig::default()));
    // Link LED on a pin no other test in this binary drives.
    let s = MqttSession::new(Arc::clone(&controller), shared.clone(), IndicatorLed::new(30));
    (s, controller, shared)
}

#[test]
fn connect_subscribes_and_publishes_snapshot() {
    let (mut s, _, shared) = session(RecordingTransport::new());

    s.handle(LinkEvent::Connected);

    assert!(s.link_up());
    let guard = shared.lock();
    let t = guard.transport();
    assert_eq!(
        t.subscriptions,
        vec![
            "esp32/comando/modo",
            "esp32/comando/rele",
            "esp32/comando/dist_ligar",
            "esp32/comando/dist_desligar",
        ]
    );
    assert_eq!(t.on_topic("esp32/status/modo"), vec!["AUTOMATICO"]);
    assert_eq!(t.on_topic("esp32/status/bomba"), vec!["DESLIGADA"]);
    assert_eq!(t.on_topic("esp32/status/distancia"), vec!["Aguardando leitura..."]);
}

#[test]
fn snapshot_still_published_when_subscribe_fails() {
    let mut transport = RecordingTransport::new();
    transport.fail_subscribe = true;
    let (mut s, _, shared) = session(transport);

    s.handle(LinkEvent::Connected);

    let guard = shared.lock();
    assert!(guard.transport().subscriptions.is_empty());
    assert_eq!(guard.transport().published.len(), 3);
}

#[test]
fn disconnect_clears_link_led() {
    let (mut s, _, _) = session(RecordingTransport::new());
    s.handle(LinkEvent::Connected);
    s.handle(LinkEvent::Disconnected);
    assert!(!s.link_up());
}

#[test]
fn received_command_reaches_controller_and_status_goes_out() {
    let (mut s, controller, shared) = session(RecordingTransport::new());

    s.handle(LinkEvent::Message {
        topic: "esp32/comando/modo".into(),
        payload: b"MANUAL".to_vec(),
    });
    s.handle(LinkEvent::Message {
        topic: "esp32/comando/rele".into(),
        payload: b"LIGAR".to_vec(),
    });

    let state = controller.snapshot();
    assert_eq!(state.mode, Mode::Manual);
    assert!(state.pump_on);

    let guard = shared.lock();
    assert_eq!(guard.transport().on_topic("esp32/status/modo"), vec!["MANUAL"]);
    assert_eq!(guard.transport().on_topic("esp32/status/bomba"), vec!["LIGADA"]);
}

#[test]
fn reconnect_snapshot_reflects_current_state() {
    let (mut s, _, shared) = session(RecordingTransport::new());
    s.handle(LinkEvent::Message {
        topic: "esp32/comando/modo".into(),
        payload: b"MANUAL".to_vec(),
    });
    s.handle(LinkEvent::Disconnected);
    s.handle(LinkEvent::Connected);

    let guard = shared.lock();
    assert_eq!(
        guard.transport().on_topic("esp32/status/distancia"),
        vec!["Sensor inativo (modo manual)"]
    );
}

#[test]
fn worker_drains_channel_until_sender_drops() {
    let (s, controller, _) = session(RecordingTransport::new());
    let (tx, rx) = std::sync::mpsc::channel();
    tx.send(LinkEvent::Message {
        topic: "esp32/comando/dist_ligar".into(),
        payload: b"90".to_vec(),
    })
    .unwrap();
    drop(tx);

    s.run(rx);

    assert!((controller.snapshot().threshold_on_cm - 90.0).abs() < f32::EPSILON);
}
