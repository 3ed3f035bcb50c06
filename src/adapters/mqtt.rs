//! MQTT adapter: status publishing, command intake, broker session.
//!
//! ```text
//!  EspMqttConnection ──▶ [mqtt-conn] ──LinkEvent──▶ [mqtt-cmd] MqttSession
//!                         (owns nothing,            ├─ Connected:    link LED, subscribe, snapshot
//!                          just forwards)           ├─ Disconnected: link LED off
//!                                                   └─ Message:      PumpController::handle_message
//!
//!  PumpController / SensingLoop ──StatusEvent──▶ MqttStatusPublisher ──▶ enqueue (QoS 1)
//! ```
//!
//! The connection pump never calls back into the client: ESP-IDF blocks
//! the MQTT task until each event is consumed, and a client call from the
//! consuming thread at that point would wait on the same task.  Every
//! client call therefore happens on the `mqtt-cmd` worker or the sensing
//! loop.

use std::sync::Arc;

use log::{error, info, warn};

use crate::adapters::log_sink::LogEventSink;
use crate::app::events::StatusEvent;
use crate::app::ports::{ActuatorPort, EventSink, SharedSink};
use crate::app::service::PumpController;
use crate::config::TopicConfig;
use crate::control::state::ThresholdKind;
use crate::drivers::status_led::IndicatorLed;
use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Transport seam
// ───────────────────────────────────────────────────────────────

/// The two client operations the firmware needs.  Implemented for
/// `EspMqttClient` on target and by a recording fake in tests.
pub trait MqttTransport {
    /// Queue a status message (QoS 1, not retained).
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError>;

    /// Subscribe to a command topic (QoS 0).
    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Status publisher
// ───────────────────────────────────────────────────────────────

/// Routes each [`StatusEvent`] to its status topic.
pub struct MqttStatusPublisher<T> {
    transport: T,
    topics: TopicConfig,
}

impl<T: MqttTransport> MqttStatusPublisher<T> {
    pub fn new(transport: T, topics: TopicConfig) -> Self {
        Self { transport, topics }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Status topic for `event`.
    pub fn topic_for(&self, event: &StatusEvent) -> &str {
        status_topic(&self.topics, event)
    }

    /// Subscribe to the four command topics.  Stops at the first failure.
    pub fn subscribe_commands(&mut self) -> Result<(), CommsError> {
        for topic in self.topics.command_topics() {
            self.transport.subscribe(topic)?;
            info!("MQTT: subscribed to {topic}");
        }
        Ok(())
    }
}

impl<T: MqttTransport> EventSink for MqttStatusPublisher<T> {
    fn emit(&mut self, event: &StatusEvent) {
        let payload = event.payload();
        let topic = status_topic(&self.topics, event);
        if let Err(e) = self.transport.publish(topic, payload.as_bytes()) {
            error!("MQTT: {e} ({topic} <- {payload})");
        }
    }
}

fn status_topic<'a>(t: &'a TopicConfig, event: &StatusEvent) -> &'a str {
    match event {
        StatusEvent::Mode(_) => &t.mode_status,
        StatusEvent::Pump(_) => &t.pump_status,
        StatusEvent::Distance(_) => &t.distance_status,
        StatusEvent::Threshold { kind: ThresholdKind::On, .. } => &t.on_threshold_status,
        StatusEvent::Threshold { kind: ThresholdKind::Off, .. } => &t.off_threshold_status,
    }
}

/// Sink both contexts publish through: broker first, then serial log.
pub type StatusSink<T> = (SharedSink<MqttStatusPublisher<T>>, LogEventSink);

// ───────────────────────────────────────────────────────────────
// Broker session
// ───────────────────────────────────────────────────────────────

/// What the connection pump forwards to the session worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected,
    Disconnected,
    Message { topic: String, payload: Vec<u8> },
}

/// Reacts to broker session events on the `mqtt-cmd` worker.
pub struct MqttSession<A, T> {
    controller: Arc<PumpController<A>>,
    publisher: SharedSink<MqttStatusPublisher<T>>,
    link_led: IndicatorLed,
}

impl<A: ActuatorPort, T: MqttTransport> MqttSession<A, T> {
    pub fn new(
        controller: Arc<PumpController<A>>,
        publisher: SharedSink<MqttStatusPublisher<T>>,
        link_led: IndicatorLed,
    ) -> Self {
        Self {
            controller,
            publisher,
            link_led,
        }
    }

    pub fn link_up(&self) -> bool {
        self.link_led.is_lit()
    }

    fn sink(&self) -> StatusSink<T> {
        (self.publisher.clone(), LogEventSink::new())
    }

    pub fn handle(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => {
                info!("MQTT: connected to broker");
                self.link_led.set(true);
                if let Err(e) = self.publisher.lock().subscribe_commands() {
                    error!("MQTT: {e}, commands unavailable until reconnect");
                }
                self.controller.publish_snapshot(&mut self.sink());
            }
            LinkEvent::Disconnected => {
                warn!("MQTT: disconnected from broker");
                self.link_led.set(false);
            }
            LinkEvent::Message { topic, payload } => {
                let mut sink = self.sink();
                if self
                    .controller
                    .handle_message(&topic, &payload, &mut sink)
                    .is_none()
                {
                    warn!("MQTT: ignored message on {topic}");
                }
            }
        }
    }

    /// Consume events until the sender side is dropped.
    pub fn run(mut self, events: std::sync::mpsc::Receiver<LinkEvent>) {
        for event in events {
            self.handle(event);
        }
        warn!("MQTT: session worker exiting");
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF client glue
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::{EspStatusSink, start};

#[cfg(target_os = "espidf")]
mod esp {
    use std::sync::{Arc, mpsc};

    use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
    use log::{error, warn};

    use super::{LinkEvent, MqttSession, MqttStatusPublisher, MqttTransport, StatusSink};
    use crate::adapters::log_sink::LogEventSink;
    use crate::app::ports::{ActuatorPort, SharedSink};
    use crate::app::service::PumpController;
    use crate::config::MqttConfig;
    use crate::drivers::status_led::IndicatorLed;
    use crate::drivers::task_pin::{Core, spawn_on_core};
    use crate::error::CommsError;
    use crate::pins;

    pub type EspStatusSink = StatusSink<EspMqttClient<'static>>;

    impl MqttTransport for EspMqttClient<'static> {
        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
            self.enqueue(topic, QoS::AtLeastOnce, false, payload)
                .map(|_| ())
                .map_err(|_| CommsError::MqttPublishFailed)
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
            EspMqttClient::subscribe(self, topic, QoS::AtMostOnce)
                .map(|_| ())
                .map_err(|_| CommsError::MqttSubscribeFailed)
        }
    }

    /// Create the client, start the connection pump and the session
    /// worker.  Returns the sink the sensing loop publishes through.
    pub fn start<A>(
        config: &MqttConfig,
        controller: Arc<PumpController<A>>,
    ) -> Result<EspStatusSink, CommsError>
    where
        A: ActuatorPort + Send + 'static,
    {
        let conf = MqttClientConfiguration {
            client_id: Some(config.client_id.as_str()),
            ..Default::default()
        };
        let (client, mut connection) = EspMqttClient::new(&config.broker_url, &conf).map_err(|e| {
            error!("MQTT: client init for {} failed: {e}", config.broker_url);
            CommsError::MqttConnectFailed
        })?;

        let publisher = SharedSink::new(MqttStatusPublisher::new(client, config.topics.clone()));
        let (tx, rx) = mpsc::channel::<LinkEvent>();

        spawn_on_core(Core::Pro, 5, 4, "mqtt-conn\0", move || {
            while let Ok(event) = connection.next() {
                let forwarded = match event.payload() {
                    EventPayload::Connected(_) => LinkEvent::Connected,
                    EventPayload::Disconnected => LinkEvent::Disconnected,
                    EventPayload::Received { topic: Some(topic), data, .. } => LinkEvent::Message {
                        topic: topic.to_owned(),
                        payload: data.to_vec(),
                    },
                    _ => continue,
                };
                if tx.send(forwarded).is_err() {
                    break;
                }
            }
            warn!("MQTT: connection pump stopped");
        })
        .map_err(|e| {
            error!("MQTT: {e}");
            CommsError::MqttConnectFailed
        })?;

        let session = MqttSession::new(
            controller,
            publisher.clone(),
            IndicatorLed::new(pins::BROKER_LINK_LED_GPIO),
        );
        spawn_on_core(Core::App, 5, 8, "mqtt-cmd\0", move || session.run(rx)).map_err(|e| {
            error!("MQTT: {e}");
            CommsError::MqttConnectFailed
        })?;

        Ok((publisher, LogEventSink::new()))
    }
}
