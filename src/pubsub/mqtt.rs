use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::pubsub::context::Transport;

/// Callback for inbound `(topic, payload)` messages.
pub type MessageHandler = Arc<dyn Fn(String, String) + Send + Sync>;

const KEEP_ALIVE: Duration = Duration::from_secs(60);
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Requests buffered while the broker is away. A full buffer fails the
/// publish instead of blocking the caller.
const REQUEST_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl BrokerSettings {
    pub fn options(&self, client_id: &str) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, &self.host, self.port);
        options.set_keep_alive(KEEP_ALIVE);
        if let Some(user) = &self.username {
            options.set_credentials(user, self.password.as_deref().unwrap_or(""));
        }
        options
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

/// Every topic subscribed so far, replayed after each (re)connect.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    topics: Mutex<Vec<String>>,
}

impl SubscriptionSet {
    /// Returns false when `topic` was already registered.
    pub fn add(&self, topic: &str) -> bool {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        if topics.iter().any(|t| t == topic) {
            return false;
        }
        topics.push(topic.to_string());
        true
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

// ============================================================================
// Event loop
// ============================================================================

/// What the network thread does with one broker event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Connected,
    Message { topic: String, payload: String },
    Ignored,
}

pub fn classify_event(event: &Event) -> Inbound {
    match event {
        Event::Incoming(Packet::ConnAck(_)) => Inbound::Connected,
        Event::Incoming(Packet::Publish(publish)) => Inbound::Message {
            topic: publish.topic.clone(),
            payload: String::from_utf8_lossy(&publish.payload).into_owned(),
        },
        _ => Inbound::Ignored,
    }
}

fn run_event_loop(mut connection: Connection, client: Client, subscriptions: Arc<SubscriptionSet>, on_message: MessageHandler) {
    // Polling again after an error makes the connection reconnect.
    for notification in connection.iter() {
        match notification {
            Ok(event) => match classify_event(&event) {
                Inbound::Connected => {
                    let topics = subscriptions.topics();
                    info!(topics = topics.len(), "connected to broker");
                    for topic in topics {
                        if let Err(e) = client.try_subscribe(topic.as_str(), QoS::AtLeastOnce) {
                            warn!(topic = %topic, "resubscribe failed: {}", e);
                        }
                    }
                }
                Inbound::Message { topic, payload } => {
                    debug!(topic = %topic, payload = %payload, "message received");
                    on_message(topic, payload);
                }
                Inbound::Ignored => {}
            },
            Err(e) => {
                warn!("broker connection lost: {}; retrying in {:?}", e, RECONNECT_DELAY);
                thread::sleep(RECONNECT_DELAY);
            }
        }
    }
    info!("broker event loop ended");
}

// ============================================================================
// Transport
// ============================================================================

/// `Transport` over one persistent MQTT session.
///
/// Publishes and subscriptions are queued to a network thread and never
/// wait for the broker. The thread reconnects on its own and replays the
/// subscriptions after every connection acknowledgement.
pub struct MqttTransport {
    client: Client,
    subscriptions: Arc<SubscriptionSet>,
}

impl MqttTransport {
    pub fn start(settings: &BrokerSettings, on_message: MessageHandler) -> Result<Self, BridgeError> {
        let client_id = format!("vacuum-bridge-{}", std::process::id());
        let (client, connection) = Client::new(settings.options(&client_id), REQUEST_CAPACITY);
        let subscriptions = Arc::new(SubscriptionSet::default());

        let loop_client = client.clone();
        let loop_subscriptions = Arc::clone(&subscriptions);
        thread::Builder::new()
            .name("mqtt-eventloop".into())
            .spawn(move || run_event_loop(connection, loop_client, loop_subscriptions, on_message))?;

        info!(host = %settings.host, port = settings.port, client_id = %client_id, "mqtt client started");
        Ok(Self {
            client,
            subscriptions,
        })
    }
}

impl Transport for MqttTransport {
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), BridgeError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec())
            .map_err(|e| BridgeError::Transport(format!("publish to {} not queued: {}", topic, e)))?;
        debug!(topic, payload, retain, "publish queued");
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<(), BridgeError> {
        if !self.subscriptions.add(topic) {
            debug!(topic, "already subscribed");
            return Ok(());
        }
        self.client
            .try_subscribe(topic, QoS::AtLeastOnce)
            .map_err(|e| BridgeError::Transport(format!("subscribe to {} not queued: {}", topic, e)))?;
        info!(topic, "subscribed");
        Ok(())
    }
}
