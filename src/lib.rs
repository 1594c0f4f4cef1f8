use std::sync::Arc;

use tracing::info;

use crate::{
    bridge::{
        bridge::{Bridge, refresh_status_task},
        commands::enqueue_command,
    },
    cli::config::AppConfig,
    device::adb::AdbDriver,
    error::BridgeError,
    pubsub::{
        context::{DeviceDescriptor, PubSubContext},
        mqtt::{MessageHandler, MqttTransport},
    },
    queue::command_queue::CommandQueue,
};

pub mod bridge;
pub mod cli;
pub mod device;
pub mod error;
pub mod navigation;
pub mod pubsub;
pub mod queue;
pub mod rooms;

/// Run the bridge daemon until the command queue worker exits.
///
/// All device work happens on the queue worker. The broker subscriptions
/// only enqueue tasks.
pub fn run_bridge(config: &AppConfig) -> Result<(), BridgeError> {
    let queue: CommandQueue<Bridge> = CommandQueue::new();
    let handle = queue.handle();

    let inbound = handle.clone();
    let on_message: MessageHandler = Arc::new(move |topic, payload| enqueue_command(&inbound, topic, payload));
    let transport = Arc::new(MqttTransport::start(&config.mqtt.broker_settings(), on_message)?);

    let context = PubSubContext::new(
        transport,
        DeviceDescriptor::new(&config.mqtt.device_name),
        config.mqtt.discovery_prefix.clone(),
    );
    let driver = AdbDriver::new(config.device.serial.clone());
    let mut bridge = Bridge::new(
        Box::new(driver),
        &config.device.unlock_pin,
        context,
        config.timing.to_timing(),
    );
    bridge.attach_queue(handle.clone());

    info!(
        broker = %config.mqtt.host,
        port = config.mqtt.port,
        device = %config.mqtt.device_name,
        "starting bridge"
    );

    let worker = queue.start_worker(bridge)?;
    handle.enqueue("bootstrap", Bridge::bootstrap);
    handle.enqueue("status refresh", refresh_status_task);

    worker
        .join()
        .map_err(|_| BridgeError::Worker("command queue worker panicked".to_string()))?;
    info!("bridge stopped");
    Ok(())
}
