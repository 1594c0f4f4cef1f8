use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Publish/subscribe capability the bridge mirrors its state into.
pub trait Transport: Send + Sync {
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), BridgeError>;

    fn subscribe(&self, topic: &str) -> Result<(), BridgeError>;
}

/// Device block embedded in every discovery payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub identifiers: Vec<String>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
}

impl DeviceDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            identifiers: vec![name.to_lowercase().replace(' ', "_")],
            name: name.to_string(),
            manufacturer: "vacuum-bridge".to_string(),
            model: "Robot Vacuum".to_string(),
        }
    }
}

/// Everything an entity needs to talk to the broker. Fields stay `None`
/// until the transport is connected.
#[derive(Clone, Default)]
pub struct PubSubContext {
    pub transport: Option<Arc<dyn Transport>>,
    pub device: Option<DeviceDescriptor>,
    pub prefix: Option<String>,
}

/// A fully populated view of [`PubSubContext`].
pub struct ReadyContext<'a> {
    pub transport: &'a dyn Transport,
    pub device: &'a DeviceDescriptor,
    pub prefix: &'a str,
}

impl PubSubContext {
    pub fn new(transport: Arc<dyn Transport>, device: DeviceDescriptor, prefix: impl Into<String>) -> Self {
        Self {
            transport: Some(transport),
            device: Some(device),
            prefix: Some(prefix.into()),
        }
    }

    pub fn ready(&self) -> Result<ReadyContext<'_>, BridgeError> {
        let transport = self
            .transport
            .as_deref()
            .ok_or(BridgeError::ContextNotInitialized("transport"))?;
        let device = self
            .device
            .as_ref()
            .ok_or(BridgeError::ContextNotInitialized("device descriptor"))?;
        let prefix = self
            .prefix
            .as_deref()
            .ok_or(BridgeError::ContextNotInitialized("discovery prefix"))?;

        Ok(ReadyContext {
            transport,
            device,
            prefix,
        })
    }
}
