use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::pubsub::context::{DeviceDescriptor, Transport};
use crate::rooms::normalize::entity_id;

pub const PAYLOAD_ON: &str = "ON";
pub const PAYLOAD_OFF: &str = "OFF";
pub const PAYLOAD_PRESS: &str = "PRESS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Switch,
    Button,
    Sensor,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Switch => "switch",
            EntityKind::Button => "button",
            EntityKind::Sensor => "sensor",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn state_payload(enabled: bool) -> &'static str {
    if enabled { PAYLOAD_ON } else { PAYLOAD_OFF }
}

/// Discovery document published (retained) on the config topic.
#[derive(Debug, Serialize)]
pub struct DiscoveryConfig<'a> {
    pub name: &'a str,
    pub unique_id: &'a str,
    pub device: &'a DeviceDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_topic: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_topic: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_on: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_off: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_press: Option<&'static str>,
}

/// Published counterpart of a room toggle, an action button or a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub id: String,
    pub kind: EntityKind,
    /// Last published (or last observed) switch state.
    pub enabled: bool,
    pub config_topic: String,
    pub state_topic: String,
    pub command_topic: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, kind: EntityKind, prefix: &str, enabled: bool) -> Self {
        let name = name.into();
        let id = entity_id(&name);
        Self::with_id(name, id, kind, prefix, enabled)
    }

    /// Like [`Entity::new`] but with an explicit id, for names whose
    /// derived id is already taken.
    pub fn with_id(name: impl Into<String>, id: impl Into<String>, kind: EntityKind, prefix: &str, enabled: bool) -> Self {
        let name = name.into();
        let id = id.into();
        let base = format!("{}/{}", prefix, id);
        let command_topic = match kind {
            EntityKind::Switch => Some(format!("{}/set", base)),
            EntityKind::Button => Some(format!("{}/press", base)),
            EntityKind::Sensor => None,
        };

        Self {
            config_topic: format!("{}/{}/{}/config", prefix, kind, id),
            state_topic: format!("{}/state", base),
            command_topic,
            name,
            id,
            kind,
            enabled,
        }
    }

    pub fn discovery_config<'a>(&'a self, device: &'a DeviceDescriptor) -> DiscoveryConfig<'a> {
        let mut config = DiscoveryConfig {
            name: &self.name,
            unique_id: &self.id,
            device,
            state_topic: None,
            command_topic: None,
            payload_on: None,
            payload_off: None,
            payload_press: None,
        };

        match self.kind {
            EntityKind::Switch => {
                config.state_topic = Some(&self.state_topic);
                config.command_topic = self.command_topic.as_deref();
                config.payload_on = Some(PAYLOAD_ON);
                config.payload_off = Some(PAYLOAD_OFF);
            }
            EntityKind::Button => {
                config.command_topic = self.command_topic.as_deref();
                config.payload_press = Some(PAYLOAD_PRESS);
            }
            EntityKind::Sensor => {
                config.state_topic = Some(&self.state_topic);
            }
        }

        config
    }

    /// Discovery document as JSON.
    pub fn discovery_payload(&self, device: &DeviceDescriptor) -> Result<String, BridgeError> {
        serde_json::to_string(&self.discovery_config(device)).map_err(|e| BridgeError::Json {
            context: format!("discovery config for {}", self.id),
            source: e,
        })
    }

    /// Publish the retained discovery document. Best effort.
    pub fn publish_discovery(&self, transport: &dyn Transport, device: &DeviceDescriptor) -> bool {
        let payload = match self.discovery_payload(device) {
            Ok(p) => p,
            Err(e) => {
                warn!("{}", e);
                return false;
            }
        };

        match transport.publish(&self.config_topic, &payload, true) {
            Ok(()) => {
                info!(entity = %self.id, kind = %self.kind, "published discovery");
                debug!(%payload);
                true
            }
            Err(e) => {
                warn!(entity = %self.id, "discovery publish failed: {}", e);
                false
            }
        }
    }

    /// Update a switch's state, publishing only on change unless forced.
    ///
    /// Returns whether a state message was sent.
    pub fn set_state(&mut self, transport: &dyn Transport, enabled: bool, force: bool) -> bool {
        if self.kind != EntityKind::Switch {
            return false;
        }
        if self.enabled == enabled && !force {
            return false;
        }

        self.enabled = enabled;
        let payload = state_payload(enabled);
        info!(entity = %self.id, state = payload, "switch state");
        self.publish_state(transport, payload)
    }

    /// Publish a raw retained state payload. Best effort.
    pub fn publish_state(&self, transport: &dyn Transport, payload: &str) -> bool {
        match transport.publish(&self.state_topic, payload, true) {
            Ok(()) => true,
            Err(e) => {
                warn!(entity = %self.id, "state publish failed: {}", e);
                false
            }
        }
    }
}
