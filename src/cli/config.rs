use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::bridge::bridge::Timing;
use crate::navigation::page::PageId;
use crate::pubsub::mqtt::BrokerSettings;

pub const DEFAULT_CONFIG_PATH: &str = "vacuum-bridge.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "vacuum-bridge",
    version,
    about = "Drives a robot vacuum's Android app and mirrors it to an MQTT broker"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: vacuum-bridge.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// adb device serial (overrides the config file)
    #[arg(long, global = true)]
    pub serial: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge: publish entities and serve commands
    Run,

    /// Print the page currently on screen
    Detect,

    /// Navigate the app to a page
    Navigate {
        #[arg(long, value_enum)]
        page: PageId,
    },

    /// Print the planned route between two pages (no device needed)
    Path {
        #[arg(long, value_enum)]
        from: PageId,

        #[arg(long, value_enum)]
        to: PageId,
    },

    /// List the rooms found on the map page
    Rooms,

    /// Save a PNG screenshot of the device
    Screenshot {
        #[arg(short, long, default_value = "screen.png")]
        output: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `vacuum-bridge.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub serial: Option<String>,

    #[serde(default)]
    pub unlock_pin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MqttConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default = "default_prefix")]
    pub discovery_prefix: String,

    #[serde(default = "default_device_name")]
    pub device_name: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            discovery_prefix: default_prefix(),
            device_name: default_device_name(),
        }
    }
}

impl MqttConfig {
    pub fn broker_settings(&self) -> BrokerSettings {
        BrokerSettings {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Delays in seconds, retry bounds as counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub detect_retries: u32,
    pub detect_delay: f64,
    pub max_nav_steps: u32,
    pub settle: f64,
    pub room_poll_retries: u32,
    pub room_poll_delay: f64,
    pub refresh_active: f64,
    pub refresh_idle: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        let t = Timing::default();
        Self {
            detect_retries: t.detect_retries,
            detect_delay: t.detect_delay.as_secs_f64(),
            max_nav_steps: t.max_nav_steps,
            settle: t.settle.as_secs_f64(),
            room_poll_retries: t.room_poll_retries,
            room_poll_delay: t.room_poll_delay.as_secs_f64(),
            refresh_active: t.refresh_active.as_secs_f64(),
            refresh_idle: t.refresh_idle.as_secs_f64(),
        }
    }
}

impl TimingConfig {
    pub fn to_timing(&self) -> Timing {
        Timing {
            detect_retries: self.detect_retries,
            detect_delay: secs(self.detect_delay),
            max_nav_steps: self.max_nav_steps,
            settle: secs(self.settle),
            room_poll_retries: self.room_poll_retries,
            room_poll_delay: secs(self.room_poll_delay),
            refresh_active: secs(self.refresh_active),
            refresh_idle: secs(self.refresh_idle),
        }
    }
}

/// Negative, NaN and overflowing values clamp to zero.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

// Serde default helpers
fn default_host() -> String { "localhost".to_string() }
fn default_port() -> u16 { 1883 }
fn default_prefix() -> String { "homeassistant".to_string() }
fn default_device_name() -> String { "Robot Vacuum".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!(path = config_path, "ignoring malformed config: {}", e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

/// Overlay environment variables on top of the file values.
///
/// `lookup` is normally `|k| std::env::var(k).ok()`.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("MQTT_BROKER") {
        config.mqtt.host = v;
    }
    if let Some(v) = lookup("MQTT_PORT") {
        match v.trim().parse() {
            Ok(port) => config.mqtt.port = port,
            Err(_) => warn!(value = %v, "MQTT_PORT is not a port number; keeping {}", config.mqtt.port),
        }
    }
    if let Some(v) = lookup("MQTT_USER") {
        config.mqtt.username = Some(v);
    }
    if let Some(v) = lookup("MQTT_PASSWORD") {
        config.mqtt.password = Some(v);
    }
    if let Some(v) = lookup("DEVICE_NAME") {
        config.mqtt.device_name = v;
    }
    if let Some(v) = lookup("HA_DISCOVERY_PREFIX") {
        config.mqtt.discovery_prefix = v;
    }
    if let Some(v) = lookup("ANDROID_PASSWORD") {
        config.device.unlock_pin = v;
    }
}
