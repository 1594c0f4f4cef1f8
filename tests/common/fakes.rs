use std::sync::{Arc, Mutex};
use std::time::Duration;

use vacuum_bridge::device::driver::{DeviceDriver, Key};
use vacuum_bridge::error::BridgeError;
use vacuum_bridge::pubsub::context::Transport;

// ============================================================================
// Scripted device
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Tap(f64, f64),
    DoubleTap(f64, f64),
    Swipe((f64, f64), (f64, f64)),
    Drag((f64, f64), (f64, f64)),
    Press(Key),
    ScreenOn,
}

/// One step of the script: what the device shows until the next gesture.
#[derive(Debug, Clone)]
pub struct Screen {
    pub xml: String,
    pub screen_on: bool,
}

impl Screen {
    pub fn on(xml: impl Into<String>) -> Self {
        Self {
            xml: xml.into(),
            screen_on: true,
        }
    }

    pub fn off() -> Self {
        Self {
            xml: crate::common::utils::hierarchy(""),
            screen_on: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct DriverLog {
    pub gestures: Vec<Gesture>,
    pub dumps: usize,
    pub position: usize,
}

/// In-memory device. Every gesture is recorded and moves the script one
/// screen forward; the last screen stays up once the script runs out.
pub struct ScriptedDriver {
    screens: Vec<Screen>,
    log: Arc<Mutex<DriverLog>>,
}

impl ScriptedDriver {
    pub fn new(screens: Vec<Screen>) -> Self {
        assert!(!screens.is_empty(), "script needs at least one screen");
        Self {
            screens,
            log: Arc::new(Mutex::new(DriverLog::default())),
        }
    }

    /// Scripted driver showing the given XML screens with the panel on.
    pub fn pages(pages: &[String]) -> Self {
        Self::new(pages.iter().map(|p| Screen::on(p.clone())).collect())
    }

    pub fn log(&self) -> Arc<Mutex<DriverLog>> {
        Arc::clone(&self.log)
    }

    fn screen(&self) -> &Screen {
        let pos = self.log.lock().unwrap().position;
        &self.screens[pos.min(self.screens.len() - 1)]
    }

    fn record(&mut self, gesture: Gesture) -> Result<(), BridgeError> {
        let mut log = self.log.lock().unwrap();
        log.gestures.push(gesture);
        if log.position + 1 < self.screens.len() {
            log.position += 1;
        }
        Ok(())
    }
}

impl DeviceDriver for ScriptedDriver {
    fn dump_hierarchy(&mut self) -> Result<String, BridgeError> {
        let xml = self.screen().xml.clone();
        self.log.lock().unwrap().dumps += 1;
        Ok(xml)
    }

    fn is_screen_on(&mut self) -> Result<bool, BridgeError> {
        Ok(self.screen().screen_on)
    }

    fn tap(&mut self, x: f64, y: f64) -> Result<(), BridgeError> {
        self.record(Gesture::Tap(x, y))
    }

    fn double_tap(&mut self, x: f64, y: f64, _interval: Duration) -> Result<(), BridgeError> {
        self.record(Gesture::DoubleTap(x, y))
    }

    fn swipe(&mut self, from: (f64, f64), to: (f64, f64), _duration: Duration) -> Result<(), BridgeError> {
        self.record(Gesture::Swipe(from, to))
    }

    fn drag(&mut self, from: (f64, f64), to: (f64, f64), _duration: Duration) -> Result<(), BridgeError> {
        self.record(Gesture::Drag(from, to))
    }

    fn press(&mut self, key: Key) -> Result<(), BridgeError> {
        self.record(Gesture::Press(key))
    }

    fn screen_on(&mut self) -> Result<(), BridgeError> {
        self.record(Gesture::ScreenOn)
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, BridgeError> {
        Ok(b"\x89PNG".to_vec())
    }
}

pub fn gestures(log: &Arc<Mutex<DriverLog>>) -> Vec<Gesture> {
    log.lock().unwrap().gestures.clone()
}

pub fn dumps(log: &Arc<Mutex<DriverLog>>) -> usize {
    log.lock().unwrap().dumps
}

// ============================================================================
// Recording transport
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Default)]
pub struct RecordingTransport {
    published: Mutex<Vec<Published>>,
    subscribed: Mutex<Vec<String>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().unwrap().clone()
    }

    /// Payloads published to `topic`, oldest first.
    pub fn payloads(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload)
            .collect()
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
        self.subscribed.lock().unwrap().clear();
    }
}

impl Transport for RecordingTransport {
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), BridgeError> {
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<(), BridgeError> {
        self.subscribed.lock().unwrap().push(topic.to_string());
        Ok(())
    }
}

/// Transport whose broker is always unreachable.
pub struct FailingTransport;

impl Transport for FailingTransport {
    fn publish(&self, topic: &str, _payload: &str, _retain: bool) -> Result<(), BridgeError> {
        Err(BridgeError::Transport(format!("broker down, cannot publish {}", topic)))
    }

    fn subscribe(&self, topic: &str) -> Result<(), BridgeError> {
        Err(BridgeError::Transport(format!("broker down, cannot subscribe {}", topic)))
    }
}
