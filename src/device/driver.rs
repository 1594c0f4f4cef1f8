use std::time::Duration;

use crate::error::BridgeError;

/// Hardware keys the navigator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Home,
    Back,
}

impl Key {
    pub fn keycode(self) -> &'static str {
        match self {
            Key::Home => "KEYCODE_HOME",
            Key::Back => "KEYCODE_BACK",
        }
    }
}

/// Capability set of the physical (or emulated) phone.
///
/// Coordinates where both axes are `<= 1.0` are fractions of the screen
/// size; anything larger is an absolute pixel position.
pub trait DeviceDriver: Send {
    /// Serialized accessibility tree of the current screen.
    fn dump_hierarchy(&mut self) -> Result<String, BridgeError>;

    fn is_screen_on(&mut self) -> Result<bool, BridgeError>;

    fn tap(&mut self, x: f64, y: f64) -> Result<(), BridgeError>;

    fn double_tap(&mut self, x: f64, y: f64, interval: Duration) -> Result<(), BridgeError>;

    fn swipe(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        duration: Duration,
    ) -> Result<(), BridgeError>;

    fn drag(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        duration: Duration,
    ) -> Result<(), BridgeError>;

    fn press(&mut self, key: Key) -> Result<(), BridgeError>;

    fn screen_on(&mut self) -> Result<(), BridgeError>;

    /// PNG-encoded screen capture.
    fn screenshot(&mut self) -> Result<Vec<u8>, BridgeError>;
}
