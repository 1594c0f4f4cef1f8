use std::fmt;

use serde::{Deserialize, Serialize};

/// Named screens of the vacuum app (plus the phone screens around it).
///
/// `None` is the "could not classify" sentinel, never a real screen.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum PageId {
    ScreenOff,
    Lock,
    Desktop,
    Main,
    Scenario,
    Robot,
    RobotSettings,
    Station,
    StationAdvanced,
    Warning,
    None,
}

impl PageId {
    pub fn as_str(self) -> &'static str {
        match self {
            PageId::ScreenOff => "ScreenOff",
            PageId::Lock => "Lock",
            PageId::Desktop => "Desktop",
            PageId::Main => "Main",
            PageId::Scenario => "Scenario",
            PageId::Robot => "Robot",
            PageId::RobotSettings => "RobotSettings",
            PageId::Station => "Station",
            PageId::StationAdvanced => "StationAdvanced",
            PageId::Warning => "Warning",
            PageId::None => "None",
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
