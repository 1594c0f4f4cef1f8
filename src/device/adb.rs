use std::process::Command;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, trace};

use crate::device::driver::{DeviceDriver, Key};
use crate::error::BridgeError;

const HIERARCHY_END: &str = "</hierarchy>";

/// `DeviceDriver` backed by the `adb` command line tool.
///
/// Every call spawns one `adb` process; there is no persistent connection
/// to keep alive between tasks.
pub struct AdbDriver {
    serial: Option<String>,
    screen_size: Option<(u32, u32)>,
}

impl AdbDriver {
    pub fn new(serial: Option<String>) -> Self {
        Self {
            serial,
            screen_size: None,
        }
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, BridgeError> {
        let mut cmd = Command::new("adb");
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args);
        trace!(?args, "adb");

        let output = cmd.output().map_err(|e| BridgeError::Spawn {
            program: "adb".into(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(BridgeError::CommandFailed {
                program: format!("adb {}", args.join(" ")),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    fn shell(&self, args: &[&str]) -> Result<String, BridgeError> {
        let mut full = vec!["shell"];
        full.extend_from_slice(args);
        let out = self.run(&full)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn screen_size(&mut self) -> Result<(u32, u32), BridgeError> {
        if let Some(size) = self.screen_size {
            return Ok(size);
        }
        let out = self.shell(&["wm", "size"])?;
        let size = parse_wm_size(&out)
            .ok_or_else(|| BridgeError::DeviceOutput(format!("wm size: {}", out.trim())))?;
        debug!(width = size.0, height = size.1, "screen size");
        self.screen_size = Some(size);
        Ok(size)
    }

    /// Resolve fractional coordinates to pixels.
    fn to_pixels(&mut self, x: f64, y: f64) -> Result<(i64, i64), BridgeError> {
        if x <= 1.0 && y <= 1.0 {
            let (w, h) = self.screen_size()?;
            Ok(((x * w as f64).round() as i64, (y * h as f64).round() as i64))
        } else {
            Ok((x.round() as i64, y.round() as i64))
        }
    }

    fn input_swipe(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        duration: Duration,
    ) -> Result<(), BridgeError> {
        let (x1, y1) = self.to_pixels(from.0, from.1)?;
        let (x2, y2) = self.to_pixels(to.0, to.1)?;
        self.shell(&[
            "input",
            "swipe",
            &x1.to_string(),
            &y1.to_string(),
            &x2.to_string(),
            &y2.to_string(),
            &duration.as_millis().max(1).to_string(),
        ])?;
        Ok(())
    }
}

impl DeviceDriver for AdbDriver {
    fn dump_hierarchy(&mut self) -> Result<String, BridgeError> {
        let out = self.run(&["exec-out", "uiautomator", "dump", "/dev/tty"])?;
        let text = String::from_utf8_lossy(&out);
        // uiautomator appends a status line after the document
        match text.rfind(HIERARCHY_END) {
            Some(end) => Ok(text[..end + HIERARCHY_END.len()].to_string()),
            None => Err(BridgeError::DeviceOutput(format!(
                "uiautomator dump returned no hierarchy: {}",
                text.trim()
            ))),
        }
    }

    fn is_screen_on(&mut self) -> Result<bool, BridgeError> {
        let out = self.shell(&["dumpsys", "power"])?;
        Ok(out.contains("mWakefulness=Awake") || out.contains("Display Power: state=ON"))
    }

    fn tap(&mut self, x: f64, y: f64) -> Result<(), BridgeError> {
        let (px, py) = self.to_pixels(x, y)?;
        self.shell(&["input", "tap", &px.to_string(), &py.to_string()])?;
        Ok(())
    }

    fn double_tap(&mut self, x: f64, y: f64, interval: Duration) -> Result<(), BridgeError> {
        self.tap(x, y)?;
        thread::sleep(interval);
        self.tap(x, y)
    }

    fn swipe(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        duration: Duration,
    ) -> Result<(), BridgeError> {
        self.input_swipe(from, to, duration)
    }

    /// `input swipe` with the gesture duration doubles as a drag; the
    /// `draganddrop` input command is missing on older Android builds.
    fn drag(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        duration: Duration,
    ) -> Result<(), BridgeError> {
        self.input_swipe(from, to, duration)
    }

    fn press(&mut self, key: Key) -> Result<(), BridgeError> {
        self.shell(&["input", "keyevent", key.keycode()])?;
        Ok(())
    }

    fn screen_on(&mut self) -> Result<(), BridgeError> {
        self.shell(&["input", "keyevent", "KEYCODE_WAKEUP"])?;
        Ok(())
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, BridgeError> {
        self.run(&["exec-out", "screencap", "-p"])
    }
}

/// Parse `wm size` output. An override size, printed after the physical
/// size, takes precedence.
pub fn parse_wm_size(output: &str) -> Option<(u32, u32)> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"(\d+)x(\d+)").expect("valid regex"));

    pattern.captures_iter(output).last().and_then(|c| {
        let w = c.get(1)?.as_str().parse().ok()?;
        let h = c.get(2)?.as_str().parse().ok()?;
        Some((w, h))
    })
}
