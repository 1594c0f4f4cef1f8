use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::device::driver::{DeviceDriver, Key};
use crate::device::snapshot::{Node, Snapshot, TextMatch};
use crate::error::BridgeError;

/// Owns the device handle and the cached snapshot of the current screen.
///
/// Every gesture drops the cached snapshot afterwards, whether or not the
/// gesture succeeded. Callers that need fresh data after a gesture must
/// go through [`current`](Self::current) or [`capture`](Self::capture) again.
pub struct DeviceController {
    driver: Box<dyn DeviceDriver>,
    cache: Option<Arc<Snapshot>>,
}

impl DeviceController {
    pub fn new(driver: Box<dyn DeviceDriver>) -> Self {
        Self {
            driver,
            cache: None,
        }
    }

    // ------------------------------------------------------------------
    // Snapshot cache
    // ------------------------------------------------------------------

    /// Take a fresh snapshot and install it as current.
    pub fn capture(&mut self) -> Result<Arc<Snapshot>, BridgeError> {
        let xml = self.driver.dump_hierarchy()?;
        let snapshot = Arc::new(Snapshot::parse(&xml)?);
        self.cache = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Cached snapshot, capturing lazily when nothing is cached.
    pub fn current(&mut self) -> Result<Arc<Snapshot>, BridgeError> {
        match &self.cache {
            Some(snapshot) => Ok(Arc::clone(snapshot)),
            None => self.capture(),
        }
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    pub fn find_by_text(&mut self, text: &str, mode: TextMatch) -> Result<Option<Node>, BridgeError> {
        Ok(self.current()?.find_by_text(text, mode).cloned())
    }

    pub fn find_by_desc(&mut self, desc: &str, mode: TextMatch) -> Result<Option<Node>, BridgeError> {
        Ok(self.current()?.find_by_desc(desc, mode).cloned())
    }

    pub fn is_screen_on(&mut self) -> Result<bool, BridgeError> {
        self.driver.is_screen_on()
    }

    // ------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------

    /// Tap the centre of `node`.
    ///
    /// Returns `Ok(false)` without touching the device when the node is
    /// missing or its bounds do not parse.
    pub fn tap(&mut self, node: Option<&Node>) -> Result<bool, BridgeError> {
        let Some(node) = node else {
            debug!("tap skipped: element not found");
            return Ok(false);
        };

        let bounds = match node.parse_bounds() {
            Ok(b) => b,
            Err(e) => {
                warn!(text = %node.text, "tap skipped: {}", e);
                return Ok(false);
            }
        };

        let (x, y) = bounds.center();
        self.tap_point(x, y)?;
        Ok(true)
    }

    pub fn tap_text(&mut self, text: &str, mode: TextMatch) -> Result<bool, BridgeError> {
        let snapshot = self.current()?;
        self.tap(snapshot.find_by_text(text, mode))
    }

    pub fn tap_desc(&mut self, desc: &str, mode: TextMatch) -> Result<bool, BridgeError> {
        let snapshot = self.current()?;
        self.tap(snapshot.find_by_desc(desc, mode))
    }

    /// Tap raw coordinates (pixels, or fractions of the screen).
    pub fn tap_point(&mut self, x: f64, y: f64) -> Result<(), BridgeError> {
        debug!(x, y, "tap");
        let result = self.driver.tap(x, y);
        self.invalidate();
        result
    }

    pub fn double_tap(&mut self, x: f64, y: f64, interval: Duration) -> Result<(), BridgeError> {
        let result = self.driver.double_tap(x, y, interval);
        self.invalidate();
        result
    }

    pub fn swipe(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        duration: Duration,
    ) -> Result<(), BridgeError> {
        let result = self.driver.swipe(from, to, duration);
        self.invalidate();
        result
    }

    pub fn drag(
        &mut self,
        from: (f64, f64),
        to: (f64, f64),
        duration: Duration,
    ) -> Result<(), BridgeError> {
        let result = self.driver.drag(from, to, duration);
        self.invalidate();
        result
    }

    pub fn press(&mut self, key: Key) -> Result<(), BridgeError> {
        debug!(?key, "press");
        let result = self.driver.press(key);
        self.invalidate();
        result
    }

    pub fn screen_on(&mut self) -> Result<(), BridgeError> {
        let result = self.driver.screen_on();
        self.invalidate();
        result
    }

    /// Screen capture; does not change the screen, so the cache survives.
    pub fn screenshot(&mut self) -> Result<Vec<u8>, BridgeError> {
        self.driver.screenshot()
    }
}
