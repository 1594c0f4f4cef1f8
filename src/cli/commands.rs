use std::fmt::Write as _;

use tracing::info;

use crate::cli::config::AppConfig;
use crate::device::adb::AdbDriver;
use crate::device::controller::DeviceController;
use crate::error::BridgeError;
use crate::navigation::classifier::PageClassifier;
use crate::navigation::graph::NavGraph;
use crate::navigation::navigator::{NavOutcome, Navigator};
use crate::navigation::page::PageId;
use crate::rooms::extract::{Room, extract_rooms};

// ============================================================================
// Helpers
// ============================================================================

/// Controller over the configured adb device.
pub fn open_device(config: &AppConfig) -> DeviceController {
    DeviceController::new(Box::new(AdbDriver::new(config.device.serial.clone())))
}

pub fn build_navigator(config: &AppConfig) -> Navigator {
    let timing = config.timing.to_timing();
    Navigator::new(
        PageClassifier::new(timing.detect_retries, timing.detect_delay),
        NavGraph::vacuum_app(),
        config.device.unlock_pin.clone(),
        timing.max_nav_steps,
    )
}

/// One line per hop, `from -> to`. Empty input means "already there".
pub fn format_path(from: PageId, to: PageId, path: Option<&[(PageId, PageId)]>) -> String {
    let Some(path) = path else {
        return format!("No route from {} to {}\n", from, to);
    };
    if path.is_empty() {
        return format!("Already on {}\n", to);
    }

    let mut out = format!("{} hop(s) from {} to {}:\n", path.len(), from, to);
    for (i, (src, dst)) in path.iter().enumerate() {
        let _ = writeln!(out, "  {}. {} -> {}", i + 1, src, dst);
    }
    out
}

/// Table of rooms: state marker, display name, selection signal.
pub fn format_rooms(rooms: &[Room<'_>]) -> String {
    if rooms.is_empty() {
        return "No rooms found\n".to_string();
    }

    let mut out = String::new();
    for room in rooms {
        let _ = writeln!(
            out,
            "[{}] {} ({})",
            if room.enabled { "x" } else { " " },
            room.name,
            room.signal.unwrap_or("unselected")
        );
    }
    out
}

// ============================================================================
// detect subcommand
// ============================================================================

pub fn cmd_detect(config: &AppConfig) -> Result<(), BridgeError> {
    let mut device = open_device(config);
    let page = build_navigator(config).detect_current_page(&mut device);
    println!("{}", page);
    Ok(())
}

// ============================================================================
// navigate subcommand
// ============================================================================

/// Navigate and report. Returns whether the page was reached.
pub fn cmd_navigate(config: &AppConfig, page: PageId) -> Result<bool, BridgeError> {
    let mut device = open_device(config);
    let outcome = build_navigator(config).navigate_to(&mut device, page);

    match outcome {
        NavOutcome::AlreadyThere => println!("Already on {}", page),
        NavOutcome::Arrived { hops } => println!("Reached {} in {} hop(s)", page, hops),
        NavOutcome::Unreachable { from } => println!("No route from {} to {}", from, page),
        NavOutcome::GaveUp { last } => println!("Gave up on {}; last seen {}", page, last),
    }
    Ok(outcome.reached())
}

// ============================================================================
// path subcommand
// ============================================================================

pub fn cmd_path(from: PageId, to: PageId) {
    let graph = NavGraph::vacuum_app();
    let path = graph.find_path(from, to);
    print!("{}", format_path(from, to, path.as_deref()));
}

// ============================================================================
// rooms subcommand
// ============================================================================

pub fn cmd_rooms(config: &AppConfig) -> Result<(), BridgeError> {
    let mut device = open_device(config);
    let navigator = build_navigator(config);
    let outcome = navigator.navigate_to(&mut device, PageId::Robot);
    if !outcome.reached() {
        info!(?outcome, "map page not reached; listing whatever is on screen");
    }

    let snapshot = device.capture()?;
    let rooms = extract_rooms(&snapshot);
    print!("{}", format_rooms(&rooms));
    Ok(())
}

// ============================================================================
// screenshot subcommand
// ============================================================================

pub fn cmd_screenshot(config: &AppConfig, output: &str) -> Result<(), BridgeError> {
    let mut device = open_device(config);
    let png = device.screenshot()?;
    std::fs::write(output, &png)?;
    println!("Wrote {} bytes to {}", png.len(), output);
    Ok(())
}
