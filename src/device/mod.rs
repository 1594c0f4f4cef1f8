pub mod adb;
pub mod controller;
pub mod driver;
pub mod snapshot;
