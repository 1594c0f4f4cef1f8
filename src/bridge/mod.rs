pub mod actions;
pub mod bridge;
pub mod commands;
pub mod status;
