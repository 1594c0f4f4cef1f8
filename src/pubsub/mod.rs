pub mod context;
pub mod entity;
pub mod mqtt;
