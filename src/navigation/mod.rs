pub mod classifier;
pub mod graph;
pub mod navigator;
pub mod page;
