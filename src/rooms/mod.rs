pub mod extract;
pub mod manager;
pub mod normalize;
