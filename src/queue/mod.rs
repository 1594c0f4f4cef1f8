pub mod command_queue;
pub mod timer;
