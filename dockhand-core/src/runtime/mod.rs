//! Process runtime helpers

pub mod shutdown;

pub use shutdown::ShutdownSignal;
