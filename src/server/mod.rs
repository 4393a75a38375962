//! Network listener and process lifecycle.

pub mod listener;
pub mod shutdown;

pub use shutdown::{ShutdownController, ShutdownSignal};
