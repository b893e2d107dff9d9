//! Utility functions and helpers

pub mod display;
pub mod links;
pub mod logging;

pub use display::*;
pub use links::*;
pub use logging::*;
