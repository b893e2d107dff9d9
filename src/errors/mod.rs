//! Error handling

pub mod grid_error;

pub use grid_error::*;
