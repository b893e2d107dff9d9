//! Durable storage

pub mod settlement;
pub mod store;

pub use settlement::*;
pub use store::*;
