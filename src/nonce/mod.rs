//! Per-account transaction sequencing

pub mod manager;

pub use manager::*;
