//! Core data types and structures

pub mod account;
pub mod chain;
pub mod grid;
pub mod nonce;
pub mod order;
pub mod settings;

pub use account::*;
pub use chain::*;
pub use grid::*;
pub use nonce::*;
pub use order::*;
pub use settings::*;
