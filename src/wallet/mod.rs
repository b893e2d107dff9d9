//! User wallets and key custody

pub mod create;
pub mod vault;

pub use create::*;
pub use vault::*;
