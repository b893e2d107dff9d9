//! EVM helpers: unit conversion, ERC-20 ABI, transfer logs, token metadata, signing

pub mod abi;
pub mod logs;
pub mod token_meta;
pub mod tx;
pub mod units;

pub use abi::*;
pub use logs::*;
pub use token_meta::*;
pub use tx::*;
pub use units::*;
