//! Order keeper: settles pending orders from their on-chain outcome

pub mod order_keeper;
pub mod reconcile;

pub use order_keeper::*;
pub use reconcile::*;
