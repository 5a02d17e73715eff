//! Order persistence interface.
//!
//! The trigger core treats storage as an external collaborator reached
//! through the `OrderStore` trait. `MemoryOrderStore` backs tests and
//! standalone runs; a database-backed implementation lives with the
//! surrounding application, not here.

pub mod error;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryOrderStore;
pub use store::OrderStore;
