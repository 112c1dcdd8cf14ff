// Application layer: the service that owns the ledger and its store,
// plus read-only reports built from ledger state.

pub mod error;
pub mod reporting;
pub mod service;

pub use error::*;
pub use reporting::*;
pub use service::*;
