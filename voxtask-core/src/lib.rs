pub mod errors;
pub mod models;
pub mod pending;
pub mod routes;

pub use errors::{SyncError, SyncResult};
pub use models::*;
pub use pending::*;
