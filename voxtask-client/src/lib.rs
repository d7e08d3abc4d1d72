pub mod cache;
pub mod config;
pub mod database;
pub mod errors;
pub mod offline_queue;
pub mod queries;
pub mod remote;
pub mod session;
pub mod sync_engine;

pub use cache::LocalCache;
pub use config::ClientConfig;
pub use database::ClientDatabase;
pub use errors::{ClientError, ClientResult};
pub use offline_queue::OfflineQueue;
pub use remote::{HttpRemote, TaskRemote};
pub use session::Session;
pub use sync_engine::{HaltReason, SyncEngine, SyncReport};
