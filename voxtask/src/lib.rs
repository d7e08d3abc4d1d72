//! VoxTask - offline-first task synchronization
//!
//! This crate provides a unified API over the VoxTask client, server and
//! shared model crates.
//!
//! # Example
//!
//! ```ignore
//! use voxtask::{ClientConfig, Session, SyncEngine, TaskFormData};
//!
//! let engine = SyncEngine::connect(&ClientConfig::from_env()?).await?;
//! let session = Session::authenticated("alice", token);
//! engine.create_task(&session, TaskFormData::new("Buy milk", deadline)).await?;
//! engine.process_sync_queue(&session).await;
//! ```

// Re-export client types
pub use voxtask_client::{
    ClientConfig, ClientDatabase, ClientError, ClientResult, HaltReason, HttpRemote, Session,
    SyncEngine, SyncReport, TaskRemote,
};

// Re-export server types
pub use voxtask_server::{router, AppState as Server};

// Re-export core types that external applications may need
pub use voxtask_core::models::{Task, TaskFormData, TaskStatus, TaskUpdate};
pub use voxtask_core::pending::{PendingAction, PendingOp};
pub use voxtask_core::{SyncError, SyncResult};
