//! Offline-first sync of team activity records.
//!
//! [`TeamSession`] applies foreground edits and persists them before
//! anything touches the network; [`SyncEngine`] pushes pending teams to the
//! collector in the background and keeps them pending until the server has
//! accepted exactly what is stored.

pub mod collector;
pub mod config;
pub mod error;
pub mod health;
pub mod scheduler;
pub mod session;
pub mod sync;

pub use collector::Collector;
pub use error::SyncError;
pub use session::{SessionError, TeamSession};
pub use sync::{SyncEngine, SyncReport};
