//! Local cache: a durable mirror of the remote tables.
//!
//! This module provides a backend-agnostic snapshot cache that:
//! - Keeps the last-known orders, menu and categories as JSON snapshots
//! - Seeds default menu and categories on first use
//! - Applies row-level CRUD synchronously so the UI never waits on the network
//! - Remembers the last customer display name

mod local;
mod storage;

pub use local::{LocalCache, Table};
pub use storage::{KeyValueStore, MemoryStorage, SqliteStorage};
