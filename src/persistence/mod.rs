//! The `persistence` module keeps on-disk snapshots of every topic backlog
//! and queue FIFO so that undelivered messages survive a restart.
//!
//! Each (mode, name) pair owns one JSON file that is replaced wholesale
//! after every mutation of that topic or queue.

pub mod snapshot_store;

pub use snapshot_store::{Snapshot, SnapshotStore};
