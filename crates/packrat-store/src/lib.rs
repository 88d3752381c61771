//! The Packrat item store.
//!
//! A [`Store`] keeps JSON items in memory, keyed by [`Id`] and enumerated in
//! insertion order. When a backing file is set (by [`Store::load`] or
//! [`Store::save_as`]) every mutation is also appended to its transaction
//! log, and [`Store::save`] compacts the file down to the live items.
//!
//! # Facades
//!
//! Callers normally go through one of two views of a shared store:
//!
//! - [`Packrat`] -- tolerant: failures come back as `None`
//! - [`StrictPackrat`] -- strict: failures come back as [`StoreError`]
//!
//! Both implement [`Collection`], and each can hand out the other.
//!
//! # Design Rules
//!
//! 1. Validation happens before any mutation or log write.
//! 2. Mutations are visible to the next read as soon as they return.
//! 3. Log records are written in mutation order.
//! 4. Auto-assigned ids strictly increase and are never reused.
//! 5. A save waits for every append queued before it.

pub mod config;
pub mod error;
pub mod facade;
pub mod ids;
mod map;
pub mod persist;
pub mod store;

pub use config::StoreConfig;
pub use error::{ErrorKind, StoreError, StoreResult};
pub use facade::{Collection, Packrat, StrictPackrat};
pub use ids::IdAllocator;
pub use store::{Policy, Store};

pub use packrat_log::{LogConfig, ReplayStats, SyncMode};
pub use packrat_types::{Body, Id, Item};
