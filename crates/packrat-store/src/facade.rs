//! Tolerant and strict views over one shared [`Store`].
//!
//! Both views implement [`Collection`]; they differ only in how a failed
//! operation reaches the caller. [`Packrat`] answers `None`,
//! [`StrictPackrat`] answers the [`StoreError`](crate::StoreError). Each can
//! produce the other without reopening anything: they share one `Arc<Store>`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use packrat_log::ReplayStats;
use packrat_types::{Id, Item};

use crate::config::StoreConfig;
use crate::error::{ErrorKind, StoreResult};
use crate::store::{Policy, Store};

/// The operation set shared by both facades.
///
/// Every operation is provided in terms of [`store`](Self::store) and
/// [`settle`](Self::settle); implementors only pick the outcome type and the
/// [`Policy`] used for `drop`.
pub trait Collection {
    /// What a fallible operation returns.
    type Outcome<T>;

    /// Drop policy for ids that are not stored.
    const POLICY: Policy;

    fn store(&self) -> &Store;

    /// Turn a store result into this facade's outcome.
    fn settle<T>(&self, result: StoreResult<T>) -> Self::Outcome<T>;

    fn get(&self, id: impl Into<Id>) -> Self::Outcome<Item> {
        let id = id.into();
        self.settle(self.store().get(&id))
    }

    fn set(&self, item: Value) -> Self::Outcome<Item> {
        self.settle(self.store().set(item))
    }

    fn add(&self, item: Value) -> Self::Outcome<Item> {
        self.settle(self.store().add(item))
    }

    fn update(&self, item: Value) -> Self::Outcome<Item> {
        self.settle(self.store().update(item))
    }

    /// Remove an item, returning it.
    fn drop(&self, id: impl Into<Id>) -> Self::Outcome<Item> {
        let id = id.into();
        self.settle(self.store().drop(&id, Self::POLICY))
    }

    fn find<P>(&self, predicate: P) -> Option<Item>
    where
        P: FnMut(&Item) -> bool,
    {
        self.store().find(predicate)
    }

    /// Run a slice algorithm over every item, in enumeration order. Extra
    /// arguments travel in the closure.
    fn as_array<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[Item]) -> R,
    {
        self.store().as_array(f)
    }

    fn keys(&self) -> Vec<Id> {
        self.store().keys()
    }

    fn values(&self) -> Vec<Item> {
        self.store().values()
    }

    fn entries(&self) -> Vec<(Id, Item)> {
        self.store().entries()
    }

    fn len(&self) -> usize {
        self.store().len()
    }

    fn is_empty(&self) -> bool {
        self.store().is_empty()
    }

    fn clear(&self) {
        self.store().clear()
    }

    fn path(&self) -> Option<PathBuf> {
        self.store().path()
    }

    fn load(&self, path: impl AsRef<Path>) -> impl Future<Output = Self::Outcome<ReplayStats>> + Send
    where
        Self: Sync,
    {
        let path = path.as_ref().to_path_buf();
        async move { self.settle(self.store().load(&path).await) }
    }

    fn save(&self) -> impl Future<Output = Self::Outcome<()>> + Send
    where
        Self: Sync,
    {
        async move { self.settle(self.store().save().await) }
    }

    fn save_as(&self, path: impl AsRef<Path>) -> impl Future<Output = Self::Outcome<()>> + Send
    where
        Self: Sync,
    {
        let path = path.as_ref().to_path_buf();
        async move { self.settle(self.store().save_as(&path).await) }
    }

    /// Wait for every queued log append to be written.
    fn flush(&self) -> impl Future<Output = ()> + Send
    where
        Self: Sync,
    {
        self.store().flush()
    }
}

// ---------------------------------------------------------------------------
// Tolerant view
// ---------------------------------------------------------------------------

/// Store handle that reports failures as `None`.
///
/// Rejected input leaves no trace in the store. Rejections are logged at
/// `debug`, file and I/O failures at `warn`.
#[derive(Clone)]
pub struct Packrat {
    store: Arc<Store>,
}

impl Packrat {
    /// An empty store with no backing file.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            store: Arc::new(Store::with_config(config)),
        }
    }

    /// Load `path` into a new store. Always reports errors, so a corrupt
    /// log reaches the caller instead of yielding an empty store.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_config(path, StoreConfig::default()).await
    }

    pub async fn open_with_config(path: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let packrat = Self::with_config(config);
        packrat.store.load(path).await?;
        Ok(packrat)
    }

    /// The strict view of this store.
    pub fn strict(&self) -> StrictPackrat {
        StrictPackrat {
            store: Arc::clone(&self.store),
        }
    }

    pub fn tolerant(&self) -> Packrat {
        self.clone()
    }

    /// `true` if both handles share one store.
    pub fn same_store(&self, other: &StrictPackrat) -> bool {
        Arc::ptr_eq(&self.store, &other.store)
    }
}

impl Default for Packrat {
    fn default() -> Self {
        Self::new()
    }
}

impl Collection for Packrat {
    type Outcome<T> = Option<T>;

    const POLICY: Policy = Policy::Tolerant;

    fn store(&self) -> &Store {
        &self.store
    }

    fn settle<T>(&self, result: StoreResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                match e.kind() {
                    ErrorKind::File | ErrorKind::Log => warn!(error = %e, "operation failed"),
                    _ => debug!(error = %e, "operation rejected"),
                }
                None
            }
        }
    }
}

impl std::fmt::Debug for Packrat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Packrat").field(&self.store).finish()
    }
}

// ---------------------------------------------------------------------------
// Strict view
// ---------------------------------------------------------------------------

/// Store handle that reports failures as [`StoreError`](crate::StoreError).
///
/// Validation runs before any mutation, so an error means the store and its
/// log are unchanged.
#[derive(Clone)]
pub struct StrictPackrat {
    store: Arc<Store>,
}

impl StrictPackrat {
    pub fn new() -> Self {
        Packrat::new().strict()
    }

    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Packrat::open(path).await?.strict())
    }

    /// The tolerant view of this store.
    pub fn tolerant(&self) -> Packrat {
        Packrat {
            store: Arc::clone(&self.store),
        }
    }

    pub fn strict(&self) -> StrictPackrat {
        self.clone()
    }
}

impl Default for StrictPackrat {
    fn default() -> Self {
        Self::new()
    }
}

impl Collection for StrictPackrat {
    type Outcome<T> = StoreResult<T>;

    const POLICY: Policy = Policy::Strict;

    fn store(&self) -> &Store {
        &self.store
    }

    fn settle<T>(&self, result: StoreResult<T>) -> StoreResult<T> {
        result
    }
}

impl std::fmt::Debug for StrictPackrat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StrictPackrat").field(&self.store).finish()
    }
}

impl From<Packrat> for StrictPackrat {
    fn from(packrat: Packrat) -> Self {
        Self {
            store: packrat.store,
        }
    }
}

impl From<StrictPackrat> for Packrat {
    fn from(strict: StrictPackrat) -> Self {
        Self {
            store: strict.store,
        }
    }
}
