use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tracing::debug;

use packrat_log::{PendingWrites, TransactionLog};
use packrat_types::{Candidate, Id, Item, Record};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::ids::IdAllocator;
use crate::map::ItemMap;

/// How `drop` treats an id that is not stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Log a tombstone anyway and report that nothing was removed.
    Tolerant,
    /// Fail with [`StoreError::ItemNotFound`] before touching the log.
    Strict,
}

/// Everything guarded by the store lock.
pub(crate) struct State {
    pub(crate) items: ItemMap,
    pub(crate) ids: IdAllocator,
    pub(crate) log: Option<TransactionLog>,
}

impl State {
    pub(crate) fn new() -> Self {
        Self {
            items: ItemMap::new(),
            ids: IdAllocator::new(),
            log: None,
        }
    }

    /// Apply one replayed record. Never writes to the log.
    pub(crate) fn apply(&mut self, record: Record) {
        match record {
            Record::Tombstone(id) => {
                self.items.remove(&id);
            }
            Record::Set(item) => {
                self.ids.observe(item.id());
                self.items.upsert(item);
            }
        }
    }

    fn append(&self, record: &Record) {
        if let Some(log) = &self.log {
            log.append(record);
        }
    }

    /// Log `item`, then upsert it.
    fn commit(&mut self, item: Item) -> Item {
        self.append(&Record::Set(item.clone()));
        self.items.upsert(item.clone());
        item
    }
}

/// The in-memory item store shared by both facades.
///
/// Mutations are synchronous: each one validates, takes the write lock,
/// queues its log record, and updates the map before returning, so the
/// change is visible to the next read regardless of when the log write
/// lands. Queuing under the lock keeps log order equal to mutation order.
pub struct Store {
    state: RwLock<State>,
    pending: Arc<PendingWrites>,
    config: StoreConfig,
}

impl Store {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            state: RwLock::new(State::new()),
            pending: Arc::new(PendingWrites::new()),
            config,
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().expect("store lock poisoned")
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().expect("store lock poisoned")
    }

    pub(crate) fn pending(&self) -> &Arc<PendingWrites> {
        &self.pending
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ---- Mutations ----

    /// Insert or overwrite an item, allocating an id if it has none.
    pub fn set(&self, value: Value) -> StoreResult<Item> {
        let mut candidate = Candidate::from_value(value)?;
        let mut state = self.write();
        let id = state.ids.assign(candidate.id.take())?;
        Ok(state.commit(candidate.into_item(id)))
    }

    /// Insert a new item. Fails with [`StoreError::DuplicateId`] if the id is
    /// already stored.
    pub fn add(&self, value: Value) -> StoreResult<Item> {
        let mut candidate = Candidate::from_value(value)?;
        let mut state = self.write();
        let id = state.ids.assign(candidate.id.take())?;
        if state.items.contains(&id) {
            debug!(%id, "add rejected: id exists");
            return Err(StoreError::DuplicateId(id));
        }
        Ok(state.commit(candidate.into_item(id)))
    }

    /// Overwrite an existing item. The item must name its id.
    pub fn update(&self, value: Value) -> StoreResult<Item> {
        let mut candidate = Candidate::from_value(value)?;
        let id = candidate.id.take().ok_or(StoreError::InvalidId)?;
        let mut state = self.write();
        if !state.items.contains(&id) {
            return Err(StoreError::ItemNotFound(id));
        }
        state.ids.observe(&id);
        Ok(state.commit(candidate.into_item(id)))
    }

    /// Remove an item and log a tombstone for it.
    ///
    /// Under [`Policy::Tolerant`] the tombstone is logged even when the id is
    /// absent; the result is then `ItemNotFound` all the same.
    pub fn drop(&self, id: &Id, policy: Policy) -> StoreResult<Item> {
        let mut state = self.write();
        if policy == Policy::Strict && !state.items.contains(id) {
            return Err(StoreError::ItemNotFound(id.clone()));
        }
        state.append(&Record::Tombstone(id.clone()));
        state
            .items
            .remove(id)
            .ok_or_else(|| StoreError::ItemNotFound(id.clone()))
    }

    /// Empty the map and reset the id counter. The backing file and any
    /// queued log writes are left alone.
    pub fn clear(&self) {
        let mut state = self.write();
        state.items.clear();
        state.ids.reset();
        debug!("store cleared");
    }

    // ---- Reads ----

    pub fn get(&self, id: &Id) -> StoreResult<Item> {
        self.read()
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::ItemNotFound(id.clone()))
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.read().items.contains(id)
    }

    /// First item, in enumeration order, matching `predicate`.
    ///
    /// The predicate runs on a copy taken outside the lock, so it may call
    /// back into the store.
    pub fn find<P>(&self, mut predicate: P) -> Option<Item>
    where
        P: FnMut(&Item) -> bool,
    {
        self.values().into_iter().find(|item| predicate(item))
    }

    /// Lend an ordered copy of every item to `f`.
    pub fn as_array<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&[Item]) -> R,
    {
        let items = self.values();
        f(&items)
    }

    pub fn keys(&self) -> Vec<Id> {
        self.read().items.iter().map(|item| item.id().clone()).collect()
    }

    pub fn values(&self) -> Vec<Item> {
        self.read().items.iter().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(Id, Item)> {
        self.read()
            .items
            .iter()
            .map(|item| (item.id().clone(), item.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The integer id the next id-less item would receive, or `None` once
    /// the id space is exhausted.
    pub fn next_id(&self) -> Option<i64> {
        self.read().ids.peek()
    }

    /// Current backing file, if one has been set by load or save-as.
    pub fn path(&self) -> Option<PathBuf> {
        self.read().log.as_ref().map(|log| log.path().to_path_buf())
    }

    /// Log appends queued but not yet written.
    pub fn pending_writes(&self) -> usize {
        self.pending.outstanding()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read();
        f.debug_struct("Store")
            .field("items", &state.items.len())
            .field("next_id", &state.ids.peek())
            .field("log", &state.log)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -----------------------------------------------------------------------
    // set
    // -----------------------------------------------------------------------

    #[test]
    fn set_allocates_sequential_ids() {
        let store = Store::new();
        assert_eq!(store.set(json!({})).unwrap().id(), &Id::from(1));
        assert_eq!(store.set(json!([])).unwrap().id(), &Id::from(2));
        assert_eq!(store.set(json!({"db": null})).unwrap().id(), &Id::from(3));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn set_keeps_supplied_ids() {
        let store = Store::new();
        assert_eq!(store.set(json!({"id": "101"})).unwrap().id(), &Id::from("101"));
        assert_eq!(store.set(json!({"id": 0})).unwrap().id(), &Id::from(0));
        assert_eq!(store.set(json!({"id": 1.0})).unwrap().id(), &Id::from(1));
        assert!(store.get(&Id::from("101")).is_ok());
    }

    #[test]
    fn set_normalizes_negative_zero() {
        let store = Store::new();
        let item = store.set(json!({"id": -0.0})).unwrap();
        assert_eq!(item.id(), &Id::from(0));
        assert_eq!(store.keys(), vec![Id::from(0)]);
    }

    #[test]
    fn set_overwrites() {
        let store = Store::new();
        store.set(json!({"id": 4, "v": 1})).unwrap();
        store.set(json!({"id": 4, "v": 2})).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&Id::from(4)).unwrap().field("v"), Some(json!(2)));
    }

    #[test]
    fn set_rejects_non_containers_without_trace() {
        let store = Store::new();
        for value in [json!("string"), json!(1), json!(false), json!(null)] {
            assert!(matches!(store.set(value), Err(StoreError::InvalidItem)));
        }
        assert_eq!(store.len(), 0);
        assert_eq!(store.next_id(), Some(1));
    }

    #[test]
    fn set_rejects_bad_ids_without_trace() {
        let store = Store::new();
        for id in [json!(null), json!(1.1), json!([1]), json!(true), json!({})] {
            assert!(matches!(store.set(json!({ "id": id })), Err(StoreError::InvalidId)));
        }
        assert!(store.is_empty());
        assert_eq!(store.next_id(), Some(1));
    }

    #[test]
    fn explicit_integer_ids_advance_the_counter() {
        let store = Store::new();
        store.set(json!({"id": 10})).unwrap();
        assert_eq!(store.set(json!({})).unwrap().id(), &Id::from(11));
        store.set(json!({"id": "50"})).unwrap();
        assert_eq!(store.set(json!({})).unwrap().id(), &Id::from(12));
    }

    #[test]
    fn dropped_ids_are_not_reused() {
        let store = Store::new();
        let first = store.set(json!({})).unwrap();
        store.drop(first.id(), Policy::Strict).unwrap();
        assert_eq!(store.set(json!({})).unwrap().id(), &Id::from(2));
    }

    // -----------------------------------------------------------------------
    // add / update
    // -----------------------------------------------------------------------

    #[test]
    fn add_never_overwrites() {
        let store = Store::new();
        store.add(json!({"id": "a", "v": 1})).unwrap();
        let err = store.add(json!({"id": "a", "v": 2})).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == Id::from("a")));
        assert_eq!(store.get(&Id::from("a")).unwrap().field("v"), Some(json!(1)));
    }

    #[test]
    fn add_allocates_missing_ids() {
        let store = Store::new();
        assert_eq!(store.add(json!({"v": 1})).unwrap().id(), &Id::from(1));
        assert_eq!(store.add(json!([1])).unwrap().id(), &Id::from(2));
    }

    #[test]
    fn update_never_creates() {
        let store = Store::new();
        assert!(matches!(
            store.update(json!({"id": 7})),
            Err(StoreError::ItemNotFound(_))
        ));
        assert!(matches!(store.update(json!({"v": 1})), Err(StoreError::InvalidId)));
        assert!(matches!(store.update(json!([1])), Err(StoreError::InvalidId)));
        assert!(store.is_empty());
        assert_eq!(store.next_id(), Some(1));
    }

    #[test]
    fn update_overwrites_existing() {
        let store = Store::new();
        store.set(json!({"id": 7, "v": 1})).unwrap();
        let updated = store.update(json!({"id": 7, "v": 2})).unwrap();
        assert_eq!(updated.field("v"), Some(json!(2)));
        assert_eq!(store.get(&Id::from(7)).unwrap(), updated);
    }

    // -----------------------------------------------------------------------
    // drop
    // -----------------------------------------------------------------------

    #[test]
    fn drop_removes() {
        let store = Store::new();
        store.set(json!({"id": 1})).unwrap();
        let removed = store.drop(&Id::from(1), Policy::Tolerant).unwrap();
        assert_eq!(removed.id(), &Id::from(1));
        assert!(!store.contains(&Id::from(1)));
    }

    #[test]
    fn drop_absent_reports_not_found() {
        let store = Store::new();
        for policy in [Policy::Tolerant, Policy::Strict] {
            assert!(matches!(
                store.drop(&Id::from(9), policy),
                Err(StoreError::ItemNotFound(_))
            ));
        }
    }

    // -----------------------------------------------------------------------
    // reads
    // -----------------------------------------------------------------------

    #[test]
    fn enumeration_follows_insertion() {
        let store = Store::new();
        store.set(json!({"id": "z"})).unwrap();
        store.set(json!({})).unwrap();
        store.set(json!({"id": "a"})).unwrap();
        assert_eq!(store.keys(), vec![Id::from("z"), Id::from(1), Id::from("a")]);
        let entries = store.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].0, Id::from(1));
        assert_eq!(entries[1].1.id(), &Id::from(1));
        assert_eq!(store.values().len(), 3);
    }

    #[test]
    fn find_returns_first_match() {
        let store = Store::new();
        store.set(json!({"kind": "cat"})).unwrap();
        store.set(json!({"kind": "rat"})).unwrap();
        store.set(json!({"kind": "rat"})).unwrap();
        let found = store
            .find(|item| item.field("kind") == Some(json!("rat")))
            .unwrap();
        assert_eq!(found.id(), &Id::from(2));
        assert!(store.find(|item| item.field("kind") == Some(json!("dog"))).is_none());
    }

    #[test]
    fn find_may_reenter_the_store() {
        let store = Store::new();
        store.set(json!({})).unwrap();
        let found = store.find(|item| store.contains(item.id()));
        assert!(found.is_some());
    }

    #[test]
    fn as_array_lends_ordered_items() {
        let store = Store::new();
        for n in [3, 1, 2] {
            store.set(json!({ "n": n })).unwrap();
        }
        let minimum = 2;
        let mut sorted = store.as_array(|items| {
            items
                .iter()
                .filter_map(|item| item.field("n").and_then(|v| v.as_i64()))
                .filter(|n| *n >= minimum)
                .collect::<Vec<_>>()
        });
        sorted.sort();
        assert_eq!(sorted, vec![2, 3]);
        assert_eq!(store.as_array(|items| items.len()), 3);
    }

    #[test]
    fn clear_resets_items_and_counter() {
        let store = Store::new();
        store.set(json!({})).unwrap();
        store.set(json!({"id": 40})).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.set(json!({})).unwrap().id(), &Id::from(1));
    }

    #[test]
    fn no_backing_file_by_default() {
        let store = Store::new();
        assert!(store.path().is_none());
        store.set(json!({})).unwrap();
        assert_eq!(store.pending_writes(), 0);
    }

    #[test]
    fn exhausted_id_space_never_overwrites() {
        let store = Store::new();
        store.set(json!({"id": i64::MAX, "v": "keep"})).unwrap();
        assert_eq!(store.next_id(), None);

        assert!(matches!(store.set(json!({"v": "new"})), Err(StoreError::IdSpaceExhausted)));
        assert!(matches!(store.add(json!([1])), Err(StoreError::IdSpaceExhausted)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&Id::from(i64::MAX)).unwrap().field("v"), Some(json!("keep")));

        // Items that name their id are still accepted.
        store.set(json!({"id": "named"})).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn ids_outside_i64_are_rejected() {
        let store = Store::new();
        for id in [json!(1e20), json!(-1e20), json!(u64::MAX)] {
            assert!(matches!(store.set(json!({ "id": id })), Err(StoreError::InvalidId)));
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_append_keeps_the_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.jsonl");
        let store = Store::new();
        store.load(&path).await.unwrap();
        // A directory in place of the backing file makes every append fail.
        std::fs::create_dir(&path).unwrap();

        let item = store.set(json!({"v": 1})).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), store.flush())
            .await
            .expect("failed append left writes pending");

        assert_eq!(store.pending_writes(), 0);
        assert_eq!(store.get(item.id()).unwrap(), item);
        assert_eq!(store.len(), 1);
    }

    // -----------------------------------------------------------------------
    // properties
    // -----------------------------------------------------------------------

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Clone, Debug)]
        enum Op {
            SetAuto,
            SetExplicit(i64),
            DropExisting(usize),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                3 => Just(Op::SetAuto),
                1 => (-50i64..500).prop_map(Op::SetExplicit),
                2 => any::<usize>().prop_map(Op::DropExisting),
            ]
        }

        proptest! {
            #[test]
            fn auto_ids_strictly_increase_and_are_never_reused(ops in prop::collection::vec(op(), 1..80)) {
                let store = Store::new();
                let mut seen: Vec<i64> = Vec::new();
                let mut last_auto: Option<i64> = None;

                for op in ops {
                    match op {
                        Op::SetAuto => {
                            let item = store.set(json!({})).unwrap();
                            let id = item.id().as_int().unwrap();
                            prop_assert!(!seen.contains(&id), "id {} handed out twice", id);
                            if let Some(prev) = last_auto {
                                prop_assert!(id > prev);
                            }
                            last_auto = Some(id);
                            seen.push(id);
                        }
                        Op::SetExplicit(id) => {
                            store.set(json!({ "id": id })).unwrap();
                            seen.push(id);
                        }
                        Op::DropExisting(pick) => {
                            let keys = store.keys();
                            if !keys.is_empty() {
                                let id = keys[pick % keys.len()].clone();
                                store.drop(&id, Policy::Strict).unwrap();
                            }
                        }
                    }
                    let max_seen = seen.iter().copied().max().unwrap_or(0);
                    prop_assert!(store.next_id().unwrap() > max_seen);
                }
            }
        }
    }
}
