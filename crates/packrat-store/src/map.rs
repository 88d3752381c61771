use std::collections::{BTreeMap, HashMap};

use packrat_types::{Id, Item};

/// Id-keyed item map that enumerates in first-insertion order.
///
/// Overwriting an id keeps its position; removing and re-inserting moves it
/// to the end.
#[derive(Clone, Debug, Default)]
pub(crate) struct ItemMap {
    slots: BTreeMap<u64, Item>,
    index: HashMap<Id, u64>,
    next_slot: u64,
}

impl ItemMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, id: &Id) -> Option<&Item> {
        self.index.get(id).and_then(|slot| self.slots.get(slot))
    }

    pub(crate) fn contains(&self, id: &Id) -> bool {
        self.index.contains_key(id)
    }

    /// Insert or overwrite. Returns the replaced item, if any.
    pub(crate) fn upsert(&mut self, item: Item) -> Option<Item> {
        match self.index.get(item.id()) {
            Some(slot) => self.slots.insert(*slot, item),
            None => {
                let slot = self.next_slot;
                self.next_slot += 1;
                self.index.insert(item.id().clone(), slot);
                self.slots.insert(slot, item);
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, id: &Id) -> Option<Item> {
        let slot = self.index.remove(id)?;
        self.slots.remove(&slot)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Item> {
        self.slots.values()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.next_slot = 0;
    }
}
