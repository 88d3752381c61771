use packrat_types::Id;

use crate::error::{StoreError, StoreResult};

const FIRST_ID: i64 = 1;

/// Owner of the next auto-assigned integer id.
///
/// The counter only moves forward: it is advanced past every integer id the
/// store sees, whether allocated here, supplied by a caller, or replayed from
/// a log. A dropped id is therefore never handed out again. Once `i64::MAX`
/// has been seen there is no id left to hand out and allocation fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdAllocator {
    /// `None` once the id space is used up.
    next: Option<i64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: Some(FIRST_ID),
        }
    }

    /// Hand out the next id and advance.
    pub fn allocate(&mut self) -> StoreResult<Id> {
        let id = self.next.ok_or(StoreError::IdSpaceExhausted)?;
        self.next = id.checked_add(1);
        Ok(Id::Int(id))
    }

    /// Advance past `id` if it is an integer at or above the counter.
    pub fn observe(&mut self, id: &Id) {
        if let (Id::Int(i), Some(next)) = (id, self.next) {
            if *i >= next {
                self.next = i.checked_add(1);
            }
        }
    }

    /// Resolve the id for an incoming item: keep the caller's id (and
    /// observe it) or allocate a fresh one.
    pub fn assign(&mut self, requested: Option<Id>) -> StoreResult<Id> {
        match requested {
            Some(id) => {
                self.observe(&id);
                Ok(id)
            }
            None => self.allocate(),
        }
    }

    /// The id [`allocate`](Self::allocate) would return next, or `None` if
    /// the id space is exhausted.
    pub fn peek(&self) -> Option<i64> {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = Some(FIRST_ID);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
