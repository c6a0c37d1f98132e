//! Object identifiers and the per-document monotonic generator.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Identifier of a map object.
///
/// IDs are handed out by an [`IdGenerator`] and are never reused within a
/// document session, so history entries that name an ID stay unambiguous
/// after intervening deletions and insertions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Wrap a raw value. Only providers restoring saved maps should need this.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic ID source owned by a single map.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    /// Create a generator whose first ID is 1 (0 is the root of a fresh map).
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Create a generator that continues from `next`.
    pub const fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Generate the next unique ID
    pub fn next(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next += 1;
        id
    }

    /// The ID the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> ObjectId {
        ObjectId(self.next)
    }

    /// Make sure `id` can never be generated again.
    ///
    /// Called for every ID restored from a file.
    pub fn observe(&mut self, id: ObjectId) {
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
