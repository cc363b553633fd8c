#![forbid(unsafe_code)]

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// SSA version counter of one symbolic variable.
///
/// Clones share the next-free counter, so a context restored from a snapshot
/// never hands out an index that was already issued on another path.
#[derive(Clone)]
pub struct SsaIndex {
    current: u32,
    next_free: Rc<Cell<u32>>,
}

impl SsaIndex {
    pub fn new() -> Self {
        Self {
            current: 0,
            next_free: Rc::new(Cell::new(1)),
        }
    }

    pub fn index(&self) -> u32 {
        self.current
    }

    /// Smallest index that has not been issued yet.
    pub fn next_free(&self) -> u32 {
        self.next_free.get()
    }

    /// Moves to a brand new index and returns it.
    pub fn increase(&mut self) -> u32 {
        let next = self.next_free.get();
        self.next_free.set(next + 1);
        self.current = next;
        next
    }

    /// Points the current index back at an already issued version.
    pub fn set(&mut self, index: u32) {
        debug_assert!(index < self.next_free.get(), "SSA index {index} was never issued");
        self.current = index;
    }
}

impl Default for SsaIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SsaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SsaIndex({}, next {})", self.current, self.next_free.get())
    }
}
