//! Recency-ordered pagination over sorted sets.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A 1-based page of `count` items, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub count: usize,
    pub page: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            count: DEFAULT_PAGE_SIZE,
            page: 1,
        }
    }
}

impl Page {
    pub fn new(count: usize, page: usize) -> Self {
        Self { count, page }
    }

    /// First page of `count` items.
    pub fn first(count: usize) -> Self {
        Self::new(count, 1)
    }

    /// Inclusive `(start, stop)` rank range, or `None` for an empty page.
    ///
    /// Pages below 1 are read as page 1.
    pub fn range(&self) -> Option<(isize, isize)> {
        if self.count == 0 {
            return None;
        }
        let start = self.page.max(1).checked_sub(1)?.checked_mul(self.count)?;
        let stop = start.checked_add(self.count - 1)?;
        Some((isize::try_from(start).ok()?, isize::try_from(stop).ok()?))
    }
}
