use serde::{Deserialize, Serialize};

use super::Category;

/// A sensitive span reported by the classifier. Offsets are byte offsets into the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub start: usize,
    pub end: usize,
    pub category: Category,
}

impl Detection {
    pub fn new(start: usize, end: usize, category: impl Into<Category>) -> Self {
        Self {
            start,
            end,
            category: category.into(),
        }
    }

    /// The covered slice, or `None` when the offsets don't fit the text.
    pub fn slice<'t>(&self, text: &'t str) -> Option<&'t str> {
        if self.start >= self.end {
            return None;
        }
        text.get(self.start..self.end)
    }

    pub fn overlaps(&self, other: &Detection) -> bool {
        self.start < other.end && other.start < self.end
    }
}
