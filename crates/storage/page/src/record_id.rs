use crate::page_id::PageId;
use std::fmt;

/// Locates one tuple within the engine: the page it lives on plus its slot
/// number on that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// The page holding the tuple.
    pub page_id: PageId,

    /// The slot number within the page, starting at 0.
    pub slot: usize,
}

impl RecordId {
    /// Creates a new `RecordId` for the given page and slot.
    pub fn new(page_id: PageId, slot: usize) -> Self {
        Self { page_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.page_id, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_value() {
        let a = RecordId::new(PageId::new(1, 2), 3);
        let b = RecordId::new(PageId::new(1, 2), 3);
        assert_eq!(a, b);
        assert_ne!(a, RecordId::new(PageId::new(1, 2), 4));
    }

    #[test]
    fn display_formats_correctly() {
        let rid = RecordId::new(PageId::new(9, 0), 17);
        assert_eq!(rid.to_string(), "9:0/17");
    }
}
