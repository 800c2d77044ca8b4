use crate::page_id::PageId;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum DeleteError {
    #[error("tuple carries no record id; it was never stored on a page")]
    MissingRecordId,
    #[error("tuple belongs to page {actual}, not this page")]
    WrongPage { actual: PageId },
    #[error("slot {slot} is out of range for a page with {num_slots} slots")]
    SlotOutOfRange { slot: usize, num_slots: usize },
    #[error("slot {slot} is already empty")]
    SlotEmpty { slot: usize },
}
