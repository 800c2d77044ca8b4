//! The heap page: in-memory representation and codec for one page of a heap
//! table.
//!
//! # Binary Layout
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │ Header: slot-occupancy bitmap, one bit per slot              │
//!   │   bit i of byte i/8 (low bit first) = slot i occupied        │
//!   ├──────────────────────────────────────────────────────────────┤
//!   │ Slot 0: tuple_size bytes                                     │
//!   │ Slot 1: tuple_size bytes                                     │
//!   │   ...                                                        │
//!   │ Slot num_slots-1                                             │
//!   ├──────────────────────────────────────────────────────────────┤
//!   │ Zero padding to PAGE_SIZE                                    │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! With `PAGE_SIZE` bytes per page and `tuple_size` bytes per tuple, each
//! stored tuple costs `tuple_size * 8 + 1` bits (its slot plus its header
//! bit), so:
//!
//! ```text
//! num_slots    = floor(PAGE_SIZE * 8 / (tuple_size * 8 + 1))
//! header_size  = ceil(num_slots / 8)
//! ```
//!
//! An unoccupied slot's bytes are reserved but carry no meaningful content;
//! they serialize as zeroes. Header bits past `num_slots` in the last
//! header byte are preserved verbatim but never counted.
//!
//! # Invariants
//!
//! - The set bits of the header always equal the occupied entries of the
//!   tuple array, and an occupied tuple's record id names its own slot.
//! - `serialize` and the byte constructor round-trip exactly.
//!
//! The page also carries the two pieces of cache-level state the buffer
//! pool relies on: the dirty marker (which transaction dirtied the page, if
//! any) and the before-image (the serialized bytes as of the last load or
//! flush, used to roll back an aborted transaction's changes).

use crate::PAGE_SIZE;
use crate::errors::decode_error::DecodeError;
use crate::errors::delete_error::DeleteError;
use crate::errors::insert_error::InsertError;
use crate::errors::page_error::{PageResult, WithPageId};
use crate::page_id::PageId;
use crate::record_id::RecordId;
use crate::transaction_id::TransactionId;
use crate::tuple::{Tuple, TupleDesc};

/// One heap page: slot bitmap plus fixed-size tuple slots.
#[derive(Debug)]
pub struct HeapPage {
    page_id: PageId,
    desc: TupleDesc,
    num_slots: usize,
    header: Box<[u8]>,
    tuples: Vec<Option<Tuple>>,
    dirtier: Option<TransactionId>,
    before_image: Box<[u8]>,
}

/// Constructors and layout math.
impl HeapPage {
    /// Number of tuple slots a page holds for tuples of schema `desc`.
    pub fn num_slots_for(desc: &TupleDesc) -> usize {
        (PAGE_SIZE * 8) / (desc.tuple_size() * 8 + 1)
    }

    /// Number of header bytes for tuples of schema `desc`.
    pub fn header_size_for(desc: &TupleDesc) -> usize {
        Self::num_slots_for(desc).div_ceil(8)
    }

    /// The byte image of a fresh page with no occupied slots. Writing this
    /// to disk is how a heap file grows by one page.
    pub fn empty_page_data() -> Box<[u8]> {
        vec![0u8; PAGE_SIZE].into_boxed_slice()
    }

    /// Decodes a page from `data`, which must be exactly [`PAGE_SIZE`]
    /// bytes. Bytes of unoccupied slots are skipped, not decoded. The
    /// before-image snapshot is taken from `data`.
    pub fn new(page_id: PageId, desc: TupleDesc, data: &[u8]) -> PageResult<Self> {
        if data.len() != PAGE_SIZE {
            return Err(DecodeError::WrongPageSize {
                expected: PAGE_SIZE,
                actual: data.len(),
            })
            .with_page_id(page_id);
        }

        let num_slots = Self::num_slots_for(&desc);
        let header_size = Self::header_size_for(&desc);
        let tuple_size = desc.tuple_size();

        let header: Box<[u8]> = data[..header_size].into();

        let mut tuples = Vec::with_capacity(num_slots);
        for slot in 0..num_slots {
            if !bit_is_set(&header, slot) {
                tuples.push(None);
                continue;
            }
            let offset = header_size + slot * tuple_size;
            let mut tuple = Tuple::decode(desc.clone(), &data[offset..offset + tuple_size])
                .map_err(|source| DecodeError::Tuple { slot, source })
                .with_page_id(page_id)?;
            tuple.set_record_id(Some(RecordId::new(page_id, slot)));
            tuples.push(Some(tuple));
        }

        Ok(Self {
            page_id,
            desc,
            num_slots,
            header,
            tuples,
            dirtier: None,
            before_image: data.into(),
        })
    }

    /// Creates a fresh page with every slot empty.
    pub fn empty(page_id: PageId, desc: TupleDesc) -> Self {
        let num_slots = Self::num_slots_for(&desc);
        let header_size = Self::header_size_for(&desc);
        Self {
            page_id,
            desc,
            num_slots,
            header: vec![0u8; header_size].into_boxed_slice(),
            tuples: vec![None; num_slots],
            dirtier: None,
            before_image: Self::empty_page_data(),
        }
    }
}

/// Accessors.
impl HeapPage {
    /// Returns the unique identifier of the page.
    pub fn id(&self) -> PageId {
        self.page_id
    }

    /// The schema of the tuples this page stores.
    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// Total number of tuple slots on this page.
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Whether slot `slot` currently holds a tuple. Out-of-range slots
    /// report unoccupied.
    pub fn slot_in_use(&self, slot: usize) -> bool {
        slot < self.num_slots && bit_is_set(&self.header, slot)
    }

    /// Count of unoccupied slots. Header bits past `num_slots` are not
    /// counted.
    pub fn num_empty_slots(&self) -> usize {
        (0..self.num_slots)
            .filter(|&slot| !bit_is_set(&self.header, slot))
            .count()
    }

    /// The tuple in `slot`, if occupied.
    pub fn tuple(&self, slot: usize) -> Option<&Tuple> {
        self.tuples.get(slot).and_then(|t| t.as_ref())
    }

    /// Iterates over occupied slots only, in increasing slot order. The
    /// sequence is lazy; calling `iter` again restarts it.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> + '_ {
        self.tuples.iter().filter_map(|t| t.as_ref())
    }
}

/// Tuple mutation.
impl HeapPage {
    /// Places `tuple` in the lowest-numbered free slot, assigns its record
    /// id, and marks the slot occupied. Fails if the page is full or the
    /// tuple's schema does not match the page's.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> PageResult<RecordId> {
        let Some(slot) = (0..self.num_slots).find(|&slot| !bit_is_set(&self.header, slot)) else {
            return Err(InsertError::PageFull).with_page_id(self.page_id);
        };
        if tuple.desc() != &self.desc {
            return Err(InsertError::SchemaMismatch).with_page_id(self.page_id);
        }

        let record_id = RecordId::new(self.page_id, slot);
        tuple.set_record_id(Some(record_id));
        self.tuples[slot] = Some(tuple);
        set_bit(&mut self.header, slot, true);
        Ok(record_id)
    }

    /// Clears the slot named by `tuple`'s record id. Fails if the tuple was
    /// never stored, names another page, names a slot out of range, or
    /// names a slot that is already empty.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> PageResult<()> {
        let record_id = tuple
            .record_id()
            .ok_or(DeleteError::MissingRecordId)
            .with_page_id(self.page_id)?;

        if record_id.page_id != self.page_id {
            return Err(DeleteError::WrongPage {
                actual: record_id.page_id,
            })
            .with_page_id(self.page_id);
        }
        if record_id.slot >= self.num_slots {
            return Err(DeleteError::SlotOutOfRange {
                slot: record_id.slot,
                num_slots: self.num_slots,
            })
            .with_page_id(self.page_id);
        }
        if !bit_is_set(&self.header, record_id.slot) {
            return Err(DeleteError::SlotEmpty {
                slot: record_id.slot,
            })
            .with_page_id(self.page_id);
        }

        self.tuples[record_id.slot] = None;
        set_bit(&mut self.header, record_id.slot, false);
        Ok(())
    }
}

/// Serialization and recovery state.
impl HeapPage {
    /// Serializes the page: header bytes, then each slot's tuple bytes
    /// (zero-filled for empty slots), then zero padding to [`PAGE_SIZE`].
    pub fn serialize(&self) -> Box<[u8]> {
        let mut data = vec![0u8; PAGE_SIZE];
        let header_size = self.header.len();
        data[..header_size].copy_from_slice(&self.header);

        let tuple_size = self.desc.tuple_size();
        for (slot, tuple) in self.tuples.iter().enumerate() {
            if let Some(tuple) = tuple {
                let offset = header_size + slot * tuple_size;
                tuple.encode_into(&mut data[offset..offset + tuple_size]);
            }
        }
        data.into_boxed_slice()
    }

    /// Which transaction dirtied this page, if it is dirty.
    pub fn dirtier(&self) -> Option<TransactionId> {
        self.dirtier
    }

    /// Marks the page dirty on behalf of a transaction, or clean with
    /// `None`.
    pub fn mark_dirty(&mut self, dirtier: Option<TransactionId>) {
        self.dirtier = dirtier;
    }

    /// The serialized bytes of this page as of the last load or
    /// [`set_before_image`](Self::set_before_image) call.
    pub fn before_image(&self) -> &[u8] {
        &self.before_image
    }

    /// Refreshes the before-image snapshot from the page's current
    /// contents. Called after a successful flush, so a later abort of a
    /// different transaction rolls back to the committed state.
    pub fn set_before_image(&mut self) {
        self.before_image = self.serialize();
    }

    /// Rolls the page back to its before-image, discarding every in-memory
    /// mutation since the snapshot was taken, and clears the dirty marker.
    pub fn restore_before_image(&mut self) -> PageResult<()> {
        let restored = Self::new(self.page_id, self.desc.clone(), &self.before_image)?;
        *self = restored;
        Ok(())
    }
}

impl PartialEq for HeapPage {
    fn eq(&self, other: &Self) -> bool {
        self.page_id == other.page_id
            && self.desc == other.desc
            && self.header == other.header
            && self.tuples == other.tuples
    }
}

#[inline]
fn bit_is_set(header: &[u8], slot: usize) -> bool {
    header[slot / 8] & (1 << (slot % 8)) != 0
}

#[inline]
fn set_bit(header: &mut [u8], slot: usize, value: bool) {
    if value {
        header[slot / 8] |= 1 << (slot % 8);
    } else {
        header[slot / 8] &= !(1 << (slot % 8));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::decode_error::DecodeError;
    use crate::errors::delete_error::DeleteError;
    use crate::errors::insert_error::InsertError;
    use crate::errors::page_op_error::PageOpError;
    use crate::tuple::{Field, FieldType, TEXT_CAPACITY};

    fn int_text_desc() -> TupleDesc {
        TupleDesc::new(vec![FieldType::Int, FieldType::Text])
    }

    fn tuple(desc: &TupleDesc, n: i32, s: &str) -> Tuple {
        Tuple::new(desc.clone(), vec![Field::Int(n), Field::Text(s.into())]).unwrap()
    }

    fn empty_page() -> HeapPage {
        HeapPage::empty(PageId::new(1, 0), int_text_desc())
    }

    #[test]
    fn slot_math_for_int_text_schema() {
        let desc = int_text_desc();
        // tuple_size = 4 + 4 + 128 = 136 bytes -> 1089 bits per stored tuple
        assert_eq!(desc.tuple_size(), 136);
        assert_eq!(HeapPage::num_slots_for(&desc), 30);
        assert_eq!(HeapPage::header_size_for(&desc), 4);
    }

    #[test]
    fn empty_page_has_all_slots_free() {
        let page = empty_page();
        assert_eq!(page.num_empty_slots(), page.num_slots());
        assert_eq!(page.iter().count(), 0);
    }

    #[test]
    fn new_rejects_wrong_page_size() {
        let result = HeapPage::new(PageId::new(1, 0), int_text_desc(), &[0u8; 100]);
        let err = result.unwrap_err();
        assert_eq!(err.page_id(), PageId::new(1, 0));
        assert!(matches!(
            err.source,
            PageOpError::Decode(DecodeError::WrongPageSize {
                expected: PAGE_SIZE,
                actual: 100
            })
        ));
    }

    #[test]
    fn insert_fills_lowest_free_slot_in_order() {
        let desc = int_text_desc();
        let mut page = empty_page();

        let rid_a = page.insert_tuple(tuple(&desc, 1, "a")).unwrap();
        let rid_b = page.insert_tuple(tuple(&desc, 2, "b")).unwrap();
        let rid_c = page.insert_tuple(tuple(&desc, 3, "c")).unwrap();

        assert_eq!(rid_a.slot, 0);
        assert_eq!(rid_b.slot, 1);
        assert_eq!(rid_c.slot, 2);
        assert_eq!(page.num_empty_slots(), page.num_slots() - 3);

        let values: Vec<i32> = page
            .iter()
            .map(|t| match t.field(0).unwrap() {
                Field::Int(v) => *v,
                other => panic!("unexpected field {other:?}"),
            })
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn insert_reuses_freed_slot() {
        let desc = int_text_desc();
        let mut page = empty_page();

        page.insert_tuple(tuple(&desc, 1, "a")).unwrap();
        page.insert_tuple(tuple(&desc, 2, "b")).unwrap();

        let victim = page.tuple(0).unwrap().clone();
        page.delete_tuple(&victim).unwrap();
        assert!(!page.slot_in_use(0));

        let rid = page.insert_tuple(tuple(&desc, 3, "c")).unwrap();
        assert_eq!(rid.slot, 0);
    }

    #[test]
    fn insert_into_full_page_fails() {
        let desc = int_text_desc();
        let mut page = empty_page();
        for n in 0..page.num_slots() as i32 {
            page.insert_tuple(tuple(&desc, n, "x")).unwrap();
        }

        let result = page.insert_tuple(tuple(&desc, 99, "y"));
        assert!(matches!(
            result.unwrap_err().source,
            PageOpError::Insert(InsertError::PageFull)
        ));
    }

    #[test]
    fn insert_rejects_mismatched_schema() {
        let mut page = empty_page();
        let other_desc = TupleDesc::new(vec![FieldType::Int]);
        let t = Tuple::new(other_desc, vec![Field::Int(1)]).unwrap();

        let result = page.insert_tuple(t);
        assert!(matches!(
            result.unwrap_err().source,
            PageOpError::Insert(InsertError::SchemaMismatch)
        ));
    }

    #[test]
    fn delete_rejects_tuple_without_record_id() {
        let desc = int_text_desc();
        let mut page = empty_page();
        let t = tuple(&desc, 1, "a");

        let result = page.delete_tuple(&t);
        assert!(matches!(
            result.unwrap_err().source,
            PageOpError::Delete(DeleteError::MissingRecordId)
        ));
    }

    #[test]
    fn delete_rejects_tuple_from_another_page() {
        let desc = int_text_desc();
        let mut other = HeapPage::empty(PageId::new(1, 7), desc.clone());
        other.insert_tuple(tuple(&desc, 1, "a")).unwrap();
        let foreign = other.tuple(0).unwrap().clone();

        let mut page = empty_page();
        let result = page.delete_tuple(&foreign);
        assert!(matches!(
            result.unwrap_err().source,
            PageOpError::Delete(DeleteError::WrongPage {
                actual: PageId {
                    table_id: 1,
                    page_number: 7
                }
            })
        ));
    }

    #[test]
    fn delete_rejects_out_of_range_slot() {
        let desc = int_text_desc();
        let mut page = empty_page();
        let mut t = tuple(&desc, 1, "a");
        t.set_record_id(Some(RecordId::new(page.id(), page.num_slots())));

        let result = page.delete_tuple(&t);
        assert!(matches!(
            result.unwrap_err().source,
            PageOpError::Delete(DeleteError::SlotOutOfRange { .. })
        ));
    }

    #[test]
    fn delete_rejects_empty_slot() {
        let desc = int_text_desc();
        let mut page = empty_page();
        let mut t = tuple(&desc, 1, "a");
        t.set_record_id(Some(RecordId::new(page.id(), 3)));

        let result = page.delete_tuple(&t);
        assert!(matches!(
            result.unwrap_err().source,
            PageOpError::Delete(DeleteError::SlotEmpty { slot: 3 })
        ));
    }

    #[test]
    fn slot_accounting_holds_across_mutations() {
        let desc = int_text_desc();
        let mut page = empty_page();

        for n in 0..10 {
            page.insert_tuple(tuple(&desc, n, "v")).unwrap();
        }
        for slot in [1usize, 4, 7] {
            let t = page.tuple(slot).unwrap().clone();
            page.delete_tuple(&t).unwrap();
        }
        page.insert_tuple(tuple(&desc, 100, "w")).unwrap();

        let occupied = page.iter().count();
        assert_eq!(occupied, 8);
        assert_eq!(page.num_empty_slots() + occupied, page.num_slots());
    }

    #[test]
    fn serialize_then_decode_round_trips() {
        let desc = int_text_desc();
        let mut page = empty_page();
        page.insert_tuple(tuple(&desc, 1, "a")).unwrap();
        page.insert_tuple(tuple(&desc, 2, "b")).unwrap();

        let bytes = page.serialize();
        let decoded = HeapPage::new(page.id(), desc, &bytes).unwrap();

        assert_eq!(decoded, page);
        // bit-for-bit: serializing the decoded page reproduces the bytes
        assert_eq!(decoded.serialize(), bytes);
    }

    #[test]
    fn decoded_tuples_carry_their_slot_record_ids() {
        let desc = int_text_desc();
        let mut page = empty_page();
        page.insert_tuple(tuple(&desc, 1, "a")).unwrap();
        page.insert_tuple(tuple(&desc, 2, "b")).unwrap();

        let decoded = HeapPage::new(page.id(), desc, &page.serialize()).unwrap();
        for (i, t) in decoded.iter().enumerate() {
            assert_eq!(t.record_id(), Some(RecordId::new(page.id(), i)));
        }
    }

    #[test]
    fn header_bits_past_num_slots_are_preserved_but_not_counted() {
        let desc = int_text_desc();
        let header_size = HeapPage::header_size_for(&desc);
        // 30 slots in 4 header bytes leaves bits 30 and 31 unused
        let mut data = vec![0u8; PAGE_SIZE];
        data[header_size - 1] = 0b1100_0000;

        let page = HeapPage::new(PageId::new(1, 0), desc, &data).unwrap();
        assert_eq!(page.num_empty_slots(), page.num_slots());
        assert_eq!(page.serialize()[..header_size], data[..header_size]);
    }

    #[test]
    fn dirty_marker_tracks_the_dirtier() {
        let mut page = empty_page();
        assert_eq!(page.dirtier(), None);

        let tid = TransactionId::new();
        page.mark_dirty(Some(tid));
        assert_eq!(page.dirtier(), Some(tid));

        page.mark_dirty(None);
        assert_eq!(page.dirtier(), None);
    }

    #[test]
    fn restore_before_image_undoes_mutations() {
        let desc = int_text_desc();
        let mut page = HeapPage::new(PageId::new(1, 0), desc.clone(), &HeapPage::empty_page_data())
            .unwrap();

        page.insert_tuple(tuple(&desc, 1, "a")).unwrap();
        page.mark_dirty(Some(TransactionId::new()));
        assert_eq!(page.iter().count(), 1);

        page.restore_before_image().unwrap();
        assert_eq!(page.iter().count(), 0);
        assert_eq!(page.dirtier(), None);
        assert_eq!(&*page.serialize(), &*HeapPage::empty_page_data());
    }

    #[test]
    fn set_before_image_pins_the_current_state() {
        let desc = int_text_desc();
        let mut page = empty_page();
        page.insert_tuple(tuple(&desc, 1, "a")).unwrap();
        page.set_before_image();

        page.insert_tuple(tuple(&desc, 2, "b")).unwrap();
        page.restore_before_image().unwrap();

        assert_eq!(page.iter().count(), 1);
        assert!(page.slot_in_use(0));
        assert!(!page.slot_in_use(1));
    }

    #[test]
    fn oversized_text_cannot_reach_a_page() {
        // Tuple::new is the only public constructor, so the page codec can
        // rely on text fitting its slot.
        let desc = TupleDesc::new(vec![FieldType::Text]);
        let long = "x".repeat(TEXT_CAPACITY + 1);
        assert!(Tuple::new(desc, vec![Field::Text(long)]).is_err());
    }
}
