//! Typed field values, tuple schemas, and the fixed-size tuple codec.
//!
//! Every field type has a fixed on-disk size, so a tuple's size is fully
//! determined by its schema and a page can lay tuples out in fixed slots.
//! All integers are stored little-endian through the binary-helpers crate.
//!
//! # Binary Layout
//!
//! | Field type | Size      | Encoding                                         |
//! |------------|-----------|--------------------------------------------------|
//! | `Int`      | 4 bytes   | `i32`, little-endian                             |
//! | `Text`     | 132 bytes | `u32` byte length, then 128 data bytes, 0-padded |

use crate::errors::tuple_error::TupleError;
use crate::record_id::RecordId;
use binary_helpers::le::read_le;

/// Maximum number of data bytes a `Text` field can hold.
pub const TEXT_CAPACITY: usize = 128;

/// The type of one tuple field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 32-bit signed integer.
    Int,
    /// Variable-length utf-8 text in a fixed-size slot.
    Text,
}

impl FieldType {
    /// Number of bytes a value of this type occupies on a page.
    pub fn size(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Text => 4 + TEXT_CAPACITY,
        }
    }
}

/// One typed field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    /// The type of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Text(_) => FieldType::Text,
        }
    }

    /// Encodes this value into `out`, which must be exactly
    /// `self.field_type().size()` bytes. Unused text bytes are zeroed.
    fn encode_into(&self, out: &mut [u8]) {
        out.fill(0);
        match self {
            Field::Int(v) => out.copy_from_slice(&v.to_le_bytes()),
            Field::Text(s) => {
                let bytes = s.as_bytes();
                out[..4].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
                out[4..4 + bytes.len()].copy_from_slice(bytes);
            }
        }
    }

    /// Decodes a value of type `ty` from `bytes`.
    fn decode(ty: FieldType, bytes: &[u8]) -> Result<Self, TupleError> {
        match ty {
            FieldType::Int => Ok(Field::Int(read_le::<i32>(bytes, 0)?)),
            FieldType::Text => {
                let len = read_le::<u32>(bytes, 0)? as usize;
                if len > TEXT_CAPACITY {
                    return Err(TupleError::TextTooLong {
                        len,
                        capacity: TEXT_CAPACITY,
                    });
                }
                let data = bytes
                    .get(4..4 + len)
                    .ok_or(binary_helpers::bin_error::BinaryError::RangeOutOfBounds {
                        expected: len,
                        from_offset: 4,
                    })?
                    .to_vec();
                Ok(Field::Text(String::from_utf8(data)?))
            }
        }
    }
}

/// The schema of a tuple: an ordered list of field types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDesc {
    fields: Vec<FieldType>,
}

impl TupleDesc {
    /// Creates a schema from an ordered list of field types.
    pub fn new(fields: Vec<FieldType>) -> Self {
        Self { fields }
    }

    /// Number of fields in the schema.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// The type of field `index`, if it exists.
    pub fn field_type(&self, index: usize) -> Option<FieldType> {
        self.fields.get(index).copied()
    }

    /// Total number of bytes one tuple of this schema occupies on a page.
    pub fn tuple_size(&self) -> usize {
        self.fields.iter().map(FieldType::size).sum()
    }

    /// Iterates over the field types in order.
    pub fn iter(&self) -> impl Iterator<Item = FieldType> + '_ {
        self.fields.iter().copied()
    }
}

/// An ordered sequence of typed field values matching a [`TupleDesc`].
///
/// A tuple carries a [`RecordId`] once it has been placed on a page; until
/// then `record_id()` is `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Creates a tuple, validating field count, field types, and text
    /// capacity against the schema.
    pub fn new(desc: TupleDesc, fields: Vec<Field>) -> Result<Self, TupleError> {
        if fields.len() != desc.num_fields() {
            return Err(TupleError::FieldCount {
                expected: desc.num_fields(),
                actual: fields.len(),
            });
        }
        for (index, (field, expected)) in fields.iter().zip(desc.iter()).enumerate() {
            if field.field_type() != expected {
                return Err(TupleError::FieldTypeMismatch { index });
            }
            if let Field::Text(s) = field {
                if s.len() > TEXT_CAPACITY {
                    return Err(TupleError::TextTooLong {
                        len: s.len(),
                        capacity: TEXT_CAPACITY,
                    });
                }
            }
        }
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    /// The schema of this tuple.
    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    /// The value of field `index`, if it exists.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Where this tuple is stored, if it has been placed on a page.
    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub(crate) fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Encodes this tuple into `out`, which must be exactly
    /// `self.desc().tuple_size()` bytes.
    pub(crate) fn encode_into(&self, out: &mut [u8]) {
        let mut offset = 0;
        for field in &self.fields {
            let size = field.field_type().size();
            field.encode_into(&mut out[offset..offset + size]);
            offset += size;
        }
    }

    /// Decodes one tuple of schema `desc` from `bytes`. The returned tuple
    /// carries no record id; the caller assigns one.
    pub(crate) fn decode(desc: TupleDesc, bytes: &[u8]) -> Result<Self, TupleError> {
        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for ty in desc.iter() {
            let size = ty.size();
            let slice =
                bytes
                    .get(offset..offset + size)
                    .ok_or(binary_helpers::bin_error::BinaryError::RangeOutOfBounds {
                        expected: size,
                        from_offset: offset,
                    })?;
            fields.push(Field::decode(ty, slice)?);
            offset += size;
        }
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }
}
