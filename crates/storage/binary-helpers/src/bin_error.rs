use std::array::TryFromSliceError;
use thiserror::Error;

/// Errors that can occur when working with binary data.
#[derive(Error, Debug)]
pub enum BinaryError {
    /// A read or write touched a byte range the slice does not contain.
    #[error(
        "attempt to access {expected} bytes at offset {from_offset}, but the slice does not contain that range"
    )]
    RangeOutOfBounds { expected: usize, from_offset: usize },
    /// Failure to convert a slice into a fixed-size array.
    #[error("error converting a slice")]
    SliceConversion(#[from] TryFromSliceError),
}
