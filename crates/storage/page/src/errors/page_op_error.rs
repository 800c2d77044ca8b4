use crate::errors::decode_error::DecodeError;
use crate::errors::delete_error::DeleteError;
use crate::errors::insert_error::InsertError;
use thiserror::Error;

/// Aggregator error type for all possible page related sub-errors
#[derive(Debug, Error)]
pub(crate) enum PageOpError {
    #[error("error while decoding page")]
    Decode(#[from] DecodeError),
    #[error("error while inserting tuple")]
    Insert(#[from] InsertError),
    #[error("error while deleting tuple")]
    Delete(#[from] DeleteError),
}
