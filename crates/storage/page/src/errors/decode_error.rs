use crate::errors::tuple_error::TupleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error("page data must be exactly {expected} bytes, got {actual}")]
    WrongPageSize { expected: usize, actual: usize },
    #[error("error while decoding the tuple in slot {slot}")]
    Tuple {
        slot: usize,
        #[source]
        source: TupleError,
    },
}
