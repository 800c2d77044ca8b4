use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum InsertError {
    #[error("page has no empty slots")]
    PageFull,
    #[error("tuple schema does not match the page schema")]
    SchemaMismatch,
}
