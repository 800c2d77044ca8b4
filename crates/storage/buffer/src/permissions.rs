/// Access level a caller requests on a page.
///
/// `ReadOnly` maps to a shared lock, `ReadWrite` to an exclusive lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}
