/// Error type for store operations.
///
/// Absence (not-found, not-owned) is expressed through `Option`/`bool`
/// return values, not through this error; `Unavailable` covers backend
/// failures a durable implementation may hit.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
