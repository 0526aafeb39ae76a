use fileops_core::CoreError;
use fileops_store::StoreError;

/// Error type for engine operations.
///
/// Per-channel transport failures never surface here; they are retried
/// inside the adapters and reported through per-channel delivery results.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A domain-level error (disabled user, validation, not found).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A storage backend failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias for engine return values.
pub type EngineResult<T> = Result<T, EngineError>;
