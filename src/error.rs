use thiserror::Error;

/// Structural failures. Sparse or malformed field data never produces one of
/// these; it degrades to nulls and "Unknown" buckets instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown scope level `{level}`")]
    InvalidScope { level: String },
    #[error("scope level {level} requires a name")]
    MissingScopeName { level: String },
    #[error("caller `{caller}` exceeded the request limit; retry in {retry_after_secs}s")]
    RateLimited {
        caller: String,
        retry_after_secs: u64,
    },
    #[error("{analyzer} analyzer did not complete: {reason}")]
    Worker {
        analyzer: &'static str,
        reason: String,
    },
}
