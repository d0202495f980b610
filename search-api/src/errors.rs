use thiserror::Error;

/// Errors produced by the search pipeline (provider calls, fan-out, cache
/// fetches).
///
/// `Clone` because every single-flight waiter receives the leader's terminal
/// outcome; variants carry rendered strings rather than source errors for the
/// same reason.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("provider {0} request failed: {1}")]
    ProviderRequest(String, String),

    #[error("provider {0} returned status {1}")]
    ProviderStatus(String, u16),

    #[error("provider {0} response decode failed: {1}")]
    ProviderDecode(String, String),

    #[error("provider {0} timed out")]
    ProviderTimeout(String),

    /// The single-flight fetch task went away without recording an outcome.
    #[error("search fetch abandoned")]
    FetchAbandoned,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Service-level errors: bootstrap and connection handling.
#[derive(Error, Debug)]
pub enum SearchApiError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
