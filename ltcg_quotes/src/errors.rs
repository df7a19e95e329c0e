//! Error types for the quote client.

/// Errors that can occur when fetching a quote.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An HTTP request failed (network error, timeout, or unreadable body).
    #[error("Request failed")]
    RequestFailed,
    /// The exchange returned a non-success status with a body snippet.
    #[error("Request failed with status {status}")]
    HttpStatus { status: u16, body: String },
    /// The exchange throttled us (HTTP 429).
    #[error("Rate limited by exchange")]
    RateLimited,
    /// The response did not contain a usable price.
    #[error("Failed to parse quote: {0}")]
    ParseFailed(String),
    /// The symbol is not of the form `EXCHANGE:CODE` or names an unknown exchange.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),
}

impl Error {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed | Self::RateLimited => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            Self::ParseFailed(_) | Self::InvalidSymbol(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(Error::RequestFailed.is_transient());
        assert!(Error::RateLimited.is_transient());
        assert!(Error::HttpStatus {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!Error::HttpStatus {
            status: 404,
            body: String::new()
        }
        .is_transient());
        assert!(!Error::ParseFailed("empty".into()).is_transient());
    }
}
