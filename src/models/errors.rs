//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so tracker logs can be
//! grepped and aggregated by category.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - FETCH_xxx: HTTP fetch layer errors
//! - RPC_xxx: JSON-RPC errors
//! - STORE_xxx: persistence errors
//! - CFG_xxx: configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// HTTP status of the failing response, when there was one
    pub status: Option<u16>,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    /// True when the upstream answered 404
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }

    /// 429 and 5xx are backed off on the capped schedule
    pub fn is_status_backoff(&self) -> bool {
        matches!(self.status, Some(429) | Some(500..=599))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Fetch Errors
    // ============================================
    /// Attempt exceeded its timeout
    FetchTimeout,
    /// Upstream answered 429
    FetchRateLimited,
    /// Upstream answered another non-2xx status
    FetchHttpStatus,
    /// Network/connection level failure
    FetchTransport,
    /// Body was not valid JSON
    FetchInvalidJson,

    // ============================================
    // RPC Errors
    // ============================================
    /// JSON-RPC body carried an `error` member
    RpcError,
    /// JSON-RPC body had neither result nor error, or an unparsable result
    RpcInvalidResponse,

    // ============================================
    // Store Errors
    // ============================================
    /// Query or write failed
    StoreError,
    /// Database could not be opened
    StoreConnection,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,

    // ============================================
    // Generic Errors
    // ============================================
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchTimeout => "FETCH_TIMEOUT",
            Self::FetchRateLimited => "FETCH_RATE_LIMITED",
            Self::FetchHttpStatus => "FETCH_HTTP_STATUS",
            Self::FetchTransport => "FETCH_TRANSPORT",
            Self::FetchInvalidJson => "FETCH_INVALID_JSON",

            Self::RpcError => "RPC_ERROR",
            Self::RpcInvalidResponse => "RPC_INVALID_RESPONSE",

            Self::StoreError => "STORE_ERROR",
            Self::StoreConnection => "STORE_CONNECTION",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Errors that abort a whole run rather than a single phase or project
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreConnection)
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Attempt timed out
    pub fn fetch_timeout(url: &str) -> Self {
        Self::new(ErrorCode::FetchTimeout, format!("Request timed out for {}", url))
    }

    /// Non-2xx status; 429 gets its own code, the status is kept either way
    pub fn http_status(status: u16, reason: &str, url: &str) -> Self {
        let code = if status == 429 {
            ErrorCode::FetchRateLimited
        } else {
            ErrorCode::FetchHttpStatus
        };
        let mut err = Self::new(code, format!("HTTP {}: {} for {}", status, reason, url));
        err.status = Some(status);
        err
    }

    /// Transport failure
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FetchTransport, msg)
    }

    /// JSON-RPC error member
    pub fn rpc_error(message: &str, code: i64) -> Self {
        Self::new(
            ErrorCode::RpcError,
            format!("RPC error: {} (code: {})", message, code),
        )
    }

    /// Malformed JSON-RPC response
    pub fn rpc_invalid(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RpcInvalidResponse, msg)
    }

    /// Store query failed
    pub fn store(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreError, msg)
    }

    /// Store could not be opened
    pub fn store_connection(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreConnection, msg)
    }

    /// Invalid configuration
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        if err.is_timeout() {
            Self::fetch_timeout(&url)
        } else if err.is_decode() {
            Self::new(ErrorCode::FetchInvalidJson, format!("Invalid JSON from {}: {}", url, err))
        } else {
            Self::new(ErrorCode::FetchTransport, format!("Request failed: {}", err))
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::FetchInvalidJson, "JSON parse error", err)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        Self::with_source(ErrorCode::StoreError, format!("SQLite error: {}", err), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::fetch_timeout("https://api.llama.fi/protocols");
        assert_eq!(err.code, ErrorCode::FetchTimeout);
        assert_eq!(err.code_str(), "FETCH_TIMEOUT");
    }

    #[test]
    fn test_http_status_keeps_status() {
        let err = AppError::http_status(404, "Not Found", "https://x/smart-contracts/0x1");
        assert_eq!(err.code, ErrorCode::FetchHttpStatus);
        assert!(err.is_not_found());
        assert!(err.to_string().contains("HTTP 404"));

        let limited = AppError::http_status(429, "Too Many Requests", "https://x");
        assert_eq!(limited.code, ErrorCode::FetchRateLimited);
        assert!(limited.is_status_backoff());
        assert!(AppError::http_status(503, "Service Unavailable", "https://x").is_status_backoff());
        assert!(!err.is_status_backoff());
    }

    #[test]
    fn test_fatal_only_for_store_connection() {
        assert!(ErrorCode::StoreConnection.is_fatal());
        assert!(!ErrorCode::StoreError.is_fatal());
        assert!(!ErrorCode::FetchTransport.is_fatal());
    }
}
