//! # Validation Errors
//!
//! Every failure in the recursive token-validation engine collapses to one
//! of four kinds, each carrying the HTTP-like status code used on
//! [`crate::types::ValidationResponse`].

use thiserror::Error;

/// Failure kinds produced anywhere in the validation engine.
#[derive(Error, Debug)]
pub enum Error {
    /// The token (or a part of it) could not be decoded or classified.
    #[error("{0}")]
    Malformed(String),

    /// A cryptographic or semantic check failed.
    #[error("{0}")]
    Rejected(String),

    /// No validator is registered for a token type that appeared.
    #[error("{0}")]
    Misconfigured(String),

    /// A network call (DID resolution, JWKS fetch, status POST) failed.
    #[error("{0}")]
    Unavailable(String),
}

impl Error {
    /// HTTP-like status code associated with this error kind.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::Malformed(_) => 400,
            Self::Rejected(_) | Self::Unavailable(_) => 403,
            Self::Misconfigured(_) => 500,
        }
    }

    /// The human-readable detail carried by this error.
    #[must_use]
    pub fn detail(&self) -> String {
        self.to_string()
    }
}

/// Construct an `Error::Malformed` from a format string or existing message.
#[macro_export]
macro_rules! malformed {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Malformed(format!($fmt, $($arg)*))
    };
    ($err:expr $(,)?) => {
        $crate::error::Error::Malformed(format!($err))
    };
}

/// Construct an `Error::Rejected` from a format string or existing message.
#[macro_export]
macro_rules! rejected {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Rejected(format!($fmt, $($arg)*))
    };
    ($err:expr $(,)?) => {
        $crate::error::Error::Rejected(format!($err))
    };
}

/// Construct an `Error::Misconfigured` from a format string or existing message.
#[macro_export]
macro_rules! misconfigured {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Misconfigured(format!($fmt, $($arg)*))
    };
    ($err:expr $(,)?) => {
        $crate::error::Error::Misconfigured(format!($err))
    };
}

/// Construct an `Error::Unavailable` from a format string or existing message.
#[macro_export]
macro_rules! unavailable {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Error::Unavailable(format!($fmt, $($arg)*))
    };
    ($err:expr $(,)?) => {
        $crate::error::Error::Unavailable(format!($err))
    };
}
