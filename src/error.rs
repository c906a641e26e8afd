//! Module containing the definition of error types.
//!
//! Every operation of the client returns its failures as a [`Kind`], whatever the request
//! shape or the endpoint family. Backend rejections and transport failures are never mixed:
//! a rejection carries the message the backend sent, verbatim, and a transport failure carries
//! the diagnostic of the HTTP stack.

use failure_derive::Fail;
use std::result;

/// Result type used by every client operation.
pub type Result<T> = result::Result<T, Kind>;

/// Message used when the backend rejects a request with an empty error string.
const EMPTY_REJECTION: &str = "the analysis service rejected the request";

/// Enumeration of the different error kinds.
#[derive(Debug, Clone, PartialEq, Eq, Fail)]
pub enum Kind {
    /// No usable response was received: connection, DNS or timeout errors, or an HTTP
    /// error status without a structured error body.
    #[fail(display = "transport failure: {}", message)]
    TransportFailure {
        /// Diagnostic of the transport layer.
        message: String,
        /// HTTP status, if a response status line was received.
        status: Option<u16>,
    },
    /// The backend answered with a structured error.
    #[fail(display = "{}", message)]
    BackendRejection {
        /// HTTP status of the response.
        status: u16,
        /// Message sent by the backend, verbatim.
        message: String,
    },
    /// A successful response could not be decoded into the expected result.
    #[fail(display = "could not decode the `{}` response: {}", endpoint, message)]
    Decode {
        /// Endpoint that produced the response.
        endpoint: String,
        /// Decoder diagnostic.
        message: String,
    },
    /// Configuration error.
    #[fail(display = "there was an error in the configuration: {}", message)]
    Config {
        /// Error message.
        message: String,
    },
    /// Parsing error.
    #[fail(display = "there was an error in the parsing process: {}", message)]
    Parse {
        /// Error message.
        message: String,
    },
}

impl Kind {
    /// Creates a transport failure from a diagnostic.
    pub fn transport<S: Into<String>>(message: S, status: Option<u16>) -> Self {
        Kind::TransportFailure {
            message: message.into(),
            status,
        }
    }

    /// Creates a backend rejection. An empty message is replaced by a generic one.
    pub fn rejection<S: Into<String>>(status: u16, message: S) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            format!("{} (status {})", EMPTY_REJECTION, status)
        } else {
            message
        };

        Kind::BackendRejection { status, message }
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Kind::Config {
            message: message.into(),
        }
    }

    /// Human readable message of the error. Never empty.
    pub fn message(&self) -> &str {
        match self {
            Kind::TransportFailure { message, .. }
            | Kind::BackendRejection { message, .. }
            | Kind::Decode { message, .. }
            | Kind::Config { message }
            | Kind::Parse { message } => message.as_str(),
        }
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match *self {
            Kind::TransportFailure { status, .. } => status,
            Kind::BackendRejection { status, .. } => Some(status),
            _ => None,
        }
    }

    /// Whether no usable response was received.
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Kind::TransportFailure { .. } => true,
            _ => false,
        }
    }

    /// Whether the backend rejected the request.
    ///
    /// Calls made out of order (stopping a session that never started, probing a stopped
    /// session…) end up here as well: the client keeps no session state of its own.
    pub fn is_backend_rejection(&self) -> bool {
        match self {
            Kind::BackendRejection { .. } => true,
            _ => false,
        }
    }

    /// Whether the backend reported that the requested record does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Kind::BackendRejection { status, message } => {
                *status == 404 || message.to_lowercase().contains("not found")
            }
            _ => false,
        }
    }
}
