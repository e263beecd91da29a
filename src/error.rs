//! Error types for seekchat.
//!
//! Every failure a completion transport can produce is expressed as an
//! [`Error`].  The session controller is the terminal handler for these during
//! streaming; elsewhere they propagate through [`Result`].

use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;
use std::sync::Arc;

type Source = Arc<dyn error::Error + Send + Sync>;

/// The main error type for seekchat.
///
/// Variants that come from an HTTP status carry the server's message.  Variants that come from
/// the local side (I/O, decoding, the HTTP client) keep their cause reachable through
/// [`std::error::Error::source`].
#[derive(Clone, Debug)]
pub enum Error {
    /// An error status this crate has no dedicated variant for.
    Api {
        /// HTTP status code, or 500 for an error event inside a stream.
        status_code: u16,
        /// The `type` field of the error body.
        error_type: Option<String>,
        /// The `message` field of the error body, or the raw body.
        message: String,
    },

    /// HTTP 401: the API key is missing or wrong.
    Authentication {
        /// What the server or client said.
        message: String,
    },

    /// HTTP 403: the key may not use this resource.
    Permission {
        /// What the server said.
        message: String,
    },

    /// HTTP 404: unknown endpoint or model.
    NotFound {
        /// What the server said.
        message: String,
    },

    /// HTTP 402: the account is out of balance.
    InsufficientBalance {
        /// What the server said.
        message: String,
    },

    /// HTTP 429: too many requests.
    RateLimit {
        /// What the server said.
        message: String,
        /// The `retry-after` header, in seconds.
        retry_after: Option<u64>,
    },

    /// HTTP 400: the request body was malformed.
    BadRequest {
        /// What the server said.
        message: String,
        /// The offending field, if the server named one.
        param: Option<String>,
    },

    /// HTTP 408, or the client gave up waiting.
    Timeout {
        /// What happened.
        message: String,
        /// The configured timeout, in seconds.
        duration: Option<f64>,
    },

    /// The server could not be reached.
    Connection {
        /// What happened.
        message: String,
        /// The client's error.
        source: Option<Source>,
    },

    /// HTTP 500.
    InternalServer {
        /// What the server said.
        message: String,
    },

    /// HTTP 502, 503 or 504: the server is overloaded or down.
    ServiceUnavailable {
        /// What the server said.
        message: String,
        /// The `retry-after` header, in seconds.
        retry_after: Option<u64>,
    },

    /// A body or event could not be encoded or decoded as JSON.
    Serialization {
        /// What failed.
        message: String,
        /// The serde error.
        source: Option<Source>,
    },

    /// Local I/O failed.
    Io {
        /// What failed.
        message: String,
        /// The I/O error.
        source: Arc<io::Error>,
    },

    /// The HTTP client failed for a reason other than connecting or timing out.
    HttpClient {
        /// What failed.
        message: String,
        /// The client's error.
        source: Option<Source>,
    },

    /// HTTP 422: the parameters were well-formed but rejected.
    Validation {
        /// What the server said.
        message: String,
        /// The offending field, if the server named one.
        param: Option<String>,
    },

    /// The base URL could not be parsed or joined.
    Url {
        /// What failed.
        message: String,
        /// The parse error.
        source: Option<url::ParseError>,
    },

    /// The response body broke off while streaming.
    Streaming {
        /// What failed.
        message: String,
        /// The transport's error.
        source: Option<Source>,
    },

    /// Streamed bytes were not valid UTF-8.
    Encoding {
        /// What failed.
        message: String,
        /// The decoding error.
        source: Option<Source>,
    },
}

impl Error {
    /// An error status without a dedicated variant.
    pub fn api(status_code: u16, error_type: Option<String>, message: impl Into<String>) -> Self {
        Error::Api {
            status_code,
            error_type,
            message: message.into(),
        }
    }

    /// A 401, or a request attempted without a key.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// A 403.
    pub fn permission(message: impl Into<String>) -> Self {
        Error::Permission {
            message: message.into(),
        }
    }

    /// A 404.
    pub fn not_found(message: impl Into<String>) -> Self {
        Error::NotFound {
            message: message.into(),
        }
    }

    /// A 402.
    pub fn insufficient_balance(message: impl Into<String>) -> Self {
        Error::InsufficientBalance {
            message: message.into(),
        }
    }

    /// A 429, with the `retry-after` header if the server sent one.
    pub fn rate_limit(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// A 400, naming the offending field when known.
    pub fn bad_request(message: impl Into<String>, param: Option<String>) -> Self {
        Error::BadRequest {
            message: message.into(),
            param,
        }
    }

    /// A 408 or a client-side timeout.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// The endpoint could not be reached.
    pub fn connection(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Connection {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// A 500.
    pub fn internal_server(message: impl Into<String>) -> Self {
        Error::InternalServer {
            message: message.into(),
        }
    }

    /// A 502, 503 or 504.
    pub fn service_unavailable(message: impl Into<String>, retry_after: Option<u64>) -> Self {
        Error::ServiceUnavailable {
            message: message.into(),
            retry_after,
        }
    }

    /// JSON encoding or decoding failed.
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Serialization {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Local I/O failed.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Any other failure inside the HTTP client.
    pub fn http_client(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::HttpClient {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// A 422, or a setting rejected before any request is made.
    pub fn validation(message: impl Into<String>, param: Option<String>) -> Self {
        Error::Validation {
            message: message.into(),
            param,
        }
    }

    /// The base URL could not be parsed or joined.
    pub fn url(message: impl Into<String>, source: Option<url::ParseError>) -> Self {
        Error::Url {
            message: message.into(),
            source,
        }
    }

    /// The response body broke off mid-stream.
    pub fn streaming(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Streaming {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Streamed bytes were not valid UTF-8.
    pub fn encoding(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Encoding {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// True for a rejected or missing API key.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication { .. })
    }

    /// True for a 429.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimit { .. })
    }

    /// True for a server or client timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// True when the endpoint could not be reached.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    /// True when the body broke off mid-stream.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Error::Streaming { .. })
    }

    /// True for 5xx statuses, which usually clear up on their own.
    pub fn is_server_error(&self) -> bool {
        match self {
            Error::InternalServer { .. } | Error::ServiceUnavailable { .. } => true,
            Error::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// The HTTP status this error stands for, if it came from one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status_code, .. } => Some(*status_code),
            Error::BadRequest { .. } => Some(400),
            Error::InsufficientBalance { .. } => Some(402),
            Error::Permission { .. } => Some(403),
            Error::NotFound { .. } => Some(404),
            Error::Validation { .. } => Some(422),
            Error::RateLimit { .. } => Some(429),
            Error::InternalServer { .. } => Some(500),
            _ => None,
        }
    }

    fn message(&self) -> &str {
        match self {
            Error::Api { message, .. }
            | Error::Authentication { message }
            | Error::Permission { message }
            | Error::NotFound { message }
            | Error::InsufficientBalance { message }
            | Error::RateLimit { message, .. }
            | Error::BadRequest { message, .. }
            | Error::Timeout { message, .. }
            | Error::Connection { message, .. }
            | Error::InternalServer { message }
            | Error::ServiceUnavailable { message, .. }
            | Error::Serialization { message, .. }
            | Error::Io { message, .. }
            | Error::HttpClient { message, .. }
            | Error::Validation { message, .. }
            | Error::Url { message, .. }
            | Error::Streaming { message, .. }
            | Error::Encoding { message, .. } => message,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Error::Api {
                error_type: Some(error_type),
                ..
            } => error_type.as_str(),
            Error::Api { .. } => "API error",
            Error::Authentication { .. } => "Authentication error",
            Error::Permission { .. } => "Permission denied",
            Error::NotFound { .. } => "Not found",
            Error::InsufficientBalance { .. } => "Insufficient balance",
            Error::RateLimit { .. } => "Rate limit exceeded",
            Error::BadRequest { .. } => "Bad request",
            Error::Timeout { .. } => "Timed out",
            Error::Connection { .. } => "Connection error",
            Error::InternalServer { .. } => "Internal server error",
            Error::ServiceUnavailable { .. } => "Service unavailable",
            Error::Serialization { .. } => "Serialization error",
            Error::Io { .. } => "I/O error",
            Error::HttpClient { .. } => "HTTP client error",
            Error::Validation { .. } => "Invalid parameters",
            Error::Url { .. } => "Invalid URL",
            Error::Streaming { .. } => "Stream interrupted",
            Error::Encoding { .. } => "Encoding error",
        };
        write!(f, "{label}: {}", self.message())?;

        match self {
            Error::RateLimit {
                retry_after: Some(seconds),
                ..
            }
            | Error::ServiceUnavailable {
                retry_after: Some(seconds),
                ..
            } => write!(f, " (retry after {seconds}s)"),
            Error::BadRequest {
                param: Some(param), ..
            }
            | Error::Validation {
                param: Some(param), ..
            } => write!(f, " (parameter: {param})"),
            Error::Timeout {
                duration: Some(seconds),
                ..
            } => write!(f, " (after {seconds}s)"),
            _ => Ok(()),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::Serialization { source, .. }
            | Error::HttpClient { source, .. }
            | Error::Streaming { source, .. }
            | Error::Encoding { source, .. } => source
                .as_deref()
                .map(|e| e as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(&**source as &(dyn error::Error + 'static)),
            Error::Url { source, .. } => {
                source.as_ref().map(|e| e as &(dyn error::Error + 'static))
            }
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::serialization(err.to_string(), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::url(err.to_string(), Some(err))
    }
}

impl From<Utf8Error> for Error {
    fn from(err: Utf8Error) -> Self {
        Error::encoding(err.to_string(), Some(Box::new(err)))
    }
}

/// A specialized Result type for seekchat operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_includes_context() {
        let err = Error::rate_limit("slow down", Some(3));
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded: slow down (retry after 3s)"
        );

        let err = Error::api(418, Some("teapot".to_string()), "short and stout");
        assert_eq!(err.to_string(), "teapot: short and stout");
        assert_eq!(err.status_code(), Some(418));

        let err = Error::bad_request("missing field", Some("messages".to_string()));
        assert_eq!(
            err.to_string(),
            "Bad request: missing field (parameter: messages)"
        );
        assert_eq!(err.status_code(), Some(400));

        assert_eq!(
            Error::authentication("Authentication Fails").to_string(),
            "Authentication error: Authentication Fails"
        );
    }

    #[test]
    fn predicates() {
        assert!(Error::timeout("late", Some(1.5)).is_timeout());
        assert!(Error::service_unavailable("busy", None).is_server_error());
        assert!(Error::internal_server("oops").is_server_error());
        assert!(Error::api(503, None, "later").is_server_error());
        assert!(!Error::bad_request("nope", None).is_server_error());
        assert!(Error::streaming("dropped", None).is_streaming());
        assert!(Error::rate_limit("wait", None).is_rate_limit());
    }

    #[test]
    fn json_errors_keep_their_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(json_err);
        assert!(matches!(err, Error::Serialization { .. }));
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Serialization error: "));
    }

    #[test]
    fn errors_are_cloneable() {
        let err = Error::connection(
            "refused",
            Some(Box::new(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))),
        );
        let copy = err.clone();
        assert!(copy.is_connection());
        assert!(copy.source().is_some());
    }
}
