use std::fmt;

/// Classification carried by a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind
{   /// Caller arguments violate the tool schema
    ValidationError
  , /// Network failure, non-success status or malformed reply
    UpstreamError
  , /// Missing or invalid process configuration
    ConfigurationError
  , /// Stdio transport or framing failure
    TransportError
}

impl fmt::Display for ErrorKind
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   let name = match self
        {   ErrorKind::ValidationError => "ValidationError"
          , ErrorKind::UpstreamError => "UpstreamError"
          , ErrorKind::ConfigurationError => "ConfigurationError"
          , ErrorKind::TransportError => "TransportError"
        };
        f.write_str(name)
    }
}

/// Custom error type for gpt5-server operations
/// Implements Clone so failures can be carried inside results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// A tool argument failed validation
    Validation
    {   field: String
      , reason: String
    }
  , /// HTTP request could not be completed
    HttpError(String)
  , /// Upstream API returned a non-success status
    ApiError(String)
  , /// Failed to parse the upstream reply
    ParseError(String)
  , /// Invalid or missing configuration
    InvalidConfiguration(String)
  , /// Stdio read/write failure
    Io(String)
}

impl Error
{   /// Shorthand for a validation failure on `field`
    pub fn validation(
      field: impl Into<String>
    , reason: impl Into<String>
    ) -> Self
    {   Error::Validation
        {   field: field.into()
          , reason: reason.into()
        }
    }

    /// Error kind reported to the caller
    pub fn kind(&self) -> ErrorKind
    {   match self
        {   Error::Validation { .. } => ErrorKind::ValidationError
          , Error::HttpError(_)
          | Error::ApiError(_)
          | Error::ParseError(_) => ErrorKind::UpstreamError
          , Error::InvalidConfiguration(_) => {
              ErrorKind::ConfigurationError
            }
          , Error::Io(_) => ErrorKind::TransportError
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Validation { field, reason } => {
              write!(f, "{}: {}", field, reason)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "{}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Malformed response: {}", msg)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Io(msg) => {
              write!(f, "IO error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::Io(format!("JSON framing: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
