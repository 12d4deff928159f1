//! Defines the general error type for the crate and various conversions into it
use crate::settings::SettingKey;
use std::convert;
use std::fmt;

/// General error type for the crate
#[derive(Debug)]
pub enum Error {
    /// A required setting is empty, raised before any request is sent
    ConfigurationMissing(SettingKey),
    /// Response body could not be parsed as JSON
    Decode(serde_json::Error),
    InvalidConfigurationValue(String),
    InvalidCoordinate(String),
    Io(std::io::Error),
    /// The service answered with a non-success status code
    RequestError(reqwest::StatusCode, String),
    /// A response record is missing a required field or doesn't fit the layer schema
    SchemaViolation(String),
    /// Network level failure (DNS, TLS, timeout, connection reset, ...), the request URL is
    /// stripped because it carries the API key
    Transport(reqwest::Error),
    UrlParse(String),
    Yaml(serde_yaml::Error),
}

impl Error {
    /// Return true if the error was raised by the network transport or the remote service
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::RequestError(..))
    }
}

impl convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl convert::From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Error {
        Error::Transport(err.without_url())
    }
}

impl convert::From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigurationMissing(key) => write!(
                f,
                "Missing configuration for '{}', set it with `location-service config set {} <value>`",
                key.label(),
                key.as_str()
            ),
            Error::Decode(e) => write!(f, "Could not decode the service response as JSON: {}", e),
            Error::InvalidConfigurationValue(msg) => write!(f, "{}", msg),
            Error::InvalidCoordinate(msg) => write!(f, "Invalid coordinate: {}", msg),
            Error::Io(e) => write!(f, "{}", e),
            Error::RequestError(code, msg) => {
                write!(f, "Service request failed with code: {} - {}", code, msg)
            }
            Error::SchemaViolation(msg) => {
                write!(f, "Unexpected service response structure: {}", msg)
            }
            Error::Transport(e) => write!(f, "Network error occurred: {}", e),
            Error::UrlParse(msg) => write!(f, "Could not build URL: {}", msg),
            Error::Yaml(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {}
