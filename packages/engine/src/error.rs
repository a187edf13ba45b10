use merge_parser::ParseError;
use thiserror::Error;

pub type MergeResult<T> = Result<T, MergeError>;

/// Failures reported by a [`FetchProvider`](crate::FetchProvider)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Nothing found at '{locator}'")]
    NotFound { locator: String },

    #[error("Failed to read '{locator}': {message}")]
    Io { locator: String, message: String },

    #[error("Request for '{locator}' failed with status {status}")]
    Status { locator: String, status: u16 },

    #[error("Request for '{locator}' failed: {message}")]
    Request { locator: String, message: String },

    #[error("Content of '{locator}' is not valid JSON: {message}")]
    InvalidJson { locator: String, message: String },

    #[error("'{locator}' points outside the site root")]
    OutsideRoot { locator: String },
}

impl FetchError {
    pub fn not_found(locator: impl Into<String>) -> Self {
        Self::NotFound {
            locator: locator.into(),
        }
    }

    pub fn io(locator: impl Into<String>, message: impl ToString) -> Self {
        Self::Io {
            locator: locator.into(),
            message: message.to_string(),
        }
    }

    pub fn request(locator: impl Into<String>, message: impl ToString) -> Self {
        Self::Request {
            locator: locator.into(),
            message: message.to_string(),
        }
    }

    pub fn locator(&self) -> &str {
        match self {
            Self::NotFound { locator }
            | Self::OutsideRoot { locator }
            | Self::Io { locator, .. }
            | Self::Status { locator, .. }
            | Self::Request { locator, .. }
            | Self::InvalidJson { locator, .. } => locator,
        }
    }
}

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Cannot resolve '{path}': {reason}")]
    PathResolution { path: String, reason: String },

    #[error("merge-repeat=\"{path}\" needs exactly one child element, found {found}")]
    RepeaterShape { path: String, found: usize },

    #[error("merge-repeat=\"{path}\" resolved to {found}, expected a sequence")]
    NotIterable { path: String, found: &'static str },

    #[error("Interpolation failed: {message}")]
    Interpolation { message: String },

    #[error("Generated markup could not be parsed: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl MergeError {
    pub fn path(path: &str, reason: impl Into<String>) -> Self {
        Self::PathResolution {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn interpolation(message: impl Into<String>) -> Self {
        Self::Interpolation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Errors that abort a whole pass rather than a single branch
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Configuration { .. })
    }
}
