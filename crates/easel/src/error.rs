use std::{fmt::Display, io, result::Result as StdResult};

use thiserror::Error;

/// Result type for easel operations.
pub type Result<T> = StdResult<T, Error>;

/// Core error type.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum Error {
    /// The model changed during a redraw, or the view was drawn outside one.
    #[error("MVC Violation: {0}")]
    MvcViolation(String),
    /// A user callback failed.
    #[error("{0}")]
    User(String),
    /// A user callback panicked.
    #[error("panic: {0}")]
    Panic(String),
    /// Invalid configuration access.
    #[error("configuration: {0}")]
    Config(String),
    /// Malformed or unloadable image arguments.
    #[error("resource: {0}")]
    Resource(String),
    /// Backend failure.
    #[error("host: {0}")]
    Host(String),
    /// The model nests too deeply to fingerprint.
    #[error("fingerprint: model nesting exceeds {0} levels (is the model cyclic?)")]
    Fingerprint(usize),
    /// Internal error.
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// Construct a user error from anything displayable. Use this to report
    /// failures from inside application callbacks:
    ///
    /// ```
    /// # use easel::error::{Error, Result};
    /// fn parse(s: &str) -> Result<u32> {
    ///     s.parse().map_err(Error::user)
    /// }
    /// assert!(parse("x").is_err());
    /// ```
    pub fn user(e: impl Display) -> Self {
        Self::User(e.to_string())
    }

    /// Construct an MVC violation.
    pub fn mvc(msg: impl Into<String>) -> Self {
        Self::MvcViolation(msg.into())
    }

    /// Is this an MVC violation?
    pub fn is_mvc_violation(&self) -> bool {
        matches!(self, Self::MvcViolation(_))
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Host(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Self::Resource(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            Error::mvc("you may not change the model").to_string(),
            "MVC Violation: you may not change the model"
        );
        assert_eq!(Error::user("boom").to_string(), "boom");
        assert!(Error::mvc("x").is_mvc_violation());
        assert!(!Error::user("x").is_mvc_violation());
    }
}
