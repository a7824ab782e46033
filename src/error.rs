use std::fmt::{Debug, Display, Formatter};
use std::num::TryFromIntError;

use config::ConfigError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, PartialEq)]
pub enum Error {
    Internal(String),
    /// Bad input from the user or the configuration.
    Value(String),
    /// The translation table and the pager disagree about a page. Never
    /// recoverable, the simulated address space is already inconsistent.
    Invariant(String),
    NoFreeFrame,
}

/// Build an `Error::Value` from a format string.
#[macro_export]
macro_rules! value_err {
    ($($arg:tt)*) => {
        $crate::error::Error::Value(format!($($arg)*))
    };
}

/// Build an `Error::Invariant` from a format string.
#[macro_export]
macro_rules! invariant_err {
    ($($arg:tt)*) => {
        $crate::error::Error::Invariant(format!($($arg)*))
    };
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Internal(s) | Error::Value(s) => {
                write!(f, "{}", s)
            }
            Error::Invariant(s) => write!(f, "invariant violated: {}", s),
            Error::NoFreeFrame => write!(f, "no free frame available"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Value(err.to_string())
    }
}

impl From<log::SetLoggerError> for Error {
    fn from(err: log::SetLoggerError) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<log::ParseLevelError> for Error {
    fn from(err: log::ParseLevelError) -> Self {
        Error::Value(err.to_string())
    }
}
