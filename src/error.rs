use crate::parse;
use reqwest::StatusCode;
use std::fmt::{self, Display, Formatter};

#[derive(Debug)]
pub enum Error {
    Parse(parse::Error),
    Request(reqwest::Error),
    Status(StatusCode),
    Unauthorized,
    InvalidProperty(String),
    Config(figment::Error),
    Url(url::ParseError),
}

impl Error {
    /// Whether the upstream page was never obtained or could not be read, as
    /// opposed to a caller mistake.
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Request(_) | Self::Status(_))
    }
}

impl From<parse::Error> for Error {
    fn from(e: parse::Error) -> Self {
        Self::Parse(e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e)
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Self::Config(e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::Url(e)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "Parse error: {e}"),
            Self::Request(e) => write!(f, "Request error: {e}"),
            Self::Status(status) => write!(f, "Upstream responded with {status}"),
            Self::Unauthorized => write!(f, "Upstream rejected the credentials"),
            Self::InvalidProperty(name) => write!(f, "Unknown substitution property: {name}"),
            Self::Config(e) => write!(f, "Config error: {e}"),
            Self::Url(e) => write!(f, "Url error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
