use thiserror::Error;

/// Coarse classification of a [`KeyschemaError`], used when mapping an abort
/// to a caller-facing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed JSON, wrong token shape or tokenizer out of capacity.
    Structural,
    /// The document is well formed but does not fit the registered schema.
    Semantic,
    /// A store primitive failed or returned something unreadable.
    Backend,
    /// Configuration, I/O and lock failures outside of a request.
    Internal,
}

#[derive(Error, Debug)]
pub enum KeyschemaError {
    #[error("Parse error: {message}")]
    Parse { message: String, line: Option<usize>, col: Option<usize> },
    #[error("json input is invalid: {0}")]
    InvalidInput(String),
    #[error("not enough tokens provided (limit is {limit})")]
    TokenLimit { limit: usize },
    #[error("key or value not found in schema: {member}")]
    MemberNotFound { member: String },
    #[error("the query has too many keys for dimension '{dimension}'")]
    TooManyValues { dimension: String },
    #[error("key is expected to have a single value: {key}")]
    SingleValueExpected { key: String },
    #[error("key does not match the schema: {key}")]
    KeyRejected { key: String },
    #[error("wrong number of arguments for '{command}'")]
    WrongArity { command: String },
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("key '{key}' does not exist")]
    MissingKey { key: String },
    #[error("value '{value}' of key '{key}' is not numeric")]
    NotNumeric { key: String, value: String },
    #[error("Config error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl KeyschemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } | Self::InvalidInput(_) | Self::TokenLimit { .. } => {
                ErrorKind::Structural
            }
            Self::MemberNotFound { .. }
            | Self::TooManyValues { .. }
            | Self::SingleValueExpected { .. }
            | Self::KeyRejected { .. }
            | Self::WrongArity { .. }
            | Self::UnknownCommand(_) => ErrorKind::Semantic,
            Self::Store(_) | Self::MissingKey { .. } | Self::NotNumeric { .. } => {
                ErrorKind::Backend
            }
            Self::Config(_) | Self::Io(_) | Self::Lock(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, KeyschemaError>;

// Helper conversions
impl From<rusqlite::Error> for KeyschemaError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<config::ConfigError> for KeyschemaError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
