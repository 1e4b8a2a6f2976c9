//! Error type for the persistent store.

/// Result alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by schema init, CRUD operations, and YAML import/export.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying SQLite connection or statement failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Checking out a pooled connection failed.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// YAML parsing or serialization failed.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Reading or writing the YAML file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A keyset with the same `(name, value_set)` already exists and is
    /// active (spec.md §4.6's unique constraint, §8 property P7).
    #[error("keyset '{name}' already exists in value set '{value_set}'")]
    DuplicateKeyset {
        /// Keyset name.
        name: String,
        /// Value set the duplicate was attempted in.
        value_set: String,
    },

    /// An OTA template with the same name already exists.
    #[error("template '{0}' already exists")]
    DuplicateTemplate(String),

    /// No active keyset matched `(name, value_set)`.
    #[error("keyset '{name}' not found in value set '{value_set}'")]
    KeysetNotFound {
        /// Keyset name.
        name: String,
        /// Value set searched.
        value_set: String,
    },

    /// No active template matched the given name.
    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    /// No message matched the given id.
    #[error("message {0} not found")]
    MessageNotFound(i64),

    /// A key was not the 16 or 24 bytes spec.md §3 allows.
    #[error("invalid key length: {0} bytes (expected 16 or 24)")]
    InvalidKeyLength(usize),

    /// A protocol name outside {SCP02, SCP03} was supplied.
    #[error("unsupported protocol: {0}")]
    InvalidProtocol(String),

    /// A hex string could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}
