//! Error types for reader-pipeline
//!
//! This module provides error handling for the whole pipeline, including:
//! - Transport-level failures raised by remote chunk clients
//! - Download orchestration errors (unknown size, exhausted retries, reassembly gaps)
//! - Format resolution and layout input errors
//! - Persistence errors from the key-value backends

use thiserror::Error;

/// Result type alias for reader-pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for reader-pipeline
///
/// Each variant carries enough context to build a user-facing failure message.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.chunk_size")
        key: Option<String>,
    },

    /// Transient transport failure reported by a remote chunk client
    #[error("transport error: {0}")]
    Transport(String),

    /// The request succeeded but carried no payload
    #[error("empty response for {resource_id} at offset {offset} (length {length})")]
    EmptyResponse {
        /// Resource the chunk belongs to
        resource_id: String,
        /// Byte offset of the requested chunk
        offset: u64,
        /// Requested chunk length
        length: u64,
    },

    /// HTTP client error
    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Download orchestration error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// A terminal acquisition failure, annotated with how far the download got
    #[error("failed to acquire {resource_id} at {percent}%: {source}")]
    Acquisition {
        /// Resource that was being downloaded
        resource_id: String,
        /// Last progress percentage reported before the failure
        percent: u8,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Neither an e-book marker nor any image entry was found
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Archive container could not be read
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Malformed input handed to a layout algorithm
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Chunk payload was not valid base64
    #[error("payload decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The chunked path needs a positive declared size
    #[error("size of {resource_id} is unknown; chunked download requires a known size")]
    SizeUnknown {
        /// Resource whose size was missing or zero
        resource_id: String,
    },

    /// A chunk failed on every attempt of the retry budget
    #[error("chunk {index} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Index of the failed chunk
        index: usize,
        /// Number of attempts made
        attempts: u32,
        /// Last error seen
        #[source]
        source: Box<Error>,
    },

    /// Reassembly found no result for a chunk
    #[error("chunk {index} is missing from the reassembled buffer")]
    MissingChunk {
        /// Index of the missing chunk
        index: usize,
    },

    /// Reassembled length does not match the declared size
    #[error("reassembled {actual} bytes but the resource declares {expected}")]
    SizeMismatch {
        /// Declared size
        expected: u64,
        /// Bytes actually assembled
        actual: u64,
    },

    /// A worker task panicked or was aborted
    #[error("download worker failed: {0}")]
    WorkerPanicked(String),
}

impl Error {
    /// Short machine-readable code for the error kind
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Transport(_) | Error::Http(_) => "transport_error",
            Error::EmptyResponse { .. } => "empty_response",
            Error::Download(DownloadError::SizeUnknown { .. }) => "size_unknown",
            Error::Download(DownloadError::RetriesExhausted { .. }) => "retries_exhausted",
            Error::Download(_) => "download_error",
            Error::Acquisition { source, .. } => source.code(),
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::Archive(_) => "archive_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Serialization(_) => "serialization_error",
            Error::Decode(_) => "decode_error",
            Error::Io(_) => "io_error",
        }
    }
}
