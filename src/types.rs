//! Core types for reader-pipeline

use serde::{Deserialize, Serialize};

/// Opaque identifier of a remote resource
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    /// Create a new ResourceId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A remote file to acquire
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResource {
    /// Opaque id understood by the remote chunk client
    pub id: ResourceId,
    /// Declared size in bytes (None or 0 = unknown)
    pub size: Option<u64>,
    /// Original file name, used for dispatch by extension
    pub source_name: Option<String>,
}

impl RemoteResource {
    /// Create a resource with a known size and file name
    pub fn new(id: impl Into<ResourceId>, size: u64, source_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            size: Some(size),
            source_name: Some(source_name.into()),
        }
    }

    /// Declared size, treating zero as unknown
    pub fn known_size(&self) -> Option<u64> {
        self.size.filter(|&s| s > 0)
    }
}

/// Page layout used by both the text paginator and the spread planner
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// One page (or image) at a time
    #[default]
    Single,
    /// Two pages (or images) side by side
    Double,
}

/// Reading direction for spread display order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingDirection {
    /// Left to right
    #[default]
    LeftToRight,
    /// Right to left (manga order)
    RightToLeft,
}

/// Event emitted by the pipeline
///
/// Consumers subscribe via a `tokio::sync::broadcast` receiver; the UI layer drives
/// progress bars and completion badges from these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Chunk download progress
    DownloadProgress {
        /// Resource being downloaded
        resource_id: ResourceId,
        /// Chunks completed so far
        completed: usize,
        /// Total number of chunks
        total: usize,
        /// Rounded percentage (0 to 100)
        percent: u8,
    },

    /// All chunks received and reassembled
    DownloadComplete {
        /// Resource that was downloaded
        resource_id: ResourceId,
        /// Size of the reassembled buffer
        bytes: u64,
    },

    /// Download aborted
    DownloadFailed {
        /// Resource that failed
        resource_id: ResourceId,
        /// Error message
        error: String,
        /// Last progress percentage reached
        percent: u8,
    },

    /// A reading position was persisted
    PositionSaved {
        /// Series identifier
        series_id: String,
        /// Book identifier
        book_id: String,
        /// Progress percentage at save time
        progress_percent: f64,
    },

    /// A book reached 100% for the first time
    BookCompleted {
        /// Series identifier
        series_id: String,
        /// Book identifier
        book_id: String,
    },
}

/// Sender half of the event bus shared by pipeline components
pub type EventSender = tokio::sync::broadcast::Sender<Event>;

/// Create an event bus with room for `capacity` undelivered events (at least one)
pub fn event_channel(capacity: usize) -> (EventSender, tokio::sync::broadcast::Receiver<Event>) {
    tokio::sync::broadcast::channel(capacity.max(1))
}
