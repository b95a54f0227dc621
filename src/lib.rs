//! # reader-pipeline
//!
//! Content-acquisition and layout core for a reading application.
//!
//! ## Design Philosophy
//!
//! reader-pipeline is designed to be:
//! - **Resilient** - Large files arrive as retried chunks fetched by a bounded worker pool
//! - **Format-aware** - Plain text, e-book packages and image archives are told apart automatically
//! - **Library-first** - No UI; consumers render the pages and spreads it produces
//! - **Event-driven** - Download progress and saved positions are published on a broadcast bus
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use reader_pipeline::{
//!     Config, HttpChunkClient, MemoryStore, OpenRequest, Reader, RemoteResource, event_channel,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpChunkClient::new("https://files.example.com/chunk", Duration::from_secs(30))?;
//!     let (event_tx, mut events) = event_channel(256);
//!     let reader = Reader::new(
//!         Arc::new(client),
//!         Config::default(),
//!         Arc::new(MemoryStore::new()),
//!         event_tx,
//!     )?;
//!
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let resource = RemoteResource::new("file-42", 48 * 1024 * 1024, "volume-01.cbz");
//!     let request = OpenRequest::new("series-7", "volume-01", resource);
//!     let book = reader.open(&request, |percent| println!("{percent}%")).await?;
//!     println!("pages: {:?}", book.content.page_count());
//!
//!     reader.close("series-7", "volume-01").await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Chunked remote download (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Format detection and archive resolution
pub mod format;
/// Text pagination and image spread planning
pub mod layout;
/// Open-book facade
pub mod reader;
/// Remote chunk endpoint clients
pub mod remote;
/// Retry logic with backoff
pub mod retry;
/// Key-value persistence and reading positions
pub mod store;
/// Core shared types and events
pub mod types;

pub use config::Config;
pub use downloader::{Acquisition, ChunkDownloader};
pub use error::{DatabaseError, DownloadError, Error, Result};
pub use format::{FormatResolver, ImageDescriptor, ResolvedFormat};
pub use layout::{
    ContentUnit, Navigation, PaginatedText, Spread, SpreadNavigator, TextPaginator, TocEntry,
    UnitKind,
};
pub use reader::{BookContent, CoverLookup, OpenRequest, OpenedBook, Reader};
pub use remote::{ChunkPayload, HttpChunkClient, RemoteChunkClient};
pub use store::{
    KeyValueStore, MemoryStore, Position, ReadingPosition, ReadingPositionStore, ReadingState,
    SqliteStore,
};
pub use types::{
    Event, EventSender, LayoutMode, ReadingDirection, RemoteResource, ResourceId, event_channel,
};
