//! Opening a book end to end: download, detect format, lay out, and resume.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::config::Config;
use crate::downloader::{Acquisition, ChunkDownloader};
use crate::error::{Error, Result};
use crate::format::{FormatResolver, ImageDescriptor, ResolvedFormat, load_dimensions};
use crate::layout::{FrontMatter, PaginatedText, Spread, TextPaginator, plan_spreads};
use crate::remote::RemoteChunkClient;
use crate::store::{
    KeyValueStore, Position, ReadingPosition, ReadingPositionStore, ReadingState,
};
use crate::types::{EventSender, LayoutMode, RemoteResource};

/// Looks up cover art for a book
#[async_trait]
pub trait CoverLookup: Send + Sync {
    /// Cover image URL, or `None` when the book has no cover
    async fn cover_url(&self, series_id: &str, book_id: &str) -> Result<Option<String>>;
}

/// What to open and how to lay it out
#[derive(Clone, Debug)]
pub struct OpenRequest {
    /// Series the book belongs to
    pub series_id: String,
    /// Book identifier within the series
    pub book_id: String,
    /// Remote file backing the book
    pub resource: RemoteResource,
    /// One or two pages per view
    pub mode: LayoutMode,
    /// Show the first image alone in double-page mode
    pub cover_priority: bool,
    /// Build a table of contents for text books
    pub generate_toc: bool,
}

impl OpenRequest {
    /// Single-page request with cover priority and a generated TOC
    pub fn new(
        series_id: impl Into<String>,
        book_id: impl Into<String>,
        resource: RemoteResource,
    ) -> Self {
        Self {
            series_id: series_id.into(),
            book_id: book_id.into(),
            resource,
            mode: LayoutMode::Single,
            cover_priority: true,
            generate_toc: true,
        }
    }

    /// Use `mode` for layout
    pub fn with_mode(mut self, mode: LayoutMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Laid-out content ready for rendering
#[derive(Clone, Debug)]
pub enum BookContent {
    /// Paginated plain text
    Text(PaginatedText),
    /// E-book package bytes for the e-book renderer
    Ebook {
        /// Original archive bytes
        payload: Vec<u8>,
    },
    /// Image pages grouped into spreads
    Images {
        /// Images with probed dimensions
        images: Vec<ImageDescriptor>,
        /// Spreads in reading order
        spreads: Vec<Spread>,
    },
    /// Handled by an external viewer
    External,
}

impl BookContent {
    /// Number of navigable pages; `None` when the renderer owns pagination
    pub fn page_count(&self) -> Option<usize> {
        match self {
            BookContent::Text(text) => Some(text.units.len()),
            BookContent::Images { images, .. } => Some(images.len()),
            BookContent::Ebook { .. } | BookContent::External => None,
        }
    }
}

/// An opened book and where to resume it
#[derive(Clone, Debug)]
pub struct OpenedBook {
    /// Laid-out content
    pub content: BookContent,
    /// Last saved position, if the book was read before
    pub resume: Option<ReadingPosition>,
}

/// Opens books and keeps their reading position saved
pub struct Reader {
    config: Arc<Config>,
    downloader: ChunkDownloader,
    paginator: TextPaginator,
    positions: ReadingPositionStore,
    covers: Option<Arc<dyn CoverLookup>>,
    open_book: Mutex<Option<(String, String)>>,
}

impl Reader {
    /// Build a reader from a validated config
    pub fn new(
        client: Arc<dyn RemoteChunkClient>,
        config: Config,
        kv: Arc<dyn KeyValueStore>,
        event_tx: EventSender,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let paginator = TextPaginator::new(&config.layout)?;
        let downloader = ChunkDownloader::new(client, Arc::clone(&config), event_tx.clone());
        let state = Arc::new(RwLock::new(ReadingState::default()));
        let positions = ReadingPositionStore::new(kv, state, event_tx);

        Ok(Self {
            config,
            downloader,
            paginator,
            positions,
            covers: None,
            open_book: Mutex::new(None),
        })
    }

    /// Use `covers` to find cover art for text books
    pub fn with_cover_lookup(mut self, covers: Arc<dyn CoverLookup>) -> Self {
        self.covers = Some(covers);
        self
    }

    /// Position store for the open book; consumers update its state as the reader moves
    pub fn positions(&self) -> &ReadingPositionStore {
        &self.positions
    }

    /// Download, resolve and lay out a book, restore its position and start auto-saving
    ///
    /// A book that is still open gets its final save and loses its auto-save timer before
    /// the new book's state is restored. A failed download leaves it open.
    pub async fn open<P>(&self, request: &OpenRequest, on_progress: P) -> Result<OpenedBook>
    where
        P: FnMut(u8) + Send,
    {
        let OpenRequest {
            series_id,
            book_id,
            resource,
            ..
        } = request;
        tracing::info!(%series_id, %book_id, resource_id = %resource.id, "opening book");

        let acquisition = self.downloader.download(resource, on_progress).await?;
        self.close_previous().await;

        let content = match acquisition {
            Acquisition::External => {
                tracing::info!(%book_id, "book opens in an external viewer");
                let resume = self.positions.load(series_id, book_id).await?;
                return Ok(OpenedBook {
                    content: BookContent::External,
                    resume,
                });
            }
            Acquisition::Text(text) => {
                let front = FrontMatter {
                    cover_url: self.find_cover(series_id, book_id).await,
                    generate_toc: request.generate_toc,
                };
                BookContent::Text(self.paginator.paginate_book(&text, request.mode, &front)?)
            }
            Acquisition::Buffer(buffer) => {
                let resolved = tokio::task::spawn_blocking(move || FormatResolver::resolve(buffer))
                    .await
                    .map_err(|e| {
                        Error::Io(std::io::Error::other(format!(
                            "archive inspection task failed: {}",
                            e
                        )))
                    })??;
                match resolved {
                    ResolvedFormat::Ebook { payload } => BookContent::Ebook { payload },
                    ResolvedFormat::Images { mut images } => {
                        load_dimensions(&mut images).await;
                        let spreads = plan_spreads(&images, request.mode, request.cover_priority);
                        BookContent::Images { images, spreads }
                    }
                }
            }
        };

        let resume = self.positions.load(series_id, book_id).await?;
        self.restore_state(&content, resume.as_ref()).await;
        self.positions
            .start_auto_save(series_id, book_id, self.config.persistence.auto_save_interval)
            .await?;
        *self.open_book.lock().await = Some((series_id.clone(), book_id.clone()));

        Ok(OpenedBook { content, resume })
    }

    /// Final save for the open book and stop auto-saving
    pub async fn close(&self, series_id: &str, book_id: &str) -> Result<()> {
        tracing::info!(%series_id, %book_id, "closing book");
        {
            let mut open = self.open_book.lock().await;
            if open
                .as_ref()
                .is_some_and(|(s, b)| s == series_id && b == book_id)
            {
                *open = None;
            }
        }
        self.positions.close_book(series_id, book_id).await
    }

    /// `(series, book)` currently open and auto-saving
    pub async fn open_book(&self) -> Option<(String, String)> {
        self.open_book.lock().await.clone()
    }

    async fn close_previous(&self) {
        let Some((series_id, book_id)) = self.open_book.lock().await.take() else {
            return;
        };
        tracing::debug!(%series_id, %book_id, "closing previous book");
        if let Err(e) = self.positions.close_book(&series_id, &book_id).await {
            tracing::warn!(%series_id, %book_id, error = %e, "Final save of previous book failed");
        }
    }

    async fn restore_state(&self, content: &BookContent, resume: Option<&ReadingPosition>) {
        let mut state = ReadingState::default();
        let saved_page = resume.map(|saved| match saved.position {
            Position::Number(n) if n >= 0.0 => n as usize,
            _ => saved.page,
        });
        match (content, content.page_count(), resume) {
            (BookContent::Images { images, spreads }, _, _) => {
                let page = saved_page.unwrap_or(0);
                let spread = spreads
                    .iter()
                    .find(|s| s.contains(page))
                    .or_else(|| spreads.last());
                if let Some(spread) = spread {
                    state.set_spread(*spread, images.len());
                }
            }
            (_, Some(total), _) => state.set_page(saved_page.unwrap_or(0), total),
            (_, None, Some(saved)) => {
                state.position = saved.position.clone();
                state.progress_percent = saved.progress_percent;
            }
            (_, None, None) => {}
        }
        *self.positions.state().write().await = state;
    }

    async fn find_cover(&self, series_id: &str, book_id: &str) -> Option<String> {
        let covers = self.covers.as_ref()?;
        match covers.cover_url(series_id, book_id).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%series_id, %book_id, error = %e, "Cover lookup failed, continuing without cover");
                None
            }
        }
    }
}
