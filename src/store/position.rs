//! Bookmarks, progress records and the auto-save timer.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::layout::Spread;
use crate::types::{Event, EventSender};

use super::KeyValueStore;

/// Resume marker: a page index / percentage, or a format-specific locator string
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    /// Numeric position (unit index for text and images)
    Number(f64),
    /// Opaque locator supplied by the e-book renderer
    Locator(String),
}

impl Default for Position {
    fn default() -> Self {
        Position::Number(0.0)
    }
}

/// A saved bookmark for one book
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPosition {
    /// Series the book belongs to
    pub series_id: String,
    /// Book identifier within the series
    pub book_id: String,
    /// Where to resume
    pub position: Position,
    /// Progress at save time (0 to 100)
    pub progress_percent: f64,
    /// Page (content unit or image) index
    pub page: usize,
    /// Total pages at save time
    pub total_pages: usize,
    /// When the bookmark was written
    pub timestamp: DateTime<Utc>,
}

/// Per-book progress stored under the series progress key
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Progress (0 to 100)
    pub progress_percent: f64,
    /// Current page index
    pub page: usize,
    /// Total pages
    pub total_pages: usize,
    /// When the record was written
    pub updated_at: DateTime<Utc>,
}

/// Live reading state of the open book, updated by the consumer as the reader moves
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadingState {
    /// Current resume marker
    pub position: Position,
    /// Current page index
    pub page: usize,
    /// Total pages in the current layout
    pub total_pages: usize,
    /// Current progress (0 to 100)
    pub progress_percent: f64,
}

impl ReadingState {
    /// Move to `page` of `total_pages`; the last page is 100%
    pub fn set_page(&mut self, page: usize, total_pages: usize) {
        let page = page.min(total_pages.saturating_sub(1));
        self.page = page;
        self.total_pages = total_pages;
        self.position = Position::Number(page as f64);
        self.progress_percent = match total_pages {
            0 => 0.0,
            1 => 100.0,
            n => page as f64 * 100.0 / (n - 1) as f64,
        };
    }

    /// Move to an image spread of `total_images`
    ///
    /// The spread's first image is the resume position; progress counts through its last
    /// image, so a closing pair reaches 100%.
    pub fn set_spread(&mut self, spread: Spread, total_images: usize) {
        self.set_page(spread.last(), total_images);
        let first = spread.first().min(self.page);
        self.page = first;
        self.position = Position::Number(first as f64);
    }

    /// Record a renderer-reported locator and percentage (e-books)
    pub fn set_locator(&mut self, locator: impl Into<String>, percent: f64) {
        self.position = Position::Locator(locator.into());
        self.progress_percent = percent.clamp(0.0, 100.0);
    }

    /// Whether the reader has moved off the initial zero progress
    pub fn has_progress(&self) -> bool {
        self.progress_percent > 0.0
    }
}

/// Reading state shared between the consumer and the store
pub type SharedReadingState = Arc<RwLock<ReadingState>>;

struct AutoSave {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Persists reading positions and progress for `(series, book)` pairs
///
/// Cloning shares the underlying store, reading state and auto-save timer.
#[derive(Clone)]
pub struct ReadingPositionStore {
    kv: Arc<dyn KeyValueStore>,
    state: SharedReadingState,
    event_tx: EventSender,
    auto_save: Arc<Mutex<Option<AutoSave>>>,
}

impl ReadingPositionStore {
    /// Create a store writing to `kv` and reading live progress from `state`
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        state: SharedReadingState,
        event_tx: EventSender,
    ) -> Self {
        Self {
            kv,
            state,
            event_tx,
            auto_save: Arc::new(Mutex::new(None)),
        }
    }

    /// The live reading state this store snapshots
    pub fn state(&self) -> &SharedReadingState {
        &self.state
    }

    /// Save `position` for a book, overwriting its previous bookmark
    pub async fn save(
        &self,
        series_id: &str,
        book_id: &str,
        position: Position,
    ) -> Result<ReadingPosition> {
        let snapshot = self.state.read().await.clone();
        let record = ReadingPosition {
            series_id: series_id.to_string(),
            book_id: book_id.to_string(),
            position,
            progress_percent: snapshot.progress_percent,
            page: snapshot.page,
            total_pages: snapshot.total_pages,
            timestamp: Utc::now(),
        };

        let key = bookmark_key(series_id);
        let mut bookmarks: BTreeMap<String, ReadingPosition> = self.read_json(&key).await?;
        bookmarks.insert(book_id.to_string(), record.clone());
        self.write_json(&key, &bookmarks).await?;

        tracing::debug!(
            series_id,
            book_id,
            progress = record.progress_percent,
            "saved reading position"
        );
        self.event_tx
            .send(Event::PositionSaved {
                series_id: series_id.to_string(),
                book_id: book_id.to_string(),
                progress_percent: record.progress_percent,
            })
            .ok();
        Ok(record)
    }

    /// Save the live position from the shared reading state
    pub async fn save_current(&self, series_id: &str, book_id: &str) -> Result<ReadingPosition> {
        let position = self.state.read().await.position.clone();
        self.save(series_id, book_id, position).await
    }

    /// Saved bookmark for a book, if any
    pub async fn load(&self, series_id: &str, book_id: &str) -> Result<Option<ReadingPosition>> {
        let mut bookmarks: BTreeMap<String, ReadingPosition> =
            self.read_json(&bookmark_key(series_id)).await?;
        Ok(bookmarks.remove(book_id))
    }

    /// Persist live progress for a book and mark it read on reaching 100%
    ///
    /// The read mark is written once; later updates at 100% leave it untouched and do not
    /// publish another [`Event::BookCompleted`].
    pub async fn update_progress(&self, series_id: &str, book_id: &str) -> Result<ProgressRecord> {
        let snapshot = self.state.read().await.clone();
        let record = ProgressRecord {
            progress_percent: snapshot.progress_percent,
            page: snapshot.page,
            total_pages: snapshot.total_pages,
            updated_at: Utc::now(),
        };

        let key = progress_key(series_id);
        let mut progress: BTreeMap<String, ProgressRecord> = self.read_json(&key).await?;
        progress.insert(book_id.to_string(), record.clone());
        self.write_json(&key, &progress).await?;

        if record.progress_percent >= 100.0 {
            self.mark_read(series_id, book_id).await?;
        }
        Ok(record)
    }

    /// Stored progress record for a book, if any
    pub async fn load_progress(
        &self,
        series_id: &str,
        book_id: &str,
    ) -> Result<Option<ProgressRecord>> {
        let mut progress: BTreeMap<String, ProgressRecord> =
            self.read_json(&progress_key(series_id)).await?;
        Ok(progress.remove(book_id))
    }

    /// Whether a book has been marked as read
    pub async fn is_read(&self, series_id: &str, book_id: &str) -> Result<bool> {
        let read: BTreeSet<String> = self.read_json(&read_key(series_id)).await?;
        Ok(read.contains(book_id))
    }

    async fn mark_read(&self, series_id: &str, book_id: &str) -> Result<()> {
        let key = read_key(series_id);
        let mut read: BTreeSet<String> = self.read_json(&key).await?;
        if !read.insert(book_id.to_string()) {
            return Ok(());
        }
        self.write_json(&key, &read).await?;

        tracing::info!(series_id, book_id, "book marked as read");
        self.event_tx
            .send(Event::BookCompleted {
                series_id: series_id.to_string(),
                book_id: book_id.to_string(),
            })
            .ok();
        Ok(())
    }

    /// Start saving the live position every `interval`, replacing any running timer
    ///
    /// Ticks are skipped while the live progress is still zero.
    pub async fn start_auto_save(
        &self,
        series_id: &str,
        book_id: &str,
        interval: Duration,
    ) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::InvalidInput(
                "auto-save interval must be greater than zero".to_string(),
            ));
        }
        self.stop_auto_save().await;

        let cancel = CancellationToken::new();
        let store = self.clone();
        let token = cancel.clone();
        let series_id = series_id.to_string();
        let book_id = book_id.to_string();

        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !store.state.read().await.has_progress() {
                            tracing::trace!(%series_id, %book_id, "no progress yet, skipping auto-save");
                            continue;
                        }
                        if let Err(e) = store.persist(&series_id, &book_id).await {
                            tracing::warn!(%series_id, %book_id, error = %e, "Auto-save failed");
                        }
                    }
                    _ = token.cancelled() => {
                        break;
                    }
                }
            }
        });

        *self.auto_save.lock().await = Some(AutoSave { cancel, task });
        tracing::debug!(?interval, "auto-save started");
        Ok(())
    }

    /// Cancel the auto-save timer and wait for it to exit
    pub async fn stop_auto_save(&self) {
        let Some(auto_save) = self.auto_save.lock().await.take() else {
            return;
        };
        auto_save.cancel.cancel();
        if let Err(e) = auto_save.task.await {
            tracing::warn!(error = %e, "auto-save task ended abnormally");
        }
    }

    /// Whether an auto-save timer is running
    pub async fn is_auto_saving(&self) -> bool {
        self.auto_save.lock().await.is_some()
    }

    /// Final save and progress update for a book being closed, then stop the timer
    pub async fn close_book(&self, series_id: &str, book_id: &str) -> Result<()> {
        let result = self.persist(series_id, book_id).await;
        self.stop_auto_save().await;
        result
    }

    async fn persist(&self, series_id: &str, book_id: &str) -> Result<()> {
        self.save_current(series_id, book_id).await?;
        self.update_progress(series_id, book_id).await?;
        Ok(())
    }

    async fn read_json<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.kv.get(key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(T::default()),
        }
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.kv.set(key, &raw).await
    }
}

fn bookmark_key(series_id: &str) -> String {
    format!("bookmark_{series_id}")
}

fn progress_key(series_id: &str) -> String {
    format!("progress_{series_id}")
}

fn read_key(series_id: &str) -> String {
    format!("read_{series_id}")
}
