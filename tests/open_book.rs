//! End-to-end tests: HTTP chunk endpoint -> reader -> laid-out book -> saved position
//!
//! The chunk endpoint is a wiremock server that slices an in-memory file.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{ChunkEndpoint, build_zip, png};
use reader_pipeline::config::{DownloadConfig, RetryConfig};
use reader_pipeline::{
    BookContent, Config, DownloadError, Error, Event, HttpChunkClient, KeyValueStore, LayoutMode,
    OpenRequest, Position, Reader, RemoteResource, SqliteStore, UnitKind, event_channel,
};
use tempfile::NamedTempFile;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn small_chunks() -> Config {
    Config {
        download: DownloadConfig {
            chunk_size: 128,
            single_request_threshold: 256,
            workers: 3,
            ..DownloadConfig::default()
        },
        retry: RetryConfig::immediate(3),
        ..Config::default()
    }
}

fn client_for(server: &MockServer) -> Arc<HttpChunkClient> {
    let endpoint = format!("{}/chunk", server.uri());
    Arc::new(HttpChunkClient::new(&endpoint, Duration::from_secs(5)).unwrap())
}

fn comic() -> Vec<u8> {
    build_zip(&[
        ("pages/010.png", png(30, 50)),
        ("pages/001.png", png(30, 50)),
        ("pages/002.png", png(80, 50)),
        ("pages/003.png", png(30, 50)),
        ("pages/004.png", png(30, 50)),
        ("__MACOSX/pages/._001.png", b"resource fork".to_vec()),
    ])
}

#[tokio::test]
async fn image_archive_is_downloaded_in_chunks_and_planned() {
    let archive = comic();
    let size = archive.len() as u64;
    assert!(size > 256, "fixture must take the chunked path");

    let server = MockServer::start().await;
    let (endpoint, hits) = ChunkEndpoint::new(archive);
    Mock::given(method("POST"))
        .and(path("/chunk"))
        .respond_with(endpoint)
        .mount(&server)
        .await;

    let (event_tx, mut events) = event_channel(1024);
    let reader = Reader::new(
        client_for(&server),
        small_chunks(),
        Arc::new(reader_pipeline::MemoryStore::new()),
        event_tx,
    )
    .unwrap();

    let resource = RemoteResource::new("file-1", size, "vol-1.cbz");
    let request = OpenRequest::new("series", "vol-1", resource).with_mode(LayoutMode::Double);
    let mut progress = Vec::new();
    let book = reader.open(&request, |p| progress.push(p)).await.unwrap();

    let BookContent::Images { images, spreads } = &book.content else {
        panic!("expected an image book");
    };
    let names: Vec<&str> = images.iter().map(|i| i.source.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "pages/001.png",
            "pages/002.png",
            "pages/003.png",
            "pages/004.png",
            "pages/010.png"
        ]
    );
    let groups: Vec<Vec<usize>> = spreads.iter().map(|s| s.indices()).collect();
    assert_eq!(groups, vec![vec![0], vec![1], vec![2, 3], vec![4]]);

    let chunks = size.div_ceil(128) as usize;
    assert_eq!(hits.load(Ordering::SeqCst), chunks);
    assert_eq!(progress.len(), chunks);
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));

    let mut completed = false;
    while let Ok(event) = events.try_recv() {
        if let Event::DownloadComplete { bytes, .. } = event {
            assert_eq!(bytes, size);
            completed = true;
        }
    }
    assert!(completed);

    reader.close("series", "vol-1").await.unwrap();
}

#[tokio::test]
async fn persistent_server_error_aborts_the_open() {
    let archive = comic();
    let size = archive.len() as u64;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "offset": 128 })))
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;
    let (endpoint, _hits) = ChunkEndpoint::new(archive);
    Mock::given(method("POST"))
        .respond_with(endpoint)
        .mount(&server)
        .await;

    let (event_tx, mut events) = event_channel(1024);
    let reader = Reader::new(
        client_for(&server),
        small_chunks(),
        Arc::new(reader_pipeline::MemoryStore::new()),
        event_tx,
    )
    .unwrap();

    let resource = RemoteResource::new("file-1", size, "vol-1.cbz");
    let request = OpenRequest::new("series", "vol-1", resource);
    let err = reader.open(&request, |_| {}).await.unwrap_err();

    let Error::Acquisition { resource_id, source, .. } = &err else {
        panic!("expected acquisition error, got {err:?}");
    };
    assert_eq!(resource_id, "file-1");
    assert!(matches!(
        source.as_ref(),
        Error::Download(DownloadError::RetriesExhausted { index: 1, attempts: 3, .. })
    ));

    let failed = std::iter::from_fn(|| events.try_recv().ok())
        .any(|e| matches!(e, Event::DownloadFailed { .. }));
    assert!(failed);
}

#[tokio::test]
async fn text_book_resumes_from_sqlite_after_restart() {
    let text = [
        "Prologue",
        "It was a quiet morning.",
        "Chapter 1",
        "The train left at dawn & nobody noticed.",
        "Chapter 2",
        "By evening <everything> had changed.",
    ]
    .join("\n\n");

    let server = MockServer::start().await;
    let (endpoint, hits) = ChunkEndpoint::new(text.clone().into_bytes());
    Mock::given(method("POST"))
        .respond_with(endpoint)
        .mount(&server)
        .await;

    let db = NamedTempFile::new().unwrap();
    let request = OpenRequest::new(
        "series",
        "novel",
        RemoteResource::new("file-2", text.len() as u64, "novel.txt"),
    );

    {
        let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(db.path()).await.unwrap());
        let (event_tx, _events) = event_channel(64);
        let reader = Reader::new(client_for(&server), small_chunks(), kv, event_tx).unwrap();

        let book = reader.open(&request, |_| {}).await.unwrap();
        let BookContent::Text(paginated) = &book.content else {
            panic!("expected text");
        };
        assert!(book.resume.is_none());
        assert_eq!(paginated.units[0].kind, UnitKind::Toc);
        assert_eq!(paginated.toc.len(), 3);
        assert!(paginated.units[1].renderable.contains("dawn &amp; nobody"));
        assert!(paginated.units[1].renderable.contains("&lt;everything&gt;"));

        let total = paginated.units.len();
        reader.positions().state().write().await.set_page(total - 1, total);
        reader.close("series", "novel").await.unwrap();
        assert!(reader.positions().is_read("series", "novel").await.unwrap());
    }
    assert_eq!(hits.load(Ordering::SeqCst), 1, "text is fetched with one request");

    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(db.path()).await.unwrap());
    let (event_tx, _events) = event_channel(64);
    let reader = Reader::new(client_for(&server), small_chunks(), kv, event_tx).unwrap();
    let book = reader.open(&request, |_| {}).await.unwrap();

    let resume = book.resume.expect("position should survive restart");
    assert_eq!(resume.position, Position::Number(1.0));
    assert_eq!(resume.progress_percent, 100.0);
    reader.close("series", "novel").await.unwrap();
}
