//! Common test utilities for reader-pipeline integration tests

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use wiremock::{Request, Respond, ResponseTemplate};

/// Serves base64 slices of an in-memory file the way the chunk endpoint does
pub struct ChunkEndpoint {
    data: Arc<Vec<u8>>,
    hits: Arc<AtomicUsize>,
}

impl ChunkEndpoint {
    pub fn new(data: Vec<u8>) -> (Self, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let endpoint = Self {
            data: Arc::new(data),
            hits: hits.clone(),
        };
        (endpoint, hits)
    }
}

impl Respond for ChunkEndpoint {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.hits.fetch_add(1, Ordering::SeqCst);
        let body: serde_json::Value = request.body_json().unwrap();
        let offset = body["offset"].as_u64().unwrap() as usize;
        let length = body["length"].as_u64().unwrap() as usize;

        let start = offset.min(self.data.len());
        let end = (offset + length).min(self.data.len());
        let data = STANDARD.encode(&self.data[start..end]);
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": data }))
    }
}

/// Build a ZIP archive from `(name, bytes)` entries
pub fn build_zip(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Encode a blank PNG of the given size
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbImage::new(width, height)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}
