//! Image entries extracted from archives and their dimension probing.

use std::io::Cursor;
use std::sync::Arc;

/// Raster-image extensions recognised inside archives
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp", "avif"];

/// Retrievable in-memory blob of one archive entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSource {
    /// Entry path inside the archive
    pub name: String,
    /// Entry bytes (shared, cheap to clone)
    pub data: Arc<Vec<u8>>,
}

impl ImageSource {
    /// MIME type derived from the entry extension
    pub fn mime_type(&self) -> &'static str {
        match extension(&self.name).as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("bmp") => "image/bmp",
            Some("avif") => "image/avif",
            _ => "application/octet-stream",
        }
    }
}

/// An image page with its pixel dimensions, once probed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Blob the image is read from
    pub source: ImageSource,
    /// Width in pixels (0 until loaded)
    pub width: u32,
    /// Height in pixels (0 until loaded)
    pub height: u32,
    /// Whether the dimensions were read successfully
    pub loaded: bool,
}

impl ImageDescriptor {
    /// Descriptor with unknown dimensions
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            source: ImageSource {
                name: name.into(),
                data: Arc::new(data),
            },
            width: 0,
            height: 0,
            loaded: false,
        }
    }

    /// Descriptor with known dimensions and no backing data
    pub fn with_dimensions(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            loaded: true,
            ..Self::new(name, Vec::new())
        }
    }

    /// Wider than tall
    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

pub(crate) fn extension(name: &str) -> Option<String> {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether an archive entry name carries a recognised image extension
pub fn is_image_name(name: &str) -> bool {
    extension(name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Read width and height from the image header without decoding pixels
pub fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// Probe every image header on the blocking pool and fill in width/height/loaded.
///
/// Images whose header cannot be read keep zero dimensions and `loaded == false`.
pub async fn load_dimensions(images: &mut [ImageDescriptor]) {
    let probes = images.iter().map(|image| {
        let data = Arc::clone(&image.source.data);
        tokio::task::spawn_blocking(move || probe_dimensions(&data))
    });
    let results = futures::future::join_all(probes).await;

    for (image, result) in images.iter_mut().zip(results) {
        match result {
            Ok(Some((width, height))) => {
                image.width = width;
                image.height = height;
                image.loaded = true;
            }
            Ok(None) => {
                tracing::warn!(name = %image.source.name, "Could not read image dimensions");
            }
            Err(e) => {
                tracing::warn!(name = %image.source.name, error = %e, "Dimension probe task failed");
            }
        }
    }
}
