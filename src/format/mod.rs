//! Format detection and dispatch
//!
//! Two stages decide what a resource is:
//! - [`classify_source_name`] looks at the file name before anything is downloaded
//!   (plain text, external viewer, or an archive to fetch)
//! - [`FormatResolver::resolve`] opens the downloaded bytes as a ZIP container and tells an
//!   e-book package apart from an image archive
//!
//! Entry names are sorted with [`natural_cmp`]; that order is the page order.

mod images;
mod natural;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use images::{
    IMAGE_EXTENSIONS, ImageDescriptor, ImageSource, is_image_name, load_dimensions,
    probe_dimensions,
};
pub use natural::natural_cmp;

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use std::io::{Cursor, Read};
use tracing::{debug, info};

/// Package-manifest paths that mark an archive as an e-book
pub const EBOOK_MARKERS: &[&str] = &[
    "META-INF/container.xml",
    "OEBPS/content.opf",
    "OPS/content.opf",
    "content.opf",
];

/// Dispatch decision made from the file name alone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    /// Fetch once and decode as text
    Text,
    /// Open in an external viewer; do not download
    External,
    /// Download the whole archive and resolve its contents
    Archive,
}

/// Classify a resource by the extension of its file name
pub fn classify_source_name(name: Option<&str>, config: &DownloadConfig) -> SourceKind {
    let Some(ext) = name.and_then(images::extension) else {
        return SourceKind::Archive;
    };
    let matches = |list: &[String]| list.iter().any(|e| e.eq_ignore_ascii_case(&ext));

    if matches(&config.text_extensions) {
        SourceKind::Text
    } else if matches(&config.external_extensions) {
        SourceKind::External
    } else {
        SourceKind::Archive
    }
}

/// Content found inside a downloaded archive
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedFormat {
    /// An e-book package; the untouched archive bytes go to the e-book renderer
    Ebook {
        /// Original archive bytes
        payload: Vec<u8>,
    },
    /// A sequence of page images in natural order
    Images {
        /// One descriptor per image entry; dimensions are not probed yet
        images: Vec<ImageDescriptor>,
    },
}

/// Resolves archive bytes into an e-book payload or a list of images
pub struct FormatResolver;

impl FormatResolver {
    /// Inspect `buffer` as a ZIP container and classify its contents.
    ///
    /// Fails with [`Error::UnsupportedFormat`] when the archive holds neither an e-book
    /// manifest nor any image entry.
    pub fn resolve(buffer: Vec<u8>) -> Result<ResolvedFormat> {
        let images = {
            let mut archive = zip::ZipArchive::new(Cursor::new(buffer.as_slice()))?;
            let mut names: Vec<String> = archive
                .file_names()
                .filter(|name| is_content_entry(name))
                .map(str::to_string)
                .collect();
            names.sort_by(|a, b| natural_cmp(a, b));
            debug!(entries = names.len(), "reading archive entries");

            if let Some(marker) = names.iter().find(|name| is_ebook_marker(name)) {
                info!(%marker, "archive is an e-book package");
                None
            } else {
                let mut images = Vec::new();
                for name in names.into_iter().filter(|name| is_image_name(name)) {
                    let mut entry = archive.by_name(&name)?;
                    // The declared size is untrusted; let the buffer grow with what is read
                    let mut data = Vec::new();
                    entry.read_to_end(&mut data)?;
                    images.push(ImageDescriptor::new(name, data));
                }
                Some(images)
            }
        };

        match images {
            None => Ok(ResolvedFormat::Ebook { payload: buffer }),
            Some(images) if images.is_empty() => Err(Error::UnsupportedFormat(
                "archive contains no e-book manifest and no images".to_string(),
            )),
            Some(images) => {
                info!(count = images.len(), "archive is an image sequence");
                Ok(ResolvedFormat::Images { images })
            }
        }
    }
}

/// Skip directories and macOS resource forks
fn is_content_entry(name: &str) -> bool {
    if name.ends_with('/') || name.starts_with("__MACOSX/") {
        return false;
    }
    let file_name = name.rsplit('/').next().unwrap_or(name);
    !file_name.starts_with("._")
}

fn is_ebook_marker(name: &str) -> bool {
    EBOOK_MARKERS
        .iter()
        .any(|marker| marker.eq_ignore_ascii_case(name))
}
