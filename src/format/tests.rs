//! Tests for format detection and archive resolution.

use crate::config::DownloadConfig;
use crate::error::Error;

use super::test_helpers::{build_zip, png};
use super::*;

// -----------------------------------------------------------------------
// classify_source_name
// -----------------------------------------------------------------------

#[test]
fn source_names_dispatch_by_extension() {
    let config = DownloadConfig::default();

    assert_eq!(classify_source_name(Some("novel.txt"), &config), SourceKind::Text);
    assert_eq!(classify_source_name(Some("NOVEL.TXT"), &config), SourceKind::Text);
    assert_eq!(classify_source_name(Some("scan.pdf"), &config), SourceKind::External);
    assert_eq!(classify_source_name(Some("vol1.cbz"), &config), SourceKind::Archive);
    assert_eq!(classify_source_name(Some("book.epub"), &config), SourceKind::Archive);
    assert_eq!(classify_source_name(Some("no_extension"), &config), SourceKind::Archive);
    assert_eq!(classify_source_name(None, &config), SourceKind::Archive);
}

#[test]
fn configured_extensions_are_honoured() {
    let config = DownloadConfig {
        text_extensions: vec!["md".into()],
        external_extensions: vec!["mobi".into(), "pdf".into()],
        ..DownloadConfig::default()
    };

    assert_eq!(classify_source_name(Some("notes.md"), &config), SourceKind::Text);
    assert_eq!(classify_source_name(Some("notes.txt"), &config), SourceKind::Archive);
    assert_eq!(classify_source_name(Some("b.mobi"), &config), SourceKind::External);
}

// -----------------------------------------------------------------------
// FormatResolver::resolve
// -----------------------------------------------------------------------

#[test]
fn epub_container_marker_yields_ebook_payload() {
    let archive = build_zip(&[
        ("mimetype", b"application/epub+zip"),
        ("META-INF/container.xml", b"<container/>"),
        ("OEBPS/chapter1.xhtml", b"<html/>"),
        ("OEBPS/images/cover.jpg", b"jpeg"),
    ]);

    let resolved = FormatResolver::resolve(archive.clone()).unwrap();

    assert_eq!(resolved, ResolvedFormat::Ebook { payload: archive });
}

#[test]
fn root_level_opf_is_also_an_ebook_marker() {
    let archive = build_zip(&[("content.opf", b"<package/>"), ("001.png", b"x")]);

    assert!(matches!(
        FormatResolver::resolve(archive).unwrap(),
        ResolvedFormat::Ebook { .. }
    ));
}

#[test]
fn images_are_extracted_in_natural_order() {
    let archive = build_zip(&[
        ("page10.jpg", b"ten"),
        ("page2.PNG", b"two"),
        ("notes.txt", b"ignored"),
        ("page1.jpg", b"one"),
        ("__MACOSX/._page1.jpg", b"fork"),
    ]);

    let ResolvedFormat::Images { images } = FormatResolver::resolve(archive).unwrap() else {
        panic!("expected image archive");
    };

    let names: Vec<&str> = images.iter().map(|i| i.source.name.as_str()).collect();
    assert_eq!(names, vec!["page1.jpg", "page2.PNG", "page10.jpg"]);
    assert_eq!(images[1].source.data.as_slice(), b"two");
    assert_eq!(images[1].source.mime_type(), "image/png");
    assert!(images.iter().all(|i| !i.loaded));
}

#[test]
fn archive_without_images_is_unsupported() {
    let archive = build_zip(&[("readme.txt", b"hello"), ("data.bin", b"\x00")]);

    let err = FormatResolver::resolve(archive).unwrap_err();

    assert!(matches!(err, Error::UnsupportedFormat(_)));
    assert_eq!(err.code(), "unsupported_format");
}

#[test]
fn non_zip_bytes_are_an_archive_error() {
    let err = FormatResolver::resolve(b"definitely not a zip".to_vec()).unwrap_err();
    assert!(matches!(err, Error::Archive(_)));
}

#[test]
fn declared_entry_size_does_not_drive_allocation() {
    let page = png(4, 6);
    let mut archive = build_zip(&[("001.png", &page)]);

    // Claim ~2 GiB uncompressed in the central directory record
    let header = archive
        .windows(4)
        .position(|w| w == b"PK\x01\x02")
        .unwrap();
    archive[header + 24..header + 28].copy_from_slice(&0x7FFF_0000u32.to_le_bytes());

    let ResolvedFormat::Images { images } = FormatResolver::resolve(archive).unwrap() else {
        panic!("expected images");
    };
    assert_eq!(images.len(), 1);
    assert_eq!(*images[0].source.data, page);
}

// -----------------------------------------------------------------------
// image helpers
// -----------------------------------------------------------------------

#[test]
fn image_names_are_matched_case_insensitively() {
    assert!(is_image_name("a/B.JPEG"));
    assert!(is_image_name("x.webp"));
    assert!(!is_image_name("x.tiff"));
    assert!(!is_image_name(".png"));
    assert!(!is_image_name("png"));
}

#[test]
fn probe_reads_png_header() {
    assert_eq!(probe_dimensions(&png(12, 7)), Some((12, 7)));
    assert_eq!(probe_dimensions(b"garbage"), None);
}

#[tokio::test]
async fn load_dimensions_fills_descriptors() {
    let mut images = vec![
        ImageDescriptor::new("wide.png", png(40, 20)),
        ImageDescriptor::new("broken.png", b"not an image".to_vec()),
        ImageDescriptor::new("tall.png", png(20, 40)),
    ];

    load_dimensions(&mut images).await;

    assert!(images[0].loaded && images[0].is_landscape());
    assert_eq!((images[0].width, images[0].height), (40, 20));
    assert!(!images[1].loaded);
    assert!(!images[1].is_landscape(), "unloaded images count as portrait");
    assert!(images[2].loaded && !images[2].is_landscape());
}
