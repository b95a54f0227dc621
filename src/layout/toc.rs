//! Chapter-heading detection for plain-text books.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::text::escape_html;

/// Default heading pattern: "Chapter 12", "CHAPTER IV", prologue/epilogue, 第N章/回/节/卷
pub const DEFAULT_HEADING_PATTERN: &str = r"^(?:(?i:chapter\s+(?:\d+|[ivxlcdm]+)\b.*|prologue\b.*|epilogue\b.*)|第[0-9０-９零〇一二三四五六七八九十百千两]+[章回节卷].*)$";

/// Headings are short single-line paragraphs
const MAX_HEADING_CHARS: usize = 60;

/// A chapter entry pointing at a content unit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading text as it appears in the book
    pub title: String,
    /// Index of the unit the heading is on
    pub page: usize,
}

/// Recognises chapter headings among paragraphs
#[derive(Clone, Debug)]
pub struct TocGenerator {
    pattern: Regex,
}

impl TocGenerator {
    /// Generator using [`DEFAULT_HEADING_PATTERN`]
    pub fn new() -> Result<Self> {
        Self::with_pattern(DEFAULT_HEADING_PATTERN)
    }

    /// Generator using a custom heading regex
    pub fn with_pattern(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| Error::InvalidInput(format!("invalid heading pattern: {e}")))?;
        Ok(Self { pattern })
    }

    /// Whether a trimmed paragraph reads as a chapter heading
    pub fn is_heading(&self, paragraph: &str) -> bool {
        !paragraph.contains('\n')
            && paragraph.chars().count() <= MAX_HEADING_CHARS
            && self.pattern.is_match(paragraph)
    }
}

/// Render TOC entries as a linked list of pages
pub(crate) fn render_toc(entries: &[TocEntry]) -> String {
    let items: String = entries
        .iter()
        .map(|entry| {
            format!(
                "<li><a data-page=\"{}\">{}</a></li>",
                entry.page,
                escape_html(&entry.title)
            )
        })
        .collect();
    format!("<div class=\"toc\"><h2>Contents</h2><ol>{items}</ol></div>")
}
