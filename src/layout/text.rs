//! Plain-text pagination by character budget.

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::{Error, Result};
use crate::types::LayoutMode;

use super::toc::{TocEntry, TocGenerator};

/// Role of a content unit in the page sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Cover image page
    Cover,
    /// Table of contents page
    Toc,
    /// Paginated text
    Content,
}

/// One navigable page; its index in the returned sequence is the page number
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    /// Role of this unit
    pub kind: UnitKind,
    /// HTML fragment ready for rendering
    pub renderable: String,
}

/// Optional synthetic units placed before the text pages
#[derive(Clone, Debug, Default)]
pub struct FrontMatter {
    /// Resolved cover image URL; `None` when no cover was found
    pub cover_url: Option<String>,
    /// Generate a table of contents from chapter headings
    pub generate_toc: bool,
}

/// Result of paginating a whole text book
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaginatedText {
    /// Cover, TOC, then content pages
    pub units: Vec<ContentUnit>,
    /// Chapter entries pointing at unit indices
    pub toc: Vec<TocEntry>,
}

#[derive(Debug)]
struct Paragraph {
    text: String,
    html: String,
    chars: usize,
}

/// Accumulates paragraphs for one page or half-page
#[derive(Default)]
struct PageBuffer {
    html: String,
    chars: usize,
    paragraphs: Vec<usize>,
}

impl PageBuffer {
    fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    fn overflows(&self, paragraph: &Paragraph, budget: usize) -> bool {
        !self.is_empty() && self.chars + paragraph.chars > budget
    }

    fn push(&mut self, index: usize, paragraph: &Paragraph) {
        self.html.push_str(&paragraph.html);
        self.chars += paragraph.chars;
        self.paragraphs.push(index);
    }
}

/// A finished content page and the paragraphs it holds
struct Page {
    html: String,
    paragraphs: Vec<usize>,
}

/// Splits text into pages of at most `budget` plain-text characters.
///
/// A paragraph is never split: one longer than the budget gets a page of its own.
#[derive(Clone, Debug)]
pub struct TextPaginator {
    single_page_budget: usize,
    double_page_budget: usize,
}

impl TextPaginator {
    /// Build a paginator from layout budgets; zero budgets are rejected
    pub fn new(config: &LayoutConfig) -> Result<Self> {
        if config.single_page_budget == 0 || config.double_page_budget == 0 {
            return Err(Error::InvalidInput(
                "page budgets must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            single_page_budget: config.single_page_budget,
            double_page_budget: config.double_page_budget,
        })
    }

    /// Paginate `text` into content units for `mode`
    pub fn paginate(&self, text: &str, mode: LayoutMode) -> Vec<ContentUnit> {
        let paragraphs = split_paragraphs(text);
        self.layout(&paragraphs, mode)
            .into_iter()
            .map(|page| ContentUnit {
                kind: UnitKind::Content,
                renderable: page.html,
            })
            .collect()
    }

    /// Paginate `text` and prepend the optional cover and table-of-contents units
    pub fn paginate_book(
        &self,
        text: &str,
        mode: LayoutMode,
        front: &FrontMatter,
    ) -> Result<PaginatedText> {
        let paragraphs = split_paragraphs(text);
        let pages = self.layout(&paragraphs, mode);

        let headings = if front.generate_toc {
            let generator = TocGenerator::new()?;
            paragraphs
                .iter()
                .enumerate()
                .filter(|(_, p)| generator.is_heading(&p.text))
                .map(|(i, p)| (i, p.text.clone()))
                .collect()
        } else {
            Vec::new()
        };

        let mut units = Vec::with_capacity(pages.len() + 2);
        if let Some(url) = &front.cover_url {
            units.push(ContentUnit {
                kind: UnitKind::Cover,
                renderable: format!(
                    "<div class=\"cover\"><img src=\"{}\" alt=\"cover\"></div>",
                    escape_html(url)
                ),
            });
        }
        let has_toc = !headings.is_empty();
        let offset = units.len() + usize::from(has_toc);

        let toc: Vec<TocEntry> = headings
            .into_iter()
            .filter_map(|(paragraph, title)| {
                let page = pages.iter().position(|p| p.paragraphs.contains(&paragraph))?;
                Some(TocEntry {
                    title,
                    page: offset + page,
                })
            })
            .collect();

        if has_toc {
            units.push(ContentUnit {
                kind: UnitKind::Toc,
                renderable: super::toc::render_toc(&toc),
            });
        }

        units.extend(pages.into_iter().map(|page| ContentUnit {
            kind: UnitKind::Content,
            renderable: page.html,
        }));

        tracing::debug!(
            units = units.len(),
            chapters = toc.len(),
            ?mode,
            "paginated text"
        );
        Ok(PaginatedText { units, toc })
    }

    fn layout(&self, paragraphs: &[Paragraph], mode: LayoutMode) -> Vec<Page> {
        match mode {
            LayoutMode::Single => self.layout_single(paragraphs),
            LayoutMode::Double => self.layout_double(paragraphs),
        }
    }

    fn layout_single(&self, paragraphs: &[Paragraph]) -> Vec<Page> {
        let budget = self.single_page_budget;
        let mut pages = Vec::new();
        let mut buffer = PageBuffer::default();

        for (index, paragraph) in paragraphs.iter().enumerate() {
            if buffer.overflows(paragraph, budget) {
                pages.push(single_page(std::mem::take(&mut buffer)));
            }
            buffer.push(index, paragraph);
        }
        if !buffer.is_empty() {
            pages.push(single_page(buffer));
        }
        pages
    }

    fn layout_double(&self, paragraphs: &[Paragraph]) -> Vec<Page> {
        let budget = self.double_page_budget;
        let mut pages = Vec::new();
        let mut left = PageBuffer::default();
        let mut right = PageBuffer::default();
        let mut filling_right = false;

        for (index, paragraph) in paragraphs.iter().enumerate() {
            if !filling_right {
                if left.overflows(paragraph, budget) {
                    filling_right = true;
                    right.push(index, paragraph);
                } else {
                    left.push(index, paragraph);
                }
            } else if right.overflows(paragraph, budget) {
                pages.push(double_page(
                    std::mem::take(&mut left),
                    std::mem::take(&mut right),
                ));
                filling_right = false;
                left.push(index, paragraph);
            } else {
                right.push(index, paragraph);
            }
        }
        if !left.is_empty() || !right.is_empty() {
            pages.push(double_page(left, right));
        }
        pages
    }
}

fn single_page(buffer: PageBuffer) -> Page {
    Page {
        html: format!("<div class=\"page\">{}</div>", buffer.html),
        paragraphs: buffer.paragraphs,
    }
}

fn double_page(left: PageBuffer, right: PageBuffer) -> Page {
    let right_html = if right.is_empty() {
        "<div class=\"page page-right page-empty\"></div>".to_string()
    } else {
        format!("<div class=\"page page-right\">{}</div>", right.html)
    };
    let mut paragraphs = left.paragraphs;
    paragraphs.extend(right.paragraphs);

    Page {
        html: format!(
            "<div class=\"spread\"><div class=\"page page-left\">{}</div>{}</div>",
            left.html, right_html
        ),
        paragraphs,
    }
}

/// Split on blank lines, trim, drop empty paragraphs, and escape each as a `<p>` element
fn split_paragraphs(text: &str) -> Vec<Paragraph> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| Paragraph {
            text: p.to_string(),
            html: format!("<p>{}</p>", escape_html(p)),
            chars: p.chars().count(),
        })
        .collect()
}

/// Escape the five HTML-significant characters
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
