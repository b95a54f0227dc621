//! Page layout
//!
//! - [`TextPaginator`] turns plain text into rendered pages within a character budget
//! - [`TocGenerator`] finds chapter headings for the table of contents
//! - [`plan_spreads`] and [`SpreadNavigator`] group image pages for one- or two-page display

mod spreads;
mod text;
mod toc;

pub use spreads::{Navigation, Spread, SpreadNavigator, plan_spreads};
pub use text::{ContentUnit, FrontMatter, PaginatedText, TextPaginator, UnitKind, escape_html};
pub use toc::{DEFAULT_HEADING_PATTERN, TocEntry, TocGenerator};
