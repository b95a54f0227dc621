//! Grouping image pages into spreads and moving between them.

use serde::{Deserialize, Serialize};

use crate::format::ImageDescriptor;
use crate::types::{LayoutMode, ReadingDirection};

/// One or two image pages shown together
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Spread {
    /// A page shown alone
    Single {
        /// Image index
        index: usize,
    },
    /// Two consecutive pages shown side by side
    Pair {
        /// Earlier image index
        first: usize,
        /// Later image index (always `first + 1`)
        second: usize,
    },
}

impl Spread {
    /// Image indices in reading order
    pub fn indices(&self) -> Vec<usize> {
        match *self {
            Spread::Single { index } => vec![index],
            Spread::Pair { first, second } => vec![first, second],
        }
    }

    /// Lowest image index in the spread
    pub fn first(&self) -> usize {
        match *self {
            Spread::Single { index } => index,
            Spread::Pair { first, .. } => first,
        }
    }

    /// Highest image index in the spread
    pub fn last(&self) -> usize {
        match *self {
            Spread::Single { index } => index,
            Spread::Pair { second, .. } => second,
        }
    }

    /// Whether `image` is shown by this spread
    pub fn contains(&self, image: usize) -> bool {
        match *self {
            Spread::Single { index } => index == image,
            Spread::Pair { first, second } => first == image || second == image,
        }
    }

    /// Indices left to right on screen; right-to-left reading puts the earlier page on the right
    pub fn display_order(&self, direction: ReadingDirection) -> Vec<usize> {
        let mut order = self.indices();
        if direction == ReadingDirection::RightToLeft {
            order.reverse();
        }
        order
    }
}

/// Group images into spreads.
///
/// In single mode every image stands alone. In double mode landscape images stand alone,
/// consecutive portraits pair up, and with `cover_priority` the first image is always alone.
/// Images whose dimensions are unknown count as portrait.
pub fn plan_spreads(
    images: &[ImageDescriptor],
    mode: LayoutMode,
    cover_priority: bool,
) -> Vec<Spread> {
    let count = images.len();
    if mode == LayoutMode::Single {
        return (0..count).map(|index| Spread::Single { index }).collect();
    }

    let mut spreads = Vec::with_capacity(count.div_ceil(2));
    let mut i = 0;
    while i < count {
        let alone = (cover_priority && i == 0)
            || images[i].is_landscape()
            || i + 1 >= count
            || images[i + 1].is_landscape();
        if alone {
            spreads.push(Spread::Single { index: i });
            i += 1;
        } else {
            spreads.push(Spread::Pair {
                first: i,
                second: i + 1,
            });
            i += 2;
        }
    }
    spreads
}

/// Outcome of a navigation step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Navigation {
    /// Moved to the spread at this index
    Moved(usize),
    /// Already at the first spread
    AtStart,
    /// Already at the last spread
    AtEnd,
}

/// Tracks the current spread of an image book
#[derive(Clone, Debug)]
pub struct SpreadNavigator {
    spreads: Vec<Spread>,
    current: usize,
}

impl SpreadNavigator {
    /// Navigator positioned on the first spread
    pub fn new(spreads: Vec<Spread>) -> Self {
        Self { spreads, current: 0 }
    }

    /// Plan spreads and position on the first one
    pub fn plan(images: &[ImageDescriptor], mode: LayoutMode, cover_priority: bool) -> Self {
        Self::new(plan_spreads(images, mode, cover_priority))
    }

    /// All spreads in order
    pub fn spreads(&self) -> &[Spread] {
        &self.spreads
    }

    /// Index of the current spread
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The current spread, if there are any
    pub fn current(&self) -> Option<Spread> {
        self.spreads.get(self.current).copied()
    }

    /// First image index of the current spread; used as the saved position
    pub fn current_image(&self) -> Option<usize> {
        self.current().map(|s| s.first())
    }

    /// Last image index on screen; progress is measured from it, so the final spread is 100%
    ///
    /// Feed the whole spread to [`ReadingState::set_spread`](crate::store::ReadingState::set_spread)
    /// rather than passing either index to `set_page`.
    pub fn last_visible_image(&self) -> Option<usize> {
        self.current().map(|s| s.last())
    }

    /// Spread that shows `image`
    pub fn spread_for_image(&self, image: usize) -> Option<usize> {
        self.spreads.iter().position(|s| s.contains(image))
    }

    /// Jump to the spread showing `image`; out-of-range images leave the position unchanged
    pub fn go_to_image(&mut self, image: usize) -> Option<usize> {
        let index = self.spread_for_image(image)?;
        self.current = index;
        Some(index)
    }

    /// Advance one spread
    pub fn next(&mut self) -> Navigation {
        if self.current + 1 >= self.spreads.len() {
            return Navigation::AtEnd;
        }
        self.current += 1;
        Navigation::Moved(self.current)
    }

    /// Go back one spread
    pub fn prev(&mut self) -> Navigation {
        if self.current == 0 || self.spreads.is_empty() {
            return Navigation::AtStart;
        }
        self.current -= 1;
        Navigation::Moved(self.current)
    }

    /// Recompute spreads after a mode, cover or image change, staying on the current image
    pub fn replan(&mut self, images: &[ImageDescriptor], mode: LayoutMode, cover_priority: bool) {
        let anchor = self.current_image().unwrap_or(0);
        self.spreads = plan_spreads(images, mode, cover_priority);
        self.current = self.spread_for_image(anchor).unwrap_or(0);
    }
}
