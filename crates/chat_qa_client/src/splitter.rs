//! Reasoning-marker splitting for streamed model output.
//!
//! A buffer is partitioned into visible text and the contents of
//! `START…END` regions. The buffer may be a streaming partial, so an
//! unterminated `START` hides everything after it until its `END` arrives.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Default opening marker emitted by reasoning models.
pub const DEFAULT_START: &str = "<think>";
/// Default closing marker.
pub const DEFAULT_END: &str = "</think>";

/// Literal start/end strings delimiting a reasoning region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerPair {
    pub start: String,
    pub end: String,
}

impl MarkerPair {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Both markers must be non-empty for splitting to mean anything.
    pub fn is_valid(&self) -> bool {
        !self.start.is_empty() && !self.end.is_empty()
    }
}

impl Default for MarkerPair {
    fn default() -> Self {
        Self::new(DEFAULT_START, DEFAULT_END)
    }
}

/// Visible text plus the reasoning extracted from closed regions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitResult {
    pub visible: String,
    /// `None` when no region has closed yet, or in reveal mode.
    pub reasoning: Option<String>,
}

impl SplitResult {
    fn plain(text: &str) -> Self {
        Self {
            visible: text.trim().to_owned(),
            reasoning: None,
        }
    }
}

/// Splits buffers on a fixed [`MarkerPair`].
#[derive(Debug, Clone, Default)]
pub struct MarkerSplitter {
    markers: MarkerPair,
}

impl MarkerSplitter {
    pub fn new(markers: MarkerPair) -> Self {
        Self { markers }
    }

    /// Partition `text` into visible and reasoning parts.
    ///
    /// With `reveal_reasoning` set the text passes through untouched apart
    /// from trimming. Otherwise every closed region is removed from the
    /// visible text and its contents collected, in order, as reasoning; an
    /// open region hides the rest of the buffer and contributes no
    /// reasoning until it closes.
    pub fn split(&self, text: &str, reveal_reasoning: bool) -> SplitResult {
        if reveal_reasoning || !self.markers.is_valid() {
            return SplitResult::plain(text);
        }

        let mut regions = Vec::new();
        let mut visible = Cow::Borrowed(text);
        // Removing a region can splice a fresh START out of the text on
        // either side of it, so scan until nothing more is stripped.
        while let Some(stripped) = self.strip_regions(&visible, &mut regions) {
            visible = Cow::Owned(stripped);
        }

        let reasoning = if regions.is_empty() {
            None
        } else {
            Some(regions.concat().trim().to_owned())
        };

        SplitResult {
            visible: visible.trim().to_owned(),
            reasoning,
        }
    }

    /// Like [`split`](Self::split), but for a buffer that is still growing:
    /// a trailing partial `START` (say `"<thi"`) is held back so it does not
    /// flash into the preview before the rest of the marker arrives.
    pub fn preview(&self, text: &str, reveal_reasoning: bool) -> SplitResult {
        if reveal_reasoning || !self.markers.is_valid() {
            return SplitResult::plain(text);
        }
        self.split(self.hold_back_partial_start(text), false)
    }

    /// One pass over `text`. Returns `None` when `text` holds no START at all.
    fn strip_regions(&self, text: &str, regions: &mut Vec<String>) -> Option<String> {
        let MarkerPair { start, end } = &self.markers;
        if !text.contains(start.as_str()) {
            return None;
        }

        let mut visible = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find(start.as_str()) {
            visible.push_str(&rest[..open]);
            let inner = &rest[open + start.len()..];
            match inner.find(end.as_str()) {
                Some(close) => {
                    regions.push(inner[..close].to_owned());
                    rest = &inner[close + end.len()..];
                }
                None => {
                    // Open region: the tail is not visible yet.
                    rest = "";
                    break;
                }
            }
        }
        visible.push_str(rest);
        Some(visible)
    }

    fn hold_back_partial_start<'a>(&self, text: &'a str) -> &'a str {
        let start = self.markers.start.as_str();
        (1..start.len())
            .rev()
            .filter(|&n| start.is_char_boundary(n))
            .find(|&n| text.ends_with(&start[..n]))
            .map_or(text, |n| &text[..text.len() - n])
    }
}
