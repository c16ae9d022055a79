//! Window planning for a single feed run.

use crate::error::{Error, Result};

/// Default window length: 1 MiB.
pub const DEFAULT_WINDOW_LEN: u64 = 1024 * 1024;

/// A contiguous byte range read from the source in one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub len: u64,
}

impl Window {
    /// One past the last byte of the window.
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Position of a feed run within its source.
///
/// Only ever advanced by the window it last handed out, so windows come back
/// strictly in order with no gaps or overlap.
#[derive(Debug)]
pub struct ChunkCursor {
    offset: u64,
    total: u64,
    window: u64,
}

impl ChunkCursor {
    /// Start a cursor at offset 0.
    pub fn new(total: u64, window: u64) -> Result<Self> {
        if window == 0 {
            return Err(Error::InvalidWindow(window));
        }
        Ok(Self {
            offset: 0,
            total,
            window,
        })
    }

    /// The next window to read, or `None` once the source is exhausted.
    pub fn next_window(&self) -> Option<Window> {
        if self.offset >= self.total {
            return None;
        }
        Some(Window {
            offset: self.offset,
            len: self.window.min(self.total - self.offset),
        })
    }

    /// Move past `window`, which must be the one `next_window` returned.
    pub fn advance(&mut self, window: Window) {
        debug_assert_eq!(window.offset, self.offset);
        self.offset = window.end().min(self.total);
    }

    /// `floor(offset / total * 100)`; an empty source counts as complete.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (u128::from(self.offset) * 100 / u128::from(self.total)) as u8
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn is_done(&self) -> bool {
        self.offset >= self.total
    }
}
