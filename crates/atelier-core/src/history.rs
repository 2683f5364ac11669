//! Bounded undo/redo history of full-canvas snapshots.

use crate::error::CoreResult;
use crate::export::{decode_png, encode_png};
use crate::surface::{RasterImage, RasterSurface};
use std::sync::Arc;

/// Maximum number of snapshots kept.
pub const MAX_HISTORY: usize = 50;

/// An immutable PNG-encoded copy of the full surface.
///
/// Cloning is cheap: the encoded bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    width: u32,
    height: u32,
    png: Arc<[u8]>,
}

impl Snapshot {
    /// Encode the surface's current pixels.
    pub fn capture(surface: &RasterSurface) -> CoreResult<Self> {
        let png = encode_png(surface.width(), surface.height(), surface.pixels())?;
        Ok(Self {
            width: surface.width(),
            height: surface.height(),
            png: png.into(),
        })
    }

    pub fn decode(&self) -> CoreResult<RasterImage> {
        decode_png(&self.png)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The encoded PNG bytes.
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    #[cfg(test)]
    pub(crate) fn from_raw(width: u32, height: u32, png: &[u8]) -> Self {
        Self {
            width,
            height,
            png: png.into(),
        }
    }
}

/// Ordered history with a cursor at the displayed entry.
///
/// The cursor is `None` only while the history is empty. Pushing while
/// the cursor is behind the end drops the redo entries first. When the
/// bound is exceeded the oldest entry is evicted and the cursor moves
/// down by one, so it keeps pointing at the same entry.
#[derive(Debug, Clone)]
pub struct History<T = Snapshot> {
    entries: Vec<T>,
    cursor: Option<usize>,
    capacity: usize,
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl<T> History<T> {
    /// Create an empty history holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            capacity: capacity.max(1),
        }
    }

    /// Create a history whose only entry is `initial`.
    pub fn with_initial(initial: T, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        history.push(initial);
        history
    }

    /// Record a new entry after the cursor.
    pub fn push(&mut self, entry: T) {
        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        }
        self.entries.push(entry);

        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// The entry `undo` would move to, without moving the cursor.
    pub fn peek_undo(&self) -> Option<&T> {
        match self.cursor {
            Some(cursor) if cursor > 0 => self.entries.get(cursor - 1),
            _ => None,
        }
    }

    /// The entry `redo` would move to, without moving the cursor.
    pub fn peek_redo(&self) -> Option<&T> {
        self.cursor.and_then(|cursor| self.entries.get(cursor + 1))
    }

    /// Step back one entry. Returns the entry to display, or `None` at the start.
    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor = self.cursor.map(|cursor| cursor - 1);
        self.current()
    }

    /// Step forward one entry. Returns the entry to display, or `None` at the end.
    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor = self.cursor.map(|cursor| cursor + 1);
        self.current()
    }

    /// The entry at the cursor.
    pub fn current(&self) -> Option<&T> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|cursor| cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|cursor| cursor + 1 < self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history() {
        let mut history: History<u32> = History::default();
        assert_eq!(history.cursor(), None);
        assert!(history.is_empty());
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_n_pushes_from_initial() {
        let mut history = History::with_initial(0, MAX_HISTORY);
        for n in 1..=10 {
            history.push(n);
        }
        assert_eq!(history.len(), 11);
        assert_eq!(history.cursor(), Some(10));
        assert_eq!(history.current(), Some(&10));
    }

    #[test]
    fn test_undo_redo_walks_cursor() {
        let mut history = History::with_initial(0, MAX_HISTORY);
        history.push(1);
        history.push(2);

        assert_eq!(history.undo(), Some(&1));
        assert_eq!(history.undo(), Some(&0));
        assert!(history.can_redo());
        assert_eq!(history.redo(), Some(&1));
        assert_eq!(history.cursor(), Some(1));
    }

    #[test]
    fn test_peek_leaves_cursor() {
        let mut history = History::with_initial(0, MAX_HISTORY);
        history.push(1);
        history.push(2);
        history.undo();

        assert_eq!(history.peek_undo(), Some(&0));
        assert_eq!(history.peek_redo(), Some(&2));
        assert_eq!(history.cursor(), Some(1));

        history.undo();
        assert!(history.peek_undo().is_none());
        assert_eq!(history.cursor(), Some(0));
    }

    #[test]
    fn test_boundaries_are_noops() {
        let mut history = History::with_initial(0, MAX_HISTORY);
        history.push(1);

        assert!(history.redo().is_none());
        assert_eq!(history.cursor(), Some(1));

        history.undo();
        assert!(history.undo().is_none());
        assert_eq!(history.cursor(), Some(0));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_push_truncates_redo() {
        let mut history = History::with_initial(0, MAX_HISTORY);
        history.push(1);
        history.push(2);
        history.push(3);
        history.undo();
        history.undo();

        history.push(9);

        assert_eq!(history.entries(), &[0, 1, 9]);
        assert_eq!(history.cursor(), Some(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_eviction_keeps_current() {
        let mut history = History::with_initial(0, MAX_HISTORY);
        for n in 1..MAX_HISTORY as u32 {
            history.push(n);
        }
        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.cursor(), Some(MAX_HISTORY - 1));

        history.push(50);

        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.cursor(), Some(MAX_HISTORY - 1));
        assert_eq!(history.entries().first(), Some(&1));
        assert_eq!(history.current(), Some(&50));
    }

    #[test]
    fn test_eviction_cursor_shift() {
        let mut history = History::with_initial('a', 3);
        history.push('b');
        history.push('c');
        history.undo();
        assert_eq!(history.cursor(), Some(1));

        // Truncation drops 'c' first, so nothing is evicted yet.
        history.push('d');
        assert_eq!(history.entries(), &['a', 'b', 'd']);

        history.push('e');
        assert_eq!(history.entries(), &['b', 'd', 'e']);
        assert_eq!(history.cursor(), Some(2));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let surface = RasterSurface::new(8, 8).unwrap();
        let snapshot = Snapshot::capture(&surface).unwrap();

        assert_eq!((snapshot.width(), snapshot.height()), (8, 8));
        assert_eq!(snapshot.decode().unwrap(), surface.to_image());
    }
}
