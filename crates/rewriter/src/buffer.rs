//! Buffered token window with per-level buffering marks.
//!
//! Tokens stay in the window while some pending selector may still need them. A
//! mark records where the span of a deferred element starts; marks are keyed by
//! the element's level, so closing a level always finds its own start.

use std::io::{self, Write};

use encoding_rs::Encoding;
use html::{TokenId, TokenPool};

#[derive(Debug, Default)]
pub struct TokenWindow {
    ids: Vec<TokenId>,
    /// `(level, offset)`, ascending by level.
    marks: Vec<(u32, usize)>,
}

impl TokenWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn push(&mut self, id: TokenId) {
        self.ids.push(id);
    }

    /// Drop the most recent token without emitting it.
    pub fn pop(&mut self, pool: &mut TokenPool) {
        if let Some(id) = self.ids.pop() {
            pool.release(id);
        }
    }

    pub fn ids(&self) -> &[TokenId] {
        &self.ids
    }

    pub fn ids_mut(&mut self) -> &mut Vec<TokenId> {
        &mut self.ids
    }

    pub fn has_marks(&self) -> bool {
        !self.marks.is_empty()
    }

    pub fn mark(&self, level: u32) -> Option<usize> {
        self.marks
            .iter()
            .find(|(marked, _)| *marked == level)
            .map(|(_, offset)| *offset)
    }

    pub fn set_mark(&mut self, level: u32, offset: usize) {
        debug_assert!(offset <= self.ids.len());
        match self.marks.binary_search_by_key(&level, |(marked, _)| *marked) {
            Ok(idx) => self.marks[idx].1 = offset,
            Err(idx) => self.marks.insert(idx, (level, offset)),
        }
    }

    pub fn take_mark(&mut self, level: u32) -> Option<usize> {
        let idx = self
            .marks
            .binary_search_by_key(&level, |(marked, _)| *marked)
            .ok()?;
        Some(self.marks.remove(idx).1)
    }

    /// Move marks at or after `from` by `delta` after an edit ending at `from`.
    pub fn shift_marks(&mut self, from: usize, delta: isize) {
        for (_, offset) in &mut self.marks {
            if *offset >= from {
                *offset = offset.saturating_add_signed(delta);
            }
        }
    }

    /// Emit every buffered token in `encoding` and release it. Marks are dropped.
    pub fn flush<W: Write + ?Sized>(
        &mut self,
        pool: &mut TokenPool,
        encoding: &'static Encoding,
        out: &mut W,
    ) -> io::Result<()> {
        self.marks.clear();
        for id in self.ids.drain(..) {
            out.write_all(&encoding.encode(pool.text(id)).0)?;
            pool.release(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use html::TokenKind;

    #[test]
    fn marks_are_keyed_by_level() {
        let mut window = TokenWindow::new();
        window.set_mark(3, 7);
        window.set_mark(1, 2);
        window.set_mark(3, 9);
        assert_eq!(window.mark(3), Some(9));
        assert_eq!(window.take_mark(1), Some(2));
        assert_eq!(window.take_mark(1), None);
        window.shift_marks(9, -4);
        assert_eq!(window.take_mark(3), Some(5));
        assert!(!window.has_marks());
    }

    #[test]
    fn flush_writes_and_releases() {
        let mut pool = TokenPool::new();
        let mut window = TokenWindow::new();
        for text in ["<", "p", ">", "hi"] {
            let kind = if text == "p" { TokenKind::TagName } else { TokenKind::Text };
            window.push(pool.alloc(kind, text));
        }
        window.set_mark(1, 0);
        window.pop(&mut pool);
        let mut out = Vec::new();
        window.flush(&mut pool, encoding_rs::UTF_8, &mut out).unwrap();
        assert_eq!(out, b"<p>");
        assert!(window.is_empty());
        assert!(!window.has_marks());
        assert_eq!(pool.stats().live, 0);
    }

    #[test]
    fn flush_encodes_text() {
        let mut pool = TokenPool::new();
        let mut window = TokenWindow::new();
        window.push(pool.alloc(TokenKind::Text, "caf\u{00E9} \u{2603}"));
        let mut out = Vec::new();
        window
            .flush(&mut pool, encoding_rs::WINDOWS_1252, &mut out)
            .unwrap();
        assert_eq!(out, b"caf\xe9 &#9731;");
    }
}
