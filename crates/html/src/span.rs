//! Mutable view over a run of buffered tokens.
//!
//! Actions receive a [`TokenSpan`] covering the tokens of one matched element (or an
//! empty insertion point). Edits go through the span so the window stays consistent:
//! removed tokens are released to the pool, replaced tokens get fresh slots, and a
//! token pinned by the open-element stack is never rewritten in place.

use std::ops::Range;

use crate::token::{Token, TokenId, TokenKind, TokenPool};

pub struct TokenSpan<'a> {
    pool: &'a mut TokenPool,
    window: &'a mut Vec<TokenId>,
    start: usize,
    end: usize,
}

impl<'a> TokenSpan<'a> {
    /// `range` indexes into `window` and must be in bounds.
    pub fn new(pool: &'a mut TokenPool, window: &'a mut Vec<TokenId>, range: Range<usize>) -> Self {
        debug_assert!(range.start <= range.end && range.end <= window.len());
        Self {
            pool,
            window,
            start: range.start,
            end: range.end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Current range in the underlying window, after any edits.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn token(&self, idx: usize) -> &Token {
        self.pool.get(self.id(idx))
    }

    pub fn kind(&self, idx: usize) -> TokenKind {
        self.token(idx).kind()
    }

    pub fn text(&self, idx: usize) -> &str {
        self.token(idx).text()
    }

    pub fn tokens(&self) -> impl DoubleEndedIterator<Item = &Token> + ExactSizeIterator + '_ {
        self.window[self.start..self.end]
            .iter()
            .map(|id| self.pool.get(*id))
    }

    pub fn position(&self, kind: TokenKind) -> Option<usize> {
        self.tokens().position(|token| token.is(kind))
    }

    pub fn rposition(&self, kind: TokenKind) -> Option<usize> {
        self.tokens().rposition(|token| token.is(kind))
    }

    /// Number of leading tokens forming the opening tag (through `>` or `/>`).
    ///
    /// Spans that do not start with an opening tag report zero.
    pub fn open_tag_len(&self) -> usize {
        if self.is_empty() || self.kind(0) != TokenKind::OpenTag {
            return 0;
        }
        self.tokens()
            .position(|token| token.kind().ends_open_tag())
            .map_or(self.len(), |idx| idx + 1)
    }

    /// Concatenated text of all tokens, i.e. the markup the span will emit.
    pub fn to_html(&self) -> String {
        self.tokens().map(Token::text).collect()
    }

    /// Concatenated character data (text and CDATA payloads) of the span.
    pub fn text_content(&self) -> String {
        self.tokens()
            .filter(|token| matches!(token.kind(), TokenKind::Text | TokenKind::Cdata))
            .map(Token::text)
            .collect()
    }

    pub fn insert(&mut self, idx: usize, kind: TokenKind, text: &str) {
        debug_assert!(idx <= self.len());
        let id = self.pool.alloc(kind, text);
        self.window.insert(self.start + idx, id);
        self.end += 1;
    }

    pub fn push(&mut self, kind: TokenKind, text: &str) {
        let len = self.len();
        self.insert(len, kind, text);
    }

    pub fn remove(&mut self, idx: usize) {
        let id = self.window.remove(self.start + idx);
        self.end -= 1;
        self.pool.release(id);
    }

    pub fn remove_range(&mut self, range: Range<usize>) {
        debug_assert!(range.end <= self.len());
        let removed = range.len();
        let start = self.start + range.start;
        for id in self.window.drain(start..start + removed) {
            self.pool.release(id);
        }
        self.end -= removed;
    }

    /// Swap the token at `idx` for a new one.
    pub fn replace(&mut self, idx: usize, kind: TokenKind, text: &str) {
        let new_id = self.pool.alloc(kind, text);
        let old_id = std::mem::replace(&mut self.window[self.start + idx], new_id);
        self.pool.release(old_id);
    }

    pub fn set_text(&mut self, idx: usize, text: &str) {
        let kind = self.kind(idx);
        self.replace(idx, kind, text);
    }

    pub fn clear(&mut self) {
        let len = self.len();
        self.remove_range(0..len);
    }

    fn id(&self, idx: usize) -> TokenId {
        debug_assert!(idx < self.len(), "span index {idx} out of range");
        self.window[self.start + idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(pool: &mut TokenPool, tokens: &[(TokenKind, &str)]) -> Vec<TokenId> {
        tokens
            .iter()
            .map(|(kind, text)| pool.alloc(*kind, text))
            .collect()
    }

    fn element(pool: &mut TokenPool) -> Vec<TokenId> {
        window(
            pool,
            &[
                (TokenKind::Text, "before"),
                (TokenKind::OpenTag, "<"),
                (TokenKind::TagName, "b"),
                (TokenKind::CloseTag, ">"),
                (TokenKind::Text, "bold"),
                (TokenKind::OpenEndTag, "</"),
                (TokenKind::TagName, "b"),
                (TokenKind::CloseTag, ">"),
            ],
        )
    }

    #[test]
    fn span_views_a_subrange() {
        let mut pool = TokenPool::new();
        let mut ids = element(&mut pool);
        let span = TokenSpan::new(&mut pool, &mut ids, 1..8);
        assert_eq!(span.len(), 7);
        assert_eq!(span.to_html(), "<b>bold</b>");
        assert_eq!(span.text_content(), "bold");
        assert_eq!(span.open_tag_len(), 3);
        assert_eq!(span.rposition(TokenKind::TagName), Some(5));
    }

    #[test]
    fn edits_shift_the_span_end() {
        let mut pool = TokenPool::new();
        let mut ids = element(&mut pool);
        let mut span = TokenSpan::new(&mut pool, &mut ids, 1..8);
        span.insert(0, TokenKind::Text, "[");
        span.push(TokenKind::Text, "]");
        span.remove(4);
        assert_eq!(span.range(), 1..9);
        assert_eq!(span.to_html(), "[<b></b>]");
        drop(span);
        assert_eq!(ids.len(), 9);
        assert_eq!(pool.text(ids[0]), "before");
    }

    #[test]
    fn replace_leaves_pinned_token_intact() {
        let mut pool = TokenPool::new();
        let mut ids = element(&mut pool);
        let pinned = ids[2];
        pool.pin(pinned);
        let mut span = TokenSpan::new(&mut pool, &mut ids, 1..8);
        span.set_text(1, "strong");
        assert_eq!(span.text(1), "strong");
        drop(span);
        assert_eq!(pool.text(pinned), "b");
        assert_ne!(ids[2], pinned);
    }

    #[test]
    fn clear_releases_everything_in_range() {
        let mut pool = TokenPool::new();
        let mut ids = element(&mut pool);
        let mut span = TokenSpan::new(&mut pool, &mut ids, 1..8);
        span.clear();
        assert!(span.is_empty());
        drop(span);
        assert_eq!(ids.len(), 1);
        assert_eq!(pool.stats().live, 1);
    }

    #[test]
    fn empty_span_is_an_insertion_point() {
        let mut pool = TokenPool::new();
        let mut ids = element(&mut pool);
        let mut span = TokenSpan::new(&mut pool, &mut ids, 1..1);
        assert_eq!(span.open_tag_len(), 0);
        span.push(TokenKind::Text, "<hr>");
        drop(span);
        assert_eq!(pool.text(ids[1]), "<hr>");
        assert_eq!(pool.text(ids[2]), "<");
    }
}
