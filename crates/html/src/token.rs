//! Token model and token arena.
//!
//! Tokens are recycled through [`TokenPool`]: the hot loop allocates and releases
//! thousands of short-lived tokens, and reusing slots keeps their text buffers alive
//! across documents. A token referenced by the open-element stack is pinned; releasing
//! a pinned token only marks it, and the slot is recycled once the stack unpins it.

use crate::symbols::{self, ElementSymbol};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Doctype,
    ProcessingInstruction,
    OpenTag,
    TagName,
    AttributeName,
    Equals,
    AttributeValue,
    CloseTag,
    SelfCloseEnd,
    OpenEndTag,
    CommentStart,
    Comment,
    CommentEnd,
    CdataStart,
    Cdata,
    CdataEnd,
    Text,
    Whitespace,
    EndOfStream,
    Unknown,
}

impl TokenKind {
    /// Token kinds that end an opening tag.
    pub fn ends_open_tag(self) -> bool {
        matches!(self, Self::CloseTag | Self::SelfCloseEnd)
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    kind: TokenKind,
    text: String,
    symbol: Option<&'static ElementSymbol>,
    on_stack: bool,
}

impl Token {
    fn empty() -> Self {
        Self {
            kind: TokenKind::Unknown,
            text: String::new(),
            symbol: None,
            on_stack: false,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Resolved element symbol; only tag-name tokens carry one.
    pub fn symbol(&self) -> Option<&'static ElementSymbol> {
        self.symbol
    }

    pub fn is_on_stack(&self) -> bool {
        self.on_stack
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// Handle to a token slot in a [`TokenPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TokenId(u32);

impl TokenId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Slots are added in blocks of this many tokens.
pub const POOL_BLOCK: usize = 20;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: usize,
    pub live: usize,
    pub pinned: usize,
    pub allocations: u64,
}

#[derive(Debug)]
struct Slot {
    token: Token,
    live: bool,
    release_pending: bool,
}

#[derive(Debug, Default)]
pub struct TokenPool {
    slots: Vec<Slot>,
    free: Vec<TokenId>,
    allocations: u64,
}

impl TokenPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a slot from the free list and fill it; tag names get their symbol resolved.
    pub fn alloc(&mut self, kind: TokenKind, text: &str) -> TokenId {
        if self.free.is_empty() {
            self.grow();
        }
        let Some(id) = self.free.pop() else {
            unreachable!("grow always refills the free list");
        };
        self.allocations = self.allocations.saturating_add(1);
        let slot = &mut self.slots[id.index()];
        debug_assert!(!slot.live, "free list handed out a live slot");
        slot.live = true;
        slot.release_pending = false;
        let token = &mut slot.token;
        token.kind = kind;
        token.text.clear();
        token.text.push_str(text);
        token.on_stack = false;
        token.symbol = (kind == TokenKind::TagName).then(|| symbols::lookup(text));
        id
    }

    fn grow(&mut self) {
        let base = self.slots.len();
        self.slots.reserve(POOL_BLOCK);
        self.slots.extend((0..POOL_BLOCK).map(|_| Slot {
            token: Token::empty(),
            live: false,
            release_pending: false,
        }));
        // Pop order hands out the lowest index first.
        self.free
            .extend((base..base + POOL_BLOCK).rev().map(|idx| TokenId(idx as u32)));
    }

    pub fn get(&self, id: TokenId) -> &Token {
        let slot = &self.slots[id.index()];
        debug_assert!(slot.live, "access to released token {id:?}");
        &slot.token
    }

    pub fn kind(&self, id: TokenId) -> TokenKind {
        self.get(id).kind
    }

    pub fn text(&self, id: TokenId) -> &str {
        &self.get(id).text
    }

    /// Mark a token as referenced by the open-element stack.
    pub fn pin(&mut self, id: TokenId) {
        self.slots[id.index()].token.on_stack = true;
    }

    /// Drop the stack reference; recycles the slot if it was released meanwhile.
    pub fn unpin(&mut self, id: TokenId) {
        let slot = &mut self.slots[id.index()];
        slot.token.on_stack = false;
        if slot.release_pending {
            slot.release_pending = false;
            self.free_slot(id);
        }
    }

    /// Return a token to the pool once it has been emitted or consumed.
    pub fn release(&mut self, id: TokenId) {
        let slot = &mut self.slots[id.index()];
        debug_assert!(slot.live, "token {id:?} released twice");
        debug_assert!(!slot.release_pending, "token {id:?} released twice");
        if slot.token.on_stack {
            slot.release_pending = true;
        } else {
            self.free_slot(id);
        }
    }

    fn free_slot(&mut self, id: TokenId) {
        self.slots[id.index()].live = false;
        self.free.push(id);
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.slots.len(),
            live: self.slots.iter().filter(|slot| slot.live).count(),
            pinned: self
                .slots
                .iter()
                .filter(|slot| slot.live && slot.token.on_stack)
                .count(),
            allocations: self.allocations,
        }
    }

    /// Recycle every slot; used between documents.
    pub fn clear(&mut self) {
        self.free.clear();
        for (idx, slot) in self.slots.iter_mut().enumerate().rev() {
            slot.live = false;
            slot.release_pending = false;
            slot.token.on_stack = false;
            self.free.push(TokenId(idx as u32));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::ElementCategory;

    #[test]
    fn alloc_resolves_symbols_for_tag_names_only() {
        let mut pool = TokenPool::new();
        let name = pool.alloc(TokenKind::TagName, "IMG");
        let text = pool.alloc(TokenKind::Text, "img");
        assert_eq!(
            pool.get(name).symbol().map(|s| s.category),
            Some(ElementCategory::Void)
        );
        assert!(pool.get(text).symbol().is_none());
        assert_eq!(pool.text(name), "IMG");
    }

    #[test]
    fn released_slots_are_reused() {
        let mut pool = TokenPool::new();
        let first = pool.alloc(TokenKind::Text, "one");
        pool.release(first);
        let second = pool.alloc(TokenKind::Text, "two");
        assert_eq!(first, second);
        assert_eq!(pool.text(second), "two");
        assert_eq!(pool.stats().capacity, POOL_BLOCK);
    }

    #[test]
    fn pool_grows_in_blocks() {
        let mut pool = TokenPool::new();
        let ids: Vec<_> = (0..POOL_BLOCK + 1)
            .map(|i| pool.alloc(TokenKind::Text, &i.to_string()))
            .collect();
        assert_eq!(pool.stats().capacity, 2 * POOL_BLOCK);
        assert_eq!(pool.stats().live, POOL_BLOCK + 1);
        assert_eq!(ids[0].index(), 0);
        assert_eq!(ids[POOL_BLOCK].index(), POOL_BLOCK);
    }

    #[test]
    fn pinned_token_survives_release_until_unpinned() {
        let mut pool = TokenPool::new();
        let name = pool.alloc(TokenKind::TagName, "div");
        pool.pin(name);
        pool.release(name);
        // Still readable: the stack holds it.
        assert_eq!(pool.text(name), "div");
        let other = pool.alloc(TokenKind::Text, "x");
        assert_ne!(other, name);
        assert_eq!(pool.stats().pinned, 1);

        pool.unpin(name);
        assert_eq!(pool.stats().live, 1);
        let reused = pool.alloc(TokenKind::Text, "y");
        assert_eq!(reused, name);
    }

    #[test]
    fn unpin_without_release_keeps_token_live() {
        let mut pool = TokenPool::new();
        let name = pool.alloc(TokenKind::TagName, "p");
        pool.pin(name);
        pool.unpin(name);
        assert!(!pool.get(name).is_on_stack());
        assert_eq!(pool.stats().live, 1);
    }
}
