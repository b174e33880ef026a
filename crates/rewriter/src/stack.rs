//! Open-element stack.
//!
//! Level 1 is the outermost element. Each level remembers its most recent element
//! and how many siblings were opened there under the current parent, which is the
//! sibling sequence used by `:nth-child` and the sibling combinators. Remembered
//! tag-name tokens are pinned in the pool so actions cannot recycle them.

use html::{ElementSymbol, TokenId, TokenPool};

#[derive(Clone, Copy, Debug, Default)]
struct Level {
    element: Option<TokenId>,
    siblings: u32,
}

#[derive(Debug)]
pub struct OpenElementStack {
    /// Index 0 is the document root and never holds an element.
    levels: Vec<Level>,
    depth: u32,
}

impl OpenElementStack {
    pub fn new() -> Self {
        Self {
            levels: vec![Level::default()],
            depth: 0,
        }
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Sibling sequence of the innermost open element.
    pub fn sequence(&self) -> u32 {
        self.levels[self.depth as usize].siblings
    }

    /// Sequence the next construct opened inside the innermost element would get.
    pub fn next_sequence(&self) -> u32 {
        self.levels
            .get(self.depth as usize + 1)
            .map_or(1, |level| level.siblings + 1)
    }

    /// Tag-name token of the innermost open element.
    pub fn top(&self) -> Option<TokenId> {
        self.element_at(self.depth)
    }

    pub fn element_at(&self, level: u32) -> Option<TokenId> {
        if level == 0 || level > self.depth {
            return None;
        }
        self.levels[level as usize].element
    }

    pub fn top_symbol(&self, pool: &TokenPool) -> Option<&'static ElementSymbol> {
        self.top().and_then(|id| pool.get(id).symbol())
    }

    /// Open a new innermost element; returns its `(level, sequence)`.
    pub fn push(&mut self, pool: &mut TokenPool, tag_name: TokenId) -> (u32, u32) {
        self.depth += 1;
        let depth = self.depth as usize;
        if self.levels.len() <= depth {
            self.levels.push(Level::default());
        }
        let level = &mut self.levels[depth];
        if let Some(previous) = level.element.replace(tag_name) {
            pool.unpin(previous);
        }
        pool.pin(tag_name);
        level.siblings += 1;
        (self.depth, level.siblings)
    }

    /// Close the innermost element. Its children are forgotten; the element itself
    /// stays remembered as the latest sibling on its level.
    pub fn pop(&mut self, pool: &mut TokenPool) {
        debug_assert!(self.depth > 0, "pop on empty stack");
        if self.depth == 0 {
            return;
        }
        self.forget_deeper_than(pool, self.depth);
        self.depth -= 1;
    }

    /// Deepest open level whose element is named `name` (ASCII case-insensitive).
    pub fn find(&self, pool: &TokenPool, name: &str) -> Option<u32> {
        (1..=self.depth).rev().find(|&level| {
            self.element_at(level)
                .is_some_and(|id| pool.text(id).eq_ignore_ascii_case(name))
        })
    }

    /// Unpin everything and start over.
    pub fn clear(&mut self, pool: &mut TokenPool) {
        self.forget_deeper_than(pool, 0);
        self.depth = 0;
    }

    fn forget_deeper_than(&mut self, pool: &mut TokenPool, level: u32) {
        for slot in self.levels.iter_mut().skip(level as usize + 1) {
            if let Some(id) = slot.element.take() {
                pool.unpin(id);
            }
            slot.siblings = 0;
        }
    }
}

impl Default for OpenElementStack {
    fn default() -> Self {
        Self::new()
    }
}
