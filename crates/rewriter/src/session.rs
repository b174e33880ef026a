//! Streaming rewrite driver.
//!
//! One [`RewriteSession`] processes one document: it pulls tokens from the lexer,
//! keeps the open-element stack and the buffered token window, asks every selector
//! about each construct as its opening token(s) complete, and runs actions once
//! the span they apply to is known. Tokens leave the window either by being
//! written out or by being dropped by an action, never both.

use std::borrow::Cow;
use std::io::{self, BufWriter, Read, Write};

use encoding_rs::Encoding;
use html::{HtmlLexer, Token, TokenId, TokenKind, TokenPool, TokenSpan};
use selector::{ActionError, ActionRegistry, Placement, Selector};

use crate::buffer::TokenWindow;
use crate::config::RewriterConfig;
use crate::error::RewriteError;
use crate::minimize::Minimizer;
use crate::stack::OpenElementStack;

/// Counters for one rewrite run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Tokens processed before the run ended or switched to pass-through.
    pub tokens: u64,
    /// Selector firings that ran their action list.
    pub actions_fired: u64,
    /// Elements closed without their own end tag.
    pub implied_closes: u64,
    /// Whether the tail of the input was copied verbatim.
    pub pass_through: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TagState {
    Outside,
    StartTag,
    EndTag,
}

/// How an element's span ends.
#[derive(Clone, Copy, Debug)]
enum Close {
    /// Its own end tag was just read.
    Literal,
    /// Closed by a later tag whose tokens start at `end`.
    Implied { end: usize },
    /// Still open at end of input.
    EndOfStream,
}

/// Comment or CDATA section being read.
#[derive(Debug)]
struct Construct {
    level: u32,
    start: usize,
    matched: bool,
    /// Unmatched comment removed by minimization.
    dropped: bool,
}

/// Window extent of the construct selectors are firing on.
///
/// `tail` is where `:after` insertions go; it moves past earlier insertions so
/// several selectors keep their order in the output.
#[derive(Clone, Copy, Debug)]
struct Extent {
    start: usize,
    end: usize,
    tail: usize,
}

impl Extent {
    fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            tail: end,
        }
    }
}

pub struct RewriteSession<'r, R: Read, W: Write> {
    lexer: HtmlLexer<R>,
    out: BufWriter<W>,
    encoding: &'static Encoding,
    pool: TokenPool,
    window: TokenWindow,
    stack: OpenElementStack,
    selectors: &'r mut [Selector],
    registry: &'r ActionRegistry,
    errors: &'r mut Vec<ActionError>,
    pass_through: bool,
    minimizer: Option<Minimizer>,
    state: TagState,
    /// Window offset of the `<` of the start tag being read.
    open_tag_start: Option<usize>,
    /// Window offset of the `</` of the end tag being read.
    end_tag_start: Option<usize>,
    end_tag_name: Option<String>,
    construct: Option<Construct>,
    stats: RewriteStats,
}

impl<'r, R: Read, W: Write> RewriteSession<'r, R, W> {
    pub fn new(
        reader: R,
        writer: W,
        selectors: &'r mut [Selector],
        registry: &'r ActionRegistry,
        config: &RewriterConfig,
        errors: &'r mut Vec<ActionError>,
    ) -> Self {
        Self {
            lexer: HtmlLexer::new(reader, config.lexer_config()),
            out: BufWriter::with_capacity(config.read_buffer_size.max(1), writer),
            encoding: config.encoding,
            pool: TokenPool::new(),
            window: TokenWindow::new(),
            stack: OpenElementStack::new(),
            selectors,
            registry,
            errors,
            pass_through: config.pass_through && !config.minimize_html,
            minimizer: config
                .minimize_html
                .then(|| Minimizer::new(&config.minimize_skip_tags)),
            state: TagState::Outside,
            open_tag_start: None,
            end_tag_start: None,
            end_tag_name: None,
            construct: None,
            stats: RewriteStats::default(),
        }
    }

    /// Process the whole input.
    pub fn run(mut self) -> Result<RewriteStats, RewriteError> {
        loop {
            if self.can_pass_through() {
                self.switch_to_pass_through()?;
                break;
            }
            let id = self.lexer.advance(&mut self.pool)?;
            let kind = self.pool.kind(id);
            if kind == TokenKind::EndOfStream {
                self.pool.release(id);
                self.finish()?;
                break;
            }
            self.stats.tokens += 1;
            if self.can_flush() {
                self.window.flush(&mut self.pool, self.encoding, &mut self.out)?;
            }
            let Some(id) = self.admit(id, kind) else {
                continue;
            };
            self.window.push(id);
            self.dispatch(id, kind);
        }
        self.stack.clear(&mut self.pool);
        self.out.flush()?;
        log::debug!(
            target: "rewriter.session",
            "done: {} token(s), {} firing(s), {} implied close(s), pass-through {}",
            self.stats.tokens,
            self.stats.actions_fired,
            self.stats.implied_closes,
            self.stats.pass_through
        );
        Ok(self.stats)
    }

    fn can_pass_through(&self) -> bool {
        self.pass_through
            && self.state == TagState::Outside
            && self.construct.is_none()
            && !self.selectors.iter().any(Selector::is_live)
    }

    fn switch_to_pass_through(&mut self) -> io::Result<()> {
        self.window.flush(&mut self.pool, self.encoding, &mut self.out)?;
        let copied = self.lexer.copy_remaining(&mut self.out)?;
        self.stats.pass_through = true;
        log::debug!(
            target: "rewriter.session",
            "no live selectors after {} token(s); copied {copied} byte(s) verbatim",
            self.stats.tokens
        );
        Ok(())
    }

    /// Buffered tokens can be written once nothing pending refers to them.
    fn can_flush(&self) -> bool {
        !self.window.is_empty()
            && !self.window.has_marks()
            && self.open_tag_start.is_none()
            && self.state != TagState::EndTag
            && !self.construct.as_ref().is_some_and(|construct| construct.matched)
    }

    /// Apply minimization; `None` drops the token.
    fn admit(&mut self, id: TokenId, kind: TokenKind) -> Option<TokenId> {
        let Some(minimizer) = &self.minimizer else {
            return Some(id);
        };
        if matches!(kind, TokenKind::Comment | TokenKind::CommentEnd)
            && self.construct.as_ref().is_some_and(|construct| construct.dropped)
        {
            if kind == TokenKind::CommentEnd {
                self.construct = None;
            }
            self.pool.release(id);
            return None;
        }
        let rewritten = match minimizer.rewrite(kind, self.pool.text(id)) {
            Cow::Borrowed(_) => return Some(id),
            Cow::Owned(text) => text,
        };
        self.pool.release(id);
        if rewritten.is_empty() {
            return None;
        }
        Some(self.pool.alloc(kind, &rewritten))
    }

    fn dispatch(&mut self, id: TokenId, kind: TokenKind) {
        match kind {
            TokenKind::OpenTag => {
                self.open_tag_start = Some(self.window.len() - 1);
                self.state = TagState::StartTag;
            }
            TokenKind::OpenEndTag => {
                self.end_tag_start = Some(self.window.len() - 1);
                self.end_tag_name = None;
                self.state = TagState::EndTag;
            }
            TokenKind::TagName => match self.state {
                TagState::StartTag => self.open_element(id),
                TagState::EndTag => self.read_end_tag_name(id),
                TagState::Outside => {}
            },
            TokenKind::CloseTag | TokenKind::SelfCloseEnd => match self.state {
                TagState::StartTag => self.finish_start_tag(),
                TagState::EndTag => self.finish_end_tag(),
                TagState::Outside => {}
            },
            TokenKind::Doctype | TokenKind::ProcessingInstruction => self.single_token_construct(id),
            TokenKind::CommentStart | TokenKind::CdataStart => self.open_construct(id, kind),
            TokenKind::CommentEnd | TokenKind::CdataEnd => self.close_construct(),
            _ => {}
        }
    }

    fn open_element(&mut self, id: TokenId) {
        let name = self.pool.text(id).to_string();
        let implied = self
            .stack
            .top_symbol(&self.pool)
            .is_some_and(|parent| parent.is_closed_by(&name));
        if implied {
            let end = self.open_tag_start.unwrap_or(self.window.len() - 1);
            log::trace!(
                target: "rewriter.session",
                "<{name}> implies close of level {}",
                self.stack.depth()
            );
            self.close_top(Close::Implied { end });
        }
        if let Some(minimizer) = &mut self.minimizer {
            minimizer.open_element(&name);
        }
        self.stack.push(&mut self.pool, id);
    }

    /// The start tag is complete: check every selector against it.
    fn finish_start_tag(&mut self) {
        self.state = TagState::Outside;
        let Some(start) = self.open_tag_start.take() else {
            return;
        };
        let level = self.stack.depth();
        let sequence = self.stack.sequence();
        let symbol = self.stack.top_symbol(&self.pool);
        let void = symbol.is_some_and(|symbol| symbol.is_void());

        let mut defer = false;
        let mut immediate = Vec::new();
        {
            let queue: Vec<&Token> = self.window.ids()[start..]
                .iter()
                .map(|id| self.pool.get(*id))
                .collect();
            for (idx, selector) in self.selectors.iter_mut().enumerate() {
                if selector.is_expired() || !selector.check(symbol, &queue, level, sequence) {
                    continue;
                }
                match (selector.placement(), void) {
                    (Placement::Element, false) => defer = true,
                    (Placement::After, false) => {}
                    _ => immediate.push(idx),
                }
            }
        }

        if defer {
            log::trace!(target: "rewriter.session", "deferring level {level} from offset {start}");
            self.window.set_mark(level, start);
        }
        let mut extent = Extent::new(start, self.window.len());
        for idx in immediate {
            self.fire(idx, &mut extent, level, false);
        }

        if void {
            self.close_top(Close::Literal);
        }
    }

    fn read_end_tag_name(&mut self, id: TokenId) {
        let name = self.pool.text(id).to_string();
        let level = self.stack.depth();
        let at_document_edge = self.stack.top().is_some_and(|top| {
            let top = self.pool.text(top);
            top.eq_ignore_ascii_case("body") || top.eq_ignore_ascii_case("html")
        });
        if at_document_edge {
            if let (Some(mark), Some(end)) = (self.window.mark(level), self.end_tag_start) {
                // body and html never close early: fire what waits on them, keep them open.
                self.window.take_mark(level);
                self.fire_pending(level, Extent::new(mark, end), false);
                if let Some(end) = self.end_tag_start {
                    self.window.set_mark(level, end);
                }
            }
        }
        self.end_tag_name = Some(name);
    }

    fn finish_end_tag(&mut self) {
        self.state = TagState::Outside;
        let name = self.end_tag_name.take();
        if let Some(name) = name {
            match self.stack.find(&self.pool, &name) {
                Some(target) => {
                    while self.stack.depth() > target {
                        let end = self.end_tag_start.unwrap_or(self.window.len());
                        self.close_top(Close::Implied { end });
                    }
                    self.close_top(Close::Literal);
                }
                None => log::trace!(target: "rewriter.session", "ignoring unmatched </{name}>"),
            }
        }
        self.end_tag_start = None;
    }

    /// Close the innermost element: run what waits on it, retire its live records
    /// and pop it.
    fn close_top(&mut self, close: Close) {
        let level = self.stack.depth();
        if level == 0 {
            return;
        }
        let len = self.window.len();
        let (implied, end) = match close {
            Close::Literal => (false, len),
            Close::Implied { end } => (true, end),
            Close::EndOfStream => (true, len),
        };
        let start = self.window.take_mark(level).unwrap_or(end);
        self.fire_pending(level, Extent::new(start, end), implied);
        for selector in self.selectors.iter_mut() {
            selector.clear_level_matched(level, implied);
        }
        if let Close::Implied { .. } = close {
            self.stats.implied_closes += 1;
        }
        if let (Some(minimizer), Some(top)) = (&mut self.minimizer, self.stack.top()) {
            minimizer.close_element(self.pool.text(top));
        }
        self.stack.pop(&mut self.pool);
    }

    fn single_token_construct(&mut self, id: TokenId) {
        let level = self.stack.depth() + 1;
        let at = self.window.len() - 1;
        let mut matched = Vec::new();
        {
            let queue = [self.pool.get(id)];
            for (idx, selector) in self.selectors.iter_mut().enumerate() {
                if !selector.is_expired() && selector.check(None, &queue, level, 0) {
                    matched.push(idx);
                }
            }
        }
        let mut extent = Extent::new(at, at + 1);
        for idx in matched {
            self.fire(idx, &mut extent, level, false);
        }
    }

    fn open_construct(&mut self, id: TokenId, kind: TokenKind) {
        let level = self.stack.depth() + 1;
        let sequence = self.stack.next_sequence();
        let start = self.window.len() - 1;
        let mut matched = false;
        {
            let queue = [self.pool.get(id)];
            for selector in self.selectors.iter_mut() {
                if !selector.is_expired() && selector.check(None, &queue, level, sequence) {
                    matched = true;
                }
            }
        }
        let mut dropped = false;
        if let Some(minimizer) = &mut self.minimizer {
            if matched || kind == TokenKind::CdataStart {
                minimizer.set_suppressed(true);
            } else if kind == TokenKind::CommentStart && minimizer.is_active() {
                self.window.pop(&mut self.pool);
                dropped = true;
            }
        }
        self.construct = Some(Construct {
            level,
            start,
            matched,
            dropped,
        });
    }

    fn close_construct(&mut self) {
        let Some(construct) = self.construct.take() else {
            return;
        };
        if let Some(minimizer) = &mut self.minimizer {
            minimizer.set_suppressed(false);
        }
        if construct.matched {
            let extent = Extent::new(construct.start, self.window.len());
            self.fire_pending(construct.level, extent, false);
        }
    }

    /// End of input: fire everything still waiting, innermost first, and flush.
    fn finish(&mut self) -> io::Result<()> {
        if let Some(construct) = self.construct.take() {
            if construct.matched {
                let extent = Extent::new(construct.start, self.window.len());
                self.fire_pending(construct.level, extent, true);
            }
        }
        self.open_tag_start = None;
        self.end_tag_start = None;
        while self.stack.depth() > 0 {
            self.close_top(Close::EndOfStream);
        }
        self.window.flush(&mut self.pool, self.encoding, &mut self.out)
    }

    /// Run every selector waiting on `level`, in selector order. Each one sees the
    /// window as left by the previous one.
    fn fire_pending(&mut self, level: u32, mut extent: Extent, implied: bool) {
        for idx in 0..self.selectors.len() {
            if self.selectors[idx].pending_level() == Some(level) {
                self.fire(idx, &mut extent, level, implied);
            }
        }
    }

    /// Run selector `idx` at its placement relative to `extent`, then move every
    /// window offset past the edit.
    fn fire(&mut self, idx: usize, extent: &mut Extent, level: u32, implied: bool) {
        let placement = self.selectors[idx].placement();
        let target = match placement {
            Placement::Element => extent.start..extent.end,
            Placement::Before => extent.start..extent.start,
            Placement::After => extent.tail..extent.tail,
        };
        let from = target.end;
        let (fired, end) = {
            let mut span = TokenSpan::new(&mut self.pool, self.window.ids_mut(), target);
            let fired = self.selectors[idx].execute_actions(
                self.registry,
                &mut span,
                level,
                implied,
                self.errors,
            );
            (fired, span.range().end)
        };
        if fired {
            self.stats.actions_fired += 1;
        }
        let delta = end as isize - from as isize;
        match placement {
            Placement::Before => {
                extent.start = extent.start.saturating_add_signed(delta);
                extent.end = extent.end.saturating_add_signed(delta);
            }
            Placement::Element => extent.end = extent.end.saturating_add_signed(delta),
            Placement::After => {}
        }
        extent.tail = extent.tail.saturating_add_signed(delta);
        self.shift_offsets(from, delta);
    }

    /// Keep window offsets after an edit that ended at `from` pointing at the same
    /// tokens.
    fn shift_offsets(&mut self, from: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        self.window.shift_marks(from, delta);
        for offset in [&mut self.open_tag_start, &mut self.end_tag_start]
            .into_iter()
            .flatten()
        {
            if *offset >= from {
                *offset = offset.saturating_add_signed(delta);
            }
        }
        if let Some(construct) = &mut self.construct {
            if construct.start >= from {
                construct.start = construct.start.saturating_add_signed(delta);
            }
        }
    }
}
