//! Streaming HTML lexer.
//!
//! Pulls one lexical token per [`HtmlLexer::advance`] call from any `Read` source and
//! stores it in the caller's [`TokenPool`]. The lexer never builds structure; it only
//! tracks enough lexical context to know whether the next byte belongs to text, a tag,
//! an attribute value, a comment, CDATA or raw-text element content.
//!
//! Invariants:
//! - Forward progress: every token except `EndOfStream` consumes at least one byte.
//! - Lossless: concatenating the text of all tokens reproduces the input decoded
//!   from [`LexerConfig::encoding`] (modulo U+FFFD substitution of malformed
//!   sequences).
//! - Bounded runs: text, comment, CDATA and raw-text content longer than
//!   `max_token_run` bytes is split across tokens of the same kind, never inside a
//!   terminator such as `-->`. UTF-8 runs never split a character; other multi-byte
//!   encodings prefer an ASCII boundary and carry a split character in the decoder.
//! - Read-size independence: the token sequence does not depend on how the reader
//!   chunks its bytes.

use std::borrow::Cow;
use std::io::{self, Read, Write};

use encoding_rs::{CoderResult, Decoder, Encoding, UTF_8};
use memchr::{memchr, memmem, memrchr};
use tools::utf8::complete_prefix_len;

use crate::symbols::ElementSymbol;
use crate::token::{TokenId, TokenKind, TokenPool};
use input::ByteSource;
use states::LexerState;

mod input;
mod states;


const COMMENT_START: &[u8] = b"<!--";
const COMMENT_END: &[u8] = b"-->";
const CDATA_START: &[u8] = b"<![CDATA[";
const CDATA_END: &[u8] = b"]]>";
/// Smallest accepted run limit; keeps room for terminators and UTF-8 sequences.
const MIN_TOKEN_RUN: usize = 16;

/// Configuration for the lexer.
#[derive(Clone, Debug)]
pub struct LexerConfig {
    /// Longest text/comment/CDATA run returned as one token.
    pub max_token_run: usize,
    /// Bytes requested from the reader per refill.
    pub read_buffer_size: usize,
    /// Character encoding of the input; see [`encoding_for_label`].
    pub encoding: &'static Encoding,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            max_token_run: 4096,
            read_buffer_size: 8192,
            encoding: UTF_8,
        }
    }
}

/// Resolve an encoding label (`"utf-8"`, `"latin1"`, `"shift_jis"`, ...).
///
/// Only encodings that keep ASCII bytes as ASCII and can be written back as
/// themselves are accepted, since markup is recognized on raw bytes.
pub fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
        .filter(|encoding| encoding.is_ascii_compatible() && encoding.output_encoding() == *encoding)
}

/// Minimal lexer instrumentation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LexerStats {
    pub tokens: u64,
    pub state_transitions: u64,
    pub chunked_runs: u64,
}

enum Step {
    Emit(TokenKind, usize),
    Continue,
    EndOfStream,
}

enum Run {
    Found(usize),
    Chunk(usize),
    Eof(usize),
}

impl Run {
    fn len(&self) -> usize {
        match *self {
            Run::Found(n) | Run::Chunk(n) | Run::Eof(n) => n,
        }
    }
}

#[derive(Clone, Copy)]
enum Boundary {
    Utf8,
    SingleByte,
    /// Legacy multi-byte encoding.
    MultiByte,
}

impl Boundary {
    fn of(encoding: &'static Encoding) -> Self {
        if encoding == UTF_8 {
            Boundary::Utf8
        } else if encoding.is_single_byte() {
            Boundary::SingleByte
        } else {
            Boundary::MultiByte
        }
    }
}

#[derive(Clone, Copy)]
enum TailGuard {
    Utf8,
    /// Keep a trailing partial terminator for the next call.
    Terminator(&'static [u8]),
    /// Keep a trailing `<` that may start a raw-text close tag of this length.
    CloseTag(usize),
}

pub struct HtmlLexer<R> {
    input: ByteSource<R>,
    config: LexerConfig,
    state: LexerState,
    in_start_tag: bool,
    open_symbol: Option<&'static ElementSymbol>,
    raw_text_close: Option<&'static str>,
    /// Streaming decoder for non-UTF-8 input; taken once the last bytes are decoded.
    decoder: Option<Decoder>,
    boundary: Boundary,
    stats: LexerStats,
}

impl<R: Read> HtmlLexer<R> {
    pub fn new(reader: R, config: LexerConfig) -> Self {
        let refill = config.read_buffer_size;
        let encoding = config.encoding;
        Self {
            input: ByteSource::new(reader, refill),
            config: LexerConfig {
                max_token_run: config.max_token_run.max(MIN_TOKEN_RUN),
                ..config
            },
            state: LexerState::Text,
            in_start_tag: false,
            open_symbol: None,
            raw_text_close: None,
            decoder: (encoding != UTF_8).then(|| encoding.new_decoder_without_bom_handling()),
            boundary: Boundary::of(encoding),
            stats: LexerStats::default(),
        }
    }

    /// Lex the next token; returns an `EndOfStream` token once input is exhausted.
    ///
    /// Only I/O errors from the reader surface here; malformed markup is tokenized
    /// as `Unknown`/`Text` tokens instead.
    pub fn advance(&mut self, pool: &mut TokenPool) -> io::Result<TokenId> {
        loop {
            match self.step()? {
                Step::Emit(kind, len) => return Ok(self.emit(pool, kind, len)),
                Step::Continue => {}
                Step::EndOfStream => {
                    if let Some(tail) = self.finish_decoding() {
                        return Ok(pool.alloc(TokenKind::Text, &tail));
                    }
                    return Ok(pool.alloc(TokenKind::EndOfStream, ""));
                }
            }
        }
    }

    /// Bytes consumed into tokens (or copied out) so far.
    pub fn position(&self) -> u64 {
        self.input.position()
    }

    pub fn stats(&self) -> LexerStats {
        self.stats
    }

    pub fn is_at_end(&self) -> bool {
        self.state == LexerState::Eof
    }

    /// Copy everything not yet tokenized to `out`, byte for byte, and finish.
    pub fn copy_remaining<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<u64> {
        let copied = self.input.drain_into(out)?;
        self.transition_to(LexerState::Eof);
        Ok(copied)
    }

    fn emit(&mut self, pool: &mut TokenPool, kind: TokenKind, len: usize) -> TokenId {
        debug_assert!(len > 0, "{kind:?} token must consume input");
        let id = {
            let bytes = &self.input.available()[..len];
            let text = match &mut self.decoder {
                Some(decoder) => Cow::Owned(decode(decoder, bytes, false)),
                None => String::from_utf8_lossy(bytes),
            };
            pool.alloc(kind, &text)
        };
        self.input.consume(len);
        self.stats.tokens = self.stats.tokens.saturating_add(1);
        if kind == TokenKind::TagName && self.in_start_tag {
            self.open_symbol = pool.get(id).symbol();
        }
        id
    }

    /// Characters still held by the decoder after the last byte; malformed tails
    /// decode to U+FFFD.
    fn finish_decoding(&mut self) -> Option<String> {
        let mut decoder = self.decoder.take()?;
        let tail = decode(&mut decoder, &[], true);
        (!tail.is_empty()).then_some(tail)
    }

    fn transition_to(&mut self, next: LexerState) {
        if self.state == next {
            return;
        }
        #[cfg(any(test, feature = "debug-stats"))]
        {
            log::trace!(
                target: "html.lexer",
                "state {:?} -> {:?} @{}",
                self.state,
                next,
                self.input.position()
            );
        }
        self.state = next;
        self.stats.state_transitions = self.stats.state_transitions.saturating_add(1);
    }

    fn step(&mut self) -> io::Result<Step> {
        match self.state {
            LexerState::Text => self.step_text(),
            LexerState::TagName => self.step_tag_name(),
            LexerState::InTag => self.step_in_tag(),
            LexerState::AttributeValue => self.step_attribute_value(),
            LexerState::Comment => self.step_delimited(COMMENT_END, TokenKind::Comment),
            LexerState::Cdata => self.step_delimited(CDATA_END, TokenKind::Cdata),
            LexerState::RawText => self.step_raw_text(),
            LexerState::Eof => Ok(Step::EndOfStream),
        }
    }

    fn end_of_input(&mut self) -> Step {
        self.transition_to(LexerState::Eof);
        Step::EndOfStream
    }

    fn step_text(&mut self) -> io::Result<Step> {
        if self.input.fill_to(1)? == 0 {
            return Ok(self.end_of_input());
        }
        if self.input.peek(0) == Some(b'<') {
            return self.step_markup();
        }
        let run = self.scan_run(|bytes| memchr(b'<', bytes), TailGuard::Utf8)?;
        Ok(Step::Emit(TokenKind::Text, run.len()))
    }

    fn step_markup(&mut self) -> io::Result<Step> {
        self.input.fill_to(CDATA_START.len())?;
        let bytes = self.input.available();
        if bytes.starts_with(COMMENT_START) {
            self.transition_to(LexerState::Comment);
            return Ok(Step::Emit(TokenKind::CommentStart, COMMENT_START.len()));
        }
        if bytes.starts_with(CDATA_START) {
            self.transition_to(LexerState::Cdata);
            return Ok(Step::Emit(TokenKind::CdataStart, CDATA_START.len()));
        }
        if bytes.starts_with(b"<!") {
            return self.step_declaration(TokenKind::Doctype);
        }
        if bytes.starts_with(b"<?") {
            return self.step_declaration(TokenKind::ProcessingInstruction);
        }
        let second = bytes.get(1).copied();
        let third = bytes.get(2).copied();
        match (second, third) {
            (Some(b'/'), Some(ch)) if ch.is_ascii_alphabetic() => {
                self.in_start_tag = false;
                self.transition_to(LexerState::TagName);
                Ok(Step::Emit(TokenKind::OpenEndTag, 2))
            }
            (Some(ch), _) if ch.is_ascii_alphabetic() => {
                self.in_start_tag = true;
                self.transition_to(LexerState::TagName);
                Ok(Step::Emit(TokenKind::OpenTag, 1))
            }
            // Recovery: not a tag opener, the `<` is literal text.
            _ => Ok(Step::Emit(TokenKind::Unknown, 1)),
        }
    }

    /// `<!...>` and `<?...>` are taken verbatim through the first `>`.
    fn step_declaration(&mut self, kind: TokenKind) -> io::Result<Step> {
        let len = match self.scan_until(2, |b| b == b'>')? {
            Some(idx) => idx + 1,
            None => self.input.available().len(),
        };
        Ok(Step::Emit(kind, len))
    }

    fn step_tag_name(&mut self) -> io::Result<Step> {
        let len = match self.scan_until(0, |b| is_space(b) || b == b'/' || b == b'>')? {
            Some(idx) => idx,
            None => self.input.available().len(),
        };
        if len == 0 {
            // Only reachable at end of input; the opener guaranteed a name byte.
            return Ok(self.end_of_input());
        }
        self.transition_to(LexerState::InTag);
        Ok(Step::Emit(TokenKind::TagName, len))
    }

    fn step_in_tag(&mut self) -> io::Result<Step> {
        if self.input.fill_to(2)? == 0 {
            return Ok(self.end_of_input());
        }
        let Some(first) = self.input.peek(0) else {
            return Ok(self.end_of_input());
        };
        match first {
            b'>' => {
                self.finish_open_tag(true);
                Ok(Step::Emit(TokenKind::CloseTag, 1))
            }
            b'/' if self.input.peek(1) == Some(b'>') => {
                self.finish_open_tag(false);
                Ok(Step::Emit(TokenKind::SelfCloseEnd, 2))
            }
            b'/' => Ok(Step::Emit(TokenKind::Unknown, 1)),
            b'=' => {
                self.transition_to(LexerState::AttributeValue);
                Ok(Step::Emit(TokenKind::Equals, 1))
            }
            b if is_space(b) => self.step_whitespace(),
            _ => {
                let len = self
                    .scan_until(1, |b| is_space(b) || matches!(b, b'=' | b'>' | b'/'))?
                    .unwrap_or_else(|| self.input.available().len());
                Ok(Step::Emit(TokenKind::AttributeName, len))
            }
        }
    }

    fn step_attribute_value(&mut self) -> io::Result<Step> {
        if self.input.fill_to(1)? == 0 {
            return Ok(self.end_of_input());
        }
        let Some(first) = self.input.peek(0) else {
            return Ok(self.end_of_input());
        };
        match first {
            b if is_space(b) => self.step_whitespace(),
            b'>' => {
                // `name=>`: empty value, the `>` closes the tag.
                self.transition_to(LexerState::InTag);
                Ok(Step::Continue)
            }
            quote @ (b'"' | b'\'') => {
                let len = match self.scan_until(1, |b| b == quote)? {
                    Some(idx) => idx + 1,
                    None => self.input.available().len(),
                };
                self.transition_to(LexerState::InTag);
                Ok(Step::Emit(TokenKind::AttributeValue, len))
            }
            _ => {
                let len = self
                    .scan_until(1, |b| is_space(b) || b == b'>')?
                    .unwrap_or_else(|| self.input.available().len());
                self.transition_to(LexerState::InTag);
                Ok(Step::Emit(TokenKind::AttributeValue, len))
            }
        }
    }

    fn step_whitespace(&mut self) -> io::Result<Step> {
        let len = self
            .scan_until(1, |b| !is_space(b))?
            .unwrap_or_else(|| self.input.available().len());
        Ok(Step::Emit(TokenKind::Whitespace, len))
    }

    fn step_delimited(&mut self, terminator: &'static [u8], kind: TokenKind) -> io::Result<Step> {
        if self.input.fill_to(terminator.len())? == 0 {
            return Ok(self.end_of_input());
        }
        if self.input.available().starts_with(terminator) {
            self.transition_to(LexerState::Text);
            let end_kind = match kind {
                TokenKind::Cdata => TokenKind::CdataEnd,
                _ => TokenKind::CommentEnd,
            };
            return Ok(Step::Emit(end_kind, terminator.len()));
        }
        let run = self.scan_run(
            |bytes| memmem::find(bytes, terminator),
            TailGuard::Terminator(terminator),
        )?;
        Ok(Step::Emit(kind, run.len()))
    }

    fn step_raw_text(&mut self) -> io::Result<Step> {
        let Some(name) = self.raw_text_close else {
            self.transition_to(LexerState::Text);
            return Ok(Step::Continue);
        };
        let close_len = name.len() + 2;
        if self.input.fill_to(close_len + 1)? == 0 {
            return Ok(self.end_of_input());
        }
        if raw_text_close_at(self.input.available(), 0, name) {
            self.raw_text_close = None;
            self.transition_to(LexerState::Text);
            return Ok(Step::Continue);
        }
        let run = self.scan_run(
            |bytes| find_raw_text_close(bytes, name),
            TailGuard::CloseTag(close_len + 1),
        )?;
        Ok(Step::Emit(TokenKind::Text, run.len()))
    }

    fn finish_open_tag(&mut self, allow_raw_text: bool) {
        let symbol = self.open_symbol.take();
        let raw_text = allow_raw_text
            && self.in_start_tag
            && symbol.is_some_and(|symbol| symbol.category.is_raw_text());
        self.in_start_tag = false;
        match symbol {
            Some(symbol) if raw_text => {
                self.raw_text_close = Some(symbol.name);
                self.transition_to(LexerState::RawText);
            }
            _ => self.transition_to(LexerState::Text),
        }
    }

    /// Index of the first byte at or after `from` matching `stop`; `None` when input
    /// ends first. Unbounded: used for names, attribute values and declarations.
    fn scan_until(&mut self, from: usize, stop: impl Fn(u8) -> bool) -> io::Result<Option<usize>> {
        let mut scanned = from;
        loop {
            let bytes = self.input.available();
            if let Some(rel) = bytes.get(scanned..).and_then(|rest| rest.iter().position(|b| stop(*b))) {
                return Ok(Some(scanned + rel));
            }
            scanned = scanned.max(bytes.len());
            if !self.input.fill_more()? {
                return Ok(None);
            }
        }
    }

    /// Scan a content run bounded by `max_token_run`.
    fn scan_run(&mut self, find: impl Fn(&[u8]) -> Option<usize>, guard: TailGuard) -> io::Result<Run> {
        let max = self.config.max_token_run;
        loop {
            let bytes = self.input.available();
            let window = &bytes[..bytes.len().min(max)];
            if let Some(idx) = find(window) {
                return Ok(Run::Found(idx));
            }
            if window.len() >= max {
                let end = chunk_end(window, guard, self.boundary);
                self.stats.chunked_runs = self.stats.chunked_runs.saturating_add(1);
                #[cfg(any(test, feature = "debug-stats"))]
                log::trace!(
                    target: "html.lexer",
                    "chunked run of {} bytes in {:?} @{}",
                    end,
                    self.state,
                    self.input.position()
                );
                return Ok(Run::Chunk(end));
            }
            if !self.input.fill_more()? {
                return Ok(Run::Eof(self.input.available().len()));
            }
        }
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0C)
}

fn decode(decoder: &mut Decoder, bytes: &[u8], last: bool) -> String {
    let capacity = decoder
        .max_utf8_buffer_length(bytes.len())
        .unwrap_or(bytes.len().saturating_mul(3));
    let mut text = String::with_capacity(capacity);
    let mut read = 0;
    loop {
        let (result, n, _) = decoder.decode_to_string(&bytes[read..], &mut text, last);
        read += n;
        match result {
            CoderResult::InputEmpty => return text,
            CoderResult::OutputFull => text.reserve(bytes.len() - read + 16),
        }
    }
}

fn chunk_end(window: &[u8], guard: TailGuard, boundary: Boundary) -> usize {
    let mut end = window.len();
    match guard {
        TailGuard::Utf8 => {}
        TailGuard::Terminator(terminator) => {
            for keep in (1..terminator.len()).rev() {
                if window.ends_with(&terminator[..keep]) {
                    end -= keep;
                    break;
                }
            }
        }
        TailGuard::CloseTag(len) => {
            let tail_start = end.saturating_sub(len);
            if let Some(idx) = memrchr(b'<', &window[tail_start..]) {
                end = tail_start + idx;
            }
        }
    }
    let safe = match boundary {
        Boundary::Utf8 => complete_prefix_len(&window[..end]),
        Boundary::SingleByte => end,
        Boundary::MultiByte => ascii_boundary(&window[..end]),
    };
    match safe {
        0 => window.len(),
        n => n,
    }
}

/// Longest prefix ending in two ASCII bytes. Lead bytes of legacy multi-byte
/// encodings are never ASCII, so the second one always ends a character.
fn ascii_boundary(bytes: &[u8]) -> usize {
    bytes
        .windows(2)
        .rposition(|pair| pair[0].is_ascii() && pair[1].is_ascii())
        .map_or(0, |idx| idx + 2)
}

fn starts_with_ignore_ascii_case_at(haystack: &[u8], start: usize, needle: &[u8]) -> bool {
    haystack.len() >= start + needle.len()
        && haystack[start..start + needle.len()].eq_ignore_ascii_case(needle)
}

/// `</name` followed by whitespace, `/` or `>` at `idx`.
fn raw_text_close_at(bytes: &[u8], idx: usize, name: &str) -> bool {
    let name = name.as_bytes();
    bytes.get(idx) == Some(&b'<')
        && bytes.get(idx + 1) == Some(&b'/')
        && starts_with_ignore_ascii_case_at(bytes, idx + 2, name)
        && bytes
            .get(idx + 2 + name.len())
            .is_some_and(|b| is_space(*b) || matches!(b, b'/' | b'>'))
}

fn find_raw_text_close(bytes: &[u8], name: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = memchr(b'<', &bytes[from..]) {
        let idx = from + rel;
        if raw_text_close_at(bytes, idx, name) {
            return Some(idx);
        }
        from = idx + 1;
    }
    None
}
