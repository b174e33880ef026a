//! Character cursor over selector source with line tracking.

use super::{CompileError, CompileErrorKind};

pub(super) struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    pub(super) fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
        }
    }

    pub(super) fn line(&self) -> usize {
        self.line
    }

    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    pub(super) fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    pub(super) fn starts_with(&self, prefix: &str) -> bool {
        self.src[self.pos..].starts_with(prefix)
    }

    pub(super) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    pub(super) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(super) fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// Skip whitespace and `/* */` comments; reports whether anything was skipped.
    pub(super) fn skip_trivia(&mut self) -> Result<bool, CompileError> {
        let start = self.pos;
        loop {
            if self.starts_with("/*") {
                let line = self.line;
                self.pos += 2;
                match self.src[self.pos..].find("*/") {
                    Some(end) => {
                        let body = &self.src[self.pos..self.pos + end];
                        self.line += body.matches('\n').count();
                        self.pos += end + 2;
                    }
                    None => {
                        return Err(CompileError {
                            line,
                            kind: CompileErrorKind::UnterminatedComment,
                        });
                    }
                }
            } else if self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            } else {
                break;
            }
        }
        Ok(self.pos > start)
    }

    /// Body of a string opened by `quote`, which must be the next character.
    /// Backslash escapes the following character.
    pub(super) fn quoted(&mut self, quote: char) -> Result<String, CompileError> {
        let line = self.line;
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => break,
                },
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(CompileError {
            line,
            kind: CompileErrorKind::UnterminatedString,
        })
    }

    pub(super) fn error(&self, kind: CompileErrorKind) -> CompileError {
        CompileError {
            line: self.line,
            kind,
        }
    }

    /// Error for whatever sits at the cursor.
    pub(super) fn unexpected(&self) -> CompileError {
        match self.peek() {
            Some(c) => self.error(CompileErrorKind::UnexpectedChar(c)),
            None => self.error(CompileErrorKind::UnexpectedEnd),
        }
    }
}
