//! Buffered byte source for the lexer.

use std::io::{self, Read, Write};

pub(crate) struct ByteSource<R> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    eof: bool,
    refill: usize,
    consumed: u64,
}

impl<R: Read> ByteSource<R> {
    pub(crate) fn new(reader: R, refill: usize) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(refill),
            pos: 0,
            eof: false,
            refill: refill.max(1),
            consumed: 0,
        }
    }

    pub(crate) fn available(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    pub(crate) fn peek(&self, offset: usize) -> Option<u8> {
        self.available().get(offset).copied()
    }

    pub(crate) fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.available().len(), "consume past buffered input");
        self.pos += n;
        self.consumed += n as u64;
    }

    /// Bytes handed out so far.
    pub(crate) fn position(&self) -> u64 {
        self.consumed
    }

    /// Append the next read to the buffer; `Ok(false)` once the reader is exhausted.
    pub(crate) fn fill_more(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.pos > 0 && self.pos * 2 >= self.buf.len() {
            self.buf.drain(..self.pos);
            self.pos = 0;
        }
        let old_len = self.buf.len();
        self.buf.resize(old_len + self.refill, 0);
        loop {
            match self.reader.read(&mut self.buf[old_len..]) {
                Ok(0) => {
                    self.buf.truncate(old_len);
                    self.eof = true;
                    return Ok(false);
                }
                Ok(n) => {
                    self.buf.truncate(old_len + n);
                    return Ok(true);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    self.buf.truncate(old_len);
                    return Err(err);
                }
            }
        }
    }

    /// Buffer at least `n` bytes unless input ends first; returns the buffered length.
    pub(crate) fn fill_to(&mut self, n: usize) -> io::Result<usize> {
        while self.available().len() < n {
            if !self.fill_more()? {
                break;
            }
        }
        Ok(self.available().len())
    }

    /// Copy buffered bytes and the unread rest of the reader to `out`.
    pub(crate) fn drain_into<W: Write + ?Sized>(&mut self, out: &mut W) -> io::Result<u64> {
        let buffered = self.available().len();
        out.write_all(&self.buf[self.pos..])?;
        self.consume(buffered);
        let mut copied = buffered as u64;
        if !self.eof {
            copied += io::copy(&mut self.reader, out)?;
            self.eof = true;
        }
        self.consumed += copied - buffered as u64;
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_to_stops_at_end_of_input() {
        let mut source = ByteSource::new(&b"abc"[..], 2);
        assert_eq!(source.fill_to(2).unwrap(), 2);
        assert_eq!(source.fill_to(10).unwrap(), 3);
        source.consume(1);
        assert_eq!(source.available(), b"bc");
        assert_eq!(source.position(), 1);
        assert!(!source.fill_more().unwrap());
    }

    #[test]
    fn drain_copies_buffered_and_unread_bytes() {
        let mut source = ByteSource::new(&b"hello world"[..], 4);
        source.fill_to(3).unwrap();
        source.consume(2);
        let mut out = Vec::new();
        let copied = source.drain_into(&mut out).unwrap();
        assert_eq!(out, b"llo world");
        assert_eq!(copied, 9);
        assert_eq!(source.position(), 11);
    }
}
