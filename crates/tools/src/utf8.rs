//! Incremental UTF-8 helpers for streaming byte sources.
//!
//! Byte runs cut at arbitrary positions (read-buffer refills, chunked token runs,
//! raw pass-through copies) are stitched back together here without splitting a
//! multi-byte character. Invalid sequences decode to U+FFFD so decoding always
//! makes forward progress.

use std::io;

/// Append a byte chunk to `text`, using `carry` to hold an incomplete UTF-8
/// suffix until the next chunk completes it.
pub fn push_utf8_chunk(text: &mut String, carry: &mut Vec<u8>, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    if carry.is_empty() {
        decode_bytes(text, carry, bytes);
        return;
    }

    // `carry` is at most 3 bytes, so borrow only the bytes needed to finish it.
    let mut remaining = bytes;
    while !carry.is_empty() && !remaining.is_empty() {
        let expected_len = utf8_seq_len(carry[0]);
        if expected_len == 0 {
            text.push('\u{FFFD}');
            carry.clear();
            break;
        }
        let needed = expected_len.saturating_sub(carry.len());
        if remaining.len() < needed {
            carry.extend_from_slice(remaining);
            return;
        }
        let mut scratch = [0u8; 8];
        let carry_len = carry.len();
        scratch[..carry_len].copy_from_slice(carry);
        scratch[carry_len..carry_len + needed].copy_from_slice(&remaining[..needed]);
        carry.clear();
        decode_bytes(text, carry, &scratch[..carry_len + needed]);
        remaining = &remaining[needed..];
    }

    if !remaining.is_empty() {
        decode_bytes(text, carry, remaining);
    }
}

/// Flush carried bytes into `text` (lossy) so a stream is never silently truncated.
pub fn finish_utf8(text: &mut String, carry: &mut Vec<u8>) {
    if carry.is_empty() {
        return;
    }
    text.push_str(&String::from_utf8_lossy(carry));
    carry.clear();
}

/// Length of the longest prefix of `bytes` that does not end inside a
/// multi-byte sequence.
///
/// Only the last three bytes are inspected; malformed input is treated as
/// complete so callers always make progress.
pub fn complete_prefix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let window = len.min(3);
    for back in 1..=window {
        let idx = len - back;
        let byte = bytes[idx];
        if byte & 0xC0 == 0x80 {
            // continuation byte, keep looking for the lead byte
            continue;
        }
        let expected = utf8_seq_len(byte);
        if expected > back {
            return idx;
        }
        return len;
    }
    len
}

fn utf8_seq_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

fn decode_bytes(text: &mut String, carry: &mut Vec<u8>, mut bytes: &[u8]) {
    while !bytes.is_empty() {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                text.push_str(s);
                break;
            }
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                let (valid, rest) = bytes.split_at(valid_up_to);
                text.push_str(&String::from_utf8_lossy(valid));
                match e.error_len() {
                    Some(len) => {
                        text.push('\u{FFFD}');
                        bytes = &rest[len..];
                    }
                    None => {
                        carry.extend_from_slice(rest);
                        break;
                    }
                }
            }
        }
    }
}

/// `io::Write` adapter that decodes everything written into a `String`.
///
/// Writers may hand over bytes cut anywhere; characters split across writes are
/// reassembled through the carry buffer.
#[derive(Debug, Default)]
pub struct Utf8Sink {
    text: String,
    carry: Vec<u8>,
}

impl Utf8Sink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            carry: Vec::new(),
        }
    }

    /// Bytes held back waiting for the rest of a character.
    pub fn pending(&self) -> &[u8] {
        &self.carry
    }

    pub fn into_string(mut self) -> String {
        finish_utf8(&mut self.text, &mut self.carry);
        self.text
    }
}

impl io::Write for Utf8Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        push_utf8_chunk(&mut self.text, &mut self.carry, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
