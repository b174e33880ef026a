use std::io::{self, Read};

use html::token::POOL_BLOCK;
use html::{HtmlLexer, LexerConfig, TokenKind, TokenPool};

/// `blocks` copies of `block`, produced on the fly.
struct Repeat {
    block: &'static [u8],
    blocks: usize,
    offset: usize,
}

impl Read for Repeat {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.blocks == 0 {
            return Ok(0);
        }
        let n = (self.block.len() - self.offset).min(buf.len());
        buf[..n].copy_from_slice(&self.block[self.offset..self.offset + n]);
        self.offset += n;
        if self.offset == self.block.len() {
            self.offset = 0;
            self.blocks -= 1;
        }
        Ok(n)
    }
}

#[test]
fn released_tokens_keep_the_pool_small() {
    let block = b"<div class=box><span>hello</span><img src=x><!-- c --></div>\n";
    let mut pool = TokenPool::new();
    let mut lexer = HtmlLexer::new(
        Repeat {
            block,
            blocks: 10_000,
            offset: 0,
        },
        LexerConfig::default(),
    );
    let mut tokens = 0u64;
    loop {
        let id = lexer.advance(&mut pool).expect("in-memory reads cannot fail");
        let kind = pool.kind(id);
        pool.release(id);
        if kind == TokenKind::EndOfStream {
            break;
        }
        tokens += 1;
    }
    assert!(tokens > 100_000);
    let stats = pool.stats();
    assert_eq!(stats.live, 0);
    assert_eq!(stats.capacity, POOL_BLOCK);
}

#[test]
fn long_text_is_bounded_by_max_token_run() {
    let text = "x".repeat(10_000);
    let input = format!("<p>{text}</p>");
    let config = LexerConfig {
        max_token_run: 512,
        read_buffer_size: 100,
        ..LexerConfig::default()
    };
    let mut pool = TokenPool::new();
    let mut lexer = HtmlLexer::new(input.as_bytes(), config);
    let mut rebuilt = String::new();
    let mut longest = 0;
    loop {
        let id = lexer.advance(&mut pool).expect("in-memory reads cannot fail");
        let token = pool.get(id);
        if token.is(TokenKind::EndOfStream) {
            break;
        }
        if token.is(TokenKind::Text) {
            longest = longest.max(token.text().len());
        }
        rebuilt.push_str(token.text());
        pool.release(id);
    }
    assert_eq!(rebuilt, input);
    assert!(longest <= 512, "text token of {longest} bytes");
    assert!(lexer.stats().chunked_runs > 0);
}
