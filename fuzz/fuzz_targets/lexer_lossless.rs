#![no_main]

use html::{HtmlLexer, LexerConfig, TokenKind, TokenPool};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = LexerConfig {
        max_token_run: 32,
        read_buffer_size: 7,
        ..LexerConfig::default()
    };
    let mut pool = TokenPool::new();
    let mut lexer = HtmlLexer::new(data, config);
    let mut rebuilt = Vec::with_capacity(data.len());
    loop {
        let id = lexer.advance(&mut pool).expect("in-memory reads cannot fail");
        let token = pool.get(id);
        if token.is(TokenKind::EndOfStream) {
            break;
        }
        assert!(!token.text().is_empty(), "empty {:?} token", token.kind());
        rebuilt.extend_from_slice(token.text().as_bytes());
        pool.release(id);
    }
    // Invalid UTF-8 is replaced, so only valid input round-trips byte for byte.
    if std::str::from_utf8(data).is_ok() {
        assert_eq!(rebuilt, data);
    }
});
