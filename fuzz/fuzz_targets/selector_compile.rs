#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    if let Err(err) = selector::compile(source) {
        assert!(err.line >= 1, "error without a line: {err}");
    }
});
