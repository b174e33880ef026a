#![no_main]

use libfuzzer_sys::fuzz_target;
use rewriter::Rewriter;

const SELECTORS: &str = r#"
li + li { insertBefore("|"); }
p > b:nth-child(odd) { wrapElement("i"); }
div[class~=x] { replaceInner("-"); }
comment { delete(); }
a[href]:after { insertAfter("*"); }
table td:count(3) { replaceText("."); }
"#;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut rewriter = Rewriter::from_source(SELECTORS).expect("fixed selectors compile");
    let whole = rewriter.rewrite_str(input).expect("in-memory rewrite cannot fail");

    // Output must not depend on how the input is split into reads.
    let mut out = Vec::new();
    rewriter
        .rewrite(Trickle(input.as_bytes()), &mut out)
        .expect("in-memory rewrite cannot fail");
    assert_eq!(String::from_utf8_lossy(&out), whole);

    let mut identity = Rewriter::new(Vec::new());
    assert_eq!(identity.rewrite_str(input).expect("identity rewrite"), input);
});

struct Trickle<'a>(&'a [u8]);

impl std::io::Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.0.is_empty() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.0[0];
        self.0 = &self.0[1..];
        Ok(1)
    }
}
