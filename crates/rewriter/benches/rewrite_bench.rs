use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rewriter::{Rewriter, RewriterConfig};
use test_support::ChunkedReader;

const BLOCKS: usize = 20_000;

fn make_document(blocks: usize) -> String {
    let block = concat!(
        "<div class=\"card x\"><h2>title</h2>\n",
        "<ul><li>one<li>two<li>three</ul>\n",
        "<p>para <a href=\"/link\">link</a> <img src=a.png></p><!-- note --></div>\n",
    );
    let mut out = String::with_capacity(block.len() * blocks + 32);
    out.push_str("<!DOCTYPE html><html><body>\n");
    for _ in 0..blocks {
        out.push_str(block);
    }
    out.push_str("</body></html>\n");
    out
}

fn bench_identity(c: &mut Criterion) {
    let input = make_document(BLOCKS);
    let mut rewriter = Rewriter::new(Vec::new());
    c.bench_function("bench_rewrite_identity_pass_through", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(input.len());
            rewriter.rewrite(black_box(input.as_bytes()), &mut out).unwrap();
            black_box(out.len());
        });
    });
}

fn bench_selectors(c: &mut Criterion) {
    let input = make_document(BLOCKS);
    let mut rewriter = Rewriter::from_source(
        r#"
        li + li { insertBefore("|"); }
        div[class~=x] > h2 { replaceText("T"); }
        a[href] { setAttributeValue("rel", "nofollow"); }
        comment { delete(); }
        "#,
    )
    .unwrap();
    c.bench_function("bench_rewrite_selectors", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(input.len());
            rewriter.rewrite(black_box(input.as_bytes()), &mut out).unwrap();
            black_box(out.len());
        });
    });
}

fn bench_selectors_chunked(c: &mut Criterion) {
    let input = make_document(BLOCKS / 10);
    let mut rewriter = Rewriter::from_source(r#"li { wrapElement("b"); }"#).unwrap();
    c.bench_function("bench_rewrite_chunked_reads", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(input.len());
            rewriter
                .rewrite(ChunkedReader::new(black_box(input.as_bytes()), 7), &mut out)
                .unwrap();
            black_box(out.len());
        });
    });
}

fn bench_minimize(c: &mut Criterion) {
    let input = make_document(BLOCKS);
    let config = RewriterConfig {
        minimize_html: true,
        ..RewriterConfig::default()
    };
    let mut rewriter = Rewriter::new(Vec::new()).with_config(config);
    c.bench_function("bench_rewrite_minimize", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(input.len());
            rewriter.rewrite(black_box(input.as_bytes()), &mut out).unwrap();
            black_box(out.len());
        });
    });
}

criterion_group!(
    benches,
    bench_identity,
    bench_selectors,
    bench_selectors_chunked,
    bench_minimize
);
criterion_main!(benches);
