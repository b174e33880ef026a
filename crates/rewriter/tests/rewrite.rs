use std::io::Read;
use std::sync::{Arc, Mutex};

use rewriter::{RewriteStats, Rewriter, RewriterConfig};
use selector::{ActionErrorKind, ActionRegistry};
use test_support::ChunkedReader;

fn rewriter(selectors: &str) -> Rewriter {
    Rewriter::from_source(selectors).expect("selectors compile")
}

fn rewrite(selectors: &str, input: &str) -> String {
    rewriter(selectors)
        .rewrite_str(input)
        .expect("in-memory rewrite cannot fail")
}

fn run<R: Read>(rewriter: &mut Rewriter, reader: R) -> (String, RewriteStats) {
    let mut out = Vec::new();
    let stats = rewriter
        .rewrite(reader, &mut out)
        .expect("in-memory rewrite cannot fail");
    (String::from_utf8(out).expect("output stays UTF-8"), stats)
}

const MIXED: &str = concat!(
    "<!DOCTYPE html>\n",
    "<html><head><title>a < b</title><script>if (x < 1) { y(); }</script></head>\n",
    "<body class=main>\n",
    "<!-- comment --><![CDATA[ raw <p> ]]><?xml-stylesheet href=x?>\n",
    "<ul><li>one<li>two</ul><p>para<p>more <b>bold</b> & stray </i> end\n",
    "<img src=a.png alt='ünïcödé'><br/> <a <b href=\"q\">broken</a>\n",
    "</body></html>\n",
);

#[test]
fn no_selectors_is_identity_and_passes_through() {
    let mut rewriter = Rewriter::new(Vec::new());
    let (out, stats) = run(&mut rewriter, MIXED.as_bytes());
    assert_eq!(out, MIXED);
    assert!(stats.pass_through);
}

#[test]
fn selectors_without_edits_keep_bytes() {
    let mut rewriter = rewriter("table { delete(); } li + li b { delete(); } comment {}");
    let (out, stats) = run(&mut rewriter, MIXED.as_bytes());
    assert_eq!(out, MIXED);
    assert!(!stats.pass_through);
    assert!(stats.implied_closes > 0);
}

#[test]
fn deletes_matched_element() {
    assert_eq!(
        rewrite(
            "script { delete(); }",
            "<p>hi</p><script>x()</script><p>bye</p>"
        ),
        "<p>hi</p><p>bye</p>"
    );
}

#[test]
fn implied_close_ends_the_span() {
    let mut rewriter = rewriter(r#"li { insertBefore("["); insertAfter("]"); }"#);
    let (out, stats) = run(&mut rewriter, "<ul><li>a<li>b</ul>".as_bytes());
    assert_eq!(out, "<ul>[<li>a][<li>b]</ul>");
    assert_eq!(stats.implied_closes, 2);
    assert_eq!(stats.actions_fired, 2);
}

#[test]
fn element_open_at_end_of_input_still_fires() {
    assert_eq!(
        rewrite(r#"div { wrapElement("section"); }"#, "<div>open"),
        "<section><div>open</section>"
    );
}

#[test]
fn nested_matches_fire_innermost_first() {
    assert_eq!(
        rewrite(
            r#"div { insertBefore("["); insertAfter("]"); }"#,
            "<div><div>x</div></div>"
        ),
        "[<div>[<div>x</div>]</div>]"
    );
}

#[test]
fn child_combinator_with_word_match() {
    assert_eq!(
        rewrite(
            r#"ul > li[class~=x] { replaceInner("*"); }"#,
            r#"<ul><li class="x y">a</li><li class="z">b</li></ul><ol><li class=x>c</li></ol>"#
        ),
        r#"<ul><li class="x y">*</li><li class="z">b</li></ul><ol><li class=x>c</li></ol>"#
    );
}

#[test]
fn dash_match_on_unquoted_value() {
    assert_eq!(
        rewrite(
            r#"a[lang|=en] { setAttributeValue("lang", "fr"); }"#,
            "<a lang=en-US>x</a><a lang=de>y</a>"
        ),
        r#"<a lang="fr">x</a><a lang=de>y</a>"#
    );
}

#[test]
fn nth_child_counts_siblings_per_parent() {
    assert_eq!(
        rewrite(
            r#"li:nth-child(odd) { addAttribute("class", "odd"); }"#,
            "<ul><li>1</li><li>2</li><li>3</li></ul><ul><li>4</li></ul>"
        ),
        concat!(
            r#"<ul><li class="odd">1</li><li>2</li><li class="odd">3</li></ul>"#,
            r#"<ul><li class="odd">4</li></ul>"#
        )
    );
}

#[test]
fn adjacent_sibling_chain() {
    assert_eq!(
        rewrite(
            r#"li + li { insertBefore("|"); }"#,
            "<ul><li>a</li><li>b</li><li>c</li></ul>"
        ),
        "<ul><li>a</li>|<li>b</li>|<li>c</li></ul>"
    );
}

#[test]
fn before_and_after_placements() {
    assert_eq!(
        rewrite(
            r#"p:before { insertBefore("<hr>"); } p:after { insertAfter("<br>"); }"#,
            "<div><p>x</p></div>"
        ),
        "<div><hr><p>x</p><br></div>"
    );
}

#[test]
fn void_elements_fire_immediately() {
    assert_eq!(
        rewrite(
            r#"img { removeAttribute("src"); } p > b { delete(); }"#,
            "<p><img src=a.png alt=x><b>t</b></p>"
        ),
        "<p><img alt=x></p>"
    );
}

#[test]
fn start_and_count_window_then_pass_through() {
    let mut rewriter = rewriter("li:start(2):count(1) { delete(); }");
    let (out, stats) = run(
        &mut rewriter,
        "<ul><li>1</li><li>2</li><li>3</li></ul>".as_bytes(),
    );
    assert_eq!(out, "<ul><li>1</li><li>3</li></ul>");
    assert!(stats.pass_through);
    assert_eq!(stats.actions_fired, 1);
}

#[test]
fn done_expires_after_the_current_firing() {
    assert_eq!(
        rewrite(
            r#"p { done(); insertBefore("*"); }"#,
            "<p>a</p><p>b</p>"
        ),
        "*<p>a</p><p>b</p>"
    );
}

#[test]
fn predicates_gate_later_actions() {
    assert_eq!(
        rewrite(
            r#"p { contains("secret"); delete(); }"#,
            "<p>public</p><p>top secret</p>"
        ),
        "<p>public</p>"
    );
    assert_eq!(
        rewrite(
            r#"p { notContainsIgnoreCase("KEEP"); delete(); }"#,
            "<p>keep me</p><p>drop</p>"
        ),
        "<p>keep me</p>"
    );
}

#[test]
fn comments_and_doctype_are_selectable() {
    assert_eq!(
        rewrite("comment { delete(); }", "<p>a<!-- x -->b</p>"),
        "<p>ab</p>"
    );
    assert_eq!(
        rewrite("doctype { delete(); }", "<!DOCTYPE html><p>x</p>"),
        "<p>x</p>"
    );
}

#[test]
fn action_errors_are_collected_not_fatal() {
    let mut rewriter = rewriter(r#"p { regexReplace("(", "x"); } b { nope(); }"#);
    assert_eq!(rewriter.unresolved_actions(), ["std.nope"]);

    let (out, _) = run(&mut rewriter, "<p>a</p><b>c</b>".as_bytes());
    assert_eq!(out, "<p>a</p><b>c</b>");

    let errors = rewriter.take_action_errors();
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0].kind, ActionErrorKind::InvalidPattern(_)));
    assert_eq!(errors[1].function, "std.nope");
    assert_eq!(errors[1].kind, ActionErrorKind::Unresolved);
    assert!(rewriter.take_action_errors().is_empty());
}

#[test]
fn custom_library_functions() {
    let mut registry = ActionRegistry::new();
    registry.register("site", "stamp", |state, span, args| {
        let label = format!("{}#{}", args[0], state.matches());
        span.insert(0, html::TokenKind::Text, &label);
        Ok(true)
    });
    let mut rewriter = rewriter(r#"em { site.stamp("v"); }"#).with_registry(Arc::new(registry));
    assert_eq!(
        rewriter.rewrite_str("<em>a</em><em>b</em>").unwrap(),
        "v#1<em>a</em>v#2<em>b</em>"
    );
}

#[test]
fn minimization_collapses_whitespace_and_drops_comments() {
    let config = RewriterConfig {
        minimize_html: true,
        ..RewriterConfig::default()
    };
    let mut rewriter = Rewriter::new(Vec::new()).with_config(config);
    let (out, stats) = run(
        &mut rewriter,
        "<div>\n  <p>a   b</p>\n  <!-- note -->\n  <pre>  keep  </pre>\n</div>".as_bytes(),
    );
    assert_eq!(out, "<div><p>a b</p><pre>  keep  </pre></div>");
    assert!(!stats.pass_through);
}

#[test]
fn minimization_follows_skip_tags_through_implied_and_stray_closes() {
    let config = RewriterConfig {
        minimize_html: true,
        ..RewriterConfig::default()
    };
    let mut rewriter = Rewriter::new(Vec::new()).with_config(config);
    assert_eq!(
        rewriter
            .rewrite_str("<pre>  a  </textarea>  b  </pre>  c  ")
            .unwrap(),
        "<pre>  a  </textarea>  b  </pre> c "
    );
    assert_eq!(
        rewriter.rewrite_str("<div><pre>  a  </div>  b   c").unwrap(),
        "<div><pre>  a  </div> b c"
    );
}

#[test]
fn minimization_keeps_matched_comments() {
    let config = RewriterConfig {
        minimize_html: true,
        ..RewriterConfig::default()
    };
    let mut rewriter =
        rewriter(r#"comment { insertBefore("!"); }"#).with_config(config);
    assert_eq!(
        rewriter.rewrite_str("<p> a  <!-- keep   me --> </p>").unwrap(),
        "<p> a !<!-- keep   me --></p>"
    );
}

#[test]
fn each_run_starts_fresh() {
    let mut rewriter = rewriter("li:count(1) { delete(); }");
    for _ in 0..2 {
        assert_eq!(
            rewriter.rewrite_str("<ul><li>1</li><li>2</li></ul>").unwrap(),
            "<ul><li>2</li></ul>"
        );
    }
}

#[test]
fn output_does_not_depend_on_read_sizes() {
    let cases = [
        (r#"li { insertBefore("["); insertAfter("]"); }"#, MIXED),
        ("b { delete(); } comment { delete(); }", MIXED),
        (r#"p:after { insertAfter("¶"); }"#, MIXED),
        (r#"li + li { regexReplace("t(w)o", "$1"); }"#, MIXED),
    ];
    for (selectors, input) in cases {
        let mut rewriter = rewriter(selectors);
        let (whole, _) = run(&mut rewriter, input.as_bytes());
        for chunk in [1, 2, 7, 64] {
            let (chunked, _) = run(&mut rewriter, ChunkedReader::new(input.as_bytes(), chunk));
            assert_eq!(chunked, whole, "{selectors:?} with {chunk}-byte reads");
        }
    }
}

#[test]
fn legacy_encoding_bytes_survive_rewritten_regions() {
    let mut config = RewriterConfig::default();
    config.set_encoding("windows-1252").expect("known label");
    let mut rewriter = rewriter("p { insertBefore(\"\u{00BB}\"); }").with_config(config);
    let input: &[u8] = b"<p>caf\xe9</p><p title=na\xefve>x</p>";
    for chunk in [input.len(), 1, 3] {
        let mut out = Vec::new();
        rewriter
            .rewrite(ChunkedReader::new(input, chunk), &mut out)
            .expect("in-memory rewrite cannot fail");
        assert_eq!(out, b"\xbb<p>caf\xe9</p>\xbb<p title=na\xefve>x</p>");
    }
    // Strings are always UTF-8.
    assert_eq!(
        rewriter.rewrite_str("<p>\u{00E9}</p>").unwrap(),
        "\u{00BB}<p>\u{00E9}</p>"
    );
}

#[test]
fn void_element_action_sees_only_its_start_tag() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = ActionRegistry::new();
    let sink = Arc::clone(&seen);
    registry.register("site", "capture", move |_, span, _| {
        let kinds: Vec<html::TokenKind> = span.tokens().map(|token| token.kind()).collect();
        sink.lock().unwrap().push((span.to_html(), kinds));
        Ok(true)
    });
    let mut rewriter = rewriter("br { site.capture(); }").with_registry(Arc::new(registry));
    assert_eq!(
        rewriter.rewrite_str("a<br></br>b<br/>c").unwrap(),
        "a<br></br>b<br/>c"
    );

    let seen = seen.lock().unwrap();
    let spans: Vec<&str> = seen.iter().map(|(html, _)| html.as_str()).collect();
    assert_eq!(spans, ["<br>", "<br/>"]);
    assert!(
        seen.iter()
            .all(|(_, kinds)| !kinds.contains(&html::TokenKind::OpenEndTag))
    );
}
