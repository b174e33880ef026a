//! Optional whitespace minimization applied to tokens as they enter the window.

use std::borrow::Cow;

use html::TokenKind;

#[derive(Debug)]
pub struct Minimizer {
    skip_tags: Vec<String>,
    /// Open skip-tag elements.
    skip_depth: u32,
    /// Inside CDATA or a comment some selector matched.
    suppressed: bool,
}

impl Minimizer {
    pub fn new(skip_tags: &[String]) -> Self {
        Self {
            skip_tags: skip_tags.iter().map(|tag| tag.to_ascii_lowercase()).collect(),
            skip_depth: 0,
            suppressed: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.skip_depth == 0 && !self.suppressed
    }

    pub fn set_suppressed(&mut self, suppressed: bool) {
        self.suppressed = suppressed;
    }

    fn is_skip_tag(&self, name: &str) -> bool {
        self.skip_tags.iter().any(|tag| tag.eq_ignore_ascii_case(name))
    }

    pub fn open_element(&mut self, name: &str) {
        if self.is_skip_tag(name) {
            self.skip_depth += 1;
        }
    }

    pub fn close_element(&mut self, name: &str) {
        if self.is_skip_tag(name) {
            self.skip_depth = self.skip_depth.saturating_sub(1);
        }
    }

    /// Minimized text for a token; `Cow::Borrowed` means unchanged, an empty
    /// result means the token is dropped.
    pub fn rewrite<'t>(&self, kind: TokenKind, text: &'t str) -> Cow<'t, str> {
        if !self.is_active() {
            return Cow::Borrowed(text);
        }
        match kind {
            TokenKind::Whitespace if text != " " => Cow::Owned(" ".to_string()),
            TokenKind::Text => match collapse_whitespace(text) {
                Cow::Owned(collapsed) if collapsed == " " => Cow::Owned(String::new()),
                Cow::Borrowed(" ") => Cow::Owned(String::new()),
                collapsed => collapsed,
            },
            _ => Cow::Borrowed(text),
        }
    }
}

/// Replace every run of whitespace with a single space.
pub fn collapse_whitespace(text: &str) -> Cow<'_, str> {
    let needs_work = text
        .as_bytes()
        .windows(2)
        .any(|pair| pair[0].is_ascii_whitespace() && pair[1].is_ascii_whitespace())
        || text.bytes().any(|b| b.is_ascii_whitespace() && b != b' ');
    if !needs_work {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_ascii_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs() {
        assert_eq!(collapse_whitespace("a  b\n\tc"), "a b c");
        assert!(matches!(collapse_whitespace("a b"), Cow::Borrowed(_)));
        assert_eq!(collapse_whitespace("\n"), " ");
    }

    #[test]
    fn whitespace_only_text_is_dropped() {
        let minimizer = Minimizer::new(&["pre".to_string()]);
        assert_eq!(minimizer.rewrite(TokenKind::Text, " \n "), "");
        assert_eq!(minimizer.rewrite(TokenKind::Text, " "), "");
        assert_eq!(minimizer.rewrite(TokenKind::Text, " x  y "), " x y ");
        assert_eq!(minimizer.rewrite(TokenKind::Whitespace, "\n  "), " ");
        assert_eq!(minimizer.rewrite(TokenKind::AttributeValue, "\"a  b\""), "\"a  b\"");
    }

    #[test]
    fn skip_tags_and_suppression() {
        let mut minimizer = Minimizer::new(&["PRE".to_string()]);
        minimizer.open_element("pre");
        assert_eq!(minimizer.rewrite(TokenKind::Text, "a  b"), "a  b");
        minimizer.close_element("Pre");
        assert!(minimizer.is_active());
        minimizer.set_suppressed(true);
        assert_eq!(minimizer.rewrite(TokenKind::Text, "  "), "  ");
    }
}
