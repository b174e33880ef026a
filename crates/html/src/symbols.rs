//! Element symbol table.
//!
//! Static, case-insensitive classification of HTML tag names. Each entry carries the
//! element category and the set of tag names whose opening implicitly closes an
//! unclosed element of this kind (`<li>` closes an open `li`, block content closes
//! an open `p`, table sections and cells close their siblings).

use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementCategory {
    Void,
    RawText,
    EscapableRawText,
    Foreign,
    Normal,
    Unknown,
}

impl ElementCategory {
    /// Content runs to the matching close tag without markup recognition.
    pub fn is_raw_text(self) -> bool {
        matches!(self, Self::RawText | Self::EscapableRawText)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ElementSymbol {
    pub name: &'static str,
    pub category: ElementCategory,
    /// Tags that implicitly close this element when opened inside it.
    pub closed_by: &'static [&'static str],
}

impl ElementSymbol {
    pub fn is_void(&self) -> bool {
        self.category == ElementCategory::Void
    }

    pub fn is_closed_by(&self, tag: &str) -> bool {
        self.closed_by
            .iter()
            .any(|name| name.eq_ignore_ascii_case(tag))
    }
}

/// Shared fallback for names missing from the table.
pub static UNKNOWN_ELEMENT: ElementSymbol = sym("", ElementCategory::Unknown, &[]);

/// Case-insensitive lookup; unknown names resolve to [`UNKNOWN_ELEMENT`].
pub fn lookup(name: &str) -> &'static ElementSymbol {
    SYMBOLS
        .binary_search_by(|symbol| cmp_ignore_ascii_case(symbol.name, name))
        .map(|idx| &SYMBOLS[idx])
        .unwrap_or(&UNKNOWN_ELEMENT)
}

/// Full table in lookup order.
pub fn symbols() -> &'static [ElementSymbol] {
    SYMBOLS
}

fn cmp_ignore_ascii_case(known: &str, name: &str) -> Ordering {
    let lowered = name.bytes().map(|b| b.to_ascii_lowercase());
    known.bytes().cmp(lowered)
}

const fn sym(
    name: &'static str,
    category: ElementCategory,
    closed_by: &'static [&'static str],
) -> ElementSymbol {
    ElementSymbol {
        name,
        category,
        closed_by,
    }
}

const CLOSED_BY_LI: &[&str] = &["li"];
const CLOSED_BY_DT: &[&str] = &["dt", "dd"];
const CLOSED_BY_DD: &[&str] = &["dd", "dt"];
const CLOSED_BY_P: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "div",
    "dl",
    "fieldset",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];
const CLOSED_BY_RB: &[&str] = &["rb", "rt", "rtc", "rp"];
const CLOSED_BY_RT: &[&str] = &["rb", "rt", "rtc", "rp"];
const CLOSED_BY_RTC: &[&str] = &["rb", "rtc", "rp"];
const CLOSED_BY_RP: &[&str] = &["rb", "rt", "rtc", "rp"];
const CLOSED_BY_OPTGROUP: &[&str] = &["optgroup"];
const CLOSED_BY_OPTION: &[&str] = &["option", "optgroup"];
const CLOSED_BY_COLGROUP: &[&str] = &["colgroup"];
const CLOSED_BY_THEAD: &[&str] = &["tbody", "tfoot"];
const CLOSED_BY_TBODY: &[&str] = &["tbody", "tfoot"];
const CLOSED_BY_TFOOT: &[&str] = &["tbody"];
const CLOSED_BY_TR: &[&str] = &["tr"];
const CLOSED_BY_TD_TH: &[&str] = &["td", "th"];

// Sorted by name; `lookup` binary-searches this table.
static SYMBOLS: &[ElementSymbol] = &[
    sym("a", ElementCategory::Normal, &[]),
    sym("abbr", ElementCategory::Normal, &[]),
    sym("acronym", ElementCategory::Normal, &[]),
    sym("address", ElementCategory::Normal, &[]),
    sym("applet", ElementCategory::Normal, &[]),
    sym("area", ElementCategory::Void, &[]),
    sym("article", ElementCategory::Normal, &[]),
    sym("aside", ElementCategory::Normal, &[]),
    sym("audio", ElementCategory::Normal, &[]),
    sym("b", ElementCategory::Normal, &[]),
    sym("base", ElementCategory::Void, &[]),
    sym("basefont", ElementCategory::Normal, &[]),
    sym("bdi", ElementCategory::Normal, &[]),
    sym("bdo", ElementCategory::Normal, &[]),
    sym("big", ElementCategory::Normal, &[]),
    sym("blockquote", ElementCategory::Normal, &[]),
    sym("body", ElementCategory::Normal, &[]),
    sym("br", ElementCategory::Void, &[]),
    sym("button", ElementCategory::Normal, &[]),
    sym("canvas", ElementCategory::Normal, &[]),
    sym("caption", ElementCategory::Normal, &[]),
    sym("center", ElementCategory::Normal, &[]),
    sym("cite", ElementCategory::Normal, &[]),
    sym("code", ElementCategory::Normal, &[]),
    sym("col", ElementCategory::Void, &[]),
    sym("colgroup", ElementCategory::Normal, CLOSED_BY_COLGROUP),
    sym("command", ElementCategory::Normal, &[]),
    sym("datalist", ElementCategory::Normal, &[]),
    sym("dd", ElementCategory::Normal, CLOSED_BY_DD),
    sym("del", ElementCategory::Normal, &[]),
    sym("details", ElementCategory::Normal, &[]),
    sym("dfn", ElementCategory::Normal, &[]),
    sym("dir", ElementCategory::Normal, &[]),
    sym("div", ElementCategory::Normal, &[]),
    sym("dl", ElementCategory::Normal, &[]),
    sym("dt", ElementCategory::Normal, CLOSED_BY_DT),
    sym("em", ElementCategory::Normal, &[]),
    sym("embed", ElementCategory::Void, &[]),
    sym("fieldset", ElementCategory::Normal, &[]),
    sym("figcaption", ElementCategory::Normal, &[]),
    sym("figure", ElementCategory::Normal, &[]),
    sym("font", ElementCategory::Normal, &[]),
    sym("footer", ElementCategory::Normal, &[]),
    sym("form", ElementCategory::Normal, &[]),
    sym("frame", ElementCategory::Normal, &[]),
    sym("frameset", ElementCategory::Normal, &[]),
    sym("h1", ElementCategory::Normal, &[]),
    sym("h2", ElementCategory::Normal, &[]),
    sym("h3", ElementCategory::Normal, &[]),
    sym("h4", ElementCategory::Normal, &[]),
    sym("h5", ElementCategory::Normal, &[]),
    sym("h6", ElementCategory::Normal, &[]),
    sym("head", ElementCategory::Normal, &[]),
    sym("header", ElementCategory::Normal, &[]),
    sym("hgroup", ElementCategory::Normal, &[]),
    sym("hr", ElementCategory::Void, &[]),
    sym("html", ElementCategory::Normal, &[]),
    sym("i", ElementCategory::Normal, &[]),
    sym("iframe", ElementCategory::Normal, &[]),
    sym("img", ElementCategory::Void, &[]),
    sym("input", ElementCategory::Void, &[]),
    sym("ins", ElementCategory::Normal, &[]),
    sym("kbd", ElementCategory::Normal, &[]),
    sym("keygen", ElementCategory::Void, &[]),
    sym("label", ElementCategory::Normal, &[]),
    sym("legend", ElementCategory::Normal, &[]),
    sym("li", ElementCategory::Normal, CLOSED_BY_LI),
    sym("link", ElementCategory::Void, &[]),
    sym("map", ElementCategory::Normal, &[]),
    sym("mark", ElementCategory::Normal, &[]),
    sym("math", ElementCategory::Foreign, &[]),
    sym("menu", ElementCategory::Normal, &[]),
    sym("meta", ElementCategory::Void, &[]),
    sym("meter", ElementCategory::Normal, &[]),
    sym("nav", ElementCategory::Normal, &[]),
    sym("noframes", ElementCategory::Normal, &[]),
    sym("noscript", ElementCategory::Normal, &[]),
    sym("object", ElementCategory::Normal, &[]),
    sym("ol", ElementCategory::Normal, &[]),
    sym("optgroup", ElementCategory::Normal, CLOSED_BY_OPTGROUP),
    sym("option", ElementCategory::Normal, CLOSED_BY_OPTION),
    sym("output", ElementCategory::Normal, &[]),
    sym("p", ElementCategory::Normal, CLOSED_BY_P),
    sym("param", ElementCategory::Void, &[]),
    sym("pre", ElementCategory::Normal, &[]),
    sym("progress", ElementCategory::Normal, &[]),
    sym("q", ElementCategory::Normal, &[]),
    sym("rb", ElementCategory::Normal, CLOSED_BY_RB),
    sym("rp", ElementCategory::Normal, CLOSED_BY_RP),
    sym("rt", ElementCategory::Normal, CLOSED_BY_RT),
    sym("rtc", ElementCategory::Normal, CLOSED_BY_RTC),
    sym("ruby", ElementCategory::Normal, &[]),
    sym("s", ElementCategory::Normal, &[]),
    sym("samp", ElementCategory::Normal, &[]),
    sym("script", ElementCategory::RawText, &[]),
    sym("section", ElementCategory::Normal, &[]),
    sym("select", ElementCategory::Normal, &[]),
    sym("small", ElementCategory::Normal, &[]),
    sym("source", ElementCategory::Void, &[]),
    sym("span", ElementCategory::Normal, &[]),
    sym("strike", ElementCategory::Normal, &[]),
    sym("strong", ElementCategory::Normal, &[]),
    sym("style", ElementCategory::RawText, &[]),
    sym("sub", ElementCategory::Normal, &[]),
    sym("summary", ElementCategory::Normal, &[]),
    sym("sup", ElementCategory::Normal, &[]),
    sym("svg", ElementCategory::Foreign, &[]),
    sym("table", ElementCategory::Normal, &[]),
    sym("tbody", ElementCategory::Normal, CLOSED_BY_TBODY),
    sym("td", ElementCategory::Normal, CLOSED_BY_TD_TH),
    sym("textarea", ElementCategory::EscapableRawText, &[]),
    sym("tfoot", ElementCategory::Normal, CLOSED_BY_TFOOT),
    sym("th", ElementCategory::Normal, CLOSED_BY_TD_TH),
    sym("thead", ElementCategory::Normal, CLOSED_BY_THEAD),
    sym("time", ElementCategory::Normal, &[]),
    sym("title", ElementCategory::EscapableRawText, &[]),
    sym("tr", ElementCategory::Normal, CLOSED_BY_TR),
    sym("track", ElementCategory::Void, &[]),
    sym("tt", ElementCategory::Normal, &[]),
    sym("u", ElementCategory::Normal, &[]),
    sym("ul", ElementCategory::Normal, &[]),
    sym("var", ElementCategory::Normal, &[]),
    sym("video", ElementCategory::Normal, &[]),
    sym("wbr", ElementCategory::Void, &[]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        for pair in SYMBOLS.windows(2) {
            assert!(
                pair[0].name < pair[1].name,
                "{} must sort before {}",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(lookup("LI").name, "li");
        assert_eq!(lookup("Br").category, ElementCategory::Void);
        assert_eq!(lookup("SCRIPT").category, ElementCategory::RawText);
        assert_eq!(lookup("textarea").category, ElementCategory::EscapableRawText);
        assert_eq!(lookup("svg").category, ElementCategory::Foreign);
    }

    #[test]
    fn unknown_names_fall_back() {
        let symbol = lookup("my-widget");
        assert_eq!(symbol.category, ElementCategory::Unknown);
        assert!(symbol.closed_by.is_empty());
        assert!(std::ptr::eq(symbol, &UNKNOWN_ELEMENT));
        assert_eq!(lookup("").category, ElementCategory::Unknown);
    }

    #[test]
    fn void_membership() {
        let void: Vec<&str> = SYMBOLS
            .iter()
            .filter(|symbol| symbol.is_void())
            .map(|symbol| symbol.name)
            .collect();
        assert_eq!(
            void,
            [
                "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link",
                "meta", "param", "source", "track", "wbr"
            ]
        );
    }

    #[test]
    fn implied_close_sets() {
        assert!(lookup("li").is_closed_by("LI"));
        assert!(lookup("dt").is_closed_by("dd"));
        assert!(lookup("dd").is_closed_by("dt"));
        assert!(lookup("p").is_closed_by("div"));
        assert!(lookup("p").is_closed_by("main"));
        assert!(!lookup("p").is_closed_by("span"));
        assert!(lookup("tfoot").is_closed_by("tbody"));
        assert!(!lookup("tfoot").is_closed_by("tfoot"));
        assert!(!lookup("rtc").is_closed_by("rt"));
        assert!(lookup("td").is_closed_by("th"));
        assert!(!lookup("div").is_closed_by("div"));
        assert_eq!(lookup("p").closed_by.len(), 26);
    }
}
