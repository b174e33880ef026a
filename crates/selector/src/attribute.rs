//! Attribute predicates.

/// How an attribute value is compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparator {
    /// `[name]`
    Exists,
    /// `[name=value]`
    Equals,
    /// `[name^=value]`
    Prefix,
    /// `[name$=value]`
    Suffix,
    /// `[name*=value]`
    Substring,
    /// `[name~=value]`: one of the space-separated words.
    Includes,
    /// `[name|=value]`: one of the hyphen-separated parts.
    DashMatch,
}

impl Comparator {
    pub fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            "=" => Self::Equals,
            "^=" => Self::Prefix,
            "$=" => Self::Suffix,
            "*=" => Self::Substring,
            "~=" => Self::Includes,
            "|=" => Self::DashMatch,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributePredicate {
    name: String,
    comparator: Comparator,
    value: String,
}

impl AttributePredicate {
    pub fn exists(name: &str) -> Self {
        Self::new(name, Comparator::Exists, "")
    }

    pub fn new(name: &str, comparator: Comparator, value: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            comparator,
            value: value.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// `found` is `None` when the attribute is absent, `Some(None)` for a bare
    /// attribute and `Some(Some(raw))` with the raw (possibly quoted) value.
    pub fn matches(&self, found: Option<Option<&str>>) -> bool {
        let Some(raw) = found else {
            return false;
        };
        let actual = unquote(raw.unwrap_or(""));
        let expected = self.value.as_str();
        match self.comparator {
            Comparator::Exists => true,
            Comparator::Equals => actual == expected,
            Comparator::Prefix => actual.starts_with(expected),
            Comparator::Suffix => actual.ends_with(expected),
            Comparator::Substring => actual.contains(expected),
            Comparator::Includes => actual.split_ascii_whitespace().any(|word| word == expected),
            Comparator::DashMatch => actual
                .split('-')
                .filter(|part| !part.is_empty())
                .any(|part| part == expected),
        }
    }
}

/// Strip one pair of matching surrounding quotes.
pub fn unquote(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    match bytes {
        [first, .., last] if first == last && matches!(*first, b'"' | b'\'') => {
            &raw[1..raw.len() - 1]
        }
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(comparator: Comparator, expected: &str, raw: &str) -> bool {
        AttributePredicate::new("class", comparator, expected).matches(Some(Some(raw)))
    }

    #[test]
    fn unquote_strips_one_matching_pair() {
        assert_eq!(unquote("\"a b\""), "a b");
        assert_eq!(unquote("'x'"), "x");
        assert_eq!(unquote("\"mixed'"), "\"mixed'");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("bare"), "bare");
    }

    #[test]
    fn word_list_membership() {
        assert!(check(Comparator::Includes, "btn", "\"btn primary\""));
        assert!(check(Comparator::Includes, "primary", "'btn   primary'"));
        assert!(!check(Comparator::Includes, "btn", "\"btnx\""));
    }

    #[test]
    fn hyphen_list_membership() {
        assert!(check(Comparator::DashMatch, "btn", "\"btn-primary\""));
        assert!(!check(Comparator::DashMatch, "btn", "\"xbtn\""));
    }

    #[test]
    fn string_comparators_use_unquoted_value() {
        assert!(check(Comparator::Equals, "main", "\"main\""));
        assert!(check(Comparator::Equals, "main", "main"));
        assert!(check(Comparator::Prefix, "http", "\"https://x\""));
        assert!(check(Comparator::Suffix, ".png", "a.png"));
        assert!(check(Comparator::Substring, "://", "'ftp://h'"));
        assert!(!check(Comparator::Equals, "Main", "main"));
    }

    #[test]
    fn presence_and_bare_attributes() {
        let exists = AttributePredicate::exists("Disabled");
        assert_eq!(exists.name(), "disabled");
        assert!(exists.matches(Some(None)));
        assert!(!exists.matches(None));
        let empty = AttributePredicate::new("disabled", Comparator::Equals, "");
        assert!(empty.matches(Some(None)));
    }

    #[test]
    fn operators_parse() {
        assert_eq!(Comparator::from_operator("|="), Some(Comparator::DashMatch));
        assert_eq!(Comparator::from_operator("!="), None);
    }
}
