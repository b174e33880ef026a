//! One link of a selector chain.

use html::{Token, TokenKind};

use crate::attribute::AttributePredicate;
use crate::live::LiveMatches;

/// Relation between a component and the one before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Combinator {
    /// First component: anchored at the document root.
    Root,
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    Adjacent,
    /// `a ~ b`
    Sibling,
}

impl Combinator {
    /// Does a candidate at `(level, sequence)` relate to an anchor at
    /// `(anchor_level, anchor_sequence)`?
    pub fn accepts(self, anchor_level: u32, anchor_sequence: u32, level: u32, sequence: u32) -> bool {
        match self {
            Self::Root => anchor_level == 0,
            Self::Descendant => level > anchor_level,
            Self::Child => level == anchor_level + 1,
            Self::Adjacent => level == anchor_level && sequence == anchor_sequence + 1,
            Self::Sibling => level == anchor_level && sequence > anchor_sequence,
        }
    }

    /// Sibling relations anchor on records at the candidate's own level, so
    /// pruning for them starts one level deeper.
    pub fn level_adjustment(self) -> u32 {
        match self {
            Self::Adjacent | Self::Sibling => 1,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagPredicate {
    /// `*`
    Any,
    /// Lowercased element name.
    Named(String),
    Comment,
    Cdata,
    ProcessingInstruction,
    Doctype,
}

impl TagPredicate {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "*" => Self::Any,
            "comment" => Self::Comment,
            "cdata" => Self::Cdata,
            "processing-instruction" => Self::ProcessingInstruction,
            "doctype" => Self::Doctype,
            other => Self::Named(other.to_string()),
        }
    }

    /// Non-element constructs are recognized by the kind of their first token.
    pub fn special_kind(&self) -> Option<TokenKind> {
        match self {
            Self::Comment => Some(TokenKind::CommentStart),
            Self::Cdata => Some(TokenKind::CdataStart),
            Self::ProcessingInstruction => Some(TokenKind::ProcessingInstruction),
            Self::Doctype => Some(TokenKind::Doctype),
            Self::Any | Self::Named(_) => None,
        }
    }
}

/// `:nth-child(an+b)` residue test; the default `(1, 0)` accepts every position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NthChild {
    pub a: i32,
    pub b: i32,
}

impl NthChild {
    pub const ANY: Self = Self { a: 1, b: 0 };
    pub const FIRST: Self = Self { a: 0, b: 1 };
    pub const ODD: Self = Self { a: 2, b: 1 };
    pub const EVEN: Self = Self { a: 2, b: 0 };

    pub fn new(a: i32, b: i32) -> Self {
        Self { a, b }
    }

    pub fn matches(self, sequence: u32) -> bool {
        let offset = i64::from(sequence) - i64::from(self.b);
        let a = i64::from(self.a);
        if a == 0 {
            return offset == 0;
        }
        offset * a >= 0 && offset % a == 0
    }
}

impl Default for NthChild {
    fn default() -> Self {
        Self::ANY
    }
}

#[derive(Clone, Debug)]
pub struct Component {
    combinator: Combinator,
    tag: TagPredicate,
    attributes: Vec<AttributePredicate>,
    nth: NthChild,
    live: LiveMatches,
}

impl Component {
    pub fn new(combinator: Combinator, tag: TagPredicate) -> Self {
        Self {
            combinator,
            tag,
            attributes: Vec::new(),
            nth: NthChild::ANY,
            live: LiveMatches::new(),
        }
    }

    pub fn with_attribute(mut self, predicate: AttributePredicate) -> Self {
        self.attributes.push(predicate);
        self
    }

    pub fn with_nth(mut self, nth: NthChild) -> Self {
        self.nth = nth;
        self
    }

    pub fn push_attribute(&mut self, predicate: AttributePredicate) {
        self.attributes.push(predicate);
    }

    pub fn set_nth(&mut self, nth: NthChild) {
        self.nth = nth;
    }

    pub fn combinator(&self) -> Combinator {
        self.combinator
    }

    pub fn tag(&self) -> &TagPredicate {
        &self.tag
    }

    pub fn attributes(&self) -> &[AttributePredicate] {
        &self.attributes
    }

    pub fn nth(&self) -> NthChild {
        self.nth
    }

    pub fn live(&self) -> &LiveMatches {
        &self.live
    }

    /// Test the construct in `queue` at `(level, sequence)` against this component,
    /// anchored at `(anchor_level, anchor_sequence)`. A match is recorded as live.
    ///
    /// Element queues start at the opening `<` and end with its `>`; comment and
    /// CDATA queues start with their opening token; doctype and processing
    /// instruction queues hold the single token.
    pub fn matches(
        &mut self,
        queue: &[&Token],
        anchor_level: u32,
        anchor_sequence: u32,
        level: u32,
        sequence: u32,
    ) -> bool {
        if !self
            .combinator
            .accepts(anchor_level, anchor_sequence, level, sequence)
        {
            return false;
        }
        let matched = match self.tag.special_kind() {
            Some(kind) => queue.first().is_some_and(|token| token.is(kind)),
            None => self.matches_element(queue, sequence),
        };
        if matched {
            self.live.insert(level, sequence);
        }
        matched
    }

    fn matches_element(&self, queue: &[&Token], sequence: u32) -> bool {
        let Some(name_idx) = queue.iter().position(|token| token.is(TokenKind::TagName)) else {
            return false;
        };
        if let TagPredicate::Named(name) = &self.tag {
            if !queue[name_idx].text().eq_ignore_ascii_case(name) {
                return false;
            }
        }
        if !self.nth.matches(sequence) {
            return false;
        }
        let attributes = &queue[name_idx + 1..];
        self.attributes
            .iter()
            .all(|predicate| predicate.matches(find_attribute(attributes, predicate.name())))
    }

    /// Retire records that can no longer be extended once `level` closes.
    ///
    /// Implied closes drop records at `level` outright; otherwise records at `level`
    /// are deactivated and deeper ones dropped.
    pub fn clear_level_matched(&mut self, level: u32, implied: bool) {
        if implied {
            self.live.remove_from(level);
        } else {
            self.live.deactivate_at(level);
            self.live.remove_deeper_than(level);
        }
    }

    pub fn reset(&mut self) {
        self.live.clear();
    }
}

/// Locate `name` among attribute tokens; see [`AttributePredicate::matches`] for
/// the shape of the result.
fn find_attribute<'t>(tokens: &[&'t Token], name: &str) -> Option<Option<&'t str>> {
    let idx = tokens.iter().position(|token| {
        token.is(TokenKind::AttributeName) && token.text().eq_ignore_ascii_case(name)
    })?;
    let mut saw_equals = false;
    for token in &tokens[idx + 1..] {
        match token.kind() {
            TokenKind::Whitespace => {}
            TokenKind::Equals => saw_equals = true,
            TokenKind::AttributeValue if saw_equals => return Some(Some(token.text())),
            _ => break,
        }
    }
    Some(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Comparator;
    use html::TokenPool;

    fn open_tag(pool: &mut TokenPool, markup: &[(TokenKind, &str)]) -> Vec<html::TokenId> {
        markup
            .iter()
            .map(|(kind, text)| pool.alloc(*kind, text))
            .collect()
    }

    fn queue<'p>(pool: &'p TokenPool, ids: &[html::TokenId]) -> Vec<&'p Token> {
        ids.iter().map(|id| pool.get(*id)).collect()
    }

    fn anchor_tag(pool: &mut TokenPool) -> Vec<html::TokenId> {
        open_tag(
            pool,
            &[
                (TokenKind::OpenTag, "<"),
                (TokenKind::TagName, "A"),
                (TokenKind::Whitespace, " "),
                (TokenKind::AttributeName, "class"),
                (TokenKind::Equals, "="),
                (TokenKind::AttributeValue, "\"btn primary\""),
                (TokenKind::Whitespace, " "),
                (TokenKind::AttributeName, "hidden"),
                (TokenKind::CloseTag, ">"),
            ],
        )
    }

    #[test]
    fn combinator_relations() {
        assert!(Combinator::Root.accepts(0, 0, 3, 1));
        assert!(!Combinator::Root.accepts(1, 1, 3, 1));
        assert!(Combinator::Child.accepts(1, 1, 2, 5));
        assert!(!Combinator::Child.accepts(1, 1, 3, 1));
        assert!(Combinator::Descendant.accepts(1, 1, 3, 1));
        assert!(!Combinator::Descendant.accepts(3, 1, 3, 2));
        assert!(Combinator::Adjacent.accepts(2, 1, 2, 2));
        assert!(!Combinator::Adjacent.accepts(2, 1, 2, 3));
        assert!(Combinator::Sibling.accepts(2, 1, 2, 3));
        assert!(!Combinator::Sibling.accepts(2, 3, 2, 3));
    }

    #[test]
    fn nth_child_residues() {
        let odd: Vec<u32> = (1..=6).filter(|s| NthChild::ODD.matches(*s)).collect();
        assert_eq!(odd, [1, 3, 5]);
        let even: Vec<u32> = (1..=6).filter(|s| NthChild::EVEN.matches(*s)).collect();
        assert_eq!(even, [2, 4, 6]);
        let fifth: Vec<u32> = (1..=10).filter(|s| NthChild::new(0, 5).matches(*s)).collect();
        assert_eq!(fifth, [5]);
        let first_three: Vec<u32> = (1..=6).filter(|s| NthChild::new(-1, 3).matches(*s)).collect();
        assert_eq!(first_three, [1, 2, 3]);
        let from_four: Vec<u32> = (1..=6).filter(|s| NthChild::new(1, 4).matches(*s)).collect();
        assert_eq!(from_four, [4, 5, 6]);
        assert!(NthChild::FIRST.matches(1));
        assert!(!NthChild::FIRST.matches(2));
    }

    #[test]
    fn tag_and_attribute_predicates() {
        let mut pool = TokenPool::new();
        let ids = anchor_tag(&mut pool);
        let q = queue(&pool, &ids);

        let mut by_tag = Component::new(Combinator::Root, TagPredicate::parse("a"));
        assert!(by_tag.matches(&q, 0, 0, 1, 1));
        assert_eq!(by_tag.live().active_recent_first().collect::<Vec<_>>(), [(1, 1)]);

        let mut by_class = Component::new(Combinator::Root, TagPredicate::Any)
            .with_attribute(AttributePredicate::new("class", Comparator::Includes, "btn"))
            .with_attribute(AttributePredicate::exists("HIDDEN"));
        assert!(by_class.matches(&q, 0, 0, 1, 1));

        let mut missing = Component::new(Combinator::Root, TagPredicate::Any)
            .with_attribute(AttributePredicate::exists("href"));
        assert!(!missing.matches(&q, 0, 0, 1, 1));
        assert!(missing.live().is_empty());

        let mut wrong_tag = Component::new(Combinator::Root, TagPredicate::parse("b"));
        assert!(!wrong_tag.matches(&q, 0, 0, 1, 1));
    }

    #[test]
    fn special_components_check_first_token_only() {
        let mut pool = TokenPool::new();
        let comment = open_tag(&mut pool, &[(TokenKind::CommentStart, "<!--")]);
        let doctype = open_tag(&mut pool, &[(TokenKind::Doctype, "<!doctype html>")]);

        let mut comments = Component::new(Combinator::Root, TagPredicate::parse("comment"));
        assert!(comments.matches(&queue(&pool, &comment), 0, 0, 1, 1));
        assert!(!comments.matches(&queue(&pool, &doctype), 0, 0, 1, 0));

        let mut any = Component::new(Combinator::Root, TagPredicate::Any);
        assert!(!any.matches(&queue(&pool, &comment), 0, 0, 1, 1));

        let mut doctypes = Component::new(Combinator::Root, TagPredicate::parse("DOCTYPE"));
        assert!(doctypes.matches(&queue(&pool, &doctype), 0, 0, 1, 0));
    }

    #[test]
    fn clearing_levels() {
        let mut pool = TokenPool::new();
        let ids = anchor_tag(&mut pool);
        let q = queue(&pool, &ids);
        let mut component = Component::new(Combinator::Root, TagPredicate::Any);
        for level in 1..=3 {
            assert!(component.matches(&q, 0, 0, level, 1));
        }
        component.clear_level_matched(2, false);
        assert_eq!(
            component.live().active_recent_first().collect::<Vec<_>>(),
            [(1, 1)]
        );
        assert_eq!(component.live().len(), 2);
        component.clear_level_matched(1, true);
        assert!(component.live().is_empty());
    }
}
