//! Selector-source compiler.
//!
//! ```text
//! ul > li:nth-child(odd), p.note[data-x^="a"] { addAttributeValue(class, striped); }
//! comment { delete(); }
//! ```
//!
//! A source is a sequence of rules. Each rule is a comma-separated group of chains
//! sharing one action block; every chain compiles to its own [`Selector`].

mod scanner;

#[cfg(test)]
mod tests;

use std::fmt;

use crate::action::Action;
use crate::attribute::{AttributePredicate, Comparator};
use crate::component::{Combinator, Component, NthChild, TagPredicate};
use crate::selector::{Placement, Selector};

use scanner::Scanner;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileErrorKind {
    UnexpectedChar(char),
    UnexpectedEnd,
    UnterminatedString,
    UnterminatedComment,
    MissingSelector,
    UnknownComparator(String),
    UnknownPseudo(String),
    BadPseudoArgument { pseudo: String, argument: String },
    ConflictingPlacement,
    EmptyActionName,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    /// 1-based line of the offending input.
    pub line: usize,
    pub kind: CompileErrorKind,
}

impl fmt::Display for CompileErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "unexpected character {c:?}"),
            Self::UnexpectedEnd => f.write_str("unexpected end of input"),
            Self::UnterminatedString => f.write_str("unterminated string"),
            Self::UnterminatedComment => f.write_str("unterminated comment"),
            Self::MissingSelector => f.write_str("expected a selector"),
            Self::UnknownComparator(op) => write!(f, "unknown attribute comparator `{op}`"),
            Self::UnknownPseudo(name) => write!(f, "unknown pseudo-class `:{name}`"),
            Self::BadPseudoArgument { pseudo, argument } => {
                write!(f, "invalid argument `{argument}` for `:{pseudo}`")
            }
            Self::ConflictingPlacement => f.write_str("`:before` and `:after` cannot be combined"),
            Self::EmptyActionName => f.write_str("action without a function name"),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for CompileError {}

/// Compile selector source into selectors, in source order.
pub fn compile(source: &str) -> Result<Vec<Selector>, CompileError> {
    let mut scanner = Scanner::new(source);
    let mut selectors = Vec::new();
    loop {
        scanner.skip_trivia()?;
        if scanner.is_eof() {
            break;
        }
        let line = scanner.line();
        let chains = parse_group(&mut scanner)?;
        let actions = parse_actions(&mut scanner)?;
        for chain in chains {
            selectors.push(chain.into_selector(line, actions.clone()));
        }
    }
    log::debug!(
        target: "selector.compile",
        "compiled {} selector(s)",
        selectors.len()
    );
    Ok(selectors)
}

/// One parsed chain plus the selector-wide pseudo-classes found in it.
struct Chain {
    components: Vec<Component>,
    placement: Option<Placement>,
    start: Option<u32>,
    count: Option<u32>,
}

impl Chain {
    fn into_selector(self, line: usize, actions: Vec<Action>) -> Selector {
        let mut selector = Selector::new(self.components)
            .with_line(line)
            .with_actions(actions)
            .with_placement(self.placement.unwrap_or_default());
        if let Some(start) = self.start {
            selector = selector.with_start(start);
        }
        if let Some(count) = self.count {
            selector = selector.with_count(count);
        }
        selector
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Chains up to and including the opening `{`.
fn parse_group(scanner: &mut Scanner<'_>) -> Result<Vec<Chain>, CompileError> {
    let mut chains = Vec::new();
    loop {
        scanner.skip_trivia()?;
        chains.push(parse_chain(scanner)?);
        if scanner.eat(',') {
            continue;
        }
        if scanner.eat('{') {
            return Ok(chains);
        }
        return Err(scanner.unexpected());
    }
}

fn parse_chain(scanner: &mut Scanner<'_>) -> Result<Chain, CompileError> {
    let mut chain = Chain {
        components: Vec::new(),
        placement: None,
        start: None,
        count: None,
    };
    let mut combinator = Combinator::Root;
    loop {
        let component = parse_compound(scanner, combinator, &mut chain)?;
        chain.components.push(component);

        let spaced = scanner.skip_trivia()?;
        let explicit = match scanner.peek() {
            Some('>') => Some(Combinator::Child),
            Some('+') => Some(Combinator::Adjacent),
            Some('~') => Some(Combinator::Sibling),
            Some(',' | '{') | None => return Ok(chain),
            Some(_) if spaced => None,
            Some(_) => return Err(scanner.unexpected()),
        };
        combinator = match explicit {
            Some(explicit) => {
                scanner.bump();
                scanner.skip_trivia()?;
                explicit
            }
            None => Combinator::Descendant,
        };
    }
}

fn parse_compound(
    scanner: &mut Scanner<'_>,
    combinator: Combinator,
    chain: &mut Chain,
) -> Result<Component, CompileError> {
    let tag = if scanner.eat('*') {
        Some(TagPredicate::Any)
    } else {
        let name = scanner.take_while(is_name_char);
        (!name.is_empty()).then(|| TagPredicate::parse(name))
    };
    let mut component = Component::new(combinator, tag.clone().unwrap_or(TagPredicate::Any));
    let mut parts = usize::from(tag.is_some());

    loop {
        match scanner.peek() {
            Some('#') => {
                scanner.bump();
                let id = required_name(scanner)?;
                component.push_attribute(AttributePredicate::new("id", Comparator::Equals, id));
            }
            Some('.') => {
                scanner.bump();
                let class = required_name(scanner)?;
                component.push_attribute(AttributePredicate::new(
                    "class",
                    Comparator::Includes,
                    class,
                ));
            }
            Some('[') => {
                scanner.bump();
                component.push_attribute(parse_attribute(scanner)?);
            }
            Some(':') => {
                scanner.bump();
                parse_pseudo(scanner, &mut component, chain)?;
            }
            _ => break,
        }
        parts += 1;
    }

    if parts == 0 {
        return Err(match scanner.peek() {
            Some(c) if !matches!(c, ',' | '{') => scanner.error(CompileErrorKind::UnexpectedChar(c)),
            _ => scanner.error(CompileErrorKind::MissingSelector),
        });
    }
    Ok(component)
}

fn required_name<'a>(scanner: &mut Scanner<'a>) -> Result<&'a str, CompileError> {
    let name = scanner.take_while(is_name_char);
    if name.is_empty() {
        return Err(scanner.unexpected());
    }
    Ok(name)
}

/// `[name]`, `[name op value]`; the opening bracket is already consumed.
fn parse_attribute(scanner: &mut Scanner<'_>) -> Result<AttributePredicate, CompileError> {
    scanner.skip_trivia()?;
    let name = scanner.take_while(|c| is_name_char(c) || c == ':');
    if name.is_empty() {
        return Err(scanner.unexpected());
    }
    scanner.skip_trivia()?;
    if scanner.eat(']') {
        return Ok(AttributePredicate::exists(name));
    }

    let op = scanner.take_while(|c| "~^$*|=".contains(c));
    let comparator = Comparator::from_operator(op).ok_or_else(|| {
        if op.is_empty() {
            scanner.unexpected()
        } else {
            scanner.error(CompileErrorKind::UnknownComparator(op.to_string()))
        }
    })?;
    scanner.skip_trivia()?;
    let value = match scanner.peek() {
        Some(quote @ ('"' | '\'')) => scanner.quoted(quote)?,
        _ => scanner
            .take_while(|c| !c.is_whitespace() && c != ']')
            .to_string(),
    };
    scanner.skip_trivia()?;
    if !scanner.eat(']') {
        return Err(scanner.unexpected());
    }
    Ok(AttributePredicate::new(name, comparator, &value))
}

/// Pseudo-class after `:`. Element filters go to `component`, firing controls to
/// `chain`.
fn parse_pseudo(
    scanner: &mut Scanner<'_>,
    component: &mut Component,
    chain: &mut Chain,
) -> Result<(), CompileError> {
    let name = scanner.take_while(is_name_char).to_ascii_lowercase();
    let argument = if scanner.eat('(') {
        let raw = scanner.take_while(|c| c != ')');
        if !scanner.eat(')') {
            return Err(scanner.error(CompileErrorKind::UnexpectedEnd));
        }
        Some(raw.trim().to_string())
    } else {
        None
    };
    let bad_argument = |argument: &str| CompileErrorKind::BadPseudoArgument {
        pseudo: name.clone(),
        argument: argument.to_string(),
    };

    match (name.as_str(), argument.as_deref()) {
        ("first-child", None) => component.set_nth(NthChild::FIRST),
        ("nth-child", Some(arg)) => {
            let nth = parse_nth(arg).ok_or_else(|| scanner.error(bad_argument(arg)))?;
            component.set_nth(nth);
        }
        ("before" | "after", None) => {
            let placement = if name == "before" {
                Placement::Before
            } else {
                Placement::After
            };
            if chain.placement.is_some_and(|existing| existing != placement) {
                return Err(scanner.error(CompileErrorKind::ConflictingPlacement));
            }
            chain.placement = Some(placement);
        }
        ("start" | "count", Some(arg)) => {
            let n: u32 = arg
                .parse()
                .map_err(|_| scanner.error(bad_argument(arg)))?;
            if name == "start" {
                chain.start = Some(n);
            } else {
                chain.count = Some(n);
            }
        }
        ("first-child" | "before" | "after", Some(arg)) => {
            return Err(scanner.error(bad_argument(arg)));
        }
        ("nth-child" | "start" | "count", None) => {
            return Err(scanner.error(bad_argument("")));
        }
        _ => return Err(scanner.error(CompileErrorKind::UnknownPseudo(name.clone()))),
    }
    Ok(())
}

/// `odd`, `even`, `b`, or `an+b` with optional signs and spaces.
pub(crate) fn parse_nth(arg: &str) -> Option<NthChild> {
    let compact: String = arg
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match compact.as_str() {
        "odd" => return Some(NthChild::ODD),
        "even" => return Some(NthChild::EVEN),
        _ => {}
    }
    match compact.split_once('n') {
        None => compact.parse().ok().map(|b| NthChild::new(0, b)),
        Some((a, b)) => {
            let a = match a {
                "" | "+" => 1,
                "-" => -1,
                a => a.parse().ok()?,
            };
            let b = if b.is_empty() { 0 } else { b.parse().ok()? };
            Some(NthChild::new(a, b))
        }
    }
}

/// Action block body up to and including the closing `}`.
fn parse_actions(scanner: &mut Scanner<'_>) -> Result<Vec<Action>, CompileError> {
    let mut actions = Vec::new();
    loop {
        scanner.skip_trivia()?;
        match scanner.peek() {
            None => return Err(scanner.error(CompileErrorKind::UnexpectedEnd)),
            Some('}') => {
                scanner.bump();
                return Ok(actions);
            }
            Some(';') => {
                scanner.bump();
                continue;
            }
            Some(_) => {}
        }

        let name = scanner.take_while(|c| is_name_char(c) || c == '.');
        if name.is_empty() {
            return Err(match scanner.peek() {
                Some('(') => scanner.error(CompileErrorKind::EmptyActionName),
                _ => scanner.unexpected(),
            });
        }
        let mut action = Action::new(name);
        scanner.skip_trivia()?;
        if scanner.eat('(') {
            parse_arguments(scanner, &mut action)?;
            scanner.skip_trivia()?;
        }
        match scanner.peek() {
            Some(';' | '}') => {}
            _ => return Err(scanner.unexpected()),
        }
        actions.push(action);
    }
}

/// Arguments up to and including the closing `)`.
fn parse_arguments(scanner: &mut Scanner<'_>, action: &mut Action) -> Result<(), CompileError> {
    scanner.skip_trivia()?;
    if scanner.eat(')') {
        return Ok(());
    }
    loop {
        scanner.skip_trivia()?;
        let argument = match scanner.peek() {
            Some(quote @ ('"' | '\'')) => scanner.quoted(quote)?,
            Some(_) => scanner
                .take_while(|c| !matches!(c, ',' | ')'))
                .trim()
                .to_string(),
            None => return Err(scanner.error(CompileErrorKind::UnexpectedEnd)),
        };
        action.push_argument(argument);
        scanner.skip_trivia()?;
        match scanner.bump() {
            Some(',') => {}
            Some(')') => return Ok(()),
            Some(c) => return Err(scanner.error(CompileErrorKind::UnexpectedChar(c))),
            None => return Err(scanner.error(CompileErrorKind::UnexpectedEnd)),
        }
    }
}
