//! Standard action library, registered as `std`.
//!
//! Attribute functions edit only the opening tag at the start of the span. Functions
//! that find nothing to edit return `false`, ending the firing.

use std::borrow::Cow;
use std::io::Write;
use std::ops::Range;

use html::{TokenKind, TokenSpan};
use regex::Regex;

use crate::action::{ActionErrorKind, ActionRegistry, DEFAULT_LIBRARY};
use crate::attribute::unquote;

type Outcome = Result<bool, ActionErrorKind>;

pub(crate) fn register_std(registry: &mut ActionRegistry) {
    let lib = DEFAULT_LIBRARY;
    registry.register(lib, "delete", |_, span, args| {
        arity(args, 0)?;
        span.clear();
        Ok(true)
    });
    registry.register(lib, "print", |_, span, args| {
        arity(args, 0)?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "[[{}]]", span.to_html()).map_err(failed)?;
        Ok(true)
    });
    registry.register(lib, "printErr", |_, span, args| {
        arity(args, 0)?;
        let mut out = std::io::stderr().lock();
        writeln!(out, "[[{}]]", span.to_html()).map_err(failed)?;
        Ok(true)
    });
    registry.register(lib, "done", |state, _, args| {
        arity(args, 0)?;
        state.mark_done();
        Ok(true)
    });
    registry.register(lib, "replaceText", |_, span, args| {
        arity(args, 1)?;
        Ok(replace_text(span, &args[0]))
    });
    registry.register(lib, "replaceInner", |_, span, args| {
        arity(args, 1)?;
        Ok(replace_inner(span, &args[0]))
    });
    registry.register(lib, "insertBefore", |_, span, args| {
        arity(args, 1)?;
        span.insert(0, TokenKind::Text, &args[0]);
        Ok(true)
    });
    registry.register(lib, "insertAfter", |_, span, args| {
        arity(args, 1)?;
        span.push(TokenKind::Text, &args[0]);
        Ok(true)
    });
    registry.register(lib, "wrapElement", |_, span, args| {
        arity(args, 1)?;
        wrap_element(span, &args[0]);
        Ok(true)
    });
    registry.register(lib, "addAttribute", |_, span, args| {
        arity(args, 2)?;
        Ok(add_attribute(span, &args[0], &args[1]))
    });
    registry.register(lib, "replaceAttribute", |_, span, args| {
        arity(args, 2)?;
        Ok(replace_attribute(span, &args[0], &args[1]))
    });
    registry.register(lib, "removeAttribute", |_, span, args| {
        arity(args, 1)?;
        Ok(remove_attribute(span, &args[0]))
    });
    registry.register(lib, "setAttributeValue", |_, span, args| {
        arity(args, 2)?;
        Ok(set_attribute_value(span, &args[0], &args[1]))
    });
    registry.register(lib, "addAttributeValue", |_, span, args| {
        arity(args, 2)?;
        Ok(edit_value_list(span, &args[0], &args[1], ListEdit::Add(' ')))
    });
    registry.register(lib, "removeAttributeValue", |_, span, args| {
        arity(args, 2)?;
        Ok(edit_value_list(span, &args[0], &args[1], ListEdit::Remove(' ')))
    });
    registry.register(lib, "addHyphenatedValue", |_, span, args| {
        arity(args, 2)?;
        Ok(edit_value_list(span, &args[0], &args[1], ListEdit::Add('-')))
    });
    registry.register(lib, "removeHyphenatedValue", |_, span, args| {
        arity(args, 2)?;
        Ok(edit_value_list(span, &args[0], &args[1], ListEdit::Remove('-')))
    });
    registry.register(lib, "regexReplace", |_, span, args| {
        arity(args, 2)?;
        regex_replace(span, &args[0], &args[1])
    });
    registry.register(lib, "contains", |_, span, args| {
        arity(args, 1)?;
        Ok(span.text_content().contains(args[0].as_str()))
    });
    registry.register(lib, "notContains", |_, span, args| {
        arity(args, 1)?;
        Ok(!span.text_content().contains(args[0].as_str()))
    });
    registry.register(lib, "containsIgnoreCase", |_, span, args| {
        arity(args, 1)?;
        Ok(contains_ignore_case(span, &args[0]))
    });
    registry.register(lib, "notContainsIgnoreCase", |_, span, args| {
        arity(args, 1)?;
        Ok(!contains_ignore_case(span, &args[0]))
    });
}

fn arity(args: &[String], expected: usize) -> Result<(), ActionErrorKind> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ActionErrorKind::WrongArgumentCount {
            expected,
            found: args.len(),
        })
    }
}

fn failed(err: std::io::Error) -> ActionErrorKind {
    ActionErrorKind::Failed(err.to_string())
}

fn contains_ignore_case(span: &TokenSpan<'_>, needle: &str) -> bool {
    span.text_content()
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

/// Replace the first text run with `text` and drop the others.
fn replace_text(span: &mut TokenSpan<'_>, text: &str) -> bool {
    let runs: Vec<usize> = span
        .tokens()
        .enumerate()
        .filter(|(_, token)| token.is(TokenKind::Text))
        .map(|(idx, _)| idx)
        .collect();
    let Some((&first, rest)) = runs.split_first() else {
        return match inner_range(span) {
            Some(inner) => {
                span.insert(inner.start, TokenKind::Text, text);
                true
            }
            None => false,
        };
    };
    for &idx in rest.iter().rev() {
        span.remove(idx);
    }
    span.set_text(first, text);
    true
}

fn replace_inner(span: &mut TokenSpan<'_>, markup: &str) -> bool {
    let Some(inner) = inner_range(span) else {
        return false;
    };
    let at = inner.start;
    span.remove_range(inner);
    span.insert(at, TokenKind::Text, markup);
    true
}

/// Tokens between the opening tag and the element's own end tag (or the span end
/// when the element was closed implicitly). `None` for void and self-closed elements.
fn inner_range(span: &TokenSpan<'_>) -> Option<Range<usize>> {
    let open_len = span.open_tag_len();
    if open_len == 0 || span.kind(open_len - 1) == TokenKind::SelfCloseEnd {
        return None;
    }
    let name_idx = span.position(TokenKind::TagName)?;
    if span.token(name_idx).symbol().is_some_and(|symbol| symbol.is_void()) {
        return None;
    }
    let name = span.text(name_idx);
    let end = span
        .rposition(TokenKind::OpenEndTag)
        .filter(|&idx| idx >= open_len)
        .filter(|&idx| {
            idx + 2 < span.len()
                && span.kind(idx + 1) == TokenKind::TagName
                && span.text(idx + 1).eq_ignore_ascii_case(name)
                && span.kind(span.len() - 1) == TokenKind::CloseTag
        })
        .unwrap_or(span.len());
    Some(open_len..end)
}

fn wrap_element(span: &mut TokenSpan<'_>, tag: &str) {
    span.insert(0, TokenKind::OpenTag, "<");
    span.insert(1, TokenKind::TagName, tag);
    span.insert(2, TokenKind::CloseTag, ">");
    span.push(TokenKind::OpenEndTag, "</");
    span.push(TokenKind::TagName, tag);
    span.push(TokenKind::CloseTag, ">");
}

/// Token positions of one attribute inside the opening tag.
struct AttributeSlot {
    name: usize,
    value: Option<usize>,
    /// One past the last token belonging to the attribute.
    end: usize,
}

fn find_attribute(span: &TokenSpan<'_>, name: &str) -> Option<AttributeSlot> {
    let open_len = span.open_tag_len();
    let name_idx = (0..open_len).find(|&idx| {
        span.kind(idx) == TokenKind::AttributeName && span.text(idx).eq_ignore_ascii_case(name)
    })?;
    let mut saw_equals = false;
    let mut idx = name_idx + 1;
    while idx < open_len {
        match span.kind(idx) {
            TokenKind::Whitespace => {}
            TokenKind::Equals => saw_equals = true,
            TokenKind::AttributeValue if saw_equals => {
                return Some(AttributeSlot {
                    name: name_idx,
                    value: Some(idx),
                    end: idx + 1,
                });
            }
            _ => break,
        }
        idx += 1;
    }
    Some(AttributeSlot {
        name: name_idx,
        value: None,
        end: name_idx + 1,
    })
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "&quot;"))
}

fn add_attribute(span: &mut TokenSpan<'_>, name: &str, value: &str) -> bool {
    if find_attribute(span, name).is_some() {
        return set_attribute_value(span, name, value);
    }
    let Some(name_idx) = span.position(TokenKind::TagName) else {
        return false;
    };
    if name_idx >= span.open_tag_len() {
        return false;
    }
    let at = name_idx + 1;
    span.insert(at, TokenKind::Whitespace, " ");
    span.insert(at + 1, TokenKind::AttributeName, name);
    span.insert(at + 2, TokenKind::Equals, "=");
    span.insert(at + 3, TokenKind::AttributeValue, &quoted(value));
    true
}

fn replace_attribute(span: &mut TokenSpan<'_>, name: &str, new_name: &str) -> bool {
    let Some(slot) = find_attribute(span, name) else {
        return false;
    };
    span.set_text(slot.name, new_name);
    true
}

fn remove_attribute(span: &mut TokenSpan<'_>, name: &str) -> bool {
    let Some(slot) = find_attribute(span, name) else {
        return false;
    };
    let start = if slot.name > 0 && span.kind(slot.name - 1) == TokenKind::Whitespace {
        slot.name - 1
    } else {
        slot.name
    };
    span.remove_range(start..slot.end);
    true
}

fn set_attribute_value(span: &mut TokenSpan<'_>, name: &str, value: &str) -> bool {
    let Some(slot) = find_attribute(span, name) else {
        return false;
    };
    match slot.value {
        Some(idx) => span.set_text(idx, &quoted(value)),
        None => {
            span.insert(slot.end, TokenKind::Equals, "=");
            span.insert(slot.end + 1, TokenKind::AttributeValue, &quoted(value));
        }
    }
    true
}

#[derive(Clone, Copy)]
enum ListEdit {
    Add(char),
    Remove(char),
}

/// Add or remove one entry of a separator-delimited attribute value, keeping the
/// original quote character.
fn edit_value_list(span: &mut TokenSpan<'_>, name: &str, entry: &str, edit: ListEdit) -> bool {
    let Some(slot) = find_attribute(span, name) else {
        return false;
    };
    let raw = slot.value.map_or("", |idx| span.text(idx));
    let quote = match raw.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => '"',
    };
    let separator = match edit {
        ListEdit::Add(separator) | ListEdit::Remove(separator) => separator,
    };
    let mut entries: Vec<&str> = split_entries(unquote(raw), separator)
        .filter(|existing| *existing != entry)
        .collect();
    if let ListEdit::Add(_) = edit {
        entries.push(entry);
    }
    let joined = entries.join(&separator.to_string());
    let value = format!("{quote}{joined}{quote}");
    match slot.value {
        Some(idx) => span.set_text(idx, &value),
        None => {
            span.insert(slot.end, TokenKind::Equals, "=");
            span.insert(slot.end + 1, TokenKind::AttributeValue, &value);
        }
    }
    true
}

fn split_entries(value: &str, separator: char) -> Box<dyn Iterator<Item = &str> + '_> {
    if separator == ' ' {
        Box::new(value.split_ascii_whitespace())
    } else {
        Box::new(value.split(separator).filter(|entry| !entry.is_empty()))
    }
}

fn regex_replace(span: &mut TokenSpan<'_>, pattern: &str, replacement: &str) -> Outcome {
    let regex = Regex::new(pattern).map_err(|err| ActionErrorKind::InvalidPattern(err.to_string()))?;
    for idx in 0..span.len() {
        if span.kind(idx) != TokenKind::Text {
            continue;
        }
        let updated = match regex.replace_all(span.text(idx), replacement) {
            Cow::Owned(text) => Some(text),
            Cow::Borrowed(_) => None,
        };
        if let Some(text) = updated {
            span.set_text(idx, &text);
        }
    }
    Ok(true)
}
