//! Lexer state machine definitions.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LexerState {
    /// Character data between tags.
    Text,
    /// Tag name after `<` or `</`.
    TagName,
    /// Attribute area of a start or end tag.
    InTag,
    /// After `=`, before the (possibly quoted) value.
    AttributeValue,
    Comment,
    Cdata,
    /// Content of `script`/`style`/`textarea`/`title` up to its close tag.
    RawText,
    Eof,
}
