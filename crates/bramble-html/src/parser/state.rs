use strum_macros::Display;

/// The parser state machine.
///
/// The parser reads one character at a time and looks at most one character
/// ahead. Every state except `ServerSideCode` and `PcData` also watches for a
/// `<` that starts a new node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ParseState {
    /// Character data between tags.
    Text,
    /// Just after `<`: deciding between a start tag and an end tag.
    WhichTag,
    /// Reading an element name.
    Tag,
    /// Inside a tag, between attributes.
    BetweenAttributes,
    /// Saw `/` or `?` inside a tag; a `>` now closes the element at once.
    EmptyTag,
    /// Reading an attribute name.
    AttributeName,
    /// After an attribute name, before any `=`.
    AttributeBeforeEquals,
    /// After `=`, before the value.
    AttributeAfterEquals,
    /// Reading an unquoted attribute value.
    AttributeValue,
    /// Reading a single- or double-quoted attribute value.
    QuotedAttributeValue,
    /// Inside `<!...>` or `<!-- ... -->`.
    Comment,
    /// Inside an embedded `<% ... %>` block.
    ServerSideCode,
    /// Raw text of a CDATA element, up to its end tag.
    PcData,
}
