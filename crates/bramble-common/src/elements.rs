//! Per-element behavior flags.
//!
//! The parser never special-cases a tag name in its control flow. Instead it asks
//! this table whether a name is a raw-text container, a void element, an element
//! whose end tag stands for a start tag, or one that may overlap its siblings.

use std::collections::HashMap;
use std::ops::BitOr;
use std::sync::{Arc, LazyLock};

/// A set of behavior flags for one element name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ElementFlags(u8);

impl ElementFlags {
    /// No special behavior.
    pub const NONE: Self = Self(0);
    /// Content is raw text up to the matching end tag (`script`, `style`).
    pub const CDATA: Self = Self(1);
    /// The element never has content and needs no end tag (`img`, `meta`).
    pub const EMPTY: Self = Self(1 << 1);
    /// A stray end tag is read as a start tag (`</br>`).
    pub const CLOSED: Self = Self(1 << 2);
    /// A stray end tag is kept as literal text.
    pub const CAN_OVERLAP: Self = Self(1 << 3);

    /// Returns true if every flag in `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns the union of both flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for ElementFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

static DEFAULT_TABLE: LazyLock<Arc<ElementTable>> = LazyLock::new(|| {
    let mut table = ElementTable::empty();
    for name in ["script", "style", "noxhtml"] {
        table.insert(name, ElementFlags::CDATA);
    }
    for name in [
        "base", "link", "meta", "isindex", "hr", "col", "img", "param", "embed", "frame", "wbr",
        "bgsound", "source", "track", "spacer", "keygen", "area", "input", "basefont", "option",
    ] {
        table.insert(name, ElementFlags::EMPTY);
    }
    table.insert("br", ElementFlags::EMPTY | ElementFlags::CLOSED);
    Arc::new(table)
});

/// Immutable-once-built mapping from lowercase element names to their flags.
///
/// Names are expected in lowercase; the parser and the tree always pass
/// lowercase names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementTable {
    flags: HashMap<String, ElementFlags>,
}

impl ElementTable {
    /// A table with no entries.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in HTML table, shared between every document that uses it.
    #[must_use]
    pub fn shared_default() -> Arc<Self> {
        Arc::clone(&DEFAULT_TABLE)
    }

    /// A copy of the built-in table that can be extended before use.
    #[must_use]
    pub fn html() -> Self {
        DEFAULT_TABLE.as_ref().clone()
    }

    /// Sets the flags for `name`, replacing any previous entry.
    pub fn insert(&mut self, name: &str, flags: ElementFlags) {
        let _ = self.flags.insert(name.to_ascii_lowercase(), flags);
    }

    /// Builder-style [`ElementTable::insert`].
    #[must_use]
    pub fn with(mut self, name: &str, flags: ElementFlags) -> Self {
        self.insert(name, flags);
        self
    }

    /// Flags recorded for `name`, or [`ElementFlags::NONE`].
    #[must_use]
    pub fn flags(&self, name: &str) -> ElementFlags {
        self.flags.get(name).copied().unwrap_or_default()
    }

    /// Raw-text container such as `script`.
    #[must_use]
    pub fn is_cdata(&self, name: &str) -> bool {
        self.flags(name).contains(ElementFlags::CDATA)
    }

    /// Void element. Names that are empty or start with `!` or `?` count as void.
    #[must_use]
    pub fn is_empty_element(&self, name: &str) -> bool {
        if name.is_empty() || name.starts_with(['!', '?']) {
            return true;
        }
        self.flags(name).contains(ElementFlags::EMPTY)
    }

    /// An end tag of this name with no open element is treated as a start tag.
    #[must_use]
    pub fn is_closed(&self, name: &str) -> bool {
        self.flags(name).contains(ElementFlags::CLOSED)
    }

    /// An unmatched end tag of this name becomes text instead of an error.
    #[must_use]
    pub fn can_overlap(&self, name: &str) -> bool {
        self.flags(name).contains(ElementFlags::CAN_OVERLAP)
    }
}
