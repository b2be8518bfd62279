//! Element attributes.
//!
//! Names are matched case-insensitively. The collection keeps insertion order,
//! and setting a name that already exists rewrites the value where it stands.

/// Quote character an attribute value was written with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuoteStyle {
    /// `name="value"`
    #[default]
    Double,
    /// `name='value'`
    Single,
}

impl QuoteStyle {
    /// The quote character itself.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Double => '"',
            Self::Single => '\'',
        }
    }

    /// `value` with this quote character replaced by its character reference,
    /// ready to be written between two of these quotes.
    #[must_use]
    pub fn escape(self, value: &str) -> String {
        match self {
            Self::Double => value.replace('"', "&quot;"),
            Self::Single => value.replace('\'', "&#39;"),
        }
    }
}

/// A single `name=value` pair.
///
/// An attribute is detached until it is inserted into an element's
/// [`Attributes`]; the owning element is the one whose collection holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    original_name: String,
    value: String,
    /// Quote style used when the value is written back out.
    pub quote: QuoteStyle,
    /// 1-based line of the attribute name in the source, 0 if created in code.
    pub line: usize,
    /// 1-based column of the attribute name in the source, 0 if created in code.
    pub column: usize,
    /// Byte offset of the attribute name in the source.
    pub stream_position: usize,
}

impl Attribute {
    /// Creates a detached attribute. The lookup name is the lowercase form of `name`.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            original_name: name.to_string(),
            value: value.to_string(),
            quote: QuoteStyle::Double,
            line: 0,
            column: 0,
            stream_position: 0,
        }
    }

    /// Lowercase name used for lookups.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as it was written.
    #[must_use]
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Current value. Valueless attributes have an empty value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replaces the value.
    pub fn set_value(&mut self, value: &str) {
        value.clone_into(&mut self.value);
    }

    /// True for an embedded `<% ... %>` block kept in attribute position.
    #[must_use]
    pub fn is_server_code(&self) -> bool {
        self.name.len() >= 4 && self.name.starts_with("<%") && self.name.ends_with("%>")
    }
}

/// Ordered, case-insensitive attribute collection of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    items: Vec<Attribute>,
}

impl Attributes {
    /// An empty collection.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.items.iter()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Looks up an attribute by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.position(name).map(|i| &self.items[i])
    }

    /// Mutable lookup by name, ignoring case.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.position(name).map(|i| &mut self.items[i])
    }

    /// Value of the named attribute.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(Attribute::value)
    }

    /// True if the named attribute exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Creates the attribute or updates its value in place.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.get_mut(name) {
            Some(existing) => existing.set_value(value),
            None => self.items.push(Attribute::new(name, value)),
        }
    }

    /// Adds `attribute`. If the name is already present only the value is
    /// replaced, so the attribute keeps its original position.
    pub fn insert(&mut self, attribute: Attribute) {
        match self.position(&attribute.name) {
            Some(i) => self.items[i].value = attribute.value,
            None => self.items.push(attribute),
        }
    }

    /// Removes the named attribute and returns it.
    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        self.position(name).map(|i| self.items.remove(i))
    }

    /// Removes every attribute.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
