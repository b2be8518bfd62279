use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use bramble_common::Options;
use bramble_dom::{DomError, DomTree, NodeId, Serializer};
use bramble_html::{Charset, HtmlParser, ParseError, detect_bom};

use crate::error::Error;

/// A parsed HTML document.
///
/// Owns the tree together with everything the parse found out about the input:
/// recoverable errors, the encoding the bytes were read with, the encoding a
/// `<meta>` element declared, and where parsing stopped if a stopper element
/// ended it early.
#[derive(Debug, Clone)]
pub struct Document {
    tree: DomTree,
    errors: Vec<ParseError>,
    declared_encoding: Option<Charset>,
    stream_encoding: Option<Charset>,
    remainder_offset: Option<usize>,
}

impl Document {
    /// Parses `html` with default options.
    ///
    /// # Errors
    /// Returns [`Error::Dom`] if elements nest deeper than the depth limit.
    pub fn parse(html: &str) -> Result<Self, Error> {
        Self::parse_with_options(html, Options::default())
    }

    /// Parses `html` with the given options.
    ///
    /// # Errors
    /// Returns [`Error::Dom`] if elements nest deeper than `options.max_depth`.
    pub fn parse_with_options(html: &str, options: Options) -> Result<Self, Error> {
        Self::build(html, options, None)
    }

    /// Reads and parses a whole byte stream.
    ///
    /// A byte order mark selects the encoding; without one the bytes are read
    /// as UTF-8.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if reading fails, or [`Error::Dom`] if elements
    /// nest too deeply.
    pub fn load<R: Read>(mut reader: R, options: Options) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        let _ = reader.read_to_end(&mut bytes)?;
        Self::load_bytes(&bytes, options)
    }

    /// Reads and parses a byte stream in `encoding`, unless a byte order mark
    /// says otherwise.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if reading fails, or [`Error::Dom`] if elements
    /// nest too deeply.
    pub fn load_with_encoding<R: Read>(
        mut reader: R,
        encoding: Charset,
        options: Options,
    ) -> Result<Self, Error> {
        let mut bytes = Vec::new();
        let _ = reader.read_to_end(&mut bytes)?;
        Self::decode_and_build(&bytes, encoding, options)
    }

    /// Parses an in-memory byte buffer, as [`Document::load`] does.
    ///
    /// # Errors
    /// Returns [`Error::Dom`] if elements nest too deeply.
    pub fn load_bytes(bytes: &[u8], options: Options) -> Result<Self, Error> {
        Self::decode_and_build(bytes, Charset::utf8(), options)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Dom`] if
    /// elements nest too deeply.
    pub fn load_file(path: impl AsRef<Path>, options: Options) -> Result<Self, Error> {
        let bytes = fs::read(path.as_ref())?;
        log::debug!(target: "bramble::document", "loaded {}", path.as_ref().display());
        Self::load_bytes(&bytes, options)
    }

    fn decode_and_build(bytes: &[u8], fallback: Charset, options: Options) -> Result<Self, Error> {
        let (charset, skip) = detect_bom(bytes).unwrap_or((fallback, 0));
        let text = charset.decode(bytes.get(skip..).unwrap_or_default());
        log::debug!(
            target: "bramble::document",
            "decoded {} bytes as {}",
            bytes.len(),
            charset.name()
        );
        Self::build(&text, options, Some(charset))
    }

    fn build(html: &str, options: Options, stream_encoding: Option<Charset>) -> Result<Self, Error> {
        let output = HtmlParser::new(html, options)
            .with_stream_encoding(stream_encoding.clone())
            .run()?;
        let mut document = Self {
            tree: output.tree,
            errors: output.errors,
            declared_encoding: output.declared_encoding,
            stream_encoding,
            remainder_offset: output.remainder_offset,
        };
        let label = document.output_encoding().label().to_string();
        document.tree.set_output_encoding(&label);
        if !document.errors.is_empty() {
            log::debug!(
                target: "bramble::document",
                "{} parse errors recorded",
                document.errors.len()
            );
        }
        Ok(document)
    }

    // ===== output =====

    /// The whole document as HTML.
    ///
    /// Unmodified nodes are written exactly as they appeared in the source.
    ///
    /// # Errors
    /// Returns [`Error::Dom`] if the tree is deeper than the depth limit.
    pub fn to_html(&self) -> Result<String, Error> {
        Ok(self.tree.outer_html(NodeId::ROOT)?)
    }

    /// The whole document as XML, whatever `output_as_xml` is set to.
    ///
    /// # Errors
    /// Returns [`Error::Dom`] if the tree is deeper than the depth limit.
    pub fn to_xml(&self) -> Result<String, Error> {
        let options = Options {
            output_as_xml: true,
            ..self.tree.options().clone()
        };
        Ok(Serializer::with_options(&self.tree, &options).outer_html(NodeId::ROOT)?)
    }

    /// Writes the document as HTML in its output encoding.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if writing fails, or [`Error::Dom`] if the tree is
    /// too deep.
    pub fn save<W: Write>(&self, writer: W) -> Result<(), Error> {
        self.save_with_encoding(writer, &self.output_encoding())
    }

    /// Writes the document as HTML in `encoding`.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if writing fails, or [`Error::Dom`] if the tree is
    /// too deep.
    pub fn save_with_encoding<W: Write>(&self, mut writer: W, encoding: &Charset) -> Result<(), Error> {
        writer.write_all(&encoding.encode(&self.to_html()?))?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the document as XML in its output encoding.
    ///
    /// # Errors
    /// Returns [`Error::Io`] if writing fails, or [`Error::Dom`] if the tree is
    /// too deep.
    pub fn save_xml<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        writer.write_all(&self.output_encoding().encode(&self.to_xml()?))?;
        writer.flush()?;
        Ok(())
    }

    /// Encoding used by [`Document::save`]: the declared encoding, else the
    /// stream encoding, else UTF-8.
    #[must_use]
    pub fn output_encoding(&self) -> Charset {
        self.declared_encoding
            .as_ref()
            .or(self.stream_encoding.as_ref())
            .cloned()
            .unwrap_or_else(Charset::utf8)
    }

    // ===== queries =====

    /// The element whose `id` attribute matches `id`, ignoring case.
    ///
    /// # Errors
    /// Returns [`Error::Dom`] if `use_id_attribute` is off.
    pub fn get_by_id(&self, id: &str) -> Result<Option<NodeId>, Error> {
        Ok(self.tree.get_by_id(id)?)
    }

    /// Recoverable problems found while parsing, in source order of discovery.
    #[must_use]
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Encoding declared by a `<meta>` element.
    #[must_use]
    pub const fn declared_encoding(&self) -> Option<&Charset> {
        self.declared_encoding.as_ref()
    }

    /// Encoding the input bytes were decoded with. `None` when parsed from text.
    #[must_use]
    pub const fn stream_encoding(&self) -> Option<&Charset> {
        self.stream_encoding.as_ref()
    }

    /// Byte offset where a stopper element ended the parse.
    #[must_use]
    pub const fn remainder_offset(&self) -> Option<usize> {
        self.remainder_offset
    }

    /// Source text left unparsed after a stopper element.
    #[must_use]
    pub fn remainder(&self) -> Option<&str> {
        self.remainder_offset
            .and_then(|offset| self.tree.source().get(offset..))
    }

    /// The text the document was parsed from.
    #[must_use]
    pub fn source(&self) -> &str {
        self.tree.source()
    }

    /// The Document node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// The first top-level element, usually `<html>`.
    #[must_use]
    pub fn document_element(&self) -> Option<NodeId> {
        self.tree.document_element()
    }

    /// Read access to the tree.
    #[must_use]
    pub const fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Write access to the tree for queries that mutate.
    pub const fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// The options the document was parsed with.
    #[must_use]
    pub const fn options(&self) -> &Options {
        self.tree.options()
    }

    // ===== factories =====

    /// Creates a detached element owned by this document.
    ///
    /// # Errors
    /// Returns [`Error::Dom`] if `name` is empty.
    pub fn create_element(&mut self, name: &str) -> Result<NodeId, Error> {
        Ok(self.tree.create_element(name)?)
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.tree.create_text(text)
    }

    /// Creates a detached comment node holding `<!--text-->`.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.tree.create_comment(text)
    }

    /// Parses `html` and returns a detached copy of its first top-level node,
    /// or `None` when `html` holds no nodes.
    ///
    /// The fragment is parsed with this document's options. The copy has no
    /// source span, so it renders from its structure.
    ///
    /// # Errors
    /// Returns [`Error::Dom`] if the fragment nests deeper than the depth limit.
    pub fn create_node(&mut self, html: &str) -> Result<Option<NodeId>, Error> {
        let fragment = self.parse_fragment(html)?;
        match fragment.first_child(NodeId::ROOT) {
            Some(first) => Ok(Some(self.tree.import_node(&fragment, first)?)),
            None => Ok(None),
        }
    }

    /// Replaces the children of `node` with the nodes parsed from `html`.
    ///
    /// # Errors
    /// Returns [`Error::Dom`] if `node` cannot hold children or the fragment
    /// nests deeper than the depth limit.
    pub fn set_inner_html(&mut self, node: NodeId, html: &str) -> Result<(), Error> {
        if !self.tree.node(node)?.is_container() {
            return Err(DomError::NotAContainer(node).into());
        }
        let fragment = self.parse_fragment(html)?;
        self.tree.remove_all_children(node)?;
        for &child in fragment.children(NodeId::ROOT) {
            let copy = self.tree.import_node(&fragment, child)?;
            let _ = self.tree.append_child(node, copy)?;
        }
        Ok(())
    }

    fn parse_fragment(&self, html: &str) -> Result<DomTree, Error> {
        let output = HtmlParser::new(html, self.options().clone()).run()?;
        if !output.errors.is_empty() {
            log::debug!(
                target: "bramble::document",
                "{} parse errors in fragment",
                output.errors.len()
            );
        }
        Ok(output.tree)
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(html: &str) -> Result<Self, Self::Err> {
        Self::parse(html)
    }
}
