//! The buffering XML cursor.
//!
//! [`BufferingXmlReader`] wraps a forward-only [`TokenSource`] and adds:
//!
//! - **Look-ahead with replay.** Between [`start_buffering`] and
//!   [`stop_buffering`] every node read is recorded; stopping rewinds the cursor
//!   to the element where buffering started and subsequent reads replay the
//!   recorded nodes before pulling new ones from the source.
//! - **`xml:base` tracking.** The base URI in effect for the current node is
//!   maintained as elements are entered and left, including during replay.
//! - **In-stream error detection.** An `m:error` element showing up in the
//!   middle of a payload is parsed and surfaced as [`Error::InStreamError`].
//!
//! [`start_buffering`]: BufferingXmlReader::start_buffering
//! [`stop_buffering`]: BufferingXmlReader::stop_buffering

use log::debug;
use url::Url;

use crate::atom::error_reader;
use crate::atom::names::METADATA_NAMESPACE;
use crate::error::{Error, Result};
use crate::nametable::{Atom, NameTable};
use crate::settings::ReaderSettings;
use crate::xml::base_uri::XmlBaseStack;
use crate::xml::node::{Node, NodeKind, QualifiedName, XmlAttribute};
use crate::xml::source::{TokenSource, XML_NAMESPACE};

/// Pull cursor over a [`TokenSource`] with look-ahead buffering and
/// `xml:base` resolution.
pub struct BufferingXmlReader<S: TokenSource> {
    source: S,
    current: Node,
    /// Index into `current.attributes` while positioned on an attribute.
    attribute_index: Option<usize>,
    /// Recorded nodes. While buffering, `buffer[0]` is the checkpoint node.
    buffer: Vec<Node>,
    /// Index of the next buffered node to report.
    cursor: usize,
    buffering: bool,
    /// Base URI frames as they were at the checkpoint.
    checkpoint: Option<XmlBaseStack>,
    base: XmlBaseStack,
    eof: bool,
    detect_in_stream_errors: bool,
    reading_in_stream_error: bool,
    max_error_depth: usize,
    xml_namespace: Atom,
    base_name: Atom,
    metadata_namespace: Atom,
    error_name: Atom,
}

impl<S: TokenSource> BufferingXmlReader<S> {
    pub fn new(mut source: S, settings: &ReaderSettings) -> Self {
        let names = source.name_table_mut();
        let xml_namespace = names.add(XML_NAMESPACE);
        let base_name = names.add("base");
        let metadata_namespace = names.add(METADATA_NAMESPACE);
        let error_name = names.add("error");
        let current = empty_node(names);

        Self {
            source,
            current,
            attribute_index: None,
            buffer: Vec::new(),
            cursor: 0,
            buffering: false,
            checkpoint: None,
            base: XmlBaseStack::new(settings.base_uri.clone(), settings.disable_xml_base),
            eof: false,
            detect_in_stream_errors: settings.detect_in_stream_errors,
            reading_in_stream_error: false,
            max_error_depth: settings.max_nesting_depth,
            xml_namespace,
            base_name,
            metadata_namespace,
            error_name,
        }
    }

    /// Advance to the next node. Returns `false` at the end of the stream.
    pub fn read(&mut self) -> Result<bool> {
        self.advance(true)
    }

    fn advance(&mut self, track: bool) -> Result<bool> {
        self.attribute_index = None;

        let next = if self.cursor < self.buffer.len() {
            let node = self.buffer[self.cursor].clone();
            self.cursor += 1;
            Some(node)
        } else {
            if !self.buffering && !self.buffer.is_empty() {
                self.buffer.clear();
                self.cursor = 0;
            }
            let node = self.source.next_node()?;
            if self.buffering
                && let Some(node) = &node
            {
                self.buffer.push(node.clone());
                self.cursor = self.buffer.len();
            }
            node
        };

        match next {
            Some(node) => {
                self.eof = false;
                if track {
                    self.report(node)?;
                } else {
                    self.current = node;
                }
                Ok(true)
            }
            None => {
                self.eof = true;
                self.current = empty_node(self.source.name_table_mut());
                Ok(false)
            }
        }
    }

    fn report(&mut self, node: Node) -> Result<()> {
        self.base.leave(node.depth, node.is_end_element());
        if node.is_element() {
            let xml_base = node
                .attributes
                .iter()
                .find(|a| a.name.is(&self.base_name, &self.xml_namespace))
                .map(|a| a.value.as_str());
            self.base.enter(node.depth, xml_base)?;
        }
        self.current = node;

        if self.current.is_element()
            && self.detect_in_stream_errors
            && !self.reading_in_stream_error
            && self.current.name.is(&self.error_name, &self.metadata_namespace)
        {
            return Err(self.read_in_stream_error());
        }
        Ok(())
    }

    fn read_in_stream_error(&mut self) -> Error {
        debug!("in-stream error element at depth {}", self.current.depth);
        self.reading_in_stream_error = true;
        let result = error_reader::read_error_element(self, self.max_error_depth);
        self.reading_in_stream_error = false;
        match result {
            Ok(error) => Error::InStreamError(Box::new(error)),
            Err(e) => e,
        }
    }

    /// Begin recording nodes so they can be replayed after
    /// [`stop_buffering`](Self::stop_buffering).
    ///
    /// The cursor must be on an element or end element and buffering must not
    /// already be active.
    pub fn start_buffering(&mut self) -> Result<()> {
        if self.buffering {
            return Err(Error::InvalidOperation("buffering is already active"));
        }
        if !self.on_element_boundary() {
            return Err(Error::InvalidOperation(
                "buffering can only start on an element or end element",
            ));
        }

        // Unconsumed replay nodes stay queued behind the new checkpoint.
        let tail = self.buffer.split_off(self.cursor);
        self.buffer.clear();
        self.buffer.push(self.current.clone());
        self.buffer.extend(tail);
        self.cursor = 1;
        self.checkpoint = Some(self.base.clone());
        self.buffering = true;
        debug!("start buffering at {}", self.current.name.qualified());
        Ok(())
    }

    /// Stop recording and rewind to the node where buffering started.
    ///
    /// Subsequent reads replay the recorded nodes in order before pulling new
    /// nodes from the source.
    pub fn stop_buffering(&mut self) -> Result<()> {
        if !self.buffering {
            return Err(Error::InvalidOperation("buffering is not active"));
        }
        if !self.on_element_boundary() {
            return Err(Error::InvalidOperation(
                "buffering can only stop on an element or end element",
            ));
        }

        self.buffering = false;
        self.current = self.buffer[0].clone();
        self.cursor = 1;
        self.attribute_index = None;
        self.eof = false;
        if let Some(base) = self.checkpoint.take() {
            self.base = base;
        }
        debug!(
            "stop buffering, {} nodes to replay",
            self.buffer.len() - self.cursor
        );
        Ok(())
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    /// Turn in-stream `m:error` detection on or off. Top-level error
    /// payloads are read with detection off.
    pub fn set_detect_in_stream_errors(&mut self, detect: bool) {
        self.detect_in_stream_errors = detect;
    }

    fn on_element_boundary(&self) -> bool {
        self.attribute_index.is_none()
            && matches!(self.current.kind, NodeKind::Element | NodeKind::EndElement)
    }

    /// Base URI established by `xml:base` for the current node, if any.
    pub fn xml_base_uri(&self) -> Option<&Url> {
        self.base.current()
    }

    /// The document base URI the reader was created with.
    pub fn document_base_uri(&self) -> Option<&Url> {
        self.base.document_base()
    }

    /// The base to resolve relative payload URIs against: the innermost
    /// `xml:base`, falling back to the document base URI.
    pub fn resolution_base(&self) -> Option<&Url> {
        self.base.current().or(self.base.document_base())
    }

    // ------------------------------------------------------------------
    // Node accessors
    // ------------------------------------------------------------------

    /// The element (or other node) the cursor is on, ignoring attribute
    /// navigation.
    pub fn node(&self) -> &Node {
        &self.current
    }

    fn attribute(&self) -> Option<&XmlAttribute> {
        self.attribute_index.map(|i| &self.current.attributes[i])
    }

    pub fn node_kind(&self) -> NodeKind {
        if self.attribute_index.is_some() {
            NodeKind::Attribute
        } else {
            self.current.kind
        }
    }

    pub fn name(&self) -> &QualifiedName {
        match self.attribute() {
            Some(attr) => &attr.name,
            None => &self.current.name,
        }
    }

    pub fn local_name(&self) -> &Atom {
        &self.name().local_name
    }

    pub fn namespace_uri(&self) -> &Atom {
        &self.name().namespace_uri
    }

    pub fn prefix(&self) -> &Atom {
        &self.name().prefix
    }

    pub fn value(&self) -> &str {
        match self.attribute() {
            Some(attr) => &attr.value,
            None => &self.current.value,
        }
    }

    pub fn depth(&self) -> usize {
        match self.attribute_index {
            Some(_) => self.current.depth + 1,
            None => self.current.depth,
        }
    }

    pub fn is_empty_element(&self) -> bool {
        self.attribute_index.is_none() && self.current.is_empty_element
    }

    pub fn eof(&self) -> bool {
        self.eof
    }

    pub fn name_table(&self) -> &NameTable {
        self.source.name_table()
    }

    pub fn name_table_mut(&mut self) -> &mut NameTable {
        self.source.name_table_mut()
    }

    // ------------------------------------------------------------------
    // Attribute navigation
    // ------------------------------------------------------------------

    pub fn attribute_count(&self) -> usize {
        if self.current.is_element() {
            self.current.attributes.len()
        } else {
            0
        }
    }

    pub fn move_to_first_attribute(&mut self) -> bool {
        self.move_to_attribute_at(0)
    }

    pub fn move_to_next_attribute(&mut self) -> bool {
        let next = self.attribute_index.map_or(0, |i| i + 1);
        self.move_to_attribute_at(next)
    }

    pub fn move_to_attribute_at(&mut self, index: usize) -> bool {
        if index < self.attribute_count() {
            self.attribute_index = Some(index);
            true
        } else {
            false
        }
    }

    pub fn move_to_attribute(&mut self, local_name: &str, namespace_uri: &str) -> bool {
        if !self.current.is_element() {
            return false;
        }
        match self
            .current
            .attributes
            .iter()
            .position(|a| a.name.local_name == local_name && a.name.namespace_uri == namespace_uri)
        {
            Some(index) => {
                self.attribute_index = Some(index);
                true
            }
            None => false,
        }
    }

    /// Move back from an attribute to its element.
    pub fn move_to_element(&mut self) -> bool {
        self.attribute_index.take().is_some()
    }

    pub fn get_attribute(&self, local_name: &str, namespace_uri: &str) -> Option<&str> {
        if !self.current.is_element() {
            return None;
        }
        self.current
            .attribute(local_name, namespace_uri)
            .map(|a| a.value.as_str())
    }

    // ------------------------------------------------------------------
    // Subtree operations
    // ------------------------------------------------------------------

    /// Skip the current element including its subtree, or move to the next
    /// node for anything else.
    pub fn skip(&mut self) -> Result<()> {
        self.move_to_element();
        if self.current.is_element() && !self.current.is_empty_element {
            let depth = self.current.depth;
            loop {
                if !self.read()? {
                    return Err(unexpected_eof());
                }
                if self.current.is_end_element() && self.current.depth == depth {
                    break;
                }
            }
        }
        self.read()?;
        Ok(())
    }

    /// Move to the end tag of the current element. The descendants are
    /// buffered like any other node but their `xml:base` attributes and
    /// in-stream errors are not processed.
    pub fn skip_to_end_untracked(&mut self) -> Result<()> {
        self.move_to_element();
        if !self.current.is_element() || self.current.is_empty_element {
            return Ok(());
        }
        let depth = self.current.depth;
        loop {
            if !self.advance(false)? {
                return Err(unexpected_eof());
            }
            if self.current.is_end_element() && self.current.depth == depth {
                return Ok(());
            }
        }
    }

    /// Return the markup of the current element's content and move past the
    /// element.
    ///
    /// `xml:base` attributes inside the returned markup are not tracked. On an
    /// attribute the attribute value is returned and the cursor does not move.
    pub fn read_inner_xml(&mut self) -> Result<String> {
        if let Some(attr) = self.attribute() {
            return Ok(attr.value.clone());
        }
        if !self.current.is_element() {
            return Ok(String::new());
        }
        if self.current.is_empty_element {
            self.read()?;
            return Ok(String::new());
        }

        let depth = self.current.depth;
        let mut markup = String::new();
        loop {
            if !self.advance(false)? {
                return Err(unexpected_eof());
            }
            if self.current.is_end_element() && self.current.depth == depth {
                break;
            }
            write_markup(&self.current, &mut markup);
        }
        self.read()?;
        Ok(markup)
    }
}

fn empty_node(names: &mut NameTable) -> Node {
    let empty = names.empty();
    Node {
        kind: NodeKind::None,
        name: QualifiedName::new(empty.clone(), empty.clone(), empty),
        value: String::new(),
        depth: 0,
        is_empty_element: false,
        attributes: Vec::new(),
    }
}

fn unexpected_eof() -> Error {
    Error::MalformedXml("Unexpected end of file".to_string())
}

/// Serialize a single node as markup.
fn write_markup(node: &Node, out: &mut String) {
    match node.kind {
        NodeKind::Element => {
            out.push('<');
            out.push_str(&node.name.qualified());
            for attr in &node.attributes {
                out.push(' ');
                out.push_str(&attr.name.qualified());
                out.push_str("=\"");
                out.push_str(&quick_xml::escape::escape(attr.value.as_str()));
                out.push('"');
            }
            if node.is_empty_element {
                out.push_str(" />");
            } else {
                out.push('>');
            }
        }
        NodeKind::EndElement => {
            out.push_str("</");
            out.push_str(&node.name.qualified());
            out.push('>');
        }
        NodeKind::Text => out.push_str(&quick_xml::escape::partial_escape(node.value.as_str())),
        NodeKind::CData => {
            out.push_str("<![CDATA[");
            out.push_str(&node.value);
            out.push_str("]]>");
        }
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(&node.value);
            out.push_str("-->");
        }
        NodeKind::ProcessingInstruction => {
            out.push_str("<?");
            out.push_str(&node.name.local_name);
            if !node.value.is_empty() {
                out.push(' ');
                out.push_str(&node.value);
            }
            out.push_str("?>");
        }
        NodeKind::None | NodeKind::Attribute | NodeKind::XmlDeclaration => {}
    }
}
