//! Forward-only XML token sources.
//!
//! The buffering cursor never talks to quick-xml directly; it pulls [`Node`]s
//! from a [`TokenSource`]. [`QuickXmlSource`] is the production implementation:
//! it turns quick-xml events into nodes with atomized names, resolving
//! namespaces through [`NsReader`]'s resolver, and enforces the
//! well-formedness rules quick-xml leaves to the caller.

use std::io::BufRead;

use log::trace;
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, QName, ResolveResult};

use crate::error::{Error, Result};
use crate::nametable::{Atom, NameTable};
use crate::xml::node::{Node, NodeKind, QualifiedName, XmlAttribute, is_xml_whitespace};

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// Namespace of `xmlns` declarations.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// A pull-based source of XML nodes.
pub trait TokenSource {
    /// Pull the next node, or `None` once the document is exhausted.
    fn next_node(&mut self) -> Result<Option<Node>>;

    fn name_table(&self) -> &NameTable;

    fn name_table_mut(&mut self) -> &mut NameTable;
}

/// [`TokenSource`] backed by a quick-xml [`NsReader`].
///
/// The resolver's scope for an element stays live until the event after
/// its end tag is read, so names are resolved before the next pull.
pub struct QuickXmlSource<R: BufRead> {
    reader: NsReader<R>,
    buf: Vec<u8>,
    names: NameTable,
    pending: Option<Event<'static>>,
    depth: usize,
    seen_root: bool,
    root_closed: bool,
    done: bool,
    xml_prefix: Atom,
    xmlns_prefix: Atom,
    xmlns_namespace: Atom,
}

impl<'a> QuickXmlSource<&'a [u8]> {
    pub fn from_str(content: &'a str) -> Self {
        Self::new(NsReader::from_str(content))
    }
}

impl<R: BufRead> QuickXmlSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self::new(NsReader::from_reader(reader))
    }

    fn new(mut reader: NsReader<R>) -> Self {
        reader.config_mut().trim_text(false);
        reader.config_mut().check_end_names = true;

        let mut names = NameTable::new();
        let xml_prefix = names.add("xml");
        let xmlns_prefix = names.add("xmlns");
        let xmlns_namespace = names.add(XMLNS_NAMESPACE);

        Self {
            reader,
            buf: Vec::new(),
            names,
            pending: None,
            depth: 0,
            seen_root: false,
            root_closed: false,
            done: false,
            xml_prefix,
            xmlns_prefix,
            xmlns_namespace,
        }
    }

    fn next_event(&mut self) -> Result<Event<'static>> {
        if let Some(event) = self.pending.take() {
            return Ok(event);
        }
        self.buf.clear();
        let event = self.reader.read_event_into(&mut self.buf)?;
        Ok(event.into_owned())
    }

    fn text_node(&mut self, text: String) -> Result<Node> {
        if self.depth == 0 && !is_xml_whitespace(&text) {
            return Err(Error::MalformedXml(
                "Text is not allowed outside the root element".to_string(),
            ));
        }
        Ok(self.simple_node(NodeKind::Text, normalize_newlines(text)))
    }

    fn simple_node(&mut self, kind: NodeKind, value: String) -> Node {
        let empty = self.names.empty();
        Node {
            kind,
            name: QualifiedName::new(empty.clone(), empty.clone(), empty),
            value,
            depth: self.depth,
            is_empty_element: false,
            attributes: Vec::new(),
        }
    }

    fn convert(&mut self, event: Event<'static>) -> Result<Option<Node>> {
        let node = match event {
            Event::Start(e) => self.element(&e, false)?,
            Event::Empty(e) => self.element(&e, true)?,
            Event::End(e) => {
                let name = self.element_name(e.name())?;
                self.depth = self.depth.saturating_sub(1);
                if self.depth == 0 {
                    self.root_closed = true;
                }
                Node {
                    kind: NodeKind::EndElement,
                    name,
                    value: String::new(),
                    depth: self.depth,
                    is_empty_element: false,
                    attributes: Vec::new(),
                }
            }
            Event::CData(e) => {
                let value = normalize_newlines(String::from_utf8(e.to_vec())?);
                self.outside_root_check("CDATA")?;
                self.simple_node(NodeKind::CData, value)
            }
            Event::Comment(e) => {
                let value = String::from_utf8(e.to_vec())?;
                self.simple_node(NodeKind::Comment, value)
            }
            Event::PI(e) => {
                let target = utf8(e.target())?.to_string();
                let data = utf8(e.content())?.trim_start().to_string();
                let mut node = self.simple_node(NodeKind::ProcessingInstruction, data);
                node.name.local_name = self.names.add(&target);
                node
            }
            Event::Decl(e) => {
                let version = e.version().map_err(quick_xml::Error::from)?;
                let mut content = format!("version=\"{}\"", utf8(&version)?);
                if let Some(encoding) = e.encoding() {
                    let encoding = encoding.map_err(quick_xml::Error::from)?;
                    content.push_str(&format!(" encoding=\"{}\"", utf8(&encoding)?));
                }
                if let Some(standalone) = e.standalone() {
                    let standalone = standalone.map_err(quick_xml::Error::from)?;
                    content.push_str(&format!(" standalone=\"{}\"", utf8(&standalone)?));
                }
                self.simple_node(NodeKind::XmlDeclaration, content)
            }
            Event::DocType(_) => {
                return Err(Error::MalformedXml(
                    "DTD is prohibited in this XML document".to_string(),
                ));
            }
            Event::Eof => {
                self.done = true;
                if self.depth > 0 {
                    return Err(Error::MalformedXml(
                        "Unexpected end of file while elements are still open".to_string(),
                    ));
                }
                if !self.seen_root {
                    return Err(Error::MalformedXml("Root element is missing".to_string()));
                }
                return Ok(None);
            }
            // Text and references are merged by `next_node`.
            Event::Text(_) | Event::GeneralRef(_) => {
                return Err(Error::MalformedXml("Unexpected text event".to_string()));
            }
        };
        Ok(Some(node))
    }

    fn outside_root_check(&self, what: &str) -> Result<()> {
        if self.depth == 0 {
            return Err(Error::MalformedXml(format!(
                "{what} is not allowed outside the root element"
            )));
        }
        Ok(())
    }

    fn element(&mut self, start: &BytesStart<'_>, is_empty: bool) -> Result<Node> {
        if self.root_closed {
            return Err(Error::MalformedXml(
                "There are multiple root elements".to_string(),
            ));
        }
        self.seen_root = true;

        let name = self.element_name(start.name())?;

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let value = quick_xml::escape::unescape(utf8(&attr.value)?)?.into_owned();
            let name = match attr.key.as_namespace_binding() {
                Some(PrefixDeclaration::Default) => QualifiedName::new(
                    self.xmlns_prefix.clone(),
                    self.xmlns_namespace.clone(),
                    self.names.empty(),
                ),
                Some(PrefixDeclaration::Named(prefix)) => {
                    let prefix = utf8(prefix)?;
                    if value.is_empty() {
                        return Err(Error::MalformedXml(format!(
                            "Cannot undeclare the namespace prefix '{prefix}'"
                        )));
                    }
                    QualifiedName::new(
                        self.names.add(prefix),
                        self.xmlns_namespace.clone(),
                        self.xmlns_prefix.clone(),
                    )
                }
                None => self.attribute_name(attr.key)?,
            };
            attributes.push(XmlAttribute { name, value });
        }

        let depth = self.depth;
        if is_empty {
            if depth == 0 {
                self.root_closed = true;
            }
        } else {
            self.depth += 1;
        }

        trace!("element {} at depth {}", name.local_name, depth);
        Ok(Node {
            kind: NodeKind::Element,
            name,
            value: String::new(),
            depth,
            is_empty_element: is_empty,
            attributes,
        })
    }

    fn element_name(&mut self, qname: QName<'_>) -> Result<QualifiedName> {
        let (resolved, local) = self.reader.resolver().resolve_element(qname);
        let namespace = intern_namespace(&mut self.names, resolved)?;
        let local = self.names.add(utf8(local.as_ref())?);
        let prefix = self.prefix(qname)?;
        Ok(QualifiedName::new(local, namespace, prefix))
    }

    /// Unprefixed attributes are in no namespace, whatever the default.
    fn attribute_name(&mut self, qname: QName<'_>) -> Result<QualifiedName> {
        let (resolved, local) = self.reader.resolver().resolve_attribute(qname);
        let namespace = intern_namespace(&mut self.names, resolved)?;
        let local = self.names.add(utf8(local.as_ref())?);
        let prefix = self.prefix(qname)?;
        Ok(QualifiedName::new(local, namespace, prefix))
    }

    fn prefix(&mut self, qname: QName<'_>) -> Result<Atom> {
        match qname.prefix() {
            Some(prefix) if prefix.as_ref() == b"xml" => Ok(self.xml_prefix.clone()),
            Some(prefix) => Ok(self.names.add(utf8(prefix.as_ref())?)),
            None => Ok(self.names.empty()),
        }
    }
}

impl<R: BufRead> TokenSource for QuickXmlSource<R> {
    fn next_node(&mut self) -> Result<Option<Node>> {
        if self.done {
            return Ok(None);
        }

        // Adjacent text events and entity references form one text node.
        let mut text: Option<String> = None;
        loop {
            let event = self.next_event()?;
            match event {
                Event::Text(e) => {
                    let chunk = String::from_utf8(e.to_vec())?;
                    text.get_or_insert_with(String::new).push_str(&chunk);
                }
                Event::GeneralRef(e) => {
                    let entity = utf8(e.as_ref())?;
                    let resolved = resolve_entity(entity).ok_or_else(|| {
                        Error::MalformedXml(format!("Reference to undeclared entity '{entity}'"))
                    })?;
                    text.get_or_insert_with(String::new).push_str(&resolved);
                }
                other => {
                    if let Some(text) = text.take() {
                        self.pending = Some(other);
                        return self.text_node(text).map(Some);
                    }
                    return self.convert(other);
                }
            }
        }
    }

    fn name_table(&self) -> &NameTable {
        &self.names
    }

    fn name_table_mut(&mut self) -> &mut NameTable {
        &mut self.names
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::MalformedXml(e.to_string()))
}

fn intern_namespace(names: &mut NameTable, resolved: ResolveResult<'_>) -> Result<Atom> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(names.add(utf8(ns.as_ref())?)),
        ResolveResult::Unbound => Ok(names.empty()),
        ResolveResult::Unknown(prefix) => Err(Error::MalformedXml(format!(
            "'{}' is an undeclared prefix",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

/// XML end-of-line handling: `\r\n` and lone `\r` become `\n`.
fn normalize_newlines(text: String) -> String {
    if memchr::memchr(b'\r', text.as_bytes()).is_none() {
        return text;
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Resolve predefined and character entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Result<Vec<Node>> {
        let mut source = QuickXmlSource::from_str(xml);
        let mut nodes = Vec::new();
        while let Some(node) = source.next_node()? {
            nodes.push(node);
        }
        Ok(nodes)
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("amp"), Some("&".to_string()));
        assert_eq!(resolve_entity("#65"), Some("A".to_string()));
        assert_eq!(resolve_entity("#x2019"), Some("\u{2019}".to_string()));
        assert_eq!(resolve_entity("nbsp"), None);
    }

    #[test]
    fn test_namespaces_resolved() {
        let nodes = collect(
            r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:m="urn:m"><m:count>2</m:count></feed>"#,
        )
        .unwrap();
        assert_eq!(nodes[0].name.local_name, "feed");
        assert_eq!(nodes[0].name.namespace_uri, "http://www.w3.org/2005/Atom");
        assert_eq!(nodes[1].name.namespace_uri, "urn:m");
        assert_eq!(nodes[1].name.prefix, "m");
        assert_eq!(nodes[1].depth, 1);
        assert_eq!(nodes[2].value, "2");
        assert_eq!(nodes[2].depth, 2);
        assert_eq!(nodes[3].kind, NodeKind::EndElement);
        assert_eq!(nodes[3].depth, 1);
        assert_eq!(nodes[4].kind, NodeKind::EndElement);
        assert_eq!(nodes[4].depth, 0);
    }

    #[test]
    fn test_default_namespace_scoped_to_element() {
        let nodes =
            collect(r#"<a xmlns="urn:o"><b xmlns="urn:i"><d/></b><c/></a>"#).unwrap();
        assert_eq!(nodes[1].name.namespace_uri, "urn:i");
        assert_eq!(nodes[2].name.namespace_uri, "urn:i");
        assert_eq!(nodes[3].kind, NodeKind::EndElement);
        assert_eq!(nodes[3].name.namespace_uri, "urn:i");
        assert_eq!(nodes[4].name.local_name, "c");
        assert_eq!(nodes[4].name.namespace_uri, "urn:o");
        assert_eq!(nodes[5].name.namespace_uri, "urn:o");
    }

    #[test]
    fn test_prefix_rebound_in_child() {
        let nodes = collect(
            r#"<p:a xmlns:p="urn:1"><p:b xmlns:p="urn:2">t</p:b><p:c/></p:a>"#,
        )
        .unwrap();
        assert_eq!(nodes[0].name.namespace_uri, "urn:1");
        assert_eq!(nodes[1].name.namespace_uri, "urn:2");
        assert_eq!(nodes[1].name.prefix, "p");
        // End tag resolved after the merged text node was handed out.
        assert_eq!(nodes[3].kind, NodeKind::EndElement);
        assert_eq!(nodes[3].name.namespace_uri, "urn:2");
        assert_eq!(nodes[4].name.namespace_uri, "urn:1");
    }

    #[test]
    fn test_names_are_atomized() {
        let mut source = QuickXmlSource::from_str("<a><b/><b/></a>");
        let _a = source.next_node().unwrap().unwrap();
        let b1 = source.next_node().unwrap().unwrap();
        let b2 = source.next_node().unwrap().unwrap();
        assert!(b1.name.local_name.ptr_eq(&b2.name.local_name));
        assert!(b1.name.namespace_uri.ptr_eq(&b2.name.namespace_uri));
    }

    #[test]
    fn test_unprefixed_attribute_has_no_namespace() {
        let nodes = collect(r#"<a xmlns="urn:x" href="h" xml:base="http://b/"/>"#).unwrap();
        let href = nodes[0].attribute("href", "").unwrap();
        assert_eq!(href.value, "h");
        let base = nodes[0].attribute("base", XML_NAMESPACE).unwrap();
        assert_eq!(base.value, "http://b/");
        assert!(nodes[0].attribute("xmlns", XMLNS_NAMESPACE).is_some());
    }

    #[test]
    fn test_empty_element_has_no_end() {
        let nodes = collect("<a><b/></a>").unwrap();
        let kinds: Vec<_> = nodes.iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Element, NodeKind::Element, NodeKind::EndElement]
        );
        assert!(nodes[1].is_empty_element);
    }

    #[test]
    fn test_text_and_references_merge() {
        let nodes = collect("<a>x &amp; y&#33;</a>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].value, "x & y!");
    }

    #[test]
    fn test_attribute_value_unescaped() {
        let nodes = collect(r#"<a title="a &lt; b"/>"#).unwrap();
        assert_eq!(nodes[0].attribute("title", "").unwrap().value, "a < b");
    }

    #[test]
    fn test_comment_pi_and_cdata() {
        let nodes = collect("<?xml version=\"1.0\"?><a><!--c--><?pi data?><![CDATA[<x>]]></a>").unwrap();
        assert_eq!(nodes[0].kind, NodeKind::XmlDeclaration);
        assert_eq!(nodes[2].kind, NodeKind::Comment);
        assert_eq!(nodes[2].value, "c");
        assert_eq!(nodes[3].kind, NodeKind::ProcessingInstruction);
        assert_eq!(nodes[3].name.local_name, "pi");
        assert_eq!(nodes[3].value, "data");
        assert_eq!(nodes[4].kind, NodeKind::CData);
        assert_eq!(nodes[4].value, "<x>");
    }

    #[test]
    fn test_undeclared_prefix_fails() {
        let err = collect("<m:a/>").unwrap_err();
        assert!(matches!(err, Error::MalformedXml(_)));
    }

    #[test]
    fn test_unclosed_element_fails() {
        assert!(collect("<a><b></b>").is_err());
    }

    #[test]
    fn test_multiple_roots_fail() {
        let err = collect("<a/><b/>").unwrap_err();
        assert!(matches!(err, Error::MalformedXml(_)));
    }

    #[test]
    fn test_doctype_prohibited() {
        let err = collect("<!DOCTYPE a><a/>").unwrap_err();
        assert!(matches!(err, Error::MalformedXml(_)));
    }

    #[test]
    fn test_newlines_normalized() {
        let nodes = collect("<a>x\r\ny\rz</a>").unwrap();
        assert_eq!(nodes[1].value, "x\ny\nz");
    }
}
