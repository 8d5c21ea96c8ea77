//! XML nodes as reported by a token source.

use std::fmt;

use crate::nametable::Atom;

/// Kind of the node a cursor is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Before the first read or after the end of the stream.
    None,
    Element,
    EndElement,
    Attribute,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
    XmlDeclaration,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::None => "None",
            NodeKind::Element => "Element",
            NodeKind::EndElement => "EndElement",
            NodeKind::Attribute => "Attribute",
            NodeKind::Text => "Text",
            NodeKind::CData => "CDATA",
            NodeKind::Comment => "Comment",
            NodeKind::ProcessingInstruction => "ProcessingInstruction",
            NodeKind::XmlDeclaration => "XmlDeclaration",
        };
        f.write_str(name)
    }
}

/// Namespace-resolved name of an element or attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub local_name: Atom,
    pub namespace_uri: Atom,
    pub prefix: Atom,
}

impl QualifiedName {
    pub fn new(local_name: Atom, namespace_uri: Atom, prefix: Atom) -> Self {
        Self {
            local_name,
            namespace_uri,
            prefix,
        }
    }

    /// Returns true if the name matches `local_name` in `namespace_uri`.
    pub fn is(&self, local_name: &Atom, namespace_uri: &Atom) -> bool {
        self.local_name == *local_name && self.namespace_uri == *namespace_uri
    }

    /// The name as written in the document (`prefix:local` or `local`).
    pub fn qualified(&self) -> String {
        if self.prefix.is_empty() {
            self.local_name.to_string()
        } else {
            format!("{}:{}", self.prefix, self.local_name)
        }
    }
}

/// An attribute of an element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: QualifiedName,
    /// Unescaped value.
    pub value: String,
}

/// A single token of the XML stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Element name; PI target for processing instructions; empty otherwise.
    pub name: QualifiedName,
    /// Text content, PI data or declaration content. Empty for elements.
    pub value: String,
    pub depth: usize,
    pub is_empty_element: bool,
    /// Attributes in document order (element nodes only).
    pub attributes: Vec<XmlAttribute>,
}

impl Node {
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn is_end_element(&self) -> bool {
        self.kind == NodeKind::EndElement
    }

    /// Returns true for text nodes consisting only of XML whitespace.
    pub fn is_whitespace(&self) -> bool {
        self.kind == NodeKind::Text && is_xml_whitespace(&self.value)
    }

    /// Find an attribute by local name and namespace.
    pub fn attribute(&self, local_name: &str, namespace_uri: &str) -> Option<&XmlAttribute> {
        self.attributes
            .iter()
            .find(|a| a.name.local_name == local_name && a.name.namespace_uri == namespace_uri)
    }
}

/// XML whitespace is space, tab, carriage return and line feed.
pub fn is_xml_whitespace(text: &str) -> bool {
    text.bytes()
        .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}
