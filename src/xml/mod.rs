//! XML layer: token sources, the buffering cursor and leaf-value reading.

pub mod base_uri;
pub mod node;
pub mod reader;
pub mod source;
mod value;

pub use base_uri::XmlBaseStack;
pub use node::{Node, NodeKind, QualifiedName, XmlAttribute};
pub use reader::BufferingXmlReader;
pub use source::{QuickXmlSource, TokenSource, XML_NAMESPACE, XMLNS_NAMESPACE};
