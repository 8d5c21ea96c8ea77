//! Leaf values and element navigation on top of the buffering cursor.

use crate::error::{Error, Result};
use crate::xml::node::NodeKind;
use crate::xml::reader::BufferingXmlReader;
use crate::xml::source::TokenSource;

impl<S: TokenSource> BufferingXmlReader<S> {
    /// Read the string value of the current element and move past it.
    ///
    /// Text and CDATA children are concatenated in document order; comments
    /// and processing instructions are skipped. Any child element is an
    /// error. Whitespace is kept verbatim.
    pub fn read_element_value(&mut self) -> Result<String> {
        self.move_to_element();
        if self.node_kind() != NodeKind::Element {
            return Err(Error::InvalidOperation(
                "element values can only be read from an element",
            ));
        }
        if self.is_empty_element() {
            self.read()?;
            return Ok(String::new());
        }

        let mut value = String::new();
        loop {
            if !self.read()? {
                return Err(unexpected_eof());
            }
            match self.node_kind() {
                NodeKind::Text | NodeKind::CData => value.push_str(self.value()),
                NodeKind::Comment | NodeKind::ProcessingInstruction => {}
                NodeKind::EndElement => {
                    self.read()?;
                    return Ok(value);
                }
                kind => return Err(Error::InvalidNodeInStringValue(kind)),
            }
        }
    }

    /// Move past text, comments and processing instructions until the cursor
    /// is on an element, an end element or the end of the stream.
    pub fn skip_to_element_or_end(&mut self) -> Result<()> {
        self.move_to_element();
        while matches!(
            self.node_kind(),
            NodeKind::Text
                | NodeKind::CData
                | NodeKind::Comment
                | NodeKind::ProcessingInstruction
                | NodeKind::XmlDeclaration
        ) {
            if !self.read()? {
                break;
            }
        }
        Ok(())
    }

    /// Step into the content of the current element.
    ///
    /// Returns `false` for an empty element, in which case the cursor has
    /// already moved past it.
    pub fn enter_element(&mut self) -> Result<bool> {
        self.move_to_element();
        let empty = self.is_empty_element();
        self.read()?;
        Ok(!empty)
    }

    /// Position on the next child element of the element being read.
    ///
    /// Returns `false` once the parent's end element is reached; the end
    /// element is consumed. Each child must be fully consumed by the caller
    /// before asking for the next one.
    pub fn next_child_element(&mut self) -> Result<bool> {
        self.skip_to_element_or_end()?;
        match self.node_kind() {
            NodeKind::Element => Ok(true),
            NodeKind::EndElement => {
                self.read()?;
                Ok(false)
            }
            _ => Err(unexpected_eof()),
        }
    }

    /// Read up to the document's root element.
    pub fn read_payload_start(&mut self) -> Result<()> {
        if !self.read()? {
            return Err(Error::MalformedXml("Root element is missing".to_string()));
        }
        self.skip_to_element_or_end()?;
        if self.node_kind() != NodeKind::Element {
            return Err(Error::MalformedXml("Root element is missing".to_string()));
        }
        Ok(())
    }

    /// Consume whatever follows the root element up to the end of the stream.
    pub fn read_payload_end(&mut self) -> Result<()> {
        self.skip_to_element_or_end()?;
        if !self.eof() {
            return Err(Error::MalformedXml(format!(
                "Unexpected {} node after the root element",
                self.node_kind()
            )));
        }
        Ok(())
    }

    /// Returns true if the cursor is on an element with the given name.
    pub fn is_on_element(&self, local_name: &str, namespace_uri: &str) -> bool {
        self.node_kind() == NodeKind::Element
            && self.local_name() == &local_name
            && self.namespace_uri() == &namespace_uri
    }
}

fn unexpected_eof() -> Error {
    Error::MalformedXml("Unexpected end of file".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReaderSettings;
    use crate::xml::source::QuickXmlSource;

    const M: &str = r#"xmlns:m="http://docs.oasis-open.org/odata/ns/metadata""#;

    fn value_of(xml: &str) -> Result<String> {
        let mut r = BufferingXmlReader::new(QuickXmlSource::from_str(xml), &ReaderSettings::default());
        r.read_payload_start()?;
        r.read_element_value()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(value_of(&format!("<m:value {M}>text</m:value>")).unwrap(), "text");
    }

    #[test]
    fn test_comments_and_pis_skipped() {
        let xml = format!("<m:value {M}><!--c-->text<?pi?></m:value>");
        assert_eq!(value_of(&xml).unwrap(), "text");
    }

    #[test]
    fn test_interior_comment_joins_text() {
        let xml = format!("<m:value {M}>te<!--c-->xt<![CDATA[!]]></m:value>");
        assert_eq!(value_of(&xml).unwrap(), "text!");
    }

    #[test]
    fn test_element_child_fails() {
        let xml = format!("<m:value {M}>text<foo/></m:value>");
        let err = value_of(&xml).unwrap_err();
        assert!(matches!(err, Error::InvalidNodeInStringValue(NodeKind::Element)));
        assert!(err.to_string().contains("Element"));
    }

    #[test]
    fn test_whitespace_kept() {
        let xml = format!("<m:value {M}>  a  </m:value>");
        assert_eq!(value_of(&xml).unwrap(), "  a  ");
    }

    #[test]
    fn test_empty_element() {
        assert_eq!(value_of(&format!("<m:value {M}/>")).unwrap(), "");
        assert_eq!(value_of(&format!("<m:value {M}></m:value>")).unwrap(), "");
    }

    #[test]
    fn test_child_iteration() {
        let xml = "<a> <b/> text <!--x--> <c>1</c> </a>";
        let mut r = BufferingXmlReader::new(QuickXmlSource::from_str(xml), &ReaderSettings::default());
        r.read_payload_start().unwrap();
        let mut seen = Vec::new();
        assert!(r.enter_element().unwrap());
        while r.next_child_element().unwrap() {
            seen.push(r.local_name().to_string());
            r.skip().unwrap();
        }
        assert_eq!(seen, vec!["b", "c"]);
        r.read_payload_end().unwrap();
    }

    #[test]
    fn test_enter_empty_element() {
        let mut r = BufferingXmlReader::new(QuickXmlSource::from_str("<a/>"), &ReaderSettings::default());
        r.read_payload_start().unwrap();
        assert!(!r.enter_element().unwrap());
        assert!(r.eof());
    }
}
