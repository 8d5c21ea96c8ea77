//! `xml:base` scope tracking.
//!
//! One frame per open element holds the base URI in effect inside that element.
//! A frame is pushed when an element start is reported and dropped once the
//! cursor moves past the element's end (or past the element itself when it is
//! empty), restoring the parent's base.

use log::trace;
use url::Url;

use crate::error::Result;
use crate::uri::UriRef;

#[derive(Debug, Clone)]
struct Frame {
    depth: usize,
    base: Option<Url>,
}

/// Stack of effective base URIs, one frame per open element.
#[derive(Debug, Clone)]
pub struct XmlBaseStack {
    frames: Vec<Frame>,
    document_base: Option<Url>,
    disabled: bool,
}

impl XmlBaseStack {
    /// Create a stack. `document_base` is used when a relative `xml:base` has
    /// no absolute ancestor; `disabled` turns off all `xml:base` processing.
    pub fn new(document_base: Option<Url>, disabled: bool) -> Self {
        Self {
            frames: Vec::new(),
            document_base,
            disabled,
        }
    }

    /// Drop frames of elements that are closed once the cursor stands on a
    /// node at `depth`. An end element keeps its own frame.
    pub fn leave(&mut self, depth: usize, is_end_element: bool) {
        while let Some(top) = self.frames.last() {
            let closed = if is_end_element {
                top.depth > depth
            } else {
                top.depth >= depth
            };
            if !closed {
                break;
            }
            self.frames.pop();
        }
    }

    /// Push the frame of an element at `depth` with an optional `xml:base`
    /// attribute value.
    pub fn enter(&mut self, depth: usize, xml_base: Option<&str>) -> Result<()> {
        let inherited = self.current().cloned();
        let base = match xml_base {
            Some(value) if !self.disabled => {
                let base = match UriRef::parse(value)? {
                    UriRef::Absolute(url) => url,
                    relative => {
                        let context = inherited.as_ref().or(self.document_base.as_ref());
                        relative.resolve(context)?
                    }
                };
                trace!("xml:base at depth {} is {}", depth, base);
                Some(base)
            }
            _ => inherited,
        };
        self.frames.push(Frame { depth, base });
        Ok(())
    }

    /// Base URI established by `xml:base` attributes for the innermost frame.
    pub fn current(&self) -> Option<&Url> {
        if self.disabled {
            return None;
        }
        self.frames.last().and_then(|f| f.base.as_ref())
    }

    /// The document base URI supplied at construction.
    pub fn document_base(&self) -> Option<&Url> {
        self.document_base.as_ref()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_inherit_without_attribute() {
        let mut stack = XmlBaseStack::new(None, false);
        stack.enter(0, Some("http://odata.org/")).unwrap();
        stack.enter(1, None).unwrap();
        assert_eq!(stack.current(), Some(&url("http://odata.org/")));
    }

    #[test]
    fn test_relative_resolves_against_parent() {
        let mut stack = XmlBaseStack::new(None, false);
        stack.enter(0, Some("http://odata.org/service/")).unwrap();
        stack.enter(1, Some("sub/")).unwrap();
        assert_eq!(stack.current(), Some(&url("http://odata.org/service/sub/")));
    }

    #[test]
    fn test_relative_resolves_against_document_base() {
        let mut stack = XmlBaseStack::new(Some(url("http://doc.org/root/")), false);
        stack.enter(0, Some("feed/")).unwrap();
        assert_eq!(stack.current(), Some(&url("http://doc.org/root/feed/")));
    }

    #[test]
    fn test_relative_without_base_fails() {
        let mut stack = XmlBaseStack::new(None, false);
        let err = stack.enter(0, Some("relative/")).unwrap_err();
        assert!(matches!(err, Error::RelativeUriWithoutBase(ref s) if s == "relative/"));
    }

    #[test]
    fn test_empty_value_without_base_fails() {
        let mut stack = XmlBaseStack::new(None, false);
        let err = stack.enter(0, Some("")).unwrap_err();
        assert!(matches!(err, Error::RelativeUriWithoutBase(ref s) if s.is_empty()));
    }

    #[test]
    fn test_leave_restores_parent() {
        let mut stack = XmlBaseStack::new(None, false);
        stack.enter(0, Some("http://a.org/")).unwrap();
        stack.enter(1, Some("http://b.org/")).unwrap();
        // end element of the child keeps its frame
        stack.leave(1, true);
        assert_eq!(stack.current(), Some(&url("http://b.org/")));
        // the parent's end element pops it
        stack.leave(0, true);
        assert_eq!(stack.current(), Some(&url("http://a.org/")));
        // a following sibling of the root level
        stack.leave(0, false);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_disabled_ignores_attribute() {
        let mut stack = XmlBaseStack::new(None, true);
        stack.enter(0, Some("relative/")).unwrap();
        assert_eq!(stack.current(), None);
    }
}
