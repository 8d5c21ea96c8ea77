//! `m:error` payloads.
//!
//! The same routine reads top-level error payloads and errors the cursor
//! detects in the middle of another payload, so it works on the bare cursor
//! rather than on a deserializer.

use log::debug;

use crate::atom::deserializer::{AtomDeserializer, SingletonTracker};
use crate::atom::names::METADATA_NAMESPACE;
use crate::error::{Error, Result};
use crate::model::{ODataError, ODataInnerError};
use crate::xml::{BufferingXmlReader, TokenSource};

impl<S: TokenSource> AtomDeserializer<S> {
    /// A top-level error payload.
    pub(crate) fn read_error(&mut self) -> Result<ODataError> {
        self.reader.set_detect_in_stream_errors(false);
        let (error, metadata) = (self.names.error.clone(), self.names.metadata_ns.clone());
        self.start_payload(&error, &metadata)?;
        let error = read_error_element(&mut self.reader, self.settings.max_nesting_depth)?;
        self.reader.read_payload_end()?;
        Ok(error)
    }
}

/// Read the `m:error` element under the cursor and move past it.
pub(crate) fn read_error_element<S: TokenSource>(
    reader: &mut BufferingXmlReader<S>,
    max_depth: usize,
) -> Result<ODataError> {
    let mut error = ODataError::default();
    let mut singletons = SingletonTracker::new("error");

    if reader.enter_element()? {
        while reader.next_child_element()? {
            if reader.namespace_uri() != &METADATA_NAMESPACE {
                reader.skip()?;
                continue;
            }
            let local = reader.local_name().clone();
            match local.as_str() {
                "code" => {
                    singletons.element("code")?;
                    error.code = reader.read_element_value()?;
                }
                "message" => {
                    singletons.element("message")?;
                    error.message = reader.read_element_value()?;
                }
                "target" => {
                    singletons.element("target")?;
                    error.target = Some(reader.read_element_value()?);
                }
                "innererror" => {
                    singletons.element("innererror")?;
                    error.inner_error = Some(read_inner_error(reader, "innererror", 1, max_depth)?);
                }
                _ => reader.skip()?,
            }
        }
    }

    debug!("read error '{}'", error.code);
    Ok(error)
}

/// `m:innererror` or a nested `m:internalexception`.
fn read_inner_error<S: TokenSource>(
    reader: &mut BufferingXmlReader<S>,
    container: &'static str,
    depth: usize,
    max_depth: usize,
) -> Result<ODataInnerError> {
    if depth > max_depth {
        return Err(Error::RecursionDepthLimitReached(max_depth));
    }

    let mut inner = ODataInnerError::default();
    let mut singletons = SingletonTracker::new(container);

    if reader.enter_element()? {
        while reader.next_child_element()? {
            if reader.namespace_uri() != &METADATA_NAMESPACE {
                reader.skip()?;
                continue;
            }
            let local = reader.local_name().clone();
            match local.as_str() {
                "message" => {
                    singletons.element("message")?;
                    inner.message = Some(reader.read_element_value()?);
                }
                "type" => {
                    singletons.element("type")?;
                    inner.type_name = Some(reader.read_element_value()?);
                }
                "stacktrace" => {
                    singletons.element("stacktrace")?;
                    inner.stack_trace = Some(reader.read_element_value()?);
                }
                "internalexception" => {
                    singletons.element("internalexception")?;
                    let nested = read_inner_error(reader, "internalexception", depth + 1, max_depth)?;
                    inner.internal_exception = Some(Box::new(nested));
                }
                _ => reader.skip()?,
            }
        }
    }

    Ok(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReaderSettings;
    use crate::xml::QuickXmlSource;

    fn read(xml: &str, max_depth: usize) -> Result<ODataError> {
        let settings = ReaderSettings::new().with_detect_in_stream_errors(false);
        let mut reader = BufferingXmlReader::new(QuickXmlSource::from_str(xml), &settings);
        reader.read_payload_start()?;
        read_error_element(&mut reader, max_depth)
    }

    const M: &str = r#"xmlns:m="http://docs.oasis-open.org/odata/ns/metadata""#;

    #[test]
    fn test_read_error() {
        let xml = format!(
            "<m:error {M}><m:code>400</m:code><m:message>bad</m:message><m:target>Name</m:target></m:error>"
        );
        let error = read(&xml, 10).unwrap();
        assert_eq!(error.code, "400");
        assert_eq!(error.message, "bad");
        assert_eq!(error.target.as_deref(), Some("Name"));
        assert_eq!(error.to_string(), "400: bad");
    }

    #[test]
    fn test_duplicate_code() {
        let xml = format!("<m:error {M}><m:code>1</m:code><m:code>2</m:code></m:error>");
        assert!(matches!(
            read(&xml, 10),
            Err(Error::DuplicateSingletonElement { ref element, ref container })
                if element == "code" && container == "error"
        ));
    }

    #[test]
    fn test_inner_error_chain() {
        let xml = format!(
            "<m:error {M}><m:innererror><m:message>outer</m:message>\
             <m:internalexception><m:type>T</m:type><m:stacktrace>at x</m:stacktrace></m:internalexception>\
             </m:innererror></m:error>"
        );
        let error = read(&xml, 10).unwrap();
        let inner = error.inner_error.unwrap();
        assert_eq!(inner.message.as_deref(), Some("outer"));
        assert_eq!(inner.depth(), 2);
        let nested = inner.internal_exception.unwrap();
        assert_eq!(nested.type_name.as_deref(), Some("T"));
        assert_eq!(nested.stack_trace.as_deref(), Some("at x"));
    }

    #[test]
    fn test_inner_error_depth_limit() {
        let xml = format!(
            "<m:error {M}><m:innererror><m:internalexception><m:internalexception/>\
             </m:internalexception></m:innererror></m:error>"
        );
        assert!(read(&xml, 3).is_ok());
        assert!(matches!(read(&xml, 2), Err(Error::RecursionDepthLimitReached(2))));
    }

    #[test]
    fn test_message_with_markup_fails() {
        let xml = format!("<m:error {M}><m:message>a<b/></m:message></m:error>");
        assert!(matches!(read(&xml, 10), Err(Error::InvalidNodeInStringValue(_))));
    }
}
