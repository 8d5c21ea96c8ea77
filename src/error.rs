//! Error types for ATOM payload reading.

use thiserror::Error;

use crate::model::ODataError;
use crate::xml::NodeKind;

/// Errors that can occur while reading an ATOM payload.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    /// A relative URI was found but neither `xml:base` nor a document base URI
    /// is in scope.
    #[error("A relative URI value '{0}' was specified in the data, but no base URI was specified for it")]
    RelativeUriWithoutBase(String),

    #[error("The value '{uri}' is not a valid URI: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Encountered an invalid node of type '{0}' inside a string value; only text, CDATA, comments and processing instructions are allowed")]
    InvalidNodeInStringValue(NodeKind),

    #[error("The element '{name}' in namespace '{namespace}' is not a valid root element for this payload")]
    InvalidRootElement { name: String, namespace: String },

    #[error("Multiple '{element}' elements were found in a '{container}' element; only one is allowed")]
    DuplicateSingletonElement { element: String, container: String },

    #[error("Multiple links with the relation '{rel}' were found in a '{container}' element")]
    DuplicateLink { rel: String, container: String },

    #[error("Multiple edit links were found for the stream property '{0}'")]
    DuplicateStreamEditLink(String),

    #[error("Multiple read links were found for the stream property '{0}'")]
    DuplicateStreamReadLink(String),

    #[error("Found a stream property link with an empty name")]
    EmptyStreamPropertyName,

    #[error("Multiple properties with the name '{0}' were found")]
    DuplicatePropertyName(String),

    #[error("The required attribute '{attribute}' is missing on the '{element}' element")]
    MissingAttribute { attribute: String, element: String },

    #[error("The 'type' attribute value '{0}' of a text construct is not one of 'text', 'html' or 'xhtml'")]
    InvalidTextConstructKind(String),

    #[error("The value '{0}' is not a valid ISO 8601 date and time")]
    InvalidDateTime(String),

    #[error("Invalid {what} value '{value}'")]
    InvalidValue { what: &'static str, value: String },

    #[error("Cannot convert the value '{value}' to the primitive type '{type_name}'")]
    InvalidPrimitiveValue { type_name: String, value: String },

    #[error("The service document does not contain a workspace element")]
    MissingWorkspace,

    #[error("The service document contains more than one workspace element")]
    DuplicateWorkspace,

    #[error("The maximum nesting depth of {0} was exceeded")]
    RecursionDepthLimitReached(usize),

    /// A cursor method was called in a state that does not allow it.
    #[error("Invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// The payload contained an `m:error` element where regular content was
    /// expected.
    #[error("An in-stream error was found in the payload: {0}")]
    InStreamError(Box<ODataError>),
}

pub type Result<T> = std::result::Result<T, Error>;
