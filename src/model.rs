//! OData object model produced by the readers.
//!
//! These types carry the OData meaning of a payload. ATOM-specific details
//! hang off the `atom` fields and are only filled in when ATOM metadata
//! reading is enabled.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use url::Url;

use crate::atom::metadata::{
    AtomEntryMetadata, AtomFeedMetadata, AtomResourceCollectionMetadata,
    AtomStreamReferenceMetadata, AtomWorkspaceMetadata,
};

/// A feed (collection of entries).
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataFeed {
    pub id: Option<String>,
    pub count: Option<i64>,
    pub next_page_link: Option<Url>,
    pub delta_link: Option<Url>,
    pub entries: Vec<ODataEntry>,
    pub actions: Vec<ODataOperation>,
    pub functions: Vec<ODataOperation>,
    pub atom: Option<AtomFeedMetadata>,
}

/// A single entity.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataEntry {
    pub id: Option<String>,
    pub type_name: Option<String>,
    pub etag: Option<String>,
    pub edit_link: Option<Url>,
    pub read_link: Option<Url>,
    /// Present for media link entries.
    pub media_resource: Option<ODataStreamReferenceValue>,
    /// Regular properties and named streams, in payload order.
    pub properties: Vec<ODataProperty>,
    pub navigation_links: Vec<ODataNavigationLink>,
    pub association_links: Vec<ODataAssociationLink>,
    pub actions: Vec<ODataOperation>,
    pub functions: Vec<ODataOperation>,
    pub atom: Option<AtomEntryMetadata>,
}

impl ODataEntry {
    /// Look up a property (or named stream) by name.
    pub fn property(&self, name: &str) -> Option<&ODataProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn navigation_link(&self, name: &str) -> Option<&ODataNavigationLink> {
        self.navigation_links.iter().find(|l| l.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataProperty {
    pub name: String,
    pub value: ODataValue,
}

impl ODataProperty {
    pub fn new(name: impl Into<String>, value: ODataValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ODataValue {
    Null,
    Primitive(ODataPrimitiveValue),
    Complex(ODataComplexValue),
    Collection(ODataCollectionValue),
    StreamReference(ODataStreamReferenceValue),
}

impl ODataValue {
    pub fn as_primitive(&self) -> Option<&ODataPrimitiveValue> {
        match self {
            ODataValue::Primitive(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_complex(&self) -> Option<&ODataComplexValue> {
        match self {
            ODataValue::Complex(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&ODataCollectionValue> {
        match self {
            ODataValue::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_stream_reference(&self) -> Option<&ODataStreamReferenceValue> {
        match self {
            ODataValue::StreamReference(s) => Some(s),
            _ => None,
        }
    }
}

/// Primitive values, converted according to their `Edm` type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ODataPrimitiveValue {
    String(String),
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Single(f32),
    Double(f64),
    /// Validated decimal literal, kept as text to preserve precision.
    Decimal(String),
    Guid(String),
    DateTimeOffset(DateTime<FixedOffset>),
    Binary(Vec<u8>),
    /// Other `Edm` types (dates, durations, spatial values) as raw text.
    Untyped { type_name: String, text: String },
}

impl ODataPrimitiveValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ODataPrimitiveValue::String(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataComplexValue {
    pub type_name: Option<String>,
    pub properties: Vec<ODataProperty>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataCollectionValue {
    pub type_name: Option<String>,
    pub items: Vec<ODataValue>,
}

/// A named stream or the media resource of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataStreamReferenceValue {
    pub edit_link: Option<Url>,
    pub read_link: Option<Url>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub atom: Option<AtomStreamReferenceMetadata>,
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataNavigationLink {
    pub name: String,
    pub url: Option<Url>,
    /// `Some(true)` for `type=feed`, `Some(false)` for `type=entry`.
    pub is_collection: Option<bool>,
    pub expanded: Option<ODataExpanded>,
}

/// Content of an `m:inline` element.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ODataExpanded {
    Feed(ODataFeed),
    /// `None` for an empty `m:inline` (null entry).
    Entry(Option<Box<ODataEntry>>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataAssociationLink {
    pub name: String,
    pub url: Option<Url>,
}

/// An `m:action` or `m:function` advertised on a feed or entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataOperation {
    pub metadata: Url,
    pub target: Url,
    pub title: Option<String>,
}

/// An error payload (`m:error`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataError {
    pub code: String,
    pub message: String,
    pub target: Option<String>,
    pub inner_error: Option<ODataInnerError>,
}

impl fmt::Display for ODataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code.is_empty(), self.message.is_empty()) {
            (true, _) => f.write_str(&self.message),
            (false, true) => f.write_str(&self.code),
            (false, false) => write!(f, "{}: {}", self.code, self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataInnerError {
    pub message: Option<String>,
    pub type_name: Option<String>,
    pub stack_trace: Option<String>,
    pub internal_exception: Option<Box<ODataInnerError>>,
}

impl ODataInnerError {
    /// Number of errors in this chain, counting this one.
    pub fn depth(&self) -> usize {
        1 + self.internal_exception.as_ref().map_or(0, |e| e.depth())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataServiceDocument {
    pub entity_sets: Vec<ODataServiceDocumentElement>,
    pub function_imports: Vec<ODataServiceDocumentElement>,
    pub singletons: Vec<ODataServiceDocumentElement>,
    pub atom: Option<AtomWorkspaceMetadata>,
}

/// An `app:collection`, `m:function-import` or `m:singleton`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataServiceDocumentElement {
    pub url: Url,
    /// Text of the element's `atom:title`.
    pub name: Option<String>,
    pub atom: Option<AtomResourceCollectionMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataEntityReferenceLink {
    pub url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ODataEntityReferenceLinks {
    pub count: Option<i64>,
    pub next_page_link: Option<Url>,
    pub links: Vec<ODataEntityReferenceLink>,
}
