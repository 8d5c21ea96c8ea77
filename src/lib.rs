//! # odata-atom
//!
//! A reader for OData payloads in the ATOM/XML format.
//!
//! ## Features
//!
//! - Feeds, entries, top-level properties, errors, service documents and
//!   entity reference links
//! - `xml:base` resolution for every URI in a payload
//! - A buffering XML cursor with look-ahead and replay
//! - Strict validation: duplicate singleton elements, duplicate links,
//!   property name collisions and markup inside leaf values are errors
//! - Optional ATOM metadata (authors, categories, links, text constructs)
//!
//! ## Quick Start
//!
//! ```
//! use odata_atom::{AtomReader, ReaderSettings};
//! use url::Url;
//!
//! let payload = r#"<feed xmlns="http://www.w3.org/2005/Atom"
//!       xmlns:m="http://docs.oasis-open.org/odata/ns/metadata"
//!       xmlns:d="http://docs.oasis-open.org/odata/ns/data">
//!   <id>http://odata.org/service/Products</id>
//!   <entry>
//!     <id>http://odata.org/service/Products(1)</id>
//!     <link rel="edit" href="Products(1)"/>
//!     <content type="application/xml">
//!       <m:properties><d:Name>Bread</d:Name></m:properties>
//!     </content>
//!   </entry>
//! </feed>"#;
//!
//! let settings = ReaderSettings::new()
//!     .with_base_uri(Url::parse("http://odata.org/service/").unwrap());
//! let feed = AtomReader::from_str(payload, settings).read_feed().unwrap();
//!
//! let entry = &feed.entries[0];
//! assert_eq!(entry.edit_link.as_ref().unwrap().as_str(), "http://odata.org/service/Products(1)");
//! assert!(entry.property("Name").is_some());
//! ```
//!
//! ## Working with the cursor
//!
//! The [`BufferingXmlReader`] is usable on its own:
//!
//! ```
//! use odata_atom::{BufferingXmlReader, QuickXmlSource, ReaderSettings};
//!
//! let mut reader = BufferingXmlReader::new(
//!     QuickXmlSource::from_str("<a><b/><c/></a>"),
//!     &ReaderSettings::default(),
//! );
//! reader.read().unwrap();
//! reader.start_buffering().unwrap();
//! reader.read().unwrap();
//! assert_eq!(reader.local_name(), &"b");
//! reader.stop_buffering().unwrap();
//! assert_eq!(reader.local_name(), &"a");
//! reader.read().unwrap();
//! assert_eq!(reader.local_name(), &"b");
//! ```

pub mod atom;
pub mod error;
pub mod model;
pub mod nametable;
pub mod settings;
pub mod uri;
pub(crate) mod util;
pub mod xml;

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::atom::deserializer::AtomDeserializer;

pub use error::{Error, Result};
pub use model::{
    ODataAssociationLink, ODataCollectionValue, ODataComplexValue, ODataEntityReferenceLink,
    ODataEntityReferenceLinks, ODataEntry, ODataError, ODataExpanded, ODataFeed, ODataInnerError,
    ODataNavigationLink, ODataOperation, ODataPrimitiveValue, ODataProperty,
    ODataServiceDocument, ODataServiceDocumentElement, ODataStreamReferenceValue, ODataValue,
};
pub use nametable::{Atom, NameTable};
pub use settings::ReaderSettings;
pub use uri::UriRef;
pub use util::decode_payload;
pub use xml::{BufferingXmlReader, NodeKind, QuickXmlSource, TokenSource};

/// Reads one ATOM payload.
///
/// Each `read_*` method consumes the reader: a payload is read exactly once.
pub struct AtomReader<S: TokenSource> {
    deserializer: AtomDeserializer<S>,
}

impl<'a> AtomReader<QuickXmlSource<&'a [u8]>> {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(payload: &'a str, settings: ReaderSettings) -> Self {
        Self::new(QuickXmlSource::from_str(payload), settings)
    }
}

impl<R: BufRead> AtomReader<QuickXmlSource<R>> {
    /// Read a UTF-8 payload from `reader`.
    pub fn from_reader(reader: R, settings: ReaderSettings) -> Self {
        Self::new(QuickXmlSource::from_reader(reader), settings)
    }
}

impl<S: TokenSource> AtomReader<S> {
    pub fn new(source: S, settings: ReaderSettings) -> Self {
        Self {
            deserializer: AtomDeserializer::new(source, settings),
        }
    }

    pub fn read_feed(mut self) -> Result<ODataFeed> {
        self.deserializer.read_feed()
    }

    pub fn read_entry(mut self) -> Result<ODataEntry> {
        self.deserializer.read_entry()
    }

    /// Read a top-level property (`<m:value>` or a single `d:` element).
    pub fn read_property(mut self) -> Result<ODataProperty> {
        self.deserializer.read_top_level_property()
    }

    /// Read an `m:error` payload. In-stream error detection is turned off.
    pub fn read_error(mut self) -> Result<ODataError> {
        self.deserializer.read_error()
    }

    pub fn read_service_document(mut self) -> Result<ODataServiceDocument> {
        self.deserializer.read_service_document()
    }

    pub fn read_entity_reference_link(mut self) -> Result<ODataEntityReferenceLink> {
        self.deserializer.read_entity_reference_link()
    }

    pub fn read_entity_reference_links(mut self) -> Result<ODataEntityReferenceLinks> {
        self.deserializer.read_entity_reference_links()
    }
}

/// Read a feed from a file.
///
/// # Example
///
/// ```no_run
/// use odata_atom::{read_feed, ReaderSettings};
///
/// let feed = read_feed("products.xml", &ReaderSettings::default()).unwrap();
/// println!("{} entries", feed.entries.len());
/// ```
pub fn read_feed<P: AsRef<Path>>(path: P, settings: &ReaderSettings) -> Result<ODataFeed> {
    read_feed_from_reader(BufReader::new(File::open(path)?), settings)
}

/// Read a feed from any byte source, honoring its declared encoding.
pub fn read_feed_from_reader<R: Read>(reader: R, settings: &ReaderSettings) -> Result<ODataFeed> {
    let payload = read_payload(reader)?;
    let text = decode_payload(&payload)?;
    AtomReader::from_str(&text, settings.clone()).read_feed()
}

/// Read an entry from a file.
pub fn read_entry<P: AsRef<Path>>(path: P, settings: &ReaderSettings) -> Result<ODataEntry> {
    read_entry_from_reader(BufReader::new(File::open(path)?), settings)
}

pub fn read_entry_from_reader<R: Read>(reader: R, settings: &ReaderSettings) -> Result<ODataEntry> {
    let payload = read_payload(reader)?;
    let text = decode_payload(&payload)?;
    AtomReader::from_str(&text, settings.clone()).read_entry()
}

/// Read a service document from a file.
pub fn read_service_document<P: AsRef<Path>>(
    path: P,
    settings: &ReaderSettings,
) -> Result<ODataServiceDocument> {
    read_service_document_from_reader(BufReader::new(File::open(path)?), settings)
}

pub fn read_service_document_from_reader<R: Read>(
    reader: R,
    settings: &ReaderSettings,
) -> Result<ODataServiceDocument> {
    let payload = read_payload(reader)?;
    let text = decode_payload(&payload)?;
    AtomReader::from_str(&text, settings.clone()).read_service_document()
}

fn read_payload<R: Read>(mut reader: R) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    reader.read_to_end(&mut payload)?;
    Ok(payload)
}
