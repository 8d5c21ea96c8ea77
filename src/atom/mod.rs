//! OData ATOM payload deserialization.
//!
//! Each payload kind has its own module adding an `impl` block to the shared
//! deserializer; the public surface is the [`AtomReader`](crate::AtomReader)
//! facade.

pub(crate) mod deserializer;
mod entity_reference;
mod entry;
pub(crate) mod error_reader;
pub mod metadata;
mod metadata_reader;
pub mod names;
mod properties;
mod service_document;

pub use metadata::{
    AtomCategoriesMetadata, AtomCategoryMetadata, AtomEntryMetadata, AtomFeedMetadata,
    AtomGeneratorMetadata, AtomLinkMetadata, AtomPersonMetadata, AtomResourceCollectionMetadata,
    AtomStreamReferenceMetadata, AtomTextConstruct, AtomTextConstructKind, AtomWorkspaceMetadata,
};
pub use names::AtomNames;
pub use properties::parse_primitive;
