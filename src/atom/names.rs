//! Protocol constants and the per-reader atomized name registry.

use crate::nametable::{Atom, NameTable};

pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
pub const DATA_NAMESPACE: &str = "http://docs.oasis-open.org/odata/ns/data";
pub const METADATA_NAMESPACE: &str = "http://docs.oasis-open.org/odata/ns/metadata";
pub const APP_NAMESPACE: &str = "http://www.w3.org/2007/app";

/// Category scheme carrying an entry's type name.
pub const ODATA_SCHEME: &str = "http://docs.oasis-open.org/odata/ns/scheme";

pub const RELATED_REL_PREFIX: &str = "http://docs.oasis-open.org/odata/ns/related/";
pub const RELATED_LINKS_REL_PREFIX: &str = "http://docs.oasis-open.org/odata/ns/relatedlinks/";
pub const EDIT_MEDIA_REL_PREFIX: &str = "http://docs.oasis-open.org/odata/ns/edit-media/";
pub const MEDIA_RESOURCE_REL_PREFIX: &str = "http://docs.oasis-open.org/odata/ns/mediaresource/";
pub const DELTA_REL: &str = "http://docs.oasis-open.org/odata/ns/delta";

/// Registered link relations may also be written as IANA URIs.
pub const IANA_REL_PREFIX: &str = "http://www.iana.org/assignments/relation/";

pub const SELF_REL: &str = "self";
pub const NEXT_REL: &str = "next";
pub const EDIT_REL: &str = "edit";
pub const EDIT_MEDIA_REL: &str = "edit-media";

/// Interned namespaces and element names used by the deserializers.
///
/// Built once per reader from the reader's own [`NameTable`], so comparisons
/// against node names are pointer checks in the common case.
#[derive(Debug, Clone)]
pub struct AtomNames {
    pub atom_ns: Atom,
    pub data_ns: Atom,
    pub metadata_ns: Atom,
    pub app_ns: Atom,

    // atom
    pub feed: Atom,
    pub entry: Atom,
    pub id: Atom,
    pub link: Atom,
    pub category: Atom,

    // metadata
    pub properties: Atom,
    pub inline: Atom,
    pub element: Atom,
    pub reference: Atom,
    pub error: Atom,

    // app
    pub service: Atom,
    pub workspace: Atom,
}

impl AtomNames {
    pub fn new(table: &mut NameTable) -> Self {
        Self {
            atom_ns: table.add(ATOM_NAMESPACE),
            data_ns: table.add(DATA_NAMESPACE),
            metadata_ns: table.add(METADATA_NAMESPACE),
            app_ns: table.add(APP_NAMESPACE),

            feed: table.add("feed"),
            entry: table.add("entry"),
            id: table.add("id"),
            link: table.add("link"),
            category: table.add("category"),

            properties: table.add("properties"),
            inline: table.add("inline"),
            element: table.add("element"),
            reference: table.add("ref"),
            error: table.add("error"),

            service: table.add("service"),
            workspace: table.add("workspace"),
        }
    }
}

/// Strip the IANA prefix from registered relation URIs
/// (`http://www.iana.org/assignments/relation/self` is `self`).
pub fn normalize_rel(rel: &str) -> &str {
    match rel.strip_prefix(IANA_REL_PREFIX) {
        Some(short) if !short.is_empty() && !short.contains(['/', ':']) => short,
        _ => rel,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rel() {
        assert_eq!(normalize_rel("self"), "self");
        assert_eq!(normalize_rel("http://www.iana.org/assignments/relation/next"), "next");
        assert_eq!(normalize_rel(IANA_REL_PREFIX), IANA_REL_PREFIX);
        assert_eq!(normalize_rel(DELTA_REL), DELTA_REL);
    }

    #[test]
    fn test_names_share_table_atoms() {
        let mut table = NameTable::new();
        let names = AtomNames::new(&mut table);
        assert!(names.feed.ptr_eq(&table.add("feed")));
        assert!(names.atom_ns.ptr_eq(&table.add(ATOM_NAMESPACE)));
    }
}
