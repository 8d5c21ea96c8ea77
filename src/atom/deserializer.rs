//! Shared deserializer core.
//!
//! [`AtomDeserializer`] owns the buffering cursor for one payload and carries
//! the helpers every payload kind needs: root checks, URI processing, required
//! attributes and duplicate tracking. The readers for the individual payload
//! kinds live in sibling modules as further `impl` blocks.

use log::trace;
use url::Url;

use crate::atom::names::AtomNames;
use crate::error::{Error, Result};
use crate::nametable::Atom;
use crate::settings::ReaderSettings;
use crate::uri::resolve_uri;
use crate::xml::{BufferingXmlReader, NodeKind, TokenSource};

/// Namespace of the element under the cursor, as far as ATOM reading cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ns {
    Atom,
    Data,
    Metadata,
    App,
    Other,
}

pub(crate) struct AtomDeserializer<S: TokenSource> {
    pub(crate) reader: BufferingXmlReader<S>,
    pub(crate) names: AtomNames,
    pub(crate) settings: ReaderSettings,
}

impl<S: TokenSource> AtomDeserializer<S> {
    pub(crate) fn new(source: S, settings: ReaderSettings) -> Self {
        let mut reader = BufferingXmlReader::new(source, &settings);
        let names = AtomNames::new(reader.name_table_mut());
        Self {
            reader,
            names,
            settings,
        }
    }

    pub(crate) fn read_metadata(&self) -> bool {
        self.settings.enable_atom_metadata_reading
    }

    /// Classify the namespace of the current node.
    pub(crate) fn ns(&self) -> Ns {
        let ns = self.reader.namespace_uri();
        if *ns == self.names.atom_ns {
            Ns::Atom
        } else if *ns == self.names.metadata_ns {
            Ns::Metadata
        } else if *ns == self.names.data_ns {
            Ns::Data
        } else if *ns == self.names.app_ns {
            Ns::App
        } else {
            Ns::Other
        }
    }

    /// Returns true if the cursor is on the element `local_name` in `namespace`.
    pub(crate) fn on(&self, local_name: &Atom, namespace: &Atom) -> bool {
        self.reader.node_kind() == NodeKind::Element
            && self.reader.node().name.is(local_name, namespace)
    }

    /// Read to the root element and check its name.
    pub(crate) fn start_payload(&mut self, local_name: &Atom, namespace: &Atom) -> Result<()> {
        self.reader.read_payload_start()?;
        if !self.on(local_name, namespace) {
            return Err(Error::InvalidRootElement {
                name: self.reader.local_name().to_string(),
                namespace: self.reader.namespace_uri().to_string(),
            });
        }
        Ok(())
    }

    /// Make a payload URI absolute against the base in effect for the current
    /// node.
    pub(crate) fn process_uri(&self, value: &str) -> Result<Url> {
        resolve_uri(value, self.reader.resolution_base())
    }

    /// Unqualified attribute of the current element.
    pub(crate) fn attribute(&self, local_name: &str) -> Option<String> {
        self.reader.get_attribute(local_name, "").map(str::to_string)
    }

    /// Attribute of the current element in the metadata namespace.
    pub(crate) fn metadata_attribute(&self, local_name: &str) -> Option<String> {
        self.reader
            .get_attribute(local_name, &self.names.metadata_ns)
            .map(str::to_string)
    }

    pub(crate) fn required_attribute(&self, local_name: &str, element: &str) -> Result<String> {
        self.attribute(local_name).ok_or_else(|| Error::MissingAttribute {
            attribute: local_name.to_string(),
            element: element.to_string(),
        })
    }

    /// Resolve an optional unqualified URI attribute.
    pub(crate) fn uri_attribute(&self, local_name: &str) -> Result<Option<Url>> {
        self.reader
            .get_attribute(local_name, "")
            .map(|value| self.process_uri(value))
            .transpose()
    }

    pub(crate) fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > self.settings.max_nesting_depth {
            return Err(Error::RecursionDepthLimitReached(
                self.settings.max_nesting_depth,
            ));
        }
        Ok(())
    }

    /// Skip an element this reader has no use for.
    pub(crate) fn skip_element(&mut self) -> Result<()> {
        trace!("skipping {}", self.reader.name().qualified());
        self.reader.skip()
    }

    /// Read an `m:count` style value.
    pub(crate) fn read_count(&mut self) -> Result<i64> {
        let text = self.reader.read_element_value()?;
        text.trim().parse().map_err(|_| Error::InvalidValue {
            what: "count",
            value: text,
        })
    }
}

/// Tracks elements and links that may appear at most once in a container.
#[derive(Debug)]
pub(crate) struct SingletonTracker {
    container: &'static str,
    elements: Vec<&'static str>,
    links: Vec<&'static str>,
}

impl SingletonTracker {
    pub(crate) fn new(container: &'static str) -> Self {
        Self {
            container,
            elements: Vec::new(),
            links: Vec::new(),
        }
    }

    pub(crate) fn element(&mut self, element: &'static str) -> Result<()> {
        if self.elements.contains(&element) {
            return Err(Error::DuplicateSingletonElement {
                element: element.to_string(),
                container: self.container.to_string(),
            });
        }
        self.elements.push(element);
        Ok(())
    }

    pub(crate) fn link(&mut self, rel: &'static str) -> Result<()> {
        if self.links.contains(&rel) {
            return Err(Error::DuplicateLink {
                rel: rel.to_string(),
                container: self.container.to_string(),
            });
        }
        self.links.push(rel);
        Ok(())
    }
}

/// How a name is used among the properties of one entry or complex value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PropertyUse {
    Property,
    Stream,
    Navigation,
    Association,
}

#[derive(Debug, Default, Clone, Copy)]
struct Uses {
    property: bool,
    stream: bool,
    navigation: bool,
    association: bool,
}

/// Property name uniqueness.
///
/// A name may be shared by one navigation link and one association link;
/// every other combination is a duplicate.
#[derive(Debug, Default)]
pub(crate) struct PropertyNames {
    seen: Vec<(String, Uses)>,
}

impl PropertyNames {
    pub(crate) fn add(&mut self, name: &str, usage: PropertyUse) -> Result<()> {
        let index = match self.seen.iter().position(|(n, _)| n == name) {
            Some(index) => index,
            None => {
                self.seen.push((name.to_string(), Uses::default()));
                self.seen.len() - 1
            }
        };
        let uses = &mut self.seen[index].1;
        let conflict = match usage {
            PropertyUse::Property | PropertyUse::Stream => {
                uses.property || uses.stream || uses.navigation || uses.association
            }
            PropertyUse::Navigation => uses.property || uses.stream || uses.navigation,
            PropertyUse::Association => uses.property || uses.stream || uses.association,
        };
        if conflict {
            return Err(Error::DuplicatePropertyName(name.to_string()));
        }
        match usage {
            PropertyUse::Property => uses.property = true,
            PropertyUse::Stream => uses.stream = true,
            PropertyUse::Navigation => uses.navigation = true,
            PropertyUse::Association => uses.association = true,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_tracker() {
        let mut s = SingletonTracker::new("feed");
        s.element("generator").unwrap();
        s.element("icon").unwrap();
        let err = s.element("generator").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Multiple 'generator' elements were found in a 'feed' element; only one is allowed"
        );
        s.link("self").unwrap();
        assert!(matches!(s.link("self"), Err(Error::DuplicateLink { ref rel, .. }) if rel == "self"));
    }

    #[test]
    fn test_navigation_and_association_share_name() {
        let mut names = PropertyNames::default();
        names.add("Orders", PropertyUse::Navigation).unwrap();
        names.add("Orders", PropertyUse::Association).unwrap();
        assert!(names.add("Orders", PropertyUse::Navigation).is_err());
        assert!(names.add("Orders", PropertyUse::Property).is_err());
    }

    #[test]
    fn test_stream_collides_with_property() {
        let mut names = PropertyNames::default();
        names.add("Photo", PropertyUse::Property).unwrap();
        let err = names.add("Photo", PropertyUse::Stream).unwrap_err();
        assert!(matches!(err, Error::DuplicatePropertyName(ref n) if n == "Photo"));
    }
}
