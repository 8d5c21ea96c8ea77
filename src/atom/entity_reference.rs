//! Entity reference links (`m:ref`).

use crate::atom::deserializer::{AtomDeserializer, Ns, SingletonTracker};
use crate::atom::names::{NEXT_REL, normalize_rel};
use crate::error::Result;
use crate::model::{ODataEntityReferenceLink, ODataEntityReferenceLinks};
use crate::xml::TokenSource;

impl<S: TokenSource> AtomDeserializer<S> {
    /// A single `<m:ref id="..."/>` payload.
    pub(crate) fn read_entity_reference_link(&mut self) -> Result<ODataEntityReferenceLink> {
        let (reference, metadata) = (self.names.reference.clone(), self.names.metadata_ns.clone());
        self.start_payload(&reference, &metadata)?;
        let link = self.read_reference_element()?;
        self.reader.read_payload_end()?;
        Ok(link)
    }

    /// A feed of `m:ref` elements with optional count and next link.
    pub(crate) fn read_entity_reference_links(&mut self) -> Result<ODataEntityReferenceLinks> {
        let (feed, atom) = (self.names.feed.clone(), self.names.atom_ns.clone());
        self.start_payload(&feed, &atom)?;

        let mut links = ODataEntityReferenceLinks::default();
        let mut singletons = SingletonTracker::new("feed");
        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                let local = self.reader.local_name().clone();
                match (self.ns(), local.as_str()) {
                    (Ns::Metadata, "ref") => links.links.push(self.read_reference_element()?),
                    (Ns::Metadata, "count") => {
                        singletons.element("count")?;
                        links.count = Some(self.read_count()?);
                    }
                    (Ns::Atom, "link")
                        if self.reader.get_attribute("rel", "").map(normalize_rel) == Some(NEXT_REL) =>
                    {
                        singletons.link(NEXT_REL)?;
                        links.next_page_link = self.uri_attribute("href")?;
                        self.reader.skip()?;
                    }
                    _ => self.skip_element()?,
                }
            }
        }

        self.reader.read_payload_end()?;
        Ok(links)
    }

    fn read_reference_element(&mut self) -> Result<ODataEntityReferenceLink> {
        let id = self.required_attribute("id", "m:ref")?;
        let url = self.process_uri(&id)?;
        self.reader.skip()?;
        Ok(ODataEntityReferenceLink { url })
    }
}
