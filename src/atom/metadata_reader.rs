//! ATOM metadata mapping.
//!
//! Reads the syndication elements of feeds, entries, `source` elements and
//! service documents into the records of [`crate::atom::metadata`]. Only
//! unqualified attributes are interpreted; `m:rel` or `foo:uri` never count as
//! ATOM metadata.

use chrono::{DateTime, FixedOffset};
use log::trace;
use url::Url;

use crate::atom::deserializer::{AtomDeserializer, Ns, SingletonTracker};
use crate::atom::metadata::{
    AtomCategoriesMetadata, AtomCategoryMetadata, AtomEntryMetadata, AtomFeedMetadata,
    AtomGeneratorMetadata, AtomLinkMetadata, AtomPersonMetadata, AtomTextConstruct,
    AtomTextConstructKind,
};
use crate::atom::names::{DELTA_REL, NEXT_REL, SELF_REL, normalize_rel};
use crate::error::{Error, Result};
use crate::uri::resolve_uri;
use crate::xml::TokenSource;

impl<S: TokenSource> AtomDeserializer<S> {
    /// Read a feed-level metadata element (also used for `source`).
    ///
    /// Returns `false` if the element is not feed metadata; the cursor has not
    /// moved in that case.
    pub(crate) fn read_feed_metadata_element(
        &mut self,
        metadata: &mut AtomFeedMetadata,
        singletons: &mut SingletonTracker,
    ) -> Result<bool> {
        if self.ns() != Ns::Atom {
            return Ok(false);
        }
        let local = self.reader.local_name().clone();
        match local.as_str() {
            "author" => metadata.authors.push(self.read_person("author")?),
            "contributor" => metadata.contributors.push(self.read_person("contributor")?),
            "category" => metadata.categories.push(self.read_category()?),
            "generator" => {
                singletons.element("generator")?;
                metadata.generator = Some(self.read_generator()?);
            }
            "icon" => {
                singletons.element("icon")?;
                metadata.icon = Some(self.read_uri_element()?);
            }
            "logo" => {
                singletons.element("logo")?;
                metadata.logo = Some(self.read_uri_element()?);
            }
            "rights" => {
                singletons.element("rights")?;
                metadata.rights = Some(self.read_text_construct()?);
            }
            "subtitle" => {
                singletons.element("subtitle")?;
                metadata.subtitle = Some(self.read_text_construct()?);
            }
            "title" => {
                singletons.element("title")?;
                metadata.title = Some(self.read_text_construct()?);
            }
            "updated" => {
                singletons.element("updated")?;
                metadata.updated = Some(self.read_date_element()?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Read an entry-level metadata element. Same contract as
    /// [`read_feed_metadata_element`](Self::read_feed_metadata_element).
    pub(crate) fn read_entry_metadata_element(
        &mut self,
        metadata: &mut AtomEntryMetadata,
        singletons: &mut SingletonTracker,
    ) -> Result<bool> {
        if self.ns() != Ns::Atom {
            return Ok(false);
        }
        let local = self.reader.local_name().clone();
        match local.as_str() {
            "author" => metadata.authors.push(self.read_person("author")?),
            "contributor" => metadata.contributors.push(self.read_person("contributor")?),
            "category" => metadata.categories.push(self.read_category()?),
            "published" => {
                singletons.element("published")?;
                metadata.published = Some(self.read_date_element()?);
            }
            "rights" => {
                singletons.element("rights")?;
                metadata.rights = Some(self.read_text_construct()?);
            }
            "source" => {
                singletons.element("source")?;
                metadata.source = Some(self.read_source()?);
            }
            "summary" => {
                singletons.element("summary")?;
                metadata.summary = Some(self.read_text_construct()?);
            }
            "title" => {
                singletons.element("title")?;
                metadata.title = Some(self.read_text_construct()?);
            }
            "updated" => {
                singletons.element("updated")?;
                metadata.updated = Some(self.read_date_element()?);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// `atom:source`: feed metadata of the feed an entry was copied from.
    fn read_source(&mut self) -> Result<AtomFeedMetadata> {
        let mut metadata = AtomFeedMetadata::default();
        let mut singletons = SingletonTracker::new("source");
        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                if self.on(&self.names.id, &self.names.atom_ns) {
                    singletons.element("id")?;
                    metadata.source_id = Some(self.reader.read_element_value()?);
                } else if self.on(&self.names.link, &self.names.atom_ns) {
                    self.read_source_link(&mut metadata, &mut singletons)?;
                } else if !self.read_feed_metadata_element(&mut metadata, &mut singletons)? {
                    self.skip_element()?;
                }
            }
        }
        Ok(metadata)
    }

    /// The feed-level link relations are singletons in `source` too.
    fn read_source_link(
        &mut self,
        metadata: &mut AtomFeedMetadata,
        singletons: &mut SingletonTracker,
    ) -> Result<()> {
        let link = self.read_link_metadata()?;
        match link.relation.as_deref().map(normalize_rel) {
            Some(SELF_REL) => {
                singletons.link(SELF_REL)?;
                metadata.self_link = Some(link);
            }
            Some(NEXT_REL) => {
                singletons.link(NEXT_REL)?;
                metadata.next_page_link = Some(link);
            }
            Some(DELTA_REL) => {
                singletons.link(DELTA_REL)?;
                metadata.delta_link = Some(link);
            }
            _ => metadata.links.push(link),
        }
        self.reader.skip()
    }

    /// `title`, `rights`, `subtitle` or `summary`.
    pub(crate) fn read_text_construct(&mut self) -> Result<AtomTextConstruct> {
        let kind = match self.reader.get_attribute("type", "") {
            None | Some("text") => AtomTextConstructKind::Text,
            Some("html") => AtomTextConstructKind::Html,
            Some("xhtml") => AtomTextConstructKind::Xhtml,
            Some(other) => return Err(Error::InvalidTextConstructKind(other.to_string())),
        };
        let text = match kind {
            AtomTextConstructKind::Xhtml => self.reader.read_inner_xml()?,
            _ => self.reader.read_element_value()?,
        };
        Ok(AtomTextConstruct { kind, text })
    }

    /// `author` or `contributor`.
    fn read_person(&mut self, container: &'static str) -> Result<AtomPersonMetadata> {
        let mut person = AtomPersonMetadata::default();
        let mut singletons = SingletonTracker::new(container);
        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                if self.ns() != Ns::Atom {
                    self.skip_element()?;
                    continue;
                }
                let local = self.reader.local_name().clone();
                match local.as_str() {
                    "name" => {
                        singletons.element("name")?;
                        person.name = Some(self.reader.read_element_value()?);
                    }
                    "uri" => {
                        singletons.element("uri")?;
                        person.uri = Some(self.read_uri_element()?);
                    }
                    "email" => {
                        singletons.element("email")?;
                        person.email = Some(self.reader.read_element_value()?);
                    }
                    _ => self.skip_element()?,
                }
            }
        }
        Ok(person)
    }

    /// `category`; the element content is ignored.
    pub(crate) fn read_category(&mut self) -> Result<AtomCategoryMetadata> {
        let category = AtomCategoryMetadata {
            term: self.attribute("term"),
            scheme: self.attribute("scheme"),
            label: self.attribute("label"),
        };
        self.reader.skip()?;
        Ok(category)
    }

    fn read_generator(&mut self) -> Result<AtomGeneratorMetadata> {
        let uri = self.uri_attribute("uri")?;
        let version = self.attribute("version");
        let name = self.reader.read_element_value()?;
        Ok(AtomGeneratorMetadata {
            name: Some(name),
            uri,
            version,
        })
    }

    /// Attributes of a `link` element. The cursor stays on the element.
    pub(crate) fn read_link_metadata(&self) -> Result<AtomLinkMetadata> {
        let length = match self.reader.get_attribute("length", "") {
            Some(value) => Some(value.trim().parse().map_err(|_| Error::InvalidValue {
                what: "link length",
                value: value.to_string(),
            })?),
            None => None,
        };
        Ok(AtomLinkMetadata {
            href: self.uri_attribute("href")?,
            relation: self.attribute("rel"),
            media_type: self.attribute("type"),
            href_lang: self.attribute("hreflang"),
            title: self.attribute("title"),
            length,
        })
    }

    /// Text content holding a URI (`icon`, `logo`, person `uri`).
    fn read_uri_element(&mut self) -> Result<Url> {
        // base of the element itself, not of whatever follows it
        let base = self.reader.resolution_base().cloned();
        let text = self.reader.read_element_value()?;
        resolve_uri(text.trim(), base.as_ref())
    }

    fn read_date_element(&mut self) -> Result<DateTime<FixedOffset>> {
        let text = self.reader.read_element_value()?;
        DateTime::parse_from_rfc3339(text.trim()).map_err(|_| Error::InvalidDateTime(text))
    }

    /// `app:categories` of a service document collection.
    pub(crate) fn read_categories(&mut self) -> Result<AtomCategoriesMetadata> {
        let fixed = match self.reader.get_attribute("fixed", "") {
            None => None,
            Some("yes") => Some(true),
            Some("no") => Some(false),
            Some(other) => {
                return Err(Error::InvalidValue {
                    what: "categories fixed",
                    value: other.to_string(),
                });
            }
        };
        let mut categories = AtomCategoriesMetadata {
            href: self.uri_attribute("href")?,
            fixed,
            scheme: self.attribute("scheme"),
            categories: Vec::new(),
        };
        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                if self.on(&self.names.category, &self.names.atom_ns) {
                    categories.categories.push(self.read_category()?);
                } else {
                    self.skip_element()?;
                }
            }
        }
        trace!("read {} inline categories", categories.categories.len());
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReaderSettings;
    use crate::xml::QuickXmlSource;

    const ATOM: &str = r#"xmlns="http://www.w3.org/2005/Atom""#;

    fn deserializer(xml: &str) -> AtomDeserializer<QuickXmlSource<&[u8]>> {
        let mut d = AtomDeserializer::new(QuickXmlSource::from_str(xml), ReaderSettings::default());
        d.reader.read_payload_start().unwrap();
        d
    }

    #[test]
    fn test_text_construct_kinds() {
        let xml = format!(r#"<title {ATOM} type="html">&lt;b&gt;x</title>"#);
        let mut d = deserializer(&xml);
        let title = d.read_text_construct().unwrap();
        assert_eq!(title.kind, AtomTextConstructKind::Html);
        assert_eq!(title.text, "<b>x");

        let xml = format!(r#"<title {ATOM} type="xhtml"><div>x</div></title>"#);
        let mut d = deserializer(&xml);
        let title = d.read_text_construct().unwrap();
        assert_eq!(title.kind, AtomTextConstructKind::Xhtml);
        assert!(title.text.contains("<div>x</div>"));
    }

    #[test]
    fn test_invalid_text_construct_kind() {
        let xml = format!(r#"<title {ATOM} type="markdown">x</title>"#);
        let mut d = deserializer(&xml);
        assert!(matches!(
            d.read_text_construct(),
            Err(Error::InvalidTextConstructKind(ref k)) if k == "markdown"
        ));
    }

    #[test]
    fn test_link_metadata_ignores_foreign_attributes() {
        let xml = format!(
            r#"<link {ATOM} xmlns:m="http://docs.oasis-open.org/odata/ns/metadata" m:rel="alternate" href="http://x/" length="12"/>"#
        );
        let d = deserializer(&xml);
        let link = d.read_link_metadata().unwrap();
        assert_eq!(link.relation, None);
        assert_eq!(link.href.unwrap().as_str(), "http://x/");
        assert_eq!(link.length, Some(12));
    }

    #[test]
    fn test_link_length_must_be_numeric() {
        let xml = format!(r#"<link {ATOM} href="http://x/" length="big"/>"#);
        let d = deserializer(&xml);
        assert!(matches!(
            d.read_link_metadata(),
            Err(Error::InvalidValue { what: "link length", .. })
        ));
    }

    #[test]
    fn test_source_feed_links() {
        let xml = format!(
            r#"<source {ATOM}><link rel="self" href="http://a/"/><link rel="http://www.iana.org/assignments/relation/next" href="http://a/?p=2"/><link rel="alternate" href="http://a/html"/></source>"#
        );
        let mut d = deserializer(&xml);
        let source = d.read_source().unwrap();
        assert_eq!(source.self_link.unwrap().href.unwrap().as_str(), "http://a/");
        assert_eq!(source.next_page_link.unwrap().href.unwrap().as_str(), "http://a/?p=2");
        assert_eq!(source.links.len(), 1);
    }

    #[test]
    fn test_duplicate_source_self_link() {
        let xml = format!(
            r#"<source {ATOM}><link rel="self" href="http://a/"/><link rel="self" href="http://b/"/></source>"#
        );
        let mut d = deserializer(&xml);
        assert!(matches!(
            d.read_source(),
            Err(Error::DuplicateLink { ref rel, ref container })
                if rel == "self" && container == "source"
        ));
    }

    #[test]
    fn test_person_singletons() {
        let xml = format!("<author {ATOM}><name>a</name><name>b</name></author>");
        let mut d = deserializer(&xml);
        let err = d.read_person("author").unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateSingletonElement { ref element, ref container }
                if element == "name" && container == "author"
        ));
    }

    #[test]
    fn test_person_uri_relative_without_base() {
        let xml = format!("<author {ATOM}><uri>people/1</uri></author>");
        let mut d = deserializer(&xml);
        assert!(matches!(
            d.read_person("author"),
            Err(Error::RelativeUriWithoutBase(ref s)) if s == "people/1"
        ));
    }

    #[test]
    fn test_generator() {
        let xml = format!(r#"<generator {ATOM} uri="http://gen/" version="1.0">Gen</generator>"#);
        let mut d = deserializer(&xml);
        let generator = d.read_generator().unwrap();
        assert_eq!(generator.name.as_deref(), Some("Gen"));
        assert_eq!(generator.version.as_deref(), Some("1.0"));
        assert_eq!(generator.uri.unwrap().as_str(), "http://gen/");
    }

    #[test]
    fn test_invalid_date() {
        let xml = format!("<updated {ATOM}>yesterday</updated>");
        let mut d = deserializer(&xml);
        assert!(matches!(d.read_date_element(), Err(Error::InvalidDateTime(_))));
    }
}
