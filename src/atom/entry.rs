//! Feeds and entries.
//!
//! Covers the OData meaning of `atom:link` relations (edit and read links,
//! media resources, navigation and association links, named streams), inline
//! expansion and advertised operations. Syndication metadata is delegated to
//! the metadata mapper.

use log::{debug, trace};
use percent_encoding::percent_decode_str;

use crate::atom::deserializer::{AtomDeserializer, Ns, PropertyNames, PropertyUse, SingletonTracker};
use crate::atom::metadata::{AtomEntryMetadata, AtomFeedMetadata, AtomLinkMetadata};
use crate::atom::names::{
    DELTA_REL, EDIT_MEDIA_REL, EDIT_MEDIA_REL_PREFIX, EDIT_REL, MEDIA_RESOURCE_REL_PREFIX, NEXT_REL,
    ODATA_SCHEME, RELATED_LINKS_REL_PREFIX, RELATED_REL_PREFIX, SELF_REL, normalize_rel,
};
use crate::error::{Error, Result};
use crate::model::{
    ODataAssociationLink, ODataEntry, ODataExpanded, ODataFeed, ODataNavigationLink,
    ODataOperation, ODataProperty, ODataStreamReferenceValue, ODataValue,
};
use crate::xml::{NodeKind, TokenSource};

/// Role of an `atom:link` inside an entry, decided by its `rel`.
#[derive(Debug, PartialEq, Eq)]
enum EntryLink<'a> {
    Edit,
    Read,
    EditMedia,
    Navigation(&'a str),
    Association(&'a str),
    StreamEdit(&'a str),
    StreamRead(&'a str),
    Other,
}

impl<'a> EntryLink<'a> {
    fn classify(rel: &'a str) -> EntryLink<'a> {
        match normalize_rel(rel) {
            EDIT_REL => EntryLink::Edit,
            SELF_REL => EntryLink::Read,
            EDIT_MEDIA_REL => EntryLink::EditMedia,
            rel => {
                if let Some(name) = rel.strip_prefix(RELATED_REL_PREFIX)
                    && !name.is_empty()
                {
                    EntryLink::Navigation(name)
                } else if let Some(name) = rel.strip_prefix(RELATED_LINKS_REL_PREFIX)
                    && !name.is_empty()
                {
                    EntryLink::Association(name)
                } else if let Some(name) = rel.strip_prefix(EDIT_MEDIA_REL_PREFIX) {
                    EntryLink::StreamEdit(name)
                } else if let Some(name) = rel.strip_prefix(MEDIA_RESOURCE_REL_PREFIX) {
                    EntryLink::StreamRead(name)
                } else {
                    EntryLink::Other
                }
            }
        }
    }
}

/// Per-entry reading state.
struct EntryState {
    entry: ODataEntry,
    metadata: AtomEntryMetadata,
    singletons: SingletonTracker,
    names: PropertyNames,
}

impl<S: TokenSource> AtomDeserializer<S> {
    /// A feed payload.
    pub(crate) fn read_feed(&mut self) -> Result<ODataFeed> {
        let (feed, atom) = (self.names.feed.clone(), self.names.atom_ns.clone());
        self.start_payload(&feed, &atom)?;
        let feed = self.read_feed_element(0)?;
        self.reader.read_payload_end()?;
        Ok(feed)
    }

    /// An entry payload.
    pub(crate) fn read_entry(&mut self) -> Result<ODataEntry> {
        let (entry, atom) = (self.names.entry.clone(), self.names.atom_ns.clone());
        self.start_payload(&entry, &atom)?;
        let entry = self.read_entry_element(0)?;
        self.reader.read_payload_end()?;
        Ok(entry)
    }

    /// Read the `atom:feed` element under the cursor.
    pub(crate) fn read_feed_element(&mut self, depth: usize) -> Result<ODataFeed> {
        self.check_depth(depth)?;
        let mut feed = ODataFeed::default();
        let mut metadata = AtomFeedMetadata::default();
        let mut singletons = SingletonTracker::new("feed");

        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                match self.ns() {
                    Ns::Atom => {
                        let local = self.reader.local_name().clone();
                        match local.as_str() {
                            "entry" => feed.entries.push(self.read_entry_element(depth)?),
                            "id" => {
                                singletons.element("id")?;
                                feed.id = Some(self.reader.read_element_value()?);
                            }
                            "link" => self.read_feed_link(&mut feed, &mut metadata, &mut singletons)?,
                            _ if self.read_metadata() => {
                                if !self.read_feed_metadata_element(&mut metadata, &mut singletons)? {
                                    self.skip_element()?;
                                }
                            }
                            _ => self.skip_element()?,
                        }
                    }
                    Ns::Metadata => {
                        let local = self.reader.local_name().clone();
                        match local.as_str() {
                            "count" => {
                                singletons.element("count")?;
                                feed.count = Some(self.read_count()?);
                            }
                            "action" => feed.actions.push(self.read_operation("m:action")?),
                            "function" => feed.functions.push(self.read_operation("m:function")?),
                            _ => self.skip_element()?,
                        }
                    }
                    _ => self.skip_element()?,
                }
            }
        }

        if self.read_metadata() {
            feed.atom = Some(metadata);
        }
        debug!("read feed with {} entries", feed.entries.len());
        Ok(feed)
    }

    fn read_feed_link(
        &mut self,
        feed: &mut ODataFeed,
        metadata: &mut AtomFeedMetadata,
        singletons: &mut SingletonTracker,
    ) -> Result<()> {
        let rel = self.attribute("rel");
        match rel.as_deref().map(normalize_rel) {
            Some(SELF_REL) => {
                singletons.link(SELF_REL)?;
                if self.read_metadata() {
                    metadata.self_link = Some(self.read_link_metadata()?);
                }
            }
            Some(NEXT_REL) => {
                singletons.link(NEXT_REL)?;
                feed.next_page_link = self.uri_attribute("href")?;
                if self.read_metadata() {
                    metadata.next_page_link = Some(self.read_link_metadata()?);
                }
            }
            Some(DELTA_REL) => {
                singletons.link(DELTA_REL)?;
                feed.delta_link = self.uri_attribute("href")?;
                if self.read_metadata() {
                    metadata.delta_link = Some(self.read_link_metadata()?);
                }
            }
            _ => {
                if self.read_metadata() {
                    metadata.links.push(self.read_link_metadata()?);
                } else {
                    trace!("ignoring non-OData link {rel:?}");
                }
            }
        }
        self.reader.skip()
    }

    /// Read the `atom:entry` element under the cursor.
    pub(crate) fn read_entry_element(&mut self, depth: usize) -> Result<ODataEntry> {
        self.check_depth(depth)?;
        let mut state = EntryState {
            entry: ODataEntry {
                etag: self.metadata_attribute("etag"),
                type_name: self.read_entry_type_name()?,
                ..Default::default()
            },
            metadata: AtomEntryMetadata::default(),
            singletons: SingletonTracker::new("entry"),
            names: PropertyNames::default(),
        };

        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                match self.ns() {
                    Ns::Atom => {
                        let local = self.reader.local_name().clone();
                        match local.as_str() {
                            "id" => {
                                state.singletons.element("id")?;
                                state.entry.id = Some(self.reader.read_element_value()?);
                            }
                            "link" => self.read_entry_link(&mut state, depth)?,
                            "content" => {
                                state.singletons.element("content")?;
                                self.read_entry_content(&mut state, depth)?;
                            }
                            _ if self.read_metadata() => {
                                if !self.read_entry_metadata_element(
                                    &mut state.metadata,
                                    &mut state.singletons,
                                )? {
                                    self.skip_element()?;
                                }
                            }
                            _ => self.skip_element()?,
                        }
                    }
                    Ns::Metadata => {
                        let local = self.reader.local_name().clone();
                        match local.as_str() {
                            // media link entries carry their properties next to the content
                            "properties" => {
                                state.singletons.element("properties")?;
                                self.read_properties(&mut state.entry.properties, &mut state.names, depth)?;
                            }
                            "action" => state.entry.actions.push(self.read_operation("m:action")?),
                            "function" => {
                                state.entry.functions.push(self.read_operation("m:function")?)
                            }
                            _ => self.skip_element()?,
                        }
                    }
                    _ => self.skip_element()?,
                }
            }
        }

        let mut entry = state.entry;
        if self.read_metadata() {
            entry.atom = Some(state.metadata);
        }
        trace!("read entry {:?}", entry.id);
        Ok(entry)
    }

    /// Find the type name category among the entry's children without
    /// consuming them.
    fn read_entry_type_name(&mut self) -> Result<Option<String>> {
        if self.reader.is_empty_element() {
            return Ok(None);
        }
        let depth = self.reader.depth();
        self.reader.start_buffering()?;
        let mut type_name = None;
        while self.reader.read()? {
            match self.reader.node_kind() {
                NodeKind::Element
                    if self.reader.depth() == depth + 1
                        && self.on(&self.names.category, &self.names.atom_ns)
                        && self.reader.get_attribute("scheme", "") == Some(ODATA_SCHEME) =>
                {
                    type_name = self.attribute("term");
                    break;
                }
                // Only direct children can carry the type name.
                NodeKind::Element if self.reader.depth() == depth + 1 => {
                    self.reader.skip_to_end_untracked()?
                }
                NodeKind::EndElement if self.reader.depth() == depth => break,
                _ => {}
            }
        }
        self.reader.stop_buffering()?;
        Ok(type_name)
    }

    fn read_entry_content(&mut self, state: &mut EntryState, depth: usize) -> Result<()> {
        let content_type = self.attribute("type");

        if let Some(src) = self.reader.get_attribute("src", "") {
            let read_link = self.process_uri(src)?;
            let media = state.entry.media_resource.get_or_insert_with(Default::default);
            media.read_link = Some(read_link);
            media.content_type = content_type;
            return self.reader.skip();
        }

        if let Some(content_type) = content_type
            && !is_xml_media_type(&content_type)
        {
            return Err(Error::InvalidValue {
                what: "content type",
                value: content_type,
            });
        }

        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                if self.on(&self.names.properties, &self.names.metadata_ns) {
                    state.singletons.element("properties")?;
                    self.read_properties(&mut state.entry.properties, &mut state.names, depth)?;
                } else {
                    self.skip_element()?;
                }
            }
        }
        Ok(())
    }

    fn read_entry_link(&mut self, state: &mut EntryState, depth: usize) -> Result<()> {
        let Some(rel) = self.attribute("rel") else {
            return self.read_other_entry_link(state);
        };

        match EntryLink::classify(&rel) {
            EntryLink::Edit => {
                state.singletons.link(EDIT_REL)?;
                state.entry.edit_link = self.uri_attribute("href")?;
                if self.read_metadata() {
                    state.metadata.edit_link = Some(self.read_link_metadata()?);
                }
                self.reader.skip()
            }
            EntryLink::Read => {
                state.singletons.link(SELF_REL)?;
                state.entry.read_link = self.uri_attribute("href")?;
                if self.read_metadata() {
                    state.metadata.self_link = Some(self.read_link_metadata()?);
                }
                self.reader.skip()
            }
            EntryLink::EditMedia => {
                state.singletons.link(EDIT_MEDIA_REL)?;
                let edit_link = self.uri_attribute("href")?;
                let etag = self.metadata_attribute("etag");
                let atom = self.stream_link_metadata()?;
                let media = state.entry.media_resource.get_or_insert_with(Default::default);
                media.edit_link = edit_link;
                media.etag = etag;
                if let Some(link) = atom {
                    media.atom.get_or_insert_with(Default::default).edit_link = Some(link);
                }
                self.reader.skip()
            }
            EntryLink::Navigation(name) => {
                let name = decode_link_name(name, "navigation property name")?;
                state.names.add(&name, PropertyUse::Navigation)?;
                let link = self.read_navigation_link(name, depth)?;
                state.entry.navigation_links.push(link);
                Ok(())
            }
            EntryLink::Association(name) => {
                let name = decode_link_name(name, "association link name")?;
                state.names.add(&name, PropertyUse::Association)?;
                let url = self.uri_attribute("href")?;
                state.entry.association_links.push(ODataAssociationLink { name, url });
                self.reader.skip()
            }
            EntryLink::StreamEdit(name) => {
                let name = stream_name(name)?;
                let href = self.uri_attribute("href")?;
                let etag = self.metadata_attribute("etag");
                let content_type = self.attribute("type");
                let atom = self.stream_link_metadata()?;
                let stream = stream_property(&mut state.entry.properties, &mut state.names, &name)?;
                if stream.edit_link.is_some() {
                    return Err(Error::DuplicateStreamEditLink(name));
                }
                stream.edit_link = href;
                stream.etag = etag;
                if content_type.is_some() {
                    stream.content_type = content_type;
                }
                if let Some(link) = atom {
                    stream.atom.get_or_insert_with(Default::default).edit_link = Some(link);
                }
                self.reader.skip()
            }
            EntryLink::StreamRead(name) => {
                let name = stream_name(name)?;
                let href = self.uri_attribute("href")?;
                let content_type = self.attribute("type");
                let atom = self.stream_link_metadata()?;
                let stream = stream_property(&mut state.entry.properties, &mut state.names, &name)?;
                if stream.read_link.is_some() {
                    return Err(Error::DuplicateStreamReadLink(name));
                }
                stream.read_link = href;
                if content_type.is_some() {
                    stream.content_type = content_type;
                }
                if let Some(link) = atom {
                    stream.atom.get_or_insert_with(Default::default).self_link = Some(link);
                }
                self.reader.skip()
            }
            EntryLink::Other => self.read_other_entry_link(state),
        }
    }

    fn read_other_entry_link(&mut self, state: &mut EntryState) -> Result<()> {
        if self.read_metadata() {
            state.metadata.links.push(self.read_link_metadata()?);
        } else {
            trace!("ignoring non-OData link");
        }
        self.reader.skip()
    }

    fn stream_link_metadata(&self) -> Result<Option<AtomLinkMetadata>> {
        if self.read_metadata() {
            self.read_link_metadata().map(Some)
        } else {
            Ok(None)
        }
    }

    fn read_navigation_link(&mut self, name: String, depth: usize) -> Result<ODataNavigationLink> {
        let url = self.uri_attribute("href")?;
        let is_collection = self
            .reader
            .get_attribute("type", "")
            .and_then(atom_link_kind);
        let mut link = ODataNavigationLink {
            name,
            url,
            is_collection,
            expanded: None,
        };

        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                if self.on(&self.names.inline, &self.names.metadata_ns) {
                    if link.expanded.is_some() {
                        return Err(Error::DuplicateSingletonElement {
                            element: "inline".to_string(),
                            container: "link".to_string(),
                        });
                    }
                    link.expanded = Some(self.read_inline(depth + 1)?);
                } else {
                    self.skip_element()?;
                }
            }
        }
        Ok(link)
    }

    /// `m:inline`: an expanded feed, an expanded entry, or nothing (null
    /// entry).
    fn read_inline(&mut self, depth: usize) -> Result<ODataExpanded> {
        self.check_depth(depth)?;
        let mut expanded = None;
        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                let is_feed = self.on(&self.names.feed, &self.names.atom_ns);
                let is_entry = self.on(&self.names.entry, &self.names.atom_ns);
                if !is_feed && !is_entry {
                    self.skip_element()?;
                    continue;
                }
                if expanded.is_some() {
                    return Err(Error::DuplicateSingletonElement {
                        element: self.reader.local_name().to_string(),
                        container: "inline".to_string(),
                    });
                }
                expanded = Some(if is_feed {
                    ODataExpanded::Feed(self.read_feed_element(depth)?)
                } else {
                    ODataExpanded::Entry(Some(Box::new(self.read_entry_element(depth)?)))
                });
            }
        }
        Ok(expanded.unwrap_or(ODataExpanded::Entry(None)))
    }

    /// `m:action` or `m:function`.
    pub(crate) fn read_operation(&mut self, element: &str) -> Result<ODataOperation> {
        let metadata = self.required_attribute("metadata", element)?;
        let target = self.required_attribute("target", element)?;
        let operation = ODataOperation {
            metadata: self.process_uri(&metadata)?,
            target: self.process_uri(&target)?,
            title: self.attribute("title"),
        };
        self.reader.skip()?;
        Ok(operation)
    }
}

/// Decode the name segment of a stream link relation.
fn stream_name(raw: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(Error::EmptyStreamPropertyName);
    }
    decode_link_name(raw, "stream property name")
}

/// Property names in link relations are percent-encoded.
fn decode_link_name(raw: &str, what: &'static str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|name| name.into_owned())
        .map_err(|_| Error::InvalidValue {
            what,
            value: raw.to_string(),
        })
}

/// The stream property called `name`, created on first use.
fn stream_property<'p>(
    properties: &'p mut Vec<ODataProperty>,
    names: &mut PropertyNames,
    name: &str,
) -> Result<&'p mut ODataStreamReferenceValue> {
    let index = match properties
        .iter()
        .position(|p| p.name == name && matches!(p.value, ODataValue::StreamReference(_)))
    {
        Some(index) => index,
        None => {
            names.add(name, PropertyUse::Stream)?;
            properties.push(ODataProperty::new(
                name,
                ODataValue::StreamReference(ODataStreamReferenceValue::default()),
            ));
            properties.len() - 1
        }
    };
    match &mut properties[index].value {
        ODataValue::StreamReference(stream) => Ok(stream),
        _ => Err(Error::DuplicatePropertyName(name.to_string())),
    }
}

/// `application/atom+xml;type=feed` and `type=entry` link media types.
fn atom_link_kind(media_type: &str) -> Option<bool> {
    let mut parts = media_type.split(';');
    let base = parts.next()?.trim();
    if !base.eq_ignore_ascii_case("application/atom+xml") {
        return None;
    }
    parts.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("type") {
            return None;
        }
        match value.trim().to_ascii_lowercase().as_str() {
            "feed" => Some(true),
            "entry" => Some(false),
            _ => None,
        }
    })
}

fn is_xml_media_type(media_type: &str) -> bool {
    let base = media_type.split(';').next().unwrap_or_default().trim();
    base.eq_ignore_ascii_case("application/xml")
}
