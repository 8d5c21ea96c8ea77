//! Service documents (`app:service`).

use log::debug;

use crate::atom::deserializer::{AtomDeserializer, Ns, SingletonTracker};
use crate::atom::metadata::{AtomResourceCollectionMetadata, AtomWorkspaceMetadata};
use crate::error::{Error, Result};
use crate::model::{ODataServiceDocument, ODataServiceDocumentElement};
use crate::xml::TokenSource;

impl<S: TokenSource> AtomDeserializer<S> {
    pub(crate) fn read_service_document(&mut self) -> Result<ODataServiceDocument> {
        let (service, app) = (self.names.service.clone(), self.names.app_ns.clone());
        self.start_payload(&service, &app)?;

        let mut document = ODataServiceDocument::default();
        let mut found_workspace = false;
        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                if self.on(&self.names.workspace, &self.names.app_ns) {
                    if found_workspace {
                        return Err(Error::DuplicateWorkspace);
                    }
                    found_workspace = true;
                    self.read_workspace(&mut document)?;
                } else {
                    self.skip_element()?;
                }
            }
        }
        if !found_workspace {
            return Err(Error::MissingWorkspace);
        }

        self.reader.read_payload_end()?;
        debug!(
            "read service document: {} entity sets, {} function imports, {} singletons",
            document.entity_sets.len(),
            document.function_imports.len(),
            document.singletons.len()
        );
        Ok(document)
    }

    fn read_workspace(&mut self, document: &mut ODataServiceDocument) -> Result<()> {
        let mut metadata = AtomWorkspaceMetadata::default();
        let mut singletons = SingletonTracker::new("workspace");

        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                let local = self.reader.local_name().clone();
                match (self.ns(), local.as_str()) {
                    (Ns::Atom, "title") => {
                        singletons.element("title")?;
                        if self.read_metadata() {
                            metadata.title = Some(self.read_text_construct()?);
                        } else {
                            self.skip_element()?;
                        }
                    }
                    (Ns::App, "collection") => {
                        let element = self.read_service_element("collection")?;
                        document.entity_sets.push(element);
                    }
                    (Ns::Metadata, "function-import") => {
                        let element = self.read_service_element("function-import")?;
                        document.function_imports.push(element);
                    }
                    (Ns::Metadata, "singleton") => {
                        let element = self.read_service_element("singleton")?;
                        document.singletons.push(element);
                    }
                    _ => self.skip_element()?,
                }
            }
        }

        if self.read_metadata() {
            document.atom = Some(metadata);
        }
        Ok(())
    }

    /// `app:collection`, `m:function-import` or `m:singleton`.
    fn read_service_element(&mut self, element: &'static str) -> Result<ODataServiceDocumentElement> {
        let href = self.required_attribute("href", element)?;
        let url = self.process_uri(&href)?;
        let mut metadata = AtomResourceCollectionMetadata::default();
        let mut singletons = SingletonTracker::new(element);
        let mut name = None;

        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                let local = self.reader.local_name().clone();
                match (self.ns(), local.as_str()) {
                    (Ns::Atom, "title") => {
                        singletons.element("title")?;
                        let title = self.read_text_construct()?;
                        name = Some(title.text.clone());
                        metadata.title = Some(title);
                    }
                    (Ns::App, "accept") if self.read_metadata() => {
                        metadata.accept.push(self.reader.read_element_value()?);
                    }
                    (Ns::App, "categories") if self.read_metadata() => {
                        metadata.categories.push(self.read_categories()?);
                    }
                    _ => self.skip_element()?,
                }
            }
        }

        Ok(ODataServiceDocumentElement {
            url,
            name,
            atom: self.read_metadata().then_some(metadata),
        })
    }
}
