use odata_atom::{AtomReader, Error, ReaderSettings, read_service_document};
use std::io::Write;
use tempfile::NamedTempFile;
use url::Url;

const SERVICE: &str = include_str!("fixtures/service.xml");

const NS: &str = r#"xmlns="http://www.w3.org/2007/app" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:m="http://docs.oasis-open.org/odata/ns/metadata""#;

fn read(xml: &str, settings: ReaderSettings) -> odata_atom::Result<odata_atom::ODataServiceDocument> {
    AtomReader::from_str(xml, settings).read_service_document()
}

#[test]
fn test_read_service_document() {
    let document = read(SERVICE, ReaderSettings::default()).expect("Failed to read service document");

    assert_eq!(document.entity_sets.len(), 2);
    assert_eq!(document.function_imports.len(), 1);
    assert_eq!(document.singletons.len(), 1);

    let products = &document.entity_sets[0];
    assert_eq!(products.url.as_str(), "http://odata.org/service/Products");
    assert_eq!(products.name.as_deref(), Some("Products"));

    let atom = products.atom.as_ref().unwrap();
    assert_eq!(atom.accept, vec!["application/atom+xml;type=entry".to_string()]);
    let categories = &atom.categories[0];
    assert_eq!(categories.fixed, Some(true));
    assert_eq!(categories.scheme.as_deref(), Some("http://odata.org/scheme"));
    let terms: Vec<_> = categories
        .categories
        .iter()
        .map(|c| c.term.as_deref().unwrap())
        .collect();
    assert_eq!(terms, ["food", "drink"]);

    assert_eq!(
        document.function_imports[0].name.as_deref(),
        Some("Best-Selling Products")
    );
    assert_eq!(
        document.singletons[0].url.as_str(),
        "http://odata.org/service/Contoso"
    );

    let workspace = document.atom.as_ref().unwrap();
    assert_eq!(workspace.title.as_ref().unwrap().text, "Default");
}

#[test]
fn test_service_document_without_metadata() {
    let settings = ReaderSettings::new().with_atom_metadata_reading(false);
    let document = read(SERVICE, settings).unwrap();

    assert!(document.atom.is_none());
    let products = &document.entity_sets[0];
    // names come from the title even without metadata
    assert_eq!(products.name.as_deref(), Some("Products"));
    assert!(products.atom.is_none());
}

#[test]
fn test_missing_workspace() {
    let xml = format!("<service {NS}></service>");
    assert!(matches!(read(&xml, ReaderSettings::default()), Err(Error::MissingWorkspace)));
}

#[test]
fn test_duplicate_workspace() {
    let xml = format!("<service {NS}><workspace/><workspace/></service>");
    assert!(matches!(read(&xml, ReaderSettings::default()), Err(Error::DuplicateWorkspace)));
}

#[test]
fn test_collection_without_href() {
    let xml = format!(
        "<service {NS}><workspace><collection><atom:title>X</atom:title></collection></workspace></service>"
    );
    let err = read(&xml, ReaderSettings::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::MissingAttribute { ref attribute, ref element }
            if attribute == "href" && element == "collection"
    ));
}

#[test]
fn test_invalid_categories_fixed() {
    let xml = format!(
        r#"<service {NS} xml:base="http://h/"><workspace><collection href="A">
             <categories fixed="maybe"/>
           </collection></workspace></service>"#
    );
    let err = read(&xml, ReaderSettings::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidValue { what: "categories fixed", ref value } if value == "maybe"));

    // the attribute is not looked at when metadata is off
    let settings = ReaderSettings::new().with_atom_metadata_reading(false);
    assert!(read(&xml, settings).is_ok());
}

#[test]
fn test_duplicate_collection_title() {
    let xml = format!(
        r#"<service {NS} xml:base="http://h/"><workspace><collection href="A">
             <atom:title>A</atom:title><atom:title>B</atom:title>
           </collection></workspace></service>"#
    );
    let err = read(&xml, ReaderSettings::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::DuplicateSingletonElement { ref element, ref container }
            if element == "title" && container == "collection"
    ));
}

#[test]
fn test_document_base_uri() {
    let xml = format!(r#"<service {NS}><workspace><collection href="People"/></workspace></service>"#);
    let settings = ReaderSettings::new().with_base_uri(Url::parse("http://host/svc/").unwrap());
    let document = read(&xml, settings).unwrap();
    assert_eq!(document.entity_sets[0].url.as_str(), "http://host/svc/People");
    assert_eq!(document.entity_sets[0].name, None);

    let err = read(&xml, ReaderSettings::default()).unwrap_err();
    assert!(matches!(err, Error::RelativeUriWithoutBase(ref uri) if uri == "People"));
}

#[test]
fn test_read_service_document_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(SERVICE.as_bytes()).unwrap();

    let document = read_service_document(file.path(), &ReaderSettings::default()).unwrap();
    assert_eq!(document.entity_sets.len(), 2);
}
