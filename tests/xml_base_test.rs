use odata_atom::{AtomReader, BufferingXmlReader, Error, NodeKind, QuickXmlSource, ReaderSettings};
use url::Url;

fn reader_with(xml: &str, settings: ReaderSettings) -> BufferingXmlReader<QuickXmlSource<&[u8]>> {
    BufferingXmlReader::new(QuickXmlSource::from_str(xml), &settings)
}

fn reader(xml: &str) -> BufferingXmlReader<QuickXmlSource<&[u8]>> {
    reader_with(xml, ReaderSettings::default())
}

fn read_to(reader: &mut BufferingXmlReader<QuickXmlSource<&[u8]>>, kind: NodeKind, name: &str) {
    while reader.read().unwrap() {
        if reader.node_kind() == kind && reader.local_name() == name {
            return;
        }
    }
    panic!("{kind} {name} not found");
}

fn base(reader: &BufferingXmlReader<QuickXmlSource<&[u8]>>) -> Option<String> {
    reader.xml_base_uri().map(|u| u.to_string())
}

#[test]
fn test_relative_xml_base_without_base() {
    let mut reader = reader(r#"<a xml:base="sub/"/>"#);
    let err = reader.read().unwrap_err();
    assert!(matches!(err, Error::RelativeUriWithoutBase(ref uri) if uri == "sub/"));
    assert!(err.to_string().contains("'sub/'"));
}

#[test]
fn test_xml_base_scopes() {
    let xml = r#"<a xml:base="http://x.org/">
        <b xml:base="http://y.org/"><inner/></b>
        <c/>
    </a>"#;
    let mut reader = reader(xml);

    read_to(&mut reader, NodeKind::Element, "inner");
    assert_eq!(base(&reader).as_deref(), Some("http://y.org/"));

    read_to(&mut reader, NodeKind::EndElement, "b");
    assert_eq!(base(&reader).as_deref(), Some("http://y.org/"));

    read_to(&mut reader, NodeKind::Element, "c");
    assert_eq!(base(&reader).as_deref(), Some("http://x.org/"));

    read_to(&mut reader, NodeKind::EndElement, "a");
    assert_eq!(base(&reader).as_deref(), Some("http://x.org/"));
}

#[test]
fn test_relative_xml_base_against_parent() {
    let xml = r#"<a xml:base="http://x.org/p/"><b xml:base="q/"><c xml:base="../r/"/></b></a>"#;
    let mut reader = reader(xml);

    read_to(&mut reader, NodeKind::Element, "b");
    assert_eq!(base(&reader).as_deref(), Some("http://x.org/p/q/"));
    read_to(&mut reader, NodeKind::Element, "c");
    assert_eq!(base(&reader).as_deref(), Some("http://x.org/p/r/"));
}

#[test]
fn test_relative_xml_base_against_document_base() {
    let settings = ReaderSettings::new().with_base_uri(Url::parse("http://doc.org/svc/").unwrap());
    let mut reader = reader_with(r#"<a xml:base="sub/"><b/></a>"#, settings);

    reader.read().unwrap();
    assert_eq!(base(&reader).as_deref(), Some("http://doc.org/svc/sub/"));
    assert_eq!(reader.document_base_uri().unwrap().as_str(), "http://doc.org/svc/");
    read_to(&mut reader, NodeKind::Element, "b");
    assert_eq!(reader.resolution_base().unwrap().as_str(), "http://doc.org/svc/sub/");
}

#[test]
fn test_empty_xml_base_keeps_parent() {
    let xml = r#"<a xml:base="http://x.org/p/q"><b xml:base=""/></a>"#;
    let mut reader = reader(xml);
    read_to(&mut reader, NodeKind::Element, "b");
    assert_eq!(base(&reader).as_deref(), Some("http://x.org/p/q"));
}

#[test]
fn test_invalid_xml_base() {
    let mut reader = reader(r#"<a xml:base="http://[bad"/>"#);
    assert!(matches!(reader.read(), Err(Error::InvalidUri { .. })));
}

#[test]
fn test_stop_buffering_restores_base() {
    let xml = r#"<a xml:base="http://x.org/"><b xml:base="http://y.org/"><c/></b></a>"#;
    let mut reader = reader(xml);
    reader.read().unwrap();
    reader.start_buffering().unwrap();

    read_to(&mut reader, NodeKind::Element, "c");
    assert_eq!(base(&reader).as_deref(), Some("http://y.org/"));

    reader.stop_buffering().unwrap();
    assert_eq!(reader.local_name(), "a");
    assert_eq!(base(&reader).as_deref(), Some("http://x.org/"));

    // replayed nodes establish their bases again
    read_to(&mut reader, NodeKind::Element, "c");
    assert_eq!(base(&reader).as_deref(), Some("http://y.org/"));
}

#[test]
fn test_disable_xml_base() {
    let settings = ReaderSettings::new()
        .with_disable_xml_base(true)
        .with_base_uri(Url::parse("http://doc.org/").unwrap());
    let mut reader = reader_with(r#"<a xml:base="http://x.org/"/>"#, settings);
    reader.read().unwrap();
    assert_eq!(reader.xml_base_uri(), None);
    assert_eq!(reader.resolution_base().unwrap().as_str(), "http://doc.org/");
}

#[test]
fn test_disable_xml_base_for_entry_links() {
    let xml = r#"<entry xmlns="http://www.w3.org/2005/Atom" xml:base="http://x.org/">
        <link rel="edit" href="Products(1)"/>
    </entry>"#;

    let entry = AtomReader::from_str(xml, ReaderSettings::default())
        .read_entry()
        .unwrap();
    assert_eq!(entry.edit_link.unwrap().as_str(), "http://x.org/Products(1)");

    let settings = ReaderSettings::new()
        .with_disable_xml_base(true)
        .with_base_uri(Url::parse("http://doc.org/svc/").unwrap());
    let entry = AtomReader::from_str(xml, settings).read_entry().unwrap();
    assert_eq!(entry.edit_link.unwrap().as_str(), "http://doc.org/svc/Products(1)");

    let settings = ReaderSettings::new().with_disable_xml_base(true);
    let err = AtomReader::from_str(xml, settings).read_entry().unwrap_err();
    assert!(matches!(err, Error::RelativeUriWithoutBase(ref uri) if uri == "Products(1)"));
}
