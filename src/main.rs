//! odata-atom - dump OData ATOM payloads as JSON

use std::fs;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use serde::Serialize;
use url::Url;

use odata_atom::{AtomReader, ReaderSettings, decode_payload};

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Feed,
    Entry,
    Service,
    Error,
    Property,
    Ref,
    Refs,
}

#[derive(Parser)]
#[command(name = "odata-atom")]
#[command(version, about = "Read OData ATOM payloads", long_about = None)]
#[command(after_help = "EXAMPLES:
    odata-atom products.xml                        Dump a feed
    odata-atom -k entry product.xml                Dump a single entry
    odata-atom -k service -b http://host/svc/ svc.xml
                                                   Resolve relative URIs against a base")]
struct Cli {
    /// Payload file
    #[arg(value_name = "INPUT")]
    input: String,

    /// Payload kind
    #[arg(short, long, value_enum, default_value = "feed")]
    kind: Kind,

    /// Document base URI for relative URIs
    #[arg(short, long, value_name = "URL")]
    base_uri: Option<Url>,

    /// Skip ATOM metadata (authors, categories, links, ...)
    #[arg(long)]
    no_atom_metadata: bool,

    /// Ignore xml:base attributes
    #[arg(long)]
    disable_xml_base: bool,

    /// Print JSON on a single line
    #[arg(short, long)]
    compact: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match dump(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn dump(cli: &Cli) -> Result<(), String> {
    let bytes = fs::read(&cli.input).map_err(|e| format!("{}: {e}", cli.input))?;
    let payload = decode_payload(&bytes).map_err(|e| e.to_string())?;

    let mut settings = ReaderSettings::new()
        .with_atom_metadata_reading(!cli.no_atom_metadata)
        .with_disable_xml_base(cli.disable_xml_base);
    if let Some(base) = &cli.base_uri {
        settings = settings.with_base_uri(base.clone());
    }

    let reader = AtomReader::from_str(&payload, settings);
    let json = match cli.kind {
        Kind::Feed => to_json(reader.read_feed(), cli.compact),
        Kind::Entry => to_json(reader.read_entry(), cli.compact),
        Kind::Service => to_json(reader.read_service_document(), cli.compact),
        Kind::Error => to_json(reader.read_error(), cli.compact),
        Kind::Property => to_json(reader.read_property(), cli.compact),
        Kind::Ref => to_json(reader.read_entity_reference_link(), cli.compact),
        Kind::Refs => to_json(reader.read_entity_reference_links(), cli.compact),
    }?;
    println!("{json}");
    Ok(())
}

fn to_json<T: Serialize>(value: odata_atom::Result<T>, compact: bool) -> Result<String, String> {
    let value = value.map_err(|e| e.to_string())?;
    let json = if compact {
        serde_json::to_string(&value)
    } else {
        serde_json::to_string_pretty(&value)
    };
    json.map_err(|e| e.to_string())
}
