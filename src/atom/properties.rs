//! Property values: `m:properties`, complex and collection values, primitive
//! conversion and top-level property payloads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::DateTime;
use log::trace;

use crate::atom::deserializer::{AtomDeserializer, Ns, PropertyNames, PropertyUse};
use crate::error::{Error, Result};
use crate::model::{
    ODataCollectionValue, ODataComplexValue, ODataPrimitiveValue, ODataProperty, ODataValue,
};
use crate::xml::{NodeKind, TokenSource};

/// Primitive type names that may appear without the `Edm.` prefix.
const PRIMITIVE_TYPES: &[&str] = &[
    "Binary",
    "Boolean",
    "Byte",
    "Date",
    "DateTimeOffset",
    "Decimal",
    "Double",
    "Duration",
    "Guid",
    "Int16",
    "Int32",
    "Int64",
    "SByte",
    "Single",
    "Stream",
    "String",
    "TimeOfDay",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Primitive,
    Complex,
    Collection,
}

impl ValueKind {
    fn of_type_name(type_name: &str) -> ValueKind {
        if collection_item_type(type_name).is_some() {
            ValueKind::Collection
        } else if type_name.starts_with("Edm.") || PRIMITIVE_TYPES.contains(&type_name) {
            ValueKind::Primitive
        } else {
            ValueKind::Complex
        }
    }
}

/// `Collection(Edm.String)` -> `Edm.String`.
fn collection_item_type(type_name: &str) -> Option<&str> {
    type_name
        .strip_prefix("Collection(")
        .and_then(|rest| rest.strip_suffix(')'))
}

impl<S: TokenSource> AtomDeserializer<S> {
    /// Read the `d:` children of an `m:properties` (or complex value) element.
    pub(crate) fn read_properties(
        &mut self,
        properties: &mut Vec<ODataProperty>,
        names: &mut PropertyNames,
        depth: usize,
    ) -> Result<()> {
        if !self.reader.enter_element()? {
            return Ok(());
        }
        while self.reader.next_child_element()? {
            if self.ns() != Ns::Data {
                self.skip_element()?;
                continue;
            }
            let name = self.reader.local_name().to_string();
            names.add(&name, PropertyUse::Property)?;
            let value = self.read_property_value(None, depth)?;
            properties.push(ODataProperty::new(name, value));
        }
        Ok(())
    }

    /// Read the value of the property element under the cursor and move past
    /// it. `expected_type` applies when the element has no `m:type`.
    pub(crate) fn read_property_value(
        &mut self,
        expected_type: Option<&str>,
        depth: usize,
    ) -> Result<ODataValue> {
        self.check_depth(depth)?;

        match self.metadata_attribute("null").as_deref() {
            Some("true") => {
                self.reader.skip()?;
                return Ok(ODataValue::Null);
            }
            Some("false") | None => {}
            Some(other) => {
                return Err(Error::InvalidValue {
                    what: "m:null",
                    value: other.to_string(),
                });
            }
        }

        let type_name = self
            .metadata_attribute("type")
            .map(|t| t.strip_prefix('#').map(str::to_string).unwrap_or(t))
            .or_else(|| expected_type.map(str::to_string));
        let kind = match &type_name {
            Some(name) => ValueKind::of_type_name(name),
            None => self.detect_value_kind()?,
        };

        match kind {
            ValueKind::Primitive => {
                let text = self.reader.read_element_value()?;
                Ok(ODataValue::Primitive(parse_primitive(type_name.as_deref(), text)?))
            }
            ValueKind::Complex => {
                let mut properties = Vec::new();
                self.read_properties(&mut properties, &mut PropertyNames::default(), depth + 1)?;
                Ok(ODataValue::Complex(ODataComplexValue {
                    type_name,
                    properties,
                }))
            }
            ValueKind::Collection => {
                let item_type = type_name
                    .as_deref()
                    .and_then(collection_item_type)
                    .map(str::to_string);
                let items = self.read_collection_items(item_type.as_deref(), depth)?;
                Ok(ODataValue::Collection(ODataCollectionValue { type_name, items }))
            }
        }
    }

    fn read_collection_items(
        &mut self,
        item_type: Option<&str>,
        depth: usize,
    ) -> Result<Vec<ODataValue>> {
        let mut items = Vec::new();
        if self.reader.enter_element()? {
            while self.reader.next_child_element()? {
                if self.on(&self.names.element, &self.names.metadata_ns) {
                    items.push(self.read_property_value(item_type, depth + 1)?);
                } else {
                    self.skip_element()?;
                }
            }
        }
        Ok(items)
    }

    /// Look ahead at the children of an untyped property: an `m:element`
    /// child makes it a collection, a `d:` child a complex value.
    fn detect_value_kind(&mut self) -> Result<ValueKind> {
        if self.reader.is_empty_element() {
            return Ok(ValueKind::Primitive);
        }
        let depth = self.reader.depth();
        self.reader.start_buffering()?;
        let mut kind = ValueKind::Primitive;
        while self.reader.read()? {
            match self.reader.node_kind() {
                NodeKind::Element if self.reader.depth() == depth + 1 => {
                    if self.on(&self.names.element, &self.names.metadata_ns) {
                        kind = ValueKind::Collection;
                    } else if self.ns() == Ns::Data {
                        kind = ValueKind::Complex;
                    }
                    break;
                }
                NodeKind::EndElement if self.reader.depth() == depth => break,
                _ => {}
            }
        }
        self.reader.stop_buffering()?;
        trace!("untyped property value read as {kind:?}");
        Ok(kind)
    }

    /// A top-level property payload: `m:value` or any element in the data or
    /// metadata namespace.
    pub(crate) fn read_top_level_property(&mut self) -> Result<ODataProperty> {
        self.reader.read_payload_start()?;
        if !matches!(self.ns(), Ns::Metadata | Ns::Data) {
            return Err(Error::InvalidRootElement {
                name: self.reader.local_name().to_string(),
                namespace: self.reader.namespace_uri().to_string(),
            });
        }
        let name = self.reader.local_name().to_string();
        let value = self.read_property_value(None, 0)?;
        self.reader.read_payload_end()?;
        Ok(ODataProperty::new(name, value))
    }
}

/// Convert the text of a primitive value according to its type name.
pub fn parse_primitive(type_name: Option<&str>, text: String) -> Result<ODataPrimitiveValue> {
    let Some(full_name) = type_name else {
        return Ok(ODataPrimitiveValue::String(text));
    };
    let name = full_name.strip_prefix("Edm.").unwrap_or(full_name);
    let trimmed = text.trim();
    let invalid = || Error::InvalidPrimitiveValue {
        type_name: full_name.to_string(),
        value: text.clone(),
    };

    let value = match name {
        "String" => ODataPrimitiveValue::String(text.clone()),
        "Boolean" => match trimmed {
            "true" | "1" => ODataPrimitiveValue::Boolean(true),
            "false" | "0" => ODataPrimitiveValue::Boolean(false),
            _ => return Err(invalid()),
        },
        "Byte" => ODataPrimitiveValue::Byte(trimmed.parse().map_err(|_| invalid())?),
        "SByte" => ODataPrimitiveValue::SByte(trimmed.parse().map_err(|_| invalid())?),
        "Int16" => ODataPrimitiveValue::Int16(trimmed.parse().map_err(|_| invalid())?),
        "Int32" => ODataPrimitiveValue::Int32(trimmed.parse().map_err(|_| invalid())?),
        "Int64" => ODataPrimitiveValue::Int64(trimmed.parse().map_err(|_| invalid())?),
        "Single" => {
            let value = parse_float(trimmed).ok_or_else(invalid)?;
            ODataPrimitiveValue::Single(value as f32)
        }
        "Double" => ODataPrimitiveValue::Double(parse_float(trimmed).ok_or_else(invalid)?),
        "Decimal" if is_decimal(trimmed) => ODataPrimitiveValue::Decimal(trimmed.to_string()),
        "Decimal" => return Err(invalid()),
        "Guid" if is_guid(trimmed) => ODataPrimitiveValue::Guid(trimmed.to_ascii_lowercase()),
        "Guid" => return Err(invalid()),
        "DateTimeOffset" => ODataPrimitiveValue::DateTimeOffset(
            DateTime::parse_from_rfc3339(trimmed).map_err(|_| invalid())?,
        ),
        "Binary" => ODataPrimitiveValue::Binary(STANDARD.decode(trimmed).map_err(|_| invalid())?),
        _ => ODataPrimitiveValue::Untyped {
            type_name: full_name.to_string(),
            text: text.clone(),
        },
    };
    Ok(value)
}

/// XML Schema floats, including `INF`, `-INF` and `NaN`.
fn parse_float(text: &str) -> Option<f64> {
    match text {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        // Rust would accept "inf" and "infinity"
        _ if text.chars().any(|c| c.is_ascii_alphabetic() && !matches!(c, 'e' | 'E')) => None,
        _ => text.parse().ok(),
    }
}

fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, frac),
        None => (digits, ""),
    };
    (!int.is_empty() || !frac.is_empty())
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

fn is_guid(text: &str) -> bool {
    let groups: Vec<&str> = text.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.bytes().all(|b| b.is_ascii_hexdigit()))
}
