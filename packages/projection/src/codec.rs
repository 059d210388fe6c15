//! # Property Codec
//!
//! Export table from [`PropertyValue`] to the YAML written in `properties.yaml`:
//!
//! | Value | YAML |
//! |---|---|
//! | `Null` | `~` |
//! | `Bool`, `Int`, `Float`, `Double`, `Long`, `String` | scalar |
//! | `Vector3` | `{x, y, z}` |
//! | `Transform` | `{x, y, z}` of the translation |
//! | `ContentRef` | URL string |
//! | `Ref`, `Opaque` | omitted |

use crate::error::{ProjectionError, ProjectionResult};
use crate::layout::{is_script_class, SOURCE_PROPERTY};
use placesync_document::{Node, PropertyValue, Vector3};
use serde_yaml::{Mapping, Number, Value};

/// Key used for a property in `properties.yaml` (`Enabled` -> `enabled`)
pub fn property_key(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Scalar-safe form of a value, or `None` if it never leaves the document
pub fn export_value(value: &PropertyValue) -> Option<Value> {
    match value {
        PropertyValue::Null => Some(Value::Null),
        PropertyValue::Bool(b) => Some(Value::Bool(*b)),
        PropertyValue::Int(n) => Some(Value::Number(Number::from(*n))),
        PropertyValue::Long(n) => Some(Value::Number(Number::from(*n))),
        PropertyValue::Float(n) => Some(Value::Number(Number::from(f32_to_f64(*n)))),
        PropertyValue::Double(n) => Some(Value::Number(Number::from(*n))),
        PropertyValue::String(s) | PropertyValue::ContentRef(s) => Some(Value::String(s.clone())),
        PropertyValue::Vector3(v) => Some(vector_mapping(v)),
        PropertyValue::Transform { position, .. } => Some(vector_mapping(position)),
        PropertyValue::Ref(_) | PropertyValue::Opaque { .. } => None,
    }
}

/// Render the exportable properties of `node` as a YAML document
///
/// A script's `Source` is left out; it is projected to its own file.
pub fn encode_properties(node: &Node) -> ProjectionResult<String> {
    let skip_source = is_script_class(&node.class_name);
    let mut mapping = Mapping::new();

    for (name, value) in &node.properties {
        if skip_source && name == SOURCE_PROPERTY {
            continue;
        }
        if let Some(exported) = export_value(value) {
            mapping.insert(Value::String(property_key(name)), exported);
        }
    }

    Ok(serde_yaml::to_string(&Value::Mapping(mapping))?)
}

/// Parse `properties.yaml` text into key/value pairs
///
/// An empty file decodes to an empty mapping, since editors often truncate
/// before writing.
pub fn decode_properties(text: &str) -> ProjectionResult<Mapping> {
    if text.trim().is_empty() {
        return Ok(Mapping::new());
    }

    match serde_yaml::from_str::<Value>(text)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ProjectionError::NotAMapping),
    }
}

/// Widen through the shortest decimal form so `0.1f32` stays `0.1`
pub(crate) fn f32_to_f64(n: f32) -> f64 {
    n.to_string().parse().unwrap_or(f64::from(n))
}

fn vector_mapping(v: &Vector3) -> Value {
    let mut mapping = Mapping::new();
    mapping.insert("x".into(), Value::Number(Number::from(f32_to_f64(v.x))));
    mapping.insert("y".into(), Value::Number(Number::from(f32_to_f64(v.y))));
    mapping.insert("z".into(), Value::Number(Number::from(f32_to_f64(v.z))));
    Value::Mapping(mapping)
}
