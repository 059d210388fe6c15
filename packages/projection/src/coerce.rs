//! Best-effort typing of edited text
//!
//! Incoming text is tried as boolean, 32-bit integer, single float, double
//! float, 64-bit integer, then string. The first parse that succeeds wins.
//! Integral text skips the float steps so values beyond `i32` land on `Long`.
//! Whole-valued text like `3.0` still fits an integer property.
//!
//! The result is then fitted to the property it replaces where that keeps the
//! author's intent: numbers take the existing numeric kind, text onto a
//! string stays text, text onto a content reference stays a reference.
//! References and opaque values are not editable from disk.

use placesync_document::{PropertyValue, Vector3};
use serde_yaml::Value;

/// Parse text through the priority chain
pub fn coerce_text(text: &str) -> PropertyValue {
    let trimmed = text.trim();
    let integral = is_integral(trimmed);

    if let Some(b) = parse_bool(trimmed) {
        return PropertyValue::Bool(b);
    }
    if let Ok(n) = trimmed.parse::<i32>() {
        return PropertyValue::Int(n);
    }
    if !integral {
        if let Some(n) = trimmed.parse::<f32>().ok().filter(|n| n.is_finite()) {
            return PropertyValue::Float(n);
        }
        if let Some(n) = trimmed.parse::<f64>().ok().filter(|n| n.is_finite()) {
            return PropertyValue::Double(n);
        }
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return PropertyValue::Long(n);
    }
    PropertyValue::String(text.to_string())
}

/// Coerce edited text to replace `existing`
///
/// Returns `None` when the existing property cannot be written from text.
pub fn coerce_text_onto(existing: &PropertyValue, text: &str) -> Option<PropertyValue> {
    match existing {
        PropertyValue::String(_) => Some(PropertyValue::String(text.to_string())),
        PropertyValue::Vector3(_)
        | PropertyValue::Transform { .. }
        | PropertyValue::Ref(_)
        | PropertyValue::Opaque { .. } => None,
        _ => Some(conform(existing, text)),
    }
}

/// Coerce a decoded YAML value to replace `existing`
pub fn coerce_onto(existing: &PropertyValue, incoming: &Value) -> Option<PropertyValue> {
    match incoming {
        Value::Null => match existing {
            PropertyValue::Ref(_) | PropertyValue::Opaque { .. } => None,
            _ => Some(PropertyValue::Null),
        },
        Value::Bool(b) => coerce_text_onto(existing, &b.to_string()),
        Value::Number(n) => coerce_text_onto(existing, &n.to_string()),
        Value::String(s) => coerce_text_onto(existing, s),
        Value::Mapping(_) => coerce_vector_onto(existing, incoming),
        Value::Tagged(tagged) => coerce_onto(existing, &tagged.value),
        Value::Sequence(_) => None,
    }
}

fn coerce_vector_onto(existing: &PropertyValue, incoming: &Value) -> Option<PropertyValue> {
    match existing {
        PropertyValue::Vector3(current) => {
            Some(PropertyValue::Vector3(read_vector(incoming, current)?))
        }
        PropertyValue::Transform { position, rotation } => Some(PropertyValue::Transform {
            position: read_vector(incoming, position)?,
            rotation: *rotation,
        }),
        _ => None,
    }
}

/// Read `{x, y, z}`; missing components keep their current value
fn read_vector(incoming: &Value, current: &Vector3) -> Option<Vector3> {
    let mapping = incoming.as_mapping()?;
    let component = |key: &str, fallback: f32| -> Option<f32> {
        match mapping.get(key) {
            None => Some(fallback),
            Some(value) => value_as_f64(value).map(|n| n as f32),
        }
    };

    Some(Vector3 {
        x: component("x", current.x)?,
        y: component("y", current.y)?,
        z: component("z", current.z)?,
    })
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn conform(existing: &PropertyValue, text: &str) -> PropertyValue {
    match (existing, coerce_text(text)) {
        (PropertyValue::ContentRef(_), PropertyValue::String(s)) => PropertyValue::ContentRef(s),
        (existing, candidate) if existing.is_numeric() && candidate.is_numeric() => {
            cast_numeric(existing, &candidate, text.trim()).unwrap_or(candidate)
        }
        (_, candidate) => candidate,
    }
}

/// Cast into the existing numeric kind unless that would drop information
///
/// Doubles are read from the text itself so they never pass through `f32`.
fn cast_numeric(existing: &PropertyValue, candidate: &PropertyValue, text: &str) -> Option<PropertyValue> {
    let exact_int = match candidate {
        PropertyValue::Int(n) => Some(i64::from(*n)),
        PropertyValue::Long(n) => Some(*n),
        _ => whole_number(text),
    };

    match existing {
        PropertyValue::Int(_) => exact_int
            .and_then(|n| i32::try_from(n).ok())
            .map(PropertyValue::Int),
        PropertyValue::Long(_) => exact_int.map(PropertyValue::Long),
        PropertyValue::Float(_) => candidate
            .as_f64()
            .map(|n| n as f32)
            .filter(|n| n.is_finite())
            .map(PropertyValue::Float),
        PropertyValue::Double(_) => text
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(PropertyValue::Double),
        _ => None,
    }
}

/// Integer value of text such as `3.0` or `1e3`
fn whole_number(text: &str) -> Option<i64> {
    let n = text.parse::<f64>().ok()?;
    let in_range = n >= i64::MIN as f64 && n < i64::MAX as f64;
    (n.is_finite() && n.fract() == 0.0 && in_range).then(|| n as i64)
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn is_integral(text: &str) -> bool {
    let digits = text.strip_prefix(|c| c == '-' || c == '+').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
