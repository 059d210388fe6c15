//! Folding edited file contents back onto a node

use crate::codec::{decode_properties, property_key};
use crate::coerce::coerce_onto;
use crate::error::ProjectionResult;
use crate::layout::SOURCE_PROPERTY;
use placesync_document::{Node, PropertyValue};

/// Apply `properties.yaml` text to `node`. Returns the names of the
/// properties that changed.
///
/// Keys are matched to properties the node already has; nothing is created.
pub fn apply_properties(node: &mut Node, text: &str) -> ProjectionResult<Vec<String>> {
    let decoded = decode_properties(text)?;
    let mut changed = Vec::new();

    for (key, incoming) in &decoded {
        let Some(key) = key.as_str() else {
            continue;
        };
        let Some(name) = resolve_property(node, key) else {
            tracing::trace!("Ignoring unknown property {} on {}", key, node.name);
            continue;
        };
        let Some(existing) = node.properties.get(&name) else {
            continue;
        };
        let Some(value) = coerce_onto(existing, incoming) else {
            tracing::debug!(
                "Skipping {} on {}: cannot write {} from {:?}",
                name,
                node.name,
                existing.kind(),
                incoming
            );
            continue;
        };

        if existing != &value {
            node.properties.insert(name.clone(), value);
            changed.push(name);
        }
    }

    Ok(changed)
}

/// Replace the node's `Source` with `text`, verbatim. Returns false when the
/// node has no source property.
pub fn apply_script(node: &mut Node, text: &str) -> bool {
    node.set_existing(SOURCE_PROPERTY, PropertyValue::String(text.to_string()))
}

/// Property name for a file key: exact name first, then the camel-case key
pub fn resolve_property(node: &Node, key: &str) -> Option<String> {
    if node.properties.contains_key(key) {
        return Some(key.to_string());
    }
    node.properties
        .keys()
        .find(|name| property_key(name) == key)
        .cloned()
}
