use ld_context::{ErrorCode, JsonLdError};
use serde_json::{Map, Value};

/// Structural role of a JSON object inside an expanded document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape<'a> {
    /// `{"@value": ...}`
    Value(&'a Map<String, Value>),
    /// `{"@list": ...}`, holding the list entry.
    List(&'a Value),
    /// `{"@set": ...}`, holding the set entry.
    Set(&'a Value),
    Node(&'a Map<String, Value>),
}

/// Classifies `object`, rejecting keyword combinations that no expanded
/// document can contain.
pub fn classify(object: &Map<String, Value>) -> Result<Shape<'_>, JsonLdError> {
    let value = object.get("@value");
    let list = object.get("@list");
    let set = object.get("@set");

    let markers = [value, list, set].iter().filter(|entry| entry.is_some()).count();
    if markers > 1 {
        return Err(JsonLdError::new(
            ErrorCode::CollidingKeywords,
            format!("object combines {} of @value, @list and @set", markers),
        ));
    }
    if object.contains_key("@id") && (value.is_some() || list.is_some()) {
        return Err(JsonLdError::new(
            ErrorCode::CollidingKeywords,
            "@id cannot appear in a value or list object",
        ));
    }

    if value.is_some() {
        return Ok(Shape::Value(object));
    }
    if let Some(entry) = list.or(set) {
        if let Some(extra) = object.keys().find(|key| *key != "@list" && *key != "@set" && *key != "@index") {
            return Err(JsonLdError::new(
                ErrorCode::InvalidSetOrListObject,
                format!("list or set object has unexpected entry '{}'", extra),
            ));
        }
        return Ok(match list {
            Some(_) => Shape::List(entry),
            None => Shape::Set(entry),
        });
    }
    Ok(Shape::Node(object))
}

pub fn is_value_object(value: &Value) -> bool {
    value.as_object().is_some_and(|map| map.contains_key("@value"))
}

pub fn is_list_object(value: &Value) -> bool {
    value.as_object().is_some_and(|map| map.contains_key("@list"))
}
