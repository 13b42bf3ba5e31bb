//! Conversion between native mappings and the wire-tagged item format
//!
//! The table service's self-describing format wraps every attribute value in a
//! one-entry mapping from a type tag to the encoded value, e.g.
//! `{"name": {"S": "Alice"}, "age": {"N": "42"}}`. A native mapping is the
//! same record with the tags stripped: `{"name": "Alice", "age": 42}`.
//!
//! The two shapes are never interchanged implicitly; callers reading one
//! encoding and wanting the other go through these functions.

use serde_json::{json, Map, Value};

use crate::error::{Result, TransferError};

/// Convert a native JSON mapping into a wire-tagged attribute map.
///
/// Numbers always render through `N` string literals, the format the service
/// requires on import.
pub fn record_to_wire_tagged(record: &Value) -> Result<Map<String, Value>> {
    let obj = record.as_object().ok_or_else(|| {
        TransferError::MalformedRecord("record to encode is not a JSON object".to_string())
    })?;
    let mut tagged = Map::with_capacity(obj.len());
    for (name, value) in obj {
        tagged.insert(name.clone(), tag_value(value));
    }
    Ok(tagged)
}

fn tag_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "NULL": true }),
        Value::Bool(b) => json!({ "BOOL": b }),
        Value::Number(n) => json!({ "N": n.to_string() }),
        Value::String(s) => json!({ "S": s }),
        Value::Array(items) => {
            let tagged: Vec<Value> = items.iter().map(tag_value).collect();
            json!({ "L": tagged })
        }
        Value::Object(map) => {
            let mut tagged = Map::with_capacity(map.len());
            for (k, v) in map {
                tagged.insert(k.clone(), tag_value(v));
            }
            json!({ "M": tagged })
        }
    }
}

/// Convert a wire-tagged attribute map back into a native JSON mapping.
pub fn record_from_wire_tagged(item: &Map<String, Value>) -> Result<Value> {
    let mut record = Map::with_capacity(item.len());
    for (name, tagged) in item {
        record.insert(name.clone(), untag_value(name, tagged)?);
    }
    Ok(Value::Object(record))
}

fn untag_value(attr: &str, tagged: &Value) -> Result<Value> {
    let obj = tagged.as_object().filter(|m| m.len() == 1).ok_or_else(|| {
        TransferError::MalformedRecord(format!(
            "attribute '{}' is not a one-entry type-tag mapping",
            attr
        ))
    })?;
    let (tag, value) = obj.iter().next().ok_or_else(|| {
        TransferError::MalformedRecord(format!("attribute '{}' has no type tag", attr))
    })?;

    match tag.as_str() {
        "S" | "B" => Ok(value.clone()),
        "N" => untag_number(attr, value),
        "BOOL" => Ok(value.clone()),
        "NULL" => Ok(Value::Null),
        "L" => {
            let items = value.as_array().ok_or_else(|| {
                TransferError::MalformedRecord(format!("attribute '{}': L is not a list", attr))
            })?;
            let native: Result<Vec<Value>> =
                items.iter().map(|v| untag_value(attr, v)).collect();
            Ok(Value::Array(native?))
        }
        "M" => {
            let map = value.as_object().ok_or_else(|| {
                TransferError::MalformedRecord(format!("attribute '{}': M is not a mapping", attr))
            })?;
            let mut native = Map::with_capacity(map.len());
            for (k, v) in map {
                native.insert(k.clone(), untag_value(attr, v)?);
            }
            Ok(Value::Object(native))
        }
        "SS" | "BS" => Ok(value.clone()),
        "NS" => {
            let items = value.as_array().ok_or_else(|| {
                TransferError::MalformedRecord(format!("attribute '{}': NS is not a list", attr))
            })?;
            let native: Result<Vec<Value>> =
                items.iter().map(|v| untag_number(attr, v)).collect();
            Ok(Value::Array(native?))
        }
        other => Err(TransferError::MalformedRecord(format!(
            "attribute '{}' carries unknown type tag '{}'",
            attr, other
        ))),
    }
}

fn untag_number(attr: &str, value: &Value) -> Result<Value> {
    let literal = value.as_str().ok_or_else(|| {
        TransferError::MalformedRecord(format!(
            "attribute '{}': N payload is not a string literal",
            attr
        ))
    })?;
    if let Ok(int) = literal.parse::<i64>() {
        return Ok(json!(int));
    }
    literal
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| {
            TransferError::MalformedRecord(format!(
                "attribute '{}': '{}' is not a numeric literal",
                attr, literal
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_to_wire_tagged() {
        let record = json!({
            "id": 1,
            "name": "Alice",
            "active": true,
            "note": null,
            "scores": [1, 2.5],
            "address": {"city": "Springfield"}
        });
        let tagged = record_to_wire_tagged(&record).unwrap();

        assert_eq!(tagged["id"], json!({"N": "1"}));
        assert_eq!(tagged["name"], json!({"S": "Alice"}));
        assert_eq!(tagged["active"], json!({"BOOL": true}));
        assert_eq!(tagged["note"], json!({"NULL": true}));
        assert_eq!(tagged["scores"], json!({"L": [{"N": "1"}, {"N": "2.5"}]}));
        assert_eq!(tagged["address"], json!({"M": {"city": {"S": "Springfield"}}}));
    }

    #[test]
    fn test_record_to_wire_tagged_rejects_non_object() {
        assert!(matches!(
            record_to_wire_tagged(&json!([1, 2])).unwrap_err(),
            TransferError::MalformedRecord(_)
        ));
    }

    #[test]
    fn test_record_from_wire_tagged() {
        let item = json!({
            "id": {"N": "1"},
            "name": {"S": "Alice"},
            "ratio": {"N": "0.5"},
            "tags": {"SS": ["a", "b"]},
            "counts": {"NS": ["1", "2"]},
            "meta": {"M": {"flag": {"BOOL": false}}}
        });
        let native = record_from_wire_tagged(item.as_object().unwrap()).unwrap();

        assert_eq!(
            native,
            json!({
                "id": 1,
                "name": "Alice",
                "ratio": 0.5,
                "tags": ["a", "b"],
                "counts": [1, 2],
                "meta": {"flag": false}
            })
        );
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let item = json!({"payload": {"XX": "?"}});
        assert!(matches!(
            record_from_wire_tagged(item.as_object().unwrap()).unwrap_err(),
            TransferError::MalformedRecord(_)
        ));
    }
}
