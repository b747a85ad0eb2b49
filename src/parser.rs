//! Response normalization.
//!
//! The SOAP transport decodes every reply into a tree of [`SoapNode`]s:
//! wrapped single items, key/value pairs, typed arrays and plain
//! sequences of pairs. [`normalize`] reduces that tree into plain JSON
//! mappings and arrays so callers never see the wire structure.

use crate::error::{SubregError, SubregResult};
use serde_json::{Map, Value};

/// Decoded form of one node of a SOAP response tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SoapNode {
    /// Leaf value; strings and integers pass through normalization unchanged
    Scalar(Value),
    /// A single wrapped item
    Item(Box<SoapNode>),
    /// A key/value struct member
    Pair { key: String, value: Box<SoapNode> },
    /// A typed array; keeps element order
    Array(Vec<SoapNode>),
    /// A plain sequence of pair nodes, merged into one mapping
    Seq(Vec<SoapNode>),
}

impl SoapNode {
    pub fn string(value: impl Into<String>) -> Self {
        SoapNode::Scalar(Value::String(value.into()))
    }

    pub fn int(value: i64) -> Self {
        SoapNode::Scalar(Value::from(value))
    }

    pub fn pair(key: impl Into<String>, value: SoapNode) -> Self {
        SoapNode::Pair {
            key: key.into(),
            value: Box::new(value),
        }
    }
}

/// Reduce a decoded SOAP tree into plain mappings and arrays.
///
/// A bare scalar (or any shape with no mapping interpretation) reduces
/// to an empty mapping, so malformed replies surface as an empty
/// envelope rather than a panic.
pub fn normalize(node: &SoapNode) -> Value {
    match node {
        SoapNode::Item(inner) => normalize(inner),
        SoapNode::Pair { key, value } => {
            let normalized = match value.as_ref() {
                SoapNode::Scalar(scalar) => scalar.clone(),
                other => normalize(other),
            };
            let mut map = Map::new();
            map.insert(key.clone(), normalized);
            Value::Object(map)
        }
        SoapNode::Array(items) => Value::Array(items.iter().map(normalize).collect()),
        SoapNode::Seq(items) => {
            let mut map = Map::new();
            for item in items {
                if let Value::Object(entries) = normalize(item) {
                    map.extend(entries);
                }
            }
            Value::Object(map)
        }
        SoapNode::Scalar(_) => Value::Object(Map::new()),
    }
}

/// Check the envelope status and pull out the `data` payload.
///
/// An empty or non-mapping envelope is a fatal error; an `error` status
/// becomes [`SubregError::Api`] with the server's major/minor codes.
pub fn unwrap_envelope(envelope: &Value) -> SubregResult<Value> {
    let map = match envelope.as_object() {
        Some(map) if !map.is_empty() => map,
        _ => return Err(SubregError::Fatal),
    };

    if map.get("status").and_then(Value::as_str) == Some("error") {
        let error = map.get("error");
        let errorcode = error.and_then(|e| e.get("errorcode"));
        return Err(SubregError::Api {
            major: errorcode
                .and_then(|c| c.get("major"))
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            minor: errorcode
                .and_then(|c| c.get("minor"))
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            message: error
                .and_then(|e| e.get("errormsg"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }

    Ok(map.get("data").cloned().unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_unwraps_to_inner() {
        let node = SoapNode::Item(Box::new(SoapNode::pair("status", SoapNode::string("ok"))));
        assert_eq!(normalize(&node), json!({"status": "ok"}));
    }

    #[test]
    fn test_pair_with_scalar_leaf_passes_through() {
        let node = SoapNode::pair("count", SoapNode::int(12));
        assert_eq!(normalize(&node), json!({"count": 12}));
    }

    #[test]
    fn test_pair_with_nested_structure_recurses() {
        let node = SoapNode::pair(
            "data",
            SoapNode::Seq(vec![
                SoapNode::pair("ssid", SoapNode::string("abc123")),
                SoapNode::pair("expires", SoapNode::int(3600)),
            ]),
        );
        assert_eq!(
            normalize(&node),
            json!({"data": {"ssid": "abc123", "expires": 3600}})
        );
    }

    #[test]
    fn test_typed_array_keeps_order() {
        let node = SoapNode::Array(vec![
            SoapNode::Seq(vec![SoapNode::pair("name", SoapNode::string("a.cz"))]),
            SoapNode::Seq(vec![SoapNode::pair("name", SoapNode::string("b.cz"))]),
        ]);
        assert_eq!(
            normalize(&node),
            json!([{"name": "a.cz"}, {"name": "b.cz"}])
        );
    }

    #[test]
    fn test_seq_merges_all_keys() {
        let node = SoapNode::Seq(vec![
            SoapNode::pair("status", SoapNode::string("ok")),
            SoapNode::pair("data", SoapNode::Seq(vec![
                SoapNode::pair("avail", SoapNode::int(1)),
            ])),
        ]);
        assert_eq!(
            normalize(&node),
            json!({"status": "ok", "data": {"avail": 1}})
        );
    }

    #[test]
    fn test_round_trip_preserves_leaves() {
        // Mixed nesting of pairs and arrays: every leaf survives unchanged.
        let node = SoapNode::Seq(vec![
            SoapNode::pair("status", SoapNode::string("ok")),
            SoapNode::pair(
                "data",
                SoapNode::Seq(vec![
                    SoapNode::pair("count", SoapNode::int(2)),
                    SoapNode::pair(
                        "domains",
                        SoapNode::Array(vec![
                            SoapNode::Seq(vec![
                                SoapNode::pair("name", SoapNode::string("example.cz")),
                                SoapNode::pair("expire", SoapNode::string("2026-01-01")),
                            ]),
                            SoapNode::Seq(vec![
                                SoapNode::pair("name", SoapNode::string("example.com")),
                                SoapNode::pair("expire", SoapNode::string("2027-06-15")),
                            ]),
                        ]),
                    ),
                ]),
            ),
        ]);
        assert_eq!(
            normalize(&node),
            json!({
                "status": "ok",
                "data": {
                    "count": 2,
                    "domains": [
                        {"name": "example.cz", "expire": "2026-01-01"},
                        {"name": "example.com", "expire": "2027-06-15"},
                    ],
                }
            })
        );
    }

    #[test]
    fn test_bare_scalar_defaults_to_empty_mapping() {
        assert_eq!(normalize(&SoapNode::string("stray")), json!({}));
        assert_eq!(normalize(&SoapNode::int(7)), json!({}));
    }

    #[test]
    fn test_seq_ignores_non_mapping_members() {
        let node = SoapNode::Seq(vec![
            SoapNode::pair("status", SoapNode::string("ok")),
            SoapNode::string("stray"),
        ]);
        assert_eq!(normalize(&node), json!({"status": "ok"}));
    }

    #[test]
    fn test_unwrap_envelope_error_status() {
        let envelope = json!({
            "status": "error",
            "error": {
                "errorcode": {"major": 500, "minor": 104},
                "errormsg": "Incorrect login or password",
            }
        });
        match unwrap_envelope(&envelope) {
            Err(SubregError::Api { major, minor, message }) => {
                assert_eq!(major, 500);
                assert_eq!(minor, 104);
                assert_eq!(message, "Incorrect login or password");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_unwrap_envelope_empty_is_fatal() {
        assert!(matches!(
            unwrap_envelope(&json!({})),
            Err(SubregError::Fatal)
        ));
        assert!(matches!(
            unwrap_envelope(&json!("not a mapping")),
            Err(SubregError::Fatal)
        ));
    }

    #[test]
    fn test_unwrap_envelope_ok_without_data() {
        assert_eq!(unwrap_envelope(&json!({"status": "ok"})).unwrap(), Value::Null);
    }
}
