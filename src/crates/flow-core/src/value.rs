//! The typed value carrier plumbed between nodes.
//!
//! Per spec §9 ("Per-node heterogeneous outputs → tagged variants or erased
//! handle"), Flow uses a single erased value type, [`FlowValue`], everywhere
//! the graph passes data between nodes or to the value store. A node kind
//! declares the [`ValueType`] of each of its parameters and its output;
//! `Graph` checks bindings against those declarations once, at construction
//! time (spec §3's "checked once before the first execution touches that
//! node").
//!
//! `FlowValue` converts losslessly to and from `serde_json::Value` for the
//! shapes JSON already has a native representation for. The one exception is
//! `Bytes`, which a node kind uses via its `encode`/`decode` hooks (spec
//! §4.2, §6) when its real output isn't naturally JSON — Flow stores bytes
//! as a base64 string and never tries to interpret them itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// The static type tag of a [`FlowValue`], used for signature checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Bytes,
    List,
    Map,
}

/// An erased value flowing between nodes, or held by a constant node.
///
/// Wire conversion goes through [`FlowValue::to_json`]/[`FlowValue::from_json`],
/// not `serde`: a derived `Serialize` would render `Bytes` as a JSON array of
/// byte values rather than the base64 string `to_json` produces, and
/// `from_json` wouldn't read that format back. Hence no `Serialize`/
/// `Deserialize` derive here.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<FlowValue>),
    Map(BTreeMap<String, FlowValue>),
}

impl FlowValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            FlowValue::Null => ValueType::Null,
            FlowValue::Bool(_) => ValueType::Bool,
            FlowValue::Int(_) => ValueType::Int,
            FlowValue::Float(_) => ValueType::Float,
            FlowValue::Str(_) => ValueType::Str,
            FlowValue::Bytes(_) => ValueType::Bytes,
            FlowValue::List(_) => ValueType::List,
            FlowValue::Map(_) => ValueType::Map,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FlowValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FlowValue::Float(v) => Some(*v),
            FlowValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FlowValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Render this value as canonical JSON for fingerprinting: object keys
    /// sorted (order-independent mappings), array order preserved
    /// (order-preserving sequences), as spec §4.1 requires. `BTreeMap`
    /// already iterates in sorted key order, so this is a direct transcode.
    pub fn to_json(&self) -> Json {
        match self {
            FlowValue::Null => Json::Null,
            FlowValue::Bool(v) => Json::Bool(*v),
            FlowValue::Int(v) => Json::Number((*v).into()),
            FlowValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            FlowValue::Str(v) => Json::String(v.clone()),
            FlowValue::Bytes(v) => Json::String(base64_encode(v)),
            FlowValue::List(items) => Json::Array(items.iter().map(FlowValue::to_json).collect()),
            FlowValue::Map(entries) => {
                Json::Object(entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
            }
        }
    }

    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => FlowValue::Null,
            Json::Bool(b) => FlowValue::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    FlowValue::Int(i)
                } else {
                    FlowValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Json::String(s) => FlowValue::Str(s.clone()),
            Json::Array(items) => FlowValue::List(items.iter().map(FlowValue::from_json).collect()),
            Json::Object(map) => {
                FlowValue::Map(map.iter().map(|(k, v)| (k.clone(), FlowValue::from_json(v))).collect())
            }
        }
    }
}

impl From<i64> for FlowValue {
    fn from(v: i64) -> Self {
        FlowValue::Int(v)
    }
}

impl From<f64> for FlowValue {
    fn from(v: f64) -> Self {
        FlowValue::Float(v)
    }
}

impl From<bool> for FlowValue {
    fn from(v: bool) -> Self {
        FlowValue::Bool(v)
    }
}

impl From<String> for FlowValue {
    fn from(v: String) -> Self {
        FlowValue::Str(v)
    }
}

impl From<&str> for FlowValue {
    fn from(v: &str) -> Self {
        FlowValue::Str(v.to_string())
    }
}

/// Minimal, dependency-free base64 (standard alphabet, padded) — just enough
/// to give `Bytes` a canonical textual rendering for fingerprinting and JSON
/// storage without pulling in a crate the teacher's stack doesn't carry.
fn base64_encode(bytes: &[u8]) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        let n = ((b0 as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32);
        out.push(ALPHABET[(n >> 18 & 0x3f) as usize] as char);
        out.push(ALPHABET[(n >> 12 & 0x3f) as usize] as char);
        out.push(if chunk.len() > 1 { ALPHABET[(n >> 6 & 0x3f) as usize] as char } else { '=' });
        out.push(if chunk.len() > 2 { ALPHABET[(n & 0x3f) as usize] as char } else { '=' });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let v = FlowValue::Map(BTreeMap::from([
            ("a".to_string(), FlowValue::Int(1)),
            ("b".to_string(), FlowValue::List(vec![FlowValue::Str("x".into()), FlowValue::Bool(true)])),
        ]));
        let json = v.to_json();
        assert_eq!(FlowValue::from_json(&json), v);
    }

    #[test]
    fn map_rendering_is_key_order_independent() {
        let a = FlowValue::Map(BTreeMap::from([
            ("x".to_string(), FlowValue::Int(1)),
            ("y".to_string(), FlowValue::Int(2)),
        ]));
        let b = FlowValue::Map(BTreeMap::from([
            ("y".to_string(), FlowValue::Int(2)),
            ("x".to_string(), FlowValue::Int(1)),
        ]));
        assert_eq!(a.to_json(), b.to_json());
    }

    #[test]
    fn list_rendering_preserves_order() {
        let a = FlowValue::List(vec![FlowValue::Int(1), FlowValue::Int(2)]);
        let b = FlowValue::List(vec![FlowValue::Int(2), FlowValue::Int(1)]);
        assert_ne!(a.to_json(), b.to_json());
    }

    #[test]
    fn bytes_render_as_base64() {
        let v = FlowValue::Bytes(vec![0, 1, 2, 3]);
        assert_eq!(v.to_json(), Json::String("AAECAw==".to_string()));
    }
}
