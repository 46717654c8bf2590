//! Canonical textual form.
//!
//! A node renders to a human-readable key/value tree with typed literals:
//! every leaf becomes a `{"dtype": <kind>, "value": <literal>}` object, so
//! element kinds survive the round trip exactly. Structure, names, kinds
//! and values are preserved; offset/stride packing is not (parsed trees are
//! compact and owned). This is the surface a separate I/O layer maps to
//! HDF5 groups/datasets, YAML or JSON.

use serde_json::{json, Map, Value};

use crate::error::BlueprintError;
use crate::node::accessor::ScalarValue;
use crate::node::dtype::{DTypeId, DataType};
use crate::node::node::Node;

fn scalar_to_json(v: ScalarValue) -> Value {
    match v {
        ScalarValue::I64(x) => json!(x),
        ScalarValue::U64(x) => json!(x),
        ScalarValue::F64(x) => {
            if x.is_finite() {
                json!(x)
            } else if x.is_nan() {
                json!("nan")
            } else if x > 0.0 {
                json!("inf")
            } else {
                json!("-inf")
            }
        }
    }
}

fn json_to_scalar(v: &Value) -> Result<ScalarValue, BlueprintError> {
    match v {
        Value::Number(n) => {
            if let Some(x) = n.as_i64() {
                Ok(ScalarValue::I64(x))
            } else if let Some(x) = n.as_u64() {
                Ok(ScalarValue::U64(x))
            } else if let Some(x) = n.as_f64() {
                Ok(ScalarValue::F64(x))
            } else {
                Err(BlueprintError::Parse(format!("unrepresentable number {n}")))
            }
        }
        Value::String(s) => match s.as_str() {
            "nan" => Ok(ScalarValue::F64(f64::NAN)),
            "inf" => Ok(ScalarValue::F64(f64::INFINITY)),
            "-inf" => Ok(ScalarValue::F64(f64::NEG_INFINITY)),
            other => Err(BlueprintError::Parse(format!("expected number, got `{other}`"))),
        },
        other => Err(BlueprintError::Parse(format!("expected number, got {other}"))),
    }
}

impl Node {
    /// Render to the canonical JSON value tree.
    pub fn to_json_value(&self) -> Value {
        if self.is_object() {
            let mut map = Map::new();
            for (name, child) in self.entries() {
                map.insert(name.unwrap_or("").to_string(), child.to_json_value());
            }
            Value::Object(map)
        } else if self.is_list() {
            Value::Array(self.children().map(Node::to_json_value).collect())
        } else if self.dtype().is_string() {
            json!({
                "dtype": self.dtype().id().name(),
                "value": self.as_str().unwrap_or(""),
            })
        } else if self.is_leaf() {
            let n = self.dtype().num_elements();
            let value = if n == 1 {
                self.element(0).map(scalar_to_json).unwrap_or(Value::Null)
            } else {
                Value::Array(
                    (0..n)
                        .map(|i| self.element(i).map(scalar_to_json).unwrap_or(Value::Null))
                        .collect(),
                )
            };
            json!({ "dtype": self.dtype().id().name(), "value": value })
        } else {
            Value::Null
        }
    }

    /// Rebuild a node from the canonical JSON value tree.
    pub fn from_json_value(value: &Value) -> Result<Node, BlueprintError> {
        let mut out = Node::new();
        match value {
            Value::Null => {}
            Value::Object(map) => {
                let leaf_kind = map
                    .get("dtype")
                    .and_then(Value::as_str)
                    .and_then(DTypeId::from_name);
                if let (Some(kind), Some(v), 2) = (leaf_kind, map.get("value"), map.len()) {
                    parse_leaf(&mut out, kind, v)?;
                } else {
                    out.dtype = DataType::object();
                    for (name, child) in map {
                        *out.fetch_mut(name) = Node::from_json_value(child)?;
                    }
                }
            }
            Value::Array(items) => {
                out.dtype = DataType::list();
                for item in items {
                    *out.append() = Node::from_json_value(item)?;
                }
            }
            other => {
                return Err(BlueprintError::Parse(format!("unexpected literal {other}")));
            }
        }
        Ok(out)
    }

    /// Canonical text: pretty-printed JSON of [`Node::to_json_value`].
    pub fn to_text(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value())
            .unwrap_or_else(|_| "null".to_string())
    }

    /// Inverse of [`Node::to_text`].
    pub fn parse(text: &str) -> Result<Node, BlueprintError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| BlueprintError::Parse(e.to_string()))?;
        Node::from_json_value(&value)
    }
}

fn parse_leaf(out: &mut Node, kind: DTypeId, value: &Value) -> Result<(), BlueprintError> {
    if kind == DTypeId::Char8 {
        let s = value
            .as_str()
            .ok_or_else(|| BlueprintError::Parse("char8_str payload must be a string".into()))?;
        out.set_string(s);
        return Ok(());
    }
    if !kind.is_number() {
        return Err(BlueprintError::Parse(format!("`{}` cannot be a leaf", kind.name())));
    }
    let elements: Vec<ScalarValue> = match value {
        Value::Array(items) => items.iter().map(json_to_scalar).collect::<Result<_, _>>()?,
        single => vec![json_to_scalar(single)?],
    };
    out.set_dtype(&DataType::new(kind, elements.len()));
    for (i, v) in elements.into_iter().enumerate() {
        out.set_element(i, v)?;
    }
    Ok(())
}
