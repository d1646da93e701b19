//! Runtime data model: the values templates are rendered against
//!
//! Containers are reference-counted so pushing a value onto the context
//! stack is cheap. Values convert from primitives, collections and
//! `serde_json::Value`, and deserialize from any serde format (the CLI reads
//! JSON and TOML).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};

/// Getter capability for opaque model objects.
///
/// Consulted only when `model_get` is enabled; a model exposes no direct
/// properties of its own.
pub trait Model: fmt::Debug + Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
}

type PlainFn = dyn Fn(&Value) -> Value + Send + Sync;
type HigherFn = dyn Fn(&Value, &str) -> String + Send + Sync;

/// A callable value
#[derive(Clone)]
pub enum Lambda {
    /// Called with the innermost context. If it returns another lambda,
    /// that one is treated as higher-order.
    Plain(Arc<PlainFn>),
    /// Receives the raw source of the section it is used in (empty for
    /// variables) and returns template text that is compiled and rendered
    /// in place. Works the same whether found directly in the data or
    /// returned from a plain lambda.
    Higher(Arc<HigherFn>),
}

impl Lambda {
    pub fn plain(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Lambda::Plain(Arc::new(f))
    }

    pub fn higher(f: impl Fn(&Value, &str) -> String + Send + Sync + 'static) -> Self {
        Lambda::Higher(Arc::new(f))
    }

    /// First-stage call made when a lookup lands on this lambda. A
    /// higher-order lambda is its own first stage.
    pub(crate) fn invoke(&self, receiver: &Value) -> Value {
        match self {
            Lambda::Plain(f) => f(receiver),
            Lambda::Higher(_) => Value::Lambda(self.clone()),
        }
    }

    /// Second-stage call producing template source from `text`
    pub(crate) fn expand(&self, receiver: &Value, text: &str) -> String {
        match self {
            Lambda::Plain(f) => f(receiver).to_string(),
            Lambda::Higher(f) => f(receiver, text),
        }
    }

    fn ptr_eq(&self, other: &Lambda) -> bool {
        match (self, other) {
            (Lambda::Plain(a), Lambda::Plain(b)) => Arc::ptr_eq(a, b),
            (Lambda::Higher(a), Lambda::Higher(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lambda::Plain(_) => f.write_str("Lambda::Plain(..)"),
            Lambda::Higher(_) => f.write_str("Lambda::Higher(..)"),
        }
    }
}

/// A value a template can look up, test and print
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Arc<Vec<Value>>),
    Map(Arc<HashMap<String, Value>>),
    Lambda(Lambda),
    Model(Arc<dyn Model>),
}

impl Value {
    /// Build a map value from key/value pairs
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(Arc::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::List(Arc::new(items.into_iter().map(Into::into).collect()))
    }

    pub fn model(model: impl Model + 'static) -> Self {
        Value::Model(Arc::new(model))
    }

    /// Return this map with `key` set. Non-map values become a one-entry map.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = match self {
            Value::Map(map) => map,
            _ => Arc::new(HashMap::new()),
        };
        Arc::make_mut(&mut map).insert(key.into(), value.into());
        Value::Map(map)
    }

    /// Truthiness used by sections
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Lambda(_) | Value::Model(_) => true,
        }
    }

    /// Structured values get pushed as a new scope when a section opens
    pub fn is_object(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_) | Value::Model(_))
    }

    pub fn is_empty_list(&self) -> bool {
        matches!(self, Value::List(items) if items.is_empty())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Direct property access (no getter fallback)
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Map(map) => map.get(key).cloned(),
            Value::List(items) if key == "length" => Some(Value::Int(items.len() as i64)),
            Value::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) if x.is_infinite() => {
                f.write_str(if *x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Map(_) | Value::Lambda(_) | Value::Model(_) => Ok(()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Lambda(a), Value::Lambda(b)) => a.ptr_eq(b),
            (Value::Model(a), Value::Model(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }
}

impl From<HashMap<String, Value>> for Value {
    fn from(map: HashMap<String, Value>) -> Self {
        Value::Map(Arc::new(map))
    }
}

impl From<Lambda> for Value {
    fn from(lambda: Lambda) -> Self {
        Value::Lambda(lambda)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(Arc::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Value::Map(Arc::new(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any template data value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(i64::try_from(v).map_or(Value::Float(v as f64), Value::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(Arc::new(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = HashMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, Value>()? {
            map.insert(key, value);
        }
        Ok(Value::Map(Arc::new(map)))
    }
}
