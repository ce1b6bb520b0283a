//! Runtime values the mapper walks: scalars, sequences, mappings and attribute bags.
//!
//! Mappings (`Value::Map`) and attribute bags (`Value::Object`) share one ordered
//! [`Record`] representation; traversal code reaches both through [`Node`] / [`NodeMut`],
//! which only differ in the lookup error they report.

use crate::path::PathError;
use indexmap::map::Entry;
use indexmap::IndexMap;
use std::fmt;

/// Ordered name → value storage.
pub type Entries = IndexMap<String, Value>;

/// Entries of a mapping or attribute bag, tagged with an optional class name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    class: Option<String>,
    entries: Entries,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn with_class(class: impl Into<String>) -> Self {
        Record {
            class: Some(class.into()),
            entries: Entries::new(),
        }
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn set_class(&mut self, class: Option<String>) {
        self.class = class;
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.into(), value.into())
    }

    /// Remove an entry, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.entries.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    pub fn into_entries(self) -> Entries {
        self.entries
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            class: None,
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// A sequence, tagged with an optional class name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List {
    class: Option<String>,
    items: Vec<Value>,
}

impl List {
    pub fn new() -> Self {
        List::default()
    }

    pub fn with_class(class: impl Into<String>) -> Self {
        List {
            class: Some(class.into()),
            items: Vec::new(),
        }
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn set_class(&mut self, class: Option<String>) {
        self.class = class;
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.items.get_mut(index)
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.items.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Grow with `Null` until `index` is in range, then return that slot. `None` when
    /// `index + 1` overflows.
    pub fn pad_to(&mut self, index: usize) -> Option<&mut Value> {
        let len = index.checked_add(1)?;
        if self.items.len() < len {
            self.items.resize(len, Value::Null);
        }
        self.items.get_mut(index)
    }

    /// Drop the trailing run of `Null` slots.
    pub fn trim_nulls(&mut self) {
        while matches!(self.items.last(), Some(Value::Null)) {
            self.items.pop();
        }
    }
}

impl<V: Into<Value>> FromIterator<V> for List {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        List {
            class: None,
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single mapped value (scalar or container).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Unset slot; also pads sequences.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(List),
    /// Mapping node: looked up by key.
    Map(Record),
    /// Attribute bag: looked up by attribute name.
    Object(Record),
}

impl Value {
    /// Empty mapping.
    pub fn map() -> Self {
        Value::Map(Record::new())
    }

    /// Empty generic attribute bag.
    pub fn object() -> Self {
        Value::Object(Record::new())
    }

    pub fn list<V: Into<Value>>(items: impl IntoIterator<Item = V>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_) | Value::Object(_))
    }

    /// Short type label used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Object(_) => "object",
        }
    }

    /// Class name of a container, if it carries one.
    pub fn class(&self) -> Option<&str> {
        match self {
            Value::List(l) => l.class(),
            Value::Map(r) | Value::Object(r) => r.class(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Entries of a mapping or attribute bag.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Map(r) | Value::Object(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Map(r) | Value::Object(r) => Some(r),
            _ => None,
        }
    }

    /// Key lookup on a mapping.
    pub fn key(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Map(r) => r.get(name),
            _ => None,
        }
    }

    /// Attribute lookup on an attribute bag.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(r) => r.get(name),
            _ => None,
        }
    }

    /// Sequence subscript.
    pub fn at(&self, index: usize) -> Option<&Value> {
        self.as_list().and_then(|l| l.get(index))
    }

    pub fn node(&self) -> Option<Node<'_>> {
        match self {
            Value::Map(record) => Some(Node { kind: NodeKind::Mapping, record }),
            Value::Object(record) => Some(Node { kind: NodeKind::Attributes, record }),
            _ => None,
        }
    }

    pub fn node_mut(&mut self) -> Option<NodeMut<'_>> {
        match self {
            Value::Map(record) => Some(NodeMut { kind: NodeKind::Mapping, record }),
            Value::Object(record) => Some(NodeMut { kind: NodeKind::Attributes, record }),
            _ => None,
        }
    }

    /// Recursively turn every mapping into an attribute bag (class names are kept).
    pub fn into_objects(self) -> Value {
        match self {
            Value::Map(record) | Value::Object(record) => Value::Object(Record {
                class: record.class,
                entries: record
                    .entries
                    .into_iter()
                    .map(|(k, v)| (k, v.into_objects()))
                    .collect(),
            }),
            Value::List(list) => Value::List(List {
                class: list.class,
                items: list.items.into_iter().map(Value::into_objects).collect(),
            }),
            other => other,
        }
    }
}

/// Whether a container node is looked up by key or by attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Mapping,
    Attributes,
}

impl NodeKind {
    /// Mapping mode for a `Map` root; attribute mode for anything else (including an unset root).
    pub fn of(root: &Value) -> Self {
        match root {
            Value::Map(_) => NodeKind::Mapping,
            _ => NodeKind::Attributes,
        }
    }

    pub(crate) fn missing(self, name: &str) -> PathError {
        match self {
            NodeKind::Mapping => PathError::MissingKey(name.to_string()),
            NodeKind::Attributes => PathError::MissingAttribute(name.to_string()),
        }
    }
}

/// Read view of a mapping or attribute bag.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    kind: NodeKind,
    record: &'a Record,
}

impl<'a> Node<'a> {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn has(&self, name: &str) -> bool {
        self.record.contains(name)
    }

    pub fn get(&self, name: &str) -> Result<&'a Value, PathError> {
        self.record.get(name).ok_or_else(|| self.kind.missing(name))
    }
}

/// Write view of a mapping or attribute bag.
#[derive(Debug)]
pub struct NodeMut<'a> {
    kind: NodeKind,
    record: &'a mut Record,
}

impl<'a> NodeMut<'a> {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn has(&self, name: &str) -> bool {
        self.record.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.record.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<&Value, PathError> {
        self.record.get(name).ok_or_else(|| self.kind.missing(name))
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.record.insert(name, value);
    }

    pub fn delete(&mut self, name: &str) -> Result<Value, PathError> {
        self.record.remove(name).ok_or_else(|| self.kind.missing(name))
    }

    /// The slot holding `name`, for the lifetime of the node.
    pub fn into_slot(self, name: &str) -> Result<&'a mut Value, PathError> {
        let NodeMut { kind, record } = self;
        record.entries.get_mut(name).ok_or_else(|| kind.missing(name))
    }

    /// The slot holding `name`, created with `vivify` when absent.
    pub fn slot_or_insert_with<F>(self, name: &str, vivify: F) -> Result<&'a mut Value, PathError>
    where
        F: FnOnce() -> Result<Value, PathError>,
    {
        let record = self.record;
        match record.entries.entry(name.to_string()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => Ok(slot.insert(vivify()?)),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<List> for Value {
    fn from(l: List) -> Self {
        Value::List(l)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(v: Option<V>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// JSON objects become mappings.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => Value::Map(map.into_iter().collect()),
        }
    }
}

/// Class names are dropped; non-finite floats become `null`.
impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(l) => serde_json::Value::Array(l.items().iter().map(serde_json::Value::from).collect()),
            Value::Map(r) | Value::Object(r) => serde_json::Value::Object(
                r.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        serde_json::Value::from(&value)
    }
}

/// Strings render bare; containers render as JSON prefixed by their class name, if any.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            container => {
                if let Some(class) = container.class() {
                    write!(f, "{} ", class)?;
                }
                write!(f, "{}", serde_json::Value::from(container))
            }
        }
    }
}
