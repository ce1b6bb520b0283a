//! Per-field roots: a model connected to a [`ConnectionDict`] reads and writes each field
//! against the root stored under that field's name.

use crate::field::Field;
use crate::model::Schema;
use crate::value::Value;
use indexmap::IndexMap;
use std::sync::Arc;

/// Lookup key: a field name, or a field of the assigned schema.
#[derive(Debug, Clone, Copy)]
pub enum ConnectionKey<'a> {
    Name(&'a str),
    Field(&'a Field),
}

impl<'a> From<&'a str> for ConnectionKey<'a> {
    fn from(name: &'a str) -> Self {
        ConnectionKey::Name(name)
    }
}

impl<'a> From<&'a Field> for ConnectionKey<'a> {
    fn from(field: &'a Field) -> Self {
        ConnectionKey::Field(field)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionDict {
    roots: IndexMap<String, Value>,
    schema: Option<Arc<Schema>>,
}

impl ConnectionDict {
    pub fn new() -> Self {
        ConnectionDict::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, root: Value) -> Option<Value> {
        self.roots.insert(name.into(), root)
    }

    /// Bind the schema used to resolve [`ConnectionKey::Field`] lookups. Models call this
    /// when they are connected to the dict.
    pub fn assign(&mut self, schema: Arc<Schema>) {
        self.schema = Some(schema);
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    fn name_of<'a>(&'a self, key: ConnectionKey<'a>) -> Option<&'a str> {
        match key {
            ConnectionKey::Name(name) => Some(name),
            ConnectionKey::Field(field) => self.schema.as_deref()?.name_of(field),
        }
    }

    pub fn get<'a>(&'a self, key: impl Into<ConnectionKey<'a>>) -> Option<&'a Value> {
        let name = self.name_of(key.into())?;
        self.roots.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.roots.get_mut(name)
    }

    pub fn contains<'a>(&'a self, key: impl Into<ConnectionKey<'a>>) -> bool {
        self.get(key).is_some()
    }

    /// The root stored under `name`, inserting an unset one when absent.
    pub(crate) fn root_mut(&mut self, name: &str) -> &mut Value {
        self.roots.entry(name.to_string()).or_default()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.roots.iter()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ConnectionDict {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        ConnectionDict {
            roots: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            schema: None,
        }
    }
}
