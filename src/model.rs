//! Schemas (named fields) and models (a schema bound to a root).
//!
//! A [`Schema`] is built once and shared; each [`Model`] owns its connection and the
//! result of its last validation.

use crate::cast::CastError;
use crate::connection::ConnectionDict;
use crate::consistency::{self, FieldErrors};
use crate::field::{Direction, Field};
use crate::path::PathError;
use crate::value::{NodeKind, Value};
use indexmap::IndexMap;
use log::debug;
use std::sync::Arc;

const DICT_FORMAT: &str = "dict";
const JSON_FORMAT: &str = "json";

#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    #[error("Execute validate method.")]
    NotValidated,
    #[error("Inconsistent casts in {} field(s): {:?}", .0.len(), .0)]
    Inconsistent(FieldErrors),
    #[error("Unknown field: {0:?}")]
    UnknownField(String),
    #[error("No root connected for field {0:?}")]
    NotConnected(String),
    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("Path: {0}")]
    Path(#[from] PathError),
    #[error("Cast: {0}")]
    Cast(#[from] CastError),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered registry of named fields.
#[derive(Debug, Default)]
pub struct Schema {
    fields: IndexMap<String, Arc<Field>>,
    asdict: bool,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn field(&self, name: &str) -> Option<&Arc<Field>> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Roots are mappings when set, attribute bags otherwise.
    pub fn asdict(&self) -> bool {
        self.asdict
    }

    pub fn kind(&self) -> NodeKind {
        if self.asdict {
            NodeKind::Mapping
        } else {
            NodeKind::Attributes
        }
    }

    /// Name under which `field` is registered (by identity, not by value).
    pub fn name_of(&self, field: &Field) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, candidate)| std::ptr::eq(candidate.as_ref(), field))
            .map(|(name, _)| name.as_str())
    }

    /// Cast arity errors and cross-field consistency errors, per field in declaration order.
    pub fn validate(&self) -> FieldErrors {
        let mut inconsistent = consistency::check(self.fields());
        let mut errors = FieldErrors::new();
        for (name, field) in self.fields() {
            let mut messages = Vec::new();
            if let Err(e) = field.validate() {
                debug!("field {} failed validation: {}", name, e);
                messages.push(e.to_string());
            }
            if let Some(more) = inconsistent.shift_remove(name) {
                messages.extend(more);
            }
            if !messages.is_empty() {
                errors.insert(name.to_string(), messages);
            }
        }
        errors
    }

    /// Fail with [`MapperError::Inconsistent`] when fields disagree on shared casts.
    pub fn ensure_consistent(&self) -> Result<(), MapperError> {
        let errors = consistency::check(self.fields());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MapperError::Inconsistent(errors))
        }
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: IndexMap<String, Arc<Field>>,
    asdict: bool,
}

impl SchemaBuilder {
    pub fn field(self, name: impl Into<String>, field: Field) -> Self {
        self.shared_field(name, Arc::new(field))
    }

    /// Register a field that is also used by other schemas.
    pub fn shared_field(mut self, name: impl Into<String>, field: Arc<Field>) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    pub fn asdict(mut self, asdict: bool) -> Self {
        self.asdict = asdict;
        self
    }

    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema {
            fields: self.fields,
            asdict: self.asdict,
        })
    }
}

/// What a model reads from and writes to.
#[derive(Debug, Clone)]
pub enum Connection {
    /// One root shared by every field; `Null` until connected or first set.
    Single(Value),
    /// One root per field name.
    PerField(ConnectionDict),
}

#[derive(Debug, Clone)]
pub struct Model {
    schema: Arc<Schema>,
    connection: Connection,
    errors: Option<FieldErrors>,
    metadata: IndexMap<String, Value>,
}

impl Model {
    pub fn new(schema: Arc<Schema>) -> Self {
        Model {
            schema,
            connection: Connection::Single(Value::Null),
            errors: None,
            metadata: IndexMap::new(),
        }
    }

    pub fn connected(schema: Arc<Schema>, root: Value) -> Self {
        let mut model = Model::new(schema);
        model.connect(root);
        model
    }

    /// A fresh model with each `(name, value)` set in order.
    pub fn from_fields<K, V, I>(schema: Arc<Schema>, values: I) -> Result<Self, MapperError>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut model = Model::new(schema);
        for (name, value) in values {
            model.set_field(name.as_ref(), value.into())?;
        }
        Ok(model)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn connect(&mut self, root: Value) {
        self.connection = Connection::Single(root);
    }

    pub fn connect_dict(&mut self, mut roots: ConnectionDict) {
        roots.assign(Arc::clone(&self.schema));
        self.connection = Connection::PerField(roots);
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The single root, once one is connected or bootstrapped.
    pub fn connected_object(&self) -> Option<&Value> {
        match &self.connection {
            Connection::Single(root) if !root.is_null() => Some(root),
            _ => None,
        }
    }

    pub fn into_connected(self) -> Connection {
        self.connection
    }

    pub fn metadata(&self) -> &IndexMap<String, Value> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    fn field(&self, name: &str) -> Result<Arc<Field>, MapperError> {
        self.schema
            .field(name)
            .cloned()
            .ok_or_else(|| MapperError::UnknownField(name.to_string()))
    }

    /// The root `name` reads from. An unset (`Null`) root is not connected.
    fn root<'a>(&'a self, name: &'a str) -> Result<&'a Value, MapperError> {
        let root = match &self.connection {
            Connection::Single(root) => Some(root),
            Connection::PerField(roots) => roots.get(name),
        };
        root.filter(|root| !root.is_null())
            .ok_or_else(|| MapperError::NotConnected(name.to_string()))
    }

    /// The root `name` writes to, inserted unset into a per-field connection when absent.
    fn root_mut(&mut self, name: &str) -> &mut Value {
        match &mut self.connection {
            Connection::Single(root) => root,
            Connection::PerField(roots) => roots.root_mut(name),
        }
    }

    pub fn get_field(&self, name: &str) -> Result<Value, MapperError> {
        let field = self.field(name)?;
        Ok(field.get(self.root(name)?)?)
    }

    /// Set a field. Its root is bootstrapped when unset, and missing containers are
    /// created in the schema's mode (mappings with `asdict`, attribute bags otherwise).
    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), MapperError> {
        let field = self.field(name)?;
        let kind = self.schema.kind();
        let root = self.root_mut(name);
        field.bootstrap(root, kind)?;
        field.set_in(root, value, kind)?;
        Ok(())
    }

    /// Delete a field's value. Fails with [`MapperError::NotConnected`] without touching
    /// the connection when the field has no root.
    pub fn delete_field(&mut self, name: &str) -> Result<Value, MapperError> {
        let field = self.field(name)?;
        let root = match &mut self.connection {
            Connection::Single(root) => Some(root),
            Connection::PerField(roots) => roots.get_mut(name),
        };
        let root = root
            .filter(|root| !root.is_null())
            .ok_or_else(|| MapperError::NotConnected(name.to_string()))?;
        Ok(field.delete(root)?)
    }

    /// Run per-field and cross-field validation and keep the result for [`Model::errors`].
    pub fn validate(&mut self) -> &FieldErrors {
        let errors = self.schema.validate();
        self.errors.insert(errors)
    }

    pub fn errors(&self) -> Result<&FieldErrors, MapperError> {
        self.errors.as_ref().ok_or(MapperError::NotValidated)
    }

    /// Readable, non-excluded fields with their values, in declaration order.
    fn exported<'a>(&'a self, format: &'a str) -> impl Iterator<Item = (&'a str, &'a Field, Value)> + 'a {
        self.schema
            .fields()
            .filter(move |(_, field)| !field.is_excluded(Direction::Serialize, format))
            .filter_map(move |(name, field)| match self.get_field(name) {
                Ok(value) => Some((name, field, value)),
                Err(e) => {
                    debug!("skipping {} ({})", name, e);
                    None
                }
            })
    }

    fn deserialize<V, I, F>(schema: Arc<Schema>, format: &str, values: I, import: F) -> Result<Self, MapperError>
    where
        I: IntoIterator<Item = (String, V)>,
        F: Fn(&Field, V) -> Result<Value, CastError>,
    {
        let mut model = Model::new(schema);
        for (name, value) in values {
            let Some(field) = model.schema.field(&name).cloned() else {
                continue;
            };
            if field.is_excluded(Direction::Deserialize, format) {
                continue;
            }
            let value = import(&*field, value)?;
            model.set_field(&name, value)?;
        }
        Ok(model)
    }

    /// Every readable, non-excluded field by name. Unreadable fields are skipped; values
    /// of a cast with dict hooks are rendered through them.
    pub fn to_dict(&self) -> Result<IndexMap<String, Value>, MapperError> {
        self.exported(DICT_FORMAT)
            .map(|(name, field, value)| -> Result<(String, Value), MapperError> {
                let value = match field.serde_cast() {
                    Some(cast) => cast.export_dict(value)?,
                    None => value,
                };
                Ok((name.to_string(), value))
            })
            .collect()
    }

    /// A new model with every known, non-excluded entry of `values` set. Unknown names are ignored.
    pub fn from_dict(schema: Arc<Schema>, values: IndexMap<String, Value>) -> Result<Self, MapperError> {
        Model::deserialize(schema, DICT_FORMAT, values, |field, value| match field.serde_cast() {
            Some(cast) => cast.import_dict(value),
            None => Ok(value),
        })
    }

    /// JSON object of [`Model::to_dict`]'s fields. Cast hooks are tried JSON first, then dict.
    pub fn to_json(&self) -> Result<String, MapperError> {
        let object = self
            .exported(JSON_FORMAT)
            .map(|(name, field, value)| -> Result<(String, serde_json::Value), MapperError> {
                let value = match field.serde_cast() {
                    Some(cast) => cast.export_json(value)?,
                    None => serde_json::Value::from(value),
                };
                Ok((name.to_string(), value))
            })
            .collect::<Result<serde_json::Map<String, serde_json::Value>, MapperError>>()?;
        Ok(serde_json::to_string(&object)?)
    }

    pub fn from_json(schema: Arc<Schema>, json: &str) -> Result<Self, MapperError> {
        let object = match serde_json::from_str::<serde_json::Value>(json)? {
            serde_json::Value::Object(object) => object,
            other => return Err(MapperError::NotAnObject(json_type(&other))),
        };
        Model::deserialize(schema, JSON_FORMAT, object, |field, value| match field.serde_cast() {
            Some(cast) => cast.import_json(value),
            None => Ok(Value::from(value)),
        })
    }

    /// `serialize(self.to_dict()?)`.
    pub fn dumps<T, F>(&self, serialize: F) -> Result<T, MapperError>
    where
        F: FnOnce(IndexMap<String, Value>) -> T,
    {
        Ok(serialize(self.to_dict()?))
    }

    /// `Model::from_dict(schema, deserialize(data)?)`.
    pub fn loads<D, F>(schema: Arc<Schema>, deserialize: F, data: D) -> Result<Self, MapperError>
    where
        F: FnOnce(D) -> Result<IndexMap<String, Value>, MapperError>,
    {
        Model::from_dict(schema, deserialize(data)?)
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
