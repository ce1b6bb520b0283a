//! Casts: named constructors used to vivify containers along a path and to coerce the
//! value read from or written to a field.
//!
//! A field declares either a single [`Cast`] (applied to the final value only) or a
//! positional list ([`SetCast::Positional`]) with one entry per flattened position:
//! the root, then each segment name, then each index.
//!
//! ```text
//! "test.user.name"  with  [TypeA, dict, TypeB, str]
//!   position 0 (root)  -> TypeA
//!   position 1 (test)  -> dict
//!   position 2 (user)  -> TypeB
//!   position 3 (name)  -> str   (the final value cast)
//! ```

use crate::value::{List, NodeKind, Record, Value};
use std::fmt;
use std::mem;
use std::sync::Arc;

type Convert = dyn Fn(Value) -> Result<Value, CastError> + Send + Sync;
type ToDict = dyn Fn(&Value) -> Result<Value, CastError> + Send + Sync;
type FromDict = dyn Fn(Value) -> Result<Value, CastError> + Send + Sync;
type ToJson = dyn Fn(&Value) -> Result<serde_json::Value, CastError> + Send + Sync;
type FromJson = dyn Fn(serde_json::Value) -> Result<Value, CastError> + Send + Sync;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CastError {
    #[error("set_cast must have {expected} entries for this path, but it has {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("No cast declared at {position} and no default type given")]
    NoDefault { position: CastPosition },
    #[error("Cast {position} is out of range ({len} casts declared)")]
    OutOfRange { position: CastPosition, len: usize },
    #[error("Cannot cast {found} to {target}")]
    Conversion { found: &'static str, target: String },
    #[error("{target}: {message}")]
    Custom { target: String, message: String },
}

/// Where along a field's flattened path a cast is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastPosition {
    At(usize),
    /// The value stored at the end of the path.
    Final,
}

impl fmt::Display for CastPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CastPosition::At(n) => write!(f, "position {}", n),
            CastPosition::Final => f.write_str("the final value"),
        }
    }
}

#[derive(Clone)]
enum CastKind {
    Mapping,
    Object,
    Sequence,
    Str,
    Int,
    Float,
    Bool,
    Custom(Arc<Convert>),
}

/// Serialization hooks carried by a cast for the values it produces.
#[derive(Clone, Default)]
struct Hooks {
    to_dict: Option<Arc<ToDict>>,
    from_dict: Option<Arc<FromDict>>,
    to_json: Option<Arc<ToJson>>,
    from_json: Option<Arc<FromJson>>,
}

impl Hooks {
    fn is_empty(&self) -> bool {
        self.to_dict.is_none() && self.from_dict.is_none() && self.to_json.is_none() && self.from_json.is_none()
    }
}

/// A named constructor/coercion.
///
/// Two casts are equal when they are of the same kind and carry the same class name;
/// custom casts compare by name. Serialization hooks do not take part.
#[derive(Clone)]
pub struct Cast {
    kind: CastKind,
    class: Option<String>,
    hooks: Hooks,
}

impl Cast {
    /// Plain mapping.
    pub fn dict() -> Self {
        Cast::with_kind(CastKind::Mapping, None)
    }

    /// Mapping tagged with a class name.
    pub fn dict_class(class: impl Into<String>) -> Self {
        Cast::with_kind(CastKind::Mapping, Some(class.into()))
    }

    /// Generic attribute bag.
    pub fn object() -> Self {
        Cast::with_kind(CastKind::Object, None)
    }

    /// Attribute bag tagged with a class name.
    pub fn object_class(class: impl Into<String>) -> Self {
        Cast::with_kind(CastKind::Object, Some(class.into()))
    }

    pub fn list() -> Self {
        Cast::with_kind(CastKind::Sequence, None)
    }

    pub fn list_class(class: impl Into<String>) -> Self {
        Cast::with_kind(CastKind::Sequence, Some(class.into()))
    }

    pub fn string() -> Self {
        Cast::with_kind(CastKind::Str, None)
    }

    pub fn int() -> Self {
        Cast::with_kind(CastKind::Int, None)
    }

    pub fn float() -> Self {
        Cast::with_kind(CastKind::Float, None)
    }

    pub fn bool() -> Self {
        Cast::with_kind(CastKind::Bool, None)
    }

    /// User conversion. A value already carrying the class `name` is considered cast;
    /// vivification calls `convert(Value::Null)`.
    pub fn custom<F>(name: impl Into<String>, convert: F) -> Self
    where
        F: Fn(Value) -> Result<Value, CastError> + Send + Sync + 'static,
    {
        Cast::with_kind(CastKind::Custom(Arc::new(convert)), Some(name.into()))
    }

    fn with_kind(kind: CastKind, class: Option<String>) -> Self {
        Cast {
            kind,
            class,
            hooks: Hooks::default(),
        }
    }

    /// Dict (de)serialization for values of this cast. `to` renders a stored value for
    /// [`Model::to_dict`](crate::Model::to_dict); `from` rebuilds it from the plain entry.
    /// JSON falls back to these when no JSON hooks are declared.
    pub fn with_dict<T, F>(mut self, to: T, from: F) -> Self
    where
        T: Fn(&Value) -> Result<Value, CastError> + Send + Sync + 'static,
        F: Fn(Value) -> Result<Value, CastError> + Send + Sync + 'static,
    {
        self.hooks.to_dict = Some(Arc::new(to));
        self.hooks.from_dict = Some(Arc::new(from));
        self
    }

    /// JSON (de)serialization for values of this cast.
    pub fn with_json<T, F>(mut self, to: T, from: F) -> Self
    where
        T: Fn(&Value) -> Result<serde_json::Value, CastError> + Send + Sync + 'static,
        F: Fn(serde_json::Value) -> Result<Value, CastError> + Send + Sync + 'static,
    {
        self.hooks.to_json = Some(Arc::new(to));
        self.hooks.from_json = Some(Arc::new(from));
        self
    }

    pub fn has_hooks(&self) -> bool {
        !self.hooks.is_empty()
    }

    pub fn name(&self) -> &str {
        if let Some(class) = &self.class {
            return class;
        }
        match self.kind {
            CastKind::Mapping => "dict",
            CastKind::Object => "object",
            CastKind::Sequence => "list",
            CastKind::Str => "str",
            CastKind::Int => "int",
            CastKind::Float => "float",
            CastKind::Bool => "bool",
            CastKind::Custom(_) => "custom",
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, CastKind::Sequence)
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, CastKind::Mapping | CastKind::Object | CastKind::Sequence)
    }

    /// Whether `value` is already an instance of this cast.
    pub fn matches(&self, value: &Value) -> bool {
        let class_matches = |class: Option<&str>| self.class.is_none() || class == self.class.as_deref();
        match (&self.kind, value) {
            (CastKind::Mapping, Value::Map(r)) => class_matches(r.class()),
            (CastKind::Object, Value::Object(r)) => class_matches(r.class()),
            (CastKind::Sequence, Value::List(l)) => class_matches(l.class()),
            (CastKind::Str, Value::Str(_))
            | (CastKind::Int, Value::Int(_))
            | (CastKind::Float, Value::Float(_))
            | (CastKind::Bool, Value::Bool(_)) => true,
            (CastKind::Custom(_), v) => v.class().is_some() && v.class() == self.class.as_deref(),
            _ => false,
        }
    }

    /// A fresh, empty instance.
    pub fn construct(&self) -> Result<Value, CastError> {
        Ok(match &self.kind {
            CastKind::Mapping => Value::Map(self.record()),
            CastKind::Object => Value::Object(self.record()),
            CastKind::Sequence => Value::List(match &self.class {
                Some(class) => List::with_class(class.clone()),
                None => List::new(),
            }),
            CastKind::Str => Value::Str(String::new()),
            CastKind::Int => Value::Int(0),
            CastKind::Float => Value::Float(0.0),
            CastKind::Bool => Value::Bool(false),
            CastKind::Custom(convert) => convert(Value::Null)?,
        })
    }

    /// Coerce `value`, leaving it untouched when it already matches.
    pub fn apply(&self, value: Value) -> Result<Value, CastError> {
        if self.matches(&value) {
            return Ok(value);
        }
        match &self.kind {
            CastKind::Mapping => match value {
                Value::Map(r) | Value::Object(r) => Ok(Value::Map(self.reclass(r))),
                other => Err(self.conversion(&other)),
            },
            CastKind::Object => match value {
                Value::Map(r) | Value::Object(r) => Ok(Value::Object(self.reclass(r))),
                other => Err(self.conversion(&other)),
            },
            CastKind::Sequence => match value {
                Value::List(mut l) => {
                    l.set_class(self.class.clone());
                    Ok(Value::List(l))
                }
                other => Err(self.conversion(&other)),
            },
            CastKind::Str => Ok(Value::Str(value.to_string())),
            CastKind::Int => match value {
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                Value::Float(x) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
                Value::Str(ref s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| self.conversion(&value)),
                other => Err(self.conversion(&other)),
            },
            CastKind::Float => match value {
                Value::Int(i) => Ok(Value::Float(i as f64)),
                Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
                Value::Str(ref s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| self.conversion(&value)),
                other => Err(self.conversion(&other)),
            },
            CastKind::Bool => Ok(Value::Bool(truthy(&value))),
            CastKind::Custom(convert) => convert(value),
        }
    }

    /// Plain dict form of `value`: the dict hook when declared and `value` is an instance.
    pub fn export_dict(&self, value: Value) -> Result<Value, CastError> {
        match &self.hooks.to_dict {
            Some(to) if self.matches(&value) => to(&value),
            _ => Ok(value),
        }
    }

    /// JSON form of `value`: the JSON hook, else the dict hook, else the plain conversion.
    pub fn export_json(&self, value: Value) -> Result<serde_json::Value, CastError> {
        match &self.hooks.to_json {
            Some(to) if self.matches(&value) => to(&value),
            _ => Ok(serde_json::Value::from(self.export_dict(value)?)),
        }
    }

    /// Rebuild a value from its plain dict form with the dict hook, if any.
    pub fn import_dict(&self, value: Value) -> Result<Value, CastError> {
        match &self.hooks.from_dict {
            Some(from) => from(value),
            None => Ok(value),
        }
    }

    /// Rebuild a value from JSON: the JSON hook, else the dict hook on the converted value.
    pub fn import_json(&self, value: serde_json::Value) -> Result<Value, CastError> {
        match &self.hooks.from_json {
            Some(from) => from(value),
            None => self.import_dict(Value::from(value)),
        }
    }

    fn record(&self) -> Record {
        match &self.class {
            Some(class) => Record::with_class(class.clone()),
            None => Record::new(),
        }
    }

    fn reclass(&self, mut record: Record) -> Record {
        record.set_class(self.class.clone());
        record
    }

    fn conversion(&self, value: &Value) -> CastError {
        CastError::Conversion {
            found: value.type_name(),
            target: self.name().to_string(),
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(x) => *x != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(l) => !l.is_empty(),
        Value::Map(r) | Value::Object(r) => !r.is_empty(),
    }
}

impl PartialEq for Cast {
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(&self.kind) == mem::discriminant(&other.kind) && self.class == other.class
    }
}

impl fmt::Debug for Cast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cast({})", self.name())
    }
}

impl fmt::Display for Cast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `set_cast` of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum SetCast {
    /// Applied to the final value only.
    Single(Cast),
    /// One cast per flattened position (root, each name, each index).
    Positional(Vec<Cast>),
}

impl SetCast {
    /// Look up the cast for `position`.
    ///
    /// - single cast: returned for [`CastPosition::Final`] or when `!index_only`,
    ///   otherwise `default`.
    /// - positional list: the entry at `position` (`Final` is the last entry); when out of
    ///   range, `default` if `index_only`, else [`CastError::OutOfRange`].
    pub fn resolve(
        &self,
        position: CastPosition,
        default: Option<&Cast>,
        index_only: bool,
    ) -> Result<Cast, CastError> {
        match self {
            SetCast::Single(cast) => {
                if position == CastPosition::Final || !index_only {
                    return Ok(cast.clone());
                }
                default.cloned().ok_or(CastError::NoDefault { position })
            }
            SetCast::Positional(casts) => {
                let found = match position {
                    CastPosition::At(n) => casts.get(n),
                    CastPosition::Final => casts.last(),
                };
                match (found, default) {
                    (Some(cast), _) => Ok(cast.clone()),
                    (None, Some(default)) if index_only => Ok(default.clone()),
                    (None, _) => Err(CastError::OutOfRange {
                        position,
                        len: casts.len(),
                    }),
                }
            }
        }
    }

    /// Cast applied to the value stored at the end of the path.
    pub fn final_cast(&self) -> Option<&Cast> {
        match self {
            SetCast::Single(cast) => Some(cast),
            SetCast::Positional(casts) => casts.last(),
        }
    }

    pub fn as_positional(&self) -> Option<&[Cast]> {
        match self {
            SetCast::Positional(casts) => Some(casts),
            SetCast::Single(_) => None,
        }
    }
}

impl From<Cast> for SetCast {
    fn from(cast: Cast) -> Self {
        SetCast::Single(cast)
    }
}

impl From<Vec<Cast>> for SetCast {
    fn from(casts: Vec<Cast>) -> Self {
        SetCast::Positional(casts)
    }
}

/// [`SetCast::resolve`] for an optional `set_cast`: without one, `default` or
/// [`CastError::NoDefault`].
pub fn resolve_cast(
    set_cast: Option<&SetCast>,
    position: CastPosition,
    default: Option<&Cast>,
    index_only: bool,
) -> Result<Cast, CastError> {
    match set_cast {
        Some(set_cast) => set_cast.resolve(position, default, index_only),
        None => default.cloned().ok_or(CastError::NoDefault { position }),
    }
}

/// Per-call view of a field's casts used by the set traversal.
#[derive(Debug, Clone, Copy)]
pub struct CastPlan<'a> {
    set_cast: Option<&'a SetCast>,
    kind: NodeKind,
}

impl<'a> CastPlan<'a> {
    pub fn new(set_cast: Option<&'a SetCast>, kind: NodeKind) -> Self {
        CastPlan { set_cast, kind }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// `dict` in mapping mode, the generic attribute bag otherwise.
    pub fn default_container(&self) -> Cast {
        match self.kind {
            NodeKind::Mapping => Cast::dict(),
            NodeKind::Attributes => Cast::object(),
        }
    }

    /// Cast used to vivify the slot at `position`. Only positional lists take part;
    /// a single cast is reserved for the final value.
    pub fn container(&self, position: usize, default: Cast) -> Cast {
        match resolve_cast(self.set_cast, CastPosition::At(position), Some(&default), true) {
            Ok(cast) => cast,
            Err(_) => default,
        }
    }

    /// Cast used to vivify a sequence at `position`; falls back to `list` when the declared
    /// cast is not a sequence type.
    pub fn sequence(&self, position: usize) -> Cast {
        let cast = self.container(position, Cast::list());
        if cast.is_sequence() {
            cast
        } else {
            Cast::list()
        }
    }

    /// Cast used to initialise an unset root.
    pub fn root(&self) -> Cast {
        self.container(0, self.default_container())
    }

    /// Apply the final cast, if any.
    pub fn apply_final(&self, value: Value) -> Result<Value, CastError> {
        match self.set_cast.and_then(SetCast::final_cast) {
            Some(cast) => cast.apply(value),
            None => Ok(value),
        }
    }
}
