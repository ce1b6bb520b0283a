//! A field: one target path plus its cast and exclusion configuration.
//!
//! Fields are immutable once built and hold no data; every read and write goes through
//! the root passed in.

use crate::cast::{resolve_cast, Cast, CastError, CastPlan, CastPosition, SetCast};
use crate::mutate;
use crate::path::{parse_path, PathError, PathSegment, DEFAULT_SEPARATOR};
use crate::resolve;
use crate::value::{NodeKind, Value};
use indexmap::IndexMap;

/// Serialization direction an exclusion is checked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Serialize,
    Deserialize,
}

/// Exclusion flag: everywhere, or per format (`"dict"`, `"json"`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    All(bool),
    Formats(IndexMap<String, bool>),
}

impl Exclusion {
    pub fn formats<K: Into<String>>(formats: impl IntoIterator<Item = (K, bool)>) -> Self {
        Exclusion::Formats(formats.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Unlisted formats are not excluded.
    pub fn excludes(&self, format: &str) -> bool {
        match self {
            Exclusion::All(all) => *all,
            Exclusion::Formats(formats) => formats.get(format).copied().unwrap_or(false),
        }
    }
}

impl From<bool> for Exclusion {
    fn from(all: bool) -> Self {
        Exclusion::All(all)
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    target: String,
    separator: String,
    segments: Vec<PathSegment>,
    get_cast: Option<Cast>,
    set_cast: Option<SetCast>,
    exclude: Option<Exclusion>,
    exclude_serialize: Option<Exclusion>,
    exclude_deserialize: Option<Exclusion>,
    clear_parent: bool,
    metadata: IndexMap<String, Value>,
}

impl Field {
    /// A plain field on `target` with the default separator and no casts.
    pub fn new(target: impl Into<String>) -> Result<Self, PathError> {
        FieldBuilder::new(target).build()
    }

    pub fn builder(target: impl Into<String>) -> FieldBuilder {
        FieldBuilder::new(target)
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn get_cast(&self) -> Option<&Cast> {
        self.get_cast.as_ref()
    }

    pub fn set_cast(&self) -> Option<&SetCast> {
        self.set_cast.as_ref()
    }

    pub fn exclude(&self) -> Option<&Exclusion> {
        self.exclude.as_ref()
    }

    pub fn exclude_serialize(&self) -> Option<&Exclusion> {
        self.exclude_serialize.as_ref()
    }

    pub fn exclude_deserialize(&self) -> Option<&Exclusion> {
        self.exclude_deserialize.as_ref()
    }

    pub fn clear_parent(&self) -> bool {
        self.clear_parent
    }

    pub fn metadata(&self) -> &IndexMap<String, Value> {
        &self.metadata
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Number of casts a positional `set_cast` must declare: root, each name, each index.
    pub fn expected_cast_len(&self) -> usize {
        1 + self.segments.iter().map(PathSegment::width).sum::<usize>()
    }

    /// Check the arity of a positional `set_cast`.
    pub fn validate(&self) -> Result<(), CastError> {
        match self.set_cast.as_ref().and_then(SetCast::as_positional) {
            Some(casts) if casts.len() != self.expected_cast_len() => Err(CastError::LengthMismatch {
                expected: self.expected_cast_len(),
                actual: casts.len(),
            }),
            _ => Ok(()),
        }
    }

    /// The cast declared at `position`; see [`SetCast::resolve`].
    pub fn cast_type(&self, position: CastPosition, default: Option<&Cast>, index_only: bool) -> Result<Cast, CastError> {
        resolve_cast(self.set_cast.as_ref(), position, default, index_only)
    }

    /// The stored value, uncast.
    pub fn get_ref<'a>(&self, root: &'a Value) -> Result<&'a Value, PathError> {
        resolve::get(root, &self.segments)
    }

    /// The stored value with `get_cast` applied when it does not already match.
    pub fn get(&self, root: &Value) -> Result<Value, PathError> {
        let value = self.get_ref(root)?.clone();
        match &self.get_cast {
            Some(cast) => Ok(cast.apply(value)?),
            None => Ok(value),
        }
    }

    /// Store `value`, creating whatever containers the path needs.
    ///
    /// Mapping or attribute mode follows the root: a `Map` root vivifies mappings, anything
    /// else attribute bags. Use [`Field::set_in`] to pick the mode explicitly.
    pub fn set(&self, root: &mut Value, value: Value) -> Result<(), PathError> {
        self.set_in(root, value, NodeKind::of(root))
    }

    /// [`Field::set`] with containers vivified in `kind` mode, whatever the root is.
    pub fn set_in(&self, root: &mut Value, value: Value, kind: NodeKind) -> Result<(), PathError> {
        self.validate()?;
        let plan = CastPlan::new(self.set_cast.as_ref(), kind);
        mutate::set(root, &self.segments, value, &plan)
    }

    /// Initialise an unset root with this field's root cast in the given mode.
    pub fn bootstrap(&self, root: &mut Value, kind: NodeKind) -> Result<(), PathError> {
        mutate::bootstrap(root, &CastPlan::new(self.set_cast.as_ref(), kind))
    }

    /// The cast whose serialization hooks apply to this field: `get_cast` first, then the
    /// final `set_cast`.
    pub fn serde_cast(&self) -> Option<&Cast> {
        self.get_cast
            .as_ref()
            .filter(|cast| cast.has_hooks())
            .or_else(|| self.set_cast.as_ref().and_then(SetCast::final_cast).filter(|cast| cast.has_hooks()))
    }

    /// Remove the value and return it; honours `clear_parent`.
    pub fn delete(&self, root: &mut Value) -> Result<Value, PathError> {
        mutate::delete(root, &self.segments, self.clear_parent)
    }

    /// Whether this field is skipped when (de)serializing to `format`. The
    /// direction-specific flag wins over `exclude`.
    pub fn is_excluded(&self, direction: Direction, format: &str) -> bool {
        let specific = match direction {
            Direction::Serialize => self.exclude_serialize.as_ref(),
            Direction::Deserialize => self.exclude_deserialize.as_ref(),
        };
        specific
            .or(self.exclude.as_ref())
            .map_or(false, |exclusion| exclusion.excludes(format))
    }
}

/// Builder for [`Field`]; the path is parsed by [`FieldBuilder::build`].
#[derive(Debug, Clone)]
pub struct FieldBuilder {
    target: String,
    separator: String,
    get_cast: Option<Cast>,
    set_cast: Option<SetCast>,
    exclude: Option<Exclusion>,
    exclude_serialize: Option<Exclusion>,
    exclude_deserialize: Option<Exclusion>,
    clear_parent: bool,
    metadata: IndexMap<String, Value>,
}

impl FieldBuilder {
    pub fn new(target: impl Into<String>) -> Self {
        FieldBuilder {
            target: target.into(),
            separator: DEFAULT_SEPARATOR.to_string(),
            get_cast: None,
            set_cast: None,
            exclude: None,
            exclude_serialize: None,
            exclude_deserialize: None,
            clear_parent: false,
            metadata: IndexMap::new(),
        }
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn get_cast(mut self, cast: Cast) -> Self {
        self.get_cast = Some(cast);
        self
    }

    pub fn set_cast(mut self, set_cast: impl Into<SetCast>) -> Self {
        self.set_cast = Some(set_cast.into());
        self
    }

    pub fn exclude(mut self, exclusion: impl Into<Exclusion>) -> Self {
        self.exclude = Some(exclusion.into());
        self
    }

    pub fn exclude_serialize(mut self, exclusion: impl Into<Exclusion>) -> Self {
        self.exclude_serialize = Some(exclusion.into());
        self
    }

    pub fn exclude_deserialize(mut self, exclusion: impl Into<Exclusion>) -> Self {
        self.exclude_deserialize = Some(exclusion.into());
        self
    }

    pub fn clear_parent(mut self, clear_parent: bool) -> Self {
        self.clear_parent = clear_parent;
        self
    }

    /// Free-form metadata carried along with the field.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<Field, PathError> {
        let segments = parse_path(&self.target, &self.separator)?;
        Ok(Field {
            target: self.target,
            separator: self.separator,
            segments,
            get_cast: self.get_cast,
            set_cast: self.set_cast,
            exclude: self.exclude,
            exclude_serialize: self.exclude_serialize,
            exclude_deserialize: self.exclude_deserialize,
            clear_parent: self.clear_parent,
            metadata: self.metadata,
        })
    }
}
