//! # fieldmap: path-based field mapping
//!
//! Map named fields onto values deep inside nested mappings and attribute bags. Each
//! field is bound to a target path. Writes create whatever containers are missing
//! along it; with `clear_parent`, deletes prune the containers they leave empty.
//!
//! ## Target paths
//!
//! - Dotted names: `test.user.name` (separator configurable, may be several characters)
//! - Subscripts: `users[1][1].scores[3]` (multi-dimensional, padded with `null` on write)
//!
//! ## Casts
//!
//! - `get_cast`: applied to the value read
//! - `set_cast`: a single cast for the stored value, or one cast per path position
//!   (root, each name, each index) deciding what gets created along the way
//! - Fields sharing a path prefix must agree on the casts along it ([`consistency`])
//!
//! ## Example
//!
//! ```
//! use fieldmap::{Cast, Field, Model, Schema, Value};
//!
//! let schema = Schema::builder()
//!     .field("name", Field::new("test.user.name").unwrap())
//!     .field("age", Field::builder("test.user.age").set_cast(Cast::int()).build().unwrap())
//!     .asdict(true)
//!     .build();
//!
//! let mut model = Model::new(schema);
//! model.set_field("name", Value::from("Alice")).unwrap();
//! model.set_field("age", Value::from("30")).unwrap();
//! assert_eq!(model.get_field("age").unwrap(), Value::Int(30));
//! assert!(model.validate().is_empty());
//! ```

pub mod cast;
pub mod connection;
pub mod consistency;
pub mod field;
pub mod model;
pub mod mutate;
pub mod path;
pub mod resolve;
pub mod value;

pub use cast::{Cast, CastError, CastPlan, CastPosition, SetCast};
pub use connection::{ConnectionDict, ConnectionKey};
pub use consistency::FieldErrors;
pub use field::{Direction, Exclusion, Field, FieldBuilder};
pub use model::{Connection, MapperError, Model, Schema, SchemaBuilder};
pub use path::{parse_path, PathError, PathSegment, Step, DEFAULT_SEPARATOR};
pub use value::{List, Node, NodeKind, NodeMut, Record, Value};
