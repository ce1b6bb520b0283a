//! Set and delete traversals.
//!
//! Set walks the flattened path (root = position 0, then one position per segment name
//! and per index), creating missing containers from the field's [`CastPlan`]. Delete
//! removes the leaf and, with `clear_parent`, prunes containers left empty on the way up.

use crate::cast::CastPlan;
use crate::path::{flatten, PathError, PathSegment, Step};
use crate::value::Value;
use log::{debug, trace};
use std::mem;

/// Initialise an unset (`Null`) root with the position-0 cast.
pub fn bootstrap(root: &mut Value, plan: &CastPlan<'_>) -> Result<(), PathError> {
    if root.is_null() {
        let cast = plan.root();
        debug!("bootstrapping unset root as {}", cast);
        *root = cast.construct()?;
    }
    Ok(())
}

/// Largest index a write may pad a sequence up to.
pub const MAX_INDEX: usize = 1 << 20;

/// Store `value` at `segments` below `root`, vivifying intermediate containers.
///
/// The final cast and the index limit are checked before anything below `root` changes.
pub fn set(root: &mut Value, segments: &[PathSegment], value: Value, plan: &CastPlan<'_>) -> Result<(), PathError> {
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| PathError::malformed("", "empty path"))?;
    check_indices(segments)?;
    let value = plan.apply_final(value)?;
    bootstrap(root, plan)?;

    let mut position = 0;
    let mut cur = root;
    for segment in parents {
        position += 1;
        let slot = descend(cur, segment, position, plan)?;
        cur = if segment.indices.is_empty() {
            slot
        } else {
            allocate(slot, segment, &mut position, plan, true)?
        };
    }

    position += 1;
    let found = cur.type_name();
    let mut node = cur.node_mut().ok_or_else(|| PathError::NotAContainer {
        name: last.name.clone(),
        found,
    })?;
    if last.indices.is_empty() {
        trace!("store {} at position {}", last, position);
        node.set(&last.name, value);
        return Ok(());
    }
    let slot = node.slot_or_insert_with(&last.name, || Ok(plan.sequence(position).construct()?))?;
    let leaf = allocate(slot, last, &mut position, plan, false)?;
    trace!("store {} at position {}", last, position);
    *leaf = value;
    Ok(())
}

fn check_indices(segments: &[PathSegment]) -> Result<(), PathError> {
    for segment in segments {
        if let Some(&index) = segment.indices.iter().find(|&&index| index > MAX_INDEX) {
            return Err(PathError::IndexTooLarge {
                name: segment.name.clone(),
                index,
                max: MAX_INDEX,
            });
        }
    }
    Ok(())
}

/// The slot named by `segment` below `cur`, created (or filled, when `Null`) from the plan.
fn descend<'a>(
    cur: &'a mut Value,
    segment: &PathSegment,
    position: usize,
    plan: &CastPlan<'_>,
) -> Result<&'a mut Value, PathError> {
    let found = cur.type_name();
    let node = cur.node_mut().ok_or_else(|| PathError::NotAContainer {
        name: segment.name.clone(),
        found,
    })?;
    let vivify = || -> Result<Value, PathError> {
        let cast = plan.container(position, plan.default_container());
        let cast = if !segment.indices.is_empty() && !cast.is_sequence() {
            plan.sequence(position)
        } else {
            cast
        };
        debug!("vivify {} as {} (position {})", segment.name, cast, position);
        Ok(cast.construct()?)
    };
    let slot = node.slot_or_insert_with(&segment.name, vivify)?;
    if slot.is_null() {
        *slot = vivify()?;
    }
    Ok(slot)
}

/// Make `slot` a sequence and walk `segment.indices` through it, padding with `Null`.
///
/// Non-last elements become sequences. With `vivify_leaf`, a `Null` innermost element is
/// replaced by a container; otherwise it is returned as is for the caller to overwrite.
fn allocate<'a>(
    slot: &'a mut Value,
    segment: &PathSegment,
    position: &mut usize,
    plan: &CastPlan<'_>,
    vivify_leaf: bool,
) -> Result<&'a mut Value, PathError> {
    if !matches!(slot, Value::List(_)) {
        if !slot.is_null() {
            debug!("replacing {} at {} with a sequence", slot.type_name(), segment.name);
        }
        *slot = plan.sequence(*position).construct()?;
    }

    let mut cur = slot;
    let count = segment.indices.len();
    for (i, &index) in segment.indices.iter().enumerate() {
        *position += 1;
        let list = match cur {
            Value::List(list) => list,
            other => {
                return Err(PathError::NotASequence {
                    name: segment.name.clone(),
                    found: other.type_name(),
                })
            }
        };
        let item = list.pad_to(index).ok_or_else(|| PathError::IndexTooLarge {
            name: segment.name.clone(),
            index,
            max: MAX_INDEX,
        })?;
        if i + 1 < count {
            if !matches!(item, Value::List(_)) {
                *item = plan.sequence(*position).construct()?;
            }
        } else if vivify_leaf && item.is_null() {
            *item = plan.container(*position, plan.default_container()).construct()?;
        }
        cur = item;
    }
    Ok(cur)
}

/// Remove the value at `segments` and return it.
///
/// A key or attribute is removed from its parent; an indexed slot is set to `Null`. With
/// `clear_parent`, trailing `Null`s are trimmed from every sequence on the way back up and
/// containers left empty are removed from their parents. The root itself is never removed.
pub fn delete(root: &mut Value, segments: &[PathSegment], clear_parent: bool) -> Result<Value, PathError> {
    let steps = flatten(segments);
    remove(root, &steps, clear_parent)
}

fn remove(cur: &mut Value, steps: &[Step<'_>], clear_parent: bool) -> Result<Value, PathError> {
    let (step, rest) = steps
        .split_first()
        .ok_or_else(|| PathError::malformed("", "empty path"))?;
    if rest.is_empty() {
        return detach(cur, step);
    }

    let child = child_mut(cur, step)?;
    let removed = remove(child, rest, clear_parent)?;
    if clear_parent {
        if let Value::List(list) = child {
            list.trim_nulls();
        }
        if is_vacant(child) {
            trace!("clearing empty parent {}", step);
            vacate(cur, step);
        }
    }
    Ok(removed)
}

fn child_mut<'a>(cur: &'a mut Value, step: &Step<'_>) -> Result<&'a mut Value, PathError> {
    match *step {
        Step::Key(name) => {
            let found = cur.type_name();
            cur.node_mut()
                .ok_or_else(|| PathError::NotAContainer {
                    name: name.to_string(),
                    found,
                })?
                .into_slot(name)
        }
        Step::Index { of, index } => {
            let found = cur.type_name();
            let list = cur.as_list_mut().ok_or_else(|| PathError::NotASequence {
                name: of.to_string(),
                found,
            })?;
            let len = list.len();
            list.get_mut(index).ok_or_else(|| PathError::IndexOutOfRange {
                name: of.to_string(),
                index,
                len,
            })
        }
    }
}

fn detach(cur: &mut Value, step: &Step<'_>) -> Result<Value, PathError> {
    match *step {
        Step::Key(name) => {
            let found = cur.type_name();
            cur.node_mut()
                .ok_or_else(|| PathError::NotAContainer {
                    name: name.to_string(),
                    found,
                })?
                .delete(name)
        }
        Step::Index { .. } => Ok(mem::take(child_mut(cur, step)?)),
    }
}

fn is_vacant(value: &Value) -> bool {
    match value {
        Value::List(list) => list.is_empty(),
        Value::Map(record) | Value::Object(record) => record.is_empty(),
        _ => false,
    }
}

fn vacate(cur: &mut Value, step: &Step<'_>) {
    match *step {
        Step::Key(name) => {
            if let Some(record) = cur.as_record_mut() {
                record.remove(name);
            }
        }
        Step::Index { index, .. } => {
            if let Some(item) = cur.as_list_mut().and_then(|list| list.get_mut(index)) {
                *item = Value::Null;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::{Cast, CastError, SetCast};
    use crate::path::parse_path;
    use crate::resolve::get;
    use crate::value::NodeKind;
    use serde_json::json;

    fn set_path(root: &mut Value, path: &str, value: Value, set_cast: Option<&SetCast>) -> Result<(), PathError> {
        let segments = parse_path(path, ".")?;
        let plan = CastPlan::new(set_cast, NodeKind::of(root));
        set(root, &segments, value, &plan)
    }

    fn delete_path(root: &mut Value, path: &str, clear_parent: bool) -> Result<Value, PathError> {
        delete(root, &parse_path(path, ".")?, clear_parent)
    }

    #[test]
    fn vivifies_mappings() {
        let mut root = Value::map();
        set_path(&mut root, "test.user.name", Value::from("Alice"), None).expect("set");
        assert_eq!(serde_json::Value::from(&root), json!({"test": {"user": {"name": "Alice"}}}));
    }

    #[test]
    fn vivifies_positional_casts_on_attribute_root() {
        let set_cast = SetCast::Positional(vec![
            Cast::object_class("TypeA"),
            Cast::dict(),
            Cast::object_class("TypeB"),
            Cast::string(),
        ]);
        let mut root = Value::Null;
        set_path(&mut root, "test.user.name", Value::Int(42), Some(&set_cast)).expect("set");
        assert_eq!(root.class(), Some("TypeA"));
        let test = root.attr("test").expect("test");
        assert_eq!(test.type_name(), "dict");
        let user = test.key("user").expect("user");
        assert_eq!(user.class(), Some("TypeB"));
        assert_eq!(user.attr("name"), Some(&Value::from("42")));
    }

    #[test]
    fn pads_sequences_with_null() {
        let mut root = Value::map();
        set_path(&mut root, "users[1][2].score", Value::Int(7), None).expect("set");
        assert_eq!(
            serde_json::Value::from(&root),
            json!({"users": [null, [null, null, {"score": 7}]]})
        );
        set_path(&mut root, "scores[2]", Value::Int(3), None).expect("set");
        assert_eq!(serde_json::Value::from(root.key("scores").expect("scores")), json!([null, null, 3]));
    }

    #[test]
    fn replaces_non_sequence_when_index_required() {
        let mut root = Value::from(json!({"test": {"array": "oops"}}));
        set_path(&mut root, "test.array[0].ok", Value::Bool(true), None).expect("set");
        assert_eq!(serde_json::Value::from(&root), json!({"test": {"array": [{"ok": true}]}}));
    }

    #[test]
    fn scalar_in_the_way_is_an_error() {
        let mut root = Value::from(json!({"test": 5}));
        let err = set_path(&mut root, "test.name", Value::from("x"), None).unwrap_err();
        assert!(matches!(err, PathError::NotAContainer { .. }), "{:?}", err);
    }

    #[test]
    fn scalar_at_last_index_is_an_error() {
        let mut root = Value::from(json!({"test": {"array": [1, 5]}}));
        let err = set_path(&mut root, "test.array[1].name", Value::from("x"), None).unwrap_err();
        assert!(matches!(err, PathError::NotAContainer { found: "int", .. }), "{:?}", err);
        let err = set_path(&mut root, "test.array[1].user.name", Value::from("x"), None).unwrap_err();
        assert!(matches!(err, PathError::NotAContainer { found: "int", .. }), "{:?}", err);
        assert_eq!(serde_json::Value::from(&root), json!({"test": {"array": [1, 5]}}));
    }

    #[test]
    fn failed_final_cast_leaves_root_untouched() {
        let set_cast = SetCast::Single(Cast::int());
        let mut root = Value::map();
        let err = set_path(&mut root, "test.user.age", Value::from("abc"), Some(&set_cast)).unwrap_err();
        assert!(matches!(err, PathError::Cast(CastError::Conversion { found: "str", .. })), "{:?}", err);
        assert_eq!(root, Value::map());

        let mut unset = Value::Null;
        assert!(set_path(&mut unset, "test.user.age", Value::from("abc"), Some(&set_cast)).is_err());
        assert!(unset.is_null());
    }

    #[test]
    fn huge_index_is_rejected() {
        for path in ["a[18446744073709551615]", "a[1000000000000].b", "a[0][2000000]"] {
            let mut root = Value::map();
            let err = set_path(&mut root, path, Value::Int(1), None).unwrap_err();
            assert!(matches!(err, PathError::IndexTooLarge { max: MAX_INDEX, .. }), "{}: {:?}", path, err);
            assert_eq!(root, Value::map());
        }
        let mut root = Value::map();
        set_path(&mut root, "a[3]", Value::Int(1), None).expect("set");
        let segments = parse_path("a[18446744073709551615]", ".").expect("parse");
        assert!(matches!(
            get(&root, &segments),
            Err(PathError::IndexOutOfRange { index: usize::MAX, len: 4, .. })
        ));
    }

    #[test]
    fn delete_key_and_index() {
        let mut root = Value::from(json!({"test": {"name": "n", "array": [1, 2]}}));
        assert_eq!(delete_path(&mut root, "test.name", false).expect("delete"), Value::from("n"));
        assert_eq!(delete_path(&mut root, "test.array[1]", false).expect("delete"), Value::Int(2));
        assert_eq!(serde_json::Value::from(&root), json!({"test": {"array": [1, null]}}));
        assert!(matches!(delete_path(&mut root, "test.name", false), Err(PathError::MissingKey(_))));
        assert!(matches!(
            delete_path(&mut root, "test.array[4]", false),
            Err(PathError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn delete_clear_parent_cascades() {
        let mut root = Value::from(json!({"test": {"name": "n", "age": 3}, "keep": 1}));
        delete_path(&mut root, "test.name", true).expect("delete");
        assert!(root.key("test").is_some());
        delete_path(&mut root, "test.age", true).expect("delete");
        assert_eq!(serde_json::Value::from(&root), json!({"keep": 1}));
    }

    #[test]
    fn delete_clear_parent_trims_sequences() {
        let mut root = Value::from(json!({"test": {"array": [[1, 2], [3]]}}));
        delete_path(&mut root, "test.array[0][1]", true).expect("delete");
        assert_eq!(serde_json::Value::from(&root), json!({"test": {"array": [[1], [3]]}}));
        delete_path(&mut root, "test.array[1][0]", true).expect("delete");
        assert_eq!(serde_json::Value::from(&root), json!({"test": {"array": [[1]]}}));
        delete_path(&mut root, "test.array[0][0]", true).expect("delete");
        assert_eq!(serde_json::Value::from(&root), json!({}));
    }

    #[test]
    fn delete_clear_parent_nulls_middle_element() {
        let mut root = Value::from(json!({"test": {"array": [{"a": 1}, {"b": 2}, {"c": 3}]}}));
        assert_eq!(delete_path(&mut root, "test.array[1].b", true).expect("delete"), Value::Int(2));
        assert_eq!(
            serde_json::Value::from(&root),
            json!({"test": {"array": [{"a": 1}, null, {"c": 3}]}})
        );
    }

    #[test]
    fn delete_then_set_restores() {
        let mut root = Value::from(json!({"test": {"array": [[{"correct": true}]]}}));
        let before = root.clone();
        let segments = parse_path("test.array[0][0].correct", ".").expect("parse");
        let removed = delete(&mut root, &segments, true).expect("delete");
        set_path(&mut root, "test.array[0][0].correct", removed, None).expect("set");
        assert_eq!(root, before);
        assert_eq!(get(&root, &segments).expect("get"), &Value::Bool(true));
    }
}
