//! Get traversal: follow parsed segments from a root down to the addressed value.

use crate::path::{PathError, PathSegment};
use crate::value::Value;
use log::trace;

/// Resolve `segments` against `root`. The value is returned as stored; casting is up to the caller.
pub fn get<'a>(root: &'a Value, segments: &[PathSegment]) -> Result<&'a Value, PathError> {
    let mut cur = root;
    for segment in segments {
        let node = cur.node().ok_or_else(|| PathError::NotAContainer {
            name: segment.name.clone(),
            found: cur.type_name(),
        })?;
        cur = node.get(&segment.name)?;
        for &index in &segment.indices {
            cur = subscript(cur, &segment.name, index)?;
        }
        trace!("resolved {} -> {}", segment, cur.type_name());
    }
    Ok(cur)
}

fn subscript<'a>(value: &'a Value, name: &str, index: usize) -> Result<&'a Value, PathError> {
    let list = value.as_list().ok_or_else(|| PathError::NotASequence {
        name: name.to_string(),
        found: value.type_name(),
    })?;
    list.get(index).ok_or_else(|| PathError::IndexOutOfRange {
        name: name.to_string(),
        index,
        len: list.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse_path;
    use serde_json::json;

    fn resolve(root: &Value, path: &str) -> Result<Value, PathError> {
        let segments = parse_path(path, ".")?;
        get(root, &segments).cloned()
    }

    #[test]
    fn nested_indices() {
        let root = Value::from(json!({
            "test": {"array": [[{"correct": false}], [null, {"correct": true}]]}
        }));
        assert_eq!(resolve(&root, "test.array[1][1].correct").expect("get"), Value::Bool(true));
        assert_eq!(resolve(&root, "test.array[0][0].correct").expect("get"), Value::Bool(false));
    }

    #[test]
    fn lookup_errors() {
        let root = Value::from(json!({"test": {"array": [1, 2], "name": "x"}}));
        assert!(matches!(resolve(&root, "test.age"), Err(PathError::MissingKey(k)) if k == "age"));
        assert!(matches!(
            resolve(&root, "test.array[5]"),
            Err(PathError::IndexOutOfRange { index: 5, len: 2, .. })
        ));
        assert!(matches!(resolve(&root, "test.name[0]"), Err(PathError::NotASequence { found: "str", .. })));
        assert!(matches!(resolve(&root, "test.name.first"), Err(PathError::NotAContainer { .. })));

        let objects = root.into_objects();
        assert!(matches!(resolve(&objects, "test.age"), Err(PathError::MissingAttribute(_))));
    }
}
