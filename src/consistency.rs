//! Cross-field check: fields whose paths share a prefix must declare the same casts
//! along that prefix, otherwise vivification would depend on which field is set first.
//!
//! Declarations are recorded per flattened prefix, `(root)`, `(root).test`,
//! `(root).test.user`, `(root).test.array.0`, ...; the first field to reach a prefix
//! owns it and later fields are compared against it.

use crate::cast::Cast;
use crate::field::Field;
use crate::path::{flatten, Step};
use indexmap::IndexMap;
use log::debug;

/// Field name → messages, in declaration order. Fields without problems are absent.
pub type FieldErrors = IndexMap<String, Vec<String>>;

const ROOT: &str = "(root)";

struct Declaration<'a> {
    cast: &'a Cast,
    source: &'a str,
}

/// Compare the positional casts of every field sharing a prefix.
pub fn check<'a, I>(fields: I) -> FieldErrors
where
    I: IntoIterator<Item = (&'a str, &'a Field)>,
{
    let mut declared: IndexMap<String, Declaration<'a>> = IndexMap::new();
    let mut errors = FieldErrors::new();

    for (name, field) in fields {
        let Some(casts) = field.set_cast().and_then(|set_cast| set_cast.as_positional()) else {
            continue;
        };
        let Some((root_cast, casts)) = casts.split_first() else {
            continue;
        };

        let mut prefix = ROOT.to_string();
        let mut mismatches = Vec::new();
        compare(&mut declared, &prefix, root_cast, name, &mut mismatches);
        for (step, cast) in flatten(field.segments()).iter().zip(casts) {
            match step {
                Step::Key(key) => prefix.push_str(&format!(".{}", key)),
                Step::Index { index, .. } => prefix.push_str(&format!(".{}", index)),
            }
            compare(&mut declared, &prefix, cast, name, &mut mismatches);
        }

        if !mismatches.is_empty() {
            debug!("field {} disagrees with earlier casts at {} prefixes", name, mismatches.len());
            errors.entry(name.to_string()).or_default().extend(mismatches);
        }
    }
    errors
}

fn compare<'a>(
    declared: &mut IndexMap<String, Declaration<'a>>,
    prefix: &str,
    cast: &'a Cast,
    name: &'a str,
    mismatches: &mut Vec<String>,
) {
    match declared.get(prefix) {
        Some(existing) if existing.cast != cast => mismatches.push(format!(
            "This field partially references the same path of {}, but set_cast corresponding to \"{}\" is not the same.",
            existing.source, prefix
        )),
        Some(_) => {}
        None => {
            declared.insert(prefix.to_string(), Declaration { cast, source: name });
        }
    }
}
