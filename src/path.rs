//! Parse target paths (`"test.user.name"`, `"users[1][1].scores[3]"`) into segments using PEST.
//!
//! A path is split on a literal separator (default `.`, may be several characters), then
//! each piece is parsed as a name followed by zero or more `[<digits>]` subscripts.

use crate::cast::CastError;
use pest::Parser;
use pest_derive::Parser as PestParser;
use std::fmt;

#[derive(PestParser)]
#[grammar = "path.pest"]
struct SegmentParser;

/// Separator used when a field does not declare its own.
pub const DEFAULT_SEPARATOR: &str = ".";

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Malformed path {path:?}: {reason}")]
    MalformedPath { path: String, reason: String },
    #[error("Missing key: {0:?}")]
    MissingKey(String),
    #[error("Missing attribute: {0:?}")]
    MissingAttribute(String),
    #[error("Index {index} out of range for {name:?} (len {len})")]
    IndexOutOfRange { name: String, index: usize, len: usize },
    #[error("Index {index} of {name:?} is above the write limit {max}")]
    IndexTooLarge { name: String, index: usize, max: usize },
    #[error("Expected a container at {name:?}, found {found}")]
    NotAContainer { name: String, found: &'static str },
    #[error("Expected a sequence at {name:?}, found {found}")]
    NotASequence { name: String, found: &'static str },
    #[error("Cast: {0}")]
    Cast(#[from] CastError),
}

impl PathError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        PathError::MalformedPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the read-side lookup failures: missing key/attribute or index out of range.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            PathError::MissingKey(_) | PathError::MissingAttribute(_) | PathError::IndexOutOfRange { .. }
        )
    }
}

/// One separator-delimited piece of a path: a name and its subscripts, left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String,
    pub indices: Vec<usize>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>, indices: Vec<usize>) -> Self {
        PathSegment {
            name: name.into(),
            indices,
        }
    }

    /// Number of flattened positions this segment occupies (its name plus one per index).
    pub fn width(&self) -> usize {
        1 + self.indices.len()
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for index in &self.indices {
            write!(f, "[{}]", index)?;
        }
        Ok(())
    }
}

/// A single step of a flattened path: a key/attribute name or a sequence subscript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    Key(&'a str),
    /// `of` is the name of the segment the subscript belongs to (for error messages).
    Index { of: &'a str, index: usize },
}

impl fmt::Display for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Key(name) => f.write_str(name),
            Step::Index { index, .. } => write!(f, "{}", index),
        }
    }
}

/// Flatten segments into steps: each name, then each of its indices.
pub fn flatten(segments: &[PathSegment]) -> Vec<Step<'_>> {
    let mut steps = Vec::with_capacity(segments.iter().map(PathSegment::width).sum());
    for segment in segments {
        steps.push(Step::Key(&segment.name));
        steps.extend(segment.indices.iter().map(|&index| Step::Index {
            of: &segment.name,
            index,
        }));
    }
    steps
}

/// Parse `path` into segments, splitting on `sep` (literal substring, not a pattern).
pub fn parse_path(path: &str, sep: &str) -> Result<Vec<PathSegment>, PathError> {
    if sep.is_empty() {
        return Err(PathError::malformed(path, "separator must not be empty"));
    }
    path.split(sep).map(|piece| parse_piece(path, piece)).collect()
}

fn parse_piece(path: &str, piece: &str) -> Result<PathSegment, PathError> {
    if piece.is_empty() {
        return Err(PathError::malformed(path, "empty segment"));
    }
    if piece.starts_with('[') {
        return Err(PathError::malformed(
            path,
            format!("segment {:?} has no name before its subscript", piece),
        ));
    }
    let pair = SegmentParser::parse(Rule::segment, piece)
        .map_err(|e| PathError::malformed(path, format!("segment {:?}: {}", piece, e)))?
        .next()
        .ok_or_else(|| PathError::malformed(path, "empty parse"))?;

    let mut name = None;
    let mut indices = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::name => name = Some(inner.as_str().to_string()),
            Rule::index => {
                let index = inner.as_str().parse::<usize>().map_err(|_| {
                    PathError::malformed(path, format!("index {} is too large", inner.as_str()))
                })?;
                indices.push(index);
            }
            _ => {}
        }
    }
    let name = name.ok_or_else(|| PathError::malformed(path, format!("segment {:?} has no name", piece)))?;
    Ok(PathSegment { name, indices })
}
