use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// One step from the document root to a failing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a document, rendered as a JSON pointer
/// (`""` for the root, `/levels/0/iid` below it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

/// The only data error: a value did not match its descriptor.
///
/// `key` is the property being converted when the failure happened (empty at
/// the root, inside arrays and inside union members) and `parent` the name of
/// the type that owns it, when known.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid value{}{}. Expected {expected} but got {actual}", for_key(.key), on_parent(.parent))]
pub struct TypeMismatch {
    pub expected: String,
    pub actual: String,
    pub key: String,
    pub parent: String,
    pub path: Path,
}

/// Problems with the descriptor table itself, found before any data is seen.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("type {name:?} references undefined type {target:?}")]
    UnresolvedRef { name: String, target: String },

    #[error("type {name:?} declares the {side} key {key:?} more than once")]
    DuplicateKey { name: String, key: String, side: &'static str },

    #[error("type {0:?} is defined more than once")]
    DuplicateType(String),

    #[error("type {0:?} is an alias cycle that never reaches a concrete descriptor")]
    RefCycle(String),

    #[error("unknown type {0:?}")]
    UnknownType(String),

    #[error("malformed descriptor table at {path}: {message}")]
    Malformed { path: String, message: String },

    #[error("failed to read descriptor table {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything a conversion entry point can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Mismatch(#[from] TypeMismatch),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("invalid JSON text: {0}")]
    Syntax(#[from] serde_json::Error),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

fn for_key(key: &str) -> String {
    if key.is_empty() { String::new() } else { format!(" for key \"{key}\"") }
}

fn on_parent(parent: &str) -> String {
    if parent.is_empty() { String::new() } else { format!(" on {parent}") }
}

impl TypeMismatch {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Error {
    pub fn as_mismatch(&self) -> Option<&TypeMismatch> {
        match self {
            Error::Mismatch(mismatch) => Some(mismatch),
            _ => None,
        }
    }
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Self(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.0 {
            match segment {
                Segment::Key(key) => write!(f, "/{}", key.replace('~', "~0").replace('/', "~1"))?,
                Segment::Index(index) => write!(f, "/{index}")?,
            }
        }
        Ok(())
    }
}
