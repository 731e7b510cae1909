//! Declarative type descriptors.
//!
//! A descriptor says what a value must look like and, for objects, how its keys
//! are renamed between the wire format and the typed shape. Descriptors refer to
//! each other by name (`Ref`); names are looked up in a [`DescriptorTable`]
//! only while a value is being walked, so tables may be declared in any order
//! and may be recursive.
//!
//! [`DescriptorTable`]: crate::table::DescriptorTable
use std::fmt;

use once_cell::sync::OnceCell;
use serde_json::{Number, Value};

use crate::index::PropertyIndex;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Runtime kind checked by [`Descriptor::Primitive`]. No coercion between kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    String,
    Number,
    Boolean,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Primitive(Kind),
    /// Accepts anything, including a missing property.
    Any,
    /// Exactly `null`.
    Null,
    /// Matches nothing.
    Never,
    /// Matches only a missing property; `Union([Undefined, X])` is an optional `X`.
    Undefined,
    /// `null`, or a string holding a calendar date/time.
    Date,
    /// Only used to phrase expectations in error messages.
    Literal(String),
    /// Lazily resolved table entry.
    Ref(String),
    /// Members are tried in declared order; the first match wins.
    Union(Vec<Descriptor>),
    Enum(Vec<Value>),
    Array(Box<Descriptor>),
    Object(ObjectShape),
}

/// One `{wire key, typed key, descriptor}` triple of an object shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub wire_key: String,
    pub typed_key: String,
    pub descriptor: Descriptor,
}

/// Policy for keys an object shape does not name.
#[derive(Debug, Clone, PartialEq)]
pub enum Additional {
    Reject,
    Allow(Box<Descriptor>),
}

#[derive(Debug, Clone)]
pub struct ObjectShape {
    properties: Vec<Property>,
    additional: Additional,
    /// wire key -> typed key, filled once on first decode.
    pub(crate) decode_index: OnceCell<PropertyIndex>,
    /// typed key -> wire key, filled once on first encode.
    pub(crate) encode_index: OnceCell<PropertyIndex>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTORS
// ————————————————————————————————————————————————————————————————————————————

impl Descriptor {
    pub fn string() -> Self {
        Self::Primitive(Kind::String)
    }

    pub fn number() -> Self {
        Self::Primitive(Kind::Number)
    }

    pub fn boolean() -> Self {
        Self::Primitive(Kind::Boolean)
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::Ref(name.into())
    }

    pub fn array(item: Descriptor) -> Self {
        Self::Array(Box::new(item))
    }

    pub fn union(members: impl IntoIterator<Item = Descriptor>) -> Self {
        Self::Union(members.into_iter().collect())
    }

    /// `X` or a missing property.
    pub fn optional(inner: Descriptor) -> Self {
        Self::Union(vec![Self::Undefined, inner])
    }

    /// `X` or `null`.
    pub fn nullable(inner: Descriptor) -> Self {
        Self::Union(vec![Self::Null, inner])
    }

    pub fn enumeration(cases: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self::Enum(cases.into_iter().map(Into::into).collect())
    }

    pub fn object(properties: impl IntoIterator<Item = Property>, additional: Additional) -> Self {
        Self::Object(ObjectShape::new(properties, additional))
    }

    /// Object with no named properties whose every value matches `value`.
    pub fn map(value: Descriptor) -> Self {
        Self::Object(ObjectShape::new([], Additional::Allow(Box::new(value))))
    }
}

impl Property {
    pub fn new(wire_key: impl Into<String>, typed_key: impl Into<String>, descriptor: Descriptor) -> Self {
        Self { wire_key: wire_key.into(), typed_key: typed_key.into(), descriptor }
    }

    /// Same key on both sides.
    pub fn keep(key: impl Into<String>, descriptor: Descriptor) -> Self {
        let key = key.into();
        Self { wire_key: key.clone(), typed_key: key, descriptor }
    }
}

impl Additional {
    pub fn allow(descriptor: Descriptor) -> Self {
        Self::Allow(Box::new(descriptor))
    }
}

impl ObjectShape {
    pub fn new(properties: impl IntoIterator<Item = Property>, additional: Additional) -> Self {
        Self {
            properties: properties.into_iter().collect(),
            additional,
            decode_index: OnceCell::new(),
            encode_index: OnceCell::new(),
        }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn additional(&self) -> &Additional {
        &self.additional
    }
}

/// The memoized indexes are derived data and do not take part in equality.
impl PartialEq for ObjectShape {
    fn eq(&self, other: &Self) -> bool {
        self.properties == other.properties && self.additional == other.additional
    }
}

// ————————————————————————————————————————————————————————————————————————————
// MATCHING HELPERS
// ————————————————————————————————————————————————————————————————————————————

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Boolean => "boolean",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Kind::String, Value::String(_))
                | (Kind::Number, Value::Number(_))
                | (Kind::Boolean, Value::Bool(_))
        )
    }
}

/// Enum case equality. Numbers compare by numeric value so `1` equals `1.0`;
/// everything else compares structurally.
pub(crate) fn same_case(case: &Value, value: &Value) -> bool {
    match (case, value) {
        (Value::Number(a), Value::Number(b)) => same_number(a, b),
        _ => case == value,
    }
}

/// Integers compare exactly; floats only when either side is one.
fn same_number(a: &Number, b: &Number) -> bool {
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
        return a == b;
    }
    if !a.is_f64() && !b.is_f64() {
        // One side is negative, the other above i64::MAX.
        return false;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Text of an enum case when listed inside an expectation.
pub(crate) fn case_text(case: &Value) -> String {
    match case {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PRETTY NAMES
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Primitive(kind) => f.write_str(kind.name()),
            Descriptor::Any => f.write_str("any"),
            Descriptor::Null => f.write_str("null"),
            Descriptor::Never => f.write_str("never"),
            Descriptor::Undefined => f.write_str("undefined"),
            Descriptor::Date => f.write_str("Date"),
            Descriptor::Literal(text) => f.write_str(text),
            Descriptor::Ref(name) => f.write_str(name),
            Descriptor::Union(members) => match members.as_slice() {
                [Descriptor::Undefined, inner] => write!(f, "an optional {inner}"),
                _ => one_of(f, members.iter().map(|m| m.to_string())),
            },
            Descriptor::Enum(cases) => one_of(f, cases.iter().map(case_text)),
            Descriptor::Array(_) => f.write_str("array"),
            Descriptor::Object(_) => f.write_str("object"),
        }
    }
}

fn one_of(f: &mut fmt::Formatter<'_>, names: impl Iterator<Item = String>) -> fmt::Result {
    let names = names.collect::<Vec<_>>();
    write!(f, "one of [{}]", names.join(", "))
}
