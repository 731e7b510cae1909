//! Named descriptor tables.
//!
//! A table is built once, checked eagerly for configuration mistakes
//! (dangling refs, duplicated keys, alias cycles) and is read-only afterwards.
//! Refs are still resolved by name at traversal time.
//!
//! Tables can also be loaded from JSON. A descriptor document is one of
//!
//! ```text
//! "string" | "number" | "boolean" | "any" | "null" | "never" | "undefined" | "date"
//! {"ref": "Name"}            {"literal": "text"}
//! {"union": [d, ..]}         {"enum": [value, ..]}
//! {"array": d}               {"map": d}
//! {"object": {"properties": [{"json": "k", "js": "k", "type": d}], "additional": false | true | d}}
//! ```
use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::descriptor::{Additional, Descriptor, Kind, Property};
use crate::error::SchemaError;

#[derive(Debug, Default)]
pub struct DescriptorTable {
    types: IndexMap<String, Descriptor>,
}

/// Collects definitions in any order; [`TableBuilder::build`] validates them.
#[derive(Debug, Default)]
pub struct TableBuilder {
    types: Vec<(String, Descriptor)>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

impl TableBuilder {
    pub fn define(mut self, name: impl Into<String>, descriptor: Descriptor) -> Self {
        self.types.push((name.into(), descriptor));
        self
    }

    pub fn build(self) -> Result<DescriptorTable, SchemaError> {
        let mut types = IndexMap::with_capacity(self.types.len());
        for (name, descriptor) in self.types {
            if types.contains_key(&name) {
                return Err(SchemaError::DuplicateType(name));
            }
            types.insert(name, descriptor);
        }
        DescriptorTable::new(types)
    }
}

impl DescriptorTable {
    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }

    pub fn new(types: IndexMap<String, Descriptor>) -> Result<Self, SchemaError> {
        let table = Self { types };
        table.validate()?;
        tracing::debug!(types = table.len(), "descriptor table ready");
        Ok(table)
    }

    pub fn from_json_str(src: &str) -> Result<Self, SchemaError> {
        let defs = crate::path_de::from_str_with_path::<IndexMap<String, DescriptorDef>>(src)?;
        Self::from_defs(defs)
    }

    pub fn from_json_value(value: Value) -> Result<Self, SchemaError> {
        let defs = crate::path_de::from_value_with_path::<IndexMap<String, DescriptorDef>>(value)?;
        Self::from_defs(defs)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loading descriptor table");
        Self::from_json_str(&src)
    }

    fn from_defs(defs: IndexMap<String, DescriptorDef>) -> Result<Self, SchemaError> {
        Self::new(defs.into_iter().map(|(name, def)| (name, Descriptor::from(def))).collect())
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.types.get(name)
    }

    pub fn resolve(&self, name: &str) -> Result<&Descriptor, SchemaError> {
        self.get(name).ok_or_else(|| SchemaError::UnknownType(name.to_owned()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION
// ————————————————————————————————————————————————————————————————————————————

impl DescriptorTable {
    fn validate(&self) -> Result<(), SchemaError> {
        for (name, descriptor) in &self.types {
            self.check_descriptor(name, descriptor)?;
            self.check_alias_chain(name)?;
        }
        Ok(())
    }

    /// Checks a descriptor that lives outside the table but refers into it.
    pub fn check_external(&self, descriptor: &Descriptor) -> Result<(), SchemaError> {
        self.check_descriptor("<inline>", descriptor)
    }

    fn check_descriptor(&self, owner: &str, descriptor: &Descriptor) -> Result<(), SchemaError> {
        match descriptor {
            Descriptor::Ref(target) => {
                if !self.types.contains_key(target) {
                    return Err(SchemaError::UnresolvedRef {
                        name: owner.to_owned(),
                        target: target.clone(),
                    });
                }
            }
            Descriptor::Union(members) => {
                for member in members {
                    self.check_descriptor(owner, member)?;
                }
            }
            Descriptor::Array(item) => self.check_descriptor(owner, item)?,
            Descriptor::Object(shape) => {
                check_unique(owner, shape.properties(), "wire", |p| &p.wire_key)?;
                check_unique(owner, shape.properties(), "typed", |p| &p.typed_key)?;
                for property in shape.properties() {
                    self.check_descriptor(owner, &property.descriptor)?;
                }
                if let Additional::Allow(extra) = shape.additional() {
                    self.check_descriptor(owner, extra)?;
                }
            }
            Descriptor::Primitive(_)
            | Descriptor::Any
            | Descriptor::Null
            | Descriptor::Never
            | Descriptor::Undefined
            | Descriptor::Date
            | Descriptor::Literal(_)
            | Descriptor::Enum(_) => {}
        }
        Ok(())
    }

    /// `A = Ref(B), B = Ref(A)` would never bottom out during resolution.
    fn check_alias_chain(&self, start: &str) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        let mut name = start;
        while let Some(Descriptor::Ref(next)) = self.types.get(name) {
            if !seen.insert(name) {
                return Err(SchemaError::RefCycle(start.to_owned()));
            }
            name = next.as_str();
        }
        Ok(())
    }
}

fn check_unique(
    owner: &str,
    properties: &[Property],
    side: &'static str,
    key_of: impl Fn(&Property) -> &String,
) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for property in properties {
        let key = key_of(property);
        if !seen.insert(key) {
            return Err(SchemaError::DuplicateKey {
                name: owner.to_owned(),
                key: key.clone(),
                side,
            });
        }
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// JSON FORM
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DescriptorDef {
    Named(NamedDef),
    Tagged(TaggedDef),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum NamedDef {
    String,
    Number,
    Boolean,
    Any,
    Null,
    Never,
    Undefined,
    Date,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TaggedDef {
    Ref(String),
    Literal(String),
    Union(Vec<DescriptorDef>),
    Enum(Vec<Value>),
    Array(Box<DescriptorDef>),
    Map(Box<DescriptorDef>),
    Object(ObjectDef),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ObjectDef {
    #[serde(default)]
    properties: Vec<PropertyDef>,
    #[serde(default = "AdditionalDef::reject")]
    additional: AdditionalDef,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PropertyDef {
    json: String,
    /// Defaults to the wire key.
    #[serde(default)]
    js: Option<String>,
    #[serde(rename = "type")]
    ty: DescriptorDef,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AdditionalDef {
    Flag(bool),
    Descriptor(Box<DescriptorDef>),
}

impl AdditionalDef {
    fn reject() -> Self {
        AdditionalDef::Flag(false)
    }
}

impl From<DescriptorDef> for Descriptor {
    fn from(def: DescriptorDef) -> Self {
        match def {
            DescriptorDef::Named(named) => match named {
                NamedDef::String => Descriptor::Primitive(Kind::String),
                NamedDef::Number => Descriptor::Primitive(Kind::Number),
                NamedDef::Boolean => Descriptor::Primitive(Kind::Boolean),
                NamedDef::Any => Descriptor::Any,
                NamedDef::Null => Descriptor::Null,
                NamedDef::Never => Descriptor::Never,
                NamedDef::Undefined => Descriptor::Undefined,
                NamedDef::Date => Descriptor::Date,
            },
            DescriptorDef::Tagged(tagged) => match tagged {
                TaggedDef::Ref(name) => Descriptor::Ref(name),
                TaggedDef::Literal(text) => Descriptor::Literal(text),
                TaggedDef::Union(members) => Descriptor::union(members.into_iter().map(Descriptor::from)),
                TaggedDef::Enum(cases) => Descriptor::Enum(cases),
                TaggedDef::Array(item) => Descriptor::array(Descriptor::from(*item)),
                TaggedDef::Map(value) => Descriptor::map(Descriptor::from(*value)),
                TaggedDef::Object(object) => {
                    let properties = object.properties.into_iter().map(|p| {
                        let typed_key = p.js.unwrap_or_else(|| p.json.clone());
                        Property::new(p.json, typed_key, Descriptor::from(p.ty))
                    });
                    let additional = match object.additional {
                        AdditionalDef::Flag(false) => Additional::Reject,
                        AdditionalDef::Flag(true) => Additional::allow(Descriptor::Any),
                        AdditionalDef::Descriptor(def) => Additional::allow(Descriptor::from(*def)),
                    };
                    Descriptor::object(properties, additional)
                }
            },
        }
    }
}
