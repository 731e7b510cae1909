//! The transform engine.
//!
//! One recursive dispatcher walks a value against a descriptor in either
//! direction. Decoding and encoding differ only in which property index an
//! object shape hands out, so a shape has a single definition for both.
//!
//! A property that is absent from its object is walked as a missing slot
//! (`None`) rather than as `null`. `Any` and `Undefined` accept the missing
//! slot and the property is then left out of the output; everything else
//! rejects it.
//!
//! Failure is a [`TypeMismatch`] value. Only unions look at it and move on to
//! their next member; every other level hands it straight back up, so the first
//! mismatch in document order ends the call.
use serde_json::{Map, Value};

use crate::date;
use crate::descriptor::{Additional, Descriptor, Kind, ObjectShape, same_case};
use crate::error::{Error, Path, Segment, TypeMismatch};
use crate::index::Direction;
use crate::table::DescriptorTable;

/// Default bound on object/array nesting of input documents.
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Deepest object/array nesting a document may have.
    pub max_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// A descriptor table plus the conversion entry points over it.
///
/// The engine holds no per-call state, so one instance may serve any number of
/// threads.
#[derive(Debug)]
pub struct Engine {
    table: DescriptorTable,
    options: EngineOptions,
}

/// Missing property (`None`) or a present value.
type Slot<'v> = Option<&'v Value>;

/// Where the walk currently is: the key/owner pair reported in errors, the
/// breadcrumb back to the root and the container depth.
#[derive(Clone, Copy)]
struct Site<'a> {
    key: &'a str,
    parent: &'a str,
    trail: &'a Trail<'a>,
    depth: usize,
}

enum Trail<'a> {
    Root,
    Key(&'a Trail<'a>, &'a str),
    Index(&'a Trail<'a>, usize),
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

impl Engine {
    pub fn new(table: DescriptorTable) -> Self {
        Self::with_options(table, EngineOptions::default())
    }

    pub fn with_options(table: DescriptorTable, options: EngineOptions) -> Self {
        Self { table, options }
    }

    pub fn table(&self) -> &DescriptorTable {
        &self.table
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// wire -> typed
    pub fn decode(&self, raw: &Value, root: &str) -> Result<Value, Error> {
        self.convert(raw, root, Direction::Decode)
    }

    /// typed -> wire
    pub fn encode(&self, typed: &Value, root: &str) -> Result<Value, Error> {
        self.convert(typed, root, Direction::Encode)
    }

    pub fn decode_str(&self, text: &str, root: &str) -> Result<Value, Error> {
        let raw = serde_json::from_str::<Value>(text)?;
        self.decode(&raw, root)
    }

    pub fn encode_to_string(&self, typed: &Value, root: &str) -> Result<String, Error> {
        let wire = self.encode(typed, root)?;
        Ok(serde_json::to_string_pretty(&wire)?)
    }

    pub fn convert(&self, value: &Value, root: &str, direction: Direction) -> Result<Value, Error> {
        self.table.resolve(root)?;
        // Entering through a ref names the root type in errors.
        let entry = Descriptor::Ref(root.to_owned());
        Ok(self.run(value, &entry, direction)?)
    }

    /// Walks `value` against a descriptor that need not live in the table; its
    /// refs must still point into the table.
    pub fn transform(&self, value: &Value, descriptor: &Descriptor, direction: Direction) -> Result<Value, Error> {
        self.table.check_external(descriptor)?;
        Ok(self.run(value, descriptor, direction)?)
    }

    fn run(&self, value: &Value, descriptor: &Descriptor, direction: Direction) -> Result<Value, TypeMismatch> {
        let walk = Walk { table: &self.table, options: self.options, direction };
        let site = Site { key: "", parent: "", trail: &Trail::Root, depth: 0 };
        let out = walk.value(Some(value), descriptor, site)?;
        Ok(out.unwrap_or(Value::Null))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DISPATCH
// ————————————————————————————————————————————————————————————————————————————

struct Walk<'e> {
    table: &'e DescriptorTable,
    options: EngineOptions,
    direction: Direction,
}

impl<'e> Walk<'e> {
    fn value(&self, slot: Slot<'_>, descriptor: &Descriptor, site: Site<'_>) -> Result<Option<Value>, TypeMismatch> {
        let mut descriptor = descriptor;
        let mut ref_name: Option<&str> = None;
        loop {
            match descriptor {
                Descriptor::Any => return Ok(slot.cloned()),
                Descriptor::Null => {
                    return match slot {
                        Some(Value::Null) => Ok(Some(Value::Null)),
                        _ => Err(mismatch(descriptor, slot, site)),
                    };
                }
                Descriptor::Never => return Err(mismatch(descriptor, slot, site)),
                Descriptor::Undefined => {
                    return match slot {
                        None => Ok(None),
                        Some(_) => Err(mismatch(descriptor, slot, site)),
                    };
                }
                Descriptor::Ref(name) => {
                    // Tables are validated, so a miss means a hand-built descriptor.
                    let Some(resolved) = self.table.get(name) else {
                        return Err(mismatch(name.as_str(), slot, site));
                    };
                    ref_name = Some(name.as_str());
                    descriptor = resolved;
                }
                _ => break,
            }
        }

        match descriptor {
            Descriptor::Enum(cases) => match slot {
                Some(value) if cases.iter().any(|case| same_case(case, value)) => Ok(Some(value.clone())),
                _ => Err(mismatch(descriptor, slot, site)),
            },
            Descriptor::Union(members) => self.union(members, descriptor, slot, site),
            Descriptor::Array(item) => self.array(item, slot, site).map(Some),
            Descriptor::Object(shape) => self.object(shape, ref_name, slot, site).map(Some),
            Descriptor::Date => self.date(slot, site),
            Descriptor::Primitive(kind) => primitive(*kind, slot, site),
            Descriptor::Literal(_) => Err(mismatch(descriptor, slot, site)),
            Descriptor::Any | Descriptor::Null | Descriptor::Never | Descriptor::Undefined | Descriptor::Ref(_) => {
                unreachable!("handled while resolving refs")
            }
        }
    }

    fn union(
        &self,
        members: &[Descriptor],
        whole: &Descriptor,
        slot: Slot<'_>,
        site: Site<'_>,
    ) -> Result<Option<Value>, TypeMismatch> {
        // Members see neither the key nor the owner; the union reports both.
        let member_site = Site { key: "", parent: "", ..site };
        for (position, member) in members.iter().enumerate() {
            match self.value(slot, member, member_site) {
                Ok(out) => return Ok(out),
                Err(rejection) => {
                    tracing::trace!(position, member = %member, %rejection, "union member rejected");
                }
            }
        }
        Err(mismatch(whole, slot, site))
    }

    fn array(&self, item: &Descriptor, slot: Slot<'_>, site: Site<'_>) -> Result<Value, TypeMismatch> {
        let Some(Value::Array(elements)) = slot else {
            return Err(mismatch("array", slot, site));
        };
        self.enter(slot, site)?;
        let mut out = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            let trail = Trail::Index(site.trail, index);
            let element_site = Site { key: "", parent: "", trail: &trail, depth: site.depth + 1 };
            let converted = self.value(Some(element), item, element_site)?;
            out.push(converted.unwrap_or(Value::Null));
        }
        Ok(Value::Array(out))
    }

    fn object(
        &self,
        shape: &ObjectShape,
        ref_name: Option<&str>,
        slot: Slot<'_>,
        site: Site<'_>,
    ) -> Result<Value, TypeMismatch> {
        let Some(Value::Object(input)) = slot else {
            return Err(mismatch(ref_name.unwrap_or("object"), slot, site));
        };
        self.enter(slot, site)?;
        let owner = ref_name.unwrap_or("");
        let index = shape.index(self.direction);
        let mut out = Map::new();

        for (input_key, entry) in index.iter() {
            let property = &shape.properties()[entry.position];
            let trail = Trail::Key(site.trail, input_key);
            let child = Site { key: input_key, parent: owner, trail: &trail, depth: site.depth + 1 };
            if let Some(converted) = self.value(input.get(input_key), &property.descriptor, child)? {
                out.insert(entry.output_key.clone(), converted);
            }
        }

        for (key, value) in input {
            if index.contains(key) {
                continue;
            }
            let trail = Trail::Key(site.trail, key);
            let child = Site { key, parent: owner, trail: &trail, depth: site.depth + 1 };
            let extra = match shape.additional() {
                Additional::Reject => return Err(mismatch(&Descriptor::Never, Some(value), child)),
                Additional::Allow(descriptor) => descriptor,
            };
            if let Some(converted) = self.value(Some(value), extra, child)? {
                out.insert(key.clone(), converted);
            }
        }

        Ok(Value::Object(out))
    }

    /// `site.depth` counts the containers around the one being entered.
    fn enter(&self, slot: Slot<'_>, site: Site<'_>) -> Result<(), TypeMismatch> {
        if site.depth < self.options.max_depth {
            return Ok(());
        }
        let expected = format!("a value nested at most {} levels deep", self.options.max_depth);
        Err(mismatch(expected, slot, site))
    }

    /// Numbers are never read as timestamps.
    fn date(&self, slot: Slot<'_>, site: Site<'_>) -> Result<Option<Value>, TypeMismatch> {
        match slot {
            Some(Value::Null) => Ok(Some(Value::Null)),
            Some(Value::String(text)) => match date::normalize(text) {
                Some(canonical) => Ok(Some(Value::String(canonical))),
                None => Err(mismatch(&Descriptor::Date, slot, site)),
            },
            _ => Err(mismatch(&Descriptor::Date, slot, site)),
        }
    }
}

fn primitive(kind: Kind, slot: Slot<'_>, site: Site<'_>) -> Result<Option<Value>, TypeMismatch> {
    match slot {
        Some(value) if kind.matches(value) => Ok(Some(value.clone())),
        _ => Err(mismatch(kind.name(), slot, site)),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ERRORS
// ————————————————————————————————————————————————————————————————————————————

/// Anything that can phrase what was expected.
trait Expected {
    fn describe(self) -> String;
}

impl Expected for &str {
    fn describe(self) -> String {
        self.to_owned()
    }
}

impl Expected for String {
    fn describe(self) -> String {
        self
    }
}

impl Expected for &Descriptor {
    fn describe(self) -> String {
        self.to_string()
    }
}

fn mismatch(expected: impl Expected, slot: Slot<'_>, site: Site<'_>) -> TypeMismatch {
    TypeMismatch {
        expected: expected.describe(),
        actual: slot.map_or_else(|| "undefined".to_owned(), Value::to_string),
        key: site.key.to_owned(),
        parent: site.parent.to_owned(),
        path: site.trail.to_path(),
    }
}

impl Trail<'_> {
    fn to_path(&self) -> Path {
        let mut segments = Vec::new();
        let mut at = self;
        loop {
            match at {
                Trail::Root => break,
                Trail::Key(up, key) => {
                    segments.push(Segment::Key((*key).to_owned()));
                    at = *up;
                }
                Trail::Index(up, index) => {
                    segments.push(Segment::Index(*index));
                    at = *up;
                }
            }
        }
        segments.reverse();
        Path::from(segments)
    }
}
