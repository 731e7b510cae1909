//! Per-shape property indexes.
//!
//! Decoding reads wire keys and writes typed keys; encoding does the reverse.
//! Each [`ObjectShape`] derives both lookups from its property list the first
//! time a direction is needed and keeps them for the rest of the process. The
//! fill goes through a `OnceCell`, so a concurrent first use publishes one
//! complete index and never a partial one.
use indexmap::IndexMap;

use crate::descriptor::{ObjectShape, Property};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// wire -> typed
    Decode,
    /// typed -> wire
    Encode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub output_key: String,
    /// Position of the property in [`ObjectShape::properties`].
    pub position: usize,
}

/// Input key -> output key, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyIndex {
    entries: IndexMap<String, IndexEntry>,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Decode => "decode",
            Direction::Encode => "encode",
        }
    }

    fn input_key(self, property: &Property) -> &str {
        match self {
            Direction::Decode => &property.wire_key,
            Direction::Encode => &property.typed_key,
        }
    }

    fn output_key(self, property: &Property) -> &str {
        match self {
            Direction::Decode => &property.typed_key,
            Direction::Encode => &property.wire_key,
        }
    }
}

impl PropertyIndex {
    pub fn build(properties: &[Property], direction: Direction) -> Self {
        let entries = properties
            .iter()
            .enumerate()
            .map(|(position, property)| {
                let entry = IndexEntry {
                    output_key: direction.output_key(property).to_owned(),
                    position,
                };
                (direction.input_key(property).to_owned(), entry)
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, input_key: &str) -> Option<&IndexEntry> {
        self.entries.get(input_key)
    }

    pub fn contains(&self, input_key: &str) -> bool {
        self.entries.contains_key(input_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ObjectShape {
    /// Memoized index for `direction`; built at most once per shape.
    pub fn index(&self, direction: Direction) -> &PropertyIndex {
        let cell = match direction {
            Direction::Decode => &self.decode_index,
            Direction::Encode => &self.encode_index,
        };
        cell.get_or_init(|| {
            tracing::trace!(
                direction = direction.name(),
                properties = self.properties().len(),
                "deriving property index"
            );
            PropertyIndex::build(self.properties(), direction)
        })
    }
}
