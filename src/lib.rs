//! Descriptor-driven JSON conversion.
//!
//! A [`DescriptorTable`] names a set of type descriptors; an [`Engine`] walks
//! untyped JSON against them. Decoding validates wire-format JSON and renames
//! its keys to the typed shape; encoding validates the typed shape and renames
//! keys back. Both directions share one definition per type.
//!
//! ```
//! use json_cast::{Additional, Descriptor, DescriptorTable, Engine, Property};
//! use serde_json::json;
//!
//! let entity = Descriptor::object(
//!     [Property::new("__identifier", "identifier", Descriptor::string())],
//!     Additional::Reject,
//! );
//! let table = DescriptorTable::builder().define("Entity", entity).build()?;
//! let engine = Engine::new(table);
//!
//! let typed = engine.decode(&json!({"__identifier": "Door"}), "Entity")?;
//! assert_eq!(typed, json!({"identifier": "Door"}));
//! assert_eq!(engine.encode(&typed, "Entity")?, json!({"__identifier": "Door"}));
//! # Ok::<(), json_cast::Error>(())
//! ```
pub mod date;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod index;
pub mod path_de;
pub mod table;

pub use descriptor::{Additional, Descriptor, Kind, ObjectShape, Property};
pub use engine::{Engine, EngineOptions};
pub use error::{Error, Path, SchemaError, Segment, TypeMismatch};
pub use index::{Direction, PropertyIndex};
pub use table::{DescriptorTable, TableBuilder};
