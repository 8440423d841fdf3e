//! Runtime data model definitions.
//!
//! Static descriptors for entities and their properties. Entity types expose
//! one `EntityModel` each; conditions, ordering and parameter slots refer to
//! properties through these descriptors rather than by name.

pub mod entity;
pub mod property;

pub use entity::EntityModel;
pub use property::{Property, PropertyId, PropertyKind};
