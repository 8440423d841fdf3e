use crate::model::property::{Property, PropertyId};

///
/// EntityModel
/// Runtime entity metadata: stable name plus ordered property list.
///

#[derive(Debug)]
pub struct EntityModel {
    /// Stable external name used in diagnostics.
    pub entity_name: &'static str,
    /// Ordered property list (authoritative for validation).
    pub properties: &'static [Property],
}

impl EntityModel {
    #[must_use]
    pub const fn new(entity_name: &'static str, properties: &'static [Property]) -> Self {
        Self {
            entity_name,
            properties,
        }
    }

    #[must_use]
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    /// True when `property` is one of this entity's descriptors.
    #[must_use]
    pub fn owns(&self, property: &Property) -> bool {
        self.property(property.id) == Some(property)
    }
}
