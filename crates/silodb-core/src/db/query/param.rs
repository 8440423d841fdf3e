use crate::{
    db::query::{
        error::ParameterError,
        predicate::{CompareOp, Operand, OperandArity, Predicate},
    },
    model::{Property, PropertyId, PropertyKind},
    traits::EntityKind,
};
use std::fmt;

///
/// ParameterSlot
///
/// Engine-facing address of a rebindable leaf operand: the property, plus
/// the alias when the caller addressed the leaf by alias.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParameterSlot {
    pub property: PropertyId,
    pub alias: Option<String>,
}

impl ParameterSlot {
    /// Whether a leaf with this property/alias is addressed by the slot.
    #[must_use]
    pub fn matches(&self, property: PropertyId, alias: Option<&str>) -> bool {
        match &self.alias {
            Some(wanted) => alias == Some(wanted.as_str()),
            None => property == self.property,
        }
    }
}

///
/// ParamTarget
/// Caller-facing addressing mode for `set_parameter*`.
///

#[derive(Clone, Copy, Debug)]
pub(crate) enum ParamTarget<'a> {
    Property(&'a Property),
    Alias(&'a str),
}

impl fmt::Display for ParamTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(p) => write!(f, "{}", p.name),
            Self::Alias(a) => write!(f, "{a}"),
        }
    }
}

///
/// SlotInfo
/// Declared shape of one leaf, captured at build time.
///

#[derive(Clone, Debug)]
pub(crate) struct SlotInfo {
    pub property: PropertyId,
    pub kind: PropertyKind,
    pub op: CompareOp,
    pub alias: Option<String>,
}

///
/// SlotTable
///

#[derive(Clone, Debug, Default)]
pub(crate) struct SlotTable {
    slots: Vec<SlotInfo>,
}

impl SlotTable {
    pub(crate) fn from_predicate<E: EntityKind>(predicate: &Predicate) -> Self {
        let mut slots = Vec::new();
        predicate.for_each_compare(&mut |cmp| {
            if let Some(property) = E::MODEL.property(cmp.property) {
                slots.push(SlotInfo {
                    property: cmp.property,
                    kind: property.kind,
                    op: cmp.op,
                    alias: cmp.alias.clone(),
                });
            }
        });

        Self { slots }
    }

    #[cfg(test)]
    pub(crate) const fn len(&self) -> usize {
        self.slots.len()
    }

    /// Locate exactly one leaf for `target`.
    pub(crate) fn resolve(
        &self,
        target: ParamTarget<'_>,
    ) -> Result<(&SlotInfo, ParameterSlot), ParameterError> {
        let matches: Vec<&SlotInfo> = self
            .slots
            .iter()
            .filter(|slot| match target {
                ParamTarget::Property(p) => slot.property == p.id,
                ParamTarget::Alias(a) => slot.alias.as_deref() == Some(a),
            })
            .collect();

        match matches.as_slice() {
            [] => Err(ParameterError::NotFound {
                target: target.to_string(),
            }),
            [slot] => {
                let alias = match target {
                    ParamTarget::Property(_) => None,
                    ParamTarget::Alias(a) => Some(a.to_string()),
                };
                Ok((
                    slot,
                    ParameterSlot {
                        property: slot.property,
                        alias,
                    },
                ))
            }
            many => Err(ParameterError::Ambiguous {
                target: target.to_string(),
                count: many.len(),
            }),
        }
    }
}

/// Check a new operand against the leaf's declared operator and property kind.
pub(crate) fn validate_operand(
    target: ParamTarget<'_>,
    slot: &SlotInfo,
    operand: &Operand,
) -> Result<(), ParameterError> {
    if operand.has_null() {
        return Err(ParameterError::NullArgument {
            target: target.to_string(),
        });
    }

    let expected = slot.op.arity();
    if operand.arity() != expected {
        return Err(ParameterError::TypeMismatch {
            target: target.to_string(),
            op: slot.op.label(),
            expected: arity_label(expected),
            found: arity_label(operand.arity()),
        });
    }

    if let Some(bad) = operand.values().into_iter().find(|v| !slot.kind.accepts(v)) {
        return Err(ParameterError::TypeMismatch {
            target: target.to_string(),
            op: slot.op.label(),
            expected: slot.kind.label(),
            found: bad.label(),
        });
    }

    Ok(())
}

const fn arity_label(arity: OperandArity) -> &'static str {
    match arity {
        OperandArity::Single => "a single value",
        OperandArity::Pair => "a value pair",
        OperandArity::List => "a value list",
    }
}
