use crate::{
    model::Property,
    traits::EntityKind,
    value::{TextMode, Value, collate_cmp},
};
use derive_more::{BitAnd, BitOr};
use std::cmp::Ordering;

///
/// OrderFlags
///
/// Bit set controlling one sort key. The empty set is ascending,
/// case-insensitive, nulls first.
///

#[derive(BitAnd, BitOr, Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct OrderFlags(u8);

impl OrderFlags {
    pub const NONE: Self = Self(0);
    pub const DESCENDING: Self = Self(0x01);
    pub const CASE_SENSITIVE: Self = Self(0x02);
    pub const NULLS_LAST: Self = Self(0x04);

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

///
/// OrderSpec
/// One sort key: property plus flags.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OrderSpec {
    pub property: Property,
    pub flags: OrderFlags,
}

impl OrderSpec {
    #[must_use]
    pub const fn new(property: Property, flags: OrderFlags) -> Self {
        Self { property, flags }
    }

    /// Compare two property values under this key's flags.
    ///
    /// Null placement is governed only by NULLS_LAST; DESCENDING reverses
    /// the non-null ordering.
    #[must_use]
    pub fn compare(&self, left: &Value, right: &Value) -> Ordering {
        let nulls_last = self.flags.contains(OrderFlags::NULLS_LAST);

        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => {
                if nulls_last {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (false, true) => {
                if nulls_last {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (false, false) => {
                let mode = if self.flags.contains(OrderFlags::CASE_SENSITIVE) {
                    TextMode::Cs
                } else {
                    TextMode::Ci
                };
                let ord = collate_cmp(left, right, mode);

                if self.flags.contains(OrderFlags::DESCENDING) {
                    ord.reverse()
                } else {
                    ord
                }
            }
        }
    }
}

/// Sort entities by successive keys; rows equal on every key keep id order.
pub(crate) fn apply_order<E: EntityKind>(rows: &mut [E], order: &[OrderSpec]) {
    if order.is_empty() {
        return;
    }

    rows.sort_by(|left, right| {
        order
            .iter()
            .map(|spec| {
                spec.compare(
                    &left.get_value(spec.property.id),
                    &right.get_value(spec.property.id),
                )
            })
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| left.id().cmp(&right.id()))
    });
}

///
/// TESTS
///
