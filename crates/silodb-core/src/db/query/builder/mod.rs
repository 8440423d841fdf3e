//! Fluent condition builder.
//!
//! Conditions accumulate into OR-separated groups of AND-joined leaves, so
//! AND binds tighter than OR: `a.and().b.or().c` is `(a AND b) OR c`, and
//! adjacent conditions without an explicit combinator are AND-joined.


use crate::{
    db::{
        Store,
        query::{
            compiled::{Query, QueryComparator, QueryFilter},
            error::{BuilderError, QueryError},
            order::{OrderFlags, OrderSpec},
            predicate::{CoercionId, CompareOp, ComparePredicate, Operand, Predicate},
        },
        relation::{EagerRelation, RelationInfo},
    },
    model::Property,
    obs::sink::{self, MetricsEvent},
    traits::EntityKind,
    value::Value,
};
use std::{cmp::Ordering, fmt, sync::Arc};

///
/// StringOrder
/// Case handling for string conditions.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StringOrder {
    #[default]
    CaseInsensitive,
    CaseSensitive,
}

impl StringOrder {
    const fn coercion(self) -> CoercionId {
        match self {
            Self::CaseInsensitive => CoercionId::TextCasefold,
            Self::CaseSensitive => CoercionId::Strict,
        }
    }
}

///
/// Combinator
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Combinator {
    And,
    Or,
}

impl Combinator {
    const fn label(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

///
/// QueryBuilder
///
/// Consuming builder for one entity type. Every mutating call validates
/// eagerly and returns the builder back, so sequencing errors surface at
/// the offending call. `build` consumes the builder.
///

pub struct QueryBuilder<E: EntityKind> {
    store: Store<E>,
    groups: Vec<Vec<Predicate>>,
    pending: Option<Combinator>,
    order: Vec<OrderSpec>,
    filter: Option<QueryFilter<E>>,
    comparator: Option<QueryComparator<E>>,
    eager: Vec<EagerRelation<E>>,
}

impl<E: EntityKind> fmt::Debug for QueryBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("entity", &E::MODEL.entity_name)
            .field("groups", &self.groups)
            .field("pending", &self.pending)
            .field("order", &self.order)
            .field("filter", &self.filter.is_some())
            .field("comparator", &self.comparator.is_some())
            .field("eager", &self.eager)
            .finish()
    }
}

impl<E: EntityKind> QueryBuilder<E> {
    pub(crate) const fn new(store: Store<E>) -> Self {
        Self {
            store,
            groups: Vec::new(),
            pending: None,
            order: Vec::new(),
            filter: None,
            comparator: None,
            eager: Vec::new(),
        }
    }

    // ---- conditions -----------------------------------------------------

    /// Generic leaf entry point; the typed helpers below all route here.
    pub fn compare(
        self,
        property: &Property,
        op: CompareOp,
        operand: Operand,
        string_order: StringOrder,
    ) -> Result<Self, QueryError> {
        self.check_property(property)?;

        let kind = property.kind;
        if (op.is_text_only() && !kind.is_text()) || (op.is_numeric_only() && kind.is_text()) {
            return Err(BuilderError::OperatorMismatch {
                property: property.name,
                op: op.label(),
                kind: kind.label(),
            }
            .into());
        }
        if operand.has_null() {
            return Err(BuilderError::NullOperand {
                property: property.name,
                op: op.label(),
            }
            .into());
        }
        if let Some(bad) = operand.values().into_iter().find(|v| !kind.accepts(v)) {
            return Err(BuilderError::OperandMismatch {
                property: property.name,
                op: op.label(),
                kind: kind.label(),
                found: bad.label(),
            }
            .into());
        }

        let coercion = if kind.is_text() {
            string_order.coercion()
        } else {
            CoercionId::NumericWiden
        };

        Ok(self.push(Predicate::Compare(ComparePredicate::new(
            property.id,
            property.name,
            op,
            operand,
            coercion,
        ))))
    }

    pub fn equal(self, property: &Property, value: impl Into<Value>) -> Result<Self, QueryError> {
        self.single(property, CompareOp::Eq, value.into())
    }

    pub fn not_equal(
        self,
        property: &Property,
        value: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        self.single(property, CompareOp::Ne, value.into())
    }

    pub fn less(self, property: &Property, value: impl Into<Value>) -> Result<Self, QueryError> {
        self.single(property, CompareOp::Lt, value.into())
    }

    pub fn greater(self, property: &Property, value: impl Into<Value>) -> Result<Self, QueryError> {
        self.single(property, CompareOp::Gt, value.into())
    }

    /// Inclusive on both ends.
    pub fn between(
        self,
        property: &Property,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        self.compare(
            property,
            CompareOp::Between,
            Operand::Pair(low.into(), high.into()),
            StringOrder::default(),
        )
    }

    pub fn is_in<V: Into<Value>>(
        self,
        property: &Property,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, QueryError> {
        self.list(property, CompareOp::In, values)
    }

    pub fn not_in<V: Into<Value>>(
        self,
        property: &Property,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, QueryError> {
        self.list(property, CompareOp::NotIn, values)
    }

    pub fn contains(self, property: &Property, value: &str) -> Result<Self, QueryError> {
        self.single(property, CompareOp::Contains, value.into())
    }

    pub fn starts_with(self, property: &Property, value: &str) -> Result<Self, QueryError> {
        self.single(property, CompareOp::StartsWith, value.into())
    }

    pub fn ends_with(self, property: &Property, value: &str) -> Result<Self, QueryError> {
        self.single(property, CompareOp::EndsWith, value.into())
    }

    pub fn is_null(self, property: &Property) -> Result<Self, QueryError> {
        self.check_property(property)?;

        Ok(self.push(Predicate::IsNull {
            property: property.id,
            name: property.name,
        }))
    }

    pub fn not_null(self, property: &Property) -> Result<Self, QueryError> {
        self.check_property(property)?;

        Ok(self.push(Predicate::NotNull {
            property: property.id,
            name: property.name,
        }))
    }

    // ---- combinators ----------------------------------------------------

    /// Join the previous condition and the next one with OR.
    pub fn or(self) -> Result<Self, QueryError> {
        self.combinator(Combinator::Or)
    }

    /// Join the previous condition and the next one with AND. Adjacent
    /// conditions are AND-joined anyway; this only makes it explicit.
    pub fn and(self) -> Result<Self, QueryError> {
        self.combinator(Combinator::And)
    }

    /// Name the most recent condition so it can be rebound by alias.
    pub fn parameter_alias(mut self, alias: impl Into<String>) -> Result<Self, QueryError> {
        self.check_not_pending("parameter_alias")?;

        let Some(Predicate::Compare(leaf)) = self.groups.last_mut().and_then(|g| g.last_mut())
        else {
            return Err(BuilderError::AliasWithoutCondition.into());
        };
        leaf.alias = Some(alias.into());

        Ok(self)
    }

    // ---- ordering & post-processing -------------------------------------

    /// Add a sort key; repeated calls add secondary keys.
    pub fn order(mut self, property: &Property, flags: OrderFlags) -> Result<Self, QueryError> {
        self.check_not_pending("order")?;
        self.check_property(property)?;
        self.order.push(OrderSpec::new(*property, flags));

        Ok(self)
    }

    /// Keep only entities the closure accepts, after storage matching.
    /// Only `find` and `for_each` support a filter.
    pub fn filter(
        mut self,
        filter: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Result<Self, QueryError> {
        if self.filter.is_some() {
            return Err(BuilderError::AlreadyAttached { what: "filter" }.into());
        }
        self.filter = Some(Arc::new(filter));

        Ok(self)
    }

    /// Sort results in memory after materialization. Only `find` supports
    /// a comparator.
    pub fn sort(
        mut self,
        comparator: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static,
    ) -> Result<Self, QueryError> {
        if self.comparator.is_some() {
            return Err(BuilderError::AlreadyAttached { what: "comparator" }.into());
        }
        self.comparator = Some(Arc::new(comparator));

        Ok(self)
    }

    /// Resolve `relation` for results at index < `limit` (0 = all).
    #[must_use]
    pub fn eager(mut self, relation: RelationInfo<E>, limit: usize) -> Self {
        self.eager.push(EagerRelation { relation, limit });
        self
    }

    // ---- terminal -------------------------------------------------------

    /// Compile the condition tree into a reusable `Query`.
    pub fn build(self) -> Result<Query<E>, QueryError> {
        if let Some(pending) = self.pending {
            return Err(BuilderError::DanglingCombinator {
                pending: pending.label(),
            }
            .into());
        }

        let predicate = Self::fold_groups(self.groups);
        let handle = self
            .store
            .observe(self.store.engine().compile(&predicate, &self.order))?;

        sink::record(MetricsEvent::QueryCompiled {
            entity: E::MODEL.entity_name,
        });
        tracing::debug!(
            entity = E::MODEL.entity_name,
            %handle,
            order_keys = self.order.len(),
            "query compiled"
        );

        Ok(Query::new(
            self.store,
            handle,
            &predicate,
            !self.order.is_empty(),
            self.filter,
            self.comparator,
            self.eager,
        ))
    }

    // ---- internals ------------------------------------------------------

    fn single(self, property: &Property, op: CompareOp, value: Value) -> Result<Self, QueryError> {
        self.compare(property, op, Operand::Single(value), StringOrder::default())
    }

    fn list<V: Into<Value>>(
        self,
        property: &Property,
        op: CompareOp,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self, QueryError> {
        let values = values.into_iter().map(Into::into).collect();

        self.compare(property, op, Operand::List(values), StringOrder::default())
    }

    fn check_property(&self, property: &Property) -> Result<(), QueryError> {
        if E::MODEL.owns(property) {
            Ok(())
        } else {
            Err(BuilderError::UnknownProperty {
                entity: E::MODEL.entity_name,
                property: property.name,
            }
            .into())
        }
    }

    fn check_not_pending(&self, attempted: &'static str) -> Result<(), QueryError> {
        match self.pending {
            Some(pending) => Err(BuilderError::CombinatorPending {
                pending: pending.label(),
                attempted,
            }
            .into()),
            None => Ok(()),
        }
    }

    fn combinator(mut self, combinator: Combinator) -> Result<Self, QueryError> {
        if self.groups.is_empty() {
            return Err(BuilderError::NoPrecedingCondition {
                combinator: combinator.label(),
            }
            .into());
        }
        self.check_not_pending(combinator.label())?;
        self.pending = Some(combinator);

        Ok(self)
    }

    fn push(mut self, condition: Predicate) -> Self {
        match (self.pending.take(), self.groups.last_mut()) {
            (Some(Combinator::And) | None, Some(group)) => group.push(condition),
            _ => self.groups.push(vec![condition]),
        }

        self
    }

    fn fold_groups(groups: Vec<Vec<Predicate>>) -> Predicate {
        let mut ors: Vec<Predicate> = groups
            .into_iter()
            .map(|mut group| {
                if group.len() == 1 {
                    group.remove(0)
                } else {
                    Predicate::And(group)
                }
            })
            .collect();

        match ors.len() {
            0 => Predicate::True,
            1 => ors.remove(0),
            _ => Predicate::Or(ors),
        }
    }
}
