use crate::{
    db::{
        engine::{CursorHandle, ExecMode, ExecOutput, QueryHandle, StorageEngine},
        query::{
            order::{OrderSpec, apply_order},
            param::ParameterSlot,
            predicate::{Operand, Predicate, eval},
        },
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::{PropertyId, PropertyKind},
    traits::{EntityId, EntityKind},
};
use parking_lot::{Condvar, Mutex, RwLock};
use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

type Rows<E> = BTreeMap<EntityId, E>;

///
/// MemoryEngine
///
/// Reference `StorageEngine` kept entirely in memory.
///
/// Read cursors pin an `Arc` snapshot of the committed rows. A single
/// writer at a time works on a private copy that replaces the committed
/// map on commit. Conditions are evaluated by linear scan in id order.
///

pub struct MemoryEngine<E: EntityKind> {
    state: RwLock<EngineState<E>>,
    writer_busy: Mutex<bool>,
    writer_free: Condvar,
    read_faults: Mutex<VecDeque<InternalError>>,
    next_handle: AtomicU64,
    reads_started: AtomicU64,
}

struct EngineState<E> {
    rows: Arc<Rows<E>>,
    next_id: EntityId,
    queries: HashMap<QueryHandle, CompiledQuery>,
    cursors: HashMap<CursorHandle, Cursor<E>>,
}

struct CompiledQuery {
    predicate: Predicate,
    order: Vec<OrderSpec>,
}

enum Cursor<E> {
    Read(Arc<Rows<E>>),
    Write { rows: Rows<E>, next_id: EntityId },
}

impl<E> Cursor<E> {
    fn rows(&self) -> &Rows<E> {
        match self {
            Self::Read(rows) => rows,
            Self::Write { rows, .. } => rows,
        }
    }
}

impl<E: EntityKind> Default for MemoryEngine<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EntityKind> MemoryEngine<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState {
                rows: Arc::new(BTreeMap::new()),
                next_id: 1,
                queries: HashMap::new(),
                cursors: HashMap::new(),
            }),
            writer_busy: Mutex::new(false),
            writer_free: Condvar::new(),
            read_faults: Mutex::new(VecDeque::new()),
            next_handle: AtomicU64::new(1),
            reads_started: AtomicU64::new(0),
        }
    }

    // ---- fault injection ------------------------------------------------

    /// Make the next `count` read transactions fail with a transient conflict.
    pub fn inject_read_conflicts(&self, count: usize) {
        let mut faults = self.read_faults.lock();
        for n in 0..count {
            faults.push_back(InternalError::transient_conflict(format!(
                "injected read conflict {}",
                n + 1
            )));
        }
    }

    /// Make the next read transaction fail with `err`.
    pub fn inject_read_fault(&self, err: InternalError) {
        self.read_faults.lock().push_back(err);
    }

    /// Number of read transactions successfully opened so far.
    #[must_use]
    pub fn reads_started(&self) -> u64 {
        self.reads_started.load(Ordering::Relaxed)
    }

    /// Number of compiled handles not yet destroyed.
    #[must_use]
    pub fn live_queries(&self) -> usize {
        self.state.read().queries.len()
    }

    /// Number of cursors not yet committed or released.
    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.state.read().cursors.len()
    }

    // ---- internals ------------------------------------------------------

    fn next_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    fn release_writer(&self) {
        *self.writer_busy.lock() = false;
        self.writer_free.notify_one();
    }

    fn unknown_cursor(cursor: CursorHandle) -> InternalError {
        InternalError::engine_invariant(format!("{cursor} is not open"))
    }

    fn unknown_query(handle: QueryHandle) -> InternalError {
        InternalError::use_after_close(&format!("{handle}"))
    }

    fn matching(query: &CompiledQuery, rows: &Rows<E>) -> Vec<E> {
        let mut out: Vec<E> = rows
            .values()
            .filter(|row| eval(*row, &query.predicate))
            .cloned()
            .collect();
        apply_order(&mut out, &query.order);

        out
    }

    fn property_kind(property: PropertyId) -> Result<PropertyKind, InternalError> {
        E::MODEL.property(property).map(|p| p.kind).ok_or_else(|| {
            InternalError::engine_invariant(format!(
                "property {property} is not part of entity '{}'",
                E::MODEL.entity_name
            ))
        })
    }

    fn aggregate(mode: ExecMode, matches: &[E]) -> Result<ExecOutput<E>, InternalError> {
        match mode {
            ExecMode::Sum(p) | ExecMode::Min(p) | ExecMode::Max(p) => {
                if !Self::property_kind(p)?.is_integral() {
                    return Err(InternalError::engine_type_mismatch(format!(
                        "{} requires an integer property",
                        mode.label()
                    )));
                }
                let mut values = matches.iter().filter_map(|e| e.get_value(p).as_int());

                let out = match mode {
                    ExecMode::Sum(_) => values
                        .try_fold(0_i64, i64::checked_add)
                        .ok_or_else(|| InternalError::engine_invariant("integer sum overflowed"))?,
                    ExecMode::Min(_) => values.min().unwrap_or(0),
                    _ => values.max().unwrap_or(0),
                };

                Ok(ExecOutput::Long(out))
            }
            ExecMode::SumDouble(p) | ExecMode::MinDouble(p) | ExecMode::MaxDouble(p) => {
                if !Self::property_kind(p)?.is_float() {
                    return Err(InternalError::engine_type_mismatch(format!(
                        "{} requires a floating property",
                        mode.label()
                    )));
                }
                let values = matches.iter().filter_map(|e| e.get_value(p).as_f64());

                let out = match mode {
                    ExecMode::SumDouble(_) => values.sum(),
                    ExecMode::MinDouble(_) => values.reduce(f64::min).unwrap_or(0.0),
                    _ => values.reduce(f64::max).unwrap_or(0.0),
                };

                Ok(ExecOutput::Double(out))
            }
            ExecMode::Avg(p) => {
                let kind = Self::property_kind(p)?;
                if !kind.is_integral() && !kind.is_float() {
                    return Err(InternalError::engine_type_mismatch(
                        "avg requires a numeric property",
                    ));
                }
                let values: Vec<f64> = matches
                    .iter()
                    .filter_map(|e| e.get_value(p).as_f64())
                    .collect();

                #[allow(clippy::cast_precision_loss)]
                let avg = if values.is_empty() {
                    f64::NAN
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                };

                Ok(ExecOutput::Double(avg))
            }
            _ => Err(InternalError::engine_invariant(format!(
                "{} is not an aggregate",
                mode.label()
            ))),
        }
    }
}

impl<E: EntityKind> StorageEngine<E> for MemoryEngine<E> {
    fn compile(
        &self,
        predicate: &Predicate,
        order: &[OrderSpec],
    ) -> Result<QueryHandle, InternalError> {
        let handle = QueryHandle(self.next_handle());
        self.state.write().queries.insert(
            handle,
            CompiledQuery {
                predicate: predicate.clone(),
                order: order.to_vec(),
            },
        );

        Ok(handle)
    }

    fn destroy(&self, handle: QueryHandle) {
        self.state.write().queries.remove(&handle);
    }

    fn bind(
        &self,
        handle: QueryHandle,
        slot: &ParameterSlot,
        operand: Operand,
    ) -> Result<(), InternalError> {
        let mut state = self.state.write();
        let query = state
            .queries
            .get_mut(&handle)
            .ok_or_else(|| Self::unknown_query(handle))?;

        let mut bound = 0_usize;
        query.predicate.for_each_compare_mut(&mut |cmp| {
            if slot.matches(cmp.property, cmp.alias.as_deref()) {
                cmp.operand = operand.clone();
                bound += 1;
            }
        });

        if bound == 0 {
            return Err(InternalError::new(
                ErrorClass::InvalidArgument,
                ErrorOrigin::Engine,
                format!("{handle} has no condition for property {}", slot.property),
            ));
        }

        Ok(())
    }

    fn execute(
        &self,
        handle: QueryHandle,
        cursor: CursorHandle,
        mode: ExecMode,
    ) -> Result<ExecOutput<E>, InternalError> {
        if mode == ExecMode::Remove {
            let mut state = self.state.write();
            let state = &mut *state;
            let query = state
                .queries
                .get(&handle)
                .ok_or_else(|| Self::unknown_query(handle))?;
            let Some(Cursor::Write { rows, .. }) = state.cursors.get_mut(&cursor) else {
                return Err(InternalError::new(
                    ErrorClass::Unsupported,
                    ErrorOrigin::Engine,
                    "remove requires a write transaction",
                ));
            };

            let doomed: Vec<EntityId> = Self::matching(query, rows)
                .iter()
                .map(EntityKind::id)
                .collect();
            for id in &doomed {
                rows.remove(id);
            }

            return Ok(ExecOutput::Removed(doomed.len() as u64));
        }

        let state = self.state.read();
        let query = state
            .queries
            .get(&handle)
            .ok_or_else(|| Self::unknown_query(handle))?;
        let rows = state
            .cursors
            .get(&cursor)
            .ok_or_else(|| Self::unknown_cursor(cursor))?
            .rows();
        let matches = Self::matching(query, rows);

        match mode {
            ExecMode::First => Ok(ExecOutput::Entity(matches.into_iter().next())),
            ExecMode::Unique => {
                if matches.len() > 1 {
                    return Err(InternalError::not_unique(matches.len()));
                }
                Ok(ExecOutput::Entity(matches.into_iter().next()))
            }
            ExecMode::Find { offset, limit } => {
                let offset = usize::try_from(offset).unwrap_or(usize::MAX);
                let limit = match limit {
                    0 => usize::MAX,
                    n => usize::try_from(n).unwrap_or(usize::MAX),
                };

                Ok(ExecOutput::Entities(
                    matches.into_iter().skip(offset).take(limit).collect(),
                ))
            }
            ExecMode::IdsUnordered => Ok(ExecOutput::Ids(
                matches.iter().map(EntityKind::id).collect(),
            )),
            ExecMode::Count => Ok(ExecOutput::Count(matches.len() as u64)),
            _ => Self::aggregate(mode, &matches),
        }
    }

    fn begin_read(&self) -> Result<CursorHandle, InternalError> {
        if let Some(fault) = self.read_faults.lock().pop_front() {
            return Err(fault);
        }

        let cursor = CursorHandle(self.next_handle());
        let mut state = self.state.write();
        let snapshot = Arc::clone(&state.rows);
        state.cursors.insert(cursor, Cursor::Read(snapshot));
        self.reads_started.fetch_add(1, Ordering::Relaxed);

        Ok(cursor)
    }

    fn begin_write(&self) -> Result<CursorHandle, InternalError> {
        {
            let mut busy = self.writer_busy.lock();
            while *busy {
                self.writer_free.wait(&mut busy);
            }
            *busy = true;
        }

        let cursor = CursorHandle(self.next_handle());
        let mut state = self.state.write();
        let rows = state.rows.as_ref().clone();
        let next_id = state.next_id;
        state.cursors.insert(cursor, Cursor::Write { rows, next_id });

        Ok(cursor)
    }

    fn commit(&self, cursor: CursorHandle) -> Result<(), InternalError> {
        let mut state = self.state.write();
        match state.cursors.remove(&cursor) {
            Some(Cursor::Read(_)) => Ok(()),
            Some(Cursor::Write { rows, next_id }) => {
                state.rows = Arc::new(rows);
                state.next_id = next_id;
                drop(state);
                self.release_writer();

                Ok(())
            }
            None => Err(Self::unknown_cursor(cursor)),
        }
    }

    fn release(&self, cursor: CursorHandle) {
        let removed = self.state.write().cursors.remove(&cursor);
        if matches!(removed, Some(Cursor::Write { .. })) {
            self.release_writer();
        }
    }

    fn get(&self, cursor: CursorHandle, id: EntityId) -> Result<Option<E>, InternalError> {
        let state = self.state.read();
        let rows = state
            .cursors
            .get(&cursor)
            .ok_or_else(|| Self::unknown_cursor(cursor))?
            .rows();

        Ok(rows.get(&id).cloned())
    }

    fn put(&self, cursor: CursorHandle, mut entity: E) -> Result<EntityId, InternalError> {
        let mut state = self.state.write();
        let Some(Cursor::Write { rows, next_id }) = state.cursors.get_mut(&cursor) else {
            return Err(InternalError::new(
                ErrorClass::Unsupported,
                ErrorOrigin::Engine,
                "put requires a write transaction",
            ));
        };

        let id = match entity.id() {
            0 => *next_id,
            id => id,
        };
        *next_id = (*next_id).max(id + 1);
        entity.set_id(id);
        rows.insert(id, entity);

        Ok(id)
    }
}
