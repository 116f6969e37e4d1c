//! The per-entity format state machine.
//!
//! A storage holds at most one tile map per format slot and a validity
//! bitmask word with one bit per format code. The manager owns the
//! registered per-format hooks:
//!
//! - **constructor** -- materialise an empty slot,
//! - **validator** -- bring a freshly constructed slot to a consistent
//!   empty state,
//! - **discard** -- drop slot contents before an overwrite,
//! - **converter** -- rebuild one slot's contents from another's.
//!
//! `validate_rw` finds the shortest path of converters (BFS over the
//! registered edges, ties broken by registration order) from any valid
//! format to the target and executes it, leaving previously valid bits
//! set. `validate_rwd` additionally invalidates everything but the
//! target; `validate_wd` skips conversion entirely and discards;
//! `validate_ctor` only guarantees the slot exists.

use crate::status::Status;
use std::collections::VecDeque;
use std::sync::Arc;

/// Registered hook operating on a concrete storage type.
pub type StorageFn<S> = Arc<dyn Fn(&mut S) -> Result<(), Status> + Send + Sync>;

/// Validity-mask and slot bookkeeping a storage must expose to the
/// manager.
pub trait StorageControl {
    /// True when the slot for `format` is materialised.
    fn is_constructed(&self, format: usize) -> bool;

    /// Current validity bitmask.
    fn validity(&self) -> u32;

    /// Replace the validity bitmask.
    fn set_validity(&mut self, mask: u32);

    /// True when `format`'s bit is set.
    fn is_valid(&self, format: usize) -> bool {
        self.validity() & (1 << format) != 0
    }

    /// True when any bit is set.
    fn is_valid_any(&self) -> bool {
        self.validity() != 0
    }

    /// Set `format`'s bit.
    fn mark_valid(&mut self, format: usize) {
        let mask = self.validity() | (1 << format);
        self.set_validity(mask);
    }
}

/// Format converter registry and validation driver for one storage type.
pub struct StorageManager<S> {
    capacity: usize,
    constructors: Vec<Option<StorageFn<S>>>,
    validators: Vec<Option<StorageFn<S>>>,
    discards: Vec<Option<StorageFn<S>>>,
    // convert_rules[from] lists (to, converter id) in registration order.
    convert_rules: Vec<Vec<(usize, usize)>>,
    converters: Vec<StorageFn<S>>,
}

impl<S: StorageControl> StorageManager<S> {
    /// Manager over `capacity` format codes.
    pub fn new(capacity: usize) -> Self {
        StorageManager {
            capacity,
            constructors: vec![None; capacity],
            validators: vec![None; capacity],
            discards: vec![None; capacity],
            convert_rules: vec![Vec::new(); capacity],
            converters: Vec::new(),
        }
    }

    /// Register the slot constructor for `format`.
    pub fn register_constructor(&mut self, format: usize, f: StorageFn<S>) {
        self.constructors[format] = Some(f);
    }

    /// Register the empty-state validator for `format`.
    pub fn register_validator(&mut self, format: usize, f: StorageFn<S>) {
        self.validators[format] = Some(f);
    }

    /// Register the overwrite discarder for `format`.
    pub fn register_discard(&mut self, format: usize, f: StorageFn<S>) {
        self.discards[format] = Some(f);
    }

    /// Register one hook as both validator and discarder.
    pub fn register_validator_discard(&mut self, format: usize, f: StorageFn<S>) {
        self.validators[format] = Some(Arc::clone(&f));
        self.discards[format] = Some(f);
    }

    /// Register a directed converter edge `from → to`.
    pub fn register_converter(&mut self, from: usize, to: usize, f: StorageFn<S>) {
        let id = self.converters.len();
        self.convert_rules[from].push((to, id));
        self.converters.push(f);
    }

    fn construct(&self, format: usize, storage: &mut S) -> Result<(), Status> {
        if storage.is_constructed(format) {
            return Ok(());
        }
        match &self.constructors[format] {
            Some(ctor) => ctor(storage),
            None => {
                log::warn!("no constructor registered for format {format}");
                Err(Status::NotImplemented)
            }
        }
    }

    /// Ensure the slot exists without touching validity bits.
    pub fn validate_ctor(&self, format: usize, storage: &mut S) -> Result<(), Status> {
        self.construct(format, storage)
    }

    /// Make `format` readable and writable, converting along the
    /// shortest registered path when needed.
    pub fn validate_rw(&self, format: usize, storage: &mut S) -> Result<(), Status> {
        if storage.is_valid(format) {
            return Ok(());
        }
        if !storage.is_valid_any() {
            self.construct(format, storage)?;
            if let Some(validator) = &self.validators[format] {
                validator(storage)?;
            }
            storage.mark_valid(format);
            return Ok(());
        }

        // BFS from the set of valid formats towards the target.
        const UNREACHED: usize = usize::MAX;
        const SOURCE: usize = usize::MAX - 1;
        let mut reached = vec![UNREACHED; self.capacity];
        let mut queue = VecDeque::new();
        for f in 0..self.capacity {
            if storage.is_valid(f) {
                reached[f] = SOURCE;
                queue.push_back(f);
            }
        }
        while reached[format] == UNREACHED {
            let Some(u) = queue.pop_front() else {
                return Err(Status::NotImplemented);
            };
            for (to, _) in &self.convert_rules[u] {
                if reached[*to] == UNREACHED {
                    reached[*to] = u;
                    queue.push_back(*to);
                }
            }
        }

        let mut path = Vec::new();
        let mut current = format;
        while reached[current] != SOURCE {
            path.push((reached[current], current));
            current = reached[current];
        }

        for (from, to) in path.into_iter().rev() {
            let (_, converter_id) = self.convert_rules[from]
                .iter()
                .find(|(t, _)| *t == to)
                .copied()
                .ok_or(Status::Error)?;
            self.construct(to, storage)?;
            self.converters[converter_id](storage)?;
            storage.mark_valid(to);
        }
        Ok(())
    }

    /// Like [`Self::validate_rw`], then invalidate every other format
    /// (the caller will mutate the target).
    pub fn validate_rwd(&self, format: usize, storage: &mut S) -> Result<(), Status> {
        self.validate_rw(format, storage)?;
        storage.set_validity(1 << format);
        Ok(())
    }

    /// Prepare `format` for a from-scratch overwrite: construct if
    /// absent, discard contents, make it the only valid format.
    pub fn validate_wd(&self, format: usize, storage: &mut S) -> Result<(), Status> {
        self.construct(format, storage)?;
        if let Some(discard) = &self.discards[format] {
            discard(storage)?;
        }
        storage.set_validity(1 << format);
        Ok(())
    }
}
