//! Per-session attribute cache
//!
//! Pure in-memory state: no provider I/O happens here.

use std::collections::BTreeMap;

use crate::data::{AbstractValue, AttributeId, AttributeMetadata, AttributeState, RawValue};
use crate::provider::Atom;

/// Provider-side handle an attribute was resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handle {
    /// Interned property / port attribute symbol
    Symbol(Atom),
    /// The output's display pipeline binding
    Pipeline,
}

#[derive(Debug, Clone)]
pub struct CachedAttribute {
    pub handle: Handle,
    pub metadata: AttributeMetadata,
    pub state: AttributeState,
}

/// Outcome of feeding an authoritative raw value into the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Raw value identical to the cached one
    Unchanged,
    /// Raw value stored; carries the new abstract value if translatable
    Changed(Option<AbstractValue>),
    /// Attribute is not part of this session
    Unknown,
}

#[derive(Debug, Default)]
pub struct StateCache {
    entries: BTreeMap<AttributeId, CachedAttribute>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate an attribute during discovery
    pub fn insert(&mut self, id: AttributeId, handle: Handle, metadata: AttributeMetadata, raw: RawValue) {
        let state = AttributeState::new(raw, &metadata);
        self.entries.insert(
            id,
            CachedAttribute {
                handle,
                metadata,
                state,
            },
        );
    }

    pub fn get(&self, id: AttributeId) -> Option<&CachedAttribute> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: AttributeId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Current abstract value; `None` if unsupported or untranslatable
    pub fn value(&self, id: AttributeId) -> Option<AbstractValue> {
        self.entries.get(&id).and_then(|e| e.state.value())
    }

    pub fn raw(&self, id: AttributeId) -> Option<RawValue> {
        self.entries.get(&id).map(|e| e.state.raw())
    }

    pub fn metadata(&self, id: AttributeId) -> Option<&AttributeMetadata> {
        self.entries.get(&id).map(|e| &e.metadata)
    }

    /// Attribute resolved to `symbol`, if any
    pub fn find_symbol(&self, symbol: Atom) -> Option<AttributeId> {
        self.entries
            .iter()
            .find(|(_, e)| e.handle == Handle::Symbol(symbol))
            .map(|(id, _)| *id)
    }

    /// Store an authoritative raw value
    pub fn reconcile(&mut self, id: AttributeId, raw: RawValue) -> Reconciled {
        let Some(entry) = self.entries.get_mut(&id) else {
            return Reconciled::Unknown;
        };
        if entry.state.raw() == raw {
            return Reconciled::Unchanged;
        }
        entry.state = AttributeState::new(raw, &entry.metadata);
        Reconciled::Changed(entry.state.value())
    }

    pub fn ids(&self) -> impl Iterator<Item = AttributeId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
