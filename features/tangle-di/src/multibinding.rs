use crate::{
    binding::{Binding, BindingKind, CollectMapFn, CollectSetFn, MapEntry, SetContribution},
    errors::DeclarationError,
    types::Key,
};

/// Accumulates set contributions for one key until the index is finished.
pub(crate) struct SetGroup {
    pub key: Key,
    pub declared: Option<SetAggregateDeclaration>,
    pub contributions: Vec<SetContribution>,
}

pub(crate) struct SetAggregateDeclaration {
    pub collect: CollectSetFn,
    pub scope: Option<&'static str>,
    pub origin: String,
}

impl SetGroup {
    pub fn new(key: Key) -> Self {
        SetGroup {
            key,
            declared: None,
            contributions: Vec::new(),
        }
    }

    /// Collapses the group into one set-valued binding. Contributions keep
    /// declaration order; membership semantics live in the collector.
    pub fn finish(self) -> Result<Binding, DeclarationError> {
        let declared = self.declared.ok_or_else(|| DeclarationError::MissingAggregate {
            key: self.key,
            origin: self
                .contributions
                .first()
                .map(|c| c.origin.clone())
                .unwrap_or_default(),
        })?;

        Ok(Binding {
            key: self.key,
            scope: declared.scope,
            nullable: false,
            origin: declared.origin,
            kind: BindingKind::Set {
                contributions: self.contributions,
                collect: declared.collect,
            },
        })
    }
}

/// Accumulates map contributions for one key.
pub(crate) struct MapGroup {
    pub key: Key,
    pub declared: Option<MapAggregateDeclaration>,
    pub entries: Vec<MapEntry>,
}

pub(crate) struct MapAggregateDeclaration {
    pub collect: CollectMapFn,
    pub deferred: bool,
    pub scope: Option<&'static str>,
    pub origin: String,
}

impl MapGroup {
    pub fn new(key: Key) -> Self {
        MapGroup {
            key,
            declared: None,
            entries: Vec::new(),
        }
    }

    /// Collapses the group into one map-valued binding. Entries are ordered
    /// by the key literal's natural ordering; a literal contributed twice is
    /// a declaration error no resolution can reach past.
    pub fn finish(self) -> Result<Binding, DeclarationError> {
        let declared = self.declared.ok_or_else(|| DeclarationError::MissingAggregate {
            key: self.key,
            origin: self
                .entries
                .first()
                .map(|e| e.origin.clone())
                .unwrap_or_default(),
        })?;

        let mut entries = self.entries;
        entries.sort_by(|a, b| a.literal.cmp(&b.literal));
        for pair in entries.windows(2) {
            if pair[0].literal == pair[1].literal {
                return Err(DeclarationError::DuplicateMapKey {
                    key: self.key,
                    literal: pair[0].literal.clone(),
                    existing: pair[0].origin.clone(),
                    duplicate: pair[1].origin.clone(),
                });
            }
        }

        Ok(Binding {
            key: self.key,
            scope: declared.scope,
            nullable: false,
            origin: declared.origin,
            kind: BindingKind::Map {
                entries,
                collect: declared.collect,
                deferred: declared.deferred,
            },
        })
    }
}
