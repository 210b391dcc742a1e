//! Bidirectional name/identifier catalog of nodes, groups and scenes.
//!
//! Populated from discovery and change notifications. Entries are
//! overwritten but never removed.

use std::collections::{BTreeMap, HashMap};

use crate::types::{Scope, UNSET_ID};

/// Scope-qualified name/identifier mapping.
#[derive(Debug, Default, Clone)]
pub struct NameCatalog {
    names: BTreeMap<(Scope, u8), String>,
    identifiers: HashMap<(Scope, String), u8>,
}

/// Normalize a name for lookups: upper case, spaces as dashes.
fn name_key(name: &str) -> String {
    name.trim().replace(' ', "-").to_uppercase()
}

impl NameCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` for `id` in both directions.
    ///
    /// A blank name is replaced by the decimal identifier.
    pub fn collect(&mut self, scope: Scope, name: &str, id: u8) {
        let name = if name.trim().is_empty() {
            id.to_string()
        } else {
            name.to_string()
        };
        self.identifiers.insert((scope, name_key(&name)), id);
        self.names.insert((scope, id), name);
    }

    /// Name of `id`, or an empty string if unknown.
    pub fn resolve_name(&self, scope: Scope, id: u8) -> String {
        self.names.get(&(scope, id)).cloned().unwrap_or_default()
    }

    /// Identifier of `name` (case-insensitive), or `255` if unknown.
    pub fn resolve_identifier(&self, scope: Scope, name: &str) -> u8 {
        self.identifiers
            .get(&(scope, name_key(name)))
            .copied()
            .unwrap_or(UNSET_ID)
    }

    /// Known `(id, name)` pairs of a scope, ordered by id.
    pub fn entries(&self, scope: Scope) -> Vec<(u8, String)> {
        self.names
            .range((scope, 0)..=(scope, u8::MAX))
            .map(|((_, id), name)| (*id, name.clone()))
            .collect()
    }

    /// `"name=id, name=id, ..."` for one scope, ordered by id; empty when nothing is known.
    pub fn table_of_contents(&self, scope: Scope) -> String {
        self.entries(scope)
            .iter()
            .map(|(id, name)| format!("{name}={id}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_and_resolve() {
        let mut catalog = NameCatalog::new();
        catalog.collect(Scope::Node, "Kitchen Window", 3);

        assert_eq!(catalog.resolve_name(Scope::Node, 3), "Kitchen Window");
        assert_eq!(catalog.resolve_identifier(Scope::Node, "kitchen window"), 3);
        assert_eq!(catalog.resolve_identifier(Scope::Node, "KITCHEN-WINDOW"), 3);
        assert_eq!(catalog.resolve_identifier(Scope::Group, "Kitchen Window"), UNSET_ID);
        assert_eq!(catalog.resolve_name(Scope::Scene, 3), "");
    }

    #[test]
    fn test_collect_is_idempotent() {
        let mut catalog = NameCatalog::new();
        catalog.collect(Scope::Scene, "Morning", 0);
        catalog.collect(Scope::Scene, "Morning", 0);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.resolve_name(Scope::Scene, 0), "Morning");
        assert_eq!(catalog.resolve_identifier(Scope::Scene, "Morning"), 0);
    }

    #[test]
    fn test_blank_name_defaults_to_identifier() {
        let mut catalog = NameCatalog::new();
        catalog.collect(Scope::Group, "  ", 17);

        assert_eq!(catalog.resolve_name(Scope::Group, 17), "17");
        assert_eq!(catalog.resolve_identifier(Scope::Group, "17"), 17);
    }

    #[test]
    fn test_rename_keeps_old_name() {
        let mut catalog = NameCatalog::new();
        catalog.collect(Scope::Node, "Old", 1);
        catalog.collect(Scope::Node, "New", 1);

        assert_eq!(catalog.resolve_name(Scope::Node, 1), "New");
        assert_eq!(catalog.resolve_identifier(Scope::Node, "New"), 1);
        assert_eq!(catalog.resolve_identifier(Scope::Node, "Old"), 1);
    }

    #[test]
    fn test_table_of_contents() {
        let mut catalog = NameCatalog::new();
        assert_eq!(catalog.table_of_contents(Scope::Node), "");

        catalog.collect(Scope::Node, "Skylight", 12);
        catalog.collect(Scope::Node, "Door", 2);
        catalog.collect(Scope::Scene, "Night", 1);

        assert_eq!(catalog.table_of_contents(Scope::Node), "Door=2, Skylight=12");
        assert_eq!(catalog.table_of_contents(Scope::Scene), "Night=1");
        assert_eq!(catalog.table_of_contents(Scope::Group), "");
    }
}
