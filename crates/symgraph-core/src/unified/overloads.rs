//! Overload groups: one synthesized symbol per set of same-path declarations.
//!
//! Two passes exist, and the collector runs exactly one of them per graph:
//!
//! - [`UnifiedGraph::create_overload_groups`] computes groups from scratch
//!   when no producer emitted any.
//! - [`UnifiedGraph::combine_overload_groups`] reconciles groups that
//!   individual producers already emitted, which may disagree when the same
//!   members were grouped differently per view.
//!
//! Both order members the same way: by concatenated declaration spelling
//! when every member has one in the grouping language, else by identifier.
//! The group is named after the first member.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use petgraph::unionfind::UnionFind;
use tracing::{debug, warn};

use crate::graph::mixins::OverloadData;
use crate::graph::{KindIdentifier, Relationship, RelationshipKind};
use crate::selector::Selector;

use super::graph::UnifiedGraph;

/// Suffix appended to the first member's identifier to name its group.
pub const OVERLOAD_GROUP_SUFFIX: &str = "::OverloadGroup";

/// True if `id` names a synthesized overload group.
pub fn is_overload_group(id: &str) -> bool {
    id.ends_with(OVERLOAD_GROUP_SUFFIX)
}

/// Groups that disagreed with the canonical group computed over their
/// combined members.
///
/// The canonical group is used regardless; this records that the input
/// graphs were inconsistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadInconsistency {
    pub canonical_group: String,
    pub discovered_groups: Vec<String>,
    pub members: Vec<String>,
}

impl fmt::Display for OverloadInconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "canonical overload group '{}' not among discovered groups [{}]",
            self.canonical_group,
            self.discovered_groups.join(", ")
        )
    }
}

type CandidateKey = (String, Vec<String>, KindIdentifier);

impl UnifiedGraph {
    /// True if any producer already emitted overload groups.
    pub fn has_overload_groups(&self) -> bool {
        self.symbols.keys().any(|id| is_overload_group(id))
    }

    /// Inconsistencies found by [`combine_overload_groups`](Self::combine_overload_groups).
    pub fn overload_diagnostics(&self) -> &[OverloadInconsistency] {
        &self.overload_diagnostics
    }

    /// Compute overload groups for every (language, path, kind) collision.
    ///
    /// A symbol takes part in a language only when all of its views in that
    /// language agree on a single path and a single overloadable kind.
    pub fn create_overload_groups(&mut self) {
        let mut candidates: BTreeMap<CandidateKey, Vec<String>> = BTreeMap::new();
        for (id, symbol) in &self.symbols {
            if is_overload_group(id) {
                continue;
            }
            for language in symbol.languages() {
                let selectors = symbol.selectors_for_language(language);
                let paths: BTreeSet<&Vec<String>> = selectors
                    .iter()
                    .filter_map(|selector| symbol.path_components.get(selector))
                    .collect();
                let kinds: BTreeSet<&KindIdentifier> = selectors
                    .iter()
                    .filter_map(|selector| symbol.kind.get(selector))
                    .map(|kind| &kind.identifier)
                    .collect();
                if paths.len() != 1 || kinds.len() != 1 {
                    continue;
                }
                let (Some(path), Some(kind)) = (paths.first(), kinds.first()) else {
                    continue;
                };
                if !kind.is_overloadable() {
                    continue;
                }
                candidates
                    .entry((language.to_string(), (*path).clone(), (*kind).clone()))
                    .or_default()
                    .push(id.clone());
            }
        }

        let mut created = 0usize;
        for ((language, _, _), members) in candidates {
            if members.len() < 2 {
                continue;
            }
            let ordered = self.order_members(&language, members);
            let Some(first) = ordered.first().cloned() else {
                continue;
            };
            let group_id = format!("{first}{OVERLOAD_GROUP_SUFFIX}");
            if !self.insert_group_symbol(&first, &group_id, &language) {
                continue;
            }
            self.attach_members(&ordered, &group_id, &language);
            created += 1;
        }
        debug!(module = %self.module_name, created, "created overload groups");
    }

    /// Merge producer-emitted overload groups into one canonical group per
    /// connected component of `overloadOf` edges.
    pub fn combine_overload_groups(&mut self) {
        let edges: Vec<(String, String)> = self
            .relationships
            .values()
            .flat_map(|set| set.as_slice())
            .chain(self.orphan_relationships.iter())
            .filter(|r| r.kind == RelationshipKind::OVERLOAD_OF)
            .map(|r| (r.source.clone(), r.target.clone()))
            .collect();
        if edges.is_empty() {
            return;
        }

        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for (source, target) in &edges {
            let next = index.len();
            index.entry(source.as_str()).or_insert(next);
            let next = index.len();
            index.entry(target.as_str()).or_insert(next);
        }
        let mut components = UnionFind::<usize>::new(index.len());
        for (source, target) in &edges {
            components.union(index[source.as_str()], index[target.as_str()]);
        }

        let mut groups_by_root: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
        let mut members_by_root: BTreeMap<usize, BTreeSet<String>> = BTreeMap::new();
        for (source, target) in &edges {
            let root = components.find(index[source.as_str()]);
            groups_by_root.entry(root).or_default().insert(target.clone());
            members_by_root.entry(root).or_default().insert(source.clone());
        }

        for (root, groups) in groups_by_root {
            let members: Vec<String> = members_by_root
                .remove(&root)
                .unwrap_or_default()
                .into_iter()
                .filter(|member| !groups.contains(member) && self.symbols.contains_key(member))
                .collect();
            self.reconcile_component(groups, members);
        }
    }

    fn reconcile_component(&mut self, groups: BTreeSet<String>, members: Vec<String>) {
        let language = groups
            .iter()
            .chain(members.iter())
            .filter_map(|id| self.symbols.get(id))
            .find_map(|symbol| symbol.languages().first().map(|l| l.to_string()));
        let Some(language) = language else {
            return;
        };

        let ordered = self.order_members(&language, members);
        let Some(first) = ordered.first().cloned() else {
            return;
        };
        let canonical = format!("{first}{OVERLOAD_GROUP_SUFFIX}");

        if !groups.contains(&canonical) {
            let inconsistency = OverloadInconsistency {
                canonical_group: canonical.clone(),
                discovered_groups: groups.iter().cloned().collect(),
                members: ordered.clone(),
            };
            warn!(module = %self.module_name, %inconsistency, "inconsistent overload groups");
            self.overload_diagnostics.push(inconsistency);

            let renamed = groups
                .iter()
                .find_map(|id| self.symbols.get(id))
                .cloned()
                .map(|mut group| {
                    group.unique_identifier = canonical.clone();
                    group
                });
            match renamed {
                Some(group) => {
                    let selectors: Vec<Selector> = group.selectors().cloned().collect();
                    self.symbols.insert(canonical.clone(), group);
                    self.clone_outgoing_relationships(&first, &canonical, &selectors);
                }
                None => {
                    self.insert_group_symbol(&first, &canonical, &language);
                }
            }
        } else if !self.symbols.contains_key(&canonical) {
            self.insert_group_symbol(&first, &canonical, &language);
        }

        let stale: HashSet<String> = groups.into_iter().filter(|id| *id != canonical).collect();
        for id in &stale {
            self.symbols.remove(id);
        }
        if !stale.is_empty() {
            self.retain_relationships(|r| !stale.contains(&r.source) && !stale.contains(&r.target));
        }

        self.attach_members(&ordered, &canonical, &language);
    }

    /// Sort members by declaration spelling in `language`, else by identifier.
    fn order_members(&self, language: &str, mut members: Vec<String>) -> Vec<String> {
        let spellings: Option<Vec<String>> = members
            .iter()
            .map(|id| {
                self.symbols
                    .get(id)
                    .and_then(|symbol| symbol.declaration_spelling(language))
            })
            .collect();
        match spellings {
            Some(spellings) => {
                let mut keyed: Vec<(String, String)> = spellings.into_iter().zip(members).collect();
                keyed.sort();
                keyed.into_iter().map(|(_, id)| id).collect()
            }
            None => {
                members.sort();
                members
            }
        }
    }

    /// Insert a group symbol seeded from `first` plus its outgoing edges.
    /// Returns false when `first` is not a known symbol.
    fn insert_group_symbol(&mut self, first: &str, group_id: &str, language: &str) -> bool {
        let Some(group) = self
            .symbols
            .get(first)
            .map(|symbol| symbol.overload_group(language, group_id))
        else {
            return false;
        };
        let selectors: Vec<Selector> = group.selectors().cloned().collect();
        match self.symbols.get_mut(group_id) {
            // Same first member in another language: add this language's views.
            Some(existing) => existing.absorb_views(group),
            None => {
                self.symbols.insert(group_id.to_string(), group);
            }
        }
        self.clone_outgoing_relationships(first, group_id, &selectors);
        true
    }

    /// Give the group the first member's outgoing edges (other than
    /// `overloadOf`) under `selectors`.
    fn clone_outgoing_relationships(&mut self, first: &str, group_id: &str, selectors: &[Selector]) {
        for selector in selectors {
            let Some(set) = self.relationships.get(selector) else {
                continue;
            };
            let clones: Vec<Relationship> = set
                .as_slice()
                .iter()
                .filter(|r| r.source == first && r.kind != RelationshipKind::OVERLOAD_OF)
                .map(|r| Relationship {
                    source: group_id.to_string(),
                    ..r.clone()
                })
                .collect();
            for relationship in clones {
                self.file_relationship(relationship, std::slice::from_ref(selector));
            }
        }
    }

    /// Link every member to the group and record its rank.
    fn attach_members(&mut self, ordered: &[String], group_id: &str, language: &str) {
        for (index, member) in ordered.iter().enumerate() {
            let Some(symbol) = self.symbols.get_mut(member) else {
                continue;
            };
            symbol.set_overload_data(OverloadData {
                overload_group_identifier: group_id.to_string(),
                overload_group_index: index,
            });
            let selectors = symbol.primary_selectors_for_language(language);
            self.file_relationship(
                Relationship::new(member.clone(), group_id, RelationshipKind::OVERLOAD_OF),
                &selectors,
            );
        }
    }
}
