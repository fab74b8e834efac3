//! Ring detector — connected components of the account/attribute graph.
//!
//! Union-find runs once, sequentially, over every edge. Components are
//! then summarized independently (in parallel above the configured
//! threshold) and those meeting the size and sharing rules become rings.
//!
//! Output order: severity descending, then smallest member id ascending,
//! then discovery order (component holding the earliest input account).

use crate::{
    account::{Account, AttributeKey},
    config::RingParams,
    link_graph::LinkGraph,
    types::AccountId,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_PARALLEL_THRESHOLD: usize = 256;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedAttribute {
    pub attribute:     AttributeKey,
    /// Ring members observed using this attribute.
    pub account_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub ring_id:           String,
    /// Sorted ascending.
    pub members:           Vec<AccountId>,
    /// Most widely shared first.
    pub shared_attributes: Vec<SharedAttribute>,
    pub severity:          f64,
}

impl Ring {
    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.members
            .binary_search_by(|m| m.as_str().cmp(account_id))
            .is_ok()
    }
}

/// Account id → ring lookup over one detection result.
#[derive(Debug, Clone)]
pub struct RingIndex<'a> {
    rings:      &'a [Ring],
    by_account: HashMap<&'a str, usize>,
}

impl<'a> RingIndex<'a> {
    pub fn new(rings: &'a [Ring]) -> Self {
        let mut by_account = HashMap::new();
        for (i, ring) in rings.iter().enumerate() {
            for member in &ring.members {
                by_account.insert(member.as_str(), i);
            }
        }
        Self { rings, by_account }
    }

    pub fn ring_of(&self, account_id: &str) -> Option<&'a Ring> {
        self.by_account.get(account_id).map(|&i| &self.rings[i])
    }
}

/// Severity of a component with `accounts` distinct accounts and
/// `shared_attributes` shared attribute nodes, clamped to [0, 1].
pub fn ring_severity(accounts: usize, shared_attributes: usize, params: &RingParams) -> f64 {
    if accounts == 0 {
        return 0.0;
    }
    let n = accounts as f64;
    let size_term = (n / params.size_saturation).min(1.0) * params.size_weight;
    let density_term = (shared_attributes as f64 / n) * params.density_weight;
    (size_term + density_term).clamp(0.0, 1.0)
}

// ── Detector ─────────────────────────────────────────────────────────────────

pub struct RingDetector {
    params:             RingParams,
    parallel_threshold: usize,
}

impl RingDetector {
    pub fn new(params: RingParams) -> Self {
        Self {
            params,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn params(&self) -> &RingParams {
        &self.params
    }

    pub fn detect(&self, graph: &LinkGraph) -> Vec<Ring> {
        if graph.is_empty() {
            return Vec::new();
        }

        let components = self.components(graph);
        let summarize = |(discovery, component): (usize, &Component)| {
            self.summarize(graph, component).map(|ring| (discovery, ring))
        };

        let mut found: Vec<(usize, Ring)> = if components.len() >= self.parallel_threshold {
            components.par_iter().enumerate().filter_map(summarize).collect()
        } else {
            components.iter().enumerate().filter_map(summarize).collect()
        };

        found.sort_by(|(da, a), (db, b)| {
            b.severity
                .total_cmp(&a.severity)
                .then_with(|| a.members[0].cmp(&b.members[0]))
                .then_with(|| da.cmp(db))
        });

        let rings: Vec<Ring> = found
            .into_iter()
            .enumerate()
            .map(|(i, (_, mut ring))| {
                ring.ring_id = format!("ring-{:04}", i + 1);
                ring
            })
            .collect();

        log::info!(
            "ring detection: components={} rings={} largest={}",
            components.len(),
            rings.len(),
            rings.iter().map(Ring::size).max().unwrap_or(0)
        );
        rings
    }

    /// Group account nodes and shared attribute nodes by component,
    /// components numbered in order of their first account.
    fn components(&self, graph: &LinkGraph) -> Vec<Component> {
        let account_count = graph.account_count();
        let mut uf = UnionFind::new(account_count + graph.attribute_count());
        for edge in graph.edges() {
            uf.union(edge.account, account_count + edge.attribute);
        }

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Component> = Vec::new();
        for account in 0..account_count {
            let root = uf.find(account);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                components.push(Component::default());
                components.len() - 1
            });
            components[slot].accounts.push(account);
        }

        for (attribute, node) in graph.attributes().iter().enumerate() {
            if !node.is_shared() {
                continue;
            }
            let root = uf.find(account_count + attribute);
            if let Some(&slot) = slot_of_root.get(&root) {
                components[slot].shared_attributes.push(attribute);
            }
        }
        components
    }

    fn summarize(&self, graph: &LinkGraph, component: &Component) -> Option<Ring> {
        let accounts = component.accounts.len();
        let shared = component.shared_attributes.len();
        if accounts < self.params.min_accounts || shared < self.params.min_shared_attributes {
            return None;
        }

        let mut members: Vec<AccountId> = component
            .accounts
            .iter()
            .map(|&a| graph.accounts()[a].account_id.clone())
            .collect();
        members.sort();

        let mut shared_attributes: Vec<SharedAttribute> = component
            .shared_attributes
            .iter()
            .map(|&a| {
                let node = &graph.attributes()[a];
                SharedAttribute {
                    attribute:     node.key.clone(),
                    account_count: node.accounts.len(),
                }
            })
            .collect();
        shared_attributes.sort_by(|a, b| {
            b.account_count
                .cmp(&a.account_count)
                .then_with(|| a.attribute.cmp(&b.attribute))
        });

        Some(Ring {
            ring_id: String::new(),
            members,
            shared_attributes,
            severity: ring_severity(accounts, shared, &self.params),
        })
    }
}

/// Detect rings in an already-built graph.
pub fn detect_rings(graph: &LinkGraph, params: &RingParams) -> Vec<Ring> {
    RingDetector::new(params.clone()).detect(graph)
}

/// Build the link graph for `accounts` and detect rings in it.
pub fn detect_rings_for_accounts(accounts: &[Account], params: &RingParams) -> Vec<Ring> {
    detect_rings(&LinkGraph::build(accounts), params)
}

// ── Union-find ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Component {
    accounts:          Vec<usize>,
    shared_attributes: Vec<usize>,
}

/// Disjoint-set forest with path halving and union by size.
struct UnionFind {
    parent: Vec<usize>,
    size:   Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size:   vec![1; n],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_find_merges_transitively() {
        let mut uf = UnionFind::new(6);
        uf.union(0, 1);
        uf.union(2, 3);
        uf.union(1, 3);

        let root = uf.find(0);
        for x in 1..4 {
            assert_eq!(uf.find(x), root, "node {x} should share root with 0");
        }
        assert_ne!(uf.find(4), root);
        assert_ne!(uf.find(4), uf.find(5));
    }

    #[test]
    fn union_is_idempotent() {
        let mut uf = UnionFind::new(3);
        uf.union(0, 1);
        uf.union(1, 0);
        uf.union(0, 1);
        let root = uf.find(0);
        assert_eq!(uf.size[root], 2);
    }

    #[test]
    fn severity_saturates_size_term() {
        let params = RingParams::default();
        // 30 accounts, 30 shared nodes: size term capped at 0.6, density 1.0 * 0.4.
        assert!((ring_severity(30, 30, &params) - 1.0).abs() < 1e-12);
        assert_eq!(ring_severity(0, 0, &params), 0.0);
    }
}
