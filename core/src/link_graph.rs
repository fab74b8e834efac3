//! The bipartite account/attribute graph.
//!
//! Every (account, category, value) observation becomes an edge between
//! the account node and the attribute node keyed by (category, value).
//! Accounts sharing an attribute node form an implicit clique through it.
//! The graph owns copies of every id and key, so it holds no reference
//! back to the snapshot it was built from.

use crate::{
    account::{Account, AttributeKey},
    types::AccountId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountNode {
    pub account_id: AccountId,
    /// Attribute node indices, in first-observed order, no duplicates.
    pub attributes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeNode {
    pub key:      AttributeKey,
    /// Account node indices, in first-observed order, no duplicates.
    pub accounts: Vec<usize>,
}

impl AttributeNode {
    /// Shared attributes are the only ones that link accounts together.
    pub fn is_shared(&self) -> bool {
        self.accounts.len() >= 2
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEdge {
    pub account:   usize,
    pub attribute: usize,
}

/// One attribute of the investigated account and everyone else using it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedLink {
    pub attribute:   AttributeKey,
    pub co_accounts: Vec<AccountId>,
}

/// The investigation view around a single account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighborhood {
    pub account_id: AccountId,
    pub links:      Vec<SharedLink>,
}

impl Neighborhood {
    /// Distinct accounts reachable through one shared attribute, sorted.
    pub fn linked_accounts(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self
            .links
            .iter()
            .flat_map(|l| l.co_accounts.iter().cloned())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

#[derive(Debug, Clone, Default)]
pub struct LinkGraph {
    accounts:        Vec<AccountNode>,
    attributes:      Vec<AttributeNode>,
    edges:           Vec<LinkEdge>,
    account_index:   HashMap<AccountId, usize>,
    attribute_index: HashMap<AttributeKey, usize>,
}

impl LinkGraph {
    /// Build the graph for a snapshot. Single pass, single writer: the
    /// attribute-key map is complete before any caller can read it.
    ///
    /// Account ids repeated in the input collapse into one node so that
    /// component membership stays unambiguous.
    pub fn build(accounts: &[Account]) -> Self {
        let mut graph = Self::default();

        for account in accounts {
            let account_idx = graph.intern_account(&account.account_id);
            for key in account.attributes() {
                let attribute_idx = graph.intern_attribute(key);
                graph.link(account_idx, attribute_idx);
            }
        }

        log::debug!(
            "link graph built: accounts={} attributes={} edges={} shared={}",
            graph.accounts.len(),
            graph.attributes.len(),
            graph.edges.len(),
            graph.shared_attribute_count()
        );
        graph
    }

    fn intern_account(&mut self, account_id: &str) -> usize {
        if let Some(&idx) = self.account_index.get(account_id) {
            log::debug!("account {account_id} repeated in input; merging observations");
            return idx;
        }
        let idx = self.accounts.len();
        self.accounts.push(AccountNode {
            account_id: account_id.to_string(),
            attributes: Vec::new(),
        });
        self.account_index.insert(account_id.to_string(), idx);
        idx
    }

    fn intern_attribute(&mut self, key: AttributeKey) -> usize {
        if let Some(&idx) = self.attribute_index.get(&key) {
            return idx;
        }
        let idx = self.attributes.len();
        self.attribute_index.insert(key.clone(), idx);
        self.attributes.push(AttributeNode { key, accounts: Vec::new() });
        idx
    }

    fn link(&mut self, account: usize, attribute: usize) {
        let node = &mut self.accounts[account];
        if node.attributes.contains(&attribute) {
            return;
        }
        node.attributes.push(attribute);
        self.attributes[attribute].accounts.push(account);
        self.edges.push(LinkEdge { account, attribute });
    }

    // ── Queries ──────────────────────────────────────────────────

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn accounts(&self) -> &[AccountNode] {
        &self.accounts
    }

    pub fn attributes(&self) -> &[AttributeNode] {
        &self.attributes
    }

    pub fn edges(&self) -> &[LinkEdge] {
        &self.edges
    }

    pub fn account_node(&self, account_id: &str) -> Option<usize> {
        self.account_index.get(account_id).copied()
    }

    pub fn attribute_node(&self, key: &AttributeKey) -> Option<usize> {
        self.attribute_index.get(key).copied()
    }

    /// Attributes observed for an account, in first-observed order.
    pub fn attributes_of(&self, account_id: &str) -> Vec<&AttributeKey> {
        self.account_node(account_id)
            .map(|idx| {
                self.accounts[idx]
                    .attributes
                    .iter()
                    .map(|&a| &self.attributes[a].key)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Accounts observed using an attribute, in first-observed order.
    pub fn accounts_of(&self, key: &AttributeKey) -> Vec<&str> {
        self.attribute_node(key)
            .map(|idx| {
                self.attributes[idx]
                    .accounts
                    .iter()
                    .map(|&a| self.accounts[a].account_id.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn shared_attribute_count(&self) -> usize {
        self.attributes.iter().filter(|a| a.is_shared()).count()
    }

    /// Every attribute of `account_id` together with the other accounts
    /// using it. Attributes nobody else uses are kept with an empty
    /// `co_accounts` list so the view still explains the account fully.
    /// Unknown ids yield `None`.
    pub fn neighborhood(&self, account_id: &str) -> Option<Neighborhood> {
        let idx = self.account_node(account_id)?;
        let links = self.accounts[idx]
            .attributes
            .iter()
            .map(|&a| {
                let node = &self.attributes[a];
                let mut co_accounts: Vec<AccountId> = node
                    .accounts
                    .iter()
                    .filter(|&&other| other != idx)
                    .map(|&other| self.accounts[other].account_id.clone())
                    .collect();
                co_accounts.sort();
                SharedLink { attribute: node.key.clone(), co_accounts }
            })
            .collect();
        Some(Neighborhood { account_id: account_id.to_string(), links })
    }
}
