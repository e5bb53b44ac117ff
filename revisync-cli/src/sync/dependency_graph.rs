//! Dependency graph logic for ordering table operations
//!
//! This module provides functions to:
//! - Build a dependency graph from foreign-key references between tables
//! - Perform a stable topological sort for insert ordering
//! - Degrade reference cycles to warnings instead of failing

use std::collections::{BTreeSet, HashMap, HashSet};

use log::warn;

use super::schema::TableSchema;

/// Table with its foreign-key targets
#[derive(Debug, Clone)]
pub struct TableWithReferences {
    pub table_id: String,
    /// Tables referenced by this table's schema (may include itself and
    /// tables outside the working set)
    pub references: BTreeSet<String>,
}

impl TableWithReferences {
    /// Create from a table id and its schema, if one could be fetched
    pub fn from_schema(table_id: &str, schema: Option<&TableSchema>) -> Self {
        Self {
            table_id: table_id.to_string(),
            references: schema.map(TableSchema::foreign_keys).unwrap_or_default(),
        }
    }

    /// References to other tables in the working set (excluding self-references)
    pub fn internal_references<'a>(
        &'a self,
        working_set: &'a HashSet<String>,
    ) -> impl Iterator<Item = &'a String> + 'a {
        self.references
            .iter()
            .filter(move |t| **t != self.table_id && working_set.contains(*t))
    }
}

/// Result of resolving a processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedOrder {
    /// Table ids, referenced tables before referencing ones
    pub order: Vec<String>,
    /// One entry per reference cycle that had to be broken
    pub warnings: Vec<String>,
}

/// Dependency graph over the tables in scope
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Tables in their original ordering
    pub tables: Vec<String>,
    /// Adjacency list: table -> tables it depends on (has references to)
    pub dependencies: HashMap<String, HashSet<String>>,
    /// Reverse adjacency: table -> tables that depend on it
    pub dependents: HashMap<String, HashSet<String>>,
}

impl DependencyGraph {
    /// Build a graph restricted to `scope`
    ///
    /// `tables` gives the original ordering used for tie-breaks. Tables in
    /// `tables` but not in `scope`, and scope entries unknown to `tables`, are
    /// dropped; so are references pointing outside the scope.
    pub fn build(
        tables: &[TableWithReferences],
        scope: &HashSet<String>,
    ) -> Self {
        let mut graph = DependencyGraph::default();
        let mut seen = HashSet::new();

        for table in tables {
            if scope.contains(&table.table_id) && seen.insert(table.table_id.clone()) {
                graph.tables.push(table.table_id.clone());
            }
        }

        let working_set: HashSet<String> = graph.tables.iter().cloned().collect();

        for name in &graph.tables {
            graph.dependencies.entry(name.clone()).or_default();
            graph.dependents.entry(name.clone()).or_default();
        }

        for table in tables {
            if !working_set.contains(&table.table_id) {
                continue;
            }
            for dep in table.internal_references(&working_set) {
                graph
                    .dependencies
                    .entry(table.table_id.clone())
                    .or_default()
                    .insert(dep.clone());
                graph
                    .dependents
                    .entry(dep.clone())
                    .or_default()
                    .insert(table.table_id.clone());
            }
        }

        graph
    }

    /// Strongly connected components, each listed in original order
    fn components(&self) -> Vec<Vec<usize>> {
        let index_of: HashMap<&str, usize> = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        let adjacency: Vec<Vec<usize>> = self
            .tables
            .iter()
            .map(|t| {
                let mut deps: Vec<usize> = self.dependencies[t]
                    .iter()
                    .filter_map(|d| index_of.get(d.as_str()).copied())
                    .collect();
                deps.sort_unstable();
                deps
            })
            .collect();

        let mut tarjan = Tarjan::new(adjacency.len());
        for node in 0..adjacency.len() {
            if tarjan.index[node].is_none() {
                tarjan.connect(node, &adjacency);
            }
        }

        let mut components = tarjan.components;
        for component in &mut components {
            component.sort_unstable();
        }
        components
    }

    /// Stable topological sort (Kahn's algorithm over the component graph)
    ///
    /// At each step the ready table that appears earliest in the original
    /// ordering is placed next. A reference cycle is placed as a block in
    /// original order as soon as everything it depends on outside the cycle
    /// has been placed, and reported as a warning.
    pub fn resolve_order(&self) -> ResolvedOrder {
        let components = self.components();

        let mut component_of = vec![0usize; self.tables.len()];
        for (c, members) in components.iter().enumerate() {
            for &member in members {
                component_of[member] = c;
            }
        }

        let index_of: HashMap<&str, usize> = self
            .tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_str(), i))
            .collect();

        // Unresolved dependencies per component, counting cross-component edges only
        let mut pending: Vec<HashSet<usize>> = vec![HashSet::new(); components.len()];
        let mut blocks: Vec<HashSet<usize>> = vec![HashSet::new(); components.len()];
        for (i, table) in self.tables.iter().enumerate() {
            let from = component_of[i];
            for dep in &self.dependencies[table] {
                let Some(&j) = index_of.get(dep.as_str()) else {
                    continue;
                };
                let to = component_of[j];
                if to != from {
                    pending[from].insert(to);
                    blocks[to].insert(from);
                }
            }
        }

        // Ready components keyed by their earliest member
        let mut ready: BTreeSet<(usize, usize)> = components
            .iter()
            .enumerate()
            .filter(|(c, _)| pending[*c].is_empty())
            .map(|(c, members)| (members[0], c))
            .collect();

        let mut result = ResolvedOrder::default();

        while let Some((_, c)) = ready.pop_first() {
            let members = &components[c];
            if members.len() > 1 {
                let error = CycleError {
                    tables: members.iter().map(|&m| self.tables[m].clone()).collect(),
                };
                warn!("{}", error);
                result.warnings.push(format!(
                    "{}; processing these tables in their original order",
                    error
                ));
            }
            result
                .order
                .extend(members.iter().map(|&m| self.tables[m].clone()));

            for &dependent in &blocks[c] {
                pending[dependent].remove(&c);
                if pending[dependent].is_empty() {
                    ready.insert((components[dependent][0], dependent));
                }
            }
        }

        result
    }
}

/// Resolve the processing order of `scope`
///
/// `tables` lists every known table in original order with its schema, or
/// `None` when the schema is missing or could not be fetched (such a table
/// has no known dependencies).
pub fn resolve(tables: &[(String, Option<TableSchema>)], scope: &HashSet<String>) -> ResolvedOrder {
    let with_refs: Vec<TableWithReferences> = tables
        .iter()
        .map(|(id, schema)| TableWithReferences::from_schema(id, schema.as_ref()))
        .collect();
    DependencyGraph::build(&with_refs, scope).resolve_order()
}

/// A reference cycle between two or more tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError {
    pub tables: Vec<String>,
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Circular dependency detected involving: {}", self.tables.join(", "))
    }
}

impl std::error::Error for CycleError {}

/// Tarjan's strongly connected components
struct Tarjan {
    counter: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    components: Vec<Vec<usize>>,
}

impl Tarjan {
    fn new(size: usize) -> Self {
        Self {
            counter: 0,
            index: vec![None; size],
            lowlink: vec![0; size],
            on_stack: vec![false; size],
            stack: Vec::new(),
            components: Vec::new(),
        }
    }

    fn connect(&mut self, node: usize, adjacency: &[Vec<usize>]) {
        self.index[node] = Some(self.counter);
        self.lowlink[node] = self.counter;
        self.counter += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        for &next in &adjacency[node] {
            match self.index[next] {
                None => {
                    self.connect(next, adjacency);
                    self.lowlink[node] = self.lowlink[node].min(self.lowlink[next]);
                }
                Some(next_index) if self.on_stack[next] => {
                    self.lowlink[node] = self.lowlink[node].min(next_index);
                }
                Some(_) => {}
            }
        }

        if Some(self.lowlink[node]) == self.index[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack[member] = false;
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}
