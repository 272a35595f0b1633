//! In-memory graph of context nodes, relations, and literals.
//!
//! The graph is a rooted tree of context nodes whose edge labels are
//! sub-segments, addressed by their absolute path from the root. A node
//! may additionally carry labeled relations to arbitrary context nodes
//! and at most one literal value. Two graphs are equal when their
//! statement sets are equal.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::boolean_literal;
use crate::error::GraphError;
use crate::segment::{Segment, SubSegment};
use crate::statement::Statement;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct NodeRecord {
    children: BTreeSet<SubSegment>,
    relations: BTreeMap<Segment, BTreeSet<Segment>>,
    literal: Option<String>,
}

impl NodeRecord {
    fn is_empty(&self) -> bool {
        self.children.is_empty() && self.relations.is_empty() && self.literal.is_none()
    }
}

/// The in-memory graph backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryGraph {
    nodes: BTreeMap<Segment, NodeRecord>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(Segment::root(), NodeRecord::default());
        Self { nodes }
    }

    /// Creates the context node at `path`, along with any missing
    /// intermediate nodes.
    pub fn ensure_context_node(&mut self, path: &Segment) {
        if path.is_root() {
            return;
        }
        for k in 1..=path.len() {
            let child = path.parent(k as isize);
            let parent = child.parent(-1);
            let arc = child.last().clone();
            self.nodes.entry(parent).or_default().children.insert(arc);
            self.nodes.entry(child).or_default();
        }
    }

    pub fn contains_context_node(&self, path: &Segment) -> bool {
        path.is_root() || self.nodes.contains_key(path)
    }

    /// Creates a relation from `source` via `arc` to `target`. The source
    /// context node is created if missing; a duplicate tuple is a
    /// structural violation.
    pub fn create_relation(
        &mut self,
        source: &Segment,
        arc: &Segment,
        target: &Segment,
    ) -> Result<(), GraphError> {
        self.ensure_context_node(source);
        let record = self
            .nodes
            .get_mut(source)
            .ok_or_else(|| GraphError::NodeNotFound(source.clone()))?;
        let targets = record.relations.entry(arc.clone()).or_default();
        if !targets.insert(target.clone()) {
            return Err(GraphError::DuplicateRelation {
                from: source.clone(),
                arc: arc.clone(),
                target: target.clone(),
            });
        }
        Ok(())
    }

    pub fn contains_relation(&self, source: &Segment, arc: &Segment, target: &Segment) -> bool {
        self.nodes
            .get(source)
            .and_then(|record| record.relations.get(arc))
            .is_some_and(|targets| targets.contains(target))
    }

    /// Creates the literal at `path`. A literal that already exists there
    /// is a structural violation; use [`MemoryGraph::set_literal`] to
    /// replace.
    pub fn create_literal(&mut self, path: &Segment, data: impl Into<String>) -> Result<(), GraphError> {
        self.ensure_context_node(path);
        let record = self
            .nodes
            .get_mut(path)
            .ok_or_else(|| GraphError::NodeNotFound(path.clone()))?;
        if record.literal.is_some() {
            return Err(GraphError::DuplicateLiteral(path.clone()));
        }
        record.literal = Some(data.into());
        Ok(())
    }

    /// Sets the literal at `path`, creating the path and replacing any
    /// previous value.
    pub fn set_literal(&mut self, path: &Segment, data: impl Into<String>) {
        self.ensure_context_node(path);
        if let Some(record) = self.nodes.get_mut(path) {
            record.literal = Some(data.into());
        }
    }

    /// Convenience for boolean-valued literals.
    pub fn set_deep_literal_boolean(&mut self, path: &Segment, value: bool) {
        self.set_literal(path, boolean_literal(value));
    }

    pub fn literal(&self, path: &Segment) -> Option<&str> {
        self.nodes.get(path)?.literal.as_deref()
    }

    pub fn contains_literal(&self, path: &Segment, data: &str) -> bool {
        self.literal(path) == Some(data)
    }

    /// Deletes the context node at `path` and its whole subtree.
    /// Returns false when the node does not exist. Deleting the root
    /// clears the graph.
    pub fn delete_context_node(&mut self, path: &Segment) -> bool {
        if path.is_root() {
            self.nodes.clear();
            self.nodes.insert(Segment::root(), NodeRecord::default());
            return true;
        }
        if !self.nodes.contains_key(path) {
            return false;
        }
        let doomed: Vec<Segment> = self
            .nodes
            .keys()
            .filter(|key| key.starts_with(path, false, false).is_some())
            .cloned()
            .collect();
        for key in doomed {
            self.nodes.remove(&key);
        }
        let parent = path.parent(-1);
        if let Some(record) = self.nodes.get_mut(&parent) {
            record.children.remove(path.last());
        }
        true
    }

    /// Deletes one relation tuple. Returns false when absent.
    pub fn delete_relation(&mut self, source: &Segment, arc: &Segment, target: &Segment) -> bool {
        let Some(record) = self.nodes.get_mut(source) else {
            return false;
        };
        let Some(targets) = record.relations.get_mut(arc) else {
            return false;
        };
        let removed = targets.remove(target);
        if targets.is_empty() {
            record.relations.remove(arc);
        }
        removed
    }

    /// Deletes the literal at `path`. Returns false when absent.
    pub fn delete_literal(&mut self, path: &Segment) -> bool {
        self.nodes
            .get_mut(path)
            .and_then(|record| record.literal.take())
            .is_some()
    }

    /// All statements of this graph in deterministic order: the
    /// context-node statement of every non-root node, then per node its
    /// relations and literal, in path order throughout.
    pub fn statements(&self) -> Vec<Statement> {
        let mut out = Vec::new();
        for (path, record) in &self.nodes {
            for child in &record.children {
                out.push(Statement::context_node(path.clone(), child.clone()));
            }
        }
        for (path, record) in &self.nodes {
            for (arc, targets) in &record.relations {
                for target in targets {
                    out.push(Statement::relation(path.clone(), arc.clone(), target.clone()));
                }
            }
            if let Some(data) = &record.literal {
                out.push(Statement::literal(path.clone(), data.clone()));
            }
        }
        out
    }

    /// The statements rooted at `path`: everything whose context node lies
    /// at or below it, including the arc that asserts `path` itself.
    pub fn statements_at(&self, path: &Segment) -> Vec<Statement> {
        self.statements()
            .into_iter()
            .filter(|statement| {
                statement
                    .context_node_xri()
                    .starts_with(path, false, false)
                    .is_some()
            })
            .collect()
    }

    pub fn contains_statement(&self, statement: &Statement) -> bool {
        match statement {
            Statement::ContextNode { subject, object } => {
                self.contains_context_node(&subject.with(object.clone()))
            }
            Statement::Relation {
                subject,
                predicate,
                object,
            } => self.contains_relation(subject, predicate, object),
            Statement::Literal { subject, data } => self.contains_literal(subject, data),
        }
    }

    /// Inserts a statement. Insertion is ensure-style: a statement that is
    /// already present is a no-op, and a literal statement replaces any
    /// previous value at its subject.
    pub fn create_statement(&mut self, statement: &Statement) -> Result<(), GraphError> {
        match statement {
            Statement::ContextNode { subject, object } => {
                self.ensure_context_node(&subject.with(object.clone()));
                Ok(())
            }
            Statement::Relation {
                subject,
                predicate,
                object,
            } => {
                if self.contains_relation(subject, predicate, object) {
                    return Ok(());
                }
                self.create_relation(subject, predicate, object)
            }
            Statement::Literal { subject, data } => {
                self.set_literal(subject, data.clone());
                Ok(())
            }
        }
    }

    /// Deletes a statement. Returns false when absent.
    pub fn delete_statement(&mut self, statement: &Statement) -> bool {
        match statement {
            Statement::ContextNode { subject, object } => {
                self.delete_context_node(&subject.with(object.clone()))
            }
            Statement::Relation {
                subject,
                predicate,
                object,
            } => self.delete_relation(subject, predicate, object),
            Statement::Literal { subject, .. } => self.delete_literal(subject),
        }
    }

    /// The statement set, the basis of graph equality.
    pub fn statement_set(&self) -> BTreeSet<Statement> {
        self.statements().into_iter().collect()
    }

    /// Whether the graph carries any statements at all.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
            && self
                .nodes
                .get(&Segment::root())
                .is_none_or(|record| record.is_empty())
    }
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for MemoryGraph {
    fn eq(&self, other: &Self) -> bool {
        self.statement_set() == other.statement_set()
    }
}

impl Eq for MemoryGraph {}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> Segment {
        text.parse().unwrap()
    }

    fn stmt(text: &str) -> Statement {
        text.parse().unwrap()
    }

    #[test]
    fn ensure_creates_intermediate_nodes() {
        let mut graph = MemoryGraph::new();
        graph.ensure_context_node(&seg("=a*b*c"));
        assert!(graph.contains_context_node(&seg("=a")));
        assert!(graph.contains_context_node(&seg("=a*b")));
        assert!(graph.contains_context_node(&seg("=a*b*c")));
        assert!(!graph.contains_context_node(&seg("=x")));
    }

    #[test]
    fn duplicate_relation_is_structural_violation() {
        let mut graph = MemoryGraph::new();
        graph
            .create_relation(&seg("=a"), &seg("+friend"), &seg("=b"))
            .unwrap();
        let err = graph
            .create_relation(&seg("=a"), &seg("+friend"), &seg("=b"))
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateRelation { .. }));

        // Same arc to a different target is fine.
        graph
            .create_relation(&seg("=a"), &seg("+friend"), &seg("=c"))
            .unwrap();
    }

    #[test]
    fn literal_create_then_replace() {
        let mut graph = MemoryGraph::new();
        graph.create_literal(&seg("=a+email"), "one").unwrap();
        assert!(matches!(
            graph.create_literal(&seg("=a+email"), "two"),
            Err(GraphError::DuplicateLiteral(_))
        ));
        graph.set_literal(&seg("=a+email"), "two");
        assert_eq!(graph.literal(&seg("=a+email")), Some("two"));
    }

    #[test]
    fn boolean_literal_convention() {
        let mut graph = MemoryGraph::new();
        graph.set_deep_literal_boolean(&seg("$secret$token$valid"), true);
        assert!(graph.contains_literal(&seg("$secret$token$valid"), "true"));
    }

    #[test]
    fn delete_context_node_removes_subtree() {
        let mut graph = MemoryGraph::new();
        graph.set_literal(&seg("=a*b+email"), "x");
        graph.ensure_context_node(&seg("=a*c"));
        assert!(graph.delete_context_node(&seg("=a*b")));
        assert!(!graph.contains_context_node(&seg("=a*b")));
        assert!(!graph.contains_context_node(&seg("=a*b+email")));
        assert!(graph.contains_context_node(&seg("=a*c")));
        assert!(!graph.delete_context_node(&seg("=a*b")));
    }

    #[test]
    fn statement_round_trip_through_graph() {
        let mut graph = MemoryGraph::new();
        for text in [
            "=markus+email/!/(data:,markus.sabadello@gmail.com)",
            "=markus/+friend/=neustar*animesh",
        ] {
            graph.create_statement(&stmt(text)).unwrap();
        }
        assert!(graph.contains_statement(&stmt("=markus/+friend/=neustar*animesh")));
        assert!(graph.contains_statement(&stmt("=markus/()/+email")));
        assert!(graph.contains_literal(&seg("=markus+email"), "markus.sabadello@gmail.com"));
    }

    #[test]
    fn create_statement_is_idempotent() {
        let mut graph = MemoryGraph::new();
        let relation = stmt("=markus/+friend/=neustar*animesh");
        graph.create_statement(&relation).unwrap();
        graph.create_statement(&relation).unwrap();
        let mut other = MemoryGraph::new();
        other.create_statement(&relation).unwrap();
        assert_eq!(graph, other);
    }

    #[test]
    fn statements_at_selects_subtree() {
        let mut graph = MemoryGraph::new();
        graph.set_literal(&seg("=alice+email"), "a@example.org");
        graph.set_literal(&seg("=bob+email"), "b@example.org");

        let at_alice = graph.statements_at(&seg("=alice"));
        assert!(at_alice
            .iter()
            .any(|s| s.is_literal() && s.subject() == &seg("=alice+email")));
        assert!(at_alice.iter().all(|s| s.subject() != &seg("=bob+email")));
        // The arc asserting =alice+email itself is included.
        assert!(at_alice.contains(&stmt("=alice/()/+email")));
    }

    #[test]
    fn equality_is_statement_set_equality() {
        let mut a = MemoryGraph::new();
        let mut b = MemoryGraph::new();
        a.set_literal(&seg("=x+n"), "1");
        b.set_literal(&seg("=x+n"), "1");
        assert_eq!(a, b);
        b.set_literal(&seg("=x+n"), "2");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_graph() {
        let graph = MemoryGraph::new();
        assert!(graph.is_empty());
        assert!(graph.statements().is_empty());
    }
}
