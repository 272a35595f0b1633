//! The result graph an envelope execution accumulates into.

use serde::{Deserialize, Serialize};

use xdi_core::{MemoryGraph, Segment};

/// The graph the pipeline writes results into.
///
/// Handlers, contributors, and interceptors all share one result per
/// `execute` call. The dispatcher never rolls it back: a failing envelope
/// leaves whatever partial result had accumulated before the failure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResult {
    graph: MemoryGraph,
}

impl MessageResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &MemoryGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut MemoryGraph {
        &mut self.graph
    }

    pub fn into_graph(self) -> MemoryGraph {
        self.graph
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Shortcut for the common check that a literal landed in the result.
    pub fn literal(&self, path: &Segment) -> Option<&str> {
        self.graph.literal(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        assert!(MessageResult::new().is_empty());
    }

    #[test]
    fn literal_shortcut() {
        let mut result = MessageResult::new();
        let path: Segment = "=alice+email".parse().unwrap();
        result.graph_mut().set_literal(&path, "a@example.org");
        assert_eq!(result.literal(&path), Some("a@example.org"));
    }
}
