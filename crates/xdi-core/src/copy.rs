//! Copying graph content between graphs.

use crate::error::GraphError;
use crate::graph::MemoryGraph;

/// Copies every statement of `source` into `target`.
///
/// Copying is additive and idempotent: statements already present in the
/// target are left alone, so copying A into B and C, then B into C,
/// leaves B and C equal to A.
pub fn copy_graph(source: &MemoryGraph, target: &mut MemoryGraph) -> Result<(), GraphError> {
    for statement in source.statements() {
        target.create_statement(&statement)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::Statement;

    fn fixture() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        for text in [
            "=markus+email/!/(data:,markus.sabadello@gmail.com)",
            "=markus/+friend/=neustar*animesh",
            "=neustar*animesh+email/!/(data:,animesh@gmail.com)",
            "=neustar*animesh/+friend/=markus",
        ] {
            graph
                .create_statement(&text.parse::<Statement>().unwrap())
                .unwrap();
        }
        graph
    }

    #[test]
    fn copy_preserves_all_statements() {
        let graph = fixture();
        let mut copy = MemoryGraph::new();
        copy_graph(&graph, &mut copy).unwrap();
        assert_eq!(graph, copy);
    }

    #[test]
    fn repeated_copies_converge() {
        let graph = fixture();

        let mut second = MemoryGraph::new();
        copy_graph(&graph, &mut second).unwrap();

        let mut third = MemoryGraph::new();
        copy_graph(&graph, &mut third).unwrap();
        copy_graph(&second, &mut third).unwrap();

        assert_eq!(graph, second);
        assert_eq!(second, third);
        assert_eq!(third, graph);
    }
}
