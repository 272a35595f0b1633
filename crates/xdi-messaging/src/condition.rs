//! Statement conditions evaluated against a graph.

use xdi_core::{MemoryGraph, Statement};

/// A condition over a statement: holds when the graph contains what the
/// statement asserts. This is the generic building block policy
/// expressions are assembled from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    statement: Statement,
}

impl Condition {
    pub fn from_statement(statement: Statement) -> Self {
        Self { statement }
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    /// Evaluates this condition: a context-node statement holds when the
    /// subject node exists, a relation statement when the relation
    /// exists, a literal statement when the literal value matches.
    pub fn evaluate(&self, graph: &MemoryGraph) -> bool {
        match &self.statement {
            Statement::ContextNode { .. } => {
                graph.contains_context_node(&self.statement.context_node_xri())
            }
            Statement::Relation {
                subject,
                predicate,
                object,
            } => graph.contains_relation(subject, predicate, object),
            Statement::Literal { subject, data } => graph.contains_literal(subject, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(text: &str) -> Condition {
        Condition::from_statement(text.parse().unwrap())
    }

    #[test]
    fn context_node_condition() {
        let mut graph = MemoryGraph::new();
        graph.ensure_context_node(&"=alice+email".parse().unwrap());

        assert!(condition("=alice/()/+email").evaluate(&graph));
        assert!(!condition("=alice/()/+phone").evaluate(&graph));
    }

    #[test]
    fn relation_condition() {
        let mut graph = MemoryGraph::new();
        graph
            .create_relation(
                &"=alice".parse().unwrap(),
                &"+friend".parse().unwrap(),
                &"=carol".parse().unwrap(),
            )
            .unwrap();

        assert!(condition("=alice/+friend/=carol").evaluate(&graph));
        assert!(!condition("=alice/+friend/=dave").evaluate(&graph));
    }

    #[test]
    fn literal_condition() {
        let mut graph = MemoryGraph::new();
        graph.set_literal(&"=alice+email".parse().unwrap(), "a@example.org");

        assert!(condition("=alice+email/!/(data:,a@example.org)").evaluate(&graph));
        assert!(!condition("=alice+email/!/(data:,other)").evaluate(&graph));
    }
}
