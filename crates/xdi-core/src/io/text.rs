//! The XDI/text form: one canonical statement per line.

use tracing::debug;

use crate::error::ParseError;
use crate::graph::MemoryGraph;
use crate::io::{GraphReader, GraphWriter};
use crate::statement::Statement;

const FORMAT_NAME: &str = "XDI/text";
const MIME_TYPE: &str = "text/xdi";

#[derive(Clone, Debug, Default)]
pub struct XdiTextWriter;

impl XdiTextWriter {
    pub fn new() -> Self {
        Self
    }
}

impl GraphWriter for XdiTextWriter {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    fn write(&self, graph: &MemoryGraph) -> String {
        let mut out = String::new();
        for statement in graph.statements() {
            out.push_str(&statement.to_string());
            out.push('\n');
        }
        out
    }
}

#[derive(Clone, Debug, Default)]
pub struct XdiTextReader;

impl XdiTextReader {
    pub fn new() -> Self {
        Self
    }
}

impl GraphReader for XdiTextReader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    fn read(&self, graph: &mut MemoryGraph, input: &str) -> Result<(), ParseError> {
        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let statement: Statement = line.parse()?;
            graph
                .create_statement(&statement)
                .map_err(|e| ParseError::Document(e.to_string()))?;
            debug!(statement = %statement, "read statement");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let mut graph = MemoryGraph::new();
        XdiTextReader::new()
            .read(
                &mut graph,
                "=markus+email/!/(data:,markus.sabadello@gmail.com)\n\
                 =markus/+friend/=neustar*animesh\n",
            )
            .unwrap();

        let text = XdiTextWriter::new().write(&graph);
        let mut back = MemoryGraph::new();
        XdiTextReader::new().read(&mut back, &text).unwrap();
        assert_eq!(graph, back);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let mut graph = MemoryGraph::new();
        XdiTextReader::new()
            .read(&mut graph, "\n=a/+b/=c\n\n")
            .unwrap();
        assert_eq!(graph.statements().len(), 2); // the arc for =a, and the relation
    }

    #[test]
    fn malformed_line_is_a_parse_error() {
        let mut graph = MemoryGraph::new();
        let err = XdiTextReader::new()
            .read(&mut graph, "not a statement")
            .unwrap_err();
        assert!(err.is_statement());
    }
}
