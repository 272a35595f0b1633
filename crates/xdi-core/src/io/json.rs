//! The XDI/JSON object form.
//!
//! A graph renders as a JSON object mapping `"subject/predicate"` keys to
//! arrays: the `()` predicate lists child arcs, `!` lists the single
//! literal value, any other predicate lists relation targets. Context
//! entries implied by deeper statements are omitted unless the writer is
//! configured to emit them.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ParseError;
use crate::graph::MemoryGraph;
use crate::io::{GraphReader, GraphWriter};
use crate::segment::{Segment, SubSegment};
use crate::statement::{split_top_level, Statement};

const FORMAT_NAME: &str = "XDI/JSON";
const FORMAT_NAME_CONTEXT_STATEMENTS: &str = "XDI/JSON_WITH_CONTEXT_STATEMENTS";
const MIME_TYPE: &str = "application/xdi+json";

/// Writer for the XDI/JSON object form.
#[derive(Clone, Debug, Default)]
pub struct XdiJsonWriter {
    write_context_statements: bool,
}

impl XdiJsonWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A writer that emits explicit context entries even when they are
    /// implied by deeper statements.
    pub fn with_context_statements() -> Self {
        Self {
            write_context_statements: true,
        }
    }
}

impl GraphWriter for XdiJsonWriter {
    fn format_name(&self) -> &'static str {
        if self.write_context_statements {
            FORMAT_NAME_CONTEXT_STATEMENTS
        } else {
            FORMAT_NAME
        }
    }

    fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    fn write(&self, graph: &MemoryGraph) -> String {
        let mut entries: Map<String, Value> = Map::new();

        for statement in graph.statements() {
            let (key, value) = match &statement {
                Statement::ContextNode { subject, object } => {
                    if !self.write_context_statements {
                        // An arc whose child carries content of its own is
                        // implied by that content and stays unwritten.
                        let child = subject.with(object.clone());
                        if graph.statements_at(&child).len() > 1 {
                            continue;
                        }
                    }
                    (format!("{}/()", subject), Value::String(object.to_string()))
                }
                Statement::Relation {
                    subject,
                    predicate,
                    object,
                } => (
                    format!("{}/{}", subject, predicate),
                    Value::String(object.to_string()),
                ),
                Statement::Literal { subject, data } => {
                    (format!("{}/!", subject), Value::String(data.clone()))
                }
            };
            if let Value::Array(array) = entries.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
                array.push(value);
            }
        }

        serde_json::to_string_pretty(&Value::Object(entries)).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Reader for the XDI/JSON object form.
#[derive(Clone, Debug, Default)]
pub struct XdiJsonReader;

impl XdiJsonReader {
    pub fn new() -> Self {
        Self
    }
}

impl GraphReader for XdiJsonReader {
    fn format_name(&self) -> &'static str {
        FORMAT_NAME
    }

    fn mime_type(&self) -> &'static str {
        MIME_TYPE
    }

    fn read(&self, graph: &mut MemoryGraph, input: &str) -> Result<(), ParseError> {
        let document: Value = serde_json::from_str(input)?;
        let Value::Object(object) = document else {
            return Err(ParseError::Document("expected a JSON object".into()));
        };

        for (key, value) in &object {
            let parts = split_top_level(key);
            if parts.len() != 2 {
                return Err(ParseError::Document(format!("invalid key: {}", key)));
            }
            let subject: Segment = parts[0].parse()?;
            let predicate = parts[1];

            let Value::Array(items) = value else {
                return Err(ParseError::Document(format!(
                    "value for key {} must be an array",
                    key
                )));
            };

            match predicate {
                "()" => {
                    for item in items {
                        let arc: SubSegment = string_item(key, item)?.parse()?;
                        let child = subject.with(arc.clone());
                        if graph.contains_context_node(&child) {
                            // implied context node, nothing to add
                            continue;
                        }
                        graph.ensure_context_node(&child);
                        debug!(under = %subject, arc = %arc, "created context node");
                    }
                }
                "!" => {
                    if items.len() != 1 {
                        return Err(ParseError::Document(format!(
                            "literal array for key {} must have exactly one item",
                            key
                        )));
                    }
                    let data = string_item(key, &items[0])?;
                    graph
                        .create_literal(&subject, data)
                        .map_err(|e| ParseError::Document(e.to_string()))?;
                    debug!(under = %subject, "created literal");
                }
                _ => {
                    let arc: Segment = predicate.parse()?;
                    for item in items {
                        let target: Segment = string_item(key, item)?.parse()?;
                        graph
                            .create_relation(&subject, &arc, &target)
                            .map_err(|e| ParseError::Document(e.to_string()))?;
                        debug!(under = %subject, arc = %arc, target = %target, "created relation");
                    }
                }
            }
        }

        Ok(())
    }
}

fn string_item<'a>(key: &str, item: &'a Value) -> Result<&'a str, ParseError> {
    item.as_str().ok_or_else(|| {
        ParseError::Document(format!("value items for key {} must be strings", key))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;

    fn seg(text: &str) -> Segment {
        text.parse().unwrap()
    }

    fn fixture() -> MemoryGraph {
        let mut graph = MemoryGraph::new();
        graph.set_literal(&seg("=markus+email"), "markus.sabadello@gmail.com");
        graph
            .create_relation(&seg("=markus"), &seg("+friend"), &seg("=neustar*animesh"))
            .unwrap();
        graph
    }

    #[test]
    fn writer_reader_roundtrip() {
        let graph = fixture();
        let text = XdiJsonWriter::new().write(&graph);

        let mut back = MemoryGraph::new();
        XdiJsonReader::new().read(&mut back, &text).unwrap();
        assert_eq!(graph, back);
    }

    #[test]
    fn writer_omits_implied_context_entries() {
        let graph = fixture();
        let text = XdiJsonWriter::new().write(&graph);
        let value: Value = serde_json::from_str(&text).unwrap();
        // =markus is implied by the statements below it.
        assert!(value.get("()/()").is_none());
        assert!(value.get("=markus/()").is_none());
        assert!(value.get("=markus+email/!").is_some());
    }

    #[test]
    fn context_statements_writer_is_explicit() {
        let graph = fixture();
        let text = XdiJsonWriter::with_context_statements().write(&graph);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["()/()"], serde_json::json!(["=markus"]));
        assert_eq!(value["=markus/()"], serde_json::json!(["+email"]));

        let mut back = MemoryGraph::new();
        XdiJsonReader::new().read(&mut back, &text).unwrap();
        assert_eq!(graph, back);
    }

    #[test]
    fn reader_rejects_bad_key() {
        let mut graph = MemoryGraph::new();
        let err = XdiJsonReader::new()
            .read(&mut graph, r#"{"nonsense": []}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::Document(_)));
    }

    #[test]
    fn reader_rejects_multi_valued_literal() {
        let mut graph = MemoryGraph::new();
        let err = XdiJsonReader::new()
            .read(&mut graph, r#"{"=a/!": ["x", "y"]}"#)
            .unwrap_err();
        assert!(matches!(err, ParseError::Document(_)));
    }

    #[test]
    fn reader_surfaces_json_errors() {
        let mut graph = MemoryGraph::new();
        let err = XdiJsonReader::new().read(&mut graph, "{not json").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }
}
