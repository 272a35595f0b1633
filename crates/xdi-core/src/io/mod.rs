//! Serialization formats for graphs.
//!
//! Readers populate a graph from text, writers render one; both go
//! through the graph's statement APIs only.

mod json;
mod text;

pub use json::{XdiJsonReader, XdiJsonWriter};
pub use text::{XdiTextReader, XdiTextWriter};

use crate::error::ParseError;
use crate::graph::MemoryGraph;

pub trait GraphReader {
    fn format_name(&self) -> &'static str;
    fn mime_type(&self) -> &'static str;
    fn read(&self, graph: &mut MemoryGraph, input: &str) -> Result<(), ParseError>;
}

pub trait GraphWriter {
    fn format_name(&self) -> &'static str;
    fn mime_type(&self) -> &'static str;
    fn write(&self, graph: &MemoryGraph) -> String;
}
