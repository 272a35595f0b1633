//! Per-envelope execution state.

use std::collections::HashMap;

use serde_json::Value;

use xdi_core::Segment;

/// The three attribute lifetimes of an execution.
///
/// The dispatcher clears each scope at the head of the corresponding loop
/// iteration: envelope scope once per `execute`, message scope before
/// each message, operation scope before each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeScope {
    Envelope,
    Message,
    Operation,
}

/// One frame of the contributor call stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContributorFrame {
    pub name: String,
    pub label: String,
}

/// Scratch state scoped to a single envelope execution.
///
/// Created when `execute` is called (or supplied by the caller), never
/// shared across envelopes. Carries three keyed attribute maps with
/// nested lifetimes and a LIFO contributor stack used for diagnostics;
/// the stack is balanced across any call, on success and failure alike.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    owner: Option<Segment>,
    envelope_attributes: HashMap<String, Value>,
    message_attributes: HashMap<String, Value>,
    operation_attributes: HashMap<String, Value>,
    contributor_stack: Vec<ContributorFrame>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context bound to the messaging target that owns the execution.
    pub fn for_owner(owner: Option<Segment>) -> Self {
        Self {
            owner,
            ..Self::default()
        }
    }

    /// The owner address of the messaging target this context was created
    /// for, if any.
    pub fn owner(&self) -> Option<&Segment> {
        self.owner.as_ref()
    }

    pub fn put_attribute(&mut self, scope: AttributeScope, key: impl Into<String>, value: Value) {
        self.attributes_mut(scope).insert(key.into(), value);
    }

    pub fn get_attribute(&self, scope: AttributeScope, key: &str) -> Option<&Value> {
        self.attributes(scope).get(key)
    }

    pub fn clear_scope(&mut self, scope: AttributeScope) {
        self.attributes_mut(scope).clear();
    }

    pub fn push_contributor(&mut self, name: impl Into<String>, label: impl Into<String>) {
        self.contributor_stack.push(ContributorFrame {
            name: name.into(),
            label: label.into(),
        });
    }

    pub fn pop_contributor(&mut self) -> Option<ContributorFrame> {
        self.contributor_stack.pop()
    }

    pub fn contributor_depth(&self) -> usize {
        self.contributor_stack.len()
    }

    /// The contributor stack from outermost to innermost, for diagnostics.
    pub fn contributor_stack(&self) -> &[ContributorFrame] {
        &self.contributor_stack
    }

    fn attributes(&self, scope: AttributeScope) -> &HashMap<String, Value> {
        match scope {
            AttributeScope::Envelope => &self.envelope_attributes,
            AttributeScope::Message => &self.message_attributes,
            AttributeScope::Operation => &self.operation_attributes,
        }
    }

    fn attributes_mut(&mut self, scope: AttributeScope) -> &mut HashMap<String, Value> {
        match scope {
            AttributeScope::Envelope => &mut self.envelope_attributes,
            AttributeScope::Message => &mut self.message_attributes,
            AttributeScope::Operation => &mut self.operation_attributes,
        }
    }
}
