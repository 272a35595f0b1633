//! The message envelope model: envelope → messages → operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use xdi_core::{MemoryGraph, ParseError, Segment, Statement};

use crate::constants::{xri_del, xri_get, xri_set};

/// The envelope: an ordered list of messages, executed in order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MessageEnvelope {
    messages: Vec<Message>,
}

impl MessageEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: an envelope holding one message with one operation.
    pub fn from_operation(
        sender: Segment,
        operation_xri: Segment,
        target: impl Into<String>,
    ) -> Self {
        let mut message = Message::new(sender);
        message.add_operation(Operation::new(operation_xri, target));
        let mut envelope = Self::new();
        envelope.add_message(message);
        envelope
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut [Message] {
        &mut self.messages
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn operation_count(&self) -> usize {
        self.messages.iter().map(|m| m.operation_count()).sum()
    }
}

/// One message: a sender identity, an optional secret token, and the
/// operations to execute. The metadata graph is where interceptors record
/// marks about the message itself, such as the `$secret$token$valid`
/// literal.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    sender: Segment,
    secret_token: Option<String>,
    created_at: DateTime<Utc>,
    operations: Vec<Operation>,
    metadata: MemoryGraph,
}

impl Message {
    pub fn new(sender: Segment) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            secret_token: None,
            created_at: Utc::now(),
            operations: Vec::new(),
            metadata: MemoryGraph::new(),
        }
    }

    pub fn with_secret_token(mut self, secret_token: impl Into<String>) -> Self {
        self.secret_token = Some(secret_token.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sender(&self) -> &Segment {
        &self.sender
    }

    pub fn secret_token(&self) -> Option<&str> {
        self.secret_token.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }

    pub fn metadata(&self) -> &MemoryGraph {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut MemoryGraph {
        &mut self.metadata
    }
}

/// The recognized operation kinds. Anything beyond the reserved three is
/// carried through as [`OperationKind::Other`] for plug-ins to act on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Get,
    Set,
    Del,
    Other,
}

/// One operation: a type tag and a target, which is either a plain
/// address or a serialized statement. The dispatcher decides which by
/// attempting the statement parse first.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    operation_xri: Segment,
    target: String,
}

impl Operation {
    pub fn new(operation_xri: Segment, target: impl Into<String>) -> Self {
        Self {
            operation_xri,
            target: target.into(),
        }
    }

    pub fn operation_xri(&self) -> &Segment {
        &self.operation_xri
    }

    pub fn kind(&self) -> OperationKind {
        if self.operation_xri == xri_get() {
            OperationKind::Get
        } else if self.operation_xri == xri_set() {
            OperationKind::Set
        } else if self.operation_xri == xri_del() {
            OperationKind::Del
        } else {
            OperationKind::Other
        }
    }

    pub fn target_text(&self) -> &str {
        &self.target
    }

    /// The target interpreted as a statement.
    pub fn target_statement(&self) -> Result<Statement, ParseError> {
        self.target.parse()
    }

    /// The target interpreted as a plain address.
    pub fn target_address(&self) -> Result<Segment, ParseError> {
        self.target.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> Segment {
        text.parse().unwrap()
    }

    #[test]
    fn envelope_counts() {
        let mut envelope = MessageEnvelope::new();
        let mut message = Message::new(seg("=alice"));
        message.add_operation(Operation::new(xri_get(), "=alice+email"));
        message.add_operation(Operation::new(xri_del(), "=alice+phone"));
        envelope.add_message(message);
        envelope.add_message(Message::new(seg("=bob")));

        assert_eq!(envelope.message_count(), 2);
        assert_eq!(envelope.operation_count(), 2);
    }

    #[test]
    fn operation_kind_recognition() {
        assert_eq!(Operation::new(xri_get(), "=a").kind(), OperationKind::Get);
        assert_eq!(Operation::new(xri_set(), "=a").kind(), OperationKind::Set);
        assert_eq!(Operation::new(xri_del(), "=a").kind(), OperationKind::Del);
        assert_eq!(
            Operation::new(seg("$mod"), "=a").kind(),
            OperationKind::Other
        );
    }

    #[test]
    fn target_classification() {
        let address = Operation::new(xri_get(), "=alice+email");
        assert!(address.target_statement().is_err());
        assert_eq!(address.target_address().unwrap(), seg("=alice+email"));

        let statement = Operation::new(xri_get(), "=alice/+friend/=carol");
        assert!(statement.target_statement().is_ok());
    }

    #[test]
    fn secret_token_is_optional() {
        let plain = Message::new(seg("=alice"));
        assert_eq!(plain.secret_token(), None);

        let with_token = Message::new(seg("=alice")).with_secret_token("pw");
        assert_eq!(with_token.secret_token(), Some("pw"));
    }

    #[test]
    fn metadata_graph_starts_empty() {
        let message = Message::new(seg("=alice"));
        assert!(message.metadata().is_empty());
    }
}
