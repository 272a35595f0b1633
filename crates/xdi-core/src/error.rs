use crate::segment::Segment;

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate relation {from}/{arc}/{target}")]
    DuplicateRelation {
        from: Segment,
        arc: Segment,
        target: Segment,
    },
    #[error("literal already exists at {0}")]
    DuplicateLiteral(Segment),
    #[error("context node not found: {0}")]
    NodeNotFound(Segment),
}

/// Errors from parsing identifiers, statements, or serialized graphs.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid identifier {text:?}: {reason}")]
    Identifier { text: String, reason: String },
    #[error("invalid statement {text:?}: {reason}")]
    Statement { text: String, reason: String },
    #[error("invalid graph document: {0}")]
    Document(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl ParseError {
    pub fn identifier(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Identifier {
            text: text.into(),
            reason: reason.into(),
        }
    }

    pub fn statement(text: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Statement {
            text: text.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a statement-form error, the signal the dispatcher
    /// uses to fall back from the statement path to the address path.
    pub fn is_statement(&self) -> bool {
        matches!(self, Self::Statement { .. })
    }
}
