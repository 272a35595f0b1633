use xdi_core::{GraphError, ParseError, Segment};

/// Errors from executing a message envelope.
///
/// Errors raised while an operation is executing are wrapped into the
/// [`MessagingError::Operation`] variant carrying the offending
/// operation; authentication failures and already-wrapped errors pass
/// through unchanged.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Internal(String),

    #[error("operation {operation_xri} on {target} failed: {source}")]
    Operation {
        operation_xri: Segment,
        target: String,
        #[source]
        source: Box<MessagingError>,
    },
}

impl MessagingError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication(message.into())
    }

    /// Attaches the offending operation, unless the error already carries
    /// one or is an authentication failure.
    pub fn at_operation(self, operation_xri: &Segment, target: &str) -> Self {
        match self {
            Self::Operation { .. } | Self::Authentication(_) => self,
            other => Self::Operation {
                operation_xri: operation_xri.clone(),
                target: target.to_string(),
                source: Box::new(other),
            },
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// The operation XRI this error was wrapped with, if any.
    pub fn operation_xri(&self) -> Option<&Segment> {
        match self {
            Self::Operation { operation_xri, .. } => Some(operation_xri),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> Segment {
        text.parse().unwrap()
    }

    #[test]
    fn wrapping_attaches_the_operation() {
        let err = MessagingError::internal("boom").at_operation(&seg("$get"), "=alice");
        assert_eq!(err.operation_xri(), Some(&seg("$get")));
        assert!(format!("{}", err).contains("=alice"));
    }

    #[test]
    fn wrapping_is_not_repeated() {
        let err = MessagingError::internal("boom")
            .at_operation(&seg("$get"), "=alice")
            .at_operation(&seg("$set"), "=bob");
        assert_eq!(err.operation_xri(), Some(&seg("$get")));
    }

    #[test]
    fn authentication_errors_stay_unwrapped() {
        let err = MessagingError::authentication("bad token").at_operation(&seg("$get"), "=alice");
        assert!(err.is_authentication());
    }
}
