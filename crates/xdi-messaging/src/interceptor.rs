//! The interceptor chain: capability-tagged plug-ins at five scopes.
//!
//! A messaging target holds one ordered, heterogeneous interceptor list.
//! Dispatch is by capability: at each stage the dispatcher asks every
//! entry whether it participates, via the `as_*` accessors of
//! [`Interceptor`]. Iteration order is declared insertion order at every
//! stage — including `after`, which runs head-to-tail rather than
//! reversed.

use async_trait::async_trait;

use xdi_core::{Segment, Statement};

use crate::context::ExecutionContext;
use crate::error::MessagingError;
use crate::message::{Message, MessageEnvelope, Operation};
use crate::result::MessageResult;
use crate::target::MessagingTarget;

/// The short-circuit signal of `before`/`after` stages and of
/// contributors and handlers: `Handled` means the remainder of the stage
/// must be skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Handled,
    Passthrough,
}

impl Flow {
    pub fn is_handled(&self) -> bool {
        matches!(self, Flow::Handled)
    }
}

/// What a target interceptor did to an operation target: rewrote it
/// (possibly unchanged) for the next interceptor in the chain, or dropped
/// it so that no contributor or handler runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetDecision<T> {
    Rewritten(T),
    Dropped,
}

/// The capability-tagging trait every interceptor implements.
///
/// Each accessor defaults to `None`; an interceptor overrides the ones
/// whose stages it participates in, returning itself.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str;

    fn as_lifecycle(&self) -> Option<&dyn LifecycleInterceptor> {
        None
    }

    fn as_envelope(&self) -> Option<&dyn EnvelopeInterceptor> {
        None
    }

    fn as_message(&self) -> Option<&dyn MessageInterceptor> {
        None
    }

    fn as_operation(&self) -> Option<&dyn OperationInterceptor> {
        None
    }

    fn as_target(&self) -> Option<&dyn TargetInterceptor> {
        None
    }

    fn as_result(&self) -> Option<&dyn ResultInterceptor> {
        None
    }
}

/// Target lifecycle: called once at startup and teardown of the messaging
/// target. Shutdown failures are logged and do not prevent the remaining
/// shutdowns from running.
#[async_trait]
pub trait LifecycleInterceptor: Send + Sync {
    async fn init(&self, target: &MessagingTarget) -> Result<(), MessagingError>;
    async fn shutdown(&self, target: &MessagingTarget) -> Result<(), MessagingError>;
}

/// Envelope scope. `Handled` from `before` or `after` short-circuits the
/// remainder of the envelope path and returns early from dispatch.
/// `on_error` is best-effort: its own errors are logged, not rethrown.
#[async_trait]
pub trait EnvelopeInterceptor: Send + Sync {
    async fn before(
        &self,
        _envelope: &MessageEnvelope,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        Ok(Flow::Passthrough)
    }

    async fn after(
        &self,
        _envelope: &MessageEnvelope,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        Ok(Flow::Passthrough)
    }

    async fn on_error(
        &self,
        _envelope: &MessageEnvelope,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
        _error: &MessagingError,
    ) -> Result<(), MessagingError> {
        Ok(())
    }
}

/// Message scope. `Handled` skips the current message; subsequent
/// messages still execute.
#[async_trait]
pub trait MessageInterceptor: Send + Sync {
    async fn before(
        &self,
        _message: &mut Message,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        Ok(Flow::Passthrough)
    }

    async fn after(
        &self,
        _message: &mut Message,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        Ok(Flow::Passthrough)
    }
}

/// Operation scope. `Handled` skips the current operation.
#[async_trait]
pub trait OperationInterceptor: Send + Sync {
    async fn before(
        &self,
        _operation: &Operation,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        Ok(Flow::Passthrough)
    }

    async fn after(
        &self,
        _operation: &Operation,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        Ok(Flow::Passthrough)
    }
}

/// Target scope: may rewrite or drop the operation target before
/// contributors and handlers see it.
#[async_trait]
pub trait TargetInterceptor: Send + Sync {
    async fn target_address(
        &self,
        _operation: &Operation,
        address: Segment,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<TargetDecision<Segment>, MessagingError> {
        Ok(TargetDecision::Rewritten(address))
    }

    async fn target_statement(
        &self,
        _operation: &Operation,
        statement: Statement,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<TargetDecision<Statement>, MessagingError> {
        Ok(TargetDecision::Rewritten(statement))
    }
}

/// Result scope: runs once at the very end of a fully successful
/// execution.
#[async_trait]
pub trait ResultInterceptor: Send + Sync {
    async fn finish(
        &self,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inert;

    impl Interceptor for Inert {
        fn name(&self) -> &str {
            "inert"
        }
    }

    #[test]
    fn capabilities_default_to_none() {
        let interceptor = Inert;
        assert!(interceptor.as_lifecycle().is_none());
        assert!(interceptor.as_envelope().is_none());
        assert!(interceptor.as_message().is_none());
        assert!(interceptor.as_operation().is_none());
        assert!(interceptor.as_target().is_none());
        assert!(interceptor.as_result().is_none());
    }

    #[test]
    fn flow_signals() {
        assert!(Flow::Handled.is_handled());
        assert!(!Flow::Passthrough.is_handled());
    }
}
