//! The handler surface: per-target execution after interceptors and
//! contributors have had their turn.

use std::sync::Arc;

use async_trait::async_trait;

use xdi_core::{Segment, Statement};

use crate::context::ExecutionContext;
use crate::error::MessagingError;
use crate::interceptor::Flow;
use crate::message::Operation;
use crate::result::MessageResult;

/// Executes an operation on an address target. `Handled` suppresses any
/// subsequent default behavior for that target.
#[async_trait]
pub trait AddressHandler: Send + Sync {
    async fn execute_on_address(
        &self,
        address: &Segment,
        operation: &Operation,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError>;
}

/// Executes an operation on a statement target.
#[async_trait]
pub trait StatementHandler: Send + Sync {
    async fn execute_on_statement(
        &self,
        statement: &Statement,
        operation: &Operation,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError>;
}

/// The handler-selection strategy of a concrete messaging target.
/// Returning `None` means the target has no handler for that address or
/// statement, which silently passes the operation through.
pub trait HandlerResolver: Send + Sync {
    fn address_handler_for(&self, address: &Segment) -> Option<Arc<dyn AddressHandler>>;
    fn statement_handler_for(&self, statement: &Statement) -> Option<Arc<dyn StatementHandler>>;
}
