//! The hook object a messaging target may carry.
//!
//! Hooks run around the interceptor stages at each scope and see the
//! exception path; every method defaults to a no-op, so an embedder
//! overrides only what it needs.

use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::MessagingError;
use crate::message::{Message, MessageEnvelope, Operation};

#[async_trait]
pub trait TargetHooks: Send + Sync {
    async fn before_envelope(
        &self,
        _envelope: &MessageEnvelope,
        _ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn after_envelope(
        &self,
        _envelope: &MessageEnvelope,
        _ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn before_message(
        &self,
        _message: &Message,
        _ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn after_message(
        &self,
        _message: &Message,
        _ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn before_operation(
        &self,
        _operation: &Operation,
        _ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn after_operation(
        &self,
        _operation: &Operation,
        _ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        Ok(())
    }

    /// Runs after the envelope interceptors' `on_error` broadcast, before
    /// the error propagates to the caller. Its own errors are logged and
    /// swallowed so they cannot mask the original.
    async fn on_error(
        &self,
        _envelope: &MessageEnvelope,
        _ctx: &mut ExecutionContext,
        _error: &MessagingError,
    ) -> Result<(), MessagingError> {
        Ok(())
    }
}

/// The default hook object: does nothing at every point.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHooks;

#[async_trait]
impl TargetHooks for NoopHooks {}
