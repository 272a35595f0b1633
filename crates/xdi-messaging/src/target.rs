//! The messaging target: the dispatcher that routes an envelope through
//! interceptors and contributors down to the handlers.
//!
//! One `execute` call is a single sequential flow: messages run in
//! envelope order, operations in message order. The target itself
//! (interceptor list, contributor map, resolver) is read-shared across
//! envelopes; all per-execution state lives in the
//! [`ExecutionContext`].

use std::sync::Arc;

use tracing::{debug, warn};

use xdi_core::{Segment, Statement};

use crate::context::{AttributeScope, ExecutionContext};
use crate::contributor::{Contributor, ContributorMap};
use crate::error::MessagingError;
use crate::handler::HandlerResolver;
use crate::hooks::{NoopHooks, TargetHooks};
use crate::interceptor::{Flow, Interceptor, TargetDecision};
use crate::message::{Message, MessageEnvelope, Operation};
use crate::result::MessageResult;

/// The dispatcher. Owns the plug-in surface and the `execute` entry
/// point.
pub struct MessagingTarget {
    owner: Option<Segment>,
    interceptors: Vec<Arc<dyn Interceptor>>,
    contributors: ContributorMap,
    resolver: Option<Arc<dyn HandlerResolver>>,
    hooks: Arc<dyn TargetHooks>,
}

impl MessagingTarget {
    pub fn new() -> Self {
        Self {
            owner: None,
            interceptors: Vec::new(),
            contributors: ContributorMap::new(),
            resolver: None,
            hooks: Arc::new(NoopHooks),
        }
    }

    pub fn owner(&self) -> Option<&Segment> {
        self.owner.as_ref()
    }

    pub fn set_owner(&mut self, owner: Segment) {
        self.owner = Some(owner);
    }

    /// Appends an interceptor. Stage order is insertion order, at every
    /// stage.
    pub fn add_interceptor(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn interceptors(&self) -> &[Arc<dyn Interceptor>] {
        &self.interceptors
    }

    pub fn add_contributor(&mut self, contributor_xri: Segment, contributor: Arc<dyn Contributor>) {
        self.contributors.add(contributor_xri, contributor);
    }

    pub fn contributors(&self) -> &ContributorMap {
        &self.contributors
    }

    pub fn contributors_mut(&mut self) -> &mut ContributorMap {
        &mut self.contributors
    }

    pub fn set_handler_resolver(&mut self, resolver: Arc<dyn HandlerResolver>) {
        self.resolver = Some(resolver);
    }

    pub fn set_hooks(&mut self, hooks: Arc<dyn TargetHooks>) {
        self.hooks = hooks;
    }

    /// Initializes every lifecycle interceptor. A failure aborts startup.
    pub async fn init(&self) -> Result<(), MessagingError> {
        for interceptor in &self.interceptors {
            if let Some(lifecycle) = interceptor.as_lifecycle() {
                debug!(interceptor = interceptor.name(), "initializing interceptor");
                lifecycle.init(self).await?;
            }
        }
        Ok(())
    }

    /// Shuts down every lifecycle interceptor. Failures are logged and do
    /// not prevent the remaining shutdowns from running.
    pub async fn shutdown(&self) {
        for interceptor in &self.interceptors {
            if let Some(lifecycle) = interceptor.as_lifecycle() {
                debug!(interceptor = interceptor.name(), "shutting down interceptor");
                if let Err(error) = lifecycle.shutdown(self).await {
                    warn!(
                        interceptor = interceptor.name(),
                        error = %error,
                        "error during interceptor shutdown"
                    );
                }
            }
        }
    }

    /// Executes a message envelope with a fresh execution context.
    pub async fn execute(
        &self,
        envelope: &mut MessageEnvelope,
        result: &mut MessageResult,
    ) -> Result<(), MessagingError> {
        let mut ctx = ExecutionContext::for_owner(self.owner.clone());
        self.execute_with_context(envelope, result, &mut ctx).await
    }

    /// Executes a message envelope with a caller-supplied execution
    /// context.
    ///
    /// On failure, every envelope interceptor's `on_error` hook is
    /// invoked (their own errors are logged and swallowed), then the hook
    /// object's, then the error propagates. `after` stages and result
    /// interceptors do not run on the failing path.
    pub async fn execute_with_context(
        &self,
        envelope: &mut MessageEnvelope,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        match self.execute_envelope(envelope, result, ctx).await {
            Ok(()) => Ok(()),
            Err(error) => {
                for interceptor in &self.interceptors {
                    if let Some(envelope_interceptor) = interceptor.as_envelope() {
                        debug!(
                            interceptor = interceptor.name(),
                            "executing envelope interceptor (exception)"
                        );
                        if let Err(secondary) = envelope_interceptor
                            .on_error(envelope, result, ctx, &error)
                            .await
                        {
                            warn!(
                                interceptor = interceptor.name(),
                                error = %secondary,
                                "error during envelope interceptor exception hook"
                            );
                        }
                    }
                }
                if let Err(secondary) = self.hooks.on_error(envelope, ctx, &error).await {
                    warn!(error = %secondary, "error during exception hook");
                }
                Err(error)
            }
        }
    }

    async fn execute_envelope(
        &self,
        envelope: &mut MessageEnvelope,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        ctx.clear_scope(AttributeScope::Envelope);

        self.hooks.before_envelope(envelope, ctx).await?;

        if self
            .envelope_interceptors_before(envelope, result, ctx)
            .await?
            .is_handled()
        {
            return Ok(());
        }

        let message_count = envelope.message_count();
        let operation_count = envelope.operation_count();

        for (index, message) in envelope.messages_mut().iter_mut().enumerate() {
            ctx.clear_scope(AttributeScope::Message);

            self.hooks.before_message(message, ctx).await?;

            if self
                .message_interceptors_before(message, result, ctx)
                .await?
                .is_handled()
            {
                continue;
            }

            debug!(
                message = index + 1,
                messages = message_count,
                operations = operation_count,
                "executing message"
            );

            self.execute_message(message, result, ctx).await?;

            if self
                .message_interceptors_after(message, result, ctx)
                .await?
                .is_handled()
            {
                continue;
            }

            self.hooks.after_message(message, ctx).await?;
        }

        if self
            .envelope_interceptors_after(envelope, result, ctx)
            .await?
            .is_handled()
        {
            return Ok(());
        }

        self.hooks.after_envelope(envelope, ctx).await?;

        for interceptor in &self.interceptors {
            if let Some(result_interceptor) = interceptor.as_result() {
                debug!(
                    interceptor = interceptor.name(),
                    "executing result interceptor (finish)"
                );
                result_interceptor.finish(result, ctx).await?;
            }
        }

        Ok(())
    }

    async fn execute_message(
        &self,
        message: &Message,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        let operation_count = message.operation_count();

        for (index, operation) in message.operations().iter().enumerate() {
            if let Err(error) = self
                .execute_operation_stages(index, operation_count, operation, result, ctx)
                .await
            {
                return Err(error.at_operation(operation.operation_xri(), operation.target_text()));
            }
        }

        Ok(())
    }

    async fn execute_operation_stages(
        &self,
        index: usize,
        operation_count: usize,
        operation: &Operation,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        ctx.clear_scope(AttributeScope::Operation);

        self.hooks.before_operation(operation, ctx).await?;

        if self
            .operation_interceptors_before(operation, result, ctx)
            .await?
            .is_handled()
        {
            return Ok(());
        }

        debug!(
            operation = index + 1,
            operations = operation_count,
            operation_xri = %operation.operation_xri(),
            "executing operation"
        );

        self.execute_operation(operation, result, ctx).await?;

        if self
            .operation_interceptors_after(operation, result, ctx)
            .await?
            .is_handled()
        {
            return Ok(());
        }

        self.hooks.after_operation(operation, ctx).await?;

        Ok(())
    }

    /// The address/statement split: the target is interpreted as a
    /// statement when it parses as one, as a plain address otherwise.
    async fn execute_operation(
        &self,
        operation: &Operation,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        match operation.target_statement() {
            Ok(statement) => {
                self.execute_on_statement(operation, statement, result, ctx)
                    .await
            }
            Err(_) => {
                let address = operation.target_address()?;
                self.execute_on_address(operation, address, result, ctx)
                    .await
            }
        }
    }

    async fn execute_on_address(
        &self,
        operation: &Operation,
        address: Segment,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        let address = match self
            .target_interceptors_address(operation, address, result, ctx)
            .await?
        {
            TargetDecision::Rewritten(address) => address,
            TargetDecision::Dropped => return Ok(()),
        };

        if self
            .contributors
            .execute_address(&[], &address, &address, operation, result, ctx)
            .await?
            .is_handled()
        {
            return Ok(());
        }

        if let Some(handler) = self
            .resolver
            .as_ref()
            .and_then(|resolver| resolver.address_handler_for(&address))
        {
            debug!(
                operation_xri = %operation.operation_xri(),
                address = %address,
                "executing address handler"
            );
            if handler
                .execute_on_address(&address, operation, result, ctx)
                .await?
                .is_handled()
            {
                return Ok(());
            }
        }

        Ok(())
    }

    async fn execute_on_statement(
        &self,
        operation: &Operation,
        statement: Statement,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<(), MessagingError> {
        let statement = match self
            .target_interceptors_statement(operation, statement, result, ctx)
            .await?
        {
            TargetDecision::Rewritten(statement) => statement,
            TargetDecision::Dropped => return Ok(()),
        };

        if self
            .contributors
            .execute_statement(&[], &statement, &statement, operation, result, ctx)
            .await?
            .is_handled()
        {
            return Ok(());
        }

        if let Some(handler) = self
            .resolver
            .as_ref()
            .and_then(|resolver| resolver.statement_handler_for(&statement))
        {
            debug!(
                operation_xri = %operation.operation_xri(),
                statement = %statement,
                "executing statement handler"
            );
            if handler
                .execute_on_statement(&statement, operation, result, ctx)
                .await?
                .is_handled()
            {
                return Ok(());
            }
        }

        Ok(())
    }

    async fn envelope_interceptors_before(
        &self,
        envelope: &MessageEnvelope,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        for interceptor in &self.interceptors {
            if let Some(envelope_interceptor) = interceptor.as_envelope() {
                debug!(
                    interceptor = interceptor.name(),
                    "executing envelope interceptor (before)"
                );
                if envelope_interceptor
                    .before(envelope, result, ctx)
                    .await?
                    .is_handled()
                {
                    debug!(
                        interceptor = interceptor.name(),
                        "envelope fully handled by interceptor"
                    );
                    return Ok(Flow::Handled);
                }
            }
        }
        Ok(Flow::Passthrough)
    }

    async fn envelope_interceptors_after(
        &self,
        envelope: &MessageEnvelope,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        for interceptor in &self.interceptors {
            if let Some(envelope_interceptor) = interceptor.as_envelope() {
                debug!(
                    interceptor = interceptor.name(),
                    "executing envelope interceptor (after)"
                );
                if envelope_interceptor
                    .after(envelope, result, ctx)
                    .await?
                    .is_handled()
                {
                    debug!(
                        interceptor = interceptor.name(),
                        "envelope fully handled by interceptor"
                    );
                    return Ok(Flow::Handled);
                }
            }
        }
        Ok(Flow::Passthrough)
    }

    async fn message_interceptors_before(
        &self,
        message: &mut Message,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        for interceptor in &self.interceptors {
            if let Some(message_interceptor) = interceptor.as_message() {
                debug!(
                    interceptor = interceptor.name(),
                    "executing message interceptor (before)"
                );
                if message_interceptor
                    .before(message, result, ctx)
                    .await?
                    .is_handled()
                {
                    debug!(
                        interceptor = interceptor.name(),
                        "message fully handled by interceptor"
                    );
                    return Ok(Flow::Handled);
                }
            }
        }
        Ok(Flow::Passthrough)
    }

    async fn message_interceptors_after(
        &self,
        message: &mut Message,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        for interceptor in &self.interceptors {
            if let Some(message_interceptor) = interceptor.as_message() {
                debug!(
                    interceptor = interceptor.name(),
                    "executing message interceptor (after)"
                );
                if message_interceptor
                    .after(message, result, ctx)
                    .await?
                    .is_handled()
                {
                    debug!(
                        interceptor = interceptor.name(),
                        "message fully handled by interceptor"
                    );
                    return Ok(Flow::Handled);
                }
            }
        }
        Ok(Flow::Passthrough)
    }

    async fn operation_interceptors_before(
        &self,
        operation: &Operation,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        for interceptor in &self.interceptors {
            if let Some(operation_interceptor) = interceptor.as_operation() {
                debug!(
                    interceptor = interceptor.name(),
                    "executing operation interceptor (before)"
                );
                if operation_interceptor
                    .before(operation, result, ctx)
                    .await?
                    .is_handled()
                {
                    debug!(
                        interceptor = interceptor.name(),
                        "operation fully handled by interceptor"
                    );
                    return Ok(Flow::Handled);
                }
            }
        }
        Ok(Flow::Passthrough)
    }

    async fn operation_interceptors_after(
        &self,
        operation: &Operation,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        for interceptor in &self.interceptors {
            if let Some(operation_interceptor) = interceptor.as_operation() {
                debug!(
                    interceptor = interceptor.name(),
                    "executing operation interceptor (after)"
                );
                if operation_interceptor
                    .after(operation, result, ctx)
                    .await?
                    .is_handled()
                {
                    debug!(
                        interceptor = interceptor.name(),
                        "operation fully handled by interceptor"
                    );
                    return Ok(Flow::Handled);
                }
            }
        }
        Ok(Flow::Passthrough)
    }

    async fn target_interceptors_address(
        &self,
        operation: &Operation,
        mut address: Segment,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<TargetDecision<Segment>, MessagingError> {
        for interceptor in &self.interceptors {
            if let Some(target_interceptor) = interceptor.as_target() {
                debug!(
                    interceptor = interceptor.name(),
                    address = %address,
                    "executing target interceptor on address"
                );
                match target_interceptor
                    .target_address(operation, address, result, ctx)
                    .await?
                {
                    TargetDecision::Rewritten(rewritten) => {
                        debug!(
                            interceptor = interceptor.name(),
                            address = %rewritten,
                            "target interceptor returned address"
                        );
                        address = rewritten;
                    }
                    TargetDecision::Dropped => {
                        debug!(
                            interceptor = interceptor.name(),
                            "address skipped by target interceptor"
                        );
                        return Ok(TargetDecision::Dropped);
                    }
                }
            }
        }
        Ok(TargetDecision::Rewritten(address))
    }

    async fn target_interceptors_statement(
        &self,
        operation: &Operation,
        mut statement: Statement,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<TargetDecision<Statement>, MessagingError> {
        for interceptor in &self.interceptors {
            if let Some(target_interceptor) = interceptor.as_target() {
                debug!(
                    interceptor = interceptor.name(),
                    statement = %statement,
                    "executing target interceptor on statement"
                );
                match target_interceptor
                    .target_statement(operation, statement, result, ctx)
                    .await?
                {
                    TargetDecision::Rewritten(rewritten) => {
                        debug!(
                            interceptor = interceptor.name(),
                            statement = %rewritten,
                            "target interceptor returned statement"
                        );
                        statement = rewritten;
                    }
                    TargetDecision::Dropped => {
                        debug!(
                            interceptor = interceptor.name(),
                            "statement skipped by target interceptor"
                        );
                        return Ok(TargetDecision::Dropped);
                    }
                }
            }
        }
        Ok(TargetDecision::Rewritten(statement))
    }
}

impl Default for MessagingTarget {
    fn default() -> Self {
        Self::new()
    }
}
