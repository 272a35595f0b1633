//! Secret-token authentication of incoming messages.
//!
//! The interceptor looks for a secret token on each message and asks its
//! authenticator to verify it. A message without a token passes through
//! untouched; a message with a bad token fails the whole envelope with an
//! authentication error; a message with a good token is marked with the
//! `$secret$token$valid` literal and continues down the pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use xdi_core::Segment;

use crate::constants::xri_secret_token_valid;
use crate::context::ExecutionContext;
use crate::error::MessagingError;
use crate::interceptor::{
    Flow, Interceptor, LifecycleInterceptor, MessageInterceptor,
};
use crate::message::Message;
use crate::result::MessageResult;
use crate::target::MessagingTarget;

/// Verifies a message's secret token against some credential store.
#[async_trait]
pub trait SecretTokenAuthenticator: Send + Sync {
    async fn init(&self) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn authenticate(
        &self,
        message: &Message,
        secret_token: &str,
    ) -> Result<bool, MessagingError>;
}

/// An authenticator backed by a static sender → token table.
#[derive(Clone, Debug, Default)]
pub struct StaticSecretTokenAuthenticator {
    tokens: HashMap<Segment, String>,
}

impl StaticSecretTokenAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_token(&mut self, sender: Segment, secret_token: impl Into<String>) {
        self.tokens.insert(sender, secret_token.into());
    }
}

#[async_trait]
impl SecretTokenAuthenticator for StaticSecretTokenAuthenticator {
    async fn authenticate(
        &self,
        message: &Message,
        secret_token: &str,
    ) -> Result<bool, MessagingError> {
        Ok(self.tokens.get(message.sender()).map(String::as_str) == Some(secret_token))
    }
}

/// The message interceptor driving an authenticator.
pub struct SecretTokenInterceptor {
    authenticator: Arc<dyn SecretTokenAuthenticator>,
}

impl SecretTokenInterceptor {
    pub fn new(authenticator: Arc<dyn SecretTokenAuthenticator>) -> Self {
        Self { authenticator }
    }
}

impl Interceptor for SecretTokenInterceptor {
    fn name(&self) -> &str {
        "secret-token"
    }

    fn as_lifecycle(&self) -> Option<&dyn LifecycleInterceptor> {
        Some(self)
    }

    fn as_message(&self) -> Option<&dyn MessageInterceptor> {
        Some(self)
    }
}

#[async_trait]
impl LifecycleInterceptor for SecretTokenInterceptor {
    async fn init(&self, _target: &MessagingTarget) -> Result<(), MessagingError> {
        self.authenticator.init().await
    }

    async fn shutdown(&self, _target: &MessagingTarget) -> Result<(), MessagingError> {
        self.authenticator.shutdown().await
    }
}

#[async_trait]
impl MessageInterceptor for SecretTokenInterceptor {
    async fn before(
        &self,
        message: &mut Message,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        let Some(secret_token) = message.secret_token().map(str::to_owned) else {
            return Ok(Flow::Passthrough);
        };

        debug!(sender = %message.sender(), "authenticating message");

        let authenticated = self.authenticator.authenticate(message, &secret_token).await?;
        if !authenticated {
            return Err(MessagingError::authentication("invalid secret token"));
        }

        message
            .metadata_mut()
            .set_deep_literal_boolean(&xri_secret_token_valid(), true);
        debug!(sender = %message.sender(), "secret token valid");

        Ok(Flow::Passthrough)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str) -> Segment {
        text.parse().unwrap()
    }

    fn authenticator() -> Arc<StaticSecretTokenAuthenticator> {
        let mut authenticator = StaticSecretTokenAuthenticator::new();
        authenticator.add_token(seg("=alice"), "pw");
        Arc::new(authenticator)
    }

    #[tokio::test]
    async fn valid_token_marks_the_message() {
        let interceptor = SecretTokenInterceptor::new(authenticator());
        let mut message = Message::new(seg("=alice")).with_secret_token("pw");

        let flow = interceptor
            .before(
                &mut message,
                &mut MessageResult::new(),
                &mut ExecutionContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(flow, Flow::Passthrough);
        assert!(message
            .metadata()
            .contains_literal(&xri_secret_token_valid(), "true"));
    }

    #[tokio::test]
    async fn invalid_token_is_an_authentication_error() {
        let interceptor = SecretTokenInterceptor::new(authenticator());
        let mut message = Message::new(seg("=alice")).with_secret_token("wrong");

        let err = interceptor
            .before(
                &mut message,
                &mut MessageResult::new(),
                &mut ExecutionContext::new(),
            )
            .await
            .unwrap_err();

        assert!(err.is_authentication());
        assert!(!message
            .metadata()
            .contains_literal(&xri_secret_token_valid(), "true"));
    }

    #[tokio::test]
    async fn message_without_token_passes_through() {
        let interceptor = SecretTokenInterceptor::new(authenticator());
        let mut message = Message::new(seg("=alice"));

        let flow = interceptor
            .before(
                &mut message,
                &mut MessageResult::new(),
                &mut ExecutionContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(flow, Flow::Passthrough);
        assert!(message.metadata().is_empty());
    }

    #[tokio::test]
    async fn unknown_sender_fails() {
        let interceptor = SecretTokenInterceptor::new(authenticator());
        let mut message = Message::new(seg("=mallory")).with_secret_token("pw");

        let err = interceptor
            .before(
                &mut message,
                &mut MessageResult::new(),
                &mut ExecutionContext::new(),
            )
            .await
            .unwrap_err();

        assert!(err.is_authentication());
    }
}
