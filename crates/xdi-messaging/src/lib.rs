//! XDI message execution pipeline.
//!
//! An envelope carries messages, each message carries operations, and
//! the [`target::MessagingTarget`] dispatcher routes an envelope through
//! a composable chain of plug-ins down to the handlers that touch the
//! graph:
//!
//! ```text
//! envelope → [envelope interceptors: before]
//!   → per message → [message interceptors: before]
//!     → per operation → [operation interceptors: before]
//!       → [target interceptors rewrite the target]
//!       → [contributors by address prefix]
//!       → address or statement handler
//!     → [operation interceptors: after]
//!   → [message interceptors: after]
//! → [envelope interceptors: after] → [result interceptors: finish]
//! ```
//!
//! Any stage may report the work *handled*, which skips the remainder of
//! that stage's scope. Errors are wrapped with the offending operation,
//! broadcast to the envelope interceptors' exception hooks, and then
//! propagate to the caller.

pub mod auth;
pub mod condition;
pub mod constants;
pub mod context;
pub mod contributor;
pub mod error;
pub mod graph_target;
pub mod handler;
pub mod hooks;
pub mod interceptor;
pub mod message;
pub mod result;
pub mod target;

pub use auth::{SecretTokenAuthenticator, SecretTokenInterceptor, StaticSecretTokenAuthenticator};
pub use condition::Condition;
pub use context::{AttributeScope, ContributorFrame, ExecutionContext};
pub use contributor::{Contributor, ContributorMap};
pub use error::MessagingError;
pub use graph_target::{GraphMessagingTarget, GraphTargetConfig};
pub use handler::{AddressHandler, HandlerResolver, StatementHandler};
pub use hooks::{NoopHooks, TargetHooks};
pub use interceptor::{
    EnvelopeInterceptor, Flow, Interceptor, LifecycleInterceptor, MessageInterceptor,
    OperationInterceptor, ResultInterceptor, TargetDecision, TargetInterceptor,
};
pub use message::{Message, MessageEnvelope, Operation, OperationKind};
pub use result::MessageResult;
pub use target::MessagingTarget;
