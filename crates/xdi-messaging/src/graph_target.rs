//! The graph-backed messaging target: default handlers that read and
//! write a [`MemoryGraph`].

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use xdi_core::{GraphError, MemoryGraph, Segment, Statement};

use crate::context::ExecutionContext;
use crate::error::MessagingError;
use crate::handler::{AddressHandler, HandlerResolver, StatementHandler};
use crate::interceptor::Flow;
use crate::message::{Operation, OperationKind};
use crate::result::MessageResult;

/// Configuration for the graph-backed handlers.
#[derive(Clone, Copy, Debug)]
pub struct GraphTargetConfig {
    /// Whether `$del` of something absent is an error (default: true).
    pub strict_del: bool,
}

impl Default for GraphTargetConfig {
    fn default() -> Self {
        Self { strict_del: true }
    }
}

/// Resolver handing out the graph handlers for every address and
/// statement. Plug this into a [`crate::target::MessagingTarget`] to get
/// the default `$get`/`$set`/`$del` behavior over a shared graph.
pub struct GraphMessagingTarget {
    graph: Arc<RwLock<MemoryGraph>>,
    address_handler: Arc<GraphAddressHandler>,
    statement_handler: Arc<GraphStatementHandler>,
}

impl GraphMessagingTarget {
    pub fn new(graph: Arc<RwLock<MemoryGraph>>, config: GraphTargetConfig) -> Self {
        Self {
            address_handler: Arc::new(GraphAddressHandler {
                graph: graph.clone(),
                config,
            }),
            statement_handler: Arc::new(GraphStatementHandler {
                graph: graph.clone(),
                config,
            }),
            graph,
        }
    }

    pub fn graph(&self) -> Arc<RwLock<MemoryGraph>> {
        self.graph.clone()
    }
}

impl HandlerResolver for GraphMessagingTarget {
    fn address_handler_for(&self, _address: &Segment) -> Option<Arc<dyn AddressHandler>> {
        Some(self.address_handler.clone())
    }

    fn statement_handler_for(&self, _statement: &Statement) -> Option<Arc<dyn StatementHandler>> {
        Some(self.statement_handler.clone())
    }
}

fn read_graph(
    graph: &Arc<RwLock<MemoryGraph>>,
) -> Result<RwLockReadGuard<'_, MemoryGraph>, MessagingError> {
    graph
        .read()
        .map_err(|e| MessagingError::internal(format!("graph lock poisoned: {}", e)))
}

fn write_graph(
    graph: &Arc<RwLock<MemoryGraph>>,
) -> Result<RwLockWriteGuard<'_, MemoryGraph>, MessagingError> {
    graph
        .write()
        .map_err(|e| MessagingError::internal(format!("graph lock poisoned: {}", e)))
}

/// `$get` copies the addressed subtree into the result, `$set` ensures
/// the context path, `$del` deletes the node and its subtree.
pub struct GraphAddressHandler {
    graph: Arc<RwLock<MemoryGraph>>,
    config: GraphTargetConfig,
}

#[async_trait]
impl AddressHandler for GraphAddressHandler {
    async fn execute_on_address(
        &self,
        address: &Segment,
        operation: &Operation,
        result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        match operation.kind() {
            OperationKind::Get => {
                let statements = read_graph(&self.graph)?.statements_at(address);
                debug!(address = %address, count = statements.len(), "get on address");
                for statement in &statements {
                    result.graph_mut().create_statement(statement)?;
                }
                Ok(Flow::Handled)
            }
            OperationKind::Set => {
                write_graph(&self.graph)?.ensure_context_node(address);
                debug!(address = %address, "set on address");
                Ok(Flow::Handled)
            }
            OperationKind::Del => {
                let deleted = write_graph(&self.graph)?.delete_context_node(address);
                debug!(address = %address, deleted, "del on address");
                if !deleted && self.config.strict_del {
                    return Err(GraphError::NodeNotFound(address.clone()).into());
                }
                Ok(Flow::Handled)
            }
            OperationKind::Other => Ok(Flow::Passthrough),
        }
    }
}

/// The statement counterparts: `$get` copies the statement when present,
/// `$set` ensures it, `$del` removes it.
pub struct GraphStatementHandler {
    graph: Arc<RwLock<MemoryGraph>>,
    config: GraphTargetConfig,
}

#[async_trait]
impl StatementHandler for GraphStatementHandler {
    async fn execute_on_statement(
        &self,
        statement: &Statement,
        operation: &Operation,
        result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        match operation.kind() {
            OperationKind::Get => {
                let present = read_graph(&self.graph)?.contains_statement(statement);
                debug!(statement = %statement, present, "get on statement");
                if present {
                    result.graph_mut().create_statement(statement)?;
                }
                Ok(Flow::Handled)
            }
            OperationKind::Set => {
                write_graph(&self.graph)?.create_statement(statement)?;
                debug!(statement = %statement, "set on statement");
                Ok(Flow::Handled)
            }
            OperationKind::Del => {
                let deleted = write_graph(&self.graph)?.delete_statement(statement);
                debug!(statement = %statement, deleted, "del on statement");
                if !deleted && self.config.strict_del {
                    return Err(GraphError::NodeNotFound(statement.context_node_xri()).into());
                }
                Ok(Flow::Handled)
            }
            OperationKind::Other => Ok(Flow::Passthrough),
        }
    }
}
