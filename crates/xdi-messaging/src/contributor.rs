//! Contributors: plug-ins bound to address prefixes.
//!
//! The contributor map is keyed longest-prefix-first, so a query visits
//! the most specific registered prefix. Dispatch stops at that prefix:
//! when none of its contributors handle the target, the engine does not
//! recurse into shorter prefixes on its own — a contributor wanting that
//! invokes nested dispatch with the remainder itself.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use xdi_core::{DescendingSegment, Segment, Statement};

use crate::context::ExecutionContext;
use crate::error::MessagingError;
use crate::interceptor::Flow;
use crate::message::Operation;
use crate::result::MessageResult;

/// A plug-in bound to one or more address prefixes, invoked before the
/// default handler for targets under those prefixes.
///
/// `trail` is the chain of concrete prefixes matched so far (outermost
/// first), `relative` the target with those prefixes removed, `absolute`
/// the original operation target.
#[async_trait]
pub trait Contributor: Send + Sync {
    fn name(&self) -> &str;

    /// The address prefixes this contributor claims when registered
    /// declaratively via [`ContributorMap::add_claimed`].
    fn addresses(&self) -> Vec<Segment> {
        Vec::new()
    }

    async fn execute_on_address(
        &self,
        _trail: &[Segment],
        _relative: &Segment,
        _absolute: &Segment,
        _operation: &Operation,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        Ok(Flow::Passthrough)
    }

    async fn execute_on_statement(
        &self,
        _trail: &[Segment],
        _relative: &Statement,
        _absolute: &Statement,
        _operation: &Operation,
        _result: &mut MessageResult,
        _ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        Ok(Flow::Passthrough)
    }
}

/// Address prefix → ordered contributor list, visited longest-prefix
/// first.
#[derive(Clone, Default)]
pub struct ContributorMap {
    entries: BTreeMap<DescendingSegment, Vec<Arc<dyn Contributor>>>,
}

impl ContributorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, contributor_xri: Segment, contributor: Arc<dyn Contributor>) {
        debug!(contributor = contributor.name(), xri = %contributor_xri, "adding contributor");
        self.entries
            .entry(DescendingSegment(contributor_xri))
            .or_default()
            .push(contributor);
    }

    /// Registers a contributor at every address it claims.
    pub fn add_claimed(&mut self, contributor: Arc<dyn Contributor>) {
        for contributor_xri in contributor.addresses() {
            self.add(contributor_xri, contributor.clone());
        }
    }

    pub fn remove(&mut self, contributor_xri: &Segment, contributor: &Arc<dyn Contributor>) {
        let key = DescendingSegment(contributor_xri.clone());
        if let Some(contributors) = self.entries.get_mut(&key) {
            contributors.retain(|candidate| !Arc::ptr_eq(candidate, contributor));
            if contributors.is_empty() {
                self.entries.remove(&key);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Contributor names in map order, for diagnostics.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .values()
            .flatten()
            .map(|contributor| contributor.name().to_string())
            .collect()
    }

    /// Exact key lookup.
    pub fn find_matching(&self, context_node_xri: &Segment) -> Option<&Segment> {
        self.entries
            .get_key_value(&DescendingSegment(context_node_xri.clone()))
            .map(|(key, _)| &key.0)
    }

    /// The first registered key the query starts with — the longest one,
    /// by the map's ordering. Variables are permitted in the key.
    pub fn find_higher(&self, context_node_xri: &Segment) -> Option<&Segment> {
        self.entries
            .keys()
            .map(|key| &key.0)
            .find(|key| context_node_xri.starts_with(key, false, true).is_some())
    }

    /// The first registered key that strictly extends the query.
    /// Variables are permitted in the key.
    pub fn find_lower(&self, context_node_xri: &Segment) -> Option<&Segment> {
        self.entries.keys().map(|key| &key.0).find(|key| {
            *key != context_node_xri && key.starts_with(context_node_xri, true, false).is_some()
        })
    }

    /// Dispatches an address target to the contributors at its longest
    /// registered prefix. Returns `Handled` as soon as one contributor
    /// reports it.
    pub async fn execute_address(
        &self,
        trail: &[Segment],
        relative: &Segment,
        absolute: &Segment,
        operation: &Operation,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        let Some(next_xri) = self.find_higher(relative).cloned() else {
            return Ok(Flow::Passthrough);
        };
        let Some(matched) = relative.starts_with(&next_xri, false, true) else {
            return Ok(Flow::Passthrough);
        };
        let remainder = relative
            .remove_start(&next_xri, false, true)
            .unwrap_or_else(Segment::root);

        let mut next_trail = trail.to_vec();
        next_trail.push(matched);

        debug!(
            prefix = %next_xri,
            remainder = %remainder,
            absolute = %absolute,
            "dispatching address to contributors"
        );

        // Snapshot so a contributor may mutate the map through nested
        // dispatch without invalidating this iteration.
        let contributors = self
            .entries
            .get(&DescendingSegment(next_xri))
            .cloned()
            .unwrap_or_default();

        for contributor in contributors {
            debug!(contributor = contributor.name(), "executing contributor (address)");
            ctx.push_contributor(contributor.name(), "address");
            let outcome = contributor
                .execute_on_address(&next_trail, &remainder, absolute, operation, result, ctx)
                .await;
            ctx.pop_contributor();
            if outcome?.is_handled() {
                debug!(
                    contributor = contributor.name(),
                    "address fully handled by contributor"
                );
                return Ok(Flow::Handled);
            }
        }

        Ok(Flow::Passthrough)
    }

    /// Statement dispatch, keyed by the statement's context node XRI:
    /// `subject ++ object` for context-node statements, the subject
    /// alone otherwise.
    pub async fn execute_statement(
        &self,
        trail: &[Segment],
        relative: &Statement,
        absolute: &Statement,
        operation: &Operation,
        result: &mut MessageResult,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, MessagingError> {
        let context_node_xri = relative.context_node_xri();

        let Some(next_xri) = self.find_higher(&context_node_xri).cloned() else {
            return Ok(Flow::Passthrough);
        };
        let Some(matched) = context_node_xri.starts_with(&next_xri, false, true) else {
            return Ok(Flow::Passthrough);
        };
        // For context-node statements the matched prefix may extend past
        // the subject; the statement is then passed through unrebased.
        let remainder = relative.remove_start(&next_xri).unwrap_or_else(|| relative.clone());

        let mut next_trail = trail.to_vec();
        next_trail.push(matched);

        debug!(
            prefix = %next_xri,
            remainder = %remainder,
            absolute = %absolute,
            "dispatching statement to contributors"
        );

        let contributors = self
            .entries
            .get(&DescendingSegment(next_xri))
            .cloned()
            .unwrap_or_default();

        for contributor in contributors {
            debug!(contributor = contributor.name(), "executing contributor (statement)");
            ctx.push_contributor(contributor.name(), "statement");
            let outcome = contributor
                .execute_on_statement(&next_trail, &remainder, absolute, operation, result, ctx)
                .await;
            ctx.pop_contributor();
            if outcome?.is_handled() {
                debug!(
                    contributor = contributor.name(),
                    "statement fully handled by contributor"
                );
                return Ok(Flow::Handled);
            }
        }

        Ok(Flow::Passthrough)
    }
}

impl std::fmt::Debug for ContributorMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(key, contributors)| {
                (
                    key.0.to_string(),
                    contributors
                        .iter()
                        .map(|c| c.name().to_string())
                        .collect::<Vec<_>>(),
                )
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::xri_get;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn seg(text: &str) -> Segment {
        text.parse().unwrap()
    }

    struct Recording {
        name: String,
        handled: bool,
        calls: AtomicUsize,
        seen_relative: std::sync::Mutex<Option<Segment>>,
        seen_trail: std::sync::Mutex<Vec<Segment>>,
    }

    impl Recording {
        fn new(name: &str, handled: bool) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                handled,
                calls: AtomicUsize::new(0),
                seen_relative: std::sync::Mutex::new(None),
                seen_trail: std::sync::Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Contributor for Recording {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute_on_address(
            &self,
            trail: &[Segment],
            relative: &Segment,
            _absolute: &Segment,
            _operation: &Operation,
            _result: &mut MessageResult,
            _ctx: &mut ExecutionContext,
        ) -> Result<Flow, MessagingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen_relative.lock().unwrap() = Some(relative.clone());
            *self.seen_trail.lock().unwrap() = trail.to_vec();
            Ok(if self.handled {
                Flow::Handled
            } else {
                Flow::Passthrough
            })
        }
    }

    fn get_op(target: &str) -> Operation {
        Operation::new(xri_get(), target)
    }

    #[test]
    fn find_higher_prefers_longest_prefix() {
        let mut map = ContributorMap::new();
        map.add(seg("=x"), Recording::new("short", false));
        map.add(seg("=x*y"), Recording::new("mid", false));
        map.add(seg("=x*y*z"), Recording::new("long", false));

        assert_eq!(map.find_higher(&seg("=x*y*z*w")), Some(&seg("=x*y*z")));
        assert_eq!(map.find_higher(&seg("=x*y")), Some(&seg("=x*y")));
        assert_eq!(map.find_higher(&seg("=other")), None);
    }

    #[test]
    fn find_lower_requires_strict_extension() {
        let mut map = ContributorMap::new();
        map.add(seg("=x*y"), Recording::new("mid", false));

        assert_eq!(map.find_lower(&seg("=x")), Some(&seg("=x*y")));
        assert_eq!(map.find_lower(&seg("=x*y")), None);
    }

    #[test]
    fn find_matching_is_exact() {
        let mut map = ContributorMap::new();
        map.add(seg("=x*y"), Recording::new("mid", false));

        assert_eq!(map.find_matching(&seg("=x*y")), Some(&seg("=x*y")));
        assert_eq!(map.find_matching(&seg("=x")), None);
    }

    #[tokio::test]
    async fn no_fallback_to_shorter_prefixes() {
        let mut map = ContributorMap::new();
        let long = Recording::new("long", false);
        let short = Recording::new("short", false);
        map.add(seg("=x*y*z"), long.clone());
        map.add(seg("=x"), short.clone());

        let target = seg("=x*y*z*w");
        let flow = map
            .execute_address(
                &[],
                &target,
                &target,
                &get_op("=x*y*z*w"),
                &mut MessageResult::new(),
                &mut ExecutionContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(flow, Flow::Passthrough);
        assert_eq!(long.calls(), 1);
        assert_eq!(short.calls(), 0);
    }

    #[tokio::test]
    async fn remainder_and_trail_are_computed() {
        let mut map = ContributorMap::new();
        let contributor = Recording::new("c", true);
        map.add(seg("=x*y"), contributor.clone());

        let target = seg("=x*y*z");
        let flow = map
            .execute_address(
                &[],
                &target,
                &target,
                &get_op("=x*y*z"),
                &mut MessageResult::new(),
                &mut ExecutionContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(flow, Flow::Handled);
        assert_eq!(
            contributor.seen_relative.lock().unwrap().clone(),
            Some(seg("*z"))
        );
        assert_eq!(contributor.seen_trail.lock().unwrap().clone(), vec![seg("=x*y")]);
    }

    #[tokio::test]
    async fn fully_consumed_target_leaves_root_remainder() {
        let mut map = ContributorMap::new();
        let contributor = Recording::new("c", true);
        map.add(seg("=x*y"), contributor.clone());

        let target = seg("=x*y");
        map.execute_address(
            &[],
            &target,
            &target,
            &get_op("=x*y"),
            &mut MessageResult::new(),
            &mut ExecutionContext::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            contributor.seen_relative.lock().unwrap().clone(),
            Some(Segment::root())
        );
    }

    #[tokio::test]
    async fn first_handled_contributor_stops_the_list() {
        let mut map = ContributorMap::new();
        let first = Recording::new("first", true);
        let second = Recording::new("second", true);
        map.add(seg("=x"), first.clone());
        map.add(seg("=x"), second.clone());

        let target = seg("=x*y");
        let flow = map
            .execute_address(
                &[],
                &target,
                &target,
                &get_op("=x*y"),
                &mut MessageResult::new(),
                &mut ExecutionContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(flow, Flow::Handled);
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn contributor_stack_is_balanced() {
        let mut map = ContributorMap::new();
        map.add(seg("=x"), Recording::new("c", false));

        let mut ctx = ExecutionContext::new();
        let target = seg("=x*y");
        map.execute_address(
            &[],
            &target,
            &target,
            &get_op("=x*y"),
            &mut MessageResult::new(),
            &mut ctx,
        )
        .await
        .unwrap();

        assert_eq!(ctx.contributor_depth(), 0);
    }

    #[tokio::test]
    async fn statement_dispatch_keys_on_subject() {
        struct StatementSeen {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl Contributor for StatementSeen {
            fn name(&self) -> &str {
                "stmt"
            }

            async fn execute_on_statement(
                &self,
                _trail: &[Segment],
                relative: &Statement,
                _absolute: &Statement,
                _operation: &Operation,
                _result: &mut MessageResult,
                _ctx: &mut ExecutionContext,
            ) -> Result<Flow, MessagingError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                assert_eq!(relative.subject(), &seg("+friend"));
                Ok(Flow::Handled)
            }
        }

        let mut map = ContributorMap::new();
        let contributor = Arc::new(StatementSeen {
            calls: AtomicUsize::new(0),
        });
        map.add(seg("=alice"), contributor.clone());

        let statement: Statement = "=alice+friend/+knows/=carol".parse().unwrap();
        let flow = map
            .execute_statement(
                &[],
                &statement,
                &statement,
                &get_op("=alice+friend/+knows/=carol"),
                &mut MessageResult::new(),
                &mut ExecutionContext::new(),
            )
            .await
            .unwrap();

        assert_eq!(flow, Flow::Handled);
        assert_eq!(contributor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declarative_registration_uses_claimed_addresses() {
        struct Claiming;

        #[async_trait]
        impl Contributor for Claiming {
            fn name(&self) -> &str {
                "claiming"
            }

            fn addresses(&self) -> Vec<Segment> {
                vec![seg("=a"), seg("=b")]
            }
        }

        let mut map = ContributorMap::new();
        map.add_claimed(Arc::new(Claiming));
        assert_eq!(map.find_higher(&seg("=a+x")), Some(&seg("=a")));
        assert_eq!(map.find_higher(&seg("=b+x")), Some(&seg("=b")));
    }
}
