//! Reusable "duck" assembly: async type + orchestrator + reducer +
//! selectors, hung off one namespace.
//!
//! Purely compositional: everything here delegates to the descriptor, the
//! orchestrator and the reducer family; no new lifecycle behavior.

use crate::action::ActionType;
use crate::async_type::AsyncType;
use crate::effect::SharedEffect;
use crate::orchestrator::AsyncActionSaga;
use crate::reducer::{AsyncResult, AsyncStatus, MergeFn, Reducer, ResultReducer};
use crate::saga::BoxSaga;
use crate::store::value_at;
use serde_json::Value;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Shared context handed to duck constructors: owns the namespace every
/// derived tag and state path hangs off.
#[derive(Debug, Clone)]
pub struct DuckFactory {
    namespace: String,
}

impl DuckFactory {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Namespaced plain action tag.
    pub fn action_type(&self, name: &str) -> ActionType {
        ActionType::new(format!("{}/{}", self.namespace, name))
    }

    /// The async triad derived from the namespace itself.
    pub fn async_type(&self) -> AsyncType {
        AsyncType::define(&self.namespace)
    }
}

/// A self-contained async-action unit: the triad, a trigger-bound
/// orchestrator, the result reducer, and state selectors.
pub struct AsyncActionDuck {
    ty: AsyncType,
    trigger_kind: ActionType,
    effect: SharedEffect,
    reducer: ResultReducer,
    path: String,
    generation: Arc<AtomicU64>,
}

impl AsyncActionDuck {
    pub fn new(
        factory: &DuckFactory,
        trigger_kind: impl Into<ActionType>,
        effect: SharedEffect,
    ) -> Self {
        let ty = factory.async_type();
        Self {
            reducer: ResultReducer::new(ty.clone()),
            ty,
            trigger_kind: trigger_kind.into(),
            effect,
            path: factory.namespace().to_owned(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Override the merge strategy applied to the result on `SUCCESS`.
    pub fn with_merge(mut self, merge: MergeFn) -> Self {
        self.reducer = ResultReducer::with_merge(self.ty.clone(), merge);
        self
    }

    pub fn async_type(&self) -> &AsyncType {
        &self.ty
    }

    /// Store path this duck's state mounts at.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A fresh orchestrator saga. Every saga built from one duck shares the
    /// same generation counter.
    pub fn saga(&self) -> BoxSaga {
        Box::new(AsyncActionSaga::with_generation(
            self.trigger_kind.clone(),
            self.ty.clone(),
            Arc::clone(&self.effect),
            Arc::clone(&self.generation),
        ))
    }

    pub fn reducer(&self) -> ResultReducer {
        self.reducer.clone()
    }

    /// Project the duck's slice into the last known-good result.
    pub fn result<'a>(&self, slice: &'a AsyncResult) -> Option<&'a Value> {
        slice.result.as_ref()
    }

    /// Project the duck's slice into its `{is_pending, error}` view.
    pub fn status(&self, slice: &AsyncResult) -> AsyncStatus {
        slice.status()
    }

    /// Pull this duck's slice out of a whole-store snapshot, falling back
    /// to the initial state when the slice is absent.
    pub fn slice(&self, root: &Value) -> AsyncResult {
        value_at(root, &self.path)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_else(|| self.reducer.initial())
    }
}
