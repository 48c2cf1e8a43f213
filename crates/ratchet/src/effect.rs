//! The user-supplied effect seam.

use crate::action::Action;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Shared, type-erased effect handle.
pub type SharedEffect = Arc<dyn Effect>;

/// An asynchronous effect bound to one async action type.
///
/// The orchestrator calls `run` once per invocation with the trigger
/// payload, a snapshot of the store taken when the invocation started, and
/// the trigger action itself. A returned `Err` becomes a `FAILURE` action;
/// it is never re-thrown at the orchestrator.
///
/// Deadlines are the effect's own business: nothing in the runtime imposes
/// a timeout on `run`.
#[async_trait]
pub trait Effect: Send + Sync {
    async fn run(&self, payload: Option<Value>, state: Value, trigger: Action) -> Result<Value>;
}

/// Any `Fn(payload, state, trigger) -> impl Future<Output = Result<Value>>`
/// closure is an effect.
#[async_trait]
impl<F, Fut> Effect for F
where
    F: Fn(Option<Value>, Value, Action) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn run(&self, payload: Option<Value>, state: Value, trigger: Action) -> Result<Value> {
        (self)(payload, state, trigger).await
    }
}
