//! Testing utilities for ratchet sagas, reducers and effects.
//!
//! Three drivers cover the usual shapes:
//! - [`run_saga_with_actions`] runs a saga against a canned state getter,
//!   feeds it a stream of actions, and returns what it dispatched.
//! - [`record_saga_ops`] steps a saga with canned resume values and
//!   collects the ops it yields, one descriptor at a time.
//! - [`ReducerHarness`] folds actions step by step for sequence
//!   assertions.
//!
//! [`ScriptedEffect`] is the matching effect double: it records calls and
//! answers from a queue of canned outcomes.

use anyhow::anyhow;
use async_trait::async_trait;
use ratchet_core::{
    Action, BoxSaga, Effect, FnStore, Reducer, Resume, Saga, SagaOp, SagaRuntime, Step,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Run `saga` against a read-only store, dispatch `actions` into it, then
/// drain every ready effect completion and return the actions the saga
/// dispatched, in order.
///
/// All actions are fed before completions are drained, mirroring a burst of
/// dispatches racing still-running effects. Effects parked on futures that
/// never become ready are simply left parked.
pub fn run_saga_with_actions(
    saga: BoxSaga,
    state: impl Fn() -> Value + Send + 'static,
    actions: impl IntoIterator<Item = Action>,
) -> Vec<Action> {
    let mut runtime = SagaRuntime::new(FnStore::new(state));
    runtime.spawn(saga);
    for action in actions {
        runtime.dispatch(action);
    }
    runtime.settle();
    runtime.emitted().cloned().collect()
}

/// Drive a saga with canned resume values, collecting every yielded op.
///
/// The first step is always fed [`Resume::Start`]; `answers` then answer
/// the yielded ops in order. Recording stops when the saga finishes or the
/// answers run out; long-lived sagas (an orchestrator loops on `Take`
/// forever) are recorded up to exactly as far as the canned script reaches.
pub fn record_saga_ops(mut saga: impl Saga, answers: impl IntoIterator<Item = Resume>) -> Vec<SagaOp> {
    let mut ops = Vec::new();
    let mut answers = answers.into_iter();
    let mut input = Resume::Start;
    loop {
        match saga.resume(input) {
            Step::Yield(op) => {
                ops.push(op);
                match answers.next() {
                    Some(answer) => input = answer,
                    None => return ops,
                }
            }
            Step::Finish => return ops,
        }
    }
}

/// Step-wise reducer driver: fold one action at a time and look at the
/// state after each step.
pub struct ReducerHarness<R: Reducer> {
    reducer: R,
    state: Option<R::State>,
}

impl<R: Reducer> ReducerHarness<R> {
    pub fn new(reducer: R) -> Self {
        Self {
            reducer,
            state: None,
        }
    }

    /// Seed the harness with a non-initial state.
    pub fn with_state(reducer: R, state: R::State) -> Self {
        Self {
            reducer,
            state: Some(state),
        }
    }

    /// Fold one action and return the state after it.
    pub fn step(&mut self, action: &Action) -> &R::State {
        let next = self.reducer.reduce(self.state.take(), action);
        self.state.insert(next)
    }

    pub fn state(&self) -> Option<&R::State> {
        self.state.as_ref()
    }
}

/// One canned answer of a [`ScriptedEffect`].
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Resolve(Value),
    Reject(String),
    /// Park the call forever.
    Never,
}

/// Recorded arguments of one [`ScriptedEffect`] call.
#[derive(Debug, Clone)]
pub struct EffectCall {
    pub payload: Option<Value>,
    pub state: Value,
    pub trigger: Action,
}

/// Effect double: records every call and answers from a queue of canned
/// outcomes, falling back to `Resolve(Value::Null)` when the queue is
/// empty.
#[derive(Clone, Default)]
pub struct ScriptedEffect {
    calls: Arc<Mutex<Vec<EffectCall>>>,
    outcomes: Arc<Mutex<VecDeque<ScriptedOutcome>>>,
}

impl ScriptedEffect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolves_once(self, value: Value) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(ScriptedOutcome::Resolve(value));
        self
    }

    pub fn rejects_once(self, message: impl Into<String>) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(ScriptedOutcome::Reject(message.into()));
        self
    }

    pub fn hangs_once(self) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(ScriptedOutcome::Never);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<EffectCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Effect for ScriptedEffect {
    async fn run(&self, payload: Option<Value>, state: Value, trigger: Action) -> anyhow::Result<Value> {
        self.calls.lock().unwrap().push(EffectCall {
            payload,
            state,
            trigger,
        });
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ScriptedOutcome::Resolve(Value::Null));
        match outcome {
            ScriptedOutcome::Resolve(value) => Ok(value),
            ScriptedOutcome::Reject(message) => Err(anyhow!(message)),
            ScriptedOutcome::Never => {
                futures::future::pending::<()>().await;
                unreachable!("pending future resolved")
            }
        }
    }
}
