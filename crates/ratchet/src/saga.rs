//! The saga task model.
//!
//! A saga is an explicit resumable state machine. The runtime feeds it a
//! [`Resume`] value (the answer to whatever it yielded last) and receives
//! either the next effect descriptor to perform ([`Step::Yield`]) or
//! [`Step::Finish`]. Effects are plain data: a saga never performs IO
//! itself, it only describes the IO it wants. That keeps sagas
//! deterministic and lets a test driver feed canned answers one descriptor
//! at a time.

use crate::action::{Action, ActionType};
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;

/// Boxed saga task.
pub type BoxSaga = Box<dyn Saga>;

/// Boxed asynchronous effect invocation, as carried by [`SagaOp::Call`].
pub type EffectFuture = BoxFuture<'static, anyhow::Result<Value>>;

/// Effect descriptors a saga may yield.
pub enum SagaOp {
    /// Read the current store state.
    Select,
    /// Dispatch an action.
    Put(Action),
    /// Run an asynchronous effect and suspend until it settles.
    Call(EffectFuture),
    /// Suspend until an action with the given tag is dispatched.
    Take(ActionType),
    /// Start a child saga without waiting for it to finish.
    Fork(BoxSaga),
}

impl fmt::Debug for SagaOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SagaOp::Select => f.write_str("Select"),
            SagaOp::Put(action) => f.debug_tuple("Put").field(action).finish(),
            SagaOp::Call(_) => f.write_str("Call(..)"),
            SagaOp::Take(kind) => f.debug_tuple("Take").field(kind).finish(),
            SagaOp::Fork(_) => f.write_str("Fork(..)"),
        }
    }
}

/// Value fed into [`Saga::resume`]: the answer to the previously yielded op,
/// or [`Resume::Start`] for the first step.
#[derive(Debug, Clone)]
pub enum Resume {
    Start,
    /// Answer to [`SagaOp::Select`].
    State(Value),
    /// Answer to [`SagaOp::Put`] and [`SagaOp::Fork`].
    Acked,
    /// Answer to [`SagaOp::Take`].
    Taken(Action),
    /// Successful answer to [`SagaOp::Call`].
    Resolved(Value),
    /// Failed answer to [`SagaOp::Call`]; the error is already rendered.
    Rejected(String),
}

/// Outcome of one [`Saga::resume`] step.
#[derive(Debug)]
pub enum Step {
    Yield(SagaOp),
    Finish,
}

/// A cooperative task driven by the runtime.
///
/// The resume protocol is strict: each [`Resume`] variant answers the op
/// variant documented on it. The runtime upholds the protocol; a mismatch
/// is a driver bug and sagas are free to panic on it.
pub trait Saga: Send {
    /// Advance the task. `input` answers the previously yielded op.
    fn resume(&mut self, input: Resume) -> Step;
}

impl Saga for Box<dyn Saga> {
    fn resume(&mut self, input: Resume) -> Step {
        (**self).resume(input)
    }
}
