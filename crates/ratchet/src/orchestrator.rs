//! Take-latest orchestration of one async action type.
//!
//! One orchestrator consumes trigger actions forever. Each trigger starts a
//! fresh invocation:
//!
//! ```text
//! Take(trigger) ──► bump generation ──► Fork(invocation)
//!                                            │
//!                   Select ◄────────────────┘
//!                     │
//!                   Put(PENDING {trigger, correlation_id})
//!                     │
//!                   Call(effect.run(payload, state, trigger))
//!                     │
//!          still the live generation? ──► Put(SUCCESS | FAILURE)
//!                     └─ superseded ─────► nothing
//! ```
//!
//! Supersede means emission suppression only: a stale invocation's effect
//! keeps running (its cost is the caller's), but its terminal action is
//! discarded. PENDING is never suppressed, so pending actions always appear
//! in trigger-arrival order.

use crate::action::{Action, ActionType, Meta};
use crate::async_type::AsyncType;
use crate::effect::SharedEffect;
use crate::saga::{Resume, Saga, SagaOp, Step};
use serde_json::Value;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Take-latest orchestrator bound to one trigger tag and one async type.
pub struct AsyncActionSaga {
    trigger_kind: ActionType,
    ty: AsyncType,
    effect: SharedEffect,
    generation: Arc<AtomicU64>,
}

impl AsyncActionSaga {
    pub fn new(trigger_kind: impl Into<ActionType>, ty: AsyncType, effect: SharedEffect) -> Self {
        Self::with_generation(trigger_kind, ty, effect, Arc::new(AtomicU64::new(0)))
    }

    /// Ducks hand every orchestrator they build the same counter, so
    /// rebuilding the saga never resets the supersede bookkeeping.
    pub(crate) fn with_generation(
        trigger_kind: impl Into<ActionType>,
        ty: AsyncType,
        effect: SharedEffect,
        generation: Arc<AtomicU64>,
    ) -> Self {
        Self {
            trigger_kind: trigger_kind.into(),
            ty,
            effect,
            generation,
        }
    }

    pub fn async_type(&self) -> &AsyncType {
        &self.ty
    }
}

impl Saga for AsyncActionSaga {
    fn resume(&mut self, input: Resume) -> Step {
        match input {
            // fresh start, or an invocation was just forked: go back to taking
            Resume::Start | Resume::Acked => Step::Yield(SagaOp::Take(self.trigger_kind.clone())),
            Resume::Taken(trigger) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(
                    trigger = %self.trigger_kind,
                    generation,
                    "starting invocation"
                );
                Step::Yield(SagaOp::Fork(Box::new(Invocation::new(
                    self.ty.clone(),
                    self.effect.clone(),
                    trigger,
                    Arc::clone(&self.generation),
                    generation,
                ))))
            }
            input => unreachable!("orchestrator resumed out of protocol: {input:?}"),
        }
    }
}

/// One invocation lifecycle: PENDING, the effect call, then a terminal
/// action if this invocation is still the live generation.
struct Invocation {
    ty: AsyncType,
    effect: SharedEffect,
    trigger: Action,
    meta: Meta,
    live: Arc<AtomicU64>,
    generation: u64,
    state: InvocationState,
}

enum InvocationState {
    Init,
    Selecting,
    Announcing { snapshot: Value },
    Running,
    Finishing,
}

impl Invocation {
    fn new(
        ty: AsyncType,
        effect: SharedEffect,
        trigger: Action,
        live: Arc<AtomicU64>,
        generation: u64,
    ) -> Self {
        let meta = Meta::for_trigger(trigger.clone());
        Self {
            ty,
            effect,
            trigger,
            meta,
            live,
            generation,
            state: InvocationState::Init,
        }
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst) == self.generation
    }
}

impl Saga for Invocation {
    fn resume(&mut self, input: Resume) -> Step {
        let state = mem::replace(&mut self.state, InvocationState::Finishing);
        match (state, input) {
            (InvocationState::Init, Resume::Start) => {
                self.state = InvocationState::Selecting;
                Step::Yield(SagaOp::Select)
            }
            (InvocationState::Selecting, Resume::State(snapshot)) => {
                self.state = InvocationState::Announcing { snapshot };
                Step::Yield(SagaOp::Put(
                    Action::new(self.ty.pending.clone()).with_meta(self.meta.clone()),
                ))
            }
            (InvocationState::Announcing { snapshot }, Resume::Acked) => {
                self.state = InvocationState::Running;
                let effect = Arc::clone(&self.effect);
                let payload = self.trigger.payload.clone();
                let trigger = self.trigger.clone();
                Step::Yield(SagaOp::Call(Box::pin(async move {
                    effect.run(payload, snapshot, trigger).await
                })))
            }
            (InvocationState::Running, Resume::Resolved(value)) => {
                if !self.is_live() {
                    tracing::debug!(
                        correlation_id = %self.meta.correlation_id,
                        "suppressing superseded success"
                    );
                    return Step::Finish;
                }
                self.state = InvocationState::Finishing;
                Step::Yield(SagaOp::Put(
                    Action::new(self.ty.success.clone())
                        .with_payload(value)
                        .with_meta(self.meta.clone()),
                ))
            }
            (InvocationState::Running, Resume::Rejected(message)) => {
                if !self.is_live() {
                    // not reported through the action stream; leave a trace
                    // for whoever pays for the superseded call
                    tracing::warn!(
                        correlation_id = %self.meta.correlation_id,
                        error = %message,
                        "superseded invocation failed"
                    );
                    return Step::Finish;
                }
                self.state = InvocationState::Finishing;
                Step::Yield(SagaOp::Put(
                    Action::new(self.ty.failure.clone())
                        .with_payload(Value::String(message))
                        .with_meta(self.meta.clone())
                        .into_error(),
                ))
            }
            (InvocationState::Finishing, Resume::Acked) => Step::Finish,
            (_, input) => unreachable!("invocation resumed out of protocol: {input:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    fn effect_stub() -> SharedEffect {
        Arc::new(|_: Option<Value>, _: Value, _: Action| async move {
            Ok::<_, anyhow::Error>(Value::Null)
        })
    }

    fn invocation(generation: u64, live: u64) -> Invocation {
        Invocation::new(
            AsyncType::define("TEST"),
            effect_stub(),
            Action::new("TEST_TRIGGER").with_payload(json!("payload")),
            Arc::new(AtomicU64::new(live)),
            generation,
        )
    }

    /// Drives an invocation through select and pending, up to the effect
    /// call, and returns it in the `Running` state.
    fn run_to_call(invocation: &mut Invocation) -> Vec<Step> {
        let select = invocation.resume(Resume::Start);
        assert!(matches!(select, Step::Yield(SagaOp::Select)));
        let pending = invocation.resume(Resume::State(json!({ "dummy": "state" })));
        let call = invocation.resume(Resume::Acked);
        assert!(matches!(call, Step::Yield(SagaOp::Call(_))));
        vec![select, pending, call]
    }

    #[test]
    fn lifecycle_on_success() {
        let mut inv = invocation(1, 1);
        let steps = run_to_call(&mut inv);

        let Step::Yield(SagaOp::Put(pending)) = &steps[1] else {
            panic!("expected pending dispatch, got {:?}", steps[1]);
        };
        assert_eq!(pending.kind.as_str(), "TEST_PENDING");
        let meta = pending.meta.clone().expect("pending carries meta");
        assert_eq!(meta.trigger.kind.as_str(), "TEST_TRIGGER");
        assert_eq!(meta.trigger.payload, Some(json!("payload")));

        let Step::Yield(SagaOp::Put(success)) = inv.resume(Resume::Resolved(json!("result")))
        else {
            panic!("expected success dispatch");
        };
        assert_eq!(success.kind.as_str(), "TEST_SUCCESS");
        assert_eq!(success.payload, Some(json!("result")));
        assert!(!success.error);
        // same meta on every lifecycle action of the invocation
        assert_eq!(success.meta, Some(meta));

        assert!(matches!(inv.resume(Resume::Acked), Step::Finish));
    }

    #[test]
    fn lifecycle_on_failure() {
        let mut inv = invocation(1, 1);
        run_to_call(&mut inv);

        let Step::Yield(SagaOp::Put(failure)) =
            inv.resume(Resume::Rejected("it broke".to_owned()))
        else {
            panic!("expected failure dispatch");
        };
        assert_eq!(failure.kind.as_str(), "TEST_FAILURE");
        assert_eq!(failure.payload, Some(json!("it broke")));
        assert!(failure.error);
        assert!(matches!(inv.resume(Resume::Acked), Step::Finish));
    }

    #[test]
    fn superseded_terminal_actions_are_suppressed() {
        // live counter has moved past this invocation's generation
        let mut stale = invocation(1, 2);
        run_to_call(&mut stale);
        assert!(matches!(stale.resume(Resume::Resolved(json!("late"))), Step::Finish));

        let mut stale = invocation(1, 2);
        run_to_call(&mut stale);
        assert!(matches!(
            stale.resume(Resume::Rejected("late error".to_owned())),
            Step::Finish
        ));
    }

    #[test]
    fn orchestrator_takes_forks_and_takes_again() {
        let effect: SharedEffect =
            Arc::new(|_: Option<Value>, _: Value, _: Action| async move {
                Err::<Value, _>(anyhow!("unused"))
            });
        let mut saga = AsyncActionSaga::new("GO", AsyncType::define("TEST"), effect);

        assert!(matches!(
            saga.resume(Resume::Start),
            Step::Yield(SagaOp::Take(kind)) if kind.as_str() == "GO"
        ));
        assert!(matches!(
            saga.resume(Resume::Taken(Action::new("GO"))),
            Step::Yield(SagaOp::Fork(_))
        ));
        assert!(matches!(
            saga.resume(Resume::Acked),
            Step::Yield(SagaOp::Take(_))
        ));
    }

    #[test]
    fn each_trigger_bumps_the_generation() {
        let generation = Arc::new(AtomicU64::new(0));
        let mut saga = AsyncActionSaga::with_generation(
            "GO",
            AsyncType::define("TEST"),
            effect_stub(),
            Arc::clone(&generation),
        );

        saga.resume(Resume::Start);
        saga.resume(Resume::Taken(Action::new("GO")));
        saga.resume(Resume::Acked);
        saga.resume(Resume::Taken(Action::new("GO")));
        assert_eq!(generation.load(Ordering::SeqCst), 2);
    }
}
