//! Single-threaded cooperative interpreter for saga tasks.
//!
//! The runtime owns every running saga and the store. It resumes one task
//! at a time, so store reads and dispatches are fully serialized: there are
//! no shared-memory races to reason about, only the interleaving of
//! suspension points (`Take` and `Call`).
//!
//! Drive rules:
//!
//! - `Select` is answered inline with a store snapshot.
//! - `Put` applies the action to the store, records it, and wakes every
//!   task parked on a matching `Take`. Woken tasks run after the putter
//!   suspends; a take only observes actions dispatched while it was parked.
//! - `Fork` runs the child depth-first to its first suspension, then the
//!   parent resumes. Forking never waits for the child to finish.
//! - `Call` parks the task until its future settles. Ready completions are
//!   drained either non-blockingly ([`SagaRuntime::settle`]) or by awaiting
//!   ([`SagaRuntime::run_until_quiescent`]).

use crate::action::{Action, ActionType};
use crate::saga::{BoxSaga, Resume, SagaOp, Step};
use crate::store::StateStore;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::VecDeque;

type TaskId = usize;

/// Settled answer of one effect call, tagged with the parked task.
pub(crate) type CallOutcome = (TaskId, Result<Value, String>);

/// Where a dispatched action came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Injected from outside via [`SagaRuntime::dispatch`].
    External,
    /// Emitted by a saga through `Put`.
    Saga,
}

/// One dispatched action, in dispatch order.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub action: Action,
    pub origin: Origin,
    pub at: DateTime<Utc>,
}

struct Task {
    saga: BoxSaga,
    /// Tag this task is parked on, if suspended in a `Take`.
    waiting: Option<ActionType>,
}

/// The saga interpreter.
pub struct SagaRuntime {
    tasks: Vec<Option<Task>>,
    run_queue: VecDeque<(TaskId, Resume)>,
    calls: FuturesUnordered<BoxFuture<'static, CallOutcome>>,
    store: Box<dyn StateStore>,
    log: Vec<DispatchRecord>,
    tap: Option<Box<dyn FnMut(&Action) + Send>>,
}

impl SagaRuntime {
    pub fn new(store: impl StateStore + 'static) -> Self {
        Self {
            tasks: Vec::new(),
            run_queue: VecDeque::new(),
            calls: FuturesUnordered::new(),
            store: Box::new(store),
            log: Vec::new(),
            tap: None,
        }
    }

    /// Observe every dispatched action, external and saga-emitted alike.
    pub fn with_tap(mut self, tap: impl FnMut(&Action) + Send + 'static) -> Self {
        self.tap = Some(Box::new(tap));
        self
    }

    /// Start a saga and drive it to its first suspension.
    pub fn spawn(&mut self, saga: BoxSaga) {
        let id = self.alloc(Task { saga, waiting: None });
        self.drive(id, Resume::Start);
        self.pump();
    }

    /// Dispatch an external action into the runtime.
    pub fn dispatch(&mut self, action: Action) {
        self.deliver(action, Origin::External);
        self.pump();
    }

    /// Current store snapshot.
    pub fn state(&self) -> Value {
        self.store.select()
    }

    /// Actions emitted by sagas, in dispatch order.
    pub fn emitted(&self) -> impl Iterator<Item = &Action> {
        self.log
            .iter()
            .filter(|record| record.origin == Origin::Saga)
            .map(|record| &record.action)
    }

    /// Every dispatch, with origin and timestamp.
    pub fn records(&self) -> &[DispatchRecord] {
        &self.log
    }

    /// True while any effect call is still outstanding.
    pub fn has_pending_calls(&self) -> bool {
        !self.calls.is_empty()
    }

    /// Resolve effect calls that are already ready, without blocking.
    /// Returns how many calls settled.
    pub fn settle(&mut self) -> usize {
        let mut settled = 0;
        loop {
            self.pump();
            match self.calls.next().now_or_never() {
                Some(Some((id, outcome))) => {
                    settled += 1;
                    self.complete_call(id, outcome);
                }
                // nothing ready, or no calls left at all
                Some(None) | None => break,
            }
        }
        settled
    }

    /// Drive until every task is parked on a `Take` and no effect call
    /// remains outstanding.
    pub async fn run_until_quiescent(&mut self) {
        loop {
            self.pump();
            match self.calls.next().await {
                Some((id, outcome)) => self.complete_call(id, outcome),
                None => break,
            }
        }
    }

    /// Next settled effect call; pending while none is ready.
    pub(crate) async fn next_call(&mut self) -> Option<CallOutcome> {
        self.calls.next().await
    }

    /// Feed a settled call back to its parked task.
    pub(crate) fn complete_call(&mut self, id: TaskId, outcome: Result<Value, String>) {
        let resume = match outcome {
            Ok(value) => Resume::Resolved(value),
            Err(message) => Resume::Rejected(message),
        };
        self.run_queue.push_back((id, resume));
        self.pump();
    }

    fn alloc(&mut self, task: Task) -> TaskId {
        match self.tasks.iter().position(Option::is_none) {
            Some(id) => {
                self.tasks[id] = Some(task);
                id
            }
            None => {
                self.tasks.push(Some(task));
                self.tasks.len() - 1
            }
        }
    }

    fn pump(&mut self) {
        while let Some((id, resume)) = self.run_queue.pop_front() {
            self.drive(id, resume);
        }
    }

    /// Apply an action to the store, record it, and wake matching takers.
    fn deliver(&mut self, action: Action, origin: Origin) {
        self.store.apply(&action);
        if let Some(tap) = &mut self.tap {
            tap(&action);
        }
        tracing::trace!(kind = %action.kind, ?origin, "action dispatched");

        let woken: SmallVec<[TaskId; 4]> = self
            .tasks
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| match slot {
                Some(task) if task.waiting.as_ref() == Some(&action.kind) => Some(id),
                _ => None,
            })
            .collect();
        for id in woken {
            if let Some(task) = self.tasks[id].as_mut() {
                task.waiting = None;
            }
            self.run_queue.push_back((id, Resume::Taken(action.clone())));
        }

        self.log.push(DispatchRecord {
            action,
            origin,
            at: Utc::now(),
        });
    }

    /// Run one task until it suspends or finishes. Fork children are driven
    /// depth-first before the parent resumes.
    fn drive(&mut self, id: TaskId, resume: Resume) {
        let Some(mut task) = self.tasks[id].take() else {
            return;
        };
        let mut input = resume;
        loop {
            match task.saga.resume(input) {
                Step::Finish => return,
                Step::Yield(op) => match op {
                    SagaOp::Select => {
                        input = Resume::State(self.store.select());
                    }
                    SagaOp::Put(action) => {
                        self.deliver(action, Origin::Saga);
                        input = Resume::Acked;
                    }
                    SagaOp::Take(kind) => {
                        task.waiting = Some(kind);
                        self.tasks[id] = Some(task);
                        return;
                    }
                    SagaOp::Call(future) => {
                        self.calls.push(
                            future
                                .map(move |result| {
                                    (id, result.map_err(|error| format!("{error:#}")))
                                })
                                .boxed(),
                        );
                        self.tasks[id] = Some(task);
                        return;
                    }
                    SagaOp::Fork(child) => {
                        let child_id = self.alloc(Task {
                            saga: child,
                            waiting: None,
                        });
                        self.drive(child_id, Resume::Start);
                        input = Resume::Acked;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FnStore;
    use serde_json::json;

    /// Selects, puts the selected state back out, and finishes.
    struct Echo;

    impl crate::saga::Saga for Echo {
        fn resume(&mut self, input: Resume) -> Step {
            match input {
                Resume::Start => Step::Yield(SagaOp::Select),
                Resume::State(state) => {
                    Step::Yield(SagaOp::Put(Action::new("ECHO").with_payload(state)))
                }
                Resume::Acked => Step::Finish,
                input => unreachable!("echo resumed out of protocol: {input:?}"),
            }
        }
    }

    #[test]
    fn select_is_answered_from_the_store() {
        let mut rt = SagaRuntime::new(FnStore::new(|| json!({ "dummy": "state" })));
        rt.spawn(Box::new(Echo));

        let emitted: Vec<_> = rt.emitted().cloned().collect();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].payload, Some(json!({ "dummy": "state" })));
    }

    #[test]
    fn external_and_saga_dispatches_are_told_apart() {
        let mut rt = SagaRuntime::new(FnStore::new(|| json!(null)));
        rt.spawn(Box::new(Echo));
        rt.dispatch(Action::new("EXTERNAL"));

        let origins: Vec<_> = rt.records().iter().map(|r| r.origin).collect();
        assert_eq!(origins, vec![Origin::Saga, Origin::External]);
    }

    #[test]
    fn tap_observes_every_dispatch() {
        use std::sync::{Arc, Mutex};
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut rt = SagaRuntime::new(FnStore::new(|| json!(null)))
            .with_tap(move |action| sink.lock().unwrap().push(action.kind.clone()));
        rt.spawn(Box::new(Echo));
        rt.dispatch(Action::new("EXTERNAL"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].as_str(), "ECHO");
        assert_eq!(seen[1].as_str(), "EXTERNAL");
    }
}
