//! General-purpose saga combinators.

use crate::action::{Action, ActionType};
use crate::saga::{BoxSaga, Resume, Saga, SagaOp, Step};

type TakeHandler = Box<dyn FnOnce(Action) -> BoxSaga + Send>;

/// Waits for exactly one action of `kind`, hands it to `handler`, then
/// completes.
///
/// The saga the handler returns is forked, not awaited: completion of
/// `take_one` is about the take cardinality, not the handler's internal
/// lifetime. Non-matching actions never reach the handler, and later
/// matching actions are ignored because the subscription is gone by then.
pub fn take_one(
    kind: impl Into<ActionType>,
    handler: impl FnOnce(Action) -> BoxSaga + Send + 'static,
) -> TakeOne {
    TakeOne {
        kind: kind.into(),
        handler: Some(Box::new(handler)),
        state: TakeOneState::Init,
    }
}

/// Saga returned by [`take_one`].
pub struct TakeOne {
    kind: ActionType,
    handler: Option<TakeHandler>,
    state: TakeOneState,
}

enum TakeOneState {
    Init,
    Waiting,
    Forking,
}

impl Saga for TakeOne {
    fn resume(&mut self, input: Resume) -> Step {
        match (&self.state, input) {
            (TakeOneState::Init, Resume::Start) => {
                self.state = TakeOneState::Waiting;
                Step::Yield(SagaOp::Take(self.kind.clone()))
            }
            (TakeOneState::Waiting, Resume::Taken(action)) => {
                let handler = self.handler.take().expect("take_one handler already used");
                self.state = TakeOneState::Forking;
                Step::Yield(SagaOp::Fork(handler(action)))
            }
            (TakeOneState::Forking, Resume::Acked) => Step::Finish,
            (_, input) => unreachable!("take_one resumed out of protocol: {input:?}"),
        }
    }
}

/// Starts every routine concurrently, in the reverse of list order (the
/// last-listed routine starts first), and completes once all have been
/// started.
///
/// This is a launcher, not a pipeline: forking never waits on a child, so a
/// routine parked forever cannot delay a sibling's dispatches.
pub fn compose_sagas(routines: Vec<BoxSaga>) -> ComposeSagas {
    ComposeSagas { remaining: routines }
}

/// Saga returned by [`compose_sagas`].
pub struct ComposeSagas {
    remaining: Vec<BoxSaga>,
}

impl Saga for ComposeSagas {
    fn resume(&mut self, input: Resume) -> Step {
        match input {
            Resume::Start | Resume::Acked => match self.remaining.pop() {
                Some(next) => Step::Yield(SagaOp::Fork(next)),
                None => Step::Finish,
            },
            input => unreachable!("compose_sagas resumed out of protocol: {input:?}"),
        }
    }
}
