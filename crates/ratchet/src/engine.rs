//! Long-running engine: the interpreter wrapped in a tokio loop.
//!
//! The engine owns a [`SagaRuntime`] over a [`MountedStore`] and serializes
//! all outside traffic through one message channel: dispatches, state
//! queries, stop. Effect completions are folded into the same loop, so the
//! single-writer guarantee of the runtime extends to the whole process.

use crate::action::Action;
use crate::duck::AsyncActionDuck;
use crate::error::EngineError;
use crate::runtime::SagaRuntime;
use crate::saga::{BoxSaga, Saga};
use crate::store::MountedStore;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

enum EngineMsg {
    Dispatch(Action),
    Select(oneshot::Sender<Value>),
    Stop,
}

/// Builder wiring sagas and mounted reducers into an engine.
#[derive(Default)]
pub struct EngineBuilder {
    store: MountedStore,
    sagas: Vec<BoxSaga>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            store: MountedStore::new(),
            sagas: Vec::new(),
        }
    }

    /// Run a saga on the engine.
    pub fn with_saga(mut self, saga: impl Saga + 'static) -> Self {
        self.sagas.push(Box::new(saga));
        self
    }

    /// Mount a duck: its reducer at its namespace path, plus its
    /// orchestrator saga.
    pub fn with_duck(mut self, duck: &AsyncActionDuck) -> Self {
        self.store.mount(duck.path(), duck.reducer());
        self.sagas.push(duck.saga());
        self
    }

    pub fn build(self) -> (Engine, EngineHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut runtime = SagaRuntime::new(self.store);
        for saga in self.sagas {
            runtime.spawn(saga);
        }
        (Engine { runtime, rx }, EngineHandle { tx })
    }
}

/// Cloneable handle for talking to a running [`Engine`].
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineMsg>,
}

impl EngineHandle {
    /// Dispatch an action into the engine.
    pub fn dispatch(&self, action: Action) -> Result<(), EngineError> {
        self.tx
            .send(EngineMsg::Dispatch(action))
            .map_err(|_| EngineError::Stopped)
    }

    /// Snapshot of the engine's store state.
    pub async fn select(&self) -> Result<Value, EngineError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(EngineMsg::Select(reply))
            .map_err(|_| EngineError::Stopped)?;
        response.await.map_err(|_| EngineError::QueryDropped)
    }

    /// Ask the engine loop to exit. Idempotent.
    pub fn stop(&self) {
        let _ = self.tx.send(EngineMsg::Stop);
    }
}

/// The engine loop. Runs until [`EngineHandle::stop`] is called or every
/// handle is dropped.
pub struct Engine {
    runtime: SagaRuntime,
    rx: mpsc::UnboundedReceiver<EngineMsg>,
}

impl Engine {
    pub async fn run(mut self) {
        tracing::info!("engine started");
        loop {
            tokio::select! {
                biased;
                message = self.rx.recv() => match message {
                    Some(EngineMsg::Dispatch(action)) => self.runtime.dispatch(action),
                    Some(EngineMsg::Select(reply)) => {
                        let _ = reply.send(self.runtime.state());
                    }
                    Some(EngineMsg::Stop) | None => break,
                },
                Some((id, outcome)) = self.runtime.next_call(),
                    if self.runtime.has_pending_calls() =>
                {
                    self.runtime.complete_call(id, outcome);
                }
            }
        }
        tracing::info!("engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duck::DuckFactory;
    use crate::effect::SharedEffect;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn lookup_effect() -> SharedEffect {
        Arc::new(|payload: Option<Value>, _: Value, _: Action| async move {
            match payload.and_then(|p| p.as_str().map(str::to_owned)) {
                Some(term) => Ok(json!({ "echo": term })),
                None => Err(anyhow::anyhow!("no search term")),
            }
        })
    }

    #[tokio::test]
    async fn engine_runs_a_duck_end_to_end() {
        let factory = DuckFactory::new("app.search");
        let duck = AsyncActionDuck::new(&factory, "app.search/QUERY", lookup_effect());
        let (engine, handle) = EngineBuilder::new().with_duck(&duck).build();
        let engine = tokio::spawn(engine.run());

        handle
            .dispatch(Action::new("app.search/QUERY").with_payload(json!("rust")))
            .unwrap();
        tokio::task::yield_now().await;

        // the effect is immediate, one settle round is enough
        let mut slice = duck.slice(&handle.select().await.unwrap());
        for _ in 0..10 {
            if !slice.is_pending {
                break;
            }
            tokio::task::yield_now().await;
            slice = duck.slice(&handle.select().await.unwrap());
        }

        assert_eq!(duck.result(&slice), Some(&json!({ "echo": "rust" })));
        assert!(!slice.is_pending);
        assert_eq!(slice.error, None);

        handle.stop();
        engine.await.unwrap();
    }

    #[tokio::test]
    async fn failures_land_in_duck_state() {
        let factory = DuckFactory::new("app.search");
        let duck = AsyncActionDuck::new(&factory, "app.search/QUERY", lookup_effect());
        let (engine, handle) = EngineBuilder::new().with_duck(&duck).build();
        let engine = tokio::spawn(engine.run());

        // no payload: the effect rejects
        handle.dispatch(Action::new("app.search/QUERY")).unwrap();

        let mut slice = duck.slice(&handle.select().await.unwrap());
        for _ in 0..10 {
            if !slice.is_pending {
                break;
            }
            tokio::task::yield_now().await;
            slice = duck.slice(&handle.select().await.unwrap());
        }

        assert!(!slice.is_pending);
        assert_eq!(slice.error, Some(json!("no search term")));
        assert_eq!(duck.result(&slice), None);

        handle.stop();
        engine.await.unwrap();
    }

    #[tokio::test]
    async fn dispatch_after_stop_reports_stopped() {
        let (engine, handle) = EngineBuilder::new().build();
        let engine = tokio::spawn(engine.run());
        handle.stop();
        engine.await.unwrap();

        assert!(matches!(
            handle.dispatch(Action::new("ANY")),
            Err(EngineError::Stopped)
        ));
    }
}
