//! # Ratchet
//!
//! Take-latest async action orchestration for a single-writer,
//! action-dispatching state store: sagas decide, effects run, and only the
//! freshest invocation commits.
//!
//! ## Core Concepts
//!
//! Ratchet separates **intent** from **outcome**:
//! - Trigger action = intent (start this async work)
//! - PENDING / SUCCESS / FAILURE lifecycle actions = outcomes, correlated
//!   back to their trigger
//!
//! The key principle: **every trigger announces itself, only the latest
//! trigger concludes**. A new trigger for the same async type supersedes
//! any still-running invocation; the stale effect keeps running, but its
//! terminal action is never dispatched.
//!
//! ## Architecture
//!
//! ```text
//! Edge (UI/API)
//!     │
//!     ▼ dispatch(trigger)
//! SagaRuntime ── Take ──► AsyncActionSaga
//!     │                        │ fork per trigger
//!     │                        ▼
//!     │                   Invocation ── Select ──► store snapshot
//!     │                        │
//!     │                        ├─► Put(PENDING {trigger, correlation_id})
//!     │                        │
//!     │                        ├─► Call(effect) ············ async
//!     │                        │
//!     │          latest? ──────┤
//!     │             yes        ▼
//!     ◄──────────── Put(SUCCESS | FAILURE)
//!     │
//!     ▼ apply()
//! Reducers (flag / status / result / split)
//!     │
//!     ▼ selectors
//! Consumers
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Every invocation is PENDING → (SUCCESS | FAILURE)** - never both,
//!    never out of that order
//! 2. **PENDING is never suppressed** - pendings appear in trigger order
//! 3. **Only the latest invocation concludes** - per-type generation
//!    counter, checked immediately before the terminal dispatch
//! 4. **Supersede does not abort** - a stale effect runs on at the
//!    caller's expense; only its emission is discarded
//! 5. **Reducers are pure** - unknown actions are a no-op, state flows one
//!    way
//! 6. **One writer** - every select and dispatch is serialized through the
//!    runtime
//!
//! ## Example
//!
//! ```ignore
//! use ratchet_core::{Action, AsyncActionDuck, DuckFactory, EngineBuilder};
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! let factory = DuckFactory::new("app.search");
//! let duck = AsyncActionDuck::new(
//!     &factory,
//!     "app.search/QUERY",
//!     Arc::new(|payload: Option<Value>, _state: Value, _trigger: Action| async move {
//!         let term = payload.and_then(|p| p.as_str().map(str::to_owned)).unwrap_or_default();
//!         Ok(json!({ "hits": [term] }))
//!     }),
//! );
//!
//! let (engine, handle) = EngineBuilder::new().with_duck(&duck).build();
//! tokio::spawn(engine.run());
//!
//! handle.dispatch(Action::new("app.search/QUERY").with_payload(json!("rust")))?;
//! let slice = duck.slice(&handle.select().await?);
//! println!("pending: {}", duck.status(&slice).is_pending);
//! ```
//!
//! ## What This Is Not
//!
//! Ratchet is **not**:
//! - A general task scheduler
//! - A persistence or retry/backoff layer
//! - An effect-abortion mechanism (superseded calls run to completion)
//! - A store framework (bring your own edge; the engine's store is a
//!   convenience)
//!
//! Ratchet **is**:
//! > Take-latest async action orchestration: sagas decide, effects run,
//! > only the freshest invocation commits.

// Core modules
mod action;
mod async_type;
mod combinators;
mod duck;
mod effect;
mod engine;
mod error;
mod orchestrator;
mod reducer;
mod runtime;
mod saga;
mod saga_macro;
mod store;


// Stress tests (test-only)
#[cfg(test)]
mod stress_tests;

// Re-export action types
pub use crate::action::{Action, ActionType, CorrelationId, Meta};

// Re-export the async type descriptor
pub use crate::async_type::{AsyncType, Phase};

// Re-export combinators
pub use crate::combinators::{compose_sagas, take_one, ComposeSagas, TakeOne};

// Re-export the duck assembly
pub use crate::duck::{AsyncActionDuck, DuckFactory};

// Re-export the effect seam
pub use crate::effect::{Effect, SharedEffect};

// Re-export engine types
pub use crate::engine::{Engine, EngineBuilder, EngineHandle};

// Re-export error types
pub use crate::error::EngineError;

// Re-export the orchestrator
pub use crate::orchestrator::AsyncActionSaga;

// Re-export the reducer family
pub use crate::reducer::{
    AsyncResult, AsyncStatus, FlagReducer, KeyFn, MergeFn, Reducer, ResultReducer, SplitReducer,
    StatusReducer,
};

// Re-export the runtime
pub use crate::runtime::{DispatchRecord, Origin, SagaRuntime};

// Re-export the saga task model
pub use crate::saga::{BoxSaga, EffectFuture, Resume, Saga, SagaOp, Step};

// Re-export store seams
pub use crate::store::{value_at, FnStore, MountedStore, StateStore};

// Re-export commonly used external types
pub use async_trait::async_trait;
