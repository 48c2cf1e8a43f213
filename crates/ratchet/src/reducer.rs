//! Pure reducers deriving consumer-facing status/result state from
//! dispatched lifecycle actions.
//!
//! All four reducers share the same contract: `reduce(None, action)` starts
//! from [`Reducer::initial`], and an action outside the reducer's triad is
//! a no-op that returns the state unchanged. Transitions per phase:
//!
//! ```text
//!          PENDING                SUCCESS                  FAILURE
//! flag     true                   false                    false
//! status   pending, keep error    idle, clear error        idle, error = payload
//! result   as status, keep result as status, merge result  as status, keep result
//! split    same as result, scoped to the bucket keyed by the action
//! ```
//!
//! A stale error stays visible while a retry is pending; a stale result
//! stays visible during reload and after a failure.

use crate::action::Action;
use crate::async_type::{AsyncType, Phase};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Pure state-transition function over dispatched actions.
pub trait Reducer: Send + Sync {
    type State;

    fn initial(&self) -> Self::State;

    /// Fold one action. `None` means the state has not been initialized yet
    /// and starts from [`Reducer::initial`]. Never fails on unknown actions.
    fn reduce(&self, state: Option<Self::State>, action: &Action) -> Self::State;
}

/// Async status visible to consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsyncStatus {
    pub is_pending: bool,
    pub error: Option<Value>,
}

/// Status plus the last known-good result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AsyncResult {
    pub result: Option<Value>,
    pub is_pending: bool,
    pub error: Option<Value>,
}

impl AsyncResult {
    pub fn status(&self) -> AsyncStatus {
        AsyncStatus {
            is_pending: self.is_pending,
            error: self.error.clone(),
        }
    }
}

/// Merge strategy applied to the previous result on `SUCCESS`.
pub type MergeFn = Arc<dyn Fn(Option<Value>, &Action) -> Option<Value> + Send + Sync>;

/// Derives the bucket key a lifecycle action belongs to.
pub type KeyFn = Arc<dyn Fn(&Action) -> Option<String> + Send + Sync>;

/// Boolean flag: true exactly while an invocation is pending.
pub struct FlagReducer {
    ty: AsyncType,
}

impl FlagReducer {
    pub fn new(ty: AsyncType) -> Self {
        Self { ty }
    }
}

impl Reducer for FlagReducer {
    type State = bool;

    fn initial(&self) -> bool {
        false
    }

    fn reduce(&self, state: Option<bool>, action: &Action) -> bool {
        let state = state.unwrap_or_else(|| self.initial());
        match self.ty.classify(&action.kind) {
            Some(Phase::Pending) => true,
            Some(Phase::Success) | Some(Phase::Failure) => false,
            None => state,
        }
    }
}

/// Tracks `{is_pending, error}` for one async type.
pub struct StatusReducer {
    ty: AsyncType,
}

impl StatusReducer {
    pub fn new(ty: AsyncType) -> Self {
        Self { ty }
    }
}

impl Reducer for StatusReducer {
    type State = AsyncStatus;

    fn initial(&self) -> AsyncStatus {
        AsyncStatus::default()
    }

    fn reduce(&self, state: Option<AsyncStatus>, action: &Action) -> AsyncStatus {
        let state = state.unwrap_or_else(|| self.initial());
        match self.ty.classify(&action.kind) {
            Some(Phase::Pending) => AsyncStatus {
                is_pending: true,
                error: state.error,
            },
            Some(Phase::Success) => AsyncStatus {
                is_pending: false,
                error: None,
            },
            Some(Phase::Failure) => AsyncStatus {
                is_pending: false,
                error: action.payload.clone(),
            },
            None => state,
        }
    }
}

/// Tracks status plus the last known-good result for one async type.
///
/// The result changes only on `SUCCESS`, through the merge fn. The default
/// merge replaces it with the `SUCCESS` payload.
#[derive(Clone)]
pub struct ResultReducer {
    ty: AsyncType,
    merge: MergeFn,
}

impl ResultReducer {
    pub fn new(ty: AsyncType) -> Self {
        Self::with_merge(ty, Arc::new(|_, action: &Action| action.payload.clone()))
    }

    pub fn with_merge(ty: AsyncType, merge: MergeFn) -> Self {
        Self { ty, merge }
    }

    pub fn async_type(&self) -> &AsyncType {
        &self.ty
    }
}

impl Reducer for ResultReducer {
    type State = AsyncResult;

    fn initial(&self) -> AsyncResult {
        AsyncResult::default()
    }

    fn reduce(&self, state: Option<AsyncResult>, action: &Action) -> AsyncResult {
        let state = state.unwrap_or_else(|| self.initial());
        match self.ty.classify(&action.kind) {
            Some(Phase::Pending) => AsyncResult {
                result: state.result,
                is_pending: true,
                error: state.error,
            },
            Some(Phase::Success) => AsyncResult {
                result: (self.merge)(state.result, action),
                is_pending: false,
                error: None,
            },
            Some(Phase::Failure) => AsyncResult {
                result: state.result,
                is_pending: false,
                error: action.payload.clone(),
            },
            None => state,
        }
    }
}

/// Tracks many independent entities under one async type: one
/// [`AsyncResult`] bucket per derived key.
///
/// Buckets are created lazily on the first tracked action for an unseen key
/// and never pruned. Keys must be derivable for every tracked action; a
/// `None` key is a caller bug and panics rather than misbucketing state.
pub struct SplitReducer {
    inner: ResultReducer,
    key: KeyFn,
}

impl SplitReducer {
    pub fn new(ty: AsyncType, key: KeyFn) -> Self {
        Self {
            inner: ResultReducer::new(ty),
            key,
        }
    }

    pub fn with_merge(ty: AsyncType, key: KeyFn, merge: MergeFn) -> Self {
        Self {
            inner: ResultReducer::with_merge(ty, merge),
            key,
        }
    }
}

impl Reducer for SplitReducer {
    type State = BTreeMap<String, AsyncResult>;

    fn initial(&self) -> Self::State {
        BTreeMap::new()
    }

    fn reduce(&self, state: Option<Self::State>, action: &Action) -> Self::State {
        let mut state = state.unwrap_or_else(|| self.initial());
        if self.inner.ty.classify(&action.kind).is_none() {
            return state;
        }
        let key = (self.key)(action).unwrap_or_else(|| {
            panic!(
                "split reducer could not derive a key for tracked action `{}`",
                action.kind
            )
        });
        let bucket = state.remove(&key);
        state.insert(key, self.inner.reduce(bucket, action));
        state
    }
}
