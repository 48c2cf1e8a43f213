//! Action types shared across the crate.
//!
//! Actions follow the flux-standard shape: a string tag, an optional JSON
//! payload, optional metadata linking a lifecycle action back to the trigger
//! that caused it, and an error flag.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Interned action tag.
///
/// Cheap to clone and compare; the tag string is shared behind an `Arc` so
/// sagas, reducers and the runtime can all hold copies without allocating.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionType(Arc<str>);

impl ActionType {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(Arc::from(tag.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActionType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for ActionType {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

/// Per-invocation token linking lifecycle actions to their trigger.
///
/// Freshly generated when an invocation starts; every action the invocation
/// dispatches carries the same ID, so consumers can match a completion back
/// to the trigger that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Metadata attached to every lifecycle action an invocation produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Meta {
    /// The trigger action that started the invocation.
    pub trigger: Box<Action>,
    /// Shared by all lifecycle actions of one invocation.
    pub correlation_id: CorrelationId,
}

impl Meta {
    pub fn for_trigger(trigger: Action) -> Self {
        Self {
            trigger: Box::new(trigger),
            correlation_id: CorrelationId::new(),
        }
    }
}

/// A dispatched action.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: ActionType,
    pub payload: Option<Value>,
    pub meta: Option<Meta>,
    /// Set on `FAILURE` actions; the payload is then the error value.
    pub error: bool,
}

impl Action {
    pub fn new(kind: impl Into<ActionType>) -> Self {
        Self {
            kind: kind.into(),
            payload: None,
            meta: None,
            error: false,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn into_error(mut self) -> Self {
        self.error = true;
        self
    }
}
