//! Randomized and high-churn tests for the runtime and reducers.

use crate::action::{Action, Meta};
use crate::async_type::{AsyncType, Phase};
use crate::combinators::take_one;
use crate::reducer::{AsyncResult, Reducer, SplitReducer};
use crate::runtime::SagaRuntime;
use crate::saga::{BoxSaga, Resume, Saga, Step};
use crate::store::FnStore;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

struct Noop;

impl Saga for Noop {
    fn resume(&mut self, _input: Resume) -> Step {
        Step::Finish
    }
}

#[test]
fn parked_take_ones_fire_exactly_once_each() {
    let fired = Arc::new(AtomicU32::new(0));
    let mut rt = SagaRuntime::new(FnStore::new(|| Value::Null));

    for _ in 0..50 {
        let fired = Arc::clone(&fired);
        rt.spawn(Box::new(take_one("BURST", move |action| {
            assert_eq!(action.payload, Some(json!(0)));
            fired.fetch_add(1, Ordering::SeqCst);
            Box::new(Noop) as BoxSaga
        })));
    }

    // only the first burst finds anyone parked; later ones are ignored
    for round in 0..3 {
        rt.dispatch(Action::new("BURST").with_payload(json!(round)));
    }

    assert_eq!(fired.load(Ordering::SeqCst), 50);
}

#[test]
fn task_slots_are_reused_across_many_spawns() {
    let mut rt = SagaRuntime::new(FnStore::new(|| Value::Null));
    // sagas that finish immediately must not leak slots or break later
    // takers
    for _ in 0..1000 {
        rt.spawn(Box::new(Noop));
    }

    let fired = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&fired);
    rt.spawn(Box::new(take_one("PING", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::new(Noop) as BoxSaga
    })));
    rt.dispatch(Action::new("PING"));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn random_lifecycle_storm_keeps_split_buckets_independent() {
    let ty = AsyncType::define("STORM");
    let key_of = |action: &Action| -> Option<String> {
        action
            .meta
            .as_ref()?
            .trigger
            .payload
            .as_ref()?
            .as_str()
            .map(str::to_owned)
    };
    let reducer = SplitReducer::new(ty.clone(), Arc::new(key_of));

    let mut rng = fastrand::Rng::with_seed(0xdead_beef);
    let keys = ["alpha", "beta", "gamma", "delta"];
    let mut state: Option<BTreeMap<String, AsyncResult>> = None;
    let mut mirror: BTreeMap<String, AsyncResult> = BTreeMap::new();

    for step in 0..2000 {
        let key = keys[rng.usize(0..keys.len())];
        let kind = match rng.u8(0..3) {
            0 => ty.pending.clone(),
            1 => ty.success.clone(),
            _ => ty.failure.clone(),
        };
        let trigger = Action::new("STORM_TRIGGER").with_payload(json!(key));
        let mut action = Action::new(kind.clone()).with_meta(Meta::for_trigger(trigger));
        action.payload = Some(json!(step));

        // model each bucket independently with the single-bucket rules
        let bucket = mirror.entry(key.to_owned()).or_default();
        match ty.classify(&kind).unwrap() {
            Phase::Pending => bucket.is_pending = true,
            Phase::Success => {
                bucket.is_pending = false;
                bucket.error = None;
                bucket.result = Some(json!(step));
            }
            Phase::Failure => {
                bucket.is_pending = false;
                bucket.error = Some(json!(step));
            }
        }

        state = Some(reducer.reduce(state, &action));
        assert_eq!(state.as_ref().unwrap(), &mirror);
    }
}
