//! # Latest-Wins Demo
//!
//! Fires three quick search queries at one duck. Every query dispatches its
//! own PENDING, but only the last query's result ever lands in state;
//! earlier invocations keep running and are silently superseded.

use anyhow::Result;
use ratchet_core::{Action, AsyncActionDuck, DuckFactory, EngineBuilder};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Effect (simulated search backend)
// ============================================================================

async fn search(payload: Option<Value>, _state: Value, _trigger: Action) -> Result<Value> {
    let term = payload
        .and_then(|p| p.as_str().map(str::to_owned))
        .unwrap_or_default();

    // earlier queries take *longer*, so the stale results would come back
    // last if nothing suppressed them
    let delay = match term.as_str() {
        "r" => 300,
        "ru" => 200,
        _ => 100,
    };
    tokio::time::sleep(Duration::from_millis(delay)).await;

    Ok(json!({
        "term": term,
        "hits": [format!("{term}-lang"), format!("{term}-book")],
    }))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let factory = DuckFactory::new("app.search");
    let duck = AsyncActionDuck::new(&factory, "app.search/QUERY", Arc::new(search));

    let (engine, handle) = EngineBuilder::new().with_duck(&duck).build();
    let engine = tokio::spawn(engine.run());

    // a user typing "rus", one keystroke every 50ms
    for term in ["r", "ru", "rus"] {
        println!("query: {term}");
        handle.dispatch(Action::new("app.search/QUERY").with_payload(json!(term)))?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let slice = duck.slice(&handle.select().await?);
    println!("while loading: pending = {}", duck.status(&slice).is_pending);

    // wait out the slowest effect; superseded completions change nothing
    tokio::time::sleep(Duration::from_millis(400)).await;

    let slice = duck.slice(&handle.select().await?);
    println!(
        "settled: pending = {}, result = {}",
        duck.status(&slice).is_pending,
        duck.result(&slice).cloned().unwrap_or(Value::Null)
    );

    handle.stop();
    engine.await?;
    Ok(())
}
