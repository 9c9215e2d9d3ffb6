//! Async Fetch with Coroutine Handlers
//!
//! This example demonstrates a coroutine handler that performs effects.
//!
//! Key concepts:
//! - Intermediate states committed with `co.update`
//! - Effects returning futures, awaited by the interpreter
//! - Recovering from a failed effect inside the coroutine
//! - Awaiting the drive handle to run suspended futures
//! - Canceling a drive before its future settles
//!
//! Run with: RUST_LOG=machina=trace cargo run --example async_fetch

use machina::effects::{named_call, Outcome};
use machina::{Dispatched, EffectError, Handler, Machine, MachineBuilder};
use serde_json::{json, Value};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn fetch_user(_machine: &Machine, args: Vec<Value>) -> Outcome {
    let id = args.first().and_then(Value::as_i64).unwrap_or_default();
    Outcome::future(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        if id < 0 {
            Err(EffectError::new("no such user").with_detail(json!({ "id": id })))
        } else {
            Ok(json!({ "id": id, "login": format!("user{id}") }))
        }
    })
}

fn machine() -> Machine {
    MachineBuilder::new()
        .name("profile")
        .state("idle")
        .transition(
            "idle",
            "load",
            Handler::coroutine(|co, _machine, _state, args| async move {
                co.update("loading").await;
                match co.call(named_call("fetch_user", fetch_user, args)).await {
                    Ok(user) => Ok(json!({ "name": "loaded", "user": user })),
                    Err(error) => Ok(json!({ "name": "failed", "reason": error.message() })),
                }
            }),
        )
        .transition("loaded", "reset", "idle")
        .transition("failed", "reset", "idle")
        .declare("loading")
        .build()
        .unwrap()
}

async fn wait_for(machine: &Machine, dispatched: Dispatched) {
    if let Some(handle) = dispatched.drive() {
        if let Err(error) = handle.clone().await {
            println!("  drive failed: {error}");
        }
    }
    println!("  state: {}", machine.state().into_value());
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Async Fetch ===\n");

    let machine = machine();

    println!("Loading user 7:");
    let dispatched = machine.call_action("load", vec![json!(7)]).unwrap();
    println!("  right after dispatch: {}", machine.state().name());
    wait_for(&machine, dispatched).await;

    println!("\nLoading a missing user:");
    machine.call_action("reset", vec![]).unwrap();
    let dispatched = machine.call_action("load", vec![json!(-1)]).unwrap();
    wait_for(&machine, dispatched).await;

    println!("\nCanceling a load:");
    machine.call_action("reset", vec![]).unwrap();
    let dispatched = machine.call_action("load", vec![json!(8)]).unwrap();
    if let Some(handle) = dispatched.drive() {
        handle.cancel();
    }
    wait_for(&machine, dispatched).await;

    println!("\n=== Example Complete ===");
}
