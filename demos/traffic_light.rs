//! Traffic Light State Machine
//!
//! This example demonstrates a simple cyclic state machine.
//!
//! Key concepts:
//! - Declarative transitions written with `transitions!`
//! - Generated actions and `isX` predicates
//! - A functional handler carrying payload
//! - Middleware observing every commit
//!
//! Run with: cargo run --example traffic_light

use machina::middleware::Event;
use machina::{transitions, Handler, MachineBuilder};
use serde_json::json;

fn main() {
    println!("=== Traffic Light State Machine ===\n");

    let machine = MachineBuilder::new()
        .name("crossing")
        .state("red")
        .transitions(transitions! {
            "red" => { "next" => "green" },
            "green" => {
                "next" => "yellow",
                "hold for" => Handler::func(|_m, _s, args| {
                    Ok(json!({ "name": "green", "seconds": args.first() }))
                }),
            },
            "yellow" => { "next" => "red" },
        })
        .on_event(|machine, event| {
            if let Event::StateChanged { previous, current } = event {
                println!(
                    "  [{}] {} -> {}",
                    machine.name(),
                    previous.name(),
                    current.name()
                );
            }
        })
        .build()
        .unwrap();

    println!("Initial state: {}", machine.state().name());
    println!("Actions: {:?}", machine.actions().collect::<Vec<_>>());
    println!("Predicates: {:?}\n", machine.predicates().collect::<Vec<_>>());

    println!("Cycling twice:");
    for _ in 0..6 {
        machine.call_action("next", vec![]).unwrap();
    }

    println!("\nGreen with a hold time:");
    machine.call_action("next", vec![]).unwrap();
    machine.call_action("holdFor", vec![json!(30)]).unwrap();
    println!("  state: {}", machine.state().into_value());

    println!("\n'holdFor' is only handled while green:");
    machine.call_action("next", vec![]).unwrap();
    let dispatched = machine.call_action("holdFor", vec![json!(30)]).unwrap();
    println!("  from yellow: {dispatched:?}");
    println!("  isYellow: {:?}", machine.check("isYellow"));

    println!("\n=== Example Complete ===");
}
