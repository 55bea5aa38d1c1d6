use std::rc::Rc;

use gatewave::component::{ComponentRecord, Properties};
use gatewave::{
    Circuit, ComponentId, ComponentLibrary, Event, Level, Scheduler, SchedulerConfig, SimResult,
    SimTime,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Ticks between two input changes.
const STEP: u64 = 20;

fn main() -> SimResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("═══════════════════════════════════════════════════════");
    println!("  gatewave: half adder, paced at 100 ticks/s");
    println!("═══════════════════════════════════════════════════════");
    println!();

    let library = ComponentLibrary::with_builtins();
    let parent = Rc::new(|record: ComponentRecord| report(&record));
    let mut circuit = Circuit::new();

    let [a, b, sum, carry] = [0, 1, 2, 3].map(ComponentId::new);
    for (id, kind) in [(a, "interconnect"), (b, "interconnect"), (sum, "XOR"), (carry, "AND")] {
        circuit.add(library.instantiate(kind, id, parent.clone(), Properties::new())?)?;
    }
    let wires = [(a, 0, sum, 0), (a, 1, carry, 0), (b, 0, sum, 1), (b, 1, carry, 1)];
    for (source, out, sink, input) in wires {
        if !circuit.connect(source, out, sink, input, 1)? {
            warn!(%source, out, %sink, input, "wire rejected");
        }
    }

    let mut scheduler = Scheduler::new(SchedulerConfig::default().with_rate(100.0))?;
    let inputs = [
        (Level::Low, Level::Low),
        (Level::High, Level::Low),
        (Level::Low, Level::High),
        (Level::High, Level::High),
    ];
    for (i, (in_a, in_b)) in inputs.into_iter().enumerate() {
        let when = SimTime::new(i as u64 * STEP);
        scheduler.schedule_many([Event::edge(when, a, 0, in_a), Event::edge(when, b, 0, in_b)]);
    }

    let handle = scheduler.stop_handle();
    let end = SimTime::new(inputs.len() as u64 * STEP);
    scheduler.schedule(Event::action(end, move |when| {
        info!(%when, "demo finished");
        handle.stop();
        Vec::new()
    }));

    scheduler.run(&mut circuit);

    let level = |id| {
        circuit
            .component(id)
            .and_then(|c| c.output_state(0))
            .unwrap_or_default()
    };
    println!();
    println!("  Final: sum={} carry={} at {}", level(sum), level(carry), scheduler.clock());
    println!("  Events processed: {}", scheduler.events_processed());
    Ok(())
}

fn report(record: &ComponentRecord) {
    #[cfg(feature = "serialize")]
    match record.to_json() {
        Ok(json) => info!(target: "gatewave::records", "{}", json),
        Err(e) => warn!("could not encode record: {}", e),
    }
    #[cfg(not(feature = "serialize"))]
    info!(target: "gatewave::records", "{:?}", record);
}
