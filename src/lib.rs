//! # gatewave — discrete-event digital logic simulation
//!
//! Simulates networks of logic components connected by delay-bearing
//! wires. Signal changes are events; the scheduler processes them in a
//! total, deterministic order and paces simulated time against the wall
//! clock for live viewing.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────┐
//! │        Scheduler           │ ← paces simulated vs wall time
//! │  ┌─────────────────────┐  │
//! │  │     EventQueue      │  │ ← min-heap on (when, group, order)
//! │  └─────────────────────┘  │
//! │  ┌─────────────────────┐  │
//! │  │  Event / EventKind  │  │ ← Edge, OutEdge, Action, Marker
//! │  └─────────────────────┘  │
//! └─────────────┬─────────────┘
//!               │ &mut
//! ┌─────────────▼─────────────┐
//! │         Circuit            │ ← owns components, keeps wires two-sided
//! │  ┌─────────────────────┐  │
//! │  │      Component      │  │ ← edge / clock protocol
//! │  └─────────────────────┘  │
//! └───────────────────────────┘
//!               ▲
//!      ComponentLibrary        ← templates by kind
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::rc::Rc;
//! use gatewave::component::{builtin, Component, ComponentId, Detached, Level};
//! use gatewave::{Circuit, Event, Scheduler, SimTime};
//!
//! let mut circuit = Circuit::new();
//! let not = ComponentId::new(0);
//! circuit.add(Component::new(not, &builtin::not(), Rc::new(Detached))).unwrap();
//!
//! let mut scheduler = Scheduler::default();
//! scheduler.schedule(Event::edge(SimTime::ZERO, not, 0, Level::Low));
//! scheduler.run_until_steady(&mut circuit, 100).unwrap();
//!
//! assert_eq!(circuit.component(not).unwrap().output_state(0), Some(Level::High));
//! ```

pub mod circuit;
pub mod component;
pub mod config;
pub mod error;
pub mod event;
pub mod library;
pub mod pacing;
pub mod queue;
pub mod scheduler;
pub mod time;

// Re-exports for convenience.
pub use circuit::Circuit;
pub use component::{Component, ComponentId, ComponentRecord, ComponentTemplate, Level};
pub use config::SchedulerConfig;
pub use error::{SimError, SimResult};
pub use event::{Event, EventKind, Group};
pub use library::ComponentLibrary;
pub use pacing::{ManualClock, SystemClock, WallClock};
pub use queue::EventQueue;
pub use scheduler::{Scheduler, StopHandle, Tick};
pub use time::SimTime;
