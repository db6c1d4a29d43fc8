//! Core simulation module
//!
//! Contains configuration, the event queue, the run clock, the results log
//! and the fixed-timestep driver

mod clock;
mod config;
mod events;
mod results;
mod simulation;

pub use clock::{RunClock, RunTimer, elapsed_label};
pub use config::{
    AgentConfig, ConfigError, ControllerKind, Format, SensorLayout, SensorVolume, SimConfig,
};
pub use events::{EventQueue, NavEvent, SensorEvent, ZoneEvent, ZonePhase, ZoneTag};
pub use results::{MemorySink, ResultsError, ResultsLog, ResultsSink, SimulationRunResult};
pub use simulation::{RunOutcome, Simulation};
