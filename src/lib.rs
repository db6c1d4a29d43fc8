//! Waypoint-following vehicle navigation built in Rust
//!
//! This crate provides:
//! - Proximity sensing with left, right and front zones
//! - A finite state machine controller for obstacle avoidance
//! - A fuzzy logic controller with directional commitment
//! - A headless track host with trigger volumes stored in hecs
//! - An append-only log of run results

pub mod ai;
pub mod core;
pub mod ecs;
pub mod track;

// Re-exports for convenience
pub use glam;
pub use hecs;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{
        DecisionStrategy, FiniteStateController, FsmState, FuzzyController, NavAgent, Navigable,
        NavigationState, WaypointGraph, WaypointId,
    };
    pub use crate::core::{
        AgentConfig, ControllerKind, NavEvent, ResultsLog, ResultsSink, RunClock, RunOutcome,
        RunTimer, SimConfig, Simulation, SimulationRunResult, ZoneEvent, ZoneTag,
    };
    pub use crate::ecs::{Aabb, Space, Transform, TransformBackend, World};
    pub use crate::track::{Track, TrackDescription};
    pub use glam::{Quat, Vec3};
}
