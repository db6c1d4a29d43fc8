//! Navigation and decision-making module
//!
//! Provides proximity sensors, the waypoint chain, the shared navigation
//! state and the two controllers (finite state machine and fuzzy logic).

mod agent;
mod fsm;
mod fuzzy;
mod navigation;
mod sensor;
mod waypoint;

pub use agent::NavAgent;
pub use fsm::{
    AvoidDirection, AvoidState, DriveContext, FiniteStateController, FsmState, IdleState,
    MoveForwardState, State, StateMachine, Transition,
};
pub use fuzzy::{
    CLOSE, Clearances, CommitmentLatch, DistanceMemberships, FAR, FuzzyController, FuzzyOutput,
    MEDIUM, MIN_SIDE_CLEARANCE, NO_OBSTACLE_DISTANCE, Probes, RELEASE_DISTANCE, Trapezoid, WIDE,
    defuzzify, trapezoid,
};
pub use navigation::{
    DecisionStrategy, Navigable, NavigationState, RunStatus, TickContext, heading_towards,
};
pub use sensor::{
    Contact, LayerMask, ProximitySensor, ProximityZone, SensorFilter, SensorRig, SensorSide,
};
pub use waypoint::{Waypoint, WaypointGraph, WaypointId};
