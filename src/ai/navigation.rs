//! Shared navigation state and the seams between agent and controllers
//!
//! Everything both controllers do the same way (waypoint following, the
//! reorientation timer, collision counting, finishing a run) is expressed by
//! [`Navigable`]. What differs between them is only the per-tick decision,
//! expressed by [`DecisionStrategy`].

use std::f32::consts::FRAC_PI_2;
use std::fmt;

use glam::{Quat, Vec3};
use hecs::Entity;

use super::sensor::SensorRig;
use super::waypoint::{WaypointGraph, WaypointId};
use crate::core::{SensorLayout, SimulationRunResult};
use crate::ecs::{TransformBackend, World};

/// Whether the agent is still allowed to drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Driving,
    /// Finish line crossed; terminal
    Finished,
}

/// Data shared by the agent and whichever controller drives it
#[derive(Debug, Clone)]
pub struct NavigationState {
    /// Name of the track, copied into the run result
    pub track_name: String,
    /// Waypoint the agent is currently heading for
    pub current_waypoint: Option<WaypointId>,
    pub sensors: SensorRig,
    /// Seconds accumulated towards the next reorientation
    pub rot_timer: f32,
    /// Obstacles touched so far
    pub collisions: u32,
    pub status: RunStatus,
}

impl NavigationState {
    #[must_use]
    pub fn new(track_name: impl Into<String>, layout: &SensorLayout) -> Self {
        Self {
            track_name: track_name.into(),
            current_waypoint: None,
            sensors: SensorRig::from_layout(layout),
            rot_timer: 0.0,
            collisions: 0,
            status: RunStatus::Driving,
        }
    }

    #[must_use]
    pub fn with_waypoint(mut self, waypoint: Option<WaypointId>) -> Self {
        self.current_waypoint = waypoint;
        self
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == RunStatus::Finished
    }
}

/// Per-tick inputs handed to a controller
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    /// Seconds covered by this tick
    pub dt: f32,
    /// Track volumes, used to measure clearances
    pub world: &'a World,
}

/// The decision step that distinguishes one controller from another.
pub trait DecisionStrategy: fmt::Debug {
    /// Name written into result records
    fn name(&self) -> &'static str;

    /// The front zone just became occupied.
    fn on_front_blocked(&mut self, _nav: &mut NavigationState, _body: &mut dyn TransformBackend) {
    }

    /// Decide and apply this tick's motion.
    fn step(
        &mut self,
        nav: &mut NavigationState,
        body: &mut dyn TransformBackend,
        ctx: &TickContext<'_>,
    );

    /// While true, waypoint reorientation is suppressed and its timer held at 0.
    fn holds_heading(&self) -> bool;

    /// Called every tick once the run has finished.
    fn halt(&mut self, nav: &mut NavigationState, body: &mut dyn TransformBackend);

    /// One-line summary for logs.
    fn status_line(&self) -> String;
}

/// Navigation behaviour shared by every controller.
pub trait Navigable {
    /// `reached` was touched: head for its successor and turn towards it.
    fn advance_waypoint(&mut self, reached: WaypointId, graph: &WaypointGraph);

    /// Face the current waypoint. Returns whether the heading changed.
    fn reorient(&mut self, graph: &WaypointGraph) -> bool;

    /// Count a touched obstacle.
    fn record_collision(&mut self, obstacle: Entity);

    /// Start the run clock.
    fn start_run(&mut self);

    /// Stop the clock, disable driving and emit the result.
    ///
    /// Only the first call produces a result; later calls return `None`.
    fn finish_run(&mut self) -> Option<SimulationRunResult>;
}

/// Yaw-only rotation that points the agent's drive axis from `from` to `to`.
///
/// The look rotation aligns local +Z with the horizontal direction; the
/// extra quarter turn then aligns the model's drive axis (local -X) with it.
/// Returns `None` when the two points coincide on the horizontal plane.
#[must_use]
pub fn heading_towards(from: Vec3, to: Vec3) -> Option<Quat> {
    let mut direction = to - from;
    direction.y = 0.0;
    if direction == Vec3::ZERO {
        return None;
    }

    let yaw = direction.x.atan2(direction.z);
    Some(Quat::from_rotation_y(yaw) * Quat::from_rotation_y(FRAC_PI_2))
}
