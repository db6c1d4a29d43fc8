//! Navigation events and the queue that carries them into the agent
//!
//! Hosts report overlaps as `(tag, other object)` pairs. Those are resolved
//! exactly once, at ingestion, into the closed [`ZoneEvent`] and
//! [`SensorEvent`] types; nothing downstream compares tag strings.
//!
//! # Example
//!
//! ```ignore
//! // Overlap detection for tick N
//! queue.push(NavEvent::Zone(ZoneEvent::StartLineEntered));
//!
//! // Same tick, after detection: make the batch visible and dispatch it
//! queue.swap();
//! for event in queue.drain() {
//!     agent.handle_event(event, &track.graph);
//! }
//! ```

use std::collections::VecDeque;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::ai::{Contact, SensorSide, WaypointId};
use crate::ecs::World;

// ============================================================================
// Tags
// ============================================================================

/// Category of a trigger volume, as tagged in the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneTag {
    #[serde(rename = "waypoint")]
    Waypoint,
    Obstacle,
    StartLine,
    FinishLine,
    Untagged,
}

impl ZoneTag {
    /// Tag string used by host scenes
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waypoint => "waypoint",
            Self::Obstacle => "Obstacle",
            Self::StartLine => "StartLine",
            Self::FinishLine => "FinishLine",
            Self::Untagged => "Untagged",
        }
    }
}

impl FromStr for ZoneTag {
    type Err = Infallible;

    /// Unknown tags resolve to `Untagged`; they never fail ingestion.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "waypoint" => Self::Waypoint,
            "Obstacle" => Self::Obstacle,
            "StartLine" => Self::StartLine,
            "FinishLine" => Self::FinishLine,
            _ => Self::Untagged,
        })
    }
}

impl fmt::Display for ZoneTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an overlap started or ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZonePhase {
    Enter,
    Exit,
}

// ============================================================================
// Event Types
// ============================================================================

/// Trigger events on the agent body that the navigation layer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneEvent {
    /// The agent reached the pickup volume of a waypoint
    WaypointEntered(WaypointId),
    /// The agent body touched an obstacle
    ObstacleEntered(Entity),
    /// The agent crossed into the start line
    StartLineEntered,
    /// The agent left the finish line volume
    FinishLineExited,
}

impl ZoneEvent {
    /// Resolve a raw overlap into an event.
    ///
    /// Returns `None` for combinations the navigation layer ignores (leaving
    /// a waypoint, untagged volumes, a waypoint tag with no waypoint behind it).
    #[must_use]
    pub fn from_parts(
        phase: ZonePhase,
        tag: ZoneTag,
        other: Entity,
        waypoint: Option<WaypointId>,
    ) -> Option<Self> {
        match (phase, tag) {
            (ZonePhase::Enter, ZoneTag::Waypoint) => waypoint.map(Self::WaypointEntered),
            (ZonePhase::Enter, ZoneTag::Obstacle) => Some(Self::ObstacleEntered(other)),
            (ZonePhase::Enter, ZoneTag::StartLine) => Some(Self::StartLineEntered),
            (ZonePhase::Exit, ZoneTag::FinishLine) => Some(Self::FinishLineExited),
            _ => None,
        }
    }

    /// Resolve an overlap with a world volume by reading its components.
    #[must_use]
    pub fn resolve(phase: ZonePhase, other: Entity, world: &World) -> Option<Self> {
        Self::from_parts(phase, world.tag(other), other, world.waypoint_of(other))
    }
}

/// A contact entering or leaving one of the agent's proximity sensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorEvent {
    pub side: SensorSide,
    pub phase: ZonePhase,
    pub contact: Contact,
}

/// Everything the host feeds into a navigation agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavEvent {
    Zone(ZoneEvent),
    Sensor(SensorEvent),
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered event queue.
///
/// Events pushed before a `swap()` become readable after it. The simulation
/// swaps right after overlap detection, so events reach the agent within the
/// tick that produced them and never while a controller is reading sensors.
#[derive(Debug)]
pub struct EventQueue<E = NavEvent> {
    /// Events being written this tick
    pending: VecDeque<E>,
    /// Events ready for dispatch
    processing: VecDeque<E>,
}

impl<E> EventQueue<E> {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 16;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
            processing: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
        }
    }

    /// Push an event; it becomes visible after the next `swap()`.
    #[inline]
    pub fn push(&mut self, event: E) {
        self.pending.push_back(event);
    }

    /// Make the pending batch readable and start a fresh pending batch.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Take ownership of the readable batch.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = E> + '_ {
        self.processing.drain(..)
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::WaypointGraph;
    use crate::ecs::Aabb;
    use glam::Vec3;

    fn test_entity() -> Entity {
        let mut world = hecs::World::new();
        world.spawn(())
    }

    #[test]
    fn test_zone_tag_parse() {
        assert_eq!("waypoint".parse::<ZoneTag>(), Ok(ZoneTag::Waypoint));
        assert_eq!("Obstacle".parse::<ZoneTag>(), Ok(ZoneTag::Obstacle));
        assert_eq!("FinishLine".parse::<ZoneTag>(), Ok(ZoneTag::FinishLine));
        // Tags are case sensitive, as in the host scenes
        assert_eq!("obstacle".parse::<ZoneTag>(), Ok(ZoneTag::Untagged));
    }

    #[test]
    fn test_from_parts_ignores_irrelevant_phases() {
        let other = test_entity();

        assert_eq!(
            ZoneEvent::from_parts(ZonePhase::Exit, ZoneTag::Obstacle, other, None),
            None
        );
        assert_eq!(
            ZoneEvent::from_parts(ZonePhase::Enter, ZoneTag::FinishLine, other, None),
            None
        );
        assert_eq!(
            ZoneEvent::from_parts(ZonePhase::Exit, ZoneTag::FinishLine, other, None),
            Some(ZoneEvent::FinishLineExited)
        );
        // Waypoint tag without a waypoint behind it
        assert_eq!(
            ZoneEvent::from_parts(ZonePhase::Enter, ZoneTag::Waypoint, other, None),
            None
        );
    }

    #[test]
    fn test_resolve_reads_world_components() {
        let mut graph = WaypointGraph::new();
        let wp = graph.add(Vec3::ZERO);

        let mut world = World::new();
        let trigger =
            world.spawn_waypoint_trigger("wp", Aabb::from_center_size(Vec3::ZERO, Vec3::ONE), wp);
        let rock = world.spawn_volume(
            "rock",
            Aabb::from_center_size(Vec3::X * 5.0, Vec3::ONE),
            ZoneTag::Obstacle,
            0,
        );

        assert_eq!(
            ZoneEvent::resolve(ZonePhase::Enter, trigger, &world),
            Some(ZoneEvent::WaypointEntered(wp))
        );
        assert_eq!(
            ZoneEvent::resolve(ZonePhase::Enter, rock, &world),
            Some(ZoneEvent::ObstacleEntered(rock))
        );
    }

    #[test]
    fn test_event_queue_push_and_swap() {
        let mut queue = EventQueue::new();

        queue.push(NavEvent::Zone(ZoneEvent::StartLineEntered));
        assert!(queue.is_empty(), "Events should not be visible before swap");

        queue.swap();
        assert_eq!(queue.len(), 1);
        let events: Vec<_> = queue.drain().collect();
        assert!(matches!(
            events[0],
            NavEvent::Zone(ZoneEvent::StartLineEntered)
        ));
    }

    #[test]
    fn test_event_queue_preserves_order() {
        let mut queue = EventQueue::new();
        queue.push(NavEvent::Zone(ZoneEvent::StartLineEntered));
        queue.push(NavEvent::Zone(ZoneEvent::FinishLineExited));
        queue.swap();

        let events: Vec<_> = queue.drain().collect();
        assert_eq!(
            events,
            vec![
                NavEvent::Zone(ZoneEvent::StartLineEntered),
                NavEvent::Zone(ZoneEvent::FinishLineExited),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_event_queue_swap_drops_undrained_batch() {
        let mut queue: EventQueue<u32> = EventQueue::new();
        queue.push(1);
        queue.swap();
        queue.push(2);
        assert_eq!(queue.pending_count(), 1);

        queue.swap();
        assert_eq!(queue.drain().collect::<Vec<_>>(), vec![2]);
        assert_eq!(queue.pending_count(), 0);
    }
}
