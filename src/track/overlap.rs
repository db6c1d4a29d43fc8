//! Overlap tracking
//!
//! Stands in for a physics engine's trigger callbacks. Every tick the agent's
//! body and each of its sensors is turned into a world-space box, the world
//! is queried for volumes touching it, and the result is diffed against the
//! previous tick into enter and exit events.

use glam::Vec3;
use hecs::Entity;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::ai::{Contact, SensorSide};
use crate::core::{EventQueue, NavEvent, SensorEvent, SensorLayout, ZoneEvent, ZonePhase};
use crate::ecs::{Aabb, TransformBackend, World};

/// Overlap test between a probe and a world volume
pub type OverlapPredicate = fn(&Aabb, &Aabb) -> bool;

/// One of the boxes attached to the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Probe {
    Body,
    Sensor(SensorSide),
}

impl Probe {
    /// Order probes are processed in each tick
    pub const ORDER: [Probe; 4] = [
        Probe::Sensor(SensorSide::Left),
        Probe::Sensor(SensorSide::Right),
        Probe::Sensor(SensorSide::Front),
        Probe::Body,
    ];
}

type Overlaps = SmallVec<[Contact; 4]>;

/// Turns per-tick overlap sets into enter/exit events
#[derive(Debug, Clone)]
pub struct OverlapTracker {
    body_size: Vec3,
    layout: SensorLayout,
    overlaps: OverlapPredicate,
    /// Contacts seen last tick, indexed like `Probe::ORDER`
    previous: [Overlaps; 4],
}

impl OverlapTracker {
    #[must_use]
    pub fn new(body_size: Vec3, layout: SensorLayout) -> Self {
        Self {
            body_size,
            layout,
            overlaps: Aabb::intersects,
            previous: Default::default(),
        }
    }

    /// Replace the default AABB intersection test
    #[must_use]
    pub fn with_predicate(mut self, overlaps: OverlapPredicate) -> Self {
        self.overlaps = overlaps;
        self
    }

    /// World-space box of a probe
    #[must_use]
    pub fn probe_bounds(&self, probe: Probe, body: &dyn TransformBackend) -> Aabb {
        let (offset, size) = match probe {
            Probe::Body => (Vec3::ZERO, self.body_size),
            Probe::Sensor(side) => {
                let volume = match side {
                    SensorSide::Left => self.layout.left,
                    SensorSide::Right => self.layout.right,
                    SensorSide::Front => self.layout.front,
                };
                (volume.offset, volume.size)
            }
        };
        Aabb::from_oriented(body.transform_point(offset), size, body.rotation())
    }

    /// Contacts currently overlapping `probe`
    #[must_use]
    pub fn current(&self, probe: Probe) -> &[Contact] {
        let index = Probe::ORDER.iter().position(|p| *p == probe).unwrap_or(0);
        &self.previous[index]
    }

    /// Detect overlaps for this tick and push the resulting events.
    ///
    /// Exits are pushed before enters for each probe; within a phase,
    /// volumes follow world storage order.
    pub fn update(&mut self, body: &dyn TransformBackend, world: &World, queue: &mut EventQueue) {
        for (index, probe) in Probe::ORDER.into_iter().enumerate() {
            let bounds = self.probe_bounds(probe, body);
            let overlaps = self.overlaps;
            let current: Overlaps = world
                .overlapping(|volume| overlaps(&bounds, volume))
                .into_iter()
                .filter_map(|entity| world.contact(entity))
                .collect();

            let before: FxHashSet<Entity> = self.previous[index].iter().map(|c| c.entity).collect();
            let now: FxHashSet<Entity> = current.iter().map(|c| c.entity).collect();

            for contact in self.previous[index].iter().filter(|c| !now.contains(&c.entity)) {
                if let Some(event) = event_for(probe, ZonePhase::Exit, contact, world) {
                    queue.push(event);
                }
            }
            for contact in current.iter().filter(|c| !before.contains(&c.entity)) {
                if probe == Probe::Body {
                    log::debug!(
                        "Body entered {} ({:?})",
                        world.name(contact.entity).unwrap_or_default(),
                        contact.tag
                    );
                }
                if let Some(event) = event_for(probe, ZonePhase::Enter, contact, world) {
                    queue.push(event);
                }
            }

            self.previous[index] = current;
        }
    }
}

fn event_for(probe: Probe, phase: ZonePhase, contact: &Contact, world: &World) -> Option<NavEvent> {
    match probe {
        Probe::Body => ZoneEvent::from_parts(
            phase,
            contact.tag,
            contact.entity,
            world.waypoint_of(contact.entity),
        )
        .map(NavEvent::Zone),
        Probe::Sensor(side) => Some(NavEvent::Sensor(SensorEvent {
            side,
            phase,
            contact: *contact,
        })),
    }
}
