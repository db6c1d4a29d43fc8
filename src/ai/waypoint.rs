//! Waypoint chain
//!
//! Waypoints live in an arena and point at their successor by id, so a
//! looping track is just a chain whose last link returns to the start.

use glam::Vec3;

/// Index of a waypoint inside its [`WaypointGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaypointId(pub usize);

/// A point on the route
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub position: Vec3,
    pub next: Option<WaypointId>,
}

/// Singly-linked, possibly cyclic, chain of waypoints
#[derive(Debug, Clone, Default)]
pub struct WaypointGraph {
    waypoints: Vec<Waypoint>,
}

impl WaypointGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an unlinked waypoint
    pub fn add(&mut self, position: Vec3) -> WaypointId {
        let id = WaypointId(self.waypoints.len());
        self.waypoints.push(Waypoint {
            position,
            next: None,
        });
        id
    }

    /// Point `from` at `to`. Unknown ids are ignored.
    pub fn link(&mut self, from: WaypointId, to: WaypointId) {
        if to.0 < self.waypoints.len() {
            if let Some(waypoint) = self.waypoints.get_mut(from.0) {
                waypoint.next = Some(to);
            }
        }
    }

    /// Build a chain through `positions` in order, closing the loop if asked.
    /// Returns the first waypoint.
    pub fn chain(positions: &[Vec3], looped: bool) -> (Self, Option<WaypointId>) {
        let mut graph = Self::new();
        let ids: Vec<_> = positions.iter().map(|&p| graph.add(p)).collect();
        for pair in ids.windows(2) {
            graph.link(pair[0], pair[1]);
        }
        if looped {
            if let (Some(&first), Some(&last)) = (ids.first(), ids.last()) {
                graph.link(last, first);
            }
        }
        (graph, ids.first().copied())
    }

    #[must_use]
    pub fn get(&self, id: WaypointId) -> Option<&Waypoint> {
        self.waypoints.get(id.0)
    }

    #[must_use]
    pub fn position(&self, id: WaypointId) -> Option<Vec3> {
        self.get(id).map(|waypoint| waypoint.position)
    }

    /// Successor of `id`, if it has one
    #[must_use]
    pub fn next(&self, id: WaypointId) -> Option<WaypointId> {
        self.get(id).and_then(|waypoint| waypoint.next)
    }

    /// Walk the chain from `start`, stopping before any waypoint repeats
    pub fn walk(&self, start: WaypointId) -> impl Iterator<Item = WaypointId> + '_ {
        let mut seen = vec![false; self.waypoints.len()];
        let mut current = self.get(start).map(|_| start);
        std::iter::from_fn(move || {
            let id = current?;
            if std::mem::replace(&mut seen[id.0], true) {
                return None;
            }
            current = self.next(id);
            Some(id)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}
