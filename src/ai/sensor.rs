//! Proximity sensors
//!
//! Three box-shaped zones (left, right, front) track whether something is
//! inside them. The front zone also remembers the width of the obstacle
//! that blocked it, which drives how far the FSM shifts sideways.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::core::{SensorEvent, SensorLayout, ZonePhase, ZoneTag};

/// Which of the agent's sensors an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorSide {
    Left,
    Right,
    Front,
}

/// Bit set of physics layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u32::MAX);

    /// Mask containing a single layer
    #[must_use]
    pub const fn from_layer(layer: u32) -> Self {
        Self::NONE.with_layer(layer)
    }

    /// Add a layer; layers outside 0..32 are ignored
    #[must_use]
    pub const fn with_layer(self, layer: u32) -> Self {
        if layer < 32 {
            Self(self.0 | (1 << layer))
        } else {
            self
        }
    }

    #[must_use]
    pub const fn contains(self, layer: u32) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

/// What a sensor is told about the volume entering or leaving it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub entity: Entity,
    pub tag: ZoneTag,
    pub layer: u32,
    /// World x-size of the volume's bounds
    pub extent: f32,
}

/// Occupancy snapshot of one sensor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProximityZone {
    pub occupied: bool,
    /// Most recent obstacle seen entering the zone
    pub obstacle: Option<Entity>,
    /// Width of the blocking obstacle; front zone only
    pub extent: f32,
}

impl ProximityZone {
    /// Back to `{false, None, 0}`
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Contact filter of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFilter {
    /// Accept volumes carrying this tag
    Tag(ZoneTag),
    /// Accept volumes on any of these layers
    Layers(LayerMask),
}

impl SensorFilter {
    #[must_use]
    pub fn accepts(&self, contact: &Contact) -> bool {
        match self {
            Self::Tag(tag) => contact.tag == *tag,
            Self::Layers(mask) => mask.contains(contact.layer),
        }
    }
}

/// A single filtered zone
#[derive(Debug, Clone)]
pub struct ProximitySensor {
    side: SensorSide,
    filter: SensorFilter,
    zone: ProximityZone,
}

impl ProximitySensor {
    #[must_use]
    pub fn new(side: SensorSide, filter: SensorFilter) -> Self {
        Self {
            side,
            filter,
            zone: ProximityZone::default(),
        }
    }

    #[must_use]
    pub fn side(&self) -> SensorSide {
        self.side
    }

    #[must_use]
    pub fn zone(&self) -> &ProximityZone {
        &self.zone
    }

    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.zone.occupied
    }

    /// Record a contact entering the zone. Returns whether it was accepted.
    pub fn on_enter(&mut self, contact: &Contact) -> bool {
        if !self.filter.accepts(contact) {
            return false;
        }

        self.zone.occupied = true;
        self.zone.obstacle = Some(contact.entity);
        if self.side == SensorSide::Front {
            self.zone.extent = contact.extent.max(0.0);
        } else {
            log::debug!("{:?} sensor contact: {:?}", self.side, contact.entity);
        }
        true
    }

    /// Record a contact leaving the zone. Any accepted exit empties the zone.
    pub fn on_exit(&mut self, contact: &Contact) -> bool {
        if !self.filter.accepts(contact) {
            return false;
        }
        self.zone.clear();
        true
    }
}

/// The agent's three sensors
#[derive(Debug, Clone)]
pub struct SensorRig {
    pub left: ProximitySensor,
    pub right: ProximitySensor,
    pub front: ProximitySensor,
}

impl SensorRig {
    /// Front filtered by tag, sides by layer mask
    #[must_use]
    pub fn new(front_tag: ZoneTag, side_layers: LayerMask) -> Self {
        Self {
            left: ProximitySensor::new(SensorSide::Left, SensorFilter::Layers(side_layers)),
            right: ProximitySensor::new(SensorSide::Right, SensorFilter::Layers(side_layers)),
            front: ProximitySensor::new(SensorSide::Front, SensorFilter::Tag(front_tag)),
        }
    }

    #[must_use]
    pub fn from_layout(layout: &SensorLayout) -> Self {
        Self::new(layout.front_tag, layout.side_layers)
    }

    #[must_use]
    pub fn sensor(&self, side: SensorSide) -> &ProximitySensor {
        match side {
            SensorSide::Left => &self.left,
            SensorSide::Right => &self.right,
            SensorSide::Front => &self.front,
        }
    }

    pub fn sensor_mut(&mut self, side: SensorSide) -> &mut ProximitySensor {
        match side {
            SensorSide::Left => &mut self.left,
            SensorSide::Right => &mut self.right,
            SensorSide::Front => &mut self.front,
        }
    }

    #[must_use]
    pub fn is_occupied(&self, side: SensorSide) -> bool {
        self.sensor(side).is_occupied()
    }

    /// Apply a sensor event.
    ///
    /// Returns `true` when the front zone went from clear to occupied.
    pub fn apply(&mut self, event: &SensorEvent) -> bool {
        let was_blocked = self.front.is_occupied();
        let sensor = self.sensor_mut(event.side);
        let accepted = match event.phase {
            ZonePhase::Enter => sensor.on_enter(&event.contact),
            ZonePhase::Exit => sensor.on_exit(&event.contact),
        };

        accepted && event.side == SensorSide::Front && !was_blocked && self.front.is_occupied()
    }
}

impl Default for SensorRig {
    fn default() -> Self {
        Self::from_layout(&SensorLayout::default())
    }
}
