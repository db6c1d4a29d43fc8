//! Track description and loading
//!
//! A track is the set of volumes an agent drives through: waypoint triggers,
//! obstacles, walls and the start and finish lines. Tracks are saved and
//! loaded as RON or JSON, picked by file extension.

mod overlap;

pub use overlap::{OverlapTracker, Probe};

use std::fs;
use std::path::Path;

use glam::Vec3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ai::{WaypointGraph, WaypointId};
use crate::core::{AgentConfig, Format, ZoneTag};
use crate::ecs::{Aabb, Transform, World};

/// A named point on the route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointDescription {
    pub name: String,
    pub position: Vec3,
    /// Name of the successor waypoint
    #[serde(default)]
    pub next: Option<String>,
}

/// A box the agent can bump into
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleDescription {
    pub name: String,
    pub center: Vec3,
    pub size: Vec3,
    #[serde(default = "default_obstacle_layer")]
    pub layer: u32,
}

fn default_obstacle_layer() -> u32 {
    AgentConfig::OBSTACLE_LAYER
}

/// An untagged trigger box, used for the start and finish lines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineDescription {
    pub center: Vec3,
    pub size: Vec3,
}

impl LineDescription {
    fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.size)
    }
}

/// A serializable track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackDescription {
    /// Track name, written into run results
    pub name: String,
    /// Format version for compatibility
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub spawn_position: Vec3,
    /// Waypoint the agent heads for first; the first listed one when absent
    #[serde(default)]
    pub first_waypoint: Option<String>,
    #[serde(default)]
    pub waypoints: Vec<WaypointDescription>,
    /// Tagged `Obstacle`; touching one counts as a collision
    #[serde(default)]
    pub obstacles: Vec<ObstacleDescription>,
    /// Untagged boundaries, only seen by layer-filtered sensors
    #[serde(default)]
    pub walls: Vec<ObstacleDescription>,
    pub start_line: LineDescription,
    pub finish_line: LineDescription,
    #[serde(default = "default_trigger_size")]
    pub waypoint_trigger_size: Vec3,
}

fn default_version() -> u32 {
    TrackDescription::VERSION
}

fn default_trigger_size() -> Vec3 {
    Vec3::new(3.0, 2.0, 3.0)
}

impl TrackDescription {
    pub const VERSION: u32 = 1;

    /// Empty track with start and finish lines only
    #[must_use]
    pub fn new(name: impl Into<String>, start_line: LineDescription, finish_line: LineDescription) -> Self {
        Self {
            name: name.into(),
            version: Self::VERSION,
            spawn_position: Vec3::ZERO,
            first_waypoint: None,
            waypoints: Vec::new(),
            obstacles: Vec::new(),
            walls: Vec::new(),
            start_line,
            finish_line,
            waypoint_trigger_size: default_trigger_size(),
        }
    }

    /// Built-in track: a straight run along -X between two walls, with a
    /// rock and a crate to steer around.
    #[must_use]
    pub fn demo() -> Self {
        let mut track = Self::new(
            "Track1",
            LineDescription {
                center: Vec3::new(-4.0, 0.0, 0.0),
                size: Vec3::new(1.0, 4.0, 10.0),
            },
            LineDescription {
                center: Vec3::new(-70.0, 0.0, 0.0),
                size: Vec3::new(1.0, 4.0, 10.0),
            },
        );

        let names = ["Waypoint1", "Waypoint2", "Waypoint3", "Waypoint4"];
        track.waypoints = names
            .iter()
            .enumerate()
            .map(|(i, name)| WaypointDescription {
                name: (*name).to_string(),
                position: Vec3::new(-20.0 * (i as f32 + 1.0), 0.0, 0.0),
                next: names.get(i + 1).map(|next| (*next).to_string()),
            })
            .collect();
        track.first_waypoint = Some(names[0].to_string());

        track.obstacles = vec![
            ObstacleDescription {
                name: "Rock".to_string(),
                center: Vec3::new(-25.0, 0.0, 1.5),
                size: Vec3::new(2.0, 1.0, 2.0),
                layer: AgentConfig::OBSTACLE_LAYER,
            },
            ObstacleDescription {
                name: "Crate".to_string(),
                center: Vec3::new(-50.0, 0.0, -1.5),
                size: Vec3::new(2.0, 1.0, 2.0),
                layer: AgentConfig::OBSTACLE_LAYER,
            },
        ];

        track.walls = [("NorthWall", 6.0), ("SouthWall", -6.0)]
            .into_iter()
            .map(|(name, z)| ObstacleDescription {
                name: name.to_string(),
                center: Vec3::new(-40.0, 0.0, z),
                size: Vec3::new(100.0, 2.0, 1.0),
                layer: AgentConfig::OBSTACLE_LAYER,
            })
            .collect();

        track
    }

    /// Resolve waypoint names and spawn every volume into a fresh world.
    ///
    /// # Errors
    ///
    /// Returns an error if the track name cannot head a results record, or
    /// if a waypoint name is duplicated or refers to a waypoint that does
    /// not exist
    pub fn build(&self) -> Result<Track, TrackError> {
        if self.name.trim().is_empty() || self.name.contains(['\n', '\r']) {
            return Err(TrackError::InvalidName(self.name.clone()));
        }

        let mut graph = WaypointGraph::new();
        let mut ids: FxHashMap<&str, WaypointId> = FxHashMap::default();
        for waypoint in &self.waypoints {
            let id = graph.add(waypoint.position);
            if ids.insert(waypoint.name.as_str(), id).is_some() {
                return Err(TrackError::DuplicateWaypoint(waypoint.name.clone()));
            }
        }

        let resolve = |name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| TrackError::UnknownWaypoint(name.to_string()))
        };

        for waypoint in &self.waypoints {
            if let Some(next) = &waypoint.next {
                graph.link(resolve(&waypoint.name)?, resolve(next)?);
            }
        }

        let first_waypoint = match &self.first_waypoint {
            Some(name) => Some(resolve(name)?),
            None => (!graph.is_empty()).then_some(WaypointId(0)),
        };

        let mut world = World::new();
        for waypoint in &self.waypoints {
            let id = resolve(&waypoint.name)?;
            let bounds = Aabb::from_center_size(waypoint.position, self.waypoint_trigger_size);
            world.spawn_waypoint_trigger(waypoint.name.clone(), bounds, id);
        }
        for obstacle in &self.obstacles {
            let bounds = Aabb::from_center_size(obstacle.center, obstacle.size);
            world.spawn_volume(obstacle.name.clone(), bounds, ZoneTag::Obstacle, obstacle.layer);
        }
        for wall in &self.walls {
            let bounds = Aabb::from_center_size(wall.center, wall.size);
            world.spawn_volume(wall.name.clone(), bounds, ZoneTag::Untagged, wall.layer);
        }
        world.spawn_volume("StartLine", self.start_line.bounds(), ZoneTag::StartLine, 0);
        world.spawn_volume("FinishLine", self.finish_line.bounds(), ZoneTag::FinishLine, 0);

        log::debug!(
            "Built track {} with {} waypoints and {} volumes",
            self.name,
            graph.len(),
            world.len()
        );

        Ok(Track {
            name: self.name.clone(),
            world,
            graph,
            first_waypoint,
            spawn: Transform::from_position(self.spawn_position),
        })
    }

    /// Save the track as `.ron` or `.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unsupported, serialization fails
    /// or the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TrackError> {
        let path = path.as_ref();
        let text = match format_of(path)? {
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| TrackError::SerializeError(e.to_string()))?,
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| TrackError::SerializeError(e.to_string()))?,
        };
        fs::write(path, text).map_err(|e| TrackError::IoError(e.to_string()))
    }

    /// Load a track from a `.ron` or `.json` file
    ///
    /// # Errors
    ///
    /// Returns an error if the extension is unsupported or the file cannot be
    /// read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrackError> {
        let path = path.as_ref();
        let format = format_of(path)?;
        let content = fs::read_to_string(path).map_err(|e| TrackError::IoError(e.to_string()))?;
        let track: TrackDescription = match format {
            Format::Ron => {
                ron::from_str(&content).map_err(|e| TrackError::DeserializeError(e.to_string()))?
            }
            Format::Json => serde_json::from_str(&content)
                .map_err(|e| TrackError::DeserializeError(e.to_string()))?,
        };
        Ok(track)
    }
}

fn format_of(path: &Path) -> Result<Format, TrackError> {
    Format::of(path).map_err(|e| TrackError::UnsupportedFormat(e.to_string()))
}

/// A track ready to drive on
#[derive(Debug)]
pub struct Track {
    pub name: String,
    pub world: World,
    pub graph: WaypointGraph,
    pub first_waypoint: Option<WaypointId>,
    /// Where the agent starts
    pub spawn: Transform,
}

/// Errors that can occur while loading or building a track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackError {
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
    /// File extension is neither `ron` nor `json`
    UnsupportedFormat(String),
    /// A waypoint reference names no waypoint
    UnknownWaypoint(String),
    /// Two waypoints share a name
    DuplicateWaypoint(String),
    /// Track name is blank or spans several lines
    InvalidName(String),
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
            Self::UnsupportedFormat(e) => write!(f, "{e}"),
            Self::UnknownWaypoint(name) => write!(f, "Unknown waypoint `{name}`"),
            Self::DuplicateWaypoint(name) => write!(f, "Duplicate waypoint `{name}`"),
            Self::InvalidName(name) => write!(f, "Invalid track name {name:?}"),
        }
    }
}

impl std::error::Error for TrackError {}
