//! Simulation and agent configuration
//!
//! Configs are plain serde structs. Every field has a default, so a config
//! file only needs the values it changes:
//!
//! ```ron
//! (
//!     controller: fuzzy,
//!     agent: (move_speed: 12.0),
//! )
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::ai::LayerMask;
use crate::core::ZoneTag;

/// Which decision strategy drives the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    #[default]
    Fsm,
    Fuzzy,
}

impl ControllerKind {
    /// Name written into result records
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Fsm => "FSM",
            Self::Fuzzy => "Fuzzy Logic",
        }
    }
}

impl FromStr for ControllerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fsm" => Ok(Self::Fsm),
            "fuzzy" => Ok(Self::Fuzzy),
            other => Err(ConfigError::Invalid(format!(
                "unknown controller `{other}` (expected `fsm` or `fuzzy`)"
            ))),
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A box-shaped sensing volume in the agent's local frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorVolume {
    /// Center offset from the agent origin
    pub offset: Vec3,
    /// Full size along local axes
    pub size: Vec3,
}

impl SensorVolume {
    #[must_use]
    pub const fn new(offset: Vec3, size: Vec3) -> Self {
        Self { offset, size }
    }
}

/// Placement and filtering of the three proximity sensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorLayout {
    pub front: SensorVolume,
    pub left: SensorVolume,
    pub right: SensorVolume,
    /// Tag the front sensor reacts to
    pub front_tag: ZoneTag,
    /// Layers the side sensors react to
    pub side_layers: LayerMask,
}

impl Default for SensorLayout {
    fn default() -> Self {
        Self {
            front: SensorVolume::new(Vec3::new(-2.0, 0.0, 0.0), Vec3::new(3.0, 1.0, 1.28)),
            left: SensorVolume::new(Vec3::new(0.0, 0.0, -1.0), Vec3::ONE),
            right: SensorVolume::new(Vec3::new(0.0, 0.0, 1.0), Vec3::ONE),
            front_tag: ZoneTag::Obstacle,
            side_layers: LayerMask::from_layer(AgentConfig::OBSTACLE_LAYER),
        }
    }
}

/// Tuning of a single navigation agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Forward speed in units per second
    pub move_speed: f32,
    /// Lateral speed at full fuzzy turn, units per second
    pub turn_speed: f32,
    /// Seconds between waypoint reorientations
    pub time_to_rot: f32,
    /// Size of the agent body
    pub box_size: Vec3,
    /// Local point front clearance is measured from
    pub front_probe: Vec3,
    /// Local point left clearance is measured from
    pub left_probe: Vec3,
    /// Local point right clearance is measured from
    pub right_probe: Vec3,
    pub sensors: SensorLayout,
}

impl AgentConfig {
    /// Layer obstacles and walls are placed on by default
    pub const OBSTACLE_LAYER: u32 = 6;

    /// Half of the body's x extent, added to avoidance shifts
    #[must_use]
    pub fn half_width(&self) -> f32 {
        self.box_size.x / 2.0
    }

    pub fn with_move_speed(mut self, move_speed: f32) -> Self {
        self.move_speed = move_speed;
        self
    }

    pub fn with_turn_speed(mut self, turn_speed: f32) -> Self {
        self.turn_speed = turn_speed;
        self
    }

    pub fn with_time_to_rot(mut self, time_to_rot: f32) -> Self {
        self.time_to_rot = time_to_rot;
        self
    }

    pub fn with_box_size(mut self, box_size: Vec3) -> Self {
        self.box_size = box_size;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            move_speed: 10.0,
            turn_speed: 5.0,
            time_to_rot: 5.0,
            box_size: Vec3::new(2.0, 1.0, 1.0),
            front_probe: Vec3::new(-1.0, 0.0, 0.0),
            left_probe: Vec3::new(0.0, 0.0, -0.5),
            right_probe: Vec3::new(0.0, 0.0, 0.5),
            sensors: SensorLayout::default(),
        }
    }
}

/// Top-level simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub controller: ControllerKind,
    pub agent: AgentConfig,
    /// Seconds per simulation tick
    pub fixed_timestep: f32,
    /// Upper bound on ticks before a run is abandoned
    pub max_ticks: u64,
    /// Results log path
    pub results_path: PathBuf,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            controller: ControllerKind::Fsm,
            agent: AgentConfig::default(),
            fixed_timestep: 0.02,
            max_ticks: 30_000,
            results_path: PathBuf::from(crate::core::ResultsLog::DEFAULT_FILE_NAME),
        }
    }
}

impl SimConfig {
    pub fn with_controller(mut self, controller: ControllerKind) -> Self {
        self.controller = controller;
        self
    }

    pub fn with_agent(mut self, agent: AgentConfig) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_fixed_timestep(mut self, fixed_timestep: f32) -> Self {
        self.fixed_timestep = fixed_timestep;
        self
    }

    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn with_results_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.results_path = path.into();
        self
    }

    /// Reject values the tick loop cannot run with
    ///
    /// # Errors
    ///
    /// Returns an error for a non-positive timestep, or for speeds and
    /// rotation periods that are negative or not finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_timestep.is_finite() || self.fixed_timestep <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "fixed_timestep must be positive, got {}",
                self.fixed_timestep
            )));
        }
        let agent = &self.agent;
        for (field, value) in [
            ("move_speed", agent.move_speed),
            ("turn_speed", agent.turn_speed),
            ("time_to_rot", agent.time_to_rot),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{field} must be finite and not negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Load a config from a `.ron` or `.json` file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: SimConfig = match format {
            Format::Ron => {
                ron::from_str(&content).map_err(|e| ConfigError::DeserializeError(e.to_string()))?
            }
            Format::Json => serde_json::from_str(&content)
                .map_err(|e| ConfigError::DeserializeError(e.to_string()))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Save the config as `.ron` or `.json`, chosen by extension
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = match Format::of(path)? {
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::SerializeError(e.to_string()))?,
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| ConfigError::SerializeError(e.to_string()))?,
        };
        fs::write(path, text).map_err(|e| ConfigError::IoError(e.to_string()))
    }
}

/// Serialized file formats understood by config and track loaders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Json,
}

impl Format {
    /// Pick the format from a file extension
    ///
    /// # Errors
    ///
    /// Returns an error for extensions other than `ron` and `json`
    pub fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("ron") => Ok(Self::Ron),
            Some("json") => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }
}

/// Errors that can occur while loading or saving configuration
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
    /// File extension is neither `ron` nor `json`
    UnsupportedFormat(String),
    /// A value is out of range
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
            Self::UnsupportedFormat(ext) => write!(f, "Unsupported file format: `{ext}`"),
            Self::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
