//! Entity storage for track volumes and the agent transform

mod components;
mod world;

pub use components::{
    Aabb, Collider, Layer, Name, Space, Transform, TransformBackend, WaypointTrigger,
};
pub use world::World;
