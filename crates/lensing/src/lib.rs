//! Renderer-independent core of the lens visualiser: parameters, camera,
//! scene construction, the per-frame planner and CPU references for both
//! shading programs.

pub mod camera;
pub mod clock;
pub mod disk;
pub mod distortion;
pub mod environment;
pub mod frame;
pub mod noise;
pub mod params;
pub mod scene;

pub use camera::{CameraUniform, OrbitCamera};
pub use clock::FrameClock;
pub use distortion::{composite, Lens, LensSample};
pub use environment::{Background, DiskStyle, Environment};
pub use frame::{FramePlan, PipelineState};
pub use params::{
    guard_mass, SharedParameters, SimulationParameters, ViewportSize, DEFAULT_MASS, MASS_RANGE,
    MIN_MASS,
};
pub use scene::{DiskKind, Mesh, SceneBuilder, SceneGraph, SceneSettings, Starfield, Vertex};
