//! wgpu/winit renderer for the chronolens gravitational lens.
//!
//! ```text
//!   host (chronolens)
//!      │ RendererConfig + SharedParameters
//!      ▼
//!   FrameLoop::start ──▶ render thread ──▶ winit event loop
//!                              │
//!                              ├─ PipelineState::begin_frame_at ─▶ FramePlan
//!                              └─ GpuState::render_frame
//!                                     ├─ pass 1: sky, occluder, stars, disk ─▶ offscreen target
//!                                     └─ pass 2: lens distortion ─▶ swapchain
//! ```
//!
//! All GPU resources live on the render thread and are released when the
//! [`FrameLoop`] is stopped or dropped. Window input comes back to the host
//! as [`WindowSignal`]s; the host owns the parameter values.

pub mod compile;
mod error;
mod gpu;
mod runtime;
mod types;
mod window;

pub use compile::{validate_builtin_programs, ShaderProgram, ALL_PROGRAMS};
pub use error::{RenderInitError, ShaderCompileError};
pub use runtime::{effective_fps, FrameScheduler, SOFTWARE_FPS_CAP};
pub use types::{AdapterProfile, Antialiasing, GpuPowerPreference, RendererConfig};
pub use window::{FrameLoop, WindowSignal, MASS_STEP, MASS_STEP_LARGE};
