//! GPU side of the two-pass lens renderer.
//!
//! - `context` owns the wgpu instance, device and swapchain.
//! - `target` is the offscreen colour/depth target written by the scene pass.
//! - `pipeline` holds bind group layouts and every render pipeline.
//! - `uniforms` mirrors the GLSL uniform blocks.
//! - `textures` loads background and disk images.
//! - `state` glues everything together behind `GpuState`, driven by `window`.

mod context;
mod pipeline;
mod state;
mod target;
mod textures;
mod uniforms;

pub(crate) use state::GpuState;
