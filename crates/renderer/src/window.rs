use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use glam::Vec2;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use lensing::{PipelineState, SharedParameters, ViewportSize};

use crate::error::RenderInitError;
use crate::gpu::GpuState;
use crate::runtime::{effective_fps, FrameScheduler};
use crate::types::RendererConfig;

/// Mass change per key press; held Shift multiplies it.
pub const MASS_STEP: f32 = 1.0;
pub const MASS_STEP_LARGE: f32 = 10.0;

/// Pixels of trackpad scroll treated as one wheel notch.
const PIXELS_PER_ZOOM_STEP: f64 = 100.0;

/// Requests sent from the window thread to the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowSignal {
    /// Change the mass by the given amount.
    AdjustMass(f32),
    ToggleDisk,
    /// Restore default parameters and the camera.
    Reset,
    /// The window was closed; the loop has exited or is about to.
    Closed,
}

#[derive(Debug, Clone, Copy)]
enum WindowCommand {
    ResetCamera,
    Shutdown,
}

/// Handle to a running render pipeline and its window thread.
///
/// Dropping the handle stops the loop and releases every GPU resource.
pub struct FrameLoop {
    proxy: EventLoopProxy<WindowCommand>,
    signals: Receiver<WindowSignal>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl FrameLoop {
    /// Opens the window, builds the scene and both passes, then starts
    /// drawing. Returns once the first frame has been scheduled or
    /// construction failed; on failure nothing is left running.
    pub fn start(config: RendererConfig) -> Result<Self, RenderInitError> {
        let (ready_tx, ready_rx) = bounded(1);
        let (signal_tx, signal_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("chronolens-render".into())
            .spawn(move || run_window_thread(config, ready_tx, signal_tx))
            .map_err(|err| RenderInitError::Window(format!("failed to spawn render thread: {err}")))?;

        let proxy = match ready_rx.recv() {
            Ok(Ok(proxy)) => proxy,
            Ok(Err(err)) => {
                let _ = handle.join();
                return Err(err);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(RenderInitError::Window(
                    "render thread exited during start-up".into(),
                ));
            }
        };

        tracing::info!("render pipeline started");
        Ok(Self {
            proxy,
            signals: signal_rx,
            join_handle: Some(handle),
        })
    }

    /// Puts the camera back at its canonical orbit and drops pending motion.
    pub fn reset_camera(&self) -> Result<()> {
        self.proxy
            .send_event(WindowCommand::ResetCamera)
            .map_err(|_| anyhow!("render loop is no longer running"))
    }

    /// Waits up to `timeout` for the next window signal. `None` on timeout;
    /// `Some(Closed)` once the window thread is gone.
    pub fn recv_signal_timeout(&self, timeout: Duration) -> Option<WindowSignal> {
        match self.signals.recv_timeout(timeout) {
            Ok(signal) => Some(signal),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(WindowSignal::Closed),
        }
    }

    /// Stops the loop and waits for the GPU resources to be released.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("render thread panicked: {err:?}"))??;
            tracing::info!("render pipeline stopped");
        }
        Ok(())
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "render loop ended with an error");
        }
    }
}

/// Left-drag tracking for orbiting.
#[derive(Debug, Default)]
struct PointerState {
    position: Option<PhysicalPosition<f64>>,
    dragging: bool,
}

impl PointerState {
    /// Records the new cursor position and returns the drag delta, if any.
    fn moved(&mut self, position: PhysicalPosition<f64>) -> Option<Vec2> {
        let previous = self.position.replace(position);
        if !self.dragging {
            return None;
        }
        let previous = previous?;
        Some(Vec2::new(
            (position.x - previous.x) as f32,
            (position.y - previous.y) as f32,
        ))
    }

    fn button(&mut self, state: ElementState) {
        self.dragging = state == ElementState::Pressed;
    }
}

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq)]
enum KeyAction {
    Signal(WindowSignal),
    Close,
}

fn key_action(key: &Key, shift: bool) -> Option<KeyAction> {
    let step = if shift { MASS_STEP_LARGE } else { MASS_STEP };
    let signal = match key {
        Key::Named(NamedKey::Escape) => return Some(KeyAction::Close),
        Key::Named(NamedKey::ArrowUp) => WindowSignal::AdjustMass(step),
        Key::Named(NamedKey::ArrowDown) => WindowSignal::AdjustMass(-step),
        Key::Character(text) => match text.as_str() {
            "+" | "=" => WindowSignal::AdjustMass(step),
            "-" | "_" => WindowSignal::AdjustMass(-step),
            "d" | "D" => WindowSignal::ToggleDisk,
            "r" | "R" => WindowSignal::Reset,
            _ => return None,
        },
        _ => return None,
    };
    Some(KeyAction::Signal(signal))
}

fn zoom_steps(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(position) => (position.y / PIXELS_PER_ZOOM_STEP) as f32,
    }
}

fn viewport_of(size: PhysicalSize<u32>) -> ViewportSize {
    ViewportSize::new(size.width, size.height)
}

/// Everything owned by the render thread between `start` and `stop`.
struct LoopState {
    // Declared before `window` so the surface is dropped first.
    gpu: GpuState,
    window: Arc<Window>,
    pipeline: PipelineState,
    parameters: SharedParameters,
    scheduler: FrameScheduler,
    /// Latest size reported by the window system, applied at the top of the
    /// next frame.
    viewport: ViewportSize,
    pointer: PointerState,
    shift: bool,
    skipping: bool,
    mass_guarded: bool,
}

impl LoopState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self, RenderInitError> {
        let viewport = viewport_of(window.inner_size());
        let (gpu, scene) = GpuState::new(window.as_ref(), viewport, config)?;
        let pipeline = PipelineState::new(scene, gpu.size());

        let profile = gpu.adapter_profile();
        let fps = effective_fps(config.target_fps, profile);
        if config.target_fps.is_none() && fps.is_some() {
            tracing::warn!(
                adapter = %profile.name,
                cap = ?fps,
                "software rasterizer detected; capping frame rate (override with --fps)"
            );
        }

        Ok(Self {
            gpu,
            window,
            pipeline,
            parameters: config.parameters.clone(),
            scheduler: FrameScheduler::new(fps),
            viewport,
            pointer: PointerState::default(),
            shift: false,
            skipping: false,
            mass_guarded: false,
        })
    }

    fn redraw(&mut self, now: Instant) -> Result<(), wgpu::SurfaceError> {
        self.scheduler.mark_rendered(now);

        // One copy of the parameters per frame.
        let params = self.parameters.load();
        let guarded = params.effective_mass() != params.mass;
        if guarded && !self.mass_guarded {
            tracing::warn!(
                mass = params.mass,
                used = params.effective_mass(),
                "mass must be positive; using the minimum instead"
            );
        }
        self.mass_guarded = guarded;
        let Some(plan) = self.pipeline.begin_frame_at(params, self.viewport, now) else {
            if !self.skipping {
                tracing::warn!("viewport has zero area; skipping frames until resized");
                self.skipping = true;
            }
            return Ok(());
        };
        if self.skipping {
            tracing::debug!("viewport restored; resuming frames");
            self.skipping = false;
        }
        if plan.resized {
            tracing::debug!(
                width = plan.viewport.width,
                height = plan.viewport.height,
                "applying resize"
            );
        }
        self.gpu.render_frame(&plan)
    }
}

fn run_window_thread(
    config: RendererConfig,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>, RenderInitError>>,
    signal_tx: Sender<WindowSignal>,
) -> Result<()> {
    let fail = |err: RenderInitError| {
        let message = err.to_string();
        let _ = ready_tx.send(Err(err));
        Err(anyhow!(message))
    };

    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }
    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            return fail(RenderInitError::Window(format!(
                "failed to create event loop: {err}"
            )))
        }
    };
    let proxy = event_loop.create_proxy();

    let (width, height) = config.window_size;
    let window = match WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(width.max(1), height.max(1)))
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(err) => {
            return fail(RenderInitError::Window(format!(
                "failed to create window: {err}"
            )))
        }
    };

    let mut state = match LoopState::new(window, &config) {
        Ok(state) => state,
        Err(err) => return fail(err),
    };
    state.window.request_redraw();

    let _ = ready_tx.send(Ok(proxy));

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(WindowCommand::ResetCamera) => {
            tracing::debug!("camera reset");
            state.pipeline.reset_camera();
            state.window.request_redraw();
        }
        Event::UserEvent(WindowCommand::Shutdown) => {
            elwt.exit();
        }
        Event::WindowEvent { window_id, event } if window_id == state.window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                let _ = signal_tx.send(WindowSignal::Closed);
                elwt.exit();
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                state.shift = modifiers.state().shift_key();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                match key_action(&event.logical_key, state.shift) {
                    Some(KeyAction::Close) => {
                        let _ = signal_tx.send(WindowSignal::Closed);
                        elwt.exit();
                    }
                    Some(KeyAction::Signal(signal)) if !event.repeat || is_mass(signal) => {
                        let _ = signal_tx.send(signal);
                    }
                    _ => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(delta) = state.pointer.moved(position) {
                    let height = state.viewport.height as f32;
                    state.pipeline.camera_mut().orbit(delta, height);
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => {
                state.pointer.button(button_state);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                state.pipeline.camera_mut().zoom(zoom_steps(delta));
            }
            WindowEvent::Resized(new_size) => {
                state.viewport = viewport_of(new_size);
                state.window.request_redraw();
            }
            WindowEvent::RedrawRequested => match state.redraw(Instant::now()) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    tracing::debug!("surface lost or outdated; reconfiguring");
                    state.gpu.reconfigure();
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    tracing::error!("surface out of memory; stopping render loop");
                    let _ = signal_tx.send(WindowSignal::Closed);
                    elwt.exit();
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    tracing::warn!("surface timeout; retrying next frame");
                }
                Err(other) => {
                    tracing::warn!(error = ?other, "surface error; retrying next frame");
                }
            },
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if state.scheduler.ready_for_frame(now) {
                tracing::trace!("scheduler: issuing redraw now");
                state.window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = state.scheduler.next_deadline() {
                let ms = deadline.saturating_duration_since(now).as_millis();
                tracing::trace!(deadline_ms = ms, "scheduler: waiting until next frame");
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

fn is_mass(signal: WindowSignal) -> bool {
    matches!(signal, WindowSignal::AdjustMass(_))
}
