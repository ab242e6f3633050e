use bytemuck::Zeroable;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;

use lensing::{Background, DiskStyle, FramePlan, SceneBuilder, SceneGraph, ViewportSize};

use crate::error::RenderInitError;
use crate::types::{AdapterProfile, RendererConfig};

use super::context::GpuContext;
use super::pipeline::{lens_pipeline, BindLayouts, ScenePipelines};
use super::target::OffscreenTarget;
use super::textures::{ImageTexture, Wrap};
use super::uniforms::{FrameUniforms, LensUniforms, ObjectUniforms};

/// A size-bound resource is recreated only when the planned viewport differs
/// from the size it was built for. Empty viewports never trigger a rebuild.
fn needs_rebuild(current: ViewportSize, plan: &FramePlan) -> bool {
    !plan.viewport.is_empty() && current != plan.viewport
}

/// Index and vertex buffers for one static mesh.
struct MeshBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn new(device: &wgpu::Device, label: &str, mesh: &lensing::Mesh) -> Self {
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vertices")),
            contents: mesh.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} indices")),
            contents: mesh.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertices,
            indices,
            index_count: mesh.indices.len() as u32,
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// A uniform buffer with its bind group.
struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformSlot {
    fn new<T: bytemuck::Pod>(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        label: &str,
        initial: &T,
    ) -> Self {
        let buffer = uniform_buffer(device, label, initial);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, bind_group }
    }

    fn write<T: bytemuck::Pod>(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }
}

fn uniform_buffer<T: bytemuck::Pod>(device: &wgpu::Device, label: &str, initial: &T) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::bytes_of(initial),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

fn image_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    texture: &ImageTexture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
    })
}

/// Owns every GPU resource of a running pipeline.
///
/// Built all at once by [`GpuState::new`]; if any step fails nothing is kept.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: BindLayouts,
    scene_pipelines: ScenePipelines,
    lens_pipeline: wgpu::RenderPipeline,

    clear_color: wgpu::Color,
    sky: Option<wgpu::BindGroup>,
    disk_texture: Option<wgpu::BindGroup>,
    // Kept alive for the bind groups above.
    _textures: Vec<ImageTexture>,

    frame_uniforms: UniformSlot,
    occluder_uniforms: UniformSlot,
    star_uniforms: UniformSlot,
    disk_uniforms: UniformSlot,
    lens_uniforms: wgpu::Buffer,

    occluder: MeshBuffers,
    disk: MeshBuffers,
    stars: wgpu::Buffer,
    star_count: u32,

    scene_sampler: wgpu::Sampler,
    offscreen: OffscreenTarget,
    lens_bind_group: wgpu::BindGroup,
}

impl GpuState {
    /// Builds the scene graph, uploads it and compiles both passes.
    pub(crate) fn new<T>(
        target: &T,
        initial_size: ViewportSize,
        config: &RendererConfig,
    ) -> Result<(Self, SceneGraph), RenderInitError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(
            target,
            initial_size,
            config.antialiasing,
            config.power,
            config.vsync,
        )?;
        let device = &context.device;
        let queue = &context.queue;
        let max_dimension = context.adapter_profile.max_texture_dimension;
        let layouts = BindLayouts::new(device);

        let scene = SceneBuilder::new(config.scene.clone(), config.environment.disk.clone()).build();

        let mut textures = Vec::new();
        let (clear_color, sky) = match &config.environment.background {
            Background::Solid { color } => (
                wgpu::Color {
                    r: f64::from(color[0]),
                    g: f64::from(color[1]),
                    b: f64::from(color[2]),
                    a: 1.0,
                },
                None,
            ),
            Background::Equirectangular { image } => {
                let texture = ImageTexture::load(device, queue, image, Wrap::Repeat, max_dimension)?;
                let group = image_bind_group(device, &layouts.image, "sky bind group", &texture);
                textures.push(texture);
                (wgpu::Color::BLACK, Some(group))
            }
        };
        let disk_texture = match &config.environment.disk {
            DiskStyle::Procedural { .. } => None,
            DiskStyle::TexturedTorus { texture, .. } => {
                let texture =
                    ImageTexture::load(device, queue, texture, Wrap::Clamp, max_dimension)?;
                let group = image_bind_group(device, &layouts.image, "disk texture bind group", &texture);
                textures.push(texture);
                Some(group)
            }
        };

        let scene_pipelines = ScenePipelines::new(
            device,
            &layouts,
            context.sample_count,
            sky.is_some(),
            scene.disk_kind,
        )?;
        let lens_pipeline = lens_pipeline(device, &layouts, context.surface_format)?;

        let frame_uniforms =
            UniformSlot::new(device, &layouts.frame, "frame uniforms", &FrameUniforms::zeroed());
        let occluder_uniforms = UniformSlot::new(
            device,
            &layouts.object,
            "occluder uniforms",
            &ObjectUniforms::new(glam::Mat4::IDENTITY, [1.0, 0.0, 0.0, 0.0]),
        );
        let star_uniforms = UniformSlot::new(
            device,
            &layouts.object,
            "star uniforms",
            &ObjectUniforms::stars(scene.star_model()),
        );
        let disk_uniforms = UniformSlot::new(
            device,
            &layouts.object,
            "disk uniforms",
            &ObjectUniforms::new(scene.disk_model(), [1.0, 0.0, 0.0, 0.0]),
        );
        let size = context.size;
        // Shares a bind group with the scene texture, rebuilt on every resize.
        let lens_uniforms = uniform_buffer(
            device,
            "lens uniforms",
            &LensUniforms::new([size.width as f32, size.height as f32], 0.0),
        );

        let occluder = MeshBuffers::new(device, "occluder", &scene.occluder);
        let disk = MeshBuffers::new(device, "disk", &scene.disk);
        let stars = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("star instances"),
            contents: scene.stars.bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let star_count = scene.stars.len() as u32;

        let scene_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("scene sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let offscreen = OffscreenTarget::new(device, size, context.sample_count);
        let lens_bind_group = lens_bind_group(
            device,
            &layouts.lens,
            &lens_uniforms,
            &offscreen,
            &scene_sampler,
        );

        tracing::info!(
            adapter = %context.adapter_profile.name,
            stars = star_count,
            occluder_triangles = scene.occluder.triangle_count(),
            disk_triangles = scene.disk.triangle_count(),
            sample_count = context.sample_count,
            "render pipeline ready"
        );

        let state = Self {
            context,
            layouts,
            scene_pipelines,
            lens_pipeline,
            clear_color,
            sky,
            disk_texture,
            _textures: textures,
            frame_uniforms,
            occluder_uniforms,
            star_uniforms,
            disk_uniforms,
            lens_uniforms,
            occluder,
            disk,
            stars,
            star_count,
            scene_sampler,
            offscreen,
            lens_bind_group,
        };
        Ok((state, scene))
    }

    pub(crate) fn size(&self) -> ViewportSize {
        self.context.size
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    /// Draws pass 1 into the offscreen target and pass 2 into the swapchain.
    pub(crate) fn render_frame(&mut self, plan: &FramePlan) -> Result<(), wgpu::SurfaceError> {
        if plan.viewport.is_empty() {
            return Ok(());
        }
        // Swapchain and offscreen target change together, before any pass.
        if needs_rebuild(self.context.size, plan) {
            self.context.resize(plan.viewport);
        }
        if needs_rebuild(self.offscreen.size(), plan) {
            self.rebuild_offscreen(plan.viewport);
        }

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let queue = &self.context.queue;
        self.frame_uniforms
            .write(queue, &FrameUniforms::from_plan(plan));
        self.star_uniforms
            .write(queue, &ObjectUniforms::stars(plan.star_model));
        self.disk_uniforms
            .write(queue, &ObjectUniforms::new(plan.disk_model, [1.0, 0.0, 0.0, 0.0]));
        queue.write_buffer(
            &self.lens_uniforms,
            0,
            bytemuck::bytes_of(&LensUniforms::new(plan.resolution(), plan.mass)),
        );

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        self.encode_scene(&mut encoder, plan.show_disk);
        self.encode_lens(&mut encoder, &view);

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    fn rebuild_offscreen(&mut self, size: ViewportSize) {
        tracing::debug!(width = size.width, height = size.height, "rebuilding offscreen target");
        self.offscreen = OffscreenTarget::new(&self.context.device, size, self.context.sample_count);
        self.lens_bind_group = lens_bind_group(
            &self.context.device,
            &self.layouts.lens,
            &self.lens_uniforms,
            &self.offscreen,
            &self.scene_sampler,
        );
    }

    fn encode_scene(&self, encoder: &mut wgpu::CommandEncoder, show_disk: bool) {
        let (attachment, resolve_target) = self.offscreen.color_attachment();
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.offscreen.depth_view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        pass.set_bind_group(0, &self.frame_uniforms.bind_group, &[]);

        if let (Some(pipeline), Some(sky)) = (&self.scene_pipelines.background, &self.sky) {
            pass.set_pipeline(pipeline);
            pass.set_bind_group(1, sky, &[]);
            pass.draw(0..3, 0..1);
        }

        pass.set_pipeline(&self.scene_pipelines.occluder);
        pass.set_bind_group(1, &self.occluder_uniforms.bind_group, &[]);
        self.occluder.draw(&mut pass);

        if self.star_count > 0 {
            pass.set_pipeline(&self.scene_pipelines.stars);
            pass.set_bind_group(1, &self.star_uniforms.bind_group, &[]);
            pass.set_vertex_buffer(0, self.stars.slice(..));
            pass.draw(0..4, 0..self.star_count);
        }

        if show_disk {
            pass.set_pipeline(&self.scene_pipelines.disk);
            pass.set_bind_group(1, &self.disk_uniforms.bind_group, &[]);
            if let Some(disk_texture) = &self.disk_texture {
                pass.set_bind_group(2, disk_texture, &[]);
            }
            self.disk.draw(&mut pass);
        }
    }

    fn encode_lens(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lens pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.lens_pipeline);
        pass.set_bind_group(0, &self.lens_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn lens_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    offscreen: &OffscreenTarget,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("lens bind group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(offscreen.sample_view()),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;
    use lensing::OrbitCamera;

    fn plan(width: u32, height: u32, resized: bool) -> FramePlan {
        FramePlan {
            viewport: ViewportSize::new(width, height),
            resized,
            mass: 50.0,
            show_disk: true,
            time: 0.0,
            camera: OrbitCamera::new(1.0).uniform(),
            disk_model: Mat4::IDENTITY,
            star_model: Mat4::IDENTITY,
        }
    }

    #[test]
    fn first_frame_reuses_target_built_at_start() {
        // The first plan is always flagged as resized.
        assert!(!needs_rebuild(ViewportSize::new(800, 600), &plan(800, 600, true)));
    }

    #[test]
    fn size_change_triggers_rebuild() {
        assert!(needs_rebuild(ViewportSize::new(800, 600), &plan(1920, 1080, true)));
        assert!(needs_rebuild(ViewportSize::new(800, 600), &plan(800, 601, false)));
    }

    #[test]
    fn unchanged_size_keeps_target() {
        assert!(!needs_rebuild(ViewportSize::new(1280, 720), &plan(1280, 720, false)));
    }

    #[test]
    fn empty_viewport_never_rebuilds() {
        assert!(!needs_rebuild(ViewportSize::new(800, 600), &plan(0, 600, false)));
    }
}
