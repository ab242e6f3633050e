use lensing::{DiskKind, Vertex};

use crate::compile::{
    ShaderProgram, BACKGROUND_FRAGMENT, DISTORTION_FRAGMENT, FULLSCREEN_VERTEX, MESH_VERTEX,
    OCCLUDER_FRAGMENT, PROCEDURAL_DISK_FRAGMENT, STAR_FRAGMENT, STAR_VERTEX,
    TEXTURED_DISK_FRAGMENT,
};
use crate::error::ShaderCompileError;

use super::context::{DEPTH_FORMAT, SCENE_FORMAT};

/// Bind group layouts shared by both passes.
pub(crate) struct BindLayouts {
    /// Group 0 of the scene pass: `FrameUniforms`.
    pub frame: wgpu::BindGroupLayout,
    /// Group 1 of mesh and star programs: `ObjectUniforms`.
    pub object: wgpu::BindGroupLayout,
    /// Texture plus sampler, used by the sky (group 1) and textured disk (group 2).
    pub image: wgpu::BindGroupLayout,
    /// Group 0 of the lens pass: `LensUniforms`, scene texture and sampler.
    pub lens: wgpu::BindGroupLayout,
}

impl BindLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let object = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        });
        let image = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("image layout"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let lens = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lens layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1),
                sampler_entry(2),
            ],
        });
        Self {
            frame,
            object,
            image,
            lens,
        }
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

/// Depth behaviour of a scene-pass draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DepthMode {
    /// Drawn first, behind everything, never written.
    Backdrop,
    /// Writes depth so later draws are hidden behind it.
    Opaque,
    /// Tested against depth but leaves it untouched.
    Additive,
}

impl DepthMode {
    fn state(self) -> wgpu::DepthStencilState {
        let (depth_write_enabled, depth_compare) = match self {
            DepthMode::Backdrop => (false, wgpu::CompareFunction::Always),
            DepthMode::Opaque => (true, wgpu::CompareFunction::Less),
            DepthMode::Additive => (false, wgpu::CompareFunction::Less),
        };
        wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled,
            depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }

    fn blend(self) -> Option<wgpu::BlendState> {
        match self {
            DepthMode::Backdrop | DepthMode::Opaque => Some(wgpu::BlendState::REPLACE),
            DepthMode::Additive => Some(ADDITIVE_BLEND),
        }
    }
}

/// `src * src_alpha + dst`; destination alpha is kept.
const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::Zero,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

const MESH_ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
const STAR_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

fn mesh_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &MESH_ATTRIBUTES,
    }
}

fn star_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &STAR_ATTRIBUTES,
    }
}

struct PipelineSpec<'a> {
    label: &'static str,
    vertex: &'a wgpu::ShaderModule,
    fragment: &'a wgpu::ShaderModule,
    buffers: &'a [wgpu::VertexBufferLayout<'a>],
    topology: wgpu::PrimitiveTopology,
    groups: &'a [&'a wgpu::BindGroupLayout],
    depth: Option<DepthMode>,
    format: wgpu::TextureFormat,
    sample_count: u32,
}

fn build_pipeline(device: &wgpu::Device, spec: PipelineSpec<'_>) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(spec.label),
        bind_group_layouts: spec.groups,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(spec.label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: spec.vertex,
            entry_point: Some("main"),
            buffers: spec.buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: spec.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: spec.depth.map(DepthMode::state),
        multisample: wgpu::MultisampleState {
            count: spec.sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: spec.fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: spec.format,
                blend: spec.depth.and_then(DepthMode::blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

/// Every pass-1 pipeline, compiled up front.
pub(crate) struct ScenePipelines {
    /// Only present for the equirectangular background.
    pub background: Option<wgpu::RenderPipeline>,
    pub occluder: wgpu::RenderPipeline,
    pub stars: wgpu::RenderPipeline,
    pub disk: wgpu::RenderPipeline,
}

impl ScenePipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &BindLayouts,
        sample_count: u32,
        textured_background: bool,
        disk_kind: DiskKind,
    ) -> Result<Self, ShaderCompileError> {
        let compile = |program: &ShaderProgram| program.compile(device);
        let fullscreen = compile(&FULLSCREEN_VERTEX)?;
        let mesh_vertex = compile(&MESH_VERTEX)?;
        let mesh_buffers = [mesh_buffer_layout()];
        let star_buffers = [star_buffer_layout()];

        let scene = |label: &'static str,
                     vertex: &wgpu::ShaderModule,
                     fragment: &wgpu::ShaderModule,
                     buffers: &[wgpu::VertexBufferLayout<'_>],
                     topology: wgpu::PrimitiveTopology,
                     groups: &[&wgpu::BindGroupLayout],
                     depth: DepthMode| {
            build_pipeline(
                device,
                PipelineSpec {
                    label,
                    vertex,
                    fragment,
                    buffers,
                    topology,
                    groups,
                    depth: Some(depth),
                    format: SCENE_FORMAT,
                    sample_count,
                },
            )
        };

        let background = if textured_background {
            let fragment = compile(&BACKGROUND_FRAGMENT)?;
            Some(scene(
                "background pipeline",
                &fullscreen,
                &fragment,
                &[],
                wgpu::PrimitiveTopology::TriangleList,
                &[&layouts.frame, &layouts.image],
                DepthMode::Backdrop,
            ))
        } else {
            None
        };

        let occluder_fragment = compile(&OCCLUDER_FRAGMENT)?;
        let occluder = scene(
            "occluder pipeline",
            &mesh_vertex,
            &occluder_fragment,
            &mesh_buffers,
            wgpu::PrimitiveTopology::TriangleList,
            &[&layouts.frame, &layouts.object],
            DepthMode::Opaque,
        );

        let star_vertex = compile(&STAR_VERTEX)?;
        let star_fragment = compile(&STAR_FRAGMENT)?;
        let stars = scene(
            "star pipeline",
            &star_vertex,
            &star_fragment,
            &star_buffers,
            wgpu::PrimitiveTopology::TriangleStrip,
            &[&layouts.frame, &layouts.object],
            DepthMode::Additive,
        );

        let disk = match disk_kind {
            DiskKind::Procedural => {
                let fragment = compile(&PROCEDURAL_DISK_FRAGMENT)?;
                scene(
                    "procedural disk pipeline",
                    &mesh_vertex,
                    &fragment,
                    &mesh_buffers,
                    wgpu::PrimitiveTopology::TriangleList,
                    &[&layouts.frame, &layouts.object],
                    DepthMode::Additive,
                )
            }
            DiskKind::Textured => {
                let fragment = compile(&TEXTURED_DISK_FRAGMENT)?;
                scene(
                    "textured disk pipeline",
                    &mesh_vertex,
                    &fragment,
                    &mesh_buffers,
                    wgpu::PrimitiveTopology::TriangleList,
                    &[&layouts.frame, &layouts.object, &layouts.image],
                    DepthMode::Additive,
                )
            }
        };

        Ok(Self {
            background,
            occluder,
            stars,
            disk,
        })
    }
}

/// Pass 2: full-screen distortion into the swapchain.
pub(crate) fn lens_pipeline(
    device: &wgpu::Device,
    layouts: &BindLayouts,
    surface_format: wgpu::TextureFormat,
) -> Result<wgpu::RenderPipeline, ShaderCompileError> {
    let vertex = FULLSCREEN_VERTEX.compile(device)?;
    let fragment = DISTORTION_FRAGMENT.compile(device)?;
    Ok(build_pipeline(
        device,
        PipelineSpec {
            label: "lens pipeline",
            vertex: &vertex,
            fragment: &fragment,
            buffers: &[],
            topology: wgpu::PrimitiveTopology::TriangleList,
            groups: &[&layouts.lens],
            depth: None,
            format: surface_format,
            sample_count: 1,
        },
    ))
}
