//! GLSL programs for both passes and their validation.
//!
//! Every program is parsed and validated with naga before a module is handed
//! to the device. wgpu would otherwise report a malformed program only through
//! the device error callback, long after the pipeline was assumed to exist.

use std::borrow::Cow;

use wgpu::naga;
use wgpu::naga::ShaderStage;

use crate::error::ShaderCompileError;

/// A GLSL 450 translation unit with a single `main` entry point.
#[derive(Debug, Clone, Copy)]
pub struct ShaderProgram {
    pub label: &'static str,
    pub stage: ShaderStage,
    pub source: &'static str,
}

/// Parses and validates `source`, returning the naga module on success.
pub fn validate(
    label: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<naga::Module, ShaderCompileError> {
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(stage);
    let module = frontend
        .parse(&options, source)
        .map_err(|errors| ShaderCompileError {
            label: label.to_owned(),
            diagnostic: errors.emit_to_string(source),
        })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|error| ShaderCompileError {
            label: label.to_owned(),
            diagnostic: error.emit_to_string(source),
        })?;

    Ok(module)
}

impl ShaderProgram {
    pub fn validate(&self) -> Result<naga::Module, ShaderCompileError> {
        validate(self.label, self.stage, self.source)
    }

    pub(crate) fn compile(
        &self,
        device: &wgpu::Device,
    ) -> Result<wgpu::ShaderModule, ShaderCompileError> {
        self.validate()?;
        tracing::debug!(label = self.label, "compiled shader program");
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(self.label),
            source: wgpu::ShaderSource::Glsl {
                shader: Cow::Borrowed(self.source),
                stage: self.stage,
                defines: &[],
            },
        }))
    }
}

/// Checks every built-in program without touching a GPU.
pub fn validate_builtin_programs() -> Result<usize, ShaderCompileError> {
    for program in ALL_PROGRAMS {
        program.validate()?;
    }
    Ok(ALL_PROGRAMS.len())
}

macro_rules! frame_block {
    () => {
        r"layout(std140, set = 0, binding = 0) uniform FrameParams {
    mat4 view_proj;
    mat4 inv_view_proj;
    vec4 camera_position;
    vec4 viewport;
} frame;
"
    };
}

macro_rules! object_block {
    () => {
        r"layout(std140, set = 1, binding = 0) uniform ObjectParams {
    mat4 model;
    vec4 params;
} object;
"
    };
}

/// Full-screen triangle built from `gl_VertexIndex`; `v_ndc` spans `[-1, 1]²`
/// over the visible area.
pub const FULLSCREEN_VERTEX: ShaderProgram = ShaderProgram {
    label: "fullscreen triangle vertex",
    stage: ShaderStage::Vertex,
    source: r"#version 450
layout(location = 0) out vec2 v_ndc;

void main() {
    float x = float((gl_VertexIndex << 1) & 2);
    float y = float(gl_VertexIndex & 2);
    vec2 pos = vec2(x * 2.0 - 1.0, y * 2.0 - 1.0);
    v_ndc = pos;
    gl_Position = vec4(pos, 0.0, 1.0);
}
",
};

/// Pass 2: bends the offscreen scene toward the screen centre.
pub const DISTORTION_FRAGMENT: ShaderProgram = ShaderProgram {
    label: "lens distortion fragment",
    stage: ShaderStage::Fragment,
    source: r"#version 450
layout(location = 0) in vec2 v_ndc;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform LensParams {
    vec2 resolution;
    float mass;
    float padding;
} lens;
layout(set = 0, binding = 1) uniform texture2D scene_texture;
layout(set = 0, binding = 2) uniform sampler scene_sampler;

const float SCHWARZSCHILD_SCALE = 0.005;

void main() {
    vec2 uv = gl_FragCoord.xy / lens.resolution;
    uv.y = 1.0 - uv.y;

    float aspect = lens.resolution.x / lens.resolution.y;
    vec2 p = uv * 2.0 - vec2(1.0);
    p.x = p.x * aspect;

    float len = length(p);
    float radius = lens.mass * SCHWARZSCHILD_SCALE;
    if (len > 0.0) {
        if (len <= radius) {
            out_color = vec4(0.0, 0.0, 0.0, 1.0);
            return;
        }
        float distortion = radius / len;
        p = p - (p / len) * distortion;
    }

    p.x = p.x / aspect;
    vec2 texel = p * 0.5 + vec2(0.5);
    if (texel.x < 0.0 || texel.x > 1.0 || texel.y < 0.0 || texel.y > 1.0) {
        out_color = vec4(0.0, 0.0, 0.0, 1.0);
        return;
    }

    vec4 color = textureLod(sampler2D(scene_texture, scene_sampler), vec2(texel.x, 1.0 - texel.y), 0.0);
    out_color = vec4(color.rgb, 1.0);
}
",
};

/// Pass 1 background: longitude/latitude lookup of the view ray.
pub const BACKGROUND_FRAGMENT: ShaderProgram = ShaderProgram {
    label: "equirectangular background fragment",
    stage: ShaderStage::Fragment,
    source: concat!(
        r"#version 450
layout(location = 0) in vec2 v_ndc;
layout(location = 0) out vec4 out_color;

",
        frame_block!(),
        r"layout(set = 1, binding = 0) uniform texture2D sky_texture;
layout(set = 1, binding = 1) uniform sampler sky_sampler;

const float PI = 3.14159265358979;

void main() {
    vec4 far_point = frame.inv_view_proj * vec4(v_ndc, 1.0, 1.0);
    vec3 direction = normalize(far_point.xyz / far_point.w - frame.camera_position.xyz);
    float u = atan(direction.z, direction.x) / (2.0 * PI) + 0.5;
    float v = asin(clamp(direction.y, -1.0, 1.0)) / PI + 0.5;
    vec4 color = textureLod(sampler2D(sky_texture, sky_sampler), vec2(u, v), 0.0);
    out_color = vec4(color.rgb, 1.0);
}
"
    ),
};

/// Shared vertex stage for the occluder and both disk styles.
pub const MESH_VERTEX: ShaderProgram = ShaderProgram {
    label: "mesh vertex",
    stage: ShaderStage::Vertex,
    source: concat!(
        r"#version 450
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;
layout(location = 2) in vec2 a_uv;
layout(location = 0) out vec2 v_uv;

",
        frame_block!(),
        object_block!(),
        r"
void main() {
    v_uv = a_uv;
    gl_Position = frame.view_proj * object.model * vec4(a_position, 1.0);
}
"
    ),
};

/// Unlit black; the occluder only exists to cut a silhouette.
pub const OCCLUDER_FRAGMENT: ShaderProgram = ShaderProgram {
    label: "occluder fragment",
    stage: ShaderStage::Fragment,
    source: r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

void main() {
    out_color = vec4(0.0, 0.0, 0.0, 1.0);
}
",
};

/// Screen-space star sprites. Each instance is one star drawn as a
/// four-vertex strip; `object.params.y` is the sprite size in pixels.
pub const STAR_VERTEX: ShaderProgram = ShaderProgram {
    label: "star vertex",
    stage: ShaderStage::Vertex,
    source: concat!(
        r"#version 450
layout(location = 0) in vec3 a_star;

",
        frame_block!(),
        object_block!(),
        r"
void main() {
    vec2 corner = vec2(float(gl_VertexIndex & 1), float((gl_VertexIndex >> 1) & 1)) * 2.0 - vec2(1.0);
    vec4 clip = frame.view_proj * object.model * vec4(a_star, 1.0);
    vec2 extent = vec2(object.params.y) / frame.viewport.xy;
    clip.xy = clip.xy + corner * extent * clip.w;
    gl_Position = clip;
}
"
    ),
};

pub const STAR_FRAGMENT: ShaderProgram = ShaderProgram {
    label: "star fragment",
    stage: ShaderStage::Fragment,
    source: concat!(
        r"#version 450
layout(location = 0) out vec4 out_color;

",
        object_block!(),
        r"
void main() {
    out_color = vec4(1.0, 1.0, 1.0, object.params.x);
}
"
    ),
};

/// Procedural accretion disk. Output is premultiplied by intensity and is
/// blended additively.
pub const PROCEDURAL_DISK_FRAGMENT: ShaderProgram = ShaderProgram {
    label: "procedural disk fragment",
    stage: ShaderStage::Fragment,
    source: concat!(
        r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

",
        frame_block!(),
        r"
vec3 mod289_vec3(vec3 x) {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

vec4 mod289_vec4(vec4 x) {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

vec4 permute(vec4 x) {
    return mod289_vec4((x * 34.0 + vec4(1.0)) * x);
}

vec4 taylor_inv_sqrt(vec4 r) {
    return vec4(1.79284291400159) - r * 0.85373472095314;
}

float snoise(vec3 v) {
    vec2 C = vec2(1.0 / 6.0, 1.0 / 3.0);
    vec4 D = vec4(0.0, 0.5, 1.0, 2.0);

    vec3 i = floor(v + vec3(dot(v, C.yyy)));
    vec3 x0 = v - i + vec3(dot(i, C.xxx));

    vec3 g = step(x0.yzx, x0.xyz);
    vec3 l = vec3(1.0) - g;
    vec3 i1 = min(g.xyz, l.zxy);
    vec3 i2 = max(g.xyz, l.zxy);

    vec3 x1 = x0 - i1 + C.xxx;
    vec3 x2 = x0 - i2 + C.yyy;
    vec3 x3 = x0 - D.yyy;

    i = mod289_vec3(i);
    vec4 p = permute(permute(permute(
                vec4(i.z) + vec4(0.0, i1.z, i2.z, 1.0))
            + vec4(i.y) + vec4(0.0, i1.y, i2.y, 1.0))
        + vec4(i.x) + vec4(0.0, i1.x, i2.x, 1.0));

    float n_ = 0.142857142857;
    vec3 ns = D.wyz * n_ - D.xzx;

    vec4 j = p - floor(p * ns.z * ns.z) * 49.0;
    vec4 x_ = floor(j * ns.z);
    vec4 y_ = floor(j - x_ * 7.0);

    vec4 x = x_ * ns.x + ns.yyyy;
    vec4 y = y_ * ns.x + ns.yyyy;
    vec4 h = vec4(1.0) - abs(x) - abs(y);

    vec4 b0 = vec4(x.xy, y.xy);
    vec4 b1 = vec4(x.zw, y.zw);

    vec4 s0 = floor(b0) * 2.0 + vec4(1.0);
    vec4 s1 = floor(b1) * 2.0 + vec4(1.0);
    vec4 sh = -step(h, vec4(0.0));

    vec4 a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    vec4 a1 = b1.xzyw + s1.xzyw * sh.zzww;

    vec3 p0 = vec3(a0.xy, h.x);
    vec3 p1 = vec3(a0.zw, h.y);
    vec3 p2 = vec3(a1.xy, h.z);
    vec3 p3 = vec3(a1.zw, h.w);

    vec4 norm = taylor_inv_sqrt(vec4(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 = p0 * norm.x;
    p1 = p1 * norm.y;
    p2 = p2 * norm.z;
    p3 = p3 * norm.w;

    vec4 m = max(vec4(0.6) - vec4(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), vec4(0.0));
    m = m * m;
    return 42.0 * dot(m * m, vec4(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}

// Hermite ramp that also accepts edge0 > edge1.
float ramp(float edge0, float edge1, float x) {
    float t = clamp((x - edge0) / (edge1 - edge0), 0.0, 1.0);
    return t * t * (3.0 - 2.0 * t);
}

void main() {
    vec2 coord = v_uv * 2.0 - vec2(1.0);
    float r = length(coord);
    float n = snoise(vec3(coord * 5.0, frame.viewport.z * 0.2));
    n = (n + 1.0) * 0.5;

    float r_norm = (r - 0.5) / 0.5;
    vec3 color = mix(vec3(1.0, 0.8, 0.2), vec3(1.0, 0.2, 0.0), vec3(r_norm));

    float falloff = 1.0 - r_norm;
    float intensity = falloff * falloff * (0.5 + n * 0.5);
    float alpha = ramp(1.0, 0.95, r) * ramp(0.5, 0.55, r);

    out_color = vec4(color * intensity, alpha * 0.9);
}
"
    ),
};

/// Torus disk sampling an image.
pub const TEXTURED_DISK_FRAGMENT: ShaderProgram = ShaderProgram {
    label: "textured disk fragment",
    stage: ShaderStage::Fragment,
    source: r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(set = 2, binding = 0) uniform texture2D disk_texture;
layout(set = 2, binding = 1) uniform sampler disk_sampler;

void main() {
    vec4 texel = texture(sampler2D(disk_texture, disk_sampler), v_uv);
    out_color = vec4(texel.rgb, texel.a * 0.9);
}
",
};

pub const ALL_PROGRAMS: [ShaderProgram; 9] = [
    FULLSCREEN_VERTEX,
    DISTORTION_FRAGMENT,
    BACKGROUND_FRAGMENT,
    MESH_VERTEX,
    OCCLUDER_FRAGMENT,
    STAR_VERTEX,
    STAR_FRAGMENT,
    PROCEDURAL_DISK_FRAGMENT,
    TEXTURED_DISK_FRAGMENT,
];
