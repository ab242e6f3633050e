use std::path::PathBuf;

/// A GLSL program failed to parse or validate.
#[derive(Debug, thiserror::Error)]
#[error("shader `{label}` failed to compile:\n{diagnostic}")]
pub struct ShaderCompileError {
    pub label: String,
    pub diagnostic: String,
}

/// Construction of the render pipeline failed. Nothing built before the
/// failure survives; the caller may retry with a fresh `start`.
#[derive(Debug, thiserror::Error)]
pub enum RenderInitError {
    #[error("failed to acquire window handle: {0}")]
    Handle(#[from] raw_window_handle::HandleError),
    #[error("failed to create rendering surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to find a suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats for this adapter")]
    UnsupportedSurface,
    #[error("GPU max texture dimension is {max}, requested {width}x{height}")]
    TextureTooLarge { max: u32, width: u32, height: u32 },
    #[error("failed to load texture {}: {source}", path.display())]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Shader(#[from] ShaderCompileError),
    #[error("window system error: {0}")]
    Window(String),
}
