use lensing::ViewportSize;

use super::context::{DEPTH_FORMAT, SCENE_FORMAT};

/// Pass-1 render target: the resolved colour texture sampled by the lens
/// pass, a depth buffer, and an optional multisampled colour attachment.
///
/// Only rebuilt when the viewport changes; a frame never sees a target whose
/// size disagrees with its own viewport.
pub(crate) struct OffscreenTarget {
    size: ViewportSize,
    _color: wgpu::Texture,
    color_view: wgpu::TextureView,
    _depth: wgpu::Texture,
    depth_view: wgpu::TextureView,
    msaa: Option<MultisampleTarget>,
}

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(device: &wgpu::Device, extent: wgpu::Extent3d, sample_count: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scene msaa color"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }
}

impl OffscreenTarget {
    pub fn new(device: &wgpu::Device, size: ViewportSize, sample_count: u32) -> Self {
        let extent = target_extent(size);
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scene color"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("scene depth"),
            size: extent,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let msaa = (sample_count > 1).then(|| MultisampleTarget::new(device, extent, sample_count));

        tracing::debug!(
            width = extent.width,
            height = extent.height,
            sample_count,
            "allocated offscreen scene target"
        );

        Self {
            size,
            _color: color,
            color_view,
            _depth: depth,
            depth_view,
            msaa,
        }
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    /// View sampled by the distortion pass.
    pub fn sample_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    /// `(attachment, resolve_target)` for the scene pass colour slot.
    pub fn color_attachment(&self) -> (&wgpu::TextureView, Option<&wgpu::TextureView>) {
        match self.msaa.as_ref() {
            Some(msaa) => (&msaa.view, Some(&self.color_view)),
            None => (&self.color_view, None),
        }
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }
}

fn target_extent(size: ViewportSize) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width.max(1),
        height: size.height.max(1),
        depth_or_array_layers: 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_never_collapses_to_zero() {
        let extent = target_extent(ViewportSize::new(0, 480));
        assert_eq!((extent.width, extent.height), (1, 480));
        let extent = target_extent(ViewportSize::new(1920, 1080));
        assert_eq!((extent.width, extent.height, extent.depth_or_array_layers), (1920, 1080, 1));
    }
}
