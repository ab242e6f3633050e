use std::path::Path;

use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::error::RenderInitError;

/// An image uploaded for sampling by a scene-pass program.
pub(crate) struct ImageTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

/// Horizontal addressing for the sampler; rows always clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wrap {
    Repeat,
    Clamp,
}

/// Decodes `path` into RGBA8 with row 0 at the bottom, so GL-style `v`
/// coordinates point up.
pub(crate) fn load_rgba(path: &Path) -> Result<RgbaImage, RenderInitError> {
    let mut rgba = image::open(path)
        .map_err(|source| RenderInitError::Texture {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    image::imageops::flip_vertical_in_place(&mut rgba);
    Ok(rgba)
}

impl ImageTexture {
    pub fn load(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: &Path,
        wrap: Wrap,
        max_dimension: u32,
    ) -> Result<Self, RenderInitError> {
        let rgba = load_rgba(path)?;
        let (width, height) = rgba.dimensions();
        if width > max_dimension || height > max_dimension {
            return Err(RenderInitError::TextureTooLarge {
                max: max_dimension,
                width,
                height,
            });
        }
        tracing::debug!(path = %path.display(), width, height, "uploading texture");

        let label = path.display().to_string();
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            &rgba,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let address_mode_u = match wrap {
            Wrap::Repeat => wgpu::AddressMode::Repeat,
            Wrap::Clamp => wgpu::AddressMode::ClampToEdge,
        };
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("image sampler"),
            address_mode_u,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            _texture: texture,
            view,
            sampler,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn decoded_rows_are_flipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sky.png");
        let mut source = RgbaImage::new(1, 2);
        source.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        source.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
        source.save(&path).unwrap();

        let loaded = load_rgba(&path).unwrap();
        assert_eq!(loaded.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(loaded.get_pixel(0, 1), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_rgba(Path::new("/nonexistent/disk.png")).unwrap_err();
        match err {
            RenderInitError::Texture { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/disk.png"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
