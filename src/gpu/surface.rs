//! The window surface the cells are drawn into.

use wgpu::{
    Adapter, CompositeAlphaMode, Device, Surface, SurfaceConfiguration, SurfaceTexture,
    TextureFormat, TextureUsages,
};

use crate::error::SetupError;

pub struct DisplaySurface {
    surface: Surface<'static>,
    config: SurfaceConfiguration,
}

impl DisplaySurface {
    /// Pick a format and compositing mode for `surface` and configure it.
    pub fn configure(
        surface: Surface<'static>,
        adapter: &Adapter,
        device: &Device,
        width: u32,
        height: u32,
    ) -> Result<Self, SetupError> {
        let caps = surface.get_capabilities(adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(SetupError::NoSurfaceFormat)?;
        let alpha_mode = if caps.alpha_modes.contains(&CompositeAlphaMode::PreMultiplied) {
            CompositeAlphaMode::PreMultiplied
        } else {
            caps.alpha_modes
                .first()
                .copied()
                .unwrap_or(CompositeAlphaMode::Auto)
        };

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(device, &config);
        log::info!(
            "surface configured: {:?} {:?} {}x{}",
            format,
            alpha_mode,
            config.width,
            config.height
        );

        Ok(Self { surface, config })
    }

    pub fn format(&self) -> TextureFormat {
        self.config.format
    }

    /// Reconfigure for new pixel dimensions. Zero-sized requests are ignored.
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(device, &self.config);
        }
    }

    /// Reapply the current configuration after the surface was lost.
    pub fn reconfigure(&self, device: &Device) {
        self.surface.configure(device, &self.config);
    }

    /// A drawable target, valid until it is presented.
    pub fn acquire(&self) -> Result<SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }
}
