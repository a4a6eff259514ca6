//! Offscreen wgpu engine.
//!
//! Owns a device/queue pair and one color texture sized to the current
//! target. Each frame clears the texture with the scene background color
//! and submits. Host-native surfaces cannot be wrapped from here, so a
//! swap chain must be created without one; the host reads the finished
//! frame through its own interop path.

use std::sync::Arc;

use anyhow::Context;
use tether_core::{Error, FrameOutcome, FrameTime, Result};

use crate::catalog::AssetCatalog;
use crate::engine::{EngineInit, SceneEngine, SceneGraph};
use crate::resource::ResourceLoader;
use crate::scene::BookkeepingScene;
use crate::types::{Color, NativeSurface, RenderTargetDesc, Viewport};

/// Device selection for `GpuEngine`.
#[derive(Debug, Clone)]
pub struct GpuEngineInit {
    pub power_preference: wgpu::PowerPreference,

    /// Format of the offscreen color target.
    pub format: wgpu::TextureFormat,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Describes the structure of assets the host will load.
    pub catalog: Arc<AssetCatalog>,
}

impl Default for GpuEngineInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            required_limits: wgpu::Limits::default(),
            catalog: Arc::new(AssetCatalog::new()),
        }
    }
}

struct ColorTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    /// Host texture id this target stands in for, if any.
    native: Option<u64>,
}

pub struct GpuEngine {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    scene: BookkeepingScene,
    target: Option<ColorTarget>,
    viewport: Viewport,
    frames: u64,
}

impl GpuEngine {
    /// Opens a device. Blocks the calling (render) thread until the adapter
    /// answers.
    pub fn new(init: &EngineInit, loader: Arc<dyn ResourceLoader>, gpu: &GpuEngineInit) -> Result<Self> {
        let (device, queue) = pollster::block_on(open_device(gpu))
            .map_err(|e| Error::gpu("open device", format!("{e:#}")))?;

        log::info!(
            "gpu engine created ({}x{}, format {:?})",
            init.width,
            init.height,
            gpu.format
        );

        Ok(Self {
            device,
            queue,
            format: gpu.format,
            scene: BookkeepingScene::with_catalog(loader, Arc::clone(&gpu.catalog)),
            target: None,
            viewport: Viewport::new(init.width, init.height, 1.0),
            frames: 0,
        })
    }

    /// Factory for `Bridge::new`.
    pub fn factory(
        gpu: GpuEngineInit,
    ) -> impl Fn(&EngineInit, Arc<dyn ResourceLoader>) -> Result<Box<dyn SceneEngine>> + Send + 'static
    {
        move |init: &EngineInit, loader: Arc<dyn ResourceLoader>| {
            let engine: Box<dyn SceneEngine> = Box::new(GpuEngine::new(init, loader, &gpu)?);
            Ok(engine)
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Texture the last frame was rendered into.
    pub fn color_texture(&self) -> Option<&wgpu::Texture> {
        self.target.as_ref().map(|t| &t.texture)
    }

    /// Host texture id of the current render target.
    pub fn native_target(&self) -> Option<u64> {
        self.target.as_ref().and_then(|t| t.native)
    }

    fn make_target(&self, width: u32, height: u32, native: Option<u64>) -> ColorTarget {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("tether color target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        ColorTarget {
            texture,
            view,
            width,
            height,
            native,
        }
    }
}

async fn open_device(gpu: &GpuEngineInit) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: gpu.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .context("failed to find a suitable GPU adapter")?;

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("tether device"),
            required_features: wgpu::Features::empty(),
            required_limits: gpu.required_limits.clone(),
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("failed to create wgpu device/queue")?;

    Ok((device, queue))
}

fn clear_color(c: Color) -> wgpu::Color {
    wgpu::Color {
        r: f64::from(c.r),
        g: f64::from(c.g),
        b: f64::from(c.b),
        a: f64::from(c.a),
    }
}

impl SceneEngine for GpuEngine {
    fn create_swap_chain(
        &mut self,
        surface: Option<NativeSurface>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if let Some(surface) = surface {
            return Err(Error::gpu(
                "create swap chain",
                format!("native surface {:#x} is not supported by the offscreen engine", surface.0),
            ));
        }
        if width == 0 || height == 0 {
            return Err(Error::gpu("create swap chain", format!("zero-sized {width}x{height}")));
        }
        self.target = Some(self.make_target(width, height, None));
        Ok(())
    }

    fn destroy_swap_chain(&mut self) -> Result<()> {
        self.target = None;
        Ok(())
    }

    fn create_render_target(&mut self, desc: RenderTargetDesc) -> Result<()> {
        if self.target.is_none() {
            return Err(Error::gpu("create render target", "no swap chain"));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::gpu(
                "create render target",
                format!("zero-sized {}x{}", desc.width, desc.height),
            ));
        }
        self.target = Some(self.make_target(desc.width, desc.height, Some(desc.native_texture)));
        Ok(())
    }

    fn update_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.viewport = viewport;
        Ok(())
    }

    fn render(&mut self, _time: &FrameTime) -> Result<FrameOutcome> {
        let Some(target) = self.target.as_ref() else {
            return Ok(FrameOutcome::Skipped);
        };
        if self.viewport.is_empty() {
            return Ok(FrameOutcome::Skipped);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("tether frame encoder"),
            });

        {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tether clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(self.scene.background_color())),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.frames += 1;
        Ok(FrameOutcome::Presented)
    }

    fn target_size(&self) -> Option<(u32, u32)> {
        self.target.as_ref().map(|t| (t.width, t.height))
    }

    fn scene(&mut self) -> &mut dyn SceneGraph {
        &mut self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_color_widens_channels() {
        let c = clear_color(Color::new(1.0, 0.5, 0.25, 0.0));
        assert_eq!((c.r, c.g, c.b, c.a), (1.0, 0.5, 0.25, 0.0));
    }

    #[test]
    fn default_init_prefers_srgb() {
        assert!(GpuEngineInit::default().format.is_srgb());
    }
}
