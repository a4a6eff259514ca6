//! Engine without a GPU.
//!
//! Keeps swap-chain/target state and scene bookkeeping, and "renders" by
//! counting frames. Useful for hosts without graphics (CI, servers) and as
//! the fallback when no adapter is available.

use std::sync::Arc;

use tether_core::{Error, FrameOutcome, FrameTime, Result};

use crate::catalog::AssetCatalog;
use crate::engine::{EngineInit, SceneEngine, SceneGraph};
use crate::resource::ResourceLoader;
use crate::scene::BookkeepingScene;
use crate::types::{NativeSurface, RenderTargetDesc, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SwapChain {
    surface: Option<NativeSurface>,
    width: u32,
    height: u32,
}

pub struct HeadlessEngine {
    scene: BookkeepingScene,
    swap_chain: Option<SwapChain>,
    target: Option<RenderTargetDesc>,
    viewport: Viewport,
    frames: u64,
}

impl HeadlessEngine {
    pub fn new(init: &EngineInit, loader: Arc<dyn ResourceLoader>) -> Self {
        Self::with_catalog(init, loader, Arc::new(AssetCatalog::new()))
    }

    pub fn with_catalog(
        init: &EngineInit,
        loader: Arc<dyn ResourceLoader>,
        catalog: Arc<AssetCatalog>,
    ) -> Self {
        log::info!("headless engine created ({}x{})", init.width, init.height);
        Self {
            scene: BookkeepingScene::with_catalog(loader, catalog),
            swap_chain: None,
            target: None,
            viewport: Viewport::new(init.width, init.height, 1.0),
            frames: 0,
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Host surface the swap chain was created for, if any.
    pub fn surface(&self) -> Option<NativeSurface> {
        self.swap_chain.and_then(|sc| sc.surface)
    }

    pub fn bookkeeping(&self) -> &BookkeepingScene {
        &self.scene
    }

    /// Factory for `Bridge::new`.
    pub fn factory()
    -> impl Fn(&EngineInit, Arc<dyn ResourceLoader>) -> Result<Box<dyn SceneEngine>> + Send + 'static
    {
        Self::factory_with(Arc::new(AssetCatalog::new()))
    }

    /// Factory whose engines describe loaded assets from `catalog`.
    pub fn factory_with(
        catalog: Arc<AssetCatalog>,
    ) -> impl Fn(&EngineInit, Arc<dyn ResourceLoader>) -> Result<Box<dyn SceneEngine>> + Send + 'static
    {
        move |init: &EngineInit, loader: Arc<dyn ResourceLoader>| {
            let engine: Box<dyn SceneEngine> = Box::new(HeadlessEngine::with_catalog(
                init,
                loader,
                Arc::clone(&catalog),
            ));
            Ok(engine)
        }
    }
}

impl SceneEngine for HeadlessEngine {
    fn create_swap_chain(
        &mut self,
        surface: Option<NativeSurface>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::gpu("create swap chain", format!("zero-sized {width}x{height}")));
        }
        self.swap_chain = Some(SwapChain {
            surface,
            width,
            height,
        });
        Ok(())
    }

    fn destroy_swap_chain(&mut self) -> Result<()> {
        self.swap_chain = None;
        self.target = None;
        Ok(())
    }

    fn create_render_target(&mut self, desc: RenderTargetDesc) -> Result<()> {
        if self.swap_chain.is_none() {
            return Err(Error::gpu("create render target", "no swap chain"));
        }
        self.target = Some(desc);
        Ok(())
    }

    fn update_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.viewport = viewport;
        Ok(())
    }

    fn render(&mut self, _time: &FrameTime) -> Result<FrameOutcome> {
        if self.swap_chain.is_none() || self.viewport.is_empty() {
            return Ok(FrameOutcome::Skipped);
        }
        self.frames += 1;
        Ok(FrameOutcome::Presented)
    }

    fn target_size(&self) -> Option<(u32, u32)> {
        match (self.target, self.swap_chain) {
            (Some(t), _) => Some((t.width, t.height)),
            (None, Some(sc)) => Some((sc.width, sc.height)),
            (None, None) => None,
        }
    }

    fn scene(&mut self) -> &mut dyn SceneGraph {
        &mut self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::FsResourceLoader;
    use tether_core::FrameClock;

    fn engine() -> HeadlessEngine {
        HeadlessEngine::new(
            &EngineInit {
                width: 64,
                height: 32,
                ..EngineInit::default()
            },
            Arc::new(FsResourceLoader::new(".")),
        )
    }

    #[test]
    fn render_skips_until_a_swap_chain_exists() {
        let mut engine = engine();
        let mut clock = FrameClock::new();
        assert_eq!(engine.render(&clock.tick()).unwrap(), FrameOutcome::Skipped);

        engine.create_swap_chain(None, 64, 32).unwrap();
        assert_eq!(engine.render(&clock.tick()).unwrap(), FrameOutcome::Presented);
        assert_eq!(engine.frames_rendered(), 1);
        assert_eq!(engine.target_size(), Some((64, 32)));
    }

    #[test]
    fn render_target_overrides_swap_chain_size() {
        let mut engine = engine();
        assert!(engine
            .create_render_target(RenderTargetDesc {
                native_texture: 3,
                width: 8,
                height: 8
            })
            .is_err());

        engine.create_swap_chain(Some(NativeSurface(0xdead)), 64, 32).unwrap();
        engine
            .create_render_target(RenderTargetDesc {
                native_texture: 3,
                width: 16,
                height: 16,
            })
            .unwrap();
        assert_eq!(engine.target_size(), Some((16, 16)));

        engine.destroy_swap_chain().unwrap();
        assert_eq!(engine.target_size(), None);
    }

    #[test]
    fn zero_sized_swap_chain_is_a_gpu_failure() {
        let mut engine = engine();
        assert!(matches!(
            engine.create_swap_chain(None, 0, 10),
            Err(Error::GpuOperationFailed { .. })
        ));
    }
}
