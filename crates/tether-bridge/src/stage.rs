use std::sync::Arc;

use tether_core::{
    ContextHandle, ContextSlot, Error, FrameClock, FrameOutcome, FrameSink, FrameTime, Result,
};

use crate::engine::{EngineFactory, EngineInit, SceneEngine};
use crate::presenter::FramePresenter;
use crate::resource::ResourceLoader;
use crate::types::FrameInfo;

struct LiveContext {
    handle: ContextHandle,
    engine: Box<dyn SceneEngine>,
}

/// Render-thread state behind a `Bridge`.
///
/// Holds the live engine (if any). Built on the render thread and never
/// moved off it.
pub(crate) struct Stage {
    slot: Arc<ContextSlot>,
    factory: EngineFactory,
    loader: Arc<dyn ResourceLoader>,
    presenter: Box<dyn FramePresenter>,
    live: Option<LiveContext>,
    manual_clock: FrameClock,
    presented: u64,
}

impl Stage {
    pub(crate) fn new(
        slot: Arc<ContextSlot>,
        factory: EngineFactory,
        loader: Arc<dyn ResourceLoader>,
        presenter: Box<dyn FramePresenter>,
    ) -> Self {
        Self {
            slot,
            factory,
            loader,
            presenter,
            live: None,
            manual_clock: FrameClock::new(),
            presented: 0,
        }
    }

    /// Builds a new engine, replacing the live one if there is one.
    ///
    /// The handle is published only after the engine is fully constructed.
    pub(crate) fn create(&mut self, init: EngineInit) -> Result<ContextHandle> {
        if let Some(old) = self.live.take() {
            log::info!("replacing render context {:?}", old.handle);
            self.teardown(old);
        }

        let engine = (self.factory)(&init, Arc::clone(&self.loader)).inspect_err(|e| {
            log::error!("render context creation failed: {e}");
        })?;
        let handle = self.slot.issue();
        self.live = Some(LiveContext { handle, engine });
        self.slot.publish(handle);

        log::info!("render context {handle:?} created ({}x{})", init.width, init.height);
        Ok(handle)
    }

    pub(crate) fn destroy(&mut self, handle: ContextHandle) -> Result<()> {
        match self.live.take() {
            Some(live) if live.handle == handle => {
                self.teardown(live);
                Ok(())
            }
            other => {
                self.live = other;
                Err(Error::ContextUnavailable)
            }
        }
    }

    fn teardown(&mut self, live: LiveContext) {
        self.slot.retire(live.handle);
        drop(live.engine);
        log::info!("render context {:?} destroyed", live.handle);
    }

    pub(crate) fn engine(&mut self, handle: ContextHandle) -> Result<&mut dyn SceneEngine> {
        match self.live.as_mut() {
            Some(live) if live.handle == handle => Ok(live.engine.as_mut()),
            _ => Err(Error::ContextUnavailable),
        }
    }

    /// Renders one frame on demand, outside the paced loop.
    pub(crate) fn render_now(&mut self, handle: ContextHandle) -> Result<Option<FrameInfo>> {
        self.engine(handle)?;
        let time = self.manual_clock.tick();
        self.produce(time)
    }

    fn produce(&mut self, time: FrameTime) -> Result<Option<FrameInfo>> {
        let Some(live) = self.live.as_mut() else {
            return Ok(None);
        };

        if live.engine.render(&time)? == FrameOutcome::Skipped {
            return Ok(None);
        }

        let (width, height) = live.engine.target_size().unwrap_or((0, 0));
        let info = FrameInfo {
            context: live.handle,
            sequence: self.presented,
            dt: time.dt,
            width,
            height,
        };
        self.presented += 1;
        self.presenter.frame_ready(&info);
        Ok(Some(info))
    }
}

impl FrameSink for Stage {
    fn render_frame(&mut self, time: FrameTime) -> Result<FrameOutcome> {
        Ok(match self.produce(time)? {
            Some(_) => FrameOutcome::Presented,
            None => FrameOutcome::Skipped,
        })
    }
}

impl Drop for Stage {
    fn drop(&mut self) {
        // Render thread is exiting; the engine goes down with it.
        if let Some(live) = self.live.take() {
            self.teardown(live);
        }
    }
}
