//! Scripted host session.
//!
//! Usage: `tether-studio [asset-root] [--headless]`
//!
//! Plays the role of a platform embedder: creates a context, streams
//! transforms from a second thread while the render thread paces frames,
//! then tears everything down and prints the loop counters.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use tether_bridge::gpu::{GpuEngine, GpuEngineInit};
use tether_bridge::{
    Bridge, BridgeOptions, Color, EngineInit, FrameInfo, FsResourceLoader, HeadlessEngine, Light,
    ResourceLoader, SceneEngine,
};
use tether_core::logging::{LoggingConfig, init_logging};
use tether_core::RenderLoopConfig;

const SESSION: Duration = Duration::from_secs(2);

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let mut root = String::from(".");
    let mut headless = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--headless" => headless = true,
            _ => root = arg,
        }
    }

    let loader: Arc<dyn ResourceLoader> = Arc::new(FsResourceLoader::new(&root));
    let options = BridgeOptions {
        render_loop: RenderLoopConfig::default(),
        loader,
        presenter: Box::new(|frame: &FrameInfo| {
            if frame.sequence % 60 == 0 {
                log::info!("frame {} ({}x{}, dt {:?})", frame.sequence, frame.width, frame.height, frame.dt);
            }
        }),
    };

    let bridge = if headless {
        Bridge::headless(options)?
    } else {
        let gpu = GpuEngineInit::default();
        Bridge::new(options, move |init: &EngineInit, loader: Arc<dyn ResourceLoader>| {
            match GpuEngine::new(init, Arc::clone(&loader), &gpu) {
                Ok(engine) => Ok(Box::new(engine) as Box<dyn SceneEngine>),
                Err(e) => {
                    log::warn!("{e}; falling back to the headless engine");
                    Ok(Box::new(HeadlessEngine::new(init, loader)) as Box<dyn SceneEngine>)
                }
            }
        })?
    };
    let bridge = Arc::new(bridge);

    run_session(&bridge).context("studio session failed")?;

    let stats = bridge.stats();
    log::info!(
        "session done: {} frames, {} tasks, {} cancelled",
        stats.frames_rendered,
        stats.tasks_executed,
        stats.tasks_cancelled
    );
    bridge.stop();
    Ok(())
}

fn run_session(bridge: &Arc<Bridge>) -> anyhow::Result<()> {
    let handle = bridge.create_context(EngineInit {
        width: 800,
        height: 600,
        ..EngineInit::default()
    })?;
    bridge.create_swap_chain(handle, None, 800, 600)?;
    bridge.set_background_color(handle, Color::new(0.05, 0.06, 0.09, 1.0))?;
    let sun = bridge.add_light(handle, Light::sun())?;

    match bridge.load_glb(handle, "model.glb", false) {
        Ok(asset) => log::info!(
            "loaded {:?} with {} animations",
            bridge.name_for_entity(handle, asset)?,
            bridge.animation_count(handle, asset)?
        ),
        Err(e) => log::warn!("{e}"),
    }

    bridge.set_frame_interval_ms(1000.0 / 60.0)?;
    bridge.set_rendering(true);

    // Host UI thread streaming a light orbit.
    let streamer = {
        let bridge = Arc::clone(bridge);
        thread::Builder::new()
            .name("host-ui".into())
            .spawn(move || -> tether_core::Result<()> {
                let start = Instant::now();
                while start.elapsed() < SESSION {
                    let t = start.elapsed().as_secs_f32();
                    bridge.set_position(handle, sun, [t.cos() * 5.0, 5.0, t.sin() * 5.0])?;
                    thread::sleep(Duration::from_millis(8));
                }
                Ok(())
            })?
    };

    thread::sleep(SESSION);
    streamer
        .join()
        .map_err(|_| anyhow::anyhow!("host-ui thread panicked"))??;

    bridge.set_rendering(false);
    if let Some(frame) = bridge.render(handle)? {
        log::info!("final frame #{} at {}x{}", frame.sequence, frame.width, frame.height);
    }
    bridge.destroy_context(handle)?;
    Ok(())
}
