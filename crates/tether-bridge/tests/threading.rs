mod support;

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tether_bridge::{
    Bridge, BridgeOptions, BookkeepingScene, EngineInit, NativeSurface, RenderTargetDesc,
    ResourceLoader, SceneEngine, SceneGraph, Viewport,
};
use tether_core::{Error, FrameOutcome, FrameTime, Result, ThreadState};

/// Records viewport updates as `(width, height)` = `(producer, sequence)`.
struct RecordingEngine {
    scene: BookkeepingScene,
    log: Arc<Mutex<Vec<(u32, u32)>>>,
}

impl SceneEngine for RecordingEngine {
    fn create_swap_chain(&mut self, _: Option<NativeSurface>, _: u32, _: u32) -> Result<()> {
        Ok(())
    }

    fn destroy_swap_chain(&mut self) -> Result<()> {
        Ok(())
    }

    fn create_render_target(&mut self, _: RenderTargetDesc) -> Result<()> {
        Ok(())
    }

    fn update_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.log.lock().unwrap().push((viewport.width, viewport.height));
        Ok(())
    }

    fn render(&mut self, _: &FrameTime) -> Result<FrameOutcome> {
        Ok(FrameOutcome::Presented)
    }

    fn target_size(&self) -> Option<(u32, u32)> {
        Some((1, 1))
    }

    fn scene(&mut self) -> &mut dyn SceneGraph {
        &mut self.scene
    }
}

fn recording_bridge(log: Arc<Mutex<Vec<(u32, u32)>>>) -> Bridge {
    Bridge::new(
        BridgeOptions {
            loader: support::loader(),
            ..BridgeOptions::default()
        },
        move |_: &EngineInit, loader: Arc<dyn ResourceLoader>| {
            let engine: Box<dyn SceneEngine> = Box::new(RecordingEngine {
                scene: BookkeepingScene::new(loader),
                log: Arc::clone(&log),
            });
            Ok(engine)
        },
    )
    .unwrap()
}

#[test]
fn posts_from_many_threads_keep_per_thread_order() {
    const THREADS: u32 = 10;
    const PER_THREAD: u32 = 100;

    let log = Arc::new(Mutex::new(Vec::new()));
    let bridge = Arc::new(recording_bridge(Arc::clone(&log)));
    let handle = bridge.create_context(EngineInit::default()).unwrap();
    bridge.set_frame_interval(Duration::from_millis(2));
    bridge.set_rendering(true);

    let producers: Vec<_> = (0..THREADS)
        .map(|t| {
            let bridge = Arc::clone(&bridge);
            thread::spawn(move || {
                for seq in 0..PER_THREAD {
                    bridge
                        .update_viewport(handle, Viewport::new(t, seq, 1.0))
                        .unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    // FIFO: an awaited call returns only after every earlier post ran.
    bridge.render(handle).unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), (THREADS * PER_THREAD) as usize);
    for t in 0..THREADS {
        let seqs: Vec<u32> = log.iter().filter(|(p, _)| *p == t).map(|(_, s)| *s).collect();
        assert_eq!(seqs, (0..PER_THREAD).collect::<Vec<_>>(), "producer {t}");
    }
}

#[test]
fn every_engine_call_happens_on_the_render_thread() {
    let bridge = Bridge::headless(BridgeOptions::default()).unwrap();
    let handle = bridge.create_context(EngineInit::default()).unwrap();

    let name = bridge
        .with_engine(handle, |_engine| {
            Ok(thread::current().name().map(str::to_string))
        })
        .unwrap();
    assert_eq!(name.as_deref(), Some("tether-render"));
}

#[test]
fn stop_cancels_queued_operations() {
    let bridge = Arc::new(Bridge::headless(BridgeOptions::default()).unwrap());
    let handle = bridge.create_context(EngineInit::default()).unwrap();

    let slow = {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || {
            bridge.with_engine(handle, |_| {
                thread::sleep(Duration::from_millis(300));
                Ok(())
            })
        })
    };
    thread::sleep(Duration::from_millis(50));

    let queued = {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || bridge.clear_lights(handle))
    };
    thread::sleep(Duration::from_millis(50));

    bridge.stop();

    assert!(slow.join().unwrap().is_ok());
    let err = queued.join().unwrap().unwrap_err();
    assert!(err.is_shutdown(), "got {err:?}");
    assert_eq!(bridge.state(), ThreadState::Joined);

    assert!(matches!(
        bridge.create_context(EngineInit::default()),
        Err(Error::QueueStopped)
    ));
}

#[test]
fn failing_factory_leaves_no_context() {
    let bridge = Bridge::new(BridgeOptions::default(), |_: &EngineInit, _: Arc<dyn ResourceLoader>| {
        Err(Error::gpu("open device", "no adapter"))
    })
    .unwrap();

    let err = bridge.create_context(EngineInit::default()).unwrap_err();
    assert!(matches!(err, Error::GpuOperationFailed { op: "open device", .. }));
    assert_eq!(bridge.current_context(), None);
    assert_eq!(bridge.state(), ThreadState::Idle);
}

#[test]
fn dropping_the_bridge_joins_the_render_thread() {
    let bridge = Bridge::headless(BridgeOptions::default()).unwrap();
    bridge.create_context(EngineInit::default()).unwrap();
    bridge.set_rendering(true);
    thread::sleep(Duration::from_millis(20));
    // Must not hang with rendering still enabled.
    drop(bridge);
}
