//! Awaited failures are both returned and logged on the render thread.

use std::sync::Mutex;

use log::{Level, LevelFilter, Log, Metadata, Record};
use tether_bridge::{Bridge, BridgeOptions, EngineInit, ResourceLoader, SceneEngine};
use tether_core::Error;

struct Capture(Mutex<Vec<(Level, String, Option<String>)>>);

impl Log for Capture {
    fn enabled(&self, _: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.0.lock().unwrap().push((
            record.level(),
            record.args().to_string(),
            std::thread::current().name().map(str::to_string),
        ));
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture(Mutex::new(Vec::new()));

fn logged(level: Level, needle: &str) -> bool {
    CAPTURE.0.lock().unwrap().iter().any(|(l, msg, thread)| {
        *l == level && msg.contains(needle) && thread.as_deref() == Some("tether-render")
    })
}

// One test per binary: the logger is process-global.
#[test]
fn gpu_failures_are_logged_and_returned() {
    log::set_logger(&CAPTURE).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let bridge = Bridge::headless(BridgeOptions::default()).unwrap();
    let handle = bridge.create_context(EngineInit::default()).unwrap();
    let err = bridge.create_swap_chain(handle, None, 0, 0).unwrap_err();
    assert!(matches!(err, Error::GpuOperationFailed { .. }));
    assert!(logged(Level::Error, "create swap chain"));
    drop(bridge);

    let failing = Bridge::new(
        BridgeOptions::default(),
        |_: &EngineInit, _: std::sync::Arc<dyn ResourceLoader>| -> tether_core::Result<Box<dyn SceneEngine>> {
            Err(Error::gpu("open device", "no adapter"))
        },
    )
    .unwrap();
    assert!(failing.create_context(EngineInit::default()).is_err());
    assert!(logged(Level::Error, "render context creation failed"));
}
