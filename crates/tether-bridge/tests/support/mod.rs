#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tether_bridge::{ResourceBuffer, ResourceLoader};
use tether_core::{Error, Result};

/// Loader serving fixed in-memory files.
#[derive(Default)]
pub struct MemLoader {
    files: HashMap<String, Vec<u8>>,
    live: Mutex<usize>,
}

impl MemLoader {
    pub fn with(mut self, name: &str, bytes: &[u8]) -> Self {
        self.files.insert(name.to_string(), bytes.to_vec());
        self
    }

    pub fn live(&self) -> usize {
        *self.live.lock().unwrap()
    }
}

impl ResourceLoader for MemLoader {
    fn load(&self, name: &str) -> Result<ResourceBuffer> {
        let bytes = self
            .files
            .get(name)
            .ok_or_else(|| Error::resource(name, "not found"))?;
        *self.live.lock().unwrap() += 1;
        Ok(ResourceBuffer::new(0, bytes.clone()))
    }

    fn free(&self, _buffer: ResourceBuffer) {
        *self.live.lock().unwrap() -= 1;
    }
}

pub fn loader() -> Arc<MemLoader> {
    Arc::new(
        MemLoader::default()
            .with("helmet.glb", b"glTF-binary")
            .with("sky.ktx", b"ktx")
            .with("bg.png", b"png")
            .with("visor.png", b"png"),
    )
}
