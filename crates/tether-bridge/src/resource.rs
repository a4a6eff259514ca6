//! Resource-loading capability supplied by the host.
//!
//! Hosts resolve asset names in their own way (bundle lookup, flutter_assets
//! directory, plain files). The engine only sees the `ResourceLoader` trait:
//! `load` hands out a buffer, `free` gives it back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tether_core::{Error, Result};

/// Bytes of one loaded resource.
#[derive(Debug, Clone)]
pub struct ResourceBuffer {
    id: u32,
    data: Arc<[u8]>,
}

impl ResourceBuffer {
    pub fn new(id: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub trait ResourceLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<ResourceBuffer>;

    /// Releases a buffer obtained from `load`.
    fn free(&self, buffer: ResourceBuffer);
}

/// Loads `name` and rejects empty buffers with `ResourceLoadFailed`.
pub fn load_resource(loader: &dyn ResourceLoader, name: &str) -> Result<ResourceBuffer> {
    let buffer = loader.load(name)?;
    if buffer.is_empty() {
        loader.free(buffer);
        return Err(Error::resource(name, "empty buffer"));
    }
    Ok(buffer)
}

/// Filesystem loader.
///
/// Name resolution:
/// - `file:///abs/path` is used as-is
/// - `asset://rel/path` and bare names resolve against the asset root
pub struct FsResourceLoader {
    root: PathBuf,
    live: Mutex<HashMap<u32, PathBuf>>,
    next_id: AtomicU32,
}

impl FsResourceLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            live: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        if let Some(path) = name.strip_prefix("file://") {
            return PathBuf::from(path);
        }
        let rel = name.strip_prefix("asset://").unwrap_or(name);
        self.root.join(rel)
    }

    /// Buffers handed out and not yet freed.
    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ResourceLoader for FsResourceLoader {
    fn load(&self, name: &str) -> Result<ResourceBuffer> {
        let path = self.resolve(name);
        let data = std::fs::read(&path)
            .map_err(|e| Error::resource(name, format!("{}: {e}", path.display())))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        log::debug!("loaded resource #{id} ({} bytes) from {}", data.len(), path.display());
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, path);

        Ok(ResourceBuffer::new(id, data))
    }

    fn free(&self, buffer: ResourceBuffer) {
        let removed = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&buffer.id());
        if removed.is_none() {
            log::warn!("free of unknown resource #{}", buffer.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("tether-res-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn resolves_schemes() {
        let loader = FsResourceLoader::new("/assets");
        assert_eq!(loader.resolve("asset://models/duck.glb"), PathBuf::from("/assets/models/duck.glb"));
        assert_eq!(loader.resolve("models/duck.glb"), PathBuf::from("/assets/models/duck.glb"));
        assert_eq!(loader.resolve("file:///tmp/duck.glb"), PathBuf::from("/tmp/duck.glb"));
    }

    #[test]
    fn load_and_free_track_live_buffers() {
        let dir = scratch_dir("live");
        std::fs::write(dir.join("a.bin"), [1u8, 2, 3]).unwrap();

        let loader = FsResourceLoader::new(&dir);
        let buf = loader.load("asset://a.bin").unwrap();
        assert_eq!(buf.data(), &[1, 2, 3]);
        assert_eq!(loader.live_count(), 1);

        loader.free(buf);
        assert_eq!(loader.live_count(), 0);
    }

    #[test]
    fn missing_file_is_a_load_failure() {
        let loader = FsResourceLoader::new(scratch_dir("missing"));
        match loader.load("nope.glb") {
            Err(Error::ResourceLoadFailed { name, .. }) => assert_eq!(name, "nope.glb"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_file_is_rejected_and_released() {
        let dir = scratch_dir("empty");
        std::fs::write(dir.join("empty.glb"), b"").unwrap();

        let loader = FsResourceLoader::new(&dir);
        assert!(matches!(
            load_resource(&loader, "empty.glb"),
            Err(Error::ResourceLoadFailed { .. })
        ));
        assert_eq!(loader.live_count(), 0);
    }
}
