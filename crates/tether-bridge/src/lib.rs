//! tether-bridge: the host-facing side of the renderer.
//!
//! A [`Bridge`] owns a render thread (see `tether_core::RenderLoop`) and a
//! scene engine living on it. Host threads (platform main thread, UI
//! thread, plugin channels) call `Bridge` methods; each call becomes a task
//! executed on the render thread between frames, so the engine is only ever
//! touched from one thread.
//!
//! The engine itself is pluggable through [`SceneEngine`]/[`SceneGraph`].
//! [`HeadlessEngine`] works anywhere; with the `gpu` feature,
//! [`gpu::GpuEngine`] renders offscreen through wgpu.

pub mod bridge;
pub mod catalog;
pub mod engine;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod headless;
pub mod presenter;
pub mod resource;
pub mod scene;
mod stage;
pub mod types;

pub use bridge::{Bridge, BridgeOptions};
pub use catalog::{AnimationDescription, AssetCatalog, AssetDescription, Bounds, MeshDescription};
pub use engine::{EngineFactory, EngineInit, SceneEngine, SceneGraph};
pub use headless::HeadlessEngine;
pub use presenter::{FramePresenter, NoopPresenter};
pub use resource::{FsResourceLoader, ResourceBuffer, ResourceLoader, load_resource};
pub use scene::BookkeepingScene;
pub use types::{
    BoneAnimation, CameraOrbit, Color, EntityId, FrameInfo, GrabMode, Light, LightKind,
    MorphAnimation, NativeSurface, PlayAnimation, RenderTargetDesc, ToneMapping, Viewport,
};
