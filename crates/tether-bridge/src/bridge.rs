//! Host-facing operation surface.
//!
//! Every call is turned into a task on the render thread. Whether the caller
//! waits for it is fixed per operation:
//!
//! | Operation | Policy |
//! |-----------|--------|
//! | context create/destroy, swap chain, render target, `render` | awaited |
//! | `set_rendering`, `set_frame_interval*` | direct write, no task |
//! | `update_viewport` | fire-and-forget |
//! | background, skybox/IBL, lights, assets, animations, camera, post-fx | awaited |
//! | morph weights/animations, bone animations/transforms, `reset_bones` | awaited |
//! | `hide`, `reveal`, `set_material_color`, `load_texture`, `transform_to_unit_cube` | awaited |
//! | `pan_start`/`pan_end`, `rotate_start`/`rotate_end` | awaited |
//! | `zoom`, `pan_update`, `rotate_update` | fire-and-forget |
//! | `set_position`, `set_rotation`, `set_scale` | fire-and-forget |
//! | `pick`, `name_for_entity`, `animation_duration`, `camera_orbit` | awaited |
//!
//! Fire-and-forget failures are only logged. Streaming operations
//! (viewport, gestures, transforms) are issued at high rate by hosts and
//! their errors are not actionable per call.

use std::sync::Arc;
use std::time::Duration;

use tether_core::{
    ContextHandle, Error, LoopStats, RenderLoop, RenderLoopConfig, Result, ThreadState,
};

use crate::engine::{EngineFactory, EngineInit, SceneEngine, SceneGraph};
use crate::headless::HeadlessEngine;
use crate::presenter::{FramePresenter, NoopPresenter};
use crate::resource::{FsResourceLoader, ResourceLoader};
use crate::stage::Stage;
use crate::types::{
    BoneAnimation, CameraOrbit, Color, EntityId, FrameInfo, GrabMode, Light, MorphAnimation,
    NativeSurface, PlayAnimation, RenderTargetDesc, ToneMapping, Viewport,
};

/// Construction options of a `Bridge`.
pub struct BridgeOptions {
    pub render_loop: RenderLoopConfig,
    pub loader: Arc<dyn ResourceLoader>,
    pub presenter: Box<dyn FramePresenter>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            render_loop: RenderLoopConfig::default(),
            loader: Arc::new(FsResourceLoader::new(".")),
            presenter: Box::new(NoopPresenter),
        }
    }
}

/// Owns one render thread and the renderer living on it.
///
/// `Bridge` is `Send + Sync`; share it (e.g. in an `Arc`) with every host
/// thread that needs to drive the renderer. Dropping it stops the render
/// thread and destroys any live context there.
pub struct Bridge {
    render_loop: RenderLoop<Stage>,
}

impl Bridge {
    /// Spawns the render thread. `factory` runs on it whenever a context is
    /// created.
    pub fn new<F>(options: BridgeOptions, factory: F) -> Result<Self>
    where
        F: Fn(&EngineInit, Arc<dyn ResourceLoader>) -> Result<Box<dyn SceneEngine>> + Send + 'static,
    {
        let BridgeOptions {
            render_loop,
            loader,
            presenter,
        } = options;
        let factory: EngineFactory = Box::new(factory);

        let render_loop = RenderLoop::spawn(render_loop, move |slot| {
            Stage::new(Arc::clone(slot), factory, loader, presenter)
        })?;
        Ok(Self { render_loop })
    }

    /// Bridge backed by `HeadlessEngine`.
    pub fn headless(options: BridgeOptions) -> Result<Self> {
        Self::new(options, HeadlessEngine::factory())
    }

    // --- lifecycle ---------------------------------------------------------

    /// Creates the render context on the render thread, replacing the
    /// current one if it exists.
    pub fn create_context(&self, init: EngineInit) -> Result<ContextHandle> {
        self.run(move |stage| stage.create(init))
    }

    /// Destroys the context. Rendering is switched off first.
    pub fn destroy_context(&self, handle: ContextHandle) -> Result<()> {
        if self.current_context() == Some(handle) {
            self.render_loop.set_rendering(false);
        }
        self.run(move |stage| stage.destroy(handle))
    }

    pub fn current_context(&self) -> Option<ContextHandle> {
        self.render_loop.context_slot().current()
    }

    pub fn state(&self) -> ThreadState {
        self.render_loop.state()
    }

    pub fn stats(&self) -> LoopStats {
        self.render_loop.stats()
    }

    /// Stops the render thread; pending operations fail with `Cancelled`.
    pub fn stop(&self) {
        self.render_loop.stop();
    }

    // --- pacing ------------------------------------------------------------

    pub fn set_rendering(&self, rendering: bool) {
        self.render_loop.set_rendering(rendering);
    }

    pub fn is_rendering(&self) -> bool {
        self.render_loop.is_rendering()
    }

    /// Returns the interval actually applied.
    pub fn set_frame_interval(&self, interval: Duration) -> Duration {
        self.render_loop.set_frame_interval(interval)
    }

    /// Millisecond variant used by hosts that speak floats.
    pub fn set_frame_interval_ms(&self, ms: f32) -> Result<Duration> {
        if !(ms.is_finite() && ms > 0.0) {
            return Err(Error::invalid(format!(
                "frame interval must be a positive number of milliseconds, got {ms}"
            )));
        }
        let nanos = (f64::from(ms) * 1_000_000.0).round() as u64;
        Ok(self.set_frame_interval(Duration::from_nanos(nanos)))
    }

    pub fn frame_interval(&self) -> Duration {
        self.render_loop.frame_interval()
    }

    // --- swap chain / targets ----------------------------------------------

    pub fn create_swap_chain(
        &self,
        handle: ContextHandle,
        surface: Option<NativeSurface>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.with_engine(handle, move |engine| {
            engine.create_swap_chain(surface, width, height)
        })
    }

    pub fn destroy_swap_chain(&self, handle: ContextHandle) -> Result<()> {
        self.with_engine(handle, |engine| engine.destroy_swap_chain())
    }

    pub fn create_render_target(&self, handle: ContextHandle, desc: RenderTargetDesc) -> Result<()> {
        self.with_engine(handle, move |engine| engine.create_render_target(desc))
    }

    pub fn update_viewport(&self, handle: ContextHandle, viewport: Viewport) -> Result<()> {
        self.post_engine(handle, move |engine| engine.update_viewport(viewport))
    }

    /// Renders one frame now. `None` if there was nothing to render into.
    pub fn render(&self, handle: ContextHandle) -> Result<Option<FrameInfo>> {
        self.render_loop.context_slot().check(handle)?;
        self.run(move |stage| stage.render_now(handle).inspect_err(log_failure))
    }

    // --- background / environment ------------------------------------------

    pub fn set_background_color(&self, handle: ContextHandle, color: Color) -> Result<()> {
        self.with_scene(handle, move |scene| scene.set_background_color(color))
    }

    pub fn set_background_image(
        &self,
        handle: ContextHandle,
        path: impl Into<String>,
        fill_height: bool,
    ) -> Result<()> {
        let path = path.into();
        self.with_scene(handle, move |scene| scene.set_background_image(&path, fill_height))
    }

    pub fn set_background_image_position(
        &self,
        handle: ContextHandle,
        x: f32,
        y: f32,
        clamp: bool,
    ) -> Result<()> {
        self.with_scene(handle, move |scene| {
            scene.set_background_image_position(x, y, clamp)
        })
    }

    pub fn clear_background_image(&self, handle: ContextHandle) -> Result<()> {
        self.with_scene(handle, |scene| scene.clear_background_image())
    }

    pub fn load_skybox(&self, handle: ContextHandle, path: impl Into<String>) -> Result<()> {
        let path = path.into();
        self.with_scene(handle, move |scene| scene.load_skybox(&path))
    }

    pub fn remove_skybox(&self, handle: ContextHandle) -> Result<()> {
        self.with_scene(handle, |scene| scene.remove_skybox())
    }

    pub fn load_ibl(&self, handle: ContextHandle, path: impl Into<String>, intensity: f32) -> Result<()> {
        let path = path.into();
        self.with_scene(handle, move |scene| scene.load_ibl(&path, intensity))
    }

    pub fn remove_ibl(&self, handle: ContextHandle) -> Result<()> {
        self.with_scene(handle, |scene| scene.remove_ibl())
    }

    // --- lights ------------------------------------------------------------

    pub fn add_light(&self, handle: ContextHandle, light: Light) -> Result<EntityId> {
        self.with_scene(handle, move |scene| scene.add_light(light))
    }

    pub fn remove_light(&self, handle: ContextHandle, light: EntityId) -> Result<()> {
        self.with_scene(handle, move |scene| scene.remove_light(light))
    }

    pub fn clear_lights(&self, handle: ContextHandle) -> Result<()> {
        self.with_scene(handle, |scene| scene.clear_lights())
    }

    // --- assets ------------------------------------------------------------

    pub fn load_glb(&self, handle: ContextHandle, path: impl Into<String>, unlit: bool) -> Result<EntityId> {
        let path = path.into();
        self.with_scene(handle, move |scene| scene.load_glb(&path, unlit))
    }

    pub fn load_gltf(
        &self,
        handle: ContextHandle,
        path: impl Into<String>,
        resource_dir: impl Into<String>,
    ) -> Result<EntityId> {
        let (path, resource_dir) = (path.into(), resource_dir.into());
        self.with_scene(handle, move |scene| scene.load_gltf(&path, &resource_dir))
    }

    pub fn remove_asset(&self, handle: ContextHandle, asset: EntityId) -> Result<()> {
        self.with_scene(handle, move |scene| scene.remove_asset(asset))
    }

    pub fn clear_assets(&self, handle: ContextHandle) -> Result<()> {
        self.with_scene(handle, |scene| scene.clear_assets())
    }

    // --- animation ---------------------------------------------------------

    pub fn animation_names(&self, handle: ContextHandle, asset: EntityId) -> Result<Vec<String>> {
        self.with_scene(handle, move |scene| scene.animation_names(asset))
    }

    pub fn animation_count(&self, handle: ContextHandle, asset: EntityId) -> Result<usize> {
        self.with_scene(handle, move |scene| scene.animation_names(asset).map(|n| n.len()))
    }

    pub fn morph_target_names(
        &self,
        handle: ContextHandle,
        asset: EntityId,
        mesh: impl Into<String>,
    ) -> Result<Vec<String>> {
        let mesh = mesh.into();
        self.with_scene(handle, move |scene| scene.morph_target_names(asset, &mesh))
    }

    pub fn play_animation(&self, handle: ContextHandle, asset: EntityId, params: PlayAnimation) -> Result<()> {
        self.with_scene(handle, move |scene| scene.play_animation(asset, params))
    }

    pub fn stop_animation(&self, handle: ContextHandle, asset: EntityId, index: usize) -> Result<()> {
        self.with_scene(handle, move |scene| scene.stop_animation(asset, index))
    }

    pub fn set_animation_frame(
        &self,
        handle: ContextHandle,
        asset: EntityId,
        index: usize,
        frame: u32,
    ) -> Result<()> {
        self.with_scene(handle, move |scene| scene.set_animation_frame(asset, index, frame))
    }

    /// Length of animation `index` in seconds.
    pub fn animation_duration(&self, handle: ContextHandle, asset: EntityId, index: usize) -> Result<f32> {
        self.with_scene(handle, move |scene| scene.animation_duration(asset, index))
    }

    // --- morphing / skinning -----------------------------------------------

    pub fn set_morph_target_weights(
        &self,
        handle: ContextHandle,
        asset: EntityId,
        mesh: impl Into<String>,
        weights: Vec<f32>,
    ) -> Result<()> {
        let mesh = mesh.into();
        self.with_scene(handle, move |scene| {
            scene.set_morph_target_weights(asset, &mesh, &weights)
        })
    }

    pub fn set_morph_animation(
        &self,
        handle: ContextHandle,
        asset: EntityId,
        mesh: impl Into<String>,
        animation: MorphAnimation,
    ) -> Result<()> {
        let mesh = mesh.into();
        self.with_scene(handle, move |scene| scene.set_morph_animation(asset, &mesh, animation))
    }

    /// Animates every morph target of `mesh`. `weights` holds one row of
    /// `target_count` values per frame.
    #[allow(clippy::too_many_arguments)]
    pub fn animate_morph_weights(
        &self,
        handle: ContextHandle,
        asset: EntityId,
        mesh: impl Into<String>,
        weights: Vec<f32>,
        target_count: usize,
        frame_count: usize,
        frame_length: Duration,
    ) -> Result<()> {
        let animation = MorphAnimation::dense(weights, target_count, frame_count, frame_length);
        self.set_morph_animation(handle, asset, mesh, animation)
    }

    pub fn add_bone_animation(
        &self,
        handle: ContextHandle,
        asset: EntityId,
        animation: BoneAnimation,
    ) -> Result<()> {
        self.with_scene(handle, move |scene| scene.add_bone_animation(asset, animation))
    }

    pub fn set_bone_transform(
        &self,
        handle: ContextHandle,
        asset: EntityId,
        mesh: impl Into<String>,
        bone: impl Into<String>,
        transform: [f32; 16],
    ) -> Result<()> {
        let (mesh, bone) = (mesh.into(), bone.into());
        self.with_scene(handle, move |scene| {
            scene.set_bone_transform(asset, &mesh, &bone, transform)
        })
    }

    pub fn reset_bones(&self, handle: ContextHandle, asset: EntityId) -> Result<()> {
        self.with_scene(handle, move |scene| scene.reset_bones(asset))
    }

    // --- meshes / materials ------------------------------------------------

    pub fn hide(&self, handle: ContextHandle, asset: EntityId, mesh: impl Into<String>) -> Result<()> {
        let mesh = mesh.into();
        self.with_scene(handle, move |scene| scene.hide(asset, &mesh))
    }

    pub fn reveal(&self, handle: ContextHandle, asset: EntityId, mesh: impl Into<String>) -> Result<()> {
        let mesh = mesh.into();
        self.with_scene(handle, move |scene| scene.reveal(asset, &mesh))
    }

    pub fn set_material_color(
        &self,
        handle: ContextHandle,
        asset: EntityId,
        mesh: impl Into<String>,
        material: usize,
        color: Color,
    ) -> Result<()> {
        let mesh = mesh.into();
        self.with_scene(handle, move |scene| {
            scene.set_material_color(asset, &mesh, material, color)
        })
    }

    pub fn load_texture(
        &self,
        handle: ContextHandle,
        asset: EntityId,
        path: impl Into<String>,
        renderable: usize,
    ) -> Result<()> {
        let path = path.into();
        self.with_scene(handle, move |scene| scene.load_texture(asset, &path, renderable))
    }

    pub fn transform_to_unit_cube(&self, handle: ContextHandle, asset: EntityId) -> Result<()> {
        self.with_scene(handle, move |scene| scene.transform_to_unit_cube(asset))
    }

    // --- camera / post-processing ------------------------------------------

    pub fn set_camera(&self, handle: ContextHandle, asset: EntityId, node: Option<String>) -> Result<bool> {
        self.with_scene(handle, move |scene| scene.set_camera(asset, node.as_deref()))
    }

    pub fn set_tone_mapping(&self, handle: ContextHandle, mode: ToneMapping) -> Result<()> {
        self.with_scene(handle, move |scene| scene.set_tone_mapping(mode))
    }

    pub fn set_bloom(&self, handle: ContextHandle, strength: f32) -> Result<()> {
        self.with_scene(handle, move |scene| scene.set_bloom(strength))
    }

    pub fn set_post_processing(&self, handle: ContextHandle, enabled: bool) -> Result<()> {
        self.with_scene(handle, move |scene| scene.set_post_processing(enabled))
    }

    pub fn camera_orbit(&self, handle: ContextHandle) -> Result<CameraOrbit> {
        self.with_scene(handle, |scene| scene.camera_orbit())
    }

    // --- camera gestures (updates streamed) --------------------------------

    pub fn zoom(&self, handle: ContextHandle, x: f32, y: f32, delta: f32) -> Result<()> {
        self.post_scene(handle, move |scene| scene.zoom(x, y, delta))
    }

    pub fn pan_start(&self, handle: ContextHandle, x: f32, y: f32) -> Result<()> {
        self.with_scene(handle, move |scene| scene.grab_begin(x, y, GrabMode::Pan))
    }

    pub fn pan_update(&self, handle: ContextHandle, x: f32, y: f32) -> Result<()> {
        self.post_scene(handle, move |scene| scene.grab_update(x, y))
    }

    pub fn pan_end(&self, handle: ContextHandle) -> Result<()> {
        self.with_scene(handle, |scene| scene.grab_end())
    }

    pub fn rotate_start(&self, handle: ContextHandle, x: f32, y: f32) -> Result<()> {
        self.with_scene(handle, move |scene| scene.grab_begin(x, y, GrabMode::Rotate))
    }

    pub fn rotate_update(&self, handle: ContextHandle, x: f32, y: f32) -> Result<()> {
        self.post_scene(handle, move |scene| scene.grab_update(x, y))
    }

    pub fn rotate_end(&self, handle: ContextHandle) -> Result<()> {
        self.with_scene(handle, |scene| scene.grab_end())
    }

    // --- transforms (streamed) ---------------------------------------------

    pub fn set_position(&self, handle: ContextHandle, entity: EntityId, position: [f32; 3]) -> Result<()> {
        self.post_scene(handle, move |scene| scene.set_position(entity, position))
    }

    pub fn set_rotation(
        &self,
        handle: ContextHandle,
        entity: EntityId,
        radians: f32,
        axis: [f32; 3],
    ) -> Result<()> {
        self.post_scene(handle, move |scene| scene.set_rotation(entity, radians, axis))
    }

    pub fn set_scale(&self, handle: ContextHandle, entity: EntityId, scale: f32) -> Result<()> {
        self.post_scene(handle, move |scene| scene.set_scale(entity, scale))
    }

    // --- queries -----------------------------------------------------------

    pub fn pick(&self, handle: ContextHandle, x: u32, y: u32) -> Result<Option<EntityId>> {
        self.with_scene(handle, move |scene| scene.pick(x, y))
    }

    pub fn name_for_entity(&self, handle: ContextHandle, entity: EntityId) -> Result<Option<String>> {
        self.with_scene(handle, move |scene| scene.name_for_entity(entity))
    }

    /// Runs an arbitrary engine call on the render thread and waits for it.
    ///
    /// Escape hatch for engine features the fixed surface does not cover.
    pub fn with_engine<R, F>(&self, handle: ContextHandle, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn SceneEngine) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        // Fail fast on stale handles; the render thread checks again.
        self.render_loop.context_slot().check(handle)?;
        self.run(move |stage| f(stage.engine(handle)?).inspect_err(log_failure))
    }

    // --- plumbing ----------------------------------------------------------

    fn run<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Stage) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.render_loop.call(f)?
    }

    fn with_scene<R, F>(&self, handle: ContextHandle, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn SceneGraph) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.with_engine(handle, move |engine| f(engine.scene()))
    }

    fn post_engine<F>(&self, handle: ContextHandle, f: F) -> Result<()>
    where
        F: FnOnce(&mut dyn SceneEngine) -> Result<()> + Send + 'static,
    {
        self.render_loop.context_slot().check(handle)?;
        self.render_loop
            .post(move |stage: &mut Stage| f(stage.engine(handle)?))
    }

    fn post_scene<F>(&self, handle: ContextHandle, f: F) -> Result<()>
    where
        F: FnOnce(&mut dyn SceneGraph) -> Result<()> + Send + 'static,
    {
        self.post_engine(handle, move |engine| f(engine.scene()))
    }
}

/// Awaited failures reach the caller; the render-thread log gets them too.
fn log_failure(e: &Error) {
    match e {
        Error::GpuOperationFailed { .. } => log::error!("render task failed: {e}"),
        _ => log::warn!("render task failed: {e}"),
    }
}
