//! Interfaces of the external renderer.
//!
//! The 3D engine is not part of this crate. It is reached through two
//! traits: `SceneEngine` for the per-context GPU plumbing (swap chain, render
//! target, frame production) and `SceneGraph` for scene mutation. Both are
//! only ever called on the render thread, so neither requires `Send`.

use std::sync::Arc;

use tether_core::{FrameOutcome, FrameTime, Result};

use crate::resource::ResourceLoader;
use crate::types::{
    BoneAnimation, CameraOrbit, Color, EntityId, GrabMode, Light, MorphAnimation, NativeSurface,
    PlayAnimation, RenderTargetDesc, ToneMapping, Viewport,
};

/// Parameters for creating a render context.
#[derive(Debug, Clone, Default)]
pub struct EngineInit {
    pub width: u32,
    pub height: u32,
    /// Precompiled material archive, if the engine needs one.
    pub uber_archive_path: Option<String>,
}

/// Builds an engine on the render thread.
pub type EngineFactory =
    Box<dyn Fn(&EngineInit, Arc<dyn ResourceLoader>) -> Result<Box<dyn SceneEngine>> + Send>;

pub trait SceneEngine {
    /// `surface == None` requests an offscreen swap chain.
    fn create_swap_chain(
        &mut self,
        surface: Option<NativeSurface>,
        width: u32,
        height: u32,
    ) -> Result<()>;

    fn destroy_swap_chain(&mut self) -> Result<()>;

    fn create_render_target(&mut self, desc: RenderTargetDesc) -> Result<()>;

    fn update_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Renders one frame into the current target.
    ///
    /// Returns `Skipped` when there is nothing to render into yet.
    fn render(&mut self, time: &FrameTime) -> Result<FrameOutcome>;

    /// Size of the current render target.
    fn target_size(&self) -> Option<(u32, u32)>;

    fn scene(&mut self) -> &mut dyn SceneGraph;
}

pub trait SceneGraph {
    fn set_background_color(&mut self, color: Color) -> Result<()>;
    fn set_background_image(&mut self, path: &str, fill_height: bool) -> Result<()>;
    fn set_background_image_position(&mut self, x: f32, y: f32, clamp: bool) -> Result<()>;
    fn clear_background_image(&mut self) -> Result<()>;

    fn load_skybox(&mut self, path: &str) -> Result<()>;
    fn remove_skybox(&mut self) -> Result<()>;
    fn load_ibl(&mut self, path: &str, intensity: f32) -> Result<()>;
    fn remove_ibl(&mut self) -> Result<()>;

    fn add_light(&mut self, light: Light) -> Result<EntityId>;
    fn remove_light(&mut self, light: EntityId) -> Result<()>;
    fn clear_lights(&mut self) -> Result<()>;

    fn load_glb(&mut self, path: &str, unlit: bool) -> Result<EntityId>;
    /// `resource_dir` is where external buffers/textures of the glTF live.
    fn load_gltf(&mut self, path: &str, resource_dir: &str) -> Result<EntityId>;
    fn remove_asset(&mut self, asset: EntityId) -> Result<()>;
    fn clear_assets(&mut self) -> Result<()>;

    fn animation_names(&self, asset: EntityId) -> Result<Vec<String>>;
    fn morph_target_names(&self, asset: EntityId, mesh: &str) -> Result<Vec<String>>;
    fn play_animation(&mut self, asset: EntityId, params: PlayAnimation) -> Result<()>;
    fn stop_animation(&mut self, asset: EntityId, index: usize) -> Result<()>;
    fn set_animation_frame(&mut self, asset: EntityId, index: usize, frame: u32) -> Result<()>;
    /// Length of an animation in seconds.
    fn animation_duration(&self, asset: EntityId, index: usize) -> Result<f32>;

    /// `weights` has one value per morph target of `mesh`.
    fn set_morph_target_weights(
        &mut self,
        asset: EntityId,
        mesh: &str,
        weights: &[f32],
    ) -> Result<()>;
    /// Replaces any morph animation running on `mesh`.
    fn set_morph_animation(
        &mut self,
        asset: EntityId,
        mesh: &str,
        animation: MorphAnimation,
    ) -> Result<()>;
    fn add_bone_animation(&mut self, asset: EntityId, animation: BoneAnimation) -> Result<()>;
    /// Sets the local transform (column-major 4x4) of `bone` in the skin of `mesh`.
    fn set_bone_transform(
        &mut self,
        asset: EntityId,
        mesh: &str,
        bone: &str,
        transform: [f32; 16],
    ) -> Result<()>;
    /// Drops bone animations and transforms, returning to the bind pose.
    fn reset_bones(&mut self, asset: EntityId) -> Result<()>;

    fn hide(&mut self, asset: EntityId, mesh: &str) -> Result<()>;
    fn reveal(&mut self, asset: EntityId, mesh: &str) -> Result<()>;
    fn set_material_color(
        &mut self,
        asset: EntityId,
        mesh: &str,
        material: usize,
        color: Color,
    ) -> Result<()>;
    /// Loads a texture onto the renderable at `renderable` of `asset`.
    fn load_texture(&mut self, asset: EntityId, path: &str, renderable: usize) -> Result<()>;
    /// Scales and centers `asset` so its bounds fit the [-1, 1] cube.
    fn transform_to_unit_cube(&mut self, asset: EntityId) -> Result<()>;

    /// Switches to a camera of `asset` (`node == None` picks its first one).
    /// Returns false if the asset has no matching camera.
    fn set_camera(&mut self, asset: EntityId, node: Option<&str>) -> Result<bool>;

    fn set_tone_mapping(&mut self, mode: ToneMapping) -> Result<()>;
    fn set_bloom(&mut self, strength: f32) -> Result<()>;
    fn set_post_processing(&mut self, enabled: bool) -> Result<()>;

    /// Moves the orbit camera towards (negative `delta`) or away from the
    /// pointer position.
    fn zoom(&mut self, x: f32, y: f32, delta: f32) -> Result<()>;
    fn grab_begin(&mut self, x: f32, y: f32, mode: GrabMode) -> Result<()>;
    fn grab_update(&mut self, x: f32, y: f32) -> Result<()>;
    fn grab_end(&mut self) -> Result<()>;
    fn camera_orbit(&self) -> Result<CameraOrbit>;

    fn set_position(&mut self, entity: EntityId, position: [f32; 3]) -> Result<()>;
    fn set_rotation(&mut self, entity: EntityId, radians: f32, axis: [f32; 3]) -> Result<()>;
    fn set_scale(&mut self, entity: EntityId, scale: f32) -> Result<()>;

    /// Entity under the given viewport pixel.
    fn pick(&self, x: u32, y: u32) -> Result<Option<EntityId>>;
    fn name_for_entity(&self, entity: EntityId) -> Result<Option<String>>;
}
