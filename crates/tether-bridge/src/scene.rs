//! In-memory scene bookkeeping.
//!
//! `BookkeepingScene` implements `SceneGraph` without any real 3D engine:
//! it loads every referenced resource through the host's `ResourceLoader`
//! (so missing files surface exactly as they would with a real engine),
//! releases the bytes right away, and keeps just enough state to answer
//! queries consistently. What an asset contains (animations, meshes, bones)
//! comes from the `AssetCatalog`. Both built-in engines use it.

use std::collections::{BTreeMap, BTreeSet};
use std::f32::consts::FRAC_PI_2;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tether_core::{Error, Result};

use crate::catalog::{AssetCatalog, AssetDescription, MeshDescription};
use crate::engine::SceneGraph;
use crate::resource::{load_resource, ResourceLoader};
use crate::types::{
    BoneAnimation, CameraOrbit, Color, EntityId, GrabMode, Light, LightKind, MorphAnimation,
    PlayAnimation, ToneMapping,
};

const ZOOM_STEP: f32 = 1.1;
const MIN_DISTANCE: f32 = 0.05;
/// Radians per pixel of pointer travel.
const ROTATE_SPEED: f32 = 0.01;
/// Fraction of the orbit distance per pixel of pointer travel.
const PAN_SPEED: f32 = 0.002;
const MAX_PITCH: f32 = FRAC_PI_2 - 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundImage {
    pub path: String,
    pub fill_height: bool,
    pub offset: (f32, f32),
    pub clamp: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: (f32, [f32; 3]),
    pub scale: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: (0.0, [0.0, 1.0, 0.0]),
            scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveAnimation {
    pub index: usize,
    pub looping: bool,
    pub reverse: bool,
    /// Pinned frame set through `set_animation_frame`.
    pub frame: Option<u32>,
}

#[derive(Debug, Clone)]
struct AssetRecord {
    path: String,
    bytes: usize,
    unlit: bool,
    desc: AssetDescription,
    active: Vec<ActiveAnimation>,
    transform: Transform,
    weights: BTreeMap<String, Vec<f32>>,
    morph_animations: BTreeMap<String, MorphAnimation>,
    bone_animations: Vec<BoneAnimation>,
    bone_transforms: BTreeMap<(String, String), [f32; 16]>,
    hidden: BTreeSet<String>,
    material_colors: BTreeMap<(String, usize), Color>,
    textures: BTreeMap<usize, String>,
}

impl AssetRecord {
    fn mesh(&self, name: &str) -> Result<&MeshDescription> {
        self.desc.meshes.get(name).ok_or_else(|| {
            Error::invalid(format!("asset `{}` has no mesh named `{name}`", self.path))
        })
    }

    fn check_bone(&self, bone: &str) -> Result<()> {
        if self.desc.bones.iter().any(|b| b == bone) {
            Ok(())
        } else {
            Err(Error::invalid(format!(
                "asset `{}` has no bone named `{bone}`",
                self.path
            )))
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Grab {
    mode: GrabMode,
    last: (f32, f32),
}

#[derive(Debug, Clone, Copy)]
struct LightRecord {
    light: Light,
    transform: Transform,
}

pub struct BookkeepingScene {
    loader: Arc<dyn ResourceLoader>,
    catalog: Arc<AssetCatalog>,
    next_entity: i32,
    assets: BTreeMap<EntityId, AssetRecord>,
    lights: BTreeMap<EntityId, LightRecord>,
    background: Color,
    background_image: Option<BackgroundImage>,
    skybox: Option<String>,
    ibl: Option<(String, f32)>,
    camera: Option<(EntityId, Option<String>)>,
    tone_mapping: ToneMapping,
    bloom: f32,
    post_processing: bool,
    orbit: CameraOrbit,
    grab: Option<Grab>,
}

impl BookkeepingScene {
    /// Scene whose assets have no declared structure.
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self::with_catalog(loader, Arc::new(AssetCatalog::new()))
    }

    pub fn with_catalog(loader: Arc<dyn ResourceLoader>, catalog: Arc<AssetCatalog>) -> Self {
        Self {
            loader,
            catalog,
            next_entity: 0,
            assets: BTreeMap::new(),
            lights: BTreeMap::new(),
            background: Color::BLACK,
            background_image: None,
            skybox: None,
            ibl: None,
            camera: None,
            tone_mapping: ToneMapping::default(),
            bloom: 0.0,
            post_processing: true,
            orbit: CameraOrbit::default(),
            grab: None,
        }
    }

    pub fn background_color(&self) -> Color {
        self.background
    }

    pub fn background_image(&self) -> Option<&BackgroundImage> {
        self.background_image.as_ref()
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Size of the loaded bytes and whether the asset was loaded unlit.
    pub fn asset_info(&self, asset: EntityId) -> Option<(usize, bool)> {
        self.assets.get(&asset).map(|a| (a.bytes, a.unlit))
    }

    pub fn skybox(&self) -> Option<&str> {
        self.skybox.as_deref()
    }

    pub fn ibl(&self) -> Option<(&str, f32)> {
        self.ibl.as_ref().map(|(path, intensity)| (path.as_str(), *intensity))
    }

    pub fn camera(&self) -> Option<(EntityId, Option<&str>)> {
        self.camera
            .as_ref()
            .map(|(asset, node)| (*asset, node.as_deref()))
    }

    pub fn bloom(&self) -> f32 {
        self.bloom
    }

    pub fn active_animations(&self, asset: EntityId) -> &[ActiveAnimation] {
        self.assets
            .get(&asset)
            .map(|a| a.active.as_slice())
            .unwrap_or(&[])
    }

    pub fn transform(&self, entity: EntityId) -> Option<Transform> {
        self.assets
            .get(&entity)
            .map(|a| a.transform)
            .or_else(|| self.lights.get(&entity).map(|l| l.transform))
    }

    pub fn tone_mapping(&self) -> ToneMapping {
        self.tone_mapping
    }

    pub fn post_processing(&self) -> bool {
        self.post_processing
    }

    pub fn morph_weights(&self, asset: EntityId, mesh: &str) -> Option<&[f32]> {
        self.assets.get(&asset)?.weights.get(mesh).map(Vec::as_slice)
    }

    pub fn morph_animation(&self, asset: EntityId, mesh: &str) -> Option<&MorphAnimation> {
        self.assets.get(&asset)?.morph_animations.get(mesh)
    }

    pub fn bone_animations(&self, asset: EntityId) -> &[BoneAnimation] {
        self.assets
            .get(&asset)
            .map(|a| a.bone_animations.as_slice())
            .unwrap_or(&[])
    }

    pub fn bone_transform(&self, asset: EntityId, mesh: &str, bone: &str) -> Option<[f32; 16]> {
        self.assets
            .get(&asset)?
            .bone_transforms
            .get(&(mesh.to_string(), bone.to_string()))
            .copied()
    }

    pub fn is_hidden(&self, asset: EntityId, mesh: &str) -> bool {
        self.assets
            .get(&asset)
            .is_some_and(|a| a.hidden.contains(mesh))
    }

    pub fn material_color(&self, asset: EntityId, mesh: &str, material: usize) -> Option<Color> {
        self.assets
            .get(&asset)?
            .material_colors
            .get(&(mesh.to_string(), material))
            .copied()
    }

    pub fn texture(&self, asset: EntityId, renderable: usize) -> Option<&str> {
        self.assets
            .get(&asset)?
            .textures
            .get(&renderable)
            .map(String::as_str)
    }

    /// Fetches and releases a resource, returning its size.
    fn touch(&self, name: &str) -> Result<usize> {
        let buffer = load_resource(self.loader.as_ref(), name)?;
        let len = buffer.len();
        self.loader.free(buffer);
        Ok(len)
    }

    fn allocate(&mut self) -> EntityId {
        self.next_entity += 1;
        EntityId(self.next_entity)
    }

    fn insert_asset(&mut self, path: &str, bytes: usize, unlit: bool) -> EntityId {
        let id = self.allocate();
        let desc = self.catalog.get(path).cloned().unwrap_or_default();
        self.assets.insert(
            id,
            AssetRecord {
                path: path.to_string(),
                bytes,
                unlit,
                desc,
                active: Vec::new(),
                transform: Transform::default(),
                weights: BTreeMap::new(),
                morph_animations: BTreeMap::new(),
                bone_animations: Vec::new(),
                bone_transforms: BTreeMap::new(),
                hidden: BTreeSet::new(),
                material_colors: BTreeMap::new(),
                textures: BTreeMap::new(),
            },
        );
        log::debug!("asset {id:?} loaded from {path} ({bytes} bytes, unlit: {unlit})");
        id
    }

    fn asset(&self, id: EntityId) -> Result<&AssetRecord> {
        self.assets
            .get(&id)
            .ok_or_else(|| Error::invalid(format!("no asset with entity id {}", id.0)))
    }

    fn asset_mut(&mut self, id: EntityId) -> Result<&mut AssetRecord> {
        self.assets
            .get_mut(&id)
            .ok_or_else(|| Error::invalid(format!("no asset with entity id {}", id.0)))
    }

    fn transform_mut(&mut self, entity: EntityId) -> Result<&mut Transform> {
        if let Some(asset) = self.assets.get_mut(&entity) {
            return Ok(&mut asset.transform);
        }
        self.lights
            .get_mut(&entity)
            .map(|l| &mut l.transform)
            .ok_or_else(|| Error::invalid(format!("no entity with id {}", entity.0)))
    }
}

fn check_animation(asset: &AssetRecord, index: usize) -> Result<()> {
    let count = asset.desc.animations.len();
    if index < count {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "animation index {index} out of range ({count} animations)"
        )))
    }
}

fn check_frames(
    what: &str,
    values: usize,
    per_frame: usize,
    frames: usize,
    frame_length: Duration,
) -> Result<()> {
    if frames == 0 || frame_length.is_zero() {
        return Err(Error::invalid(format!(
            "{what} needs at least one frame of non-zero length"
        )));
    }
    if values != per_frame * frames {
        return Err(Error::invalid(format!(
            "{what} has {values} values, expected {per_frame} x {frames} frames"
        )));
    }
    Ok(())
}

impl SceneGraph for BookkeepingScene {
    fn set_background_color(&mut self, color: Color) -> Result<()> {
        self.background = color;
        Ok(())
    }

    fn set_background_image(&mut self, path: &str, fill_height: bool) -> Result<()> {
        self.touch(path)?;
        self.background_image = Some(BackgroundImage {
            path: path.to_string(),
            fill_height,
            offset: (0.0, 0.0),
            clamp: false,
        });
        Ok(())
    }

    fn set_background_image_position(&mut self, x: f32, y: f32, clamp: bool) -> Result<()> {
        let image = self
            .background_image
            .as_mut()
            .ok_or_else(|| Error::invalid("no background image set"))?;
        image.offset = (x, y);
        image.clamp = clamp;
        Ok(())
    }

    fn clear_background_image(&mut self) -> Result<()> {
        self.background_image = None;
        Ok(())
    }

    fn load_skybox(&mut self, path: &str) -> Result<()> {
        self.touch(path)?;
        self.skybox = Some(path.to_string());
        Ok(())
    }

    fn remove_skybox(&mut self) -> Result<()> {
        self.skybox = None;
        Ok(())
    }

    fn load_ibl(&mut self, path: &str, intensity: f32) -> Result<()> {
        self.touch(path)?;
        self.ibl = Some((path.to_string(), intensity));
        Ok(())
    }

    fn remove_ibl(&mut self) -> Result<()> {
        self.ibl = None;
        Ok(())
    }

    fn add_light(&mut self, light: Light) -> Result<EntityId> {
        if !(light.intensity.is_finite() && light.intensity >= 0.0) {
            return Err(Error::invalid("light intensity must be finite and non-negative"));
        }
        let id = self.allocate();
        let transform = Transform {
            position: light.position,
            ..Transform::default()
        };
        self.lights.insert(id, LightRecord { light, transform });
        Ok(id)
    }

    fn remove_light(&mut self, light: EntityId) -> Result<()> {
        self.lights
            .remove(&light)
            .map(|_| ())
            .ok_or_else(|| Error::invalid(format!("no light with entity id {}", light.0)))
    }

    fn clear_lights(&mut self) -> Result<()> {
        self.lights.clear();
        Ok(())
    }

    fn load_glb(&mut self, path: &str, unlit: bool) -> Result<EntityId> {
        let bytes = self.touch(path)?;
        Ok(self.insert_asset(path, bytes, unlit))
    }

    fn load_gltf(&mut self, path: &str, resource_dir: &str) -> Result<EntityId> {
        let bytes = self.touch(path)?;
        log::debug!("external glTF resources resolve under `{resource_dir}`");
        Ok(self.insert_asset(path, bytes, false))
    }

    fn remove_asset(&mut self, asset: EntityId) -> Result<()> {
        self.assets
            .remove(&asset)
            .ok_or_else(|| Error::invalid(format!("no asset with entity id {}", asset.0)))?;
        if self.camera.as_ref().is_some_and(|(owner, _)| *owner == asset) {
            self.camera = None;
        }
        Ok(())
    }

    fn clear_assets(&mut self) -> Result<()> {
        self.assets.clear();
        self.camera = None;
        Ok(())
    }

    fn animation_names(&self, asset: EntityId) -> Result<Vec<String>> {
        Ok(self
            .asset(asset)?
            .desc
            .animations
            .iter()
            .map(|a| a.name.clone())
            .collect())
    }

    fn morph_target_names(&self, asset: EntityId, mesh: &str) -> Result<Vec<String>> {
        Ok(self
            .asset(asset)?
            .desc
            .meshes
            .get(mesh)
            .map(|m| m.morph_targets.clone())
            .unwrap_or_default())
    }

    fn play_animation(&mut self, asset: EntityId, params: PlayAnimation) -> Result<()> {
        let record = self.asset_mut(asset)?;
        check_animation(record, params.index)?;
        if params.replace_active {
            record.active.clear();
        } else {
            record.active.retain(|a| a.index != params.index);
        }
        record.active.push(ActiveAnimation {
            index: params.index,
            looping: params.looping,
            reverse: params.reverse,
            frame: None,
        });
        Ok(())
    }

    fn stop_animation(&mut self, asset: EntityId, index: usize) -> Result<()> {
        let record = self.asset_mut(asset)?;
        check_animation(record, index)?;
        record.active.retain(|a| a.index != index);
        Ok(())
    }

    fn set_animation_frame(&mut self, asset: EntityId, index: usize, frame: u32) -> Result<()> {
        let record = self.asset_mut(asset)?;
        check_animation(record, index)?;
        match record.active.iter_mut().find(|a| a.index == index) {
            Some(active) => active.frame = Some(frame),
            None => record.active.push(ActiveAnimation {
                index,
                looping: false,
                reverse: false,
                frame: Some(frame),
            }),
        }
        Ok(())
    }

    fn animation_duration(&self, asset: EntityId, index: usize) -> Result<f32> {
        let record = self.asset(asset)?;
        check_animation(record, index)?;
        Ok(record.desc.animations[index].duration)
    }

    fn set_morph_target_weights(
        &mut self,
        asset: EntityId,
        mesh: &str,
        weights: &[f32],
    ) -> Result<()> {
        let record = self.asset_mut(asset)?;
        let targets = record.mesh(mesh)?.morph_targets.len();
        if weights.len() != targets {
            return Err(Error::invalid(format!(
                "mesh `{mesh}` has {targets} morph targets, got {} weights",
                weights.len()
            )));
        }
        record.weights.insert(mesh.to_string(), weights.to_vec());
        Ok(())
    }

    fn set_morph_animation(
        &mut self,
        asset: EntityId,
        mesh: &str,
        animation: MorphAnimation,
    ) -> Result<()> {
        let record = self.asset_mut(asset)?;
        let targets = record.mesh(mesh)?.morph_targets.len();
        if animation.targets.is_empty() {
            return Err(Error::invalid("morph animation targets no morph target"));
        }
        if let Some(bad) = animation.targets.iter().find(|&&t| t >= targets) {
            return Err(Error::invalid(format!(
                "morph target index {bad} out of range ({targets} targets on `{mesh}`)"
            )));
        }
        check_frames(
            "morph animation",
            animation.weights.len(),
            animation.targets.len(),
            animation.frame_count,
            animation.frame_length,
        )?;
        record.morph_animations.insert(mesh.to_string(), animation);
        Ok(())
    }

    fn add_bone_animation(&mut self, asset: EntityId, animation: BoneAnimation) -> Result<()> {
        let record = self.asset_mut(asset)?;
        if animation.bones.is_empty() {
            return Err(Error::invalid("bone animation names no bone"));
        }
        for bone in &animation.bones {
            record.check_bone(bone)?;
        }
        for mesh in &animation.meshes {
            record.mesh(mesh)?;
        }
        check_frames(
            "bone animation",
            animation.frames.len(),
            animation.bones.len(),
            animation.frame_count,
            animation.frame_length,
        )?;
        record.bone_animations.push(animation);
        Ok(())
    }

    fn set_bone_transform(
        &mut self,
        asset: EntityId,
        mesh: &str,
        bone: &str,
        transform: [f32; 16],
    ) -> Result<()> {
        let record = self.asset_mut(asset)?;
        record.mesh(mesh)?;
        record.check_bone(bone)?;
        record
            .bone_transforms
            .insert((mesh.to_string(), bone.to_string()), transform);
        Ok(())
    }

    fn reset_bones(&mut self, asset: EntityId) -> Result<()> {
        let record = self.asset_mut(asset)?;
        record.bone_animations.clear();
        record.bone_transforms.clear();
        Ok(())
    }

    fn hide(&mut self, asset: EntityId, mesh: &str) -> Result<()> {
        let record = self.asset_mut(asset)?;
        record.mesh(mesh)?;
        record.hidden.insert(mesh.to_string());
        Ok(())
    }

    fn reveal(&mut self, asset: EntityId, mesh: &str) -> Result<()> {
        let record = self.asset_mut(asset)?;
        record.mesh(mesh)?;
        record.hidden.remove(mesh);
        Ok(())
    }

    fn set_material_color(
        &mut self,
        asset: EntityId,
        mesh: &str,
        material: usize,
        color: Color,
    ) -> Result<()> {
        let record = self.asset_mut(asset)?;
        let materials = record.mesh(mesh)?.materials;
        if material >= materials {
            return Err(Error::invalid(format!(
                "material {material} out of range ({materials} on `{mesh}`)"
            )));
        }
        record
            .material_colors
            .insert((mesh.to_string(), material), color);
        Ok(())
    }

    fn load_texture(&mut self, asset: EntityId, path: &str, renderable: usize) -> Result<()> {
        let renderables = self.asset(asset)?.desc.meshes.len();
        if renderable >= renderables {
            return Err(Error::invalid(format!(
                "renderable {renderable} out of range ({renderables} renderables)"
            )));
        }
        self.touch(path)?;
        self.asset_mut(asset)?
            .textures
            .insert(renderable, path.to_string());
        Ok(())
    }

    fn transform_to_unit_cube(&mut self, asset: EntityId) -> Result<()> {
        let record = self.asset_mut(asset)?;
        let bounds = record
            .desc
            .bounds
            .ok_or_else(|| Error::invalid(format!("bounds of `{}` are unknown", record.path)))?;
        let extent = bounds.max_extent();
        if !(extent.is_finite() && extent > 0.0) {
            return Err(Error::invalid(format!("`{}` has empty bounds", record.path)));
        }
        let scale = 2.0 / extent;
        record.transform.scale = scale;
        record.transform.position = bounds.center().map(|c| -c * scale);
        Ok(())
    }

    fn set_camera(&mut self, asset: EntityId, node: Option<&str>) -> Result<bool> {
        let record = self.asset(asset)?;
        let found = match node {
            Some(name) => record.desc.cameras.iter().any(|c| c == name),
            None => !record.desc.cameras.is_empty(),
        };
        if found {
            self.camera = Some((asset, node.map(str::to_string)));
        }
        Ok(found)
    }

    fn set_tone_mapping(&mut self, mode: ToneMapping) -> Result<()> {
        self.tone_mapping = mode;
        Ok(())
    }

    fn set_bloom(&mut self, strength: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(Error::invalid(format!("bloom strength {strength} outside [0, 1]")));
        }
        self.bloom = strength;
        Ok(())
    }

    fn set_post_processing(&mut self, enabled: bool) -> Result<()> {
        self.post_processing = enabled;
        Ok(())
    }

    fn zoom(&mut self, _x: f32, _y: f32, delta: f32) -> Result<()> {
        if !delta.is_finite() {
            return Err(Error::invalid("zoom delta must be finite"));
        }
        // Orbit zoom ignores the pointer position.
        self.orbit.distance = (self.orbit.distance * ZOOM_STEP.powf(delta)).max(MIN_DISTANCE);
        Ok(())
    }

    fn grab_begin(&mut self, x: f32, y: f32, mode: GrabMode) -> Result<()> {
        self.grab = Some(Grab { mode, last: (x, y) });
        Ok(())
    }

    fn grab_update(&mut self, x: f32, y: f32) -> Result<()> {
        let grab = self
            .grab
            .as_mut()
            .ok_or_else(|| Error::invalid("no grab in progress"))?;
        let (dx, dy) = (x - grab.last.0, y - grab.last.1);
        grab.last = (x, y);

        let orbit = &mut self.orbit;
        match grab.mode {
            GrabMode::Rotate => {
                orbit.yaw -= dx * ROTATE_SPEED;
                orbit.pitch = (orbit.pitch + dy * ROTATE_SPEED).clamp(-MAX_PITCH, MAX_PITCH);
            }
            GrabMode::Pan => {
                // Screen-right in the ground plane, screen-up along +Y.
                let step = orbit.distance * PAN_SPEED;
                let (sin, cos) = orbit.yaw.sin_cos();
                orbit.target[0] -= cos * dx * step;
                orbit.target[2] += sin * dx * step;
                orbit.target[1] += dy * step;
            }
        }
        Ok(())
    }

    fn grab_end(&mut self) -> Result<()> {
        self.grab = None;
        Ok(())
    }

    fn camera_orbit(&self) -> Result<CameraOrbit> {
        Ok(self.orbit)
    }

    fn set_position(&mut self, entity: EntityId, position: [f32; 3]) -> Result<()> {
        self.transform_mut(entity)?.position = position;
        Ok(())
    }

    fn set_rotation(&mut self, entity: EntityId, radians: f32, axis: [f32; 3]) -> Result<()> {
        self.transform_mut(entity)?.rotation = (radians, axis);
        Ok(())
    }

    fn set_scale(&mut self, entity: EntityId, scale: f32) -> Result<()> {
        self.transform_mut(entity)?.scale = scale;
        Ok(())
    }

    fn pick(&self, _x: u32, _y: u32) -> Result<Option<EntityId>> {
        // No geometry is kept, so nothing can be hit.
        Ok(None)
    }

    fn name_for_entity(&self, entity: EntityId) -> Result<Option<String>> {
        if let Some(asset) = self.assets.get(&entity) {
            let stem = Path::new(&asset.path)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&asset.path);
            return Ok(Some(stem.to_string()));
        }
        Ok(self.lights.get(&entity).map(|l| {
            let kind = match l.light.kind {
                LightKind::Sun => "sun",
                LightKind::Directional => "directional",
                LightKind::Point => "point",
                LightKind::FocusedSpot => "focused-spot",
                LightKind::Spot => "spot",
            };
            format!("{kind}-light-{}", entity.0)
        }))
    }
}
