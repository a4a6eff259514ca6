//! Declared asset structure.
//!
//! The bookkeeping scene does not parse glTF, so everything it knows about
//! an asset's insides (animations, meshes, morph targets, bones, cameras,
//! bounds) comes from an `AssetCatalog` the host fills in, keyed by the path
//! the asset is loaded from. Assets missing from the catalog have no
//! structure at all.

use std::collections::{BTreeMap, HashMap};

/// Axis-aligned bounding box in model space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Bounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Bounds {
    pub fn center(&self) -> [f32; 3] {
        [0, 1, 2].map(|i| (self.min[i] + self.max[i]) * 0.5)
    }

    /// Length of the longest side.
    pub fn max_extent(&self) -> f32 {
        (0..3)
            .map(|i| self.max[i] - self.min[i])
            .fold(0.0, f32::max)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshDescription {
    pub morph_targets: Vec<String>,
    /// Number of material instances on the mesh.
    pub materials: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDescription {
    pub name: String,
    /// Length in seconds.
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssetDescription {
    pub animations: Vec<AnimationDescription>,
    /// Renderable meshes by name. Renderable indices follow this order.
    pub meshes: BTreeMap<String, MeshDescription>,
    pub bones: Vec<String>,
    pub cameras: Vec<String>,
    pub bounds: Option<Bounds>,
}

impl AssetDescription {
    pub fn with_animation(mut self, name: &str, duration: f32) -> Self {
        self.animations.push(AnimationDescription {
            name: name.to_string(),
            duration,
        });
        self
    }

    pub fn with_mesh(mut self, name: &str, morph_targets: &[&str], materials: usize) -> Self {
        self.meshes.insert(
            name.to_string(),
            MeshDescription {
                morph_targets: morph_targets.iter().map(|t| t.to_string()).collect(),
                materials,
            },
        );
        self
    }

    pub fn with_bones(mut self, bones: &[&str]) -> Self {
        self.bones.extend(bones.iter().map(|b| b.to_string()));
        self
    }

    pub fn with_camera(mut self, name: &str) -> Self {
        self.cameras.push(name.to_string());
        self
    }

    pub fn with_bounds(mut self, min: [f32; 3], max: [f32; 3]) -> Self {
        self.bounds = Some(Bounds { min, max });
        self
    }
}

/// Asset descriptions keyed by load path.
#[derive(Debug, Clone, Default)]
pub struct AssetCatalog {
    assets: HashMap<String, AssetDescription>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, desc: AssetDescription) -> Self {
        self.insert(path, desc);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, desc: AssetDescription) {
        self.assets.insert(path.into(), desc);
    }

    pub fn get(&self, path: &str) -> Option<&AssetDescription> {
        self.assets.get(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_center_and_extent() {
        let b = Bounds {
            min: [0.0, -1.0, 2.0],
            max: [4.0, 1.0, 3.0],
        };
        assert_eq!(b.center(), [2.0, 0.0, 2.5]);
        assert_eq!(b.max_extent(), 4.0);
    }

    #[test]
    fn builder_keeps_mesh_order_by_name() {
        let desc = AssetDescription::default()
            .with_mesh("face", &["smile"], 1)
            .with_mesh("body", &[], 2);
        let names: Vec<_> = desc.meshes.keys().cloned().collect();
        assert_eq!(names, ["body", "face"]);
    }
}
