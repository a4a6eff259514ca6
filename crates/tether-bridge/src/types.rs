//! Plain value types crossing the bridge.

use std::time::Duration;

use tether_core::ContextHandle;

/// Scene entity id as handed out by the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub i32);

/// Linear RGBA color.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Drawable size in physical pixels plus the host's scale factor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale: f32,
}

impl Viewport {
    pub fn new(width: u32, height: u32, scale: f32) -> Self {
        Self {
            width,
            height,
            scale,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pointer value of a host-native surface (window, pixel buffer, ...).
///
/// Never dereferenced by the bridge; only forwarded to the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NativeSurface(pub usize);

/// Host texture to render into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderTargetDesc {
    pub native_texture: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LightKind {
    Sun,
    Directional,
    Point,
    FocusedSpot,
    Spot,
}

impl LightKind {
    /// Maps the numeric light type used on the host channel.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Sun),
            1 => Some(Self::Directional),
            2 => Some(Self::Point),
            3 => Some(Self::FocusedSpot),
            4 => Some(Self::Spot),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// Color temperature in kelvin.
    pub temperature: f32,
    pub intensity: f32,
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub cast_shadows: bool,
}

impl Light {
    /// Overhead daylight sun.
    pub fn sun() -> Self {
        Self {
            kind: LightKind::Sun,
            temperature: 6500.0,
            intensity: 100_000.0,
            position: [0.0, 0.0, 0.0],
            direction: [0.0, -1.0, 0.0],
            cast_shadows: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ToneMapping {
    #[default]
    Aces,
    Filmic,
    Linear,
}

impl ToneMapping {
    pub fn from_i32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Aces),
            1 => Some(Self::Filmic),
            2 => Some(Self::Linear),
            _ => None,
        }
    }
}

/// Parameters of `play_animation`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlayAnimation {
    pub index: usize,
    pub looping: bool,
    pub reverse: bool,
    /// Stop other active animations on the same asset.
    pub replace_active: bool,
    /// Crossfade duration in seconds when replacing.
    pub crossfade: f32,
}

impl PlayAnimation {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            looping: false,
            reverse: false,
            replace_active: true,
            crossfade: 0.3,
        }
    }
}

/// Keyframed morph-target weights for one mesh.
///
/// `weights` holds `frame_count` rows of `targets.len()` values; row `i` sets
/// the weight of morph target `targets[j]` to `weights[i * targets.len() + j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphAnimation {
    pub targets: Vec<usize>,
    pub weights: Vec<f32>,
    pub frame_count: usize,
    pub frame_length: Duration,
}

impl MorphAnimation {
    /// Animation over the first `target_count` targets, in order.
    pub fn dense(weights: Vec<f32>, target_count: usize, frame_count: usize, frame_length: Duration) -> Self {
        Self {
            targets: (0..target_count).collect(),
            weights,
            frame_count,
            frame_length,
        }
    }
}

/// Keyframed bone rotations.
///
/// `frames` holds `frame_count` rows with one quaternion `[x, y, z, w]` per
/// entry of `bones`.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneAnimation {
    pub bones: Vec<String>,
    /// Meshes skinned by these bones.
    pub meshes: Vec<String>,
    pub frames: Vec<[f32; 4]>,
    pub frame_count: usize,
    pub frame_length: Duration,
    /// Rotations are in model space rather than relative to the bind pose.
    pub model_space: bool,
}

/// Orbit camera state driven by zoom and grab gestures.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraOrbit {
    /// Radians around the vertical axis.
    pub yaw: f32,
    /// Radians above the horizon, kept inside (-pi/2, pi/2).
    pub pitch: f32,
    pub distance: f32,
    pub target: [f32; 3],
}

impl Default for CameraOrbit {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 5.0,
            target: [0.0; 3],
        }
    }
}

/// What a pointer grab manipulates.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GrabMode {
    Pan,
    Rotate,
}

/// Describes a frame handed to the presenter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub context: ContextHandle,
    /// Frames presented by this bridge so far, starting at 0.
    pub sequence: u64,
    pub dt: Duration,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_light_codes() {
        assert_eq!(LightKind::from_u8(0), Some(LightKind::Sun));
        assert_eq!(LightKind::from_u8(4), Some(LightKind::Spot));
        assert_eq!(LightKind::from_u8(5), None);
    }

    #[test]
    fn host_tone_mapping_codes() {
        assert_eq!(ToneMapping::from_i32(1), Some(ToneMapping::Filmic));
        assert_eq!(ToneMapping::from_i32(-1), None);
    }

    #[test]
    fn empty_viewport() {
        assert!(Viewport::new(0, 10, 1.0).is_empty());
        assert!(!Viewport::new(10, 10, 2.0).is_empty());
    }
}
