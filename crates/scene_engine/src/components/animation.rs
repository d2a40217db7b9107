//! Keyframe animation driving the transform animation override

use crate::foundation::math::utils::{lerp, lerp_vec3};
use crate::foundation::math::{Mat4, Vec3};
use crate::scene::{Component, NodeId, SceneGraph, SceneResult};

use super::transform::compose_model;
use super::TransformState;

/// Transform pose at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    /// Seconds from the start of the clip
    pub time: f32,
    /// Position
    pub position: Vec3,
    /// Orientation, Euler degrees
    pub orientation: Vec3,
    /// Scale
    pub scale: Vec3,
    /// Rotation pivot
    pub pivot: Vec3,
}

impl Keyframe {
    /// Identity pose at `time`
    pub fn new(time: f32) -> Self {
        Self {
            time,
            position: Vec3::zeros(),
            orientation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            pivot: Vec3::zeros(),
        }
    }

    /// Builder pattern: Set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder pattern: Set orientation
    pub fn with_orientation(mut self, degrees: Vec3) -> Self {
        self.orientation = degrees;
        self
    }

    /// Builder pattern: Set scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder pattern: Set pivot
    pub fn with_pivot(mut self, pivot: Vec3) -> Self {
        self.pivot = pivot;
        self
    }

    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            time: lerp(self.time, other.time, t),
            position: lerp_vec3(&self.position, &other.position, t),
            orientation: lerp_vec3(&self.orientation, &other.orientation, t),
            scale: lerp_vec3(&self.scale, &other.scale, t),
            pivot: lerp_vec3(&self.pivot, &other.pivot, t),
        }
    }

    fn matrix(&self) -> Mat4 {
        compose_model(
            &self.position,
            &self.orientation,
            &self.scale,
            &self.pivot,
            &Mat4::identity(),
        )
    }
}

/// Clip of keyframes sorted by time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Animation {
    keyframes: Vec<Keyframe>,
}

impl Animation {
    /// Create a clip; keyframes are sorted by time
    pub fn new(mut keyframes: Vec<Keyframe>) -> Self {
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keyframes }
    }

    /// Keyframes in time order
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Time of the last keyframe
    pub fn duration(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    /// Override matrix at `time`
    ///
    /// Before the first keyframe the pose blends in from identity; past the
    /// end of the clip the result is identity.
    pub fn sample(&self, time: f32) -> Mat4 {
        let Some(first) = self.keyframes.first() else {
            return Mat4::identity();
        };
        if time > self.duration() {
            return Mat4::identity();
        }

        if time <= first.time {
            let t = if first.time > 0.0 { (time / first.time).max(0.0) } else { 1.0 };
            return Keyframe::new(0.0).lerp(first, t).matrix();
        }

        self.keyframes
            .windows(2)
            .find(|pair| time <= pair[1].time)
            .map_or_else(Mat4::identity, |pair| {
                let (start, end) = (&pair[0], &pair[1]);
                let span = end.time - start.time;
                let t = if span > 0.0 { (time - start.time) / span } else { 1.0 };
                start.lerp(end, t).matrix()
            })
    }
}

/// Plays animations on the parent entity's transform
#[derive(Debug, Clone, Default)]
pub struct AnimationController {
    last: Option<Animation>,
    current: Option<Animation>,
    time: f32,
    transform: Option<NodeId>,
}

impl AnimationController {
    /// Controller holding `animation` as its default clip, not playing
    pub fn new(animation: Animation) -> Self {
        Self {
            last: Some(animation),
            ..Self::default()
        }
    }

    /// Start `animation` from the beginning, or replay the last clip if `None`
    pub fn play(&mut self, animation: Option<Animation>) {
        if let Some(animation) = animation {
            self.last = Some(animation);
        }
        self.current = self.last.clone();
        self.time = 0.0;
    }

    /// Whether a clip is running
    pub fn is_playing(&self) -> bool {
        self.current.is_some()
    }

    /// Playback position in seconds
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Transform node resolved at activation
    pub fn transform(&self) -> Option<NodeId> {
        self.transform
    }

    /// Advance playback; returns the override to apply, if any
    ///
    /// When the clip runs out, playback stops and identity is returned once.
    pub fn advance(&mut self, dt: f32) -> Option<Mat4> {
        let animation = self.current.as_ref()?;
        self.time += dt;
        if self.time > animation.duration() {
            self.current = None;
            return Some(Mat4::identity());
        }
        Some(animation.sample(self.time))
    }
}

impl Component for AnimationController {
    fn on_activate(&mut self, scene: &mut SceneGraph, node: NodeId) -> SceneResult<()> {
        self.transform = scene
            .parent_of(node)
            .and_then(|parent| scene.try_get_component::<TransformState>(parent));
        if self.transform.is_none() {
            log::warn!("animation controller {node:?} has no transform to drive");
        }
        Ok(())
    }
}

impl SceneGraph {
    /// Advance every playing controller under `root` and write the sampled
    /// override into its transform
    pub fn update_animations(&mut self, root: NodeId, dt: f32) {
        let controllers: Vec<NodeId> = self.get_all_in_children::<AnimationController>(root).collect();
        for id in controllers {
            let Some(controller) = self.get_mut::<AnimationController>(id) else {
                continue;
            };
            let (Some(matrix), Some(transform)) = (controller.advance(dt), controller.transform()) else {
                continue;
            };
            if let Some(state) = self.get_mut::<TransformState>(transform) {
                state.set_animation(matrix);
            }
        }
    }
}
