//! Per-entity spatial state
//!
//! Stores position, Euler orientation (degrees), scale, a rotation pivot and an
//! animation override matrix. The model matrix is derived lazily:
//!
//! ```text
//! model = animation * T(position) * T(-pivot) * R(orientation) * T(pivot) * S(scale)
//! ```
//!
//! so a vertex is scaled first, rotated about the pivot, translated, and
//! finally passed through the animation override. Every mutation emits a
//! [`TransformChange`] to subscribers, synchronously.

use std::cell::Cell;

use crate::events::{EventHandler, Notifier, SubscriptionId};
use crate::foundation::math::utils::{euler_degrees_from_quat, quat_from_euler_degrees};
use crate::foundation::math::{Iso3, Mat4, Transform as MathTransform, Translation3, Vec3};
use crate::scene::Component;

/// Who caused a transform mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// Scripts, authoring code, animation
    User,
    /// Physics write-back after a simulation step
    Physics,
}

/// Which part of the transform was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformField {
    /// Position setter
    Position,
    /// Orientation setter
    Orientation,
    /// Scale setter
    Scale,
    /// Pivot setter
    Pivot,
    /// Animation override setter
    Animation,
    /// Whole-matrix replacement
    Model,
    /// Pose written back from a simulated body
    PhysicsPose,
}

/// Notification emitted after every mutation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformChange {
    /// Field that was written
    pub field: TransformField,
    /// Source of the write
    pub origin: ChangeOrigin,
    /// Rigid pose (rotation about the pivot, then translation) after the write
    pub pose: Iso3,
    /// Scale after the write
    pub scale: Vec3,
}

impl TransformChange {
    /// Whether a physics body mirroring this transform must be moved
    ///
    /// Physics write-backs, scale and animation edits leave the body pose alone.
    pub fn moves_body(&self) -> bool {
        self.origin == ChangeOrigin::User
            && matches!(
                self.field,
                TransformField::Position
                    | TransformField::Orientation
                    | TransformField::Pivot
                    | TransformField::Model
            )
    }
}

/// Spatial state component with a memoized model matrix
#[derive(Debug)]
pub struct TransformState {
    position: Vec3,
    orientation: Vec3,
    scale: Vec3,
    pivot: Vec3,
    animation: Mat4,
    model: Cell<Mat4>,
    dirty: Cell<bool>,
    changed: Notifier<TransformChange>,
}

impl Component for TransformState {}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            orientation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            pivot: Vec3::zeros(),
            animation: Mat4::identity(),
            model: Cell::new(Mat4::identity()),
            dirty: Cell::new(true),
            changed: Notifier::new(),
        }
    }
}

impl TransformState {
    /// Identity transform
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: Set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder pattern: Set orientation (Euler degrees)
    pub fn with_orientation(mut self, degrees: Vec3) -> Self {
        self.orientation = degrees;
        self
    }

    /// Builder pattern: Set scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder pattern: Set uniform scale
    pub fn with_uniform_scale(self, scale: f32) -> Self {
        self.with_scale(Vec3::new(scale, scale, scale))
    }

    /// Builder pattern: Set rotation pivot
    pub fn with_pivot(mut self, pivot: Vec3) -> Self {
        self.pivot = pivot;
        self
    }

    /// Position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Orientation as Euler angles in degrees
    pub fn orientation(&self) -> Vec3 {
        self.orientation
    }

    /// Scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Rotation pivot, in local space
    pub fn pivot(&self) -> Vec3 {
        self.pivot
    }

    /// Animation override matrix
    pub fn animation(&self) -> Mat4 {
        self.animation
    }

    /// Set position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.commit(TransformField::Position, ChangeOrigin::User);
    }

    /// Set orientation (Euler degrees)
    pub fn set_orientation(&mut self, degrees: Vec3) {
        self.orientation = degrees;
        self.commit(TransformField::Orientation, ChangeOrigin::User);
    }

    /// Set scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.commit(TransformField::Scale, ChangeOrigin::User);
    }

    /// Set rotation pivot
    pub fn set_pivot(&mut self, pivot: Vec3) {
        self.pivot = pivot;
        self.commit(TransformField::Pivot, ChangeOrigin::User);
    }

    /// Set the animation override applied after everything else
    pub fn set_animation(&mut self, animation: Mat4) {
        self.animation = animation;
        self.commit(TransformField::Animation, ChangeOrigin::User);
    }

    /// Replace the whole model matrix
    ///
    /// The matrix is decomposed into position, orientation and scale. Pivot and
    /// animation override are reset; shear is discarded.
    pub fn set_model(&mut self, model: Mat4) {
        let decomposed = MathTransform::from_matrix(model);
        self.position = decomposed.position;
        self.orientation = euler_degrees_from_quat(&decomposed.rotation);
        self.scale = decomposed.scale;
        self.pivot = Vec3::zeros();
        self.animation = Mat4::identity();
        self.commit(TransformField::Model, ChangeOrigin::User);
    }

    /// Apply a simulated body pose, keeping scale and pivot
    pub fn apply_physics_pose(&mut self, pose: &Iso3) {
        let rotation = pose.rotation;
        self.orientation = euler_degrees_from_quat(&rotation);
        self.position = pose.translation.vector - (rotation * self.pivot - self.pivot);
        self.commit(TransformField::PhysicsPose, ChangeOrigin::Physics);
    }

    /// Model matrix, recomputed only if a field changed since the last read
    pub fn model(&self) -> Mat4 {
        if self.dirty.get() {
            self.model.set(compose_model(
                &self.position,
                &self.orientation,
                &self.scale,
                &self.pivot,
                &self.animation,
            ));
            self.dirty.set(false);
        }
        self.model.get()
    }

    /// Whether the cached model matrix is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Rigid part of the model: rotation about the pivot, then translation
    ///
    /// Scale and animation override are excluded. This is the pose a physics
    /// body mirrors.
    pub fn rigid_pose(&self) -> Iso3 {
        let rotation = quat_from_euler_degrees(&self.orientation);
        let translation = self.position + rotation * self.pivot - self.pivot;
        Iso3::from_parts(Translation3::from(translation), rotation)
    }

    /// Register a change handler
    pub fn subscribe(&mut self, handler: impl EventHandler<TransformChange> + 'static) -> SubscriptionId {
        self.changed.subscribe(handler)
    }

    /// Remove a change handler
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.changed.unsubscribe(id)
    }

    /// Number of registered change handlers
    pub fn subscriber_count(&self) -> usize {
        self.changed.len()
    }

    fn commit(&mut self, field: TransformField, origin: ChangeOrigin) {
        self.dirty.set(true);
        let change = TransformChange {
            field,
            origin,
            pose: self.rigid_pose(),
            scale: self.scale,
        };
        self.changed.notify(&change);
    }
}

/// Compose a model matrix from transform fields
pub fn compose_model(position: &Vec3, orientation: &Vec3, scale: &Vec3, pivot: &Vec3, animation: &Mat4) -> Mat4 {
    let rotation = quat_from_euler_degrees(orientation).to_homogeneous();
    animation
        * Mat4::new_translation(position)
        * Mat4::new_translation(&-pivot)
        * rotation
        * Mat4::new_translation(pivot)
        * Mat4::new_nonuniform_scaling(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_identity_model() {
        let transform = TransformState::new();
        assert_relative_eq!(transform.model(), Mat4::identity());
    }

    #[test]
    fn test_position_becomes_translation() {
        let mut transform = TransformState::new();
        let position = Vec3::new(3.0, -1.0, 2.5);
        transform.set_position(position);

        let model = transform.model();
        assert_relative_eq!(Vec3::new(model.m14, model.m24, model.m34), position);
    }

    #[test]
    fn test_model_is_memoized() {
        let mut transform = TransformState::new();
        transform.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert!(transform.is_dirty());

        let first = transform.model();
        assert!(!transform.is_dirty());
        assert_eq!(transform.model(), first);

        transform.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert!(transform.is_dirty());
        assert_eq!(transform.model(), first);
    }

    #[test]
    fn test_scale_applies_before_translation() {
        let transform = TransformState::new()
            .with_position(Vec3::new(10.0, 0.0, 0.0))
            .with_uniform_scale(2.0);

        let moved = transform.model().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Point3::new(12.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_is_about_pivot() {
        // Rotation is centred on -pivot in local space
        let transform = TransformState::new()
            .with_pivot(Vec3::new(-1.0, 0.0, 0.0))
            .with_orientation(Vec3::new(0.0, 0.0, 90.0));

        let fixed = transform.model().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(fixed, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_rigid_pose_matches_model_without_scale() {
        let transform = TransformState::new()
            .with_position(Vec3::new(0.5, 1.0, -2.0))
            .with_orientation(Vec3::new(30.0, 45.0, 10.0))
            .with_pivot(Vec3::new(0.2, 0.0, 0.1));

        let point = Point3::new(0.3, -0.7, 1.1);
        let via_model = transform.model().transform_point(&point);
        let via_pose = transform.rigid_pose() * point;
        assert_relative_eq!(via_model, via_pose, epsilon = 1e-4);
    }

    #[test]
    fn test_animation_applies_last() {
        let mut transform = TransformState::new().with_uniform_scale(2.0);
        transform.set_animation(Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)));

        let moved = transform.model().transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(moved, Point3::new(2.0, 5.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_set_model_decomposes_and_resets() {
        let mut transform = TransformState::new()
            .with_pivot(Vec3::new(1.0, 1.0, 1.0));
        transform.set_animation(Mat4::new_translation(&Vec3::new(0.0, 1.0, 0.0)));

        let source = TransformState::new()
            .with_position(Vec3::new(4.0, 5.0, 6.0))
            .with_orientation(Vec3::new(0.0, 30.0, 0.0))
            .with_scale(Vec3::new(1.0, 2.0, 3.0));
        transform.set_model(source.model());

        assert_relative_eq!(transform.position(), Vec3::new(4.0, 5.0, 6.0), epsilon = 1e-5);
        assert_relative_eq!(transform.scale(), Vec3::new(1.0, 2.0, 3.0), epsilon = 1e-5);
        assert_relative_eq!(transform.orientation(), Vec3::new(0.0, 30.0, 0.0), epsilon = 1e-3);
        assert_eq!(transform.pivot(), Vec3::zeros());
        assert_eq!(transform.animation(), Mat4::identity());
        assert_relative_eq!(transform.model(), source.model(), epsilon = 1e-4);
    }

    #[test]
    fn test_physics_pose_preserves_scale_and_pivot() {
        let pivot = Vec3::new(0.0, 0.5, 0.0);
        let mut transform = TransformState::new()
            .with_scale(Vec3::new(2.0, 2.0, 2.0))
            .with_pivot(pivot)
            .with_position(Vec3::new(1.0, 0.0, 0.0))
            .with_orientation(Vec3::new(0.0, 0.0, 20.0));

        let pose = transform.rigid_pose();
        transform.set_position(Vec3::zeros());
        transform.apply_physics_pose(&pose);

        assert_relative_eq!(transform.position(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(transform.orientation(), Vec3::new(0.0, 0.0, 20.0), epsilon = 1e-3);
        assert_eq!(transform.scale(), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(transform.pivot(), pivot);
    }

    #[test]
    fn test_every_mutation_notifies() {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        let mut transform = TransformState::new();
        let id = transform.subscribe(move |change: &TransformChange| {
            sink.borrow_mut().push((change.field, change.origin));
        });

        transform.set_position(Vec3::new(1.0, 0.0, 0.0));
        transform.set_scale(Vec3::new(2.0, 2.0, 2.0));
        transform.apply_physics_pose(&Iso3::identity());

        assert_eq!(
            *received.borrow(),
            vec![
                (TransformField::Position, ChangeOrigin::User),
                (TransformField::Scale, ChangeOrigin::User),
                (TransformField::PhysicsPose, ChangeOrigin::Physics),
            ]
        );

        assert!(transform.unsubscribe(id));
        transform.set_pivot(Vec3::zeros());
        assert_eq!(received.borrow().len(), 3);
    }

    #[test]
    fn test_moves_body_filter() {
        let change = |field, origin| TransformChange {
            field,
            origin,
            pose: Iso3::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        };

        assert!(change(TransformField::Position, ChangeOrigin::User).moves_body());
        assert!(change(TransformField::Model, ChangeOrigin::User).moves_body());
        assert!(!change(TransformField::Scale, ChangeOrigin::User).moves_body());
        assert!(!change(TransformField::Animation, ChangeOrigin::User).moves_body());
        assert!(!change(TransformField::PhysicsPose, ChangeOrigin::Physics).moves_body());
    }
}
