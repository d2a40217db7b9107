//! Math utilities and types
//!
//! Provides the nalgebra aliases shared by the scene graph, the physics bridge
//! and the raycaster, plus the Euler-angle and matrix decomposition helpers
//! used by `TransformState`.

pub use nalgebra::{Isometry3, Matrix3, Matrix4, Translation3, UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = UnitQuaternion<f32>;

/// Rigid transform (rotation + translation), the pose format used by the physics world
pub type Iso3 = Isometry3<f32>;

/// Scale factors below this magnitude are treated as degenerate during decomposition
const DEGENERATE_SCALE: f32 = 1.0e-8;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Create a transform from a transformation matrix
    ///
    /// Shear is discarded. A zero-length basis column keeps a zero scale on
    /// that axis and contributes an identity column to the rotation.
    pub fn from_matrix(matrix: Mat4) -> Self {
        // Extract position
        let position = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        // Extract scale from the matrix columns
        let x_axis = Vec3::new(matrix.m11, matrix.m21, matrix.m31);
        let y_axis = Vec3::new(matrix.m12, matrix.m22, matrix.m32);
        let z_axis = Vec3::new(matrix.m13, matrix.m23, matrix.m33);
        let scale = Vec3::new(x_axis.magnitude(), y_axis.magnitude(), z_axis.magnitude());

        // Extract rotation by removing scale from the basis columns
        let unscale = |axis: Vec3, s: f32, fallback: Vec3| {
            if s > DEGENERATE_SCALE { axis / s } else { fallback }
        };
        let rotation_matrix = Matrix3::from_columns(&[
            unscale(x_axis, scale.x, Vec3::x()),
            unscale(y_axis, scale.y, Vec3::y()),
            unscale(z_axis, scale.z, Vec3::z()),
        ]);
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Iso3, Quat, Translation3, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Component-wise linear interpolation between two vectors
    pub fn lerp_vec3(a: &Vec3, b: &Vec3, t: f32) -> Vec3 {
        a + (b - a) * t
    }

    /// Build a rotation from Euler angles in degrees (x = roll, y = pitch, z = yaw)
    pub fn quat_from_euler_degrees(degrees: &Vec3) -> Quat {
        Quat::from_euler_angles(
            deg_to_rad(degrees.x),
            deg_to_rad(degrees.y),
            deg_to_rad(degrees.z),
        )
    }

    /// Inverse of [`quat_from_euler_degrees`]
    pub fn euler_degrees_from_quat(rotation: &Quat) -> Vec3 {
        let (roll, pitch, yaw) = rotation.euler_angles();
        Vec3::new(rad_to_deg(roll), rad_to_deg(pitch), rad_to_deg(yaw))
    }

    /// Rigid pose from an optional offset and an optional Euler orientation in degrees
    pub fn pose_from_offset(position: Option<Vec3>, orientation: Option<Vec3>) -> Iso3 {
        let translation = Translation3::from(position.unwrap_or_else(Vec3::zeros));
        let rotation = orientation.map_or_else(Quat::identity, |o| quat_from_euler_degrees(&o));
        Iso3::from_parts(translation, rotation)
    }
}
