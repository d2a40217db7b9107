//! Parallel nearest-hit ray query
//!
//! Every collider with vertex data contributes its triangles, moved to world
//! space by the owning transform's model matrix. Triangles are tested on a
//! rayon pool; the running best hit sits behind an upgradeable RW lock so
//! most rejections only take a shared read.

use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use rayon::prelude::*;
use rayon::ThreadPool;

use super::collision::{Ray, Triangle};
use crate::components::{ColliderBridge, TransformState};
use crate::config::RaycastConfig;
use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::scene::{NodeId, SceneGraph};

/// Nearest intersection found by a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Collider node owning the hit triangle
    pub collider: NodeId,
    /// Distance from the ray origin
    pub distance: f32,
    /// World-space hit point
    pub point: Point3,
}

/// Ray query engine
#[derive(Debug)]
pub struct RaycastEngine {
    epsilon: f32,
    pool: Option<ThreadPool>,
}

impl RaycastEngine {
    /// Create an engine; a dedicated pool is built if `worker_threads` is set
    pub fn new(config: &RaycastConfig) -> Self {
        let pool = config.worker_threads.and_then(|threads| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("raycast-{i}"))
                .build()
                .map_err(|err| log::warn!("raycast pool unavailable, using global pool: {err}"))
                .ok()
        });

        Self {
            epsilon: config.epsilon,
            pool,
        }
    }

    /// Nearest hit among every collider under `root`
    pub fn cast(&self, scene: &SceneGraph, root: NodeId, origin: Point3, direction: Vec3) -> Option<RaycastHit> {
        let ray = Ray::new(origin, direction)?;
        let triangles = collect_triangles(scene, root);
        self.cast_triangles(&triangles, &ray)
    }

    /// Nearest hit among pre-flattened world-space triangles
    pub fn cast_triangles(&self, triangles: &[Triangle], ray: &Ray) -> Option<RaycastHit> {
        let closest: RwLock<Option<RaycastHit>> = RwLock::new(None);
        let epsilon = self.epsilon;

        let test = |triangle: &Triangle| {
            let Some(distance) = triangle.intersect_ray(ray, epsilon) else {
                return;
            };
            if !is_closer(distance, &closest.read()) {
                return;
            }

            let guard = closest.upgradable_read();
            // Another worker may have committed a closer hit in between
            if is_closer(distance, &guard) {
                let mut best = RwLockUpgradableReadGuard::upgrade(guard);
                *best = Some(RaycastHit {
                    collider: triangle.owner,
                    distance,
                    point: ray.point_at(distance),
                });
            }
        };

        match &self.pool {
            Some(pool) => pool.install(|| triangles.par_iter().for_each(test)),
            None => triangles.par_iter().for_each(test),
        }

        closest.into_inner()
    }
}

impl Default for RaycastEngine {
    fn default() -> Self {
        Self::new(&RaycastConfig::default())
    }
}

fn is_closer(distance: f32, best: &Option<RaycastHit>) -> bool {
    best.as_ref().map_or(true, |hit| distance < hit.distance)
}

/// World-space triangles of every collider under `root` that has vertex data
pub fn collect_triangles(scene: &SceneGraph, root: NodeId) -> Vec<Triangle> {
    let mut triangles = Vec::new();
    for id in scene.get_all_in_children::<ColliderBridge>(root) {
        let Some(collider) = scene.get::<ColliderBridge>(id) else {
            continue;
        };
        let Some(vertices) = collider.vertices() else {
            continue;
        };

        let model = collider
            .transform_node(scene, id)
            .and_then(|t| scene.get::<TransformState>(t))
            .map_or_else(Mat4::identity, TransformState::model);

        triangles.extend(
            vertices
                .triangles()
                .map(|[v0, v1, v2]| Triangle::new(v0, v1, v2, id).transformed(&model)),
        );
    }
    triangles
}
