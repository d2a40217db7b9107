use approx::assert_relative_eq;

use crate::components::{ColliderBridge, Mesh, PhysicsMode, TransformState, VertexBuffer};
use crate::config::RaycastConfig;
use crate::foundation::math::{Point3, Vec3};
use crate::physics::{RaycastEngine, ScenePhysics, ShapeDescriptor};
use crate::scene::{NodeId, SceneGraph};

fn down_z() -> Vec3 {
    Vec3::new(0.0, 0.0, -1.0)
}

/// Entity with a transform and a unit cube mesh; returns (entity, mesh collider)
fn cube(scene: &mut SceneGraph, transform: TransformState) -> (NodeId, NodeId) {
    let transform = scene.create(transform);
    let mesh = scene.create(Mesh::new(VertexBuffer::unit_cube()));
    let entity = scene.spawn_entity([transform, mesh]).unwrap();
    (entity, mesh)
}

fn mesh_collider(scene: &SceneGraph, mesh: NodeId) -> NodeId {
    scene.get_component::<ColliderBridge>(mesh).unwrap()
}

#[test]
fn test_unit_cube_hit_and_miss() {
    let mut scene = SceneGraph::new();
    let (root, mesh) = cube(&mut scene, TransformState::new());
    scene.initialize_all(root).unwrap();
    let engine = RaycastEngine::default();

    let hit = engine
        .cast(&scene, root, Point3::new(0.0, 0.0, 5.0), down_z())
        .unwrap();
    assert_eq!(hit.collider, mesh_collider(&scene, mesh));
    assert_relative_eq!(hit.distance, 4.5, epsilon = 1e-5);
    assert_relative_eq!(hit.point, Point3::new(0.0, 0.0, 0.5), epsilon = 1e-5);

    assert!(engine
        .cast(&scene, root, Point3::new(10.0, 10.0, 10.0), down_z())
        .is_none());
}

#[test]
fn test_hit_follows_model_matrix() {
    let mut scene = SceneGraph::new();
    let moved = TransformState::new()
        .with_position(Vec3::new(0.0, 0.0, -3.0))
        .with_uniform_scale(2.0);
    let (root, _) = cube(&mut scene, moved);
    scene.initialize_all(root).unwrap();

    let hit = RaycastEngine::default()
        .cast(&scene, root, Point3::new(0.3, 0.6, 5.0), down_z())
        .unwrap();
    assert_relative_eq!(hit.distance, 7.0, epsilon = 1e-4);

    let transform = scene.get_component::<TransformState>(root).unwrap();
    scene
        .get_mut::<TransformState>(transform)
        .unwrap()
        .set_position(Vec3::new(5.0, 0.0, 0.0));
    assert!(RaycastEngine::default()
        .cast(&scene, root, Point3::new(0.3, 0.6, 5.0), down_z())
        .is_none());
}

#[test]
fn test_nearest_of_many_entities_wins() {
    let mut scene = SceneGraph::new();
    let group = scene.create_collection();
    let root = scene.spawn_entity([group]).unwrap();

    let mut expected = None;
    for i in 0..16 {
        let z = -(i as f32) * 2.0;
        let (entity, mesh) = cube(&mut scene, TransformState::new().with_position(Vec3::new(0.0, 0.0, z)));
        scene.collection_add(group, &[entity]).unwrap();
        if i == 0 {
            expected = Some(mesh);
        }
    }
    scene.initialize_all(root).unwrap();
    let expected = mesh_collider(&scene, expected.unwrap());

    let engine = RaycastEngine::new(&RaycastConfig {
        worker_threads: Some(4),
        ..RaycastConfig::default()
    });
    for _ in 0..8 {
        let hit = engine
            .cast(&scene, root, Point3::new(0.1, -0.2, 10.0), down_z())
            .unwrap();
        assert_eq!(hit.collider, expected);
        assert_relative_eq!(hit.distance, 9.5, epsilon = 1e-5);
    }
}

#[test]
fn test_hidden_meshes_are_still_hit() {
    let mut scene = SceneGraph::new();
    let transform = scene.create(TransformState::new());
    let mut hidden = Mesh::new(VertexBuffer::unit_cube());
    hidden.hidden = true;
    let mesh = scene.create(hidden);
    let root = scene.spawn_entity([transform, mesh]).unwrap();
    scene.initialize_all(root).unwrap();

    assert!(RaycastEngine::default()
        .cast(&scene, root, Point3::new(0.0, 0.0, 5.0), down_z())
        .is_some());
}

#[test]
fn test_hit_tracks_falling_body() {
    let mut scene = SceneGraph::new();
    let physics = scene.create(ScenePhysics::default());
    let group = scene.create_collection();
    let root = scene.spawn_entity([physics, group]).unwrap();

    let transform = scene.create(TransformState::new().with_position(Vec3::new(0.0, 5.0, 0.0)));
    let mesh = scene.create(Mesh::new(VertexBuffer::unit_cube()));
    let body = scene.create(
        ColliderBridge::new(PhysicsMode::Dynamic { mass: 1.0 }).with_shape(ShapeDescriptor::cube()),
    );
    let entity = scene.spawn_entity([transform, mesh, body]).unwrap();
    scene.collection_add(group, &[entity]).unwrap();
    scene.initialize_all(root).unwrap();

    for _ in 0..20 {
        scene.step_physics(root, 1.0 / 60.0).unwrap();
    }
    let y = scene.get::<TransformState>(transform).unwrap().position().y;
    assert!(y < 5.0);

    let hit = RaycastEngine::default()
        .cast(&scene, root, Point3::new(0.1, 20.0, 0.2), Vec3::new(0.0, -1.0, 0.0))
        .unwrap();
    assert_eq!(hit.collider, mesh_collider(&scene, mesh));
    assert_relative_eq!(hit.distance, 20.0 - (y + 0.5), epsilon = 1e-4);
}
