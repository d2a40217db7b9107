use approx::assert_relative_eq;

use crate::components::{
    Animation, AnimationController, ColliderBridge, Keyframe, PhysicsMode, TransformState,
};
use crate::foundation::math::Vec3;
use crate::physics::{ScenePhysics, ShapeDescriptor};
use crate::scene::{NodeId, SceneGraph};

const DT: f32 = 1.0 / 60.0;

struct Boxed {
    entity: NodeId,
    transform: NodeId,
    collider: NodeId,
}

fn physics_scene() -> (SceneGraph, NodeId, NodeId) {
    let mut scene = SceneGraph::new();
    let physics = scene.create(ScenePhysics::default());
    let group = scene.create_collection();
    let root = scene.spawn_entity([physics, group]).unwrap();
    (scene, root, group)
}

fn spawn_box(scene: &mut SceneGraph, group: NodeId, transform: TransformState, mode: PhysicsMode) -> Boxed {
    let transform = scene.create(transform);
    let collider = scene.create(ColliderBridge::new(mode).with_shape(ShapeDescriptor::cube()));
    let entity = scene.spawn_entity([transform, collider]).unwrap();
    scene.collection_add(group, &[entity]).unwrap();
    Boxed { entity, transform, collider }
}

fn physics(scene: &SceneGraph, root: NodeId) -> &ScenePhysics {
    scene.component_of::<ScenePhysics>(root).unwrap()
}

#[test]
fn test_dynamic_box_falls_and_keeps_scale() {
    let (mut scene, root, group) = physics_scene();
    let start = TransformState::new()
        .with_position(Vec3::new(1.0, 5.0, 0.0))
        .with_uniform_scale(2.0);
    let falling = spawn_box(&mut scene, group, start, PhysicsMode::Dynamic { mass: 1.0 });
    scene.initialize_all(root).unwrap();

    for _ in 0..30 {
        assert!(scene.step_physics(root, DT).unwrap());
    }

    let body = physics(&scene, root).body_pose(falling.collider).unwrap();
    let state = scene.get::<TransformState>(falling.transform).unwrap();
    assert!(state.position().y < 5.0);
    assert_relative_eq!(state.position(), body.translation.vector, epsilon = 1e-5);
    assert_relative_eq!(state.position().x, 1.0, epsilon = 1e-4);
    assert_eq!(state.scale(), Vec3::new(2.0, 2.0, 2.0));
    assert_relative_eq!(state.orientation(), Vec3::zeros(), epsilon = 1e-3);
}

#[test]
fn test_user_edit_moves_static_body_on_next_step() {
    let (mut scene, root, group) = physics_scene();
    let wall = spawn_box(&mut scene, group, TransformState::new(), PhysicsMode::Static);
    scene.initialize_all(root).unwrap();

    scene
        .get_mut::<TransformState>(wall.transform)
        .unwrap()
        .set_position(Vec3::new(3.0, 0.0, 0.0));
    let before = physics(&scene, root).body_pose(wall.collider).unwrap();
    assert_relative_eq!(before.translation.x, 0.0);

    scene.step_physics(root, DT).unwrap();

    let after = physics(&scene, root).body_pose(wall.collider).unwrap();
    assert_relative_eq!(after.translation.x, 3.0);
}

#[test]
fn test_pivot_offsets_the_body_frame() {
    let (mut scene, root, group) = physics_scene();
    let start = TransformState::new()
        .with_pivot(Vec3::new(1.0, 0.0, 0.0))
        .with_orientation(Vec3::new(0.0, 180.0, 0.0));
    let wall = spawn_box(&mut scene, group, start, PhysicsMode::Static);
    scene.initialize_all(root).unwrap();

    let pose = physics(&scene, root).body_pose(wall.collider).unwrap();
    assert_relative_eq!(pose.translation.x, -2.0, epsilon = 1e-5);
}

#[test]
fn test_delete_releases_body_and_subscription() {
    let (mut scene, root, group) = physics_scene();
    let crate_ = spawn_box(&mut scene, group, TransformState::new(), PhysicsMode::Dynamic { mass: 2.0 });
    scene.initialize_all(root).unwrap();
    assert_eq!(physics(&scene, root).body_count(), 1);
    assert_eq!(scene.get::<TransformState>(crate_.transform).unwrap().subscriber_count(), 1);

    scene.remove_component(crate_.entity, crate_.collider, true).unwrap();

    assert_eq!(physics(&scene, root).body_count(), 0);
    assert!(!physics(&scene, root).contains_owner(crate_.collider));
    assert_eq!(scene.get::<TransformState>(crate_.transform).unwrap().subscriber_count(), 0);
}

#[test]
fn test_deleting_entity_wakes_resting_neighbour() {
    let (mut scene, root, group) = physics_scene();
    let bottom = spawn_box(&mut scene, group, TransformState::new(), PhysicsMode::Static);
    let top = spawn_box(
        &mut scene,
        group,
        TransformState::new().with_position(Vec3::new(0.0, 0.99, 0.0)),
        PhysicsMode::Dynamic { mass: 1.0 },
    );
    scene.initialize_all(root).unwrap();
    scene.step_physics(root, DT).unwrap();

    let world = scene.component_of_mut::<ScenePhysics>(root).unwrap();
    assert!(world.get_all_colliding(bottom.collider).any(|owner| owner == top.collider));
    world.sleep(top.collider);
    assert_eq!(world.is_sleeping(top.collider), Some(true));

    scene.collection_remove(group, &[bottom.entity], true).unwrap();

    assert_eq!(physics(&scene, root).is_sleeping(top.collider), Some(false));
    assert_eq!(physics(&scene, root).body_count(), 1);
    assert!(!scene.contains(bottom.entity));
}

#[test]
fn test_always_active_collider_stays_awake() {
    let (mut scene, root, group) = physics_scene();
    for x in [-3.0, 3.0] {
        spawn_box(&mut scene, group, TransformState::new().with_position(Vec3::new(x, 0.0, 0.0)), PhysicsMode::Static);
    }
    let resting = spawn_box(
        &mut scene,
        group,
        TransformState::new().with_position(Vec3::new(-3.0, 1.0, 0.0)),
        PhysicsMode::Dynamic { mass: 1.0 },
    );
    let transform = scene.create(TransformState::new().with_position(Vec3::new(3.0, 1.0, 0.0)));
    let collider = scene.create(
        ColliderBridge::new(PhysicsMode::Dynamic { mass: 1.0 })
            .with_shape(ShapeDescriptor::cube())
            .keep_always_active(true),
    );
    let awake = scene.spawn_entity([transform, collider]).unwrap();
    scene.collection_add(group, &[awake]).unwrap();
    scene.initialize_all(root).unwrap();

    for _ in 0..600 {
        scene.step_physics(root, DT).unwrap();
    }

    assert_eq!(physics(&scene, root).is_sleeping(resting.collider), Some(true));
    assert_eq!(physics(&scene, root).is_sleeping(collider), Some(false));
}

#[test]
fn test_scene_without_world_skips_registration() {
    let mut scene = SceneGraph::new();
    let group = scene.create_collection();
    let root = scene.spawn_entity([group]).unwrap();
    let loose = spawn_box(&mut scene, group, TransformState::new(), PhysicsMode::Static);

    scene.initialize_all(root).unwrap();

    assert!(scene.get::<ColliderBridge>(loose.collider).unwrap().body().is_none());
    assert!(!scene.step_physics(root, DT).unwrap());
}

#[test]
fn test_advance_frame_steps_then_animates() {
    let (mut scene, root, group) = physics_scene();
    let falling = spawn_box(
        &mut scene,
        group,
        TransformState::new().with_position(Vec3::new(0.0, 5.0, 0.0)),
        PhysicsMode::Dynamic { mass: 1.0 },
    );
    let clip = Animation::new(vec![Keyframe::new(1.0).with_scale(Vec3::new(3.0, 3.0, 3.0))]);
    let controller = scene.create(AnimationController::new(clip));
    scene.add_component(falling.entity, controller).unwrap();
    scene.initialize_all(root).unwrap();
    scene.get_mut::<AnimationController>(controller).unwrap().play(None);

    scene.advance_frame(root, 0.5).unwrap();

    let state = scene.get::<TransformState>(falling.transform).unwrap();
    assert!(state.position().y < 5.0);
    assert_relative_eq!(state.animation()[(0, 0)], 2.0, epsilon = 1e-5);
    assert_eq!(state.scale(), Vec3::new(1.0, 1.0, 1.0));
}
