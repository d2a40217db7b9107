//! Rigid-body world
//!
//! Wraps a rapier pipeline and the bookkeeping that ties native bodies to
//! scene nodes:
//! - Each body's owner node is stored in the body and collider `user_data`
//! - Dynamic bodies may carry a write-back callback, run after every step
//! - Transform edits reach bodies through a resync queue drained at the start
//!   of the next step, so subscribers never re-enter the world

use std::collections::HashMap;
use std::fmt;

use crossbeam_channel::{Receiver, Sender};
use rapier3d::prelude::{
    BroadPhase, CCDSolver, ColliderBuilder, ColliderSet, ImpulseJointSet, IntegrationParameters,
    IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet, SharedShape,
};
use slotmap::{Key, KeyData};

use super::PhysicsError;
use crate::config::PhysicsConfig;
use crate::foundation::math::{Iso3, Vec3};
use crate::scene::NodeId;

/// Callback applying a body's new world pose to its owner
pub type WriteBack<C> = Box<dyn FnMut(&mut C, &Iso3)>;

/// Opaque handle to a body in a [`PhysicsWorld`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(RigidBodyHandle);

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyKind {
    /// Fixed at its start pose
    Static,
    /// Integrated under gravity and contacts
    Dynamic {
        /// Total mass in kilograms
        mass: f32,
    },
}

/// Everything needed to create a body
pub struct BodyDesc<C> {
    /// Native collision shape
    pub shape: SharedShape,
    /// Static or dynamic
    pub kind: BodyKind,
    /// Initial world pose
    pub pose: Iso3,
    /// Scene node that owns the body
    pub owner: NodeId,
    /// Run after every step for dynamic bodies
    pub write_back: Option<WriteBack<C>>,
    /// Never let the body fall asleep
    pub keep_always_active: bool,
}

impl<C> BodyDesc<C> {
    /// Describe a body with no write-back that may sleep
    pub fn new(shape: SharedShape, kind: BodyKind, pose: Iso3, owner: NodeId) -> Self {
        Self {
            shape,
            kind,
            pose,
            owner,
            write_back: None,
            keep_always_active: false,
        }
    }

    /// Builder pattern: Set the write-back callback
    pub fn with_write_back(mut self, write_back: impl FnMut(&mut C, &Iso3) + 'static) -> Self {
        self.write_back = Some(Box::new(write_back));
        self
    }

    /// Builder pattern: Disable sleeping
    pub fn keep_always_active(mut self, keep: bool) -> Self {
        self.keep_always_active = keep;
        self
    }
}

/// Request to move a body to a new pose before the next step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResyncRequest {
    /// Body to move
    pub body: BodyHandle,
    /// Target world pose
    pub pose: Iso3,
}

/// Rigid-body simulation generic over the context its write-backs receive
pub struct PhysicsWorld<C> {
    gravity: Vec3,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    owners: HashMap<NodeId, RigidBodyHandle>,
    write_backs: HashMap<RigidBodyHandle, WriteBack<C>>,
    resync_tx: Sender<ResyncRequest>,
    resync_rx: Receiver<ResyncRequest>,
}

impl<C> PhysicsWorld<C> {
    /// Create an empty world
    pub fn new(config: &PhysicsConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.fixed_timestep;
        let (resync_tx, resync_rx) = crossbeam_channel::unbounded();

        Self {
            gravity: config.gravity_vector(),
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            owners: HashMap::new(),
            write_backs: HashMap::new(),
            resync_tx,
            resync_rx,
        }
    }

    /// Gravity acceleration
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Replace gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Allocate a body and its collider
    ///
    /// Fails if the owner already has a body or a dynamic mass is not a
    /// positive finite number.
    pub fn create(&mut self, desc: BodyDesc<C>) -> Result<BodyHandle, PhysicsError> {
        if self.owners.contains_key(&desc.owner) {
            return Err(PhysicsError::DuplicateOwner(desc.owner));
        }

        let user_data = owner_to_user_data(desc.owner);
        let (builder, mass) = match desc.kind {
            BodyKind::Static => (RigidBodyBuilder::fixed(), None),
            BodyKind::Dynamic { mass } => {
                if !(mass.is_finite() && mass > 0.0) {
                    return Err(PhysicsError::InvalidMass(mass));
                }
                (RigidBodyBuilder::dynamic(), Some(mass))
            }
        };

        let body = builder
            .position(desc.pose)
            .can_sleep(!desc.keep_always_active)
            .user_data(user_data)
            .build();
        let handle = self.bodies.insert(body);

        let mut collider = ColliderBuilder::new(desc.shape).user_data(user_data);
        if let Some(mass) = mass {
            collider = collider.mass(mass);
        }
        self.colliders
            .insert_with_parent(collider.build(), handle, &mut self.bodies);

        if let (Some(write_back), Some(_)) = (desc.write_back, mass) {
            self.write_backs.insert(handle, write_back);
        }
        self.owners.insert(desc.owner, handle);

        log::debug!("created {:?} body for {:?}", desc.kind, desc.owner);
        Ok(BodyHandle(handle))
    }

    /// Detach and dispose a body with its colliders
    ///
    /// Returns the owner, or `None` if the handle was already removed.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<NodeId> {
        let body = self.bodies.remove(
            handle.0,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        )?;
        self.write_backs.remove(&handle.0);

        let owner = owner_from_user_data(body.user_data);
        self.owners.remove(&owner);
        log::debug!("removed body of {owner:?}");
        Some(owner)
    }

    /// Advance the simulation by `dt` seconds, then run write-backs
    ///
    /// Queued resync requests are applied first. A non-positive `dt` is
    /// ignored.
    pub fn step(&mut self, dt: f32, ctx: &mut C) {
        self.apply_resyncs();
        if dt.is_nan() || dt <= 0.0 {
            log::warn!("ignoring physics step with dt = {dt}");
            return;
        }

        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );

        for (handle, write_back) in &mut self.write_backs {
            if let Some(body) = self.bodies.get(*handle) {
                write_back(ctx, body.position());
            }
        }
    }

    /// Sender for resync requests; cloned into transform subscribers
    pub fn resync_sender(&self) -> Sender<ResyncRequest> {
        self.resync_tx.clone()
    }

    /// Move bodies to every queued pose, waking them
    pub fn apply_resyncs(&mut self) {
        while let Ok(request) = self.resync_rx.try_recv() {
            if let Some(body) = self.bodies.get_mut(request.body.0) {
                body.set_position(request.pose, true);
            }
        }
    }

    /// Owners of every body currently in contact with `owner`'s body
    pub fn get_all_colliding(&self, owner: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let own = self
            .owners
            .get(&owner)
            .and_then(|handle| self.bodies.get(*handle))
            .map_or(&[][..], |body| body.colliders());

        self.narrow_phase
            .contact_pairs()
            .filter(|pair| pair.has_any_active_contact)
            .filter_map(move |pair| {
                let other = if own.contains(&pair.collider1) {
                    pair.collider2
                } else if own.contains(&pair.collider2) {
                    pair.collider1
                } else {
                    return None;
                };
                let collider = self.colliders.get(other)?;
                Some(owner_from_user_data(collider.user_data))
            })
    }

    /// Wake `owner`'s body. Returns false if it has none.
    pub fn wake(&mut self, owner: NodeId) -> bool {
        self.body_mut(owner)
            .map(|body| body.wake_up(true))
            .is_some()
    }

    /// Put `owner`'s body to sleep. Returns false if it has none.
    pub fn sleep(&mut self, owner: NodeId) -> bool {
        self.body_mut(owner).map(|body| body.sleep()).is_some()
    }

    /// Whether `owner`'s body is asleep
    pub fn is_sleeping(&self, owner: NodeId) -> Option<bool> {
        self.body(owner).map(|body| body.is_sleeping())
    }

    /// Current world pose of `owner`'s body
    pub fn body_pose(&self, owner: NodeId) -> Option<Iso3> {
        self.body(owner).map(|body| *body.position())
    }

    /// Linear velocity of `owner`'s body
    pub fn linear_velocity(&self, owner: NodeId) -> Option<Vec3> {
        self.body(owner).map(|body| *body.linvel())
    }

    /// Handle of `owner`'s body
    pub fn handle_of(&self, owner: NodeId) -> Option<BodyHandle> {
        self.owners.get(&owner).copied().map(BodyHandle)
    }

    /// Whether `owner` has a body
    pub fn contains_owner(&self, owner: NodeId) -> bool {
        self.owners.contains_key(&owner)
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body(&self, owner: NodeId) -> Option<&rapier3d::prelude::RigidBody> {
        self.bodies.get(*self.owners.get(&owner)?)
    }

    fn body_mut(&mut self, owner: NodeId) -> Option<&mut rapier3d::prelude::RigidBody> {
        self.bodies.get_mut(*self.owners.get(&owner)?)
    }
}

impl<C> Default for PhysicsWorld<C> {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

impl<C> fmt::Debug for PhysicsWorld<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("write_backs", &self.write_backs.len())
            .finish()
    }
}

fn owner_to_user_data(owner: NodeId) -> u128 {
    u128::from(owner.data().as_ffi())
}

fn owner_from_user_data(user_data: u128) -> NodeId {
    // Only values written by `owner_to_user_data` are stored, so this fits
    NodeId::from(KeyData::from_ffi(user_data as u64))
}
