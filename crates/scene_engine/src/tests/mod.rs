//! Scenario tests spanning the scene graph, physics bridge and raycaster

mod physics_sync;
mod raycast_scenarios;
