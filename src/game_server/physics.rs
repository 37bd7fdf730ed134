//! Physics - Rigid-body adapter for the cycles
//!
//! The race never owns a physics engine. It holds `BodyHandle`s and talks to
//! whatever simulates them through the narrow `PhysicsHost` trait: read the
//! pose, set velocities, push accelerations, cast rays. A host that no longer
//! knows a handle simply answers `None`, and every routine here degrades to a
//! no-op for that body.
//!
//! Conventions: +Y is up, +Z is the body's forward, +X its right. Euler angles
//! use `EulerRot::YXZ` (yaw, pitch, roll) and are exposed in degrees.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::game_server::race::RaceConfig;

/// Opaque reference to a body owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Collision layers the race queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layer {
    Ground,
    Boundary,
}

/// Result of a successful raycast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin to the hit point
    pub distance: f32,
    pub point: Vec3,
}

/// World-space position and orientation of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// (yaw, pitch, roll) in degrees
    pub fn euler_degrees(&self) -> (f32, f32, f32) {
        let (yaw, pitch, roll) = self.rotation.to_euler(EulerRot::YXZ);
        (yaw.to_degrees(), pitch.to_degrees(), roll.to_degrees())
    }
}

/// Build an orientation from (yaw, pitch, roll) in degrees
pub fn rotation_from_degrees(yaw: f32, pitch: f32, roll: f32) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        yaw.to_radians(),
        pitch.to_radians(),
        roll.to_radians(),
    )
}

/// Per-body setup applied when a cycle becomes dynamic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodySettings {
    /// Centre of mass in body space
    pub center_of_mass: Vec3,
    /// Angular speed cap (rad/s)
    pub max_angular_velocity: f32,
    /// Lock rotation about the body's pitch and roll axes
    pub freeze_pitch_roll: bool,
}

impl BodySettings {
    pub fn for_config(config: &RaceConfig) -> Self {
        Self {
            center_of_mass: Vec3::new(0.0, -0.3, 0.0),
            max_angular_velocity: config.max_angular_velocity,
            freeze_pitch_roll: true,
        }
    }
}

/// Narrow interface onto the engine that owns the bodies.
///
/// Accelerations ignore mass, matching an "acceleration" force mode.
pub trait PhysicsHost {
    fn pose(&self, body: BodyHandle) -> Option<Pose>;
    fn velocity(&self, body: BodyHandle) -> Option<Vec3>;
    fn angular_velocity(&self, body: BodyHandle) -> Option<Vec3>;

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3);
    fn set_angular_velocity(&mut self, body: BodyHandle, angular_velocity: Vec3);
    fn set_rotation(&mut self, body: BodyHandle, rotation: Quat);
    fn add_acceleration(&mut self, body: BodyHandle, acceleration: Vec3);
    fn add_acceleration_at_point(&mut self, body: BodyHandle, acceleration: Vec3, point: Vec3);

    /// Kinematic bodies ignore forces and gravity
    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool);
    fn configure(&mut self, body: BodyHandle, settings: BodySettings);

    /// Nearest hit on `layer` along `direction` within `max_distance`
    fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32, layer: Layer)
        -> Option<RayHit>;

    fn contains(&self, body: BodyHandle) -> bool {
        self.pose(body).is_some()
    }
}

/// Distance of the front/back ground probes from the body origin
pub const WHEEL_OFFSET: f32 = 0.5;
/// Vertical velocity clamp (fall speed cap, rise speed cap)
pub const MAX_FALL_SPEED: f32 = 20.0;
pub const MAX_RISE_SPEED: f32 = 5.0;
/// Pitch beyond this (degrees) is snapped back to level
pub const PITCH_LIMIT_DEG: f32 = 5.0;

/// Turn the body by `yaw_delta` degrees and set its roll to `lean`.
/// Pitch is levelled.
pub fn apply_heading_and_lean<H: PhysicsHost + ?Sized>(
    host: &mut H,
    body: BodyHandle,
    yaw_delta: f32,
    lean: f32,
) {
    let Some(pose) = host.pose(body) else {
        return;
    };
    let (yaw, _, _) = pose.euler_degrees();
    host.set_rotation(body, rotation_from_degrees(yaw + yaw_delta, 0.0, lean));
}

/// Drive the body along its heading at `speed`, keeping the existing
/// (clamped) vertical velocity, then stabilise it.
pub fn apply_drive<H: PhysicsHost + ?Sized>(
    host: &mut H,
    body: BodyHandle,
    speed: f32,
    config: &RaceConfig,
) {
    let (Some(pose), Some(velocity)) = (host.pose(body), host.velocity(body)) else {
        return;
    };

    let mut drive = pose.forward() * speed;
    drive.y = velocity.y.clamp(-MAX_FALL_SPEED, MAX_RISE_SPEED);
    host.set_velocity(body, drive);

    stabilize(host, body, config);
}

/// Raycast-driven upright keeping: anti-wheelie at the ungrounded end, a flat
/// push down when airborne, a hard pitch reset and an angular velocity clamp.
pub fn stabilize<H: PhysicsHost + ?Sized>(host: &mut H, body: BodyHandle, config: &RaceConfig) {
    let Some(pose) = host.pose(body) else {
        return;
    };

    let forward = pose.forward();
    let front = pose.position + forward * WHEEL_OFFSET;
    let back = pose.position - forward * WHEEL_OFFSET;
    let reach = config.ground_check_distance;

    let grounded = |point: Vec3| {
        host.raycast(point, Vec3::NEG_Y, reach, Layer::Ground)
            .is_some()
    };
    let front_grounded = grounded(front);
    let back_grounded = grounded(back);
    let center_grounded = grounded(pose.position);

    let wheelie = Vec3::NEG_Y * config.anti_wheelie_force;
    if back_grounded && !front_grounded {
        host.add_acceleration_at_point(body, wheelie, front);
    }
    if front_grounded && !back_grounded {
        host.add_acceleration_at_point(body, wheelie, back);
    }
    if !front_grounded && !back_grounded && !center_grounded {
        host.add_acceleration(body, Vec3::NEG_Y * config.stabilization_force);
    }

    let (yaw, pitch, roll) = pose.euler_degrees();
    if pitch.abs() > PITCH_LIMIT_DEG {
        host.set_rotation(body, rotation_from_degrees(yaw, 0.0, roll));
    }

    if let Some(mut spin) = host.angular_velocity(body) {
        let cap = config.max_angular_velocity;
        spin.x = spin.x.clamp(-cap, cap);
        spin.z = spin.z.clamp(-cap, cap);
        host.set_angular_velocity(body, spin);
    }
}

/// Push the body away from nearby track boundaries, linearly stronger the
/// closer the boundary is.
pub fn correct_boundary<H: PhysicsHost + ?Sized>(
    host: &mut H,
    body: BodyHandle,
    config: &RaceConfig,
) {
    let check = config.boundary_check_distance;
    if check <= 0.0 {
        return;
    }
    let Some(pose) = host.pose(body) else {
        return;
    };

    let directions = [pose.right(), -pose.right(), pose.forward(), -pose.forward()];
    for dir in directions {
        if let Some(hit) = host.raycast(pose.position, dir, check, Layer::Boundary) {
            let strength = config.boundary_push_force * (1.0 - hit.distance / check);
            host.add_acceleration(body, -dir * strength);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::world::{Aabb, SimWorld};
    use approx::assert_abs_diff_eq;

    fn world_with_body(position: Vec3) -> (SimWorld, BodyHandle) {
        let mut world = SimWorld::new();
        let body = world.spawn_body(position, 0.0);
        (world, body)
    }

    #[test]
    fn drive_follows_heading_and_clamps_vertical_velocity() {
        let (mut world, body) = world_with_body(Vec3::ZERO);
        world.set_rotation(body, rotation_from_degrees(90.0, 0.0, 0.0));
        world.set_velocity(body, Vec3::new(0.0, 12.0, 0.0));

        apply_drive(&mut world, body, 10.0, &RaceConfig::default());

        let v = world.velocity(body).unwrap();
        assert_abs_diff_eq!(v.x, 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(v.z, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(v.y, MAX_RISE_SPEED);
    }

    #[test]
    fn drive_caps_fall_speed() {
        let (mut world, body) = world_with_body(Vec3::new(0.0, 50.0, 0.0));
        world.set_velocity(body, Vec3::new(0.0, -35.0, 0.0));

        apply_drive(&mut world, body, 0.0, &RaceConfig::default());

        assert_abs_diff_eq!(world.velocity(body).unwrap().y, -MAX_FALL_SPEED);
    }

    #[test]
    fn airborne_body_gets_flat_stabilization() {
        let config = RaceConfig::default();
        let (mut world, body) = world_with_body(Vec3::new(0.0, 10.0, 0.0));

        stabilize(&mut world, body, &config);

        let pending = world.body(body).unwrap().pending_acceleration();
        assert_abs_diff_eq!(pending.y, -config.stabilization_force);
    }

    #[test]
    fn grounded_body_gets_no_corrective_push() {
        let (mut world, body) = world_with_body(Vec3::ZERO);

        stabilize(&mut world, body, &RaceConfig::default());

        assert_eq!(world.body(body).unwrap().pending_acceleration(), Vec3::ZERO);
    }

    #[test]
    fn front_off_the_ground_is_pulled_down() {
        let config = RaceConfig::default();
        let (mut world, body) = world_with_body(Vec3::new(0.0, 0.48, 0.0));
        // nose up 4 degrees: the front probe sits higher than the back probe
        world.set_rotation(body, rotation_from_degrees(0.0, -4.0, 0.0));
        let pose = world.pose(body).unwrap();
        let front = pose.position + pose.forward() * WHEEL_OFFSET;
        let back = pose.position - pose.forward() * WHEEL_OFFSET;
        assert!(front.y > config.ground_check_distance);
        assert!(back.y <= config.ground_check_distance);

        stabilize(&mut world, body, &config);

        let pending = world.body(body).unwrap().pending_acceleration();
        assert_abs_diff_eq!(pending.y, -config.anti_wheelie_force);
    }

    #[test]
    fn excessive_pitch_is_snapped_level() {
        let (mut world, body) = world_with_body(Vec3::ZERO);
        world.set_rotation(body, rotation_from_degrees(30.0, 12.0, 8.0));

        stabilize(&mut world, body, &RaceConfig::default());

        let (yaw, pitch, roll) = world.pose(body).unwrap().euler_degrees();
        assert_abs_diff_eq!(pitch, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(yaw, 30.0, epsilon = 1e-3);
        assert_abs_diff_eq!(roll, 8.0, epsilon = 1e-3);
    }

    #[test]
    fn small_pitch_is_left_alone() {
        let (mut world, body) = world_with_body(Vec3::ZERO);
        world.set_rotation(body, rotation_from_degrees(0.0, 3.0, 0.0));

        stabilize(&mut world, body, &RaceConfig::default());

        let (_, pitch, _) = world.pose(body).unwrap().euler_degrees();
        assert_abs_diff_eq!(pitch, 3.0, epsilon = 1e-3);
    }

    #[test]
    fn angular_velocity_clamped_except_yaw() {
        let config = RaceConfig::default();
        let (mut world, body) = world_with_body(Vec3::ZERO);
        world.set_angular_velocity(body, Vec3::new(9.0, 7.0, -9.0));

        stabilize(&mut world, body, &config);

        let spin = world.angular_velocity(body).unwrap();
        assert_abs_diff_eq!(spin.x, config.max_angular_velocity);
        assert_abs_diff_eq!(spin.y, 7.0);
        assert_abs_diff_eq!(spin.z, -config.max_angular_velocity);
    }

    #[test]
    fn boundary_push_falls_off_linearly() {
        let config = RaceConfig::default();
        let (mut world, body) = world_with_body(Vec3::ZERO);
        // wall face 0.25 to the right
        world.add_boundary(Aabb::new(
            Vec3::new(0.25, -1.0, -5.0),
            Vec3::new(1.0, 2.0, 5.0),
        ));

        correct_boundary(&mut world, body, &config);

        let pending = world.body(body).unwrap().pending_acceleration();
        let expected = config.boundary_push_force * (1.0 - 0.25 / config.boundary_check_distance);
        assert_abs_diff_eq!(pending.x, -expected, epsilon = 1e-4);
        assert_abs_diff_eq!(pending.z, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn boundary_out_of_reach_is_ignored() {
        let (mut world, body) = world_with_body(Vec3::ZERO);
        world.add_boundary(Aabb::new(
            Vec3::new(3.0, -1.0, -5.0),
            Vec3::new(4.0, 2.0, 5.0),
        ));

        correct_boundary(&mut world, body, &RaceConfig::default());

        assert_eq!(world.body(body).unwrap().pending_acceleration(), Vec3::ZERO);
    }

    #[test]
    fn heading_turns_and_leans_level() {
        let (mut world, body) = world_with_body(Vec3::ZERO);
        world.set_rotation(body, rotation_from_degrees(10.0, 3.0, 0.0));

        apply_heading_and_lean(&mut world, body, 5.0, -7.0);

        let (yaw, pitch, roll) = world.pose(body).unwrap().euler_degrees();
        assert_abs_diff_eq!(yaw, 15.0, epsilon = 1e-3);
        assert_abs_diff_eq!(pitch, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(roll, -7.0, epsilon = 1e-3);
    }

    #[test]
    fn unknown_body_is_a_no_op() {
        let mut world = SimWorld::new();
        let ghost = BodyHandle(42);
        let config = RaceConfig::default();

        apply_drive(&mut world, ghost, 10.0, &config);
        correct_boundary(&mut world, ghost, &config);
        apply_heading_and_lean(&mut world, ghost, 10.0, 5.0);

        assert!(!world.contains(ghost));
    }
}
