//! World - Built-in rigid-body host for headless and desktop runs
//!
//! A small simulation: bodies integrate with semi-implicit Euler
//! under gravity, rest on an infinite ground plane at y = 0 and never collide
//! with each other. Track walls are solid axis-aligned boxes: a body that ends
//! a step inside one is pushed back out of the nearest face and loses the
//! velocity that carried it in. A finish-line box reports bodies that enter it.

use glam::{Quat, Vec3};

use crate::game_server::physics::{
    rotation_from_degrees, BodyHandle, BodySettings, Layer, PhysicsHost, Pose, RayHit,
};

const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
const PARALLEL_EPSILON: f32 = 1e-8;
/// Horizontal half-width of a cycle against walls
const BODY_RADIUS: f32 = 0.3;

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Slab test. Rays starting inside the box report no hit.
    pub fn raycast(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let (o, d) = (origin[axis], direction[axis]);
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < PARALLEL_EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        (t_min >= 0.0 && t_min <= max_distance).then_some(t_min)
    }

    /// Grown by `margin` on the horizontal axes
    fn inflated(&self, margin: f32) -> Self {
        let grow = Vec3::new(margin, 0.0, margin);
        Self {
            min: self.min - grow,
            max: self.max + grow,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimBody {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub kinematic: bool,
    pub settings: BodySettings,
    pending_linear: Vec3,
    pending_angular: Vec3,
    in_finish: bool,
}

impl SimBody {
    fn new(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            kinematic: false,
            settings: BodySettings {
                center_of_mass: Vec3::ZERO,
                max_angular_velocity: 7.0,
                freeze_pitch_roll: false,
            },
            pending_linear: Vec3::ZERO,
            pending_angular: Vec3::ZERO,
            in_finish: false,
        }
    }

    /// Linear acceleration queued for the next step
    pub fn pending_acceleration(&self) -> Vec3 {
        self.pending_linear
    }

    fn center_of_mass(&self) -> Vec3 {
        self.position + self.rotation * self.settings.center_of_mass
    }

    fn integrate(&mut self, dt: f32) {
        self.velocity += (GRAVITY + self.pending_linear) * dt;
        self.angular_velocity += self.pending_angular * dt;

        if self.settings.freeze_pitch_roll {
            self.angular_velocity.x = 0.0;
            self.angular_velocity.z = 0.0;
        }
        self.angular_velocity = self
            .angular_velocity
            .clamp_length_max(self.settings.max_angular_velocity);

        self.position += self.velocity * dt;
        if self.position.y < 0.0 {
            self.position.y = 0.0;
            self.velocity.y = self.velocity.y.max(0.0);
        }

        let spin = Quat::from_scaled_axis(self.angular_velocity * dt);
        self.rotation = (spin * self.rotation).normalize();
    }

    /// Move out of `wall` along the horizontal axis of least penetration and
    /// drop the velocity component pointing back into it.
    fn resolve_wall(&mut self, wall: &Aabb) {
        let wall = wall.inflated(BODY_RADIUS);
        if !wall.contains(self.position) {
            return;
        }

        let p = self.position;
        let exits = [
            (p.x - wall.min.x, Vec3::NEG_X),
            (wall.max.x - p.x, Vec3::X),
            (p.z - wall.min.z, Vec3::NEG_Z),
            (wall.max.z - p.z, Vec3::Z),
        ];
        let Some((depth, normal)) = exits.into_iter().min_by(|a, b| a.0.total_cmp(&b.0)) else {
            return;
        };

        self.position += normal * depth;
        let into_wall = self.velocity.dot(normal);
        if into_wall < 0.0 {
            self.velocity -= normal * into_wall;
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimWorld {
    bodies: Vec<SimBody>,
    boundaries: Vec<Aabb>,
    finish_line: Option<Aabb>,
}

impl SimWorld {
    pub const LANE_WIDTH: f32 = 4.0;
    /// Finish trigger sits this far past the winning distance, so the
    /// distance threshold decides a straight-line race
    pub const FINISH_MARGIN: f32 = 5.0;
    const WALL_THICKNESS: f32 = 1.0;
    const WALL_HEIGHT: f32 = 2.0;
    const RUN_OFF: f32 = 10.0;

    pub fn new() -> Self {
        Self::default()
    }

    /// Straight two-lane course along +Z, closed by walls on all four sides,
    /// with the finish line just past `length`. Returns the cycles' handles,
    /// P1 on the left lane.
    pub fn two_lane_track(length: f32) -> (Self, [BodyHandle; 2]) {
        let mut world = Self::new();
        world.lay_track(length);

        let lane = Self::LANE_WIDTH / 2.0;
        let p1 = world.spawn_body(Vec3::new(-lane, 0.0, 0.0), 0.0);
        let p2 = world.spawn_body(Vec3::new(lane, 0.0, 0.0), 0.0);
        (world, [p1, p2])
    }

    /// Rebuild walls and finish line for a course of `length` metres.
    /// Bodies are left where they are.
    pub fn lay_track(&mut self, length: f32) {
        let edge = Self::LANE_WIDTH;
        let thick = Self::WALL_THICKNESS;
        let height = Self::WALL_HEIGHT;
        let finish = length + Self::FINISH_MARGIN;
        let (z0, z1) = (-Self::RUN_OFF, finish + Self::RUN_OFF);

        self.boundaries.clear();
        self.add_boundary(Aabb::new(
            Vec3::new(-edge - thick, 0.0, z0),
            Vec3::new(-edge, height, z1),
        ));
        self.add_boundary(Aabb::new(
            Vec3::new(edge, 0.0, z0),
            Vec3::new(edge + thick, height, z1),
        ));
        self.add_boundary(Aabb::new(
            Vec3::new(-edge - thick, 0.0, z0 - thick),
            Vec3::new(edge + thick, height, z0),
        ));
        self.add_boundary(Aabb::new(
            Vec3::new(-edge - thick, 0.0, z1),
            Vec3::new(edge + thick, height, z1 + thick),
        ));
        self.set_finish_line(Aabb::new(
            Vec3::new(-edge, -1.0, finish),
            Vec3::new(edge, height + 1.0, finish + 1.0),
        ));
    }

    pub fn spawn_body(&mut self, position: Vec3, yaw_deg: f32) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies
            .push(SimBody::new(position, rotation_from_degrees(yaw_deg, 0.0, 0.0)));
        handle
    }

    pub fn add_boundary(&mut self, aabb: Aabb) {
        self.boundaries.push(aabb);
    }

    pub fn set_finish_line(&mut self, aabb: Aabb) {
        self.finish_line = Some(aabb);
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&SimBody> {
        self.bodies.get(handle.0 as usize)
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut SimBody> {
        self.bodies.get_mut(handle.0 as usize)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Advance all dynamic bodies by `dt`. Returns bodies that entered the
    /// finish line during this step.
    pub fn step(&mut self, dt: f32) -> Vec<BodyHandle> {
        let mut crossed = Vec::new();

        for (index, body) in self.bodies.iter_mut().enumerate() {
            if !body.kinematic {
                body.integrate(dt);
                for wall in &self.boundaries {
                    body.resolve_wall(wall);
                }
            }
            body.pending_linear = Vec3::ZERO;
            body.pending_angular = Vec3::ZERO;

            let inside = self
                .finish_line
                .is_some_and(|line| line.contains(body.position));
            if inside && !body.in_finish {
                crossed.push(BodyHandle(index as u32));
            }
            body.in_finish = inside;
        }
        crossed
    }
}

impl PhysicsHost for SimWorld {
    fn pose(&self, body: BodyHandle) -> Option<Pose> {
        self.body(body).map(|b| Pose {
            position: b.position,
            rotation: b.rotation,
        })
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.body(body).map(|b| b.velocity)
    }

    fn angular_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.body(body).map(|b| b.angular_velocity)
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.body_mut(body) {
            b.velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, body: BodyHandle, angular_velocity: Vec3) {
        if let Some(b) = self.body_mut(body) {
            b.angular_velocity = angular_velocity;
        }
    }

    fn set_rotation(&mut self, body: BodyHandle, rotation: Quat) {
        if let Some(b) = self.body_mut(body) {
            b.rotation = rotation.normalize();
        }
    }

    fn add_acceleration(&mut self, body: BodyHandle, acceleration: Vec3) {
        if let Some(b) = self.body_mut(body) {
            b.pending_linear += acceleration;
        }
    }

    fn add_acceleration_at_point(&mut self, body: BodyHandle, acceleration: Vec3, point: Vec3) {
        if let Some(b) = self.body_mut(body) {
            let arm = point - b.center_of_mass();
            b.pending_linear += acceleration;
            b.pending_angular += arm.cross(acceleration);
        }
    }

    fn set_kinematic(&mut self, body: BodyHandle, kinematic: bool) {
        if let Some(b) = self.body_mut(body) {
            b.kinematic = kinematic;
        }
    }

    fn configure(&mut self, body: BodyHandle, settings: BodySettings) {
        if let Some(b) = self.body_mut(body) {
            b.settings = settings;
        }
    }

    fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        layer: Layer,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        let distance = match layer {
            Layer::Ground => ground_distance(origin, direction)?,
            Layer::Boundary => self
                .boundaries
                .iter()
                .filter_map(|b| b.raycast(origin, direction, max_distance))
                .min_by(|a, b| a.total_cmp(b))?,
        };

        (distance <= max_distance).then(|| RayHit {
            distance,
            point: origin + direction * distance,
        })
    }
}

/// Distance along the ray to the y = 0 plane. Origins at or below the plane
/// are already touching it.
fn ground_distance(origin: Vec3, direction: Vec3) -> Option<f32> {
    if origin.y <= 0.0 {
        return Some(0.0);
    }
    if direction.y >= 0.0 {
        return None;
    }
    Some(origin.y / -direction.y)
}
