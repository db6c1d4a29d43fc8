//! Fuzzy logic controller
//!
//! Fuzzifies the clearance in front of the agent, evaluates a small rule base
//! and defuzzifies it into a normalized speed and a sideways turn.
//!
//! A turn that starts is committed to: the latch keeps producing the same
//! turn until the agent is far from anything ahead or the side it is moving
//! into gets too tight.

use std::fmt;

use glam::Vec3;
use hecs::Entity;

use super::navigation::{DecisionStrategy, NavigationState, TickContext};
use crate::core::{AgentConfig, ControllerKind};
use crate::ecs::{Space, TransformBackend, World};

/// Clearance reported when a sensor sees nothing
pub const NO_OBSTACLE_DISTANCE: f32 = 100.0;

/// Front clearance above which a committed turn is released
pub const RELEASE_DISTANCE: f32 = 20.0;

/// Side clearance at or below which a committed turn is released
pub const MIN_SIDE_CLEARANCE: f32 = 0.2;

// ============================================================================
// Membership
// ============================================================================

/// Trapezoidal membership function over `[a, d]` with plateau `[b, c]`.
///
/// Infinite `c`/`d` give an open right shoulder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trapezoid {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Trapezoid {
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// Degree of membership of `x`, in `[0, 1]`
    #[must_use]
    pub fn membership(&self, x: f32) -> f32 {
        trapezoid(x, self.a, self.b, self.c, self.d)
    }
}

/// `0` outside `[a, d]`, `1` on `[b, c]`, linear in between
#[must_use]
pub fn trapezoid(x: f32, a: f32, b: f32, c: f32, d: f32) -> f32 {
    if x < a || x > d {
        0.0
    } else if x >= b && x <= c {
        1.0
    } else if x < b {
        (x - a) / (b - a)
    } else {
        (d - x) / (d - c)
    }
}

pub const CLOSE: Trapezoid = Trapezoid::new(0.0, 0.0, 2.5, 3.75);
pub const MEDIUM: Trapezoid = Trapezoid::new(2.5, 5.0, 7.5, 8.75);
pub const FAR: Trapezoid = Trapezoid::new(7.5, 10.0, f32::INFINITY, f32::INFINITY);
/// Side clearance that counts as room to turn into
pub const WIDE: Trapezoid = Trapezoid::new(0.0, 3.0, f32::INFINITY, f32::INFINITY);

/// Weighted average of rule outputs; `0` when no rule fires.
#[must_use]
pub fn defuzzify(levels: &[f32], values: &[f32]) -> f32 {
    let (numerator, denominator) = levels
        .iter()
        .zip(values)
        .fold((0.0, 0.0), |(num, den), (level, value)| {
            (num + level * value, den + level)
        });

    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Membership of the front clearance in each distance set
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistanceMemberships {
    pub close: f32,
    pub medium: f32,
    pub far: f32,
}

impl DistanceMemberships {
    #[must_use]
    pub fn of(distance: f32) -> Self {
        Self {
            close: CLOSE.membership(distance),
            medium: MEDIUM.membership(distance),
            far: FAR.membership(distance),
        }
    }

    /// Stop when close, slow when medium, fast when far
    #[must_use]
    pub fn speed(&self) -> f32 {
        defuzzify(&[self.close, self.medium, self.far], &[0.0, 0.5, 1.0])
    }

    /// Turn towards a side with `side_clearance` of room.
    /// `sign` is -1 for left, +1 for right.
    #[must_use]
    pub fn turn_into(&self, side_clearance: f32, sign: f32) -> f32 {
        let wide = WIDE.membership(side_clearance);
        let sharp = self.close.min(wide);
        let slight = self.medium.min(wide);
        defuzzify(&[sharp, slight], &[sign, 0.5 * sign])
    }
}

// ============================================================================
// Inputs and outputs
// ============================================================================

/// Distances from the agent's probe points to what its sensors see
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clearances {
    pub front: f32,
    pub left: f32,
    pub right: f32,
}

impl Clearances {
    /// Nothing in sight on any side
    pub const OPEN: Self = Self {
        front: NO_OBSTACLE_DISTANCE,
        left: NO_OBSTACLE_DISTANCE,
        right: NO_OBSTACLE_DISTANCE,
    };

    /// Measure from the body's probe points to the sensed obstacles' bounds
    #[must_use]
    pub fn measure(
        nav: &NavigationState,
        body: &dyn TransformBackend,
        probes: &Probes,
        world: &World,
    ) -> Self {
        let sensors = &nav.sensors;
        Self {
            front: clearance(world, sensors.front.zone().obstacle, body.transform_point(probes.front)),
            left: clearance(world, sensors.left.zone().obstacle, body.transform_point(probes.left)),
            right: clearance(world, sensors.right.zone().obstacle, body.transform_point(probes.right)),
        }
    }
}

impl Default for Clearances {
    fn default() -> Self {
        Self::OPEN
    }
}

fn clearance(world: &World, obstacle: Option<Entity>, from: Vec3) -> f32 {
    obstacle
        .and_then(|entity| world.bounds(entity))
        .map_or(NO_OBSTACLE_DISTANCE, |bounds| bounds.distance_to(from))
}

/// Local-space points clearances are measured from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probes {
    pub front: Vec3,
    pub left: Vec3,
    pub right: Vec3,
}

impl From<&AgentConfig> for Probes {
    fn from(config: &AgentConfig) -> Self {
        Self {
            front: config.front_probe,
            left: config.left_probe,
            right: config.right_probe,
        }
    }
}

/// Normalized controller output
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FuzzyOutput {
    /// 0 stopped, 1 full speed
    pub speed: f32,
    /// -1 sharp left, +1 sharp right
    pub turn: f32,
}

/// Keeps a started turn going until it is safe to stop
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommitmentLatch {
    pub active: bool,
    pub direction: f32,
}

impl CommitmentLatch {
    pub fn engage(&mut self, direction: f32) {
        self.active = true;
        self.direction = direction;
    }

    /// Whether a committed turn in direction `turn` may stop.
    #[must_use]
    pub fn should_release(turn: f32, clearances: &Clearances) -> bool {
        clearances.front > RELEASE_DISTANCE
            || (turn < 0.0 && clearances.left <= MIN_SIDE_CLEARANCE)
            || (turn > 0.0 && clearances.right <= MIN_SIDE_CLEARANCE)
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Fuzzy logic decision strategy
#[derive(Debug)]
pub struct FuzzyController {
    move_speed: f32,
    turn_speed: f32,
    probes: Probes,
    output: FuzzyOutput,
    latch: CommitmentLatch,
    clearances: Clearances,
}

impl FuzzyController {
    pub const NAME: &'static str = ControllerKind::Fuzzy.display_name();

    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            move_speed: config.move_speed,
            turn_speed: config.turn_speed,
            probes: Probes::from(config),
            output: FuzzyOutput::default(),
            latch: CommitmentLatch::default(),
            clearances: Clearances::OPEN,
        }
    }

    #[must_use]
    pub fn output(&self) -> FuzzyOutput {
        self.output
    }

    #[must_use]
    pub fn latch(&self) -> CommitmentLatch {
        self.latch
    }

    /// Clearances measured on the last tick
    #[must_use]
    pub fn clearances(&self) -> Clearances {
        self.clearances
    }

    /// Run inference on a set of clearances and update the outputs.
    pub fn infer(&mut self, clearances: Clearances) -> FuzzyOutput {
        self.clearances = clearances;
        let memberships = DistanceMemberships::of(clearances.front);

        if self.latch.active {
            if CommitmentLatch::should_release(self.output.turn, &clearances) {
                self.latch.active = false;
                log::debug!("Fuzzy: turn released at front clearance {:.2}", clearances.front);
            } else {
                self.output.turn = self.latch.direction;
            }
        } else {
            self.output.turn = if clearances.left >= clearances.right {
                memberships.turn_into(clearances.left, -1.0)
            } else {
                memberships.turn_into(clearances.right, 1.0)
            };

            if self.output.turn != 0.0 {
                self.latch.engage(self.output.turn);
                log::debug!("Fuzzy: committed to turn {:.2}", self.output.turn);
            }
        }

        self.output.speed = memberships.speed();
        self.output
    }

    /// Sideways first, then along the drive axis
    fn apply(&self, body: &mut dyn TransformBackend, dt: f32) {
        let sideways = self.output.turn * self.turn_speed * dt * body.forward();
        body.translate(sideways, Space::World);

        let ahead = self.output.speed * self.move_speed * dt * -body.right();
        body.translate(ahead, Space::World);
    }
}

impl DecisionStrategy for FuzzyController {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn step(
        &mut self,
        nav: &mut NavigationState,
        body: &mut dyn TransformBackend,
        ctx: &TickContext<'_>,
    ) {
        let clearances = Clearances::measure(nav, body, &self.probes, ctx.world);
        self.infer(clearances);
        self.apply(body, ctx.dt);
    }

    fn holds_heading(&self) -> bool {
        self.latch.active
    }

    fn halt(&mut self, _nav: &mut NavigationState, _body: &mut dyn TransformBackend) {
        self.output = FuzzyOutput::default();
    }

    fn status_line(&self) -> String {
        format!(
            "Speed: {}\tTurn: {}",
            self.output.speed * self.move_speed,
            self.output.turn * self.turn_speed
        )
    }
}

impl fmt::Display for FuzzyOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speed {:.2}, turn {:.2}", self.speed, self.turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::SensorSide;
    use crate::core::{SensorLayout, ZoneTag};
    use crate::ecs::{Aabb, Transform};

    const EPS: f32 = 1e-5;

    fn clearances(front: f32, left: f32, right: f32) -> Clearances {
        Clearances { front, left, right }
    }

    #[test]
    fn test_trapezoid_shape() {
        let t = Trapezoid::new(1.0, 2.0, 4.0, 6.0);
        assert_eq!(t.membership(0.5), 0.0);
        assert_eq!(t.membership(7.0), 0.0);
        assert_eq!(t.membership(2.0), 1.0);
        assert_eq!(t.membership(3.0), 1.0);
        assert_eq!(t.membership(4.0), 1.0);
        assert!((t.membership(1.5) - 0.5).abs() < EPS);
        assert!((t.membership(5.0) - 0.5).abs() < EPS);

        // Continuous at the plateau edges
        assert!((t.membership(2.0 - 1e-4) - 1.0).abs() < 1e-3);
        assert!((t.membership(4.0 + 1e-4) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_trapezoid_monotonic_ramps() {
        let mut previous = 0.0;
        for i in 0..=50 {
            let x = 2.5 + i as f32 * 0.05;
            let m = MEDIUM.membership(x);
            assert!(m >= previous);
            previous = m;
        }
        for i in 0..=25 {
            let x = 7.5 + i as f32 * 0.05;
            let m = MEDIUM.membership(x);
            assert!(m <= previous);
            previous = m;
        }
    }

    #[test]
    fn test_open_shoulders() {
        assert_eq!(FAR.membership(NO_OBSTACLE_DISTANCE), 1.0);
        assert_eq!(FAR.membership(f32::INFINITY), 1.0);
        assert_eq!(WIDE.membership(3.0), 1.0);
        assert!((WIDE.membership(1.5) - 0.5).abs() < EPS);
        assert_eq!(CLOSE.membership(0.0), 1.0);
    }

    #[test]
    fn test_defuzzify_no_rule_fires() {
        assert_eq!(defuzzify(&[0.0, 0.0, 0.0], &[0.0, 0.5, 1.0]), 0.0);
        assert_eq!(defuzzify(&[], &[]), 0.0);
        assert!((defuzzify(&[1.0, 1.0], &[0.0, 1.0]) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_distance_zero_stops() {
        let m = DistanceMemberships::of(0.0);
        assert_eq!(m.close, 1.0);
        assert_eq!(m.medium, 0.0);
        assert_eq!(m.far, 0.0);
        assert_eq!(m.speed(), 0.0);
    }

    #[test]
    fn test_distance_open_road_full_speed() {
        let m = DistanceMemberships::of(NO_OBSTACLE_DISTANCE);
        assert_eq!(m.far, 1.0);
        assert_eq!(m.speed(), 1.0);
    }

    #[test]
    fn test_open_road_does_not_turn_or_commit() {
        let mut fuzzy = FuzzyController::new(&AgentConfig::default());
        let output = fuzzy.infer(Clearances::OPEN);
        assert_eq!(output.turn, 0.0);
        assert_eq!(output.speed, 1.0);
        assert!(!fuzzy.latch().active);
    }

    #[test]
    fn test_close_obstacle_turns_sharp_towards_wider_side() {
        let mut fuzzy = FuzzyController::new(&AgentConfig::default());
        let output = fuzzy.infer(clearances(1.0, 2.0, 10.0));
        assert!((output.turn - 1.0).abs() < EPS);
        assert!(fuzzy.latch().active);

        let mut fuzzy = FuzzyController::new(&AgentConfig::default());
        let output = fuzzy.infer(clearances(1.0, 10.0, 10.0));
        // Ties favour the left
        assert!((output.turn + 1.0).abs() < EPS);
    }

    #[test]
    fn test_medium_obstacle_turns_slightly() {
        let mut fuzzy = FuzzyController::new(&AgentConfig::default());
        let output = fuzzy.infer(clearances(6.0, 10.0, 1.0));
        assert!((output.turn + 0.5).abs() < EPS);
        assert!((output.speed - 0.5).abs() < EPS);
    }

    #[test]
    fn test_commitment_repeats_turn_until_release() {
        let mut fuzzy = FuzzyController::new(&AgentConfig::default());
        let first = fuzzy.infer(clearances(1.0, 10.0, 2.0)).turn;
        assert!(first < 0.0);

        // Inputs that would now favour the right do not change the turn
        for front in [1.0, 5.0, 15.0, 20.0] {
            let output = fuzzy.infer(clearances(front, 1.0, 10.0));
            assert_eq!(output.turn, first);
            assert!(fuzzy.latch().active);
        }

        // Release tick: latch drops, previous turn carries over
        let output = fuzzy.infer(clearances(25.0, 10.0, 10.0));
        assert!(!fuzzy.latch().active);
        assert_eq!(output.turn, first);

        // Next tick decides afresh
        let output = fuzzy.infer(Clearances::OPEN);
        assert_eq!(output.turn, 0.0);
    }

    #[test]
    fn test_commitment_released_when_side_closes_in() {
        let mut fuzzy = FuzzyController::new(&AgentConfig::default());
        fuzzy.infer(clearances(1.0, 2.0, 10.0)); // committed right
        fuzzy.infer(clearances(1.0, 0.1, 10.0));
        assert!(fuzzy.latch().active);

        fuzzy.infer(clearances(1.0, 10.0, 0.2));
        assert!(!fuzzy.latch().active);
    }

    #[test]
    fn test_step_measures_clearance_from_probe() {
        let mut world = World::new();
        let rock = world.spawn_volume(
            "Rock",
            Aabb::from_center_size(Vec3::new(-3.0, 0.0, 0.0), Vec3::ONE),
            ZoneTag::Obstacle,
            AgentConfig::OBSTACLE_LAYER,
        );
        let mut nav = NavigationState::new("Test", &SensorLayout::default());
        if let Some(contact) = world.contact(rock) {
            nav.sensors.sensor_mut(SensorSide::Front).on_enter(&contact);
        }
        let mut body = Transform::new();
        let mut fuzzy = FuzzyController::new(&AgentConfig::default());

        let ctx = TickContext { dt: 0.0, world: &world };
        fuzzy.step(&mut nav, &mut body, &ctx);

        // Probe at x = -1, rock face at x = -2.5
        assert!((fuzzy.clearances().front - 1.5).abs() < EPS);
        assert_eq!(fuzzy.clearances().left, NO_OBSTACLE_DISTANCE);
        assert_eq!(fuzzy.output().speed, 0.0);
    }

    #[test]
    fn test_stale_obstacle_reads_as_open() {
        let mut world = World::new();
        let rock = world.spawn_volume("Rock", Aabb::from_center_size(Vec3::ZERO, Vec3::ONE), ZoneTag::Obstacle, 6);
        let mut nav = NavigationState::new("Test", &SensorLayout::default());
        if let Some(contact) = world.contact(rock) {
            nav.sensors.sensor_mut(SensorSide::Front).on_enter(&contact);
        }
        world.despawn(rock).unwrap();

        let measured = Clearances::measure(&nav, &Transform::new(), &Probes::from(&AgentConfig::default()), &world);
        assert_eq!(measured, Clearances::OPEN);
    }

    #[test]
    fn test_motion_turns_then_drives() {
        let world = World::new();
        let mut nav = NavigationState::new("Test", &SensorLayout::default());
        let mut body = Transform::new();
        let mut fuzzy = FuzzyController::new(&AgentConfig::default());

        let ctx = TickContext { dt: 0.1, world: &world };
        fuzzy.step(&mut nav, &mut body, &ctx);

        // Open road: full speed along -X, no sideways motion
        assert!((body.position - Vec3::new(-1.0, 0.0, 0.0)).length() < EPS);
    }

    #[test]
    fn test_halt_zeroes_outputs() {
        let mut fuzzy = FuzzyController::new(&AgentConfig::default());
        fuzzy.infer(clearances(1.0, 10.0, 2.0));

        let mut nav = NavigationState::new("Test", &SensorLayout::default());
        fuzzy.halt(&mut nav, &mut Transform::new());
        assert_eq!(fuzzy.output(), FuzzyOutput::default());
        assert_eq!(fuzzy.status_line(), "Speed: 0\tTurn: 0");
        assert_eq!(fuzzy.name(), "Fuzzy Logic");
    }
}
