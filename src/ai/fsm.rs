//! Finite State Machine controller
//!
//! Drives the agent with four discrete states. Each state owns its motion and
//! decides its own exit through the enter/update/exit lifecycle:
//!
//! ```text
//!            front blocked, left free
//! MoveForward ─────────────────────────► AvoidLeft ──┐
//!     ▲  │     front blocked, right free               │ front clear
//!     │  └─────────────────────────────► AvoidRight ──┤ or no shift
//!     └──────────────────────────────────────────────┘
//! any state ── run finished ──► Idle
//! ```
//!
//! With both sides occupied the controller keeps moving forward through the
//! obstacle and logs a warning; the collision counter records the outcome.

use std::fmt;

use super::navigation::{DecisionStrategy, NavigationState, TickContext};
use crate::core::{AgentConfig, ControllerKind};
use crate::ecs::{Space, TransformBackend};

// ============================================================================
// State identity
// ============================================================================

/// The four states of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsmState {
    /// Run finished; nothing moves
    Idle,
    MoveForward,
    AvoidLeft,
    AvoidRight,
}

impl FsmState {
    #[must_use]
    pub const fn is_avoiding(self) -> bool {
        matches!(self, Self::AvoidLeft | Self::AvoidRight)
    }
}

impl fmt::Display for FsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// State Trait
// ============================================================================

/// Everything a state may read or move during a tick
pub struct DriveContext<'a> {
    pub nav: &'a mut NavigationState,
    pub body: &'a mut dyn TransformBackend,
    /// Seconds covered by this tick (0 for event-driven transitions)
    pub dt: f32,
    /// Forward speed in units per second
    pub move_speed: f32,
}

/// A state of the driving FSM.
///
/// 1. `enter()` - once when the state becomes active
/// 2. `update()` - every tick while active
/// 3. `exit()` - once when the state is left
pub trait State: fmt::Debug {
    fn kind(&self) -> FsmState;

    fn enter(&mut self, _ctx: &mut DriveContext<'_>) {}

    fn update(&mut self, ctx: &mut DriveContext<'_>) -> Transition;

    fn exit(&mut self, _ctx: &mut DriveContext<'_>) {}
}

/// Returned from `State::update()`
pub enum Transition {
    /// Stay in the current state.
    None,
    /// Transition to a new state.
    To(Box<dyn State>),
}

impl Transition {
    pub fn to<S: State + 'static>(state: S) -> Self {
        Transition::To(Box::new(state))
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::None => write!(f, "Transition::None"),
            Transition::To(state) => write!(f, "Transition::To({})", state.kind()),
        }
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// Owns the active state and runs its lifecycle hooks.
pub struct StateMachine {
    current: Box<dyn State>,
    /// Whether enter() has been called on current state
    entered: bool,
}

impl StateMachine {
    /// The initial state's `enter()` runs on the first `update()`.
    pub fn new<S: State + 'static>(initial: S) -> Self {
        Self {
            current: Box::new(initial),
            entered: false,
        }
    }

    /// Run one tick of the active state and follow its transition.
    pub fn update(&mut self, ctx: &mut DriveContext<'_>) {
        if !self.entered {
            self.current.enter(ctx);
            self.entered = true;
        }

        if let Transition::To(new_state) = self.current.update(ctx) {
            self.replace(ctx, new_state);
        }
    }

    /// Force a transition from outside a tick.
    pub fn transition<S: State + 'static>(&mut self, ctx: &mut DriveContext<'_>, new_state: S) {
        self.replace(ctx, Box::new(new_state));
    }

    fn replace(&mut self, ctx: &mut DriveContext<'_>, mut new_state: Box<dyn State>) {
        if self.entered {
            self.current.exit(ctx);
        }
        log::debug!("FSM: {} -> {}", self.current.kind(), new_state.kind());

        new_state.enter(ctx);
        self.current = new_state;
        self.entered = true;
    }

    #[must_use]
    pub fn current(&self) -> FsmState {
        self.current.kind()
    }

    #[must_use]
    pub fn is_in(&self, state: FsmState) -> bool {
        self.current.kind() == state
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("current", &self.current.kind())
            .field("entered", &self.entered)
            .finish()
    }
}

// ============================================================================
// Driving States
// ============================================================================

/// Terminal state after the finish line
#[derive(Debug, Default)]
pub struct IdleState;

impl State for IdleState {
    fn kind(&self) -> FsmState {
        FsmState::Idle
    }

    fn enter(&mut self, _ctx: &mut DriveContext<'_>) {
        log::info!("FSM halted");
    }

    fn update(&mut self, _ctx: &mut DriveContext<'_>) -> Transition {
        Transition::None
    }
}

/// Cruise along the drive axis (local -X)
#[derive(Debug, Default)]
pub struct MoveForwardState;

impl State for MoveForwardState {
    fn kind(&self) -> FsmState {
        FsmState::MoveForward
    }

    fn update(&mut self, ctx: &mut DriveContext<'_>) -> Transition {
        let delta = ctx.move_speed * ctx.dt * -ctx.body.right();
        ctx.body.translate(delta, Space::World);
        Transition::None
    }
}

/// Which way an avoidance shift goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvoidDirection {
    Left,
    Right,
}

impl AvoidDirection {
    /// Sign applied to the forward axis
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

/// Shift sideways until the front zone clears
#[derive(Debug)]
pub struct AvoidState {
    pub direction: AvoidDirection,
    /// Lateral speed, equal to the distance needed to clear the obstacle
    pub shift_distance: f32,
}

impl AvoidState {
    #[must_use]
    pub fn new(direction: AvoidDirection, shift_distance: f32) -> Self {
        Self {
            direction,
            shift_distance,
        }
    }
}

impl State for AvoidState {
    fn kind(&self) -> FsmState {
        match self.direction {
            AvoidDirection::Left => FsmState::AvoidLeft,
            AvoidDirection::Right => FsmState::AvoidRight,
        }
    }

    fn enter(&mut self, ctx: &mut DriveContext<'_>) {
        ctx.nav.rot_timer = 0.0;
    }

    fn update(&mut self, ctx: &mut DriveContext<'_>) -> Transition {
        if self.shift_distance == 0.0 {
            return Transition::to(MoveForwardState);
        }

        let delta = self.shift_distance * ctx.dt * self.direction.sign() * ctx.body.forward();
        ctx.body.translate(delta, Space::World);

        let transition = if ctx.nav.sensors.front.is_occupied() {
            Transition::None
        } else {
            Transition::to(MoveForwardState)
        };

        ctx.nav.rot_timer = 0.0;
        transition
    }
}

// ============================================================================
// Controller
// ============================================================================

/// FSM decision strategy
#[derive(Debug)]
pub struct FiniteStateController {
    machine: StateMachine,
    move_speed: f32,
    half_width: f32,
    /// Shift computed at the last front blockage
    shift_distance: f32,
}

impl FiniteStateController {
    pub const NAME: &'static str = ControllerKind::Fsm.display_name();

    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            machine: StateMachine::new(MoveForwardState),
            move_speed: config.move_speed,
            half_width: config.half_width(),
            shift_distance: 0.0,
        }
    }

    #[must_use]
    pub fn state(&self) -> FsmState {
        self.machine.current()
    }

    #[must_use]
    pub fn shift_distance(&self) -> f32 {
        self.shift_distance
    }

    fn context<'a>(
        &self,
        nav: &'a mut NavigationState,
        body: &'a mut dyn TransformBackend,
        dt: f32,
    ) -> DriveContext<'a> {
        DriveContext {
            nav,
            body,
            dt,
            move_speed: self.move_speed,
        }
    }
}

impl DecisionStrategy for FiniteStateController {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn on_front_blocked(&mut self, nav: &mut NavigationState, body: &mut dyn TransformBackend) {
        self.shift_distance = nav.sensors.front.zone().extent / 2.0 + self.half_width;
        let left_free = !nav.sensors.left.is_occupied();
        let right_free = !nav.sensors.right.is_occupied();
        let shift = self.shift_distance;

        let mut ctx = self.context(nav, body, 0.0);
        if left_free {
            self.machine
                .transition(&mut ctx, AvoidState::new(AvoidDirection::Left, shift));
        } else if right_free {
            self.machine
                .transition(&mut ctx, AvoidState::new(AvoidDirection::Right, shift));
        } else {
            log::warn!("No safe path around the obstacle, proceeding through");
            self.machine.transition(&mut ctx, MoveForwardState);
        }
    }

    fn step(
        &mut self,
        nav: &mut NavigationState,
        body: &mut dyn TransformBackend,
        ctx: &TickContext<'_>,
    ) {
        let mut drive = self.context(nav, body, ctx.dt);
        self.machine.update(&mut drive);
    }

    fn holds_heading(&self) -> bool {
        self.machine.current().is_avoiding()
    }

    fn halt(&mut self, nav: &mut NavigationState, body: &mut dyn TransformBackend) {
        if !self.machine.is_in(FsmState::Idle) {
            let mut ctx = self.context(nav, body, 0.0);
            self.machine.transition(&mut ctx, IdleState);
        }
    }

    fn status_line(&self) -> String {
        format!("Current State: {}", self.machine.current())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Contact, SensorSide};
    use crate::core::{SensorLayout, ZoneTag};
    use crate::ecs::{Transform, World};
    use glam::Vec3;

    struct Rig {
        world: hecs::World,
        nav: NavigationState,
        body: Transform,
        fsm: FiniteStateController,
        contacts: Vec<(SensorSide, Contact)>,
    }

    impl Rig {
        fn new(config: &AgentConfig) -> Self {
            Self {
                world: hecs::World::new(),
                nav: NavigationState::new("Test", &SensorLayout::default()),
                body: Transform::new(),
                fsm: FiniteStateController::new(config),
                contacts: Vec::new(),
            }
        }

        /// Put an obstacle of the given width into a sensor.
        /// Returns whether the front edge fired.
        fn block(&mut self, side: SensorSide, extent: f32) -> bool {
            let contact = Contact {
                entity: self.world.spawn(()),
                tag: ZoneTag::Obstacle,
                layer: AgentConfig::OBSTACLE_LAYER,
                extent,
            };
            let was_blocked = self.nav.sensors.front.is_occupied();
            self.nav.sensors.sensor_mut(side).on_enter(&contact);
            self.contacts.push((side, contact));
            let edge = side == SensorSide::Front && !was_blocked;
            if edge {
                self.fsm.on_front_blocked(&mut self.nav, &mut self.body);
            }
            edge
        }

        fn clear(&mut self, side: SensorSide) {
            let contacts: Vec<_> = self.contacts.iter().filter(|(s, _)| *s == side).collect();
            for (_, contact) in contacts {
                self.nav.sensors.sensor_mut(side).on_exit(contact);
            }
        }

        fn tick(&mut self, dt: f32) {
            let world = World::new();
            let ctx = TickContext { dt, world: &world };
            self.fsm.step(&mut self.nav, &mut self.body, &ctx);
        }
    }

    #[test]
    fn test_fsm_initial_state() {
        let fsm = FiniteStateController::new(&AgentConfig::default());
        assert_eq!(fsm.state(), FsmState::MoveForward);
        assert_eq!(fsm.name(), "FSM");
    }

    #[test]
    fn test_move_forward_follows_negative_right_axis() {
        let mut rig = Rig::new(&AgentConfig::default());
        rig.tick(0.5);

        // Identity rotation: -right is -X, 10 units/s for half a second
        assert!((rig.body.position - Vec3::new(-5.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_front_blocked_left_free_avoids_left_regardless_of_right() {
        for right_occupied in [false, true] {
            let mut rig = Rig::new(&AgentConfig::default());
            if right_occupied {
                rig.block(SensorSide::Right, 0.0);
            }
            assert!(rig.block(SensorSide::Front, 2.0));
            assert_eq!(rig.fsm.state(), FsmState::AvoidLeft);
        }
    }

    #[test]
    fn test_front_blocked_left_occupied_avoids_right() {
        let mut rig = Rig::new(&AgentConfig::default());
        rig.block(SensorSide::Left, 0.0);
        rig.block(SensorSide::Front, 2.0);
        assert_eq!(rig.fsm.state(), FsmState::AvoidRight);
    }

    #[test]
    fn test_no_safe_path_falls_back_to_move_forward() {
        let mut rig = Rig::new(&AgentConfig::default());
        rig.block(SensorSide::Left, 0.0);
        rig.block(SensorSide::Right, 0.0);
        rig.block(SensorSide::Front, 2.0);
        assert_eq!(rig.fsm.state(), FsmState::MoveForward);
    }

    #[test]
    fn test_shift_distance_uses_extent_and_half_width() {
        let mut rig = Rig::new(&AgentConfig::default().with_box_size(Vec3::new(2.0, 1.0, 1.0)));
        rig.block(SensorSide::Front, 3.0);
        assert!((rig.fsm.shift_distance() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_avoid_left_shifts_along_negative_forward_until_clear() {
        let mut rig = Rig::new(&AgentConfig::default());
        rig.block(SensorSide::Front, 2.0); // shift = 1 + 1 = 2

        rig.tick(0.5);
        // Identity rotation: -forward is -Z
        assert!((rig.body.position - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5);
        assert_eq!(rig.fsm.state(), FsmState::AvoidLeft);
        assert!(rig.fsm.holds_heading());

        rig.clear(SensorSide::Front);
        rig.tick(0.5);
        // Still shifts on the tick the path clears, then resumes
        assert!((rig.body.position - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
        assert_eq!(rig.fsm.state(), FsmState::MoveForward);
        assert!(!rig.fsm.holds_heading());
    }

    #[test]
    fn test_avoid_right_shifts_along_forward() {
        let mut rig = Rig::new(&AgentConfig::default());
        rig.block(SensorSide::Left, 0.0);
        rig.block(SensorSide::Front, 2.0);

        rig.tick(0.5);
        assert!((rig.body.position - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_avoid_resets_rotation_timer() {
        let mut rig = Rig::new(&AgentConfig::default());
        rig.nav.rot_timer = 4.0;
        rig.block(SensorSide::Front, 2.0);
        assert_eq!(rig.nav.rot_timer, 0.0);

        rig.nav.rot_timer = 1.0;
        rig.tick(0.1);
        assert_eq!(rig.nav.rot_timer, 0.0);
    }

    #[test]
    fn test_zero_shift_distance_returns_to_move_forward_without_moving() {
        let mut rig = Rig::new(&AgentConfig::default().with_box_size(Vec3::ZERO));
        rig.block(SensorSide::Front, 0.0);
        assert_eq!(rig.fsm.state(), FsmState::AvoidLeft);

        rig.tick(0.5);
        assert_eq!(rig.fsm.state(), FsmState::MoveForward);
        assert_eq!(rig.body.position, Vec3::ZERO);
    }

    #[test]
    fn test_halt_is_terminal() {
        let mut rig = Rig::new(&AgentConfig::default());
        rig.fsm.halt(&mut rig.nav, &mut rig.body);
        assert_eq!(rig.fsm.state(), FsmState::Idle);

        rig.tick(1.0);
        assert_eq!(rig.fsm.state(), FsmState::Idle);
        assert_eq!(rig.body.position, Vec3::ZERO);
        assert_eq!(rig.fsm.status_line(), "Current State: Idle");
    }

    #[test]
    fn test_state_machine_debug() {
        let machine = StateMachine::new(MoveForwardState);
        let text = format!("{machine:?}");
        assert!(text.contains("MoveForward"));
        assert!(!machine.is_in(FsmState::Idle));
    }
}
