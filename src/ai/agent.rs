//! Navigation agent
//!
//! `NavAgent` owns one decision strategy, the body it moves, the run clock and
//! the sink results go to. Waypoint following, collision counting and the
//! finish line behave the same for every strategy and are implemented here
//! once, through [`Navigable`].

use glam::Vec3;
use hecs::Entity;

use super::navigation::{
    DecisionStrategy, Navigable, NavigationState, RunStatus, TickContext, heading_towards,
};
use super::waypoint::{WaypointGraph, WaypointId};
use crate::core::{
    AgentConfig, MemorySink, NavEvent, ResultsSink, RunClock, RunTimer, SimulationRunResult,
    ZoneEvent, elapsed_label,
};
use crate::ecs::{Transform, TransformBackend, World};

/// An agent driven by exactly one strategy `C`
#[derive(Debug)]
pub struct NavAgent<C: DecisionStrategy, B: TransformBackend = Transform> {
    nav: NavigationState,
    strategy: C,
    body: B,
    clock: Box<dyn RunTimer>,
    sink: Box<dyn ResultsSink>,
    time_to_rot: f32,
    result: Option<SimulationRunResult>,
}

impl<C: DecisionStrategy, B: TransformBackend> NavAgent<C, B> {
    /// Agent with its own stopped clock and an in-memory sink
    pub fn new(strategy: C, body: B, nav: NavigationState, config: &AgentConfig) -> Self {
        Self {
            nav,
            strategy,
            body,
            clock: Box::new(RunClock::new()),
            sink: Box::new(MemorySink::new()),
            time_to_rot: config.time_to_rot,
            result: None,
        }
    }

    pub fn with_clock(mut self, clock: impl RunTimer + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_sink(mut self, sink: impl ResultsSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// React to a zone or sensor event.
    ///
    /// Returns the run result when this event finished the run.
    pub fn handle_event(
        &mut self,
        event: NavEvent,
        graph: &WaypointGraph,
    ) -> Option<SimulationRunResult> {
        match event {
            NavEvent::Zone(ZoneEvent::WaypointEntered(reached)) => {
                self.advance_waypoint(reached, graph);
            }
            NavEvent::Zone(ZoneEvent::ObstacleEntered(obstacle)) => {
                self.record_collision(obstacle);
            }
            NavEvent::Zone(ZoneEvent::StartLineEntered) => self.start_run(),
            NavEvent::Zone(ZoneEvent::FinishLineExited) => return self.finish_run(),
            NavEvent::Sensor(sensor) => {
                let front_blocked = self.nav.sensors.apply(&sensor);
                if front_blocked && self.nav.status == RunStatus::Driving {
                    self.strategy.on_front_blocked(&mut self.nav, &mut self.body);
                }
            }
        }
        None
    }

    /// Advance one fixed step.
    pub fn tick(&mut self, dt: f32, world: &World, graph: &WaypointGraph) {
        if self.nav.is_finished() {
            self.strategy.halt(&mut self.nav, &mut self.body);
            self.clock.tick(dt);
            return;
        }

        let ctx = TickContext { dt, world };
        self.strategy.step(&mut self.nav, &mut self.body, &ctx);

        if self.nav.rot_timer >= self.time_to_rot {
            self.nav.rot_timer = 0.0;
            if !self.strategy.holds_heading() {
                self.reorient(graph);
            }
        }

        if self.strategy.holds_heading() {
            self.nav.rot_timer = 0.0;
        } else {
            self.nav.rot_timer += dt;
        }

        self.clock.tick(dt);
    }

    pub fn nav(&self) -> &NavigationState {
        &self.nav
    }

    pub fn strategy(&self) -> &C {
        &self.strategy
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    pub fn clock(&self) -> &dyn RunTimer {
        self.clock.as_ref()
    }

    pub fn position(&self) -> Vec3 {
        self.body.position()
    }

    pub fn is_finished(&self) -> bool {
        self.nav.is_finished()
    }

    /// Result produced when the run finished
    pub fn result(&self) -> Option<&SimulationRunResult> {
        self.result.as_ref()
    }

    /// Strategy status, run time and collision count, for logs
    pub fn status_line(&self) -> String {
        format!(
            "{} | {} | Collided with {} Obstacles",
            self.strategy.status_line(),
            elapsed_label(self.clock.elapsed()),
            self.nav.collisions
        )
    }
}

impl<C: DecisionStrategy, B: TransformBackend> Navigable for NavAgent<C, B> {
    fn advance_waypoint(&mut self, reached: WaypointId, graph: &WaypointGraph) {
        self.nav.current_waypoint = graph.next(reached);
        log::debug!("Waypoint {:?} reached, heading for {:?}", reached, self.nav.current_waypoint);
        self.reorient(graph);
    }

    fn reorient(&mut self, graph: &WaypointGraph) -> bool {
        let Some(target) = self.nav.current_waypoint.and_then(|id| graph.position(id)) else {
            return false;
        };
        match heading_towards(self.body.position(), target) {
            Some(rotation) => {
                self.body.set_rotation(rotation);
                true
            }
            None => false,
        }
    }

    fn record_collision(&mut self, obstacle: Entity) {
        self.nav.collisions += 1;
        log::warn!(
            "Collided with an obstacle {:?} ({} so far)",
            obstacle,
            self.nav.collisions
        );
    }

    fn start_run(&mut self) {
        self.clock.start();
        log::info!("{} started on {}", self.strategy.name(), self.nav.track_name);
    }

    fn finish_run(&mut self) -> Option<SimulationRunResult> {
        if self.nav.is_finished() {
            return None;
        }

        self.clock.stop();
        self.nav.status = RunStatus::Finished;

        let result = SimulationRunResult {
            track_name: self.nav.track_name.clone(),
            controller_name: self.strategy.name().to_string(),
            elapsed_seconds: self.clock.elapsed(),
            collision_count: self.nav.collisions,
        };

        if let Err(e) = self.sink.append(&result) {
            log::error!("Failed to store run result: {}", e);
        }
        log::info!(
            "{} finished {} in {:.2}s with {} collisions",
            result.controller_name,
            result.track_name,
            result.elapsed_seconds,
            result.collision_count
        );

        self.result = Some(result.clone());
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{Contact, FiniteStateController, FsmState, FuzzyController, SensorSide};
    use crate::core::{ResultsLog, SensorEvent, SensorLayout, ZonePhase, ZoneTag};

    fn fsm_agent(first: Option<WaypointId>) -> NavAgent<FiniteStateController> {
        let config = AgentConfig::default();
        let nav = NavigationState::new("Track1", &SensorLayout::default()).with_waypoint(first);
        NavAgent::new(FiniteStateController::new(&config), Transform::new(), nav, &config)
    }

    #[test]
    fn test_waypoint_advance_turns_towards_successor() {
        let (graph, first) =
            WaypointGraph::chain(&[Vec3::new(-10.0, 0.0, 0.0), Vec3::new(-10.0, 0.0, 10.0)], false);
        let first = first.unwrap();
        let mut agent = fsm_agent(Some(first));

        agent.handle_event(NavEvent::Zone(ZoneEvent::WaypointEntered(first)), &graph);

        assert_eq!(agent.nav().current_waypoint, graph.next(first));
        // Drive axis now points at (-10, 0, 10)
        let drive = agent.body().rotation * Vec3::NEG_X;
        let expected = Vec3::new(-1.0, 0.0, 1.0).normalize();
        assert!((drive - expected).length() < 1e-5);
    }

    #[test]
    fn test_last_waypoint_leaves_heading_alone() {
        let (graph, first) = WaypointGraph::chain(&[Vec3::new(0.0, 0.0, 5.0)], false);
        let first = first.unwrap();
        let mut agent = fsm_agent(Some(first));

        agent.handle_event(NavEvent::Zone(ZoneEvent::WaypointEntered(first)), &graph);
        assert!(agent.nav().current_waypoint.is_none());
        assert!(!agent.reorient(&graph));
        assert_eq!(agent.body().rotation, glam::Quat::IDENTITY);
    }

    #[test]
    fn test_reorient_on_timer() {
        let (graph, first) = WaypointGraph::chain(&[Vec3::new(0.0, 0.0, 10.0)], false);
        let config = AgentConfig::default()
            .with_time_to_rot(0.1)
            .with_move_speed(0.0);
        let nav = NavigationState::new("Track1", &SensorLayout::default()).with_waypoint(first);
        let mut agent = NavAgent::new(
            FiniteStateController::new(&config),
            Transform::new(),
            nav,
            &config,
        );
        let world = World::new();

        agent.tick(0.05, &world, &graph);
        agent.tick(0.05, &world, &graph);
        assert_eq!(agent.body().rotation, glam::Quat::IDENTITY);

        // Third tick sees the accumulator at the threshold
        agent.tick(0.05, &world, &graph);
        let drive = agent.body().rotation * Vec3::NEG_X;
        assert!((drive - Vec3::Z).length() < 1e-4);
        assert!(agent.nav().rot_timer < 0.1);
    }

    #[test]
    fn test_collisions_counted() {
        let graph = WaypointGraph::new();
        let mut agent = fsm_agent(None);
        let mut world = hecs::World::new();

        for _ in 0..3 {
            let rock = world.spawn(());
            agent.handle_event(NavEvent::Zone(ZoneEvent::ObstacleEntered(rock)), &graph);
        }
        assert_eq!(agent.nav().collisions, 3);
    }

    #[test]
    fn test_finish_is_idempotent_and_appends_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ResultsLog::DEFAULT_FILE_NAME);
        let graph = WaypointGraph::new();
        let world = World::new();
        let mut agent = fsm_agent(None).with_sink(ResultsLog::new(&path));

        agent.handle_event(NavEvent::Zone(ZoneEvent::StartLineEntered), &graph);
        for _ in 0..10 {
            agent.tick(0.1, &world, &graph);
        }

        let result = agent
            .handle_event(NavEvent::Zone(ZoneEvent::FinishLineExited), &graph)
            .unwrap();
        assert_eq!(result.track_name, "Track1");
        assert_eq!(result.controller_name, "FSM");
        assert!((result.elapsed_seconds - 1.0).abs() < 1e-4);
        assert!(!agent.clock().is_running());

        assert!(agent
            .handle_event(NavEvent::Zone(ZoneEvent::FinishLineExited), &graph)
            .is_none());

        let records = ResultsLog::new(&path).read_all().unwrap();
        assert_eq!(records, vec![result]);
    }

    #[test]
    fn test_finished_agent_halts() {
        let graph = WaypointGraph::new();
        let world = World::new();
        let mut agent = fsm_agent(None);

        agent.finish_run();
        agent.tick(1.0, &world, &graph);

        assert!(agent.is_finished());
        assert_eq!(agent.strategy().state(), FsmState::Idle);
        assert_eq!(agent.position(), Vec3::ZERO);
    }

    #[test]
    fn test_front_blocked_only_while_driving() {
        let graph = WaypointGraph::new();
        let mut agent = fsm_agent(None);
        let mut world = hecs::World::new();
        let contact = Contact {
            entity: world.spawn(()),
            tag: ZoneTag::Obstacle,
            layer: AgentConfig::OBSTACLE_LAYER,
            extent: 2.0,
        };
        let enter = NavEvent::Sensor(SensorEvent {
            side: SensorSide::Front,
            phase: ZonePhase::Enter,
            contact,
        });

        agent.handle_event(enter, &graph);
        assert_eq!(agent.strategy().state(), FsmState::AvoidLeft);

        let mut finished = fsm_agent(None);
        finished.finish_run();
        finished.handle_event(enter, &graph);
        assert!(finished.nav().sensors.is_occupied(SensorSide::Front));
        assert_ne!(finished.strategy().state(), FsmState::AvoidLeft);
    }

    #[test]
    fn test_fuzzy_agent_reports_its_name() {
        let config = AgentConfig::default();
        let nav = NavigationState::new("Track2", &SensorLayout::default());
        let mut agent = NavAgent::new(FuzzyController::new(&config), Transform::new(), nav, &config);

        let result = agent.finish_run().unwrap();
        assert_eq!(result.controller_name, "Fuzzy Logic");
        assert_eq!(result.elapsed_seconds, 0.0);
        assert_eq!(
            agent.status_line(),
            "Speed: 0\tTurn: 0 | Time: 00:00 | Collided with 0 Obstacles"
        );
    }
}
