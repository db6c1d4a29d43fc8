//! Fixed-timestep simulation driver

use crate::ai::{DecisionStrategy, NavAgent, Navigable, NavigationState};
use crate::core::{EventQueue, NavEvent, ResultsSink, SimConfig, SimulationRunResult};
use crate::track::{OverlapTracker, Track};

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// `None` when the tick limit was reached before the finish line
    pub result: Option<SimulationRunResult>,
    pub ticks: u64,
}

impl RunOutcome {
    #[must_use]
    pub fn finished(&self) -> bool {
        self.result.is_some()
    }
}

/// One agent driving one track.
///
/// Each `step()`:
/// 1. detects overlaps and queues enter/exit events
/// 2. swaps the queue so this tick's events become readable
/// 3. dispatches them to the agent
/// 4. ticks the agent (controller, reorientation, clock)
pub struct Simulation<C: DecisionStrategy> {
    track: Track,
    agent: NavAgent<C>,
    tracker: OverlapTracker,
    events: EventQueue,
    fixed_timestep: f32,
    max_ticks: u64,
    ticks: u64,
}

impl<C: DecisionStrategy> Simulation<C> {
    /// Place the agent at the track's spawn, facing its first waypoint
    pub fn new(track: Track, strategy: C, config: &SimConfig) -> Self {
        let nav = NavigationState::new(track.name.clone(), &config.agent.sensors)
            .with_waypoint(track.first_waypoint);
        let mut agent = NavAgent::new(strategy, track.spawn, nav, &config.agent);
        agent.reorient(&track.graph);

        log::info!(
            "Simulation ready: {} on {} (dt {}s, max {} ticks)",
            agent.strategy().name(),
            track.name,
            config.fixed_timestep,
            config.max_ticks
        );

        Self {
            tracker: OverlapTracker::new(config.agent.box_size, config.agent.sensors.clone()),
            agent,
            track,
            events: EventQueue::new(),
            fixed_timestep: config.fixed_timestep,
            max_ticks: config.max_ticks,
            ticks: 0,
        }
    }

    /// Send finished runs to `sink` instead of memory
    pub fn with_sink(mut self, sink: impl ResultsSink + 'static) -> Self {
        self.agent = self.agent.with_sink(sink);
        self
    }

    /// Queue an event as if the host had reported it; it is dispatched on
    /// the next step.
    pub fn push_event(&mut self, event: NavEvent) {
        self.events.push(event);
    }

    /// Advance one fixed tick. Returns the result on the tick the run finished.
    pub fn step(&mut self) -> Option<SimulationRunResult> {
        self.tracker
            .update(self.agent.body(), &self.track.world, &mut self.events);
        self.events.swap();

        let mut finished = None;
        for event in self.events.drain() {
            if let Some(result) = self.agent.handle_event(event, &self.track.graph) {
                finished = Some(result);
            }
        }

        self.agent
            .tick(self.fixed_timestep, &self.track.world, &self.track.graph);
        self.ticks += 1;

        if self.ticks % 500 == 0 {
            log::debug!("Tick {}: {}", self.ticks, self.agent.status_line());
        }
        finished
    }

    /// Step until the run finishes or the tick limit is reached
    pub fn run(&mut self) -> RunOutcome {
        while self.ticks < self.max_ticks {
            if let Some(result) = self.step() {
                return RunOutcome {
                    result: Some(result),
                    ticks: self.ticks,
                };
            }
        }

        log::warn!(
            "{} did not finish {} within {} ticks",
            self.agent.strategy().name(),
            self.track.name,
            self.max_ticks
        );
        RunOutcome {
            result: None,
            ticks: self.ticks,
        }
    }

    pub fn agent(&self) -> &NavAgent<C> {
        &self.agent
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
