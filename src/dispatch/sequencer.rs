//! Dispatch sequencer
//!
//! The engine's control loop: pulls one target at a time off the queue,
//! resolves it to a responding drone and a travel path via the compute
//! service, and drives the animation to completion before touching the next
//! target. All per-target failures consume the target and move on; only a
//! failed `start()` precondition is fatal, and only to that call.

use std::sync::Arc;
use std::time::Duration;

use skygrid_shared::{
    sim,
    state_machine::{RunEvent, RunPhase, RunStateMachine, SimulationRun, TransitionResult},
    targets::TargetQueue,
    DroneStatus, EngineError, Event, EventStatus, PartitionAlgorithm, Target,
};
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, warn};

use crate::compute::ComputeService;
use crate::dispatch::animator::{AnimationOutcome, PathAnimator};
use crate::fleet::FleetRegistry;
use crate::map::MapSession;
use crate::status::StatusReporter;

/// How a run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every target was consumed (resolved or skipped)
    Completed,
    /// The operator stopped the run
    Stopped,
}

/// Terminal state of a single target within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetOutcome {
    Resolved,
    Skipped,
    Interrupted,
}

/// Mission parameters the sequencer sends with every compute request
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    pub map_id: i64,
    pub algorithm: PartitionAlgorithm,
    /// Animation cadence
    pub tick: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            map_id: 1,
            algorithm: PartitionAlgorithm::NoKd,
            tick: Duration::from_millis(sim::ANIMATION_TICK_MS),
        }
    }
}

pub struct DispatchSequencer {
    config: SequencerConfig,
    compute: Arc<dyn ComputeService>,
    fleet: Arc<RwLock<FleetRegistry>>,
    map: Arc<RwLock<MapSession>>,
    targets: TargetQueue,
    animator: PathAnimator,
    status: StatusReporter,

    run: Arc<RwLock<SimulationRun>>,
    fsm: Arc<RwLock<RunStateMachine>>,
    events: Arc<RwLock<Vec<Event>>>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl DispatchSequencer {
    pub fn new(
        config: SequencerConfig,
        compute: Arc<dyn ComputeService>,
        fleet: Arc<RwLock<FleetRegistry>>,
        map: Arc<RwLock<MapSession>>,
        targets: TargetQueue,
        status: StatusReporter,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let animator = PathAnimator::new(config.tick, fleet.clone(), map.clone());

        Self {
            config,
            compute,
            fleet,
            map,
            targets,
            animator,
            status,
            run: Arc::new(RwLock::new(SimulationRun::new())),
            fsm: Arc::new(RwLock::new(RunStateMachine::new())),
            events: Arc::new(RwLock::new(Vec::new())),
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Current run state snapshot
    pub async fn run_state(&self) -> SimulationRun {
        *self.run.read().await
    }

    /// Current phase of the run state machine
    pub async fn phase(&self) -> RunPhase {
        self.fsm.read().await.phase()
    }

    /// Full event log, oldest first
    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }

    /// The most recent events, for display
    pub async fn recent_events(&self) -> Vec<Event> {
        let events = self.events.read().await;
        let skip = events.len().saturating_sub(sim::EVENTS_SHOWN);
        events[skip..].to_vec()
    }

    /// Request cancellation. Effective at the next advancing/requesting
    /// checkpoint; an in-flight animation observes it on its next tick.
    pub async fn stop(&self) {
        self.stop_tx.send_replace(true);
        self.run.write().await.is_running = false;
        self.status.publish("Simulation stop requested").await;
    }

    /// Start a run and drive it to a terminal state.
    ///
    /// A restart after stop always begins again at the first target; the
    /// queue index is not resumed.
    pub async fn run(&self) -> Result<RunOutcome, EngineError> {
        self.start().await?;
        Ok(self.drive().await)
    }

    /// Validate preconditions and reset run state. No state is touched when
    /// a precondition fails.
    async fn start(&self) -> Result<(), EngineError> {
        if self.fleet.read().await.is_empty() {
            return Err(EngineError::PreconditionNotMet(
                "no partitions have been loaded".into(),
            ));
        }
        if self.targets.is_empty() {
            return Err(EngineError::PreconditionNotMet(
                "no targets have been loaded".into(),
            ));
        }

        self.stop_tx.send_replace(false);
        self.run.write().await.reset_for_start();
        self.map.write().await.clear_targets();
        self.transition(RunEvent::StartRequested).await;
        self.status
            .publish(format!(
                "Simulation started over {} target(s)",
                self.targets.len()
            ))
            .await;
        Ok(())
    }

    /// The queue-consumer loop: one target fully resolves (or is skipped)
    /// before the next is looked at.
    async fn drive(&self) -> RunOutcome {
        loop {
            if self.stop_requested() {
                return self.finish_stopped().await;
            }

            let index = {
                let mut run = self.run.write().await;
                if run.current_target_index < 0 {
                    run.current_target_index = 0;
                }
                run.current_target_index
            };

            let Some(target) = self.targets.get(index as usize).copied() else {
                return self.finish_completed().await;
            };

            self.transition(RunEvent::TargetSelected).await;
            let outcome = self.process_target(target).await;

            match outcome {
                TargetOutcome::Resolved | TargetOutcome::Skipped => {
                    self.run.write().await.current_target_index += 1;
                }
                TargetOutcome::Interrupted => return self.finish_stopped().await,
            }
        }
    }

    /// Process one target under the single-flight gate: the flag is raised
    /// before the first compute call and lowered only at this target's
    /// terminal state.
    async fn process_target(&self, target: Target) -> TargetOutcome {
        self.run.write().await.is_processing_target = true;
        let outcome = self.dispatch_and_animate(target).await;
        self.run.write().await.is_processing_target = false;
        outcome
    }

    async fn dispatch_and_animate(&self, target: Target) -> TargetOutcome {
        let fleet_size = self.fleet.read().await.len();
        let exponent = fleet_size.ilog2();

        self.status
            .publish(format!("Responding to event at {}", target.location()))
            .await;

        let assignment = match self
            .compute
            .drone_assignment(
                self.config.map_id,
                self.config.algorithm,
                target.location(),
                exponent,
            )
            .await
        {
            Ok(index) => index,
            Err(e) => {
                return self
                    .skip_target(
                        target,
                        EngineError::DispatchRequestFailed(e.to_string()),
                    )
                    .await;
            }
        };
        if self.stop_requested() {
            // The response landed after a stop; applying it would resurrect
            // a cancelled run.
            return TargetOutcome::Interrupted;
        }

        // Compatibility shim: the service occasionally reports an index
        // outside the fleet. Degrade to the first drone instead of failing
        // the run.
        let drone_index = if assignment < 0 || assignment as usize >= fleet_size {
            warn!(
                "assignment {} outside fleet of {}, falling back to drone index {}",
                assignment,
                fleet_size,
                sim::FALLBACK_DRONE_INDEX
            );
            sim::FALLBACK_DRONE_INDEX
        } else {
            assignment as usize
        };
        let drone_id = (drone_index + 1) as u32;

        let path = match self
            .compute
            .drone_path(
                self.config.map_id,
                self.config.algorithm,
                target.location(),
                exponent,
            )
            .await
        {
            Ok(path) => path,
            Err(e) => {
                return self
                    .skip_target(target, EngineError::PathUnavailable(e.to_string()))
                    .await;
            }
        };
        if self.stop_requested() {
            return TargetOutcome::Interrupted;
        }
        if path.is_empty() {
            return self
                .skip_target(
                    target,
                    EngineError::PathUnavailable("service returned an empty path".into()),
                )
                .await;
        }

        let event_index = {
            let mut events = self.events.write().await;
            let mut event = Event::pending(target.location());
            event.responding_drone_id = Some(drone_id);
            event.status = EventStatus::Responding;
            events.push(event);
            events.len() - 1
        };
        {
            let mut fleet = self.fleet.write().await;
            fleet.set_status(drone_id, DroneStatus::Responding);
            fleet.set_path(drone_id, Some(path.clone()));
        }
        self.map
            .write()
            .await
            .place_target(target.id, target.location());

        self.transition(RunEvent::DispatchAccepted).await;
        self.status
            .publish(format!(
                "Drone {} responding along {} path point(s)",
                drone_id,
                path.len()
            ))
            .await;

        let mut stop = self.stop_rx.clone();
        let animation = self.animator.animate(drone_id, &path, &mut stop).await;
        if animation == AnimationOutcome::Cancelled {
            return TargetOutcome::Interrupted;
        }

        {
            let mut events = self.events.write().await;
            if let Some(event) = events.get_mut(event_index) {
                event.status = EventStatus::Resolved;
            }
        }
        {
            let mut fleet = self.fleet.write().await;
            fleet.set_path(drone_id, None);
            fleet.set_status(drone_id, DroneStatus::Idle);
        }

        self.transition(RunEvent::AnimationFinished).await;
        self.status
            .publish(format!(
                "Event at {} resolved by drone {}",
                target.location(),
                drone_id
            ))
            .await;
        TargetOutcome::Resolved
    }

    /// A recoverable per-target failure: report it, consume the target
    async fn skip_target(&self, target: Target, error: EngineError) -> TargetOutcome {
        warn!("target {} skipped: {}", target.id, error);
        self.status
            .publish(format!("Target {} skipped: {}", target.id, error))
            .await;
        self.transition(RunEvent::TargetSkipped).await;
        TargetOutcome::Skipped
    }

    async fn finish_completed(&self) -> RunOutcome {
        self.transition(RunEvent::QueueExhausted).await;
        self.run.write().await.is_running = false;
        self.status
            .publish(format!(
                "Simulation complete: {} target(s) processed",
                self.targets.len()
            ))
            .await;
        RunOutcome::Completed
    }

    async fn finish_stopped(&self) -> RunOutcome {
        self.transition(RunEvent::StopRequested).await;
        // The queue index is left where it was; a later start() resets it.
        self.run.write().await.is_running = false;
        self.status.publish("Simulation stopped").await;
        RunOutcome::Stopped
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    async fn transition(&self, event: RunEvent) {
        match self.fsm.write().await.process_event(event) {
            TransitionResult::Success(phase) => {
                debug!("run phase -> {:?} on {:?}", phase, event);
            }
            TransitionResult::Invalid { from, event } => {
                // A sequencing bug, not a runtime condition; loud but not fatal.
                error!("invalid run transition: {:?} from {:?}", event, from);
            }
        }
    }
}
