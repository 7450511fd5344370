//! Simulation Run State Machine
//!
//! Defines the valid phase transitions of a dispatch run. The sequencer
//! drives this machine through one target at a time; an invalid transition
//! indicates a sequencing bug, never a recoverable condition.

use serde::{Deserialize, Serialize};

/// Phase of the dispatch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    /// No run started yet
    Idle,
    /// Selecting the next target from the queue
    Advancing,
    /// Awaiting compute-service responses for the current target
    Requesting,
    /// Delegating to the path animator
    Animating,
    /// All targets processed (successfully or by skip)
    Completed,
    /// Run cancelled by the operator
    Stopped,
}

impl RunPhase {
    /// Terminal phases accept no event other than a fresh start
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Stopped)
    }
}

/// Events that drive phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// `start()` accepted: preconditions held and run state was reset
    StartRequested,
    /// A target was pulled from the queue
    TargetSelected,
    /// The queue index reached the end of the target list
    QueueExhausted,
    /// Assignment and path both arrived; animation begins
    DispatchAccepted,
    /// A compute-service failure consumed the current target
    TargetSkipped,
    /// The animator reached the final path point
    AnimationFinished,
    /// `stop()` observed
    StopRequested,
}

/// Result of a transition attempt
#[derive(Debug, Clone)]
pub enum TransitionResult {
    /// Transition was valid and the phase changed
    Success(RunPhase),
    /// Transition was invalid from the current phase
    Invalid { from: RunPhase, event: RunEvent },
}

/// The run state machine for target-by-target dispatch
#[derive(Debug)]
pub struct RunStateMachine {
    current_phase: RunPhase,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    /// Create a new state machine in the Idle phase
    pub fn new() -> Self {
        Self {
            current_phase: RunPhase::Idle,
        }
    }

    /// Get the current phase
    pub fn phase(&self) -> RunPhase {
        self.current_phase
    }

    /// Process an event and return the transition result
    pub fn process_event(&mut self, event: RunEvent) -> TransitionResult {
        match self.next_phase(&event) {
            Some(phase) => {
                self.current_phase = phase;
                TransitionResult::Success(phase)
            }
            None => TransitionResult::Invalid {
                from: self.current_phase,
                event,
            },
        }
    }

    /// Get the next phase for a given event, if the transition is valid
    fn next_phase(&self, event: &RunEvent) -> Option<RunPhase> {
        use RunEvent::*;
        use RunPhase::*;

        match (self.current_phase, event) {
            // A run can start fresh from Idle or restart from a terminal phase
            (Idle | Completed | Stopped, StartRequested) => Some(Advancing),

            // From Advancing
            (Advancing, TargetSelected) => Some(Requesting),
            (Advancing, QueueExhausted) => Some(Completed),

            // From Requesting
            (Requesting, DispatchAccepted) => Some(Animating),
            (Requesting, TargetSkipped) => Some(Advancing),

            // From Animating
            (Animating, AnimationFinished) => Some(Advancing),

            // Stop is accepted from any non-terminal active phase
            (Advancing | Requesting | Animating, StopRequested) => Some(Stopped),

            // Invalid transition
            _ => None,
        }
    }
}

/// Process-wide run state shared with external callers.
///
/// `is_processing_target` is the single-flight gate: set before the first
/// compute call for a target and cleared only once that target reaches a
/// terminal state (resolved, skipped, or interrupted).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationRun {
    pub is_running: bool,
    /// -1 until the run starts; equals the target count exactly once all
    /// targets are consumed
    pub current_target_index: i64,
    pub is_processing_target: bool,
}

impl SimulationRun {
    pub fn new() -> Self {
        Self {
            is_running: false,
            current_target_index: -1,
            is_processing_target: false,
        }
    }

    /// Reset for a fresh run; restart always begins at the first target
    pub fn reset_for_start(&mut self) {
        self.is_running = true;
        self.current_target_index = -1;
        self.is_processing_target = false;
    }
}

impl Default for SimulationRun {
    fn default() -> Self {
        Self::new()
    }
}
