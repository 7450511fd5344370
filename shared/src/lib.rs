//! SkyGrid Shared Domain Types
//!
//! This crate provides the domain model shared between the dispatch engine
//! and any front-end surfaces: drones, partitions, targets, response events,
//! and the simulation run state machine.

pub mod error;
pub mod state_machine;
pub mod targets;

pub use error::EngineError;

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Simulation parameters for the engine
pub mod sim {
    /// Animation cadence: one path point is consumed per tick
    pub const ANIMATION_TICK_MS: u64 = 200;

    /// Drone index used when the compute service returns an out-of-range
    /// assignment (compatibility shim, see the dispatch sequencer)
    pub const FALLBACK_DRONE_INDEX: usize = 0;

    /// Number of recent events surfaced for display
    pub const EVENTS_SHOWN: usize = 20;

    /// Number of recent status lines retained by the reporter
    pub const STATUS_LINES_SHOWN: usize = 50;
}

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lng, self.lat)
    }
}

/// Lifecycle state of a fleet drone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DroneStatus {
    /// Holding position inside its partition
    Idle,
    /// En route to an event
    Responding,
    /// Flying back to its origin point
    Returning,
}

/// A stateful drone agent derived from one partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    /// 1-based id, unique and contiguous within the fleet
    pub id: u32,
    pub location: LatLng,
    pub status: DroneStatus,
    /// Id of the partition this drone covers
    pub partition_id: i64,
    /// Present only while `status` is `Responding`; cleared when the
    /// animation for the current event completes
    pub path: Option<Vec<LatLng>>,
}

/// Which partitioning algorithm produced a set of partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionAlgorithm {
    /// Plain hierarchical decomposition
    NoKd,
    /// KD tree splitting on half the perimeter
    KdHalfPerimeter,
    /// KD tree with native axis selection
    KdNative,
}

impl PartitionAlgorithm {
    /// Numeric partition type carried on the compute-service wire
    pub fn partition_type(&self) -> u8 {
        match self {
            PartitionAlgorithm::NoKd => 0,
            PartitionAlgorithm::KdHalfPerimeter => 1,
            PartitionAlgorithm::KdNative => 2,
        }
    }
}

impl std::fmt::Display for PartitionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartitionAlgorithm::NoKd => write!(f, "no-kd"),
            PartitionAlgorithm::KdHalfPerimeter => write!(f, "kd-half-perimeter"),
            PartitionAlgorithm::KdNative => write!(f, "kd-native"),
        }
    }
}

/// A polygonal region of the operating area assigned to one drone.
/// Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub id: i64,
    pub map_id: i64,
    pub algorithm: PartitionAlgorithm,
    /// Closed ring of boundary vertices
    pub boundary: Vec<LatLng>,
    /// Pre-computed obstacle-free origin for the partition's drone
    pub origin_drone: Option<LatLng>,
}

impl Partition {
    /// Where the partition's drone starts: the declared origin when one was
    /// computed, otherwise the first boundary vertex
    pub fn spawn_point(&self) -> Option<LatLng> {
        self.origin_drone.or_else(|| self.boundary.first().copied())
    }
}

/// A geographic point requiring a drone response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: i64,
    pub lat: f64,
    pub lng: f64,
}

impl Target {
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Lifecycle state of a response event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Pending,
    Responding,
    Resolved,
}

/// The record of one target's processing lifecycle. Events are append-only
/// for the duration of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub lat: f64,
    pub lng: f64,
    pub timestamp_ms: u64,
    pub status: EventStatus,
    /// Set before the event leaves `Pending`
    pub responding_drone_id: Option<u32>,
}

impl Event {
    /// Create a pending event at the given location
    pub fn pending(location: LatLng) -> Self {
        Self {
            lat: location.lat,
            lng: location.lng,
            timestamp_ms: now_ms(),
            status: EventStatus::Pending,
            responding_drone_id: None,
        }
    }

    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}
