//! Path animator
//!
//! Advances a responding drone's location through a discrete path, one point
//! per tick. The final location always equals the path's last point; there is
//! no interpolation between points. Cancellation is observed through the
//! run's stop signal: once seen, no further location update is issued.

use std::sync::Arc;
use std::time::Duration;

use skygrid_shared::LatLng;
use tokio::sync::{watch, RwLock};
use tokio::time::interval;

use crate::fleet::FleetRegistry;
use crate::map::MapSession;

/// How an animation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOutcome {
    /// The drone reached the final path point
    Completed,
    /// The stop signal was observed before the path was exhausted
    Cancelled,
}

pub struct PathAnimator {
    tick: Duration,
    fleet: Arc<RwLock<FleetRegistry>>,
    map: Arc<RwLock<MapSession>>,
}

impl PathAnimator {
    pub fn new(
        tick: Duration,
        fleet: Arc<RwLock<FleetRegistry>>,
        map: Arc<RwLock<MapSession>>,
    ) -> Self {
        Self { tick, fleet, map }
    }

    /// Walk the drone through `path`, resolving after the last point.
    ///
    /// `stop` is the run-wide stop signal; a flagged stop wins over a due
    /// tick, so no update follows an observed cancellation.
    pub async fn animate(
        &self,
        drone_id: u32,
        path: &[LatLng],
        stop: &mut watch::Receiver<bool>,
    ) -> AnimationOutcome {
        if *stop.borrow() {
            return AnimationOutcome::Cancelled;
        }

        let mut ticker = interval(self.tick);
        let mut next = 0;

        while next < path.len() {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return AnimationOutcome::Cancelled;
                    }
                }
                _ = ticker.tick() => {
                    if *stop.borrow() {
                        return AnimationOutcome::Cancelled;
                    }
                    let point = path[next];
                    self.fleet.write().await.set_location(drone_id, point);
                    self.map.write().await.upsert_marker(drone_id, point);
                    next += 1;
                }
            }
        }

        AnimationOutcome::Completed
    }
}
