//! Drone fleet registry
//!
//! Owns the authoritative drone states. All mutation is keyed by drone id,
//! never by array index, so callers stay decoupled from ordering. A lookup
//! outside the fleet's id range is a usage error: it is logged and reported
//! to the caller, and no other drone is ever touched.

use skygrid_shared::{Drone, DroneStatus, LatLng, Partition};
use tracing::warn;

#[derive(Debug, Default)]
pub struct FleetRegistry {
    drones: Vec<Drone>,
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self { drones: Vec::new() }
    }

    pub fn drones(&self) -> &[Drone] {
        &self.drones
    }

    pub fn len(&self) -> usize {
        self.drones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drones.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Drone> {
        self.drones.iter().find(|d| d.id == id)
    }

    /// Replace the whole fleet from a validated partition set: one drone per
    /// partition, ids a contiguous 1-based range in partition order.
    ///
    /// Callers validate spawn points up front (see the partition fetcher);
    /// a partition without one is skipped here as a last-resort defense.
    pub fn rebuild_from_partitions(&mut self, partitions: &[Partition]) -> usize {
        let mut drones = Vec::with_capacity(partitions.len());
        for (index, partition) in partitions.iter().enumerate() {
            let Some(location) = partition.spawn_point() else {
                warn!(
                    "partition {} has no spawn point, no drone created",
                    partition.id
                );
                continue;
            };
            drones.push(Drone {
                id: (index + 1) as u32,
                location,
                status: DroneStatus::Idle,
                partition_id: partition.id,
                path: None,
            });
        }
        self.drones = drones;
        self.drones.len()
    }

    pub fn set_status(&mut self, id: u32, status: DroneStatus) -> bool {
        match self.find_mut(id) {
            Some(drone) => {
                drone.status = status;
                true
            }
            None => false,
        }
    }

    pub fn set_path(&mut self, id: u32, path: Option<Vec<LatLng>>) -> bool {
        match self.find_mut(id) {
            Some(drone) => {
                drone.path = path;
                true
            }
            None => false,
        }
    }

    pub fn set_location(&mut self, id: u32, location: LatLng) -> bool {
        match self.find_mut(id) {
            Some(drone) => {
                drone.location = location;
                true
            }
            None => false,
        }
    }

    fn find_mut(&mut self, id: u32) -> Option<&mut Drone> {
        let found = self.drones.iter_mut().find(|d| d.id == id);
        if found.is_none() {
            warn!("drone {} not in fleet, mutation dropped", id);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skygrid_shared::PartitionAlgorithm;

    fn partition(id: i64, origin: Option<LatLng>) -> Partition {
        Partition {
            id,
            map_id: 1,
            algorithm: PartitionAlgorithm::NoKd,
            boundary: vec![LatLng::new(0.0, 0.0), LatLng::new(0.0, 1.0)],
            origin_drone: origin,
        }
    }

    #[test]
    fn test_rebuild_assigns_contiguous_ids() {
        let mut fleet = FleetRegistry::new();
        let partitions = vec![
            partition(10, Some(LatLng::new(1.0, 1.0))),
            partition(20, None),
            partition(30, Some(LatLng::new(3.0, 3.0))),
        ];
        assert_eq!(fleet.rebuild_from_partitions(&partitions), 3);

        let ids: Vec<u32> = fleet.drones().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(fleet.get(2).unwrap().location, LatLng::new(0.0, 0.0));
        assert_eq!(fleet.get(2).unwrap().partition_id, 20);
        assert!(fleet.drones().iter().all(|d| d.status == DroneStatus::Idle));
    }

    #[test]
    fn test_rebuild_replaces_previous_fleet() {
        let mut fleet = FleetRegistry::new();
        fleet.rebuild_from_partitions(&[
            partition(1, Some(LatLng::new(1.0, 1.0))),
            partition(2, Some(LatLng::new(2.0, 2.0))),
        ]);
        fleet.set_status(1, DroneStatus::Responding);

        fleet.rebuild_from_partitions(&[partition(9, Some(LatLng::new(9.0, 9.0)))]);
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet.get(1).unwrap().status, DroneStatus::Idle);
        assert!(fleet.get(2).is_none());
    }

    #[test]
    fn test_mutation_touches_only_the_addressed_drone() {
        let mut fleet = FleetRegistry::new();
        fleet.rebuild_from_partitions(&[
            partition(1, Some(LatLng::new(1.0, 1.0))),
            partition(2, Some(LatLng::new(2.0, 2.0))),
        ]);

        assert!(fleet.set_status(2, DroneStatus::Responding));
        assert!(fleet.set_path(2, Some(vec![LatLng::new(5.0, 5.0)])));
        assert!(fleet.set_location(2, LatLng::new(5.0, 5.0)));

        let untouched = fleet.get(1).unwrap();
        assert_eq!(untouched.status, DroneStatus::Idle);
        assert_eq!(untouched.location, LatLng::new(1.0, 1.0));
        assert!(untouched.path.is_none());
    }

    #[test]
    fn test_unknown_id_is_reported_not_silent() {
        let mut fleet = FleetRegistry::new();
        fleet.rebuild_from_partitions(&[partition(1, Some(LatLng::new(1.0, 1.0)))]);

        assert!(!fleet.set_status(7, DroneStatus::Responding));
        assert!(!fleet.set_location(0, LatLng::new(0.0, 0.0)));
        assert_eq!(fleet.get(1).unwrap().status, DroneStatus::Idle);
    }
}
