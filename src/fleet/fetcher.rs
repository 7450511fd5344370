//! Partition fetcher
//!
//! Turns one compute-service partition fetch into a fleet of drone agents.
//! Validation happens before any mutation: when the service returns zero
//! partitions or a partition without a usable spawn point, the existing
//! fleet and its markers stay exactly as they were.

use std::sync::Arc;

use skygrid_shared::{EngineError, Partition, PartitionAlgorithm};
use tokio::sync::RwLock;
use tracing::info;

use crate::compute::ComputeService;
use crate::fleet::FleetRegistry;
use crate::map::MapSession;

pub struct PartitionFetcher {
    compute: Arc<dyn ComputeService>,
    fleet: Arc<RwLock<FleetRegistry>>,
    map: Arc<RwLock<MapSession>>,
}

impl PartitionFetcher {
    pub fn new(
        compute: Arc<dyn ComputeService>,
        fleet: Arc<RwLock<FleetRegistry>>,
        map: Arc<RwLock<MapSession>>,
    ) -> Self {
        Self {
            compute,
            fleet,
            map,
        }
    }

    /// Fetch partitions and atomically replace the fleet with one drone per
    /// partition. Returns the installed partition set for display.
    ///
    /// Fleet size mirrors whatever the service returned; the power-of-two
    /// planning constraint is not enforced here.
    pub async fn refresh(
        &self,
        map_id: i64,
        algorithm: PartitionAlgorithm,
        drone_count_exponent: u32,
    ) -> Result<Vec<Partition>, EngineError> {
        let partitions = self
            .compute
            .fetch_partitions(map_id, algorithm, drone_count_exponent)
            .await
            .map_err(|e| EngineError::PartitionUnavailable(e.to_string()))?;

        if partitions.is_empty() {
            return Err(EngineError::PartitionUnavailable(
                "service returned zero partitions".into(),
            ));
        }
        if let Some(bad) = partitions.iter().find(|p| p.spawn_point().is_none()) {
            return Err(EngineError::PartitionUnavailable(format!(
                "partition {} has no boundary points",
                bad.id
            )));
        }

        let mut fleet = self.fleet.write().await;
        let created = fleet.rebuild_from_partitions(&partitions);

        // Markers mirror the new fleet exactly: tear down, then recreate.
        let mut map = self.map.write().await;
        map.remove_all_markers();
        for drone in fleet.drones() {
            map.upsert_marker(drone.id, drone.location);
        }

        info!(
            "fleet rebuilt: {} drone(s) over {} {} partition(s) for map {}",
            created,
            partitions.len(),
            algorithm,
            map_id
        );
        Ok(partitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::testing::RecordingRenderer;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use skygrid_shared::LatLng;

    struct FixedPartitions {
        partitions: Vec<Partition>,
        fail: bool,
    }

    #[async_trait]
    impl ComputeService for FixedPartitions {
        async fn fetch_partitions(
            &self,
            _map_id: i64,
            _algorithm: PartitionAlgorithm,
            _drone_count_exponent: u32,
        ) -> Result<Vec<Partition>> {
            if self.fail {
                bail!("service unreachable");
            }
            Ok(self.partitions.clone())
        }

        async fn drone_assignment(
            &self,
            _map_id: i64,
            _algorithm: PartitionAlgorithm,
            _target: LatLng,
            _drone_count_exponent: u32,
        ) -> Result<i64> {
            Ok(0)
        }

        async fn drone_path(
            &self,
            _map_id: i64,
            _algorithm: PartitionAlgorithm,
            target: LatLng,
            _drone_count_exponent: u32,
        ) -> Result<Vec<LatLng>> {
            Ok(vec![target])
        }

        async fn fetch_no_fly_zones(&self, _map_id: i64) -> Result<Vec<Vec<LatLng>>> {
            Ok(Vec::new())
        }
    }

    fn partition(id: i64, origin: Option<LatLng>, boundary: Vec<LatLng>) -> Partition {
        Partition {
            id,
            map_id: 1,
            algorithm: PartitionAlgorithm::NoKd,
            boundary,
            origin_drone: origin,
        }
    }

    fn fetcher_with(
        partitions: Vec<Partition>,
        fail: bool,
    ) -> (PartitionFetcher, Arc<RwLock<FleetRegistry>>, RecordingRenderer) {
        let renderer = RecordingRenderer::default();
        let fleet = Arc::new(RwLock::new(FleetRegistry::new()));
        let map = Arc::new(RwLock::new(MapSession::new(Box::new(renderer.clone()))));
        let compute = Arc::new(FixedPartitions { partitions, fail });
        (
            PartitionFetcher::new(compute, fleet.clone(), map),
            fleet,
            renderer,
        )
    }

    #[tokio::test]
    async fn test_fleet_matches_partition_count() {
        let partitions = vec![
            partition(1, Some(LatLng::new(1.0, 1.0)), vec![LatLng::new(0.0, 0.0)]),
            partition(2, None, vec![LatLng::new(2.0, 2.0)]),
        ];
        let (fetcher, fleet, renderer) = fetcher_with(partitions, false);

        let installed = fetcher
            .refresh(1, PartitionAlgorithm::NoKd, 1)
            .await
            .unwrap();
        assert_eq!(installed.len(), 2);

        let fleet = fleet.read().await;
        assert_eq!(fleet.len(), 2);
        assert_eq!(fleet.get(1).unwrap().location, LatLng::new(1.0, 1.0));
        // No origin drone on partition 2: spawn at first boundary vertex
        assert_eq!(fleet.get(2).unwrap().location, LatLng::new(2.0, 2.0));
        assert_eq!(renderer.log().iter().filter(|c| c.starts_with("upsert")).count(), 2);
    }

    #[tokio::test]
    async fn test_zero_partitions_leaves_fleet_untouched() {
        let (fetcher, fleet, _) = fetcher_with(Vec::new(), false);
        {
            fleet.write().await.rebuild_from_partitions(&[partition(
                9,
                Some(LatLng::new(9.0, 9.0)),
                vec![LatLng::new(9.0, 9.0)],
            )]);
        }

        let result = fetcher.refresh(1, PartitionAlgorithm::NoKd, 1).await;
        assert!(matches!(result, Err(EngineError::PartitionUnavailable(_))));
        // Prior fleet remains valid
        let fleet = fleet.read().await;
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet.get(1).unwrap().partition_id, 9);
    }

    #[tokio::test]
    async fn test_malformed_partition_leaves_fleet_untouched() {
        let partitions = vec![
            partition(1, Some(LatLng::new(1.0, 1.0)), vec![LatLng::new(0.0, 0.0)]),
            partition(2, None, Vec::new()), // no points at all
        ];
        let (fetcher, fleet, _) = fetcher_with(partitions, false);

        let result = fetcher.refresh(1, PartitionAlgorithm::NoKd, 1).await;
        assert!(matches!(result, Err(EngineError::PartitionUnavailable(_))));
        assert!(fleet.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_maps_to_partition_unavailable() {
        let (fetcher, _, _) = fetcher_with(Vec::new(), true);
        let result = fetcher.refresh(1, PartitionAlgorithm::KdNative, 2).await;
        assert!(matches!(result, Err(EngineError::PartitionUnavailable(_))));
    }

    #[tokio::test]
    async fn test_markers_recreated_on_refresh() {
        let partitions = vec![partition(
            1,
            Some(LatLng::new(1.0, 1.0)),
            vec![LatLng::new(0.0, 0.0)],
        )];
        let (fetcher, _, renderer) = fetcher_with(partitions, false);

        fetcher
            .refresh(1, PartitionAlgorithm::NoKd, 1)
            .await
            .unwrap();
        fetcher
            .refresh(1, PartitionAlgorithm::NoKd, 1)
            .await
            .unwrap();

        let log = renderer.log();
        // Second refresh tears the first marker down before recreating it
        assert!(log.contains(&"remove 1".to_string()));
        assert_eq!(log.iter().filter(|c| c.starts_with("upsert 1")).count(), 2);
    }
}
