//! Compute service trait abstraction for pluggable backends

use anyhow::Result;
use async_trait::async_trait;
use skygrid_shared::{LatLng, Partition, PartitionAlgorithm};

/// A no-fly zone polygon as a closed ring of vertices
pub type Polygon = Vec<LatLng>;

/// The four operations the engine consumes from the compute service
#[async_trait]
pub trait ComputeService: Send + Sync {
    /// Fetch the partition set for a map, algorithm, and fleet size
    /// (`drone_count_exponent` is log2 of the fleet size)
    async fn fetch_partitions(
        &self,
        map_id: i64,
        algorithm: PartitionAlgorithm,
        drone_count_exponent: u32,
    ) -> Result<Vec<Partition>>;

    /// Resolve a target to the 0-based index of the responding drone
    async fn drone_assignment(
        &self,
        map_id: i64,
        algorithm: PartitionAlgorithm,
        target: LatLng,
        drone_count_exponent: u32,
    ) -> Result<i64>;

    /// Compute the travel path from the responding drone to the target
    async fn drone_path(
        &self,
        map_id: i64,
        algorithm: PartitionAlgorithm,
        target: LatLng,
        drone_count_exponent: u32,
    ) -> Result<Vec<LatLng>>;

    /// Fetch no-fly zone polygons; consumed only for display
    async fn fetch_no_fly_zones(&self, map_id: i64) -> Result<Vec<Polygon>>;
}
