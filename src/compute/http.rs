//! HTTP implementation of the compute service client
//!
//! Speaks the planning service's JSON protocol. One quirk is preserved
//! deliberately: the service reports failures as HTTP 200 with an
//! `{"error": "..."}` body, so every response is checked for that field
//! before its payload is trusted. `num_drones` on the wire is the exponent,
//! not the fleet size.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use skygrid_shared::{LatLng, Partition, PartitionAlgorithm};
use tracing::debug;

use super::traits::{ComputeService, Polygon};

/// Compute service client over HTTP
pub struct HttpComputeService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpComputeService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        let url = self.endpoint(path);
        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[derive(Debug, Deserialize)]
struct WirePoint {
    latitude: f64,
    longitude: f64,
}

impl WirePoint {
    fn to_latlng(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Deserialize)]
struct WireDrone {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct WirePartition {
    id: i64,
    #[serde(default)]
    drone: Option<WireDrone>,
    #[serde(default)]
    points: Vec<WirePoint>,
}

#[derive(Debug, Deserialize)]
struct PartitionsResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    partitions: Option<Vec<WirePartition>>,
}

#[derive(Debug, Deserialize)]
struct AssignmentResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    drone_number: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct PathResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    points_visited: Option<Vec<WirePoint>>,
}

#[derive(Debug, Deserialize)]
struct WireNoFly {
    #[serde(default)]
    points: Vec<WirePoint>,
}

#[derive(Debug, Deserialize)]
struct NoFlyResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    no_fly_zones: Option<Vec<WireNoFly>>,
}

/// Endpoint serving partitions for each algorithm
fn partition_endpoint(algorithm: PartitionAlgorithm) -> &'static str {
    match algorithm {
        PartitionAlgorithm::NoKd => "partition_no_kd/",
        PartitionAlgorithm::KdHalfPerimeter => "partition_kd_half/",
        PartitionAlgorithm::KdNative => "partition_kd_native/",
    }
}

fn dispatch_body(
    map_id: i64,
    algorithm: PartitionAlgorithm,
    target: LatLng,
    drone_count_exponent: u32,
) -> serde_json::Value {
    json!({
        "map_id": map_id,
        "partition_type": algorithm.partition_type(),
        "num_drones": drone_count_exponent,
        "event_long": target.lng,
        "event_lat": target.lat,
    })
}

fn partitions_from_wire(
    response: PartitionsResponse,
    map_id: i64,
    algorithm: PartitionAlgorithm,
) -> Result<Vec<Partition>> {
    if let Some(error) = response.error {
        bail!("partition service: {}", error);
    }
    let wire = response
        .partitions
        .ok_or_else(|| anyhow!("partition response missing partitions"))?;

    Ok(wire
        .into_iter()
        .map(|p| Partition {
            id: p.id,
            map_id,
            algorithm,
            boundary: p.points.iter().map(WirePoint::to_latlng).collect(),
            origin_drone: p
                .drone
                .map(|d| LatLng::new(d.latitude, d.longitude)),
        })
        .collect())
}

#[async_trait]
impl ComputeService for HttpComputeService {
    async fn fetch_partitions(
        &self,
        map_id: i64,
        algorithm: PartitionAlgorithm,
        drone_count_exponent: u32,
    ) -> Result<Vec<Partition>> {
        let body = json!({
            "map_id": map_id,
            "num_drones": drone_count_exponent,
        });
        let response: PartitionsResponse =
            self.post(partition_endpoint(algorithm), body).await?;
        partitions_from_wire(response, map_id, algorithm)
    }

    async fn drone_assignment(
        &self,
        map_id: i64,
        algorithm: PartitionAlgorithm,
        target: LatLng,
        drone_count_exponent: u32,
    ) -> Result<i64> {
        let body = dispatch_body(map_id, algorithm, target, drone_count_exponent);
        let response: AssignmentResponse = self.post("get_drone_number/", body).await?;

        if let Some(error) = response.error {
            bail!("assignment service: {}", error);
        }
        // The wire carries the 1-based drone number; the engine works with
        // 0-based indices.
        let number = response
            .drone_number
            .ok_or_else(|| anyhow!("assignment response missing drone_number"))?;
        Ok(number - 1)
    }

    async fn drone_path(
        &self,
        map_id: i64,
        algorithm: PartitionAlgorithm,
        target: LatLng,
        drone_count_exponent: u32,
    ) -> Result<Vec<LatLng>> {
        let body = dispatch_body(map_id, algorithm, target, drone_count_exponent);
        let response: PathResponse = self.post("respond_to_event/", body).await?;

        if let Some(error) = response.error {
            bail!("path service: {}", error);
        }
        let points = response
            .points_visited
            .ok_or_else(|| anyhow!("path response missing points_visited"))?;
        Ok(points.iter().map(WirePoint::to_latlng).collect())
    }

    async fn fetch_no_fly_zones(&self, map_id: i64) -> Result<Vec<Polygon>> {
        let body = json!({ "map_id": map_id });
        let response: NoFlyResponse = self.post("no_flies_on_map/", body).await?;

        if let Some(error) = response.error {
            bail!("no-fly service: {}", error);
        }
        let zones = response
            .no_fly_zones
            .ok_or_else(|| anyhow!("no-fly response missing no_fly_zones"))?;
        Ok(zones
            .into_iter()
            .map(|z| z.points.iter().map(WirePoint::to_latlng).collect())
            .collect())
    }
}
