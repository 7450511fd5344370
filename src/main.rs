mod compute;
mod dispatch;
mod fleet;
mod map;
mod plan;
mod status;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skygrid_shared::{sim, targets::TargetQueue};
use tokio::sync::RwLock;

use compute::{ComputeService, HttpComputeService};
use dispatch::{DispatchSequencer, RunOutcome, SequencerConfig};
use fleet::{FleetRegistry, PartitionFetcher};
use map::{MapSession, TraceRenderer};
use plan::{EngineConfig, MissionPlan};
use status::StatusReporter;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Single-threaded cooperative scheduling: the only suspension points are the
// two compute awaits per target and the animation timer.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = EngineConfig::from_env();
    let plan = match MissionPlan::from_file(&config.plan_file) {
        Ok(plan) => plan,
        Err(e) => {
            warn!("mission plan not loaded ({e:#}), using defaults");
            MissionPlan::default()
        }
    };

    info!("SkyGrid dispatch engine starting");
    info!("  compute service: {}", config.compute_url);
    info!(
        "  map {} / {} / 2^{} drones",
        plan.map_id, plan.algorithm, plan.drone_count_exponent
    );

    let compute: Arc<dyn ComputeService> = Arc::new(HttpComputeService::new(&config.compute_url));
    let map = Arc::new(RwLock::new(MapSession::new(Box::new(TraceRenderer))));
    let fleet = Arc::new(RwLock::new(FleetRegistry::new()));
    let reporter = StatusReporter::new(sim::STATUS_LINES_SHOWN);

    // No-fly zones are display-only; a failure here never blocks dispatch.
    match compute.fetch_no_fly_zones(plan.map_id).await {
        Ok(zones) => {
            info!("{} no-fly zone(s) fetched", zones.len());
            map.write().await.draw_polygons(&zones);
        }
        Err(e) => warn!("no-fly zones unavailable: {e:#}"),
    }

    let fetcher = PartitionFetcher::new(compute.clone(), fleet.clone(), map.clone());
    let partitions = fetcher
        .refresh(plan.map_id, plan.algorithm, plan.drone_count_exponent)
        .await
        .context("building the drone fleet")?;
    let boundaries: Vec<_> = partitions.iter().map(|p| p.boundary.clone()).collect();
    map.write().await.draw_polygons(&boundaries);

    let document = std::fs::read_to_string(&config.targets_file)
        .with_context(|| format!("reading target file {}", config.targets_file))?;
    let targets = TargetQueue::parse(&document)?;
    info!("{} target(s) queued", targets.len());

    let sequencer = Arc::new(DispatchSequencer::new(
        SequencerConfig {
            map_id: plan.map_id,
            algorithm: plan.algorithm,
            tick: Duration::from_millis(sim::ANIMATION_TICK_MS),
        },
        compute,
        fleet.clone(),
        map.clone(),
        targets,
        reporter,
    ));

    let mut run_task = {
        let sequencer = sequencer.clone();
        tokio::spawn(async move { sequencer.run().await })
    };

    let outcome = tokio::select! {
        result = &mut run_task => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, stopping run");
            sequencer.stop().await;
            run_task.await?
        }
    };

    match outcome {
        Ok(RunOutcome::Completed) => info!("run completed"),
        Ok(RunOutcome::Stopped) => info!("run stopped before completion"),
        Err(e) => {
            error!("run never started: {e}");
            return Err(e.into());
        }
    }

    for event in sequencer.recent_events().await {
        info!("  {}", status::event_line(&event));
    }
    for drone in fleet.read().await.drones() {
        info!("  {}", status::drone_line(drone));
    }

    // Marker teardown at run end
    map.write().await.remove_all_markers();
    Ok(())
}
