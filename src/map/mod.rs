//! Map rendering seam
//!
//! The engine never draws anything itself; it narrates marker and polygon
//! changes to a pluggable renderer through the `MapSession` handle. The
//! session tracks which markers it created so teardown at run end removes
//! exactly what the engine put on the map.

use skygrid_shared::LatLng;
use tracing::debug;

/// Drawing operations the engine needs from a map backend
pub trait MapRenderer: Send + Sync {
    /// Create or move the marker for a drone
    fn upsert_marker(&mut self, id: u32, point: LatLng);

    /// Remove a drone marker
    fn remove_marker(&mut self, id: u32);

    /// Draw filled polygon features (partitions, no-fly zones)
    fn draw_polygons(&mut self, features: &[Vec<LatLng>]);

    /// Place a marker for a queued target
    fn place_target(&mut self, target_id: i64, point: LatLng);

    /// Remove every target marker
    fn clear_targets(&mut self);
}

/// Owned handle to the rendering backend for one engine session
pub struct MapSession {
    renderer: Box<dyn MapRenderer>,
    marker_ids: Vec<u32>,
}

impl MapSession {
    pub fn new(renderer: Box<dyn MapRenderer>) -> Self {
        Self {
            renderer,
            marker_ids: Vec::new(),
        }
    }

    pub fn upsert_marker(&mut self, id: u32, point: LatLng) {
        if !self.marker_ids.contains(&id) {
            self.marker_ids.push(id);
        }
        self.renderer.upsert_marker(id, point);
    }

    /// Tear down every drone marker this session created
    pub fn remove_all_markers(&mut self) {
        for id in self.marker_ids.drain(..) {
            self.renderer.remove_marker(id);
        }
    }

    pub fn draw_polygons(&mut self, features: &[Vec<LatLng>]) {
        self.renderer.draw_polygons(features);
    }

    pub fn place_target(&mut self, target_id: i64, point: LatLng) {
        self.renderer.place_target(target_id, point);
    }

    pub fn clear_targets(&mut self) {
        self.renderer.clear_targets();
    }

    pub fn marker_count(&self) -> usize {
        self.marker_ids.len()
    }
}

impl Drop for MapSession {
    fn drop(&mut self) {
        self.remove_all_markers();
    }
}

/// Default renderer: narrates drawing calls to the log
#[derive(Debug, Default)]
pub struct TraceRenderer;

impl MapRenderer for TraceRenderer {
    fn upsert_marker(&mut self, id: u32, point: LatLng) {
        debug!("[MAP] marker {} -> {}", id, point);
    }

    fn remove_marker(&mut self, id: u32) {
        debug!("[MAP] marker {} removed", id);
    }

    fn draw_polygons(&mut self, features: &[Vec<LatLng>]) {
        debug!("[MAP] {} polygon(s) drawn", features.len());
    }

    fn place_target(&mut self, target_id: i64, point: LatLng) {
        debug!("[MAP] target {} -> {}", target_id, point);
    }

    fn clear_targets(&mut self) {
        debug!("[MAP] target markers cleared");
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records renderer calls for assertions
    #[derive(Debug, Default, Clone)]
    pub struct RecordingRenderer {
        pub calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingRenderer {
        pub fn log(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MapRenderer for RecordingRenderer {
        fn upsert_marker(&mut self, id: u32, point: LatLng) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("upsert {} {}", id, point));
        }

        fn remove_marker(&mut self, id: u32) {
            self.calls.lock().unwrap().push(format!("remove {}", id));
        }

        fn draw_polygons(&mut self, features: &[Vec<LatLng>]) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("polygons {}", features.len()));
        }

        fn place_target(&mut self, target_id: i64, point: LatLng) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("target {} {}", target_id, point));
        }

        fn clear_targets(&mut self) {
            self.calls.lock().unwrap().push("clear-targets".into());
        }
    }
}
