//! Target queue parsing
//!
//! Targets arrive as an externally supplied JSON document with a single
//! `targets` field. The queue is immutable once parsed and is consumed
//! strictly in order by the dispatch sequencer.

use crate::{EngineError, Target};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TargetDocument {
    targets: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
struct RawTarget {
    id: i64,
    lat: f64,
    lng: f64,
}

/// An ordered, validated queue of response targets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetQueue {
    targets: Vec<Target>,
}

impl TargetQueue {
    /// Parse and validate a target document.
    ///
    /// Fails with `MalformedTargetFile` on a missing `targets` field, an
    /// empty list, or out-of-range coordinates. A failed parse produces no
    /// queue, so a previously installed queue is never disturbed.
    pub fn parse(document: &str) -> Result<Self, EngineError> {
        let doc: TargetDocument = serde_json::from_str(document)
            .map_err(|e| EngineError::MalformedTargetFile(e.to_string()))?;

        if doc.targets.is_empty() {
            return Err(EngineError::MalformedTargetFile(
                "target list is empty".into(),
            ));
        }

        let mut targets = Vec::with_capacity(doc.targets.len());
        for raw in doc.targets {
            if !(-90.0..=90.0).contains(&raw.lat) {
                return Err(EngineError::MalformedTargetFile(format!(
                    "target {} latitude {} outside [-90, 90]",
                    raw.id, raw.lat
                )));
            }
            if !(-180.0..=180.0).contains(&raw.lng) {
                return Err(EngineError::MalformedTargetFile(format!(
                    "target {} longitude {} outside [-180, 180]",
                    raw.id, raw.lng
                )));
            }
            targets.push(Target {
                id: raw.id,
                lat: raw.lat,
                lng: raw.lng,
            });
        }

        Ok(Self { targets })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Target> {
        self.targets.get(index)
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "targets": [
            {"id": 1, "lat": 42.03, "lng": -93.62},
            {"id": 2, "lat": 42.05, "lng": -93.65}
        ]
    }"#;

    #[test]
    fn test_parse_preserves_order() {
        let queue = TargetQueue::parse(VALID).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.get(0).unwrap().id, 1);
        assert_eq!(queue.get(1).unwrap().id, 2);
        assert_eq!(queue.get(0).unwrap().lng, -93.62);
    }

    #[test]
    fn test_missing_targets_field_rejected() {
        let result = TargetQueue::parse(r#"{"points": []}"#);
        assert!(matches!(result, Err(EngineError::MalformedTargetFile(_))));
    }

    #[test]
    fn test_empty_list_rejected() {
        let result = TargetQueue::parse(r#"{"targets": []}"#);
        assert!(matches!(result, Err(EngineError::MalformedTargetFile(_))));
    }

    #[test]
    fn test_out_of_range_latitude_rejected() {
        let result =
            TargetQueue::parse(r#"{"targets": [{"id": 1, "lat": 91.0, "lng": 0.0}]}"#);
        assert!(matches!(result, Err(EngineError::MalformedTargetFile(_))));
    }

    #[test]
    fn test_out_of_range_longitude_rejected() {
        let result =
            TargetQueue::parse(r#"{"targets": [{"id": 1, "lat": 0.0, "lng": -181.0}]}"#);
        assert!(matches!(result, Err(EngineError::MalformedTargetFile(_))));
    }

    #[test]
    fn test_non_integer_id_rejected() {
        let result =
            TargetQueue::parse(r#"{"targets": [{"id": 1.5, "lat": 0.0, "lng": 0.0}]}"#);
        assert!(matches!(result, Err(EngineError::MalformedTargetFile(_))));
    }

    #[test]
    fn test_failed_parse_leaves_previous_queue_untouched() {
        let installed = TargetQueue::parse(VALID).unwrap();
        let result = TargetQueue::parse(r#"{"targets": "not a list"}"#);
        assert!(result.is_err());
        // The previously parsed queue is a separate value; a failed parse
        // cannot reach it.
        assert_eq!(installed.len(), 2);
    }
}
