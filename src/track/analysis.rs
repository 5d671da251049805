use serde::Deserialize;
use serde_json::Value;

use crate::track::error::TrackDataError;

/// Top-level field every audio analysis document must carry.
pub const ANALYSIS_MARKER: &str = "track";

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisTrack {
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub tempo: f64,
    #[serde(default)]
    pub loudness: f64,
    #[serde(default = "unknown_key")]
    pub key: i32,
    #[serde(default)]
    pub mode: i32,
    #[serde(default)]
    pub time_signature: u32,
}

fn unknown_key() -> i32 {
    -1
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimeInterval {
    pub start: f64,
    pub duration: f64,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Section {
    pub start: f64,
    pub duration: f64,
    #[serde(default)]
    pub loudness: f64,
    #[serde(default)]
    pub tempo: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub duration: f64,
    #[serde(default)]
    pub loudness_max: f64,
    #[serde(default)]
    pub pitches: Vec<f64>,
    #[serde(default)]
    pub timbre: Vec<f64>,
}

/// Precomputed analysis of the playing track.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AudioAnalysis {
    pub track: AnalysisTrack,
    #[serde(default)]
    pub bars: Vec<TimeInterval>,
    #[serde(default)]
    pub beats: Vec<TimeInterval>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

impl AudioAnalysis {
    /// Validates a fetched document against the analysis schema.
    pub fn from_value(value: Value) -> Result<Self, TrackDataError> {
        let Some(object) = value.as_object() else {
            return Err(TrackDataError::AnalysisMalformed(
                "analysis is not an object".to_string(),
            ));
        };
        if !object.contains_key(ANALYSIS_MARKER) {
            return Err(TrackDataError::AnalysisMalformed(format!(
                "missing `{}` field",
                ANALYSIS_MARKER
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| TrackDataError::AnalysisMalformed(e.to_string()))
    }

    /// Musical key such as `"F# minor"`, if the analysis determined one.
    pub fn key_name(&self) -> Option<String> {
        let pitch = PITCH_CLASSES.get(usize::try_from(self.track.key).ok()?)?;
        let mode = if self.track.mode == 1 { "major" } else { "minor" };
        Some(format!("{} {}", pitch, mode))
    }

    /// Index of the beat containing `seconds`.
    pub fn beat_at(&self, seconds: f64) -> Option<usize> {
        self.beats
            .iter()
            .position(|b| seconds >= b.start && seconds < b.start + b.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_document_with_marker() {
        let analysis = AudioAnalysis::from_value(json!({
            "track": { "duration": 200.5, "tempo": 120.0, "key": 6, "mode": 0 },
            "beats": [
                { "start": 0.0, "duration": 0.5, "confidence": 0.9 },
                { "start": 0.5, "duration": 0.5 }
            ]
        }))
        .unwrap();

        assert_eq!(analysis.track.tempo, 120.0);
        assert_eq!(analysis.key_name().as_deref(), Some("F# minor"));
        assert_eq!(analysis.beat_at(0.7), Some(1));
        assert_eq!(analysis.beat_at(3.0), None);
    }

    #[test]
    fn marker_only_is_enough() {
        let analysis = AudioAnalysis::from_value(json!({ "track": {} })).unwrap();
        assert!(analysis.segments.is_empty());
        assert_eq!(analysis.key_name(), None);
    }

    #[test]
    fn rejects_missing_marker() {
        let err = AudioAnalysis::from_value(json!({ "meta": {} })).unwrap_err();
        assert!(matches!(err, TrackDataError::AnalysisMalformed(_)));
    }

    #[test]
    fn rejects_non_objects() {
        for value in [json!(null), json!("track"), json!([{ "track": {} }])] {
            assert!(matches!(
                AudioAnalysis::from_value(value),
                Err(TrackDataError::AnalysisMalformed(_))
            ));
        }
    }

    #[test]
    fn rejects_wrong_shapes() {
        assert!(AudioAnalysis::from_value(json!({ "track": 5 })).is_err());
    }
}
