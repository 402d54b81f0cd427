//! Session persistence.
//!
//! A saved session holds the text and window of every function on the
//! timeline, in playback order:
//!
//! ```json
//! { "LowerTimeline": { "Count": 2, "Functions": {
//!     "0": { "TextRepresentation": "t", "StartTime": 0, "EndTime": 5 },
//!     "1": { "TextRepresentation": "t^2", "StartTime": 5, "EndTime": 10 } } } }
//! ```
//!
//! Expression trees are never stored; loading re-parses every text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sn_engine::{Segment, SynthConfig, Timeline};

use crate::parser::parse_function;
use crate::FormatError;

/// Top-level session document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionFile {
    pub lower_timeline: TimelineRecord,
}

/// The timeline: a count and the functions keyed by playback index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TimelineRecord {
    pub count: usize,
    pub functions: BTreeMap<usize, FunctionRecord>,
}

/// One function as the user authored it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FunctionRecord {
    pub text_representation: String,
    pub start_time: i32,
    pub end_time: i32,
}

impl FunctionRecord {
    pub fn new(text: &str, start_time: i32, end_time: i32) -> Self {
        Self {
            text_representation: text.to_string(),
            start_time,
            end_time,
        }
    }

    pub fn from_segment(segment: &Segment) -> Self {
        Self::new(segment.text(), segment.start_time(), segment.end_time())
    }
}

impl SessionFile {
    /// Build a session from records in playback order.
    pub fn from_records(records: impl IntoIterator<Item = FunctionRecord>) -> Self {
        let functions: BTreeMap<usize, FunctionRecord> = records.into_iter().enumerate().collect();
        Self {
            lower_timeline: TimelineRecord {
                count: functions.len(),
                functions,
            },
        }
    }

    /// Snapshot a timeline.
    pub fn from_timeline(timeline: &Timeline) -> Self {
        Self::from_records(timeline.iter().map(|(_, segment)| FunctionRecord::from_segment(segment)))
    }

    /// Records in playback order; fails if any index below `Count` is absent.
    pub fn records(&self) -> Result<Vec<&FunctionRecord>, FormatError> {
        let timeline = &self.lower_timeline;
        if timeline.functions.len() > timeline.count {
            tracing::warn!(
                count = timeline.count,
                stored = timeline.functions.len(),
                "session has functions beyond its count; ignoring them"
            );
        }
        (0..timeline.count)
            .map(|index| {
                timeline
                    .functions
                    .get(&index)
                    .ok_or(FormatError::MissingFunction { index })
            })
            .collect()
    }

    /// Parse every function and build a timeline from them.
    pub fn to_timeline(&self, config: SynthConfig) -> Result<Timeline, FormatError> {
        let mut timeline = Timeline::new();
        for (index, record) in self.records()?.into_iter().enumerate() {
            let expr = parse_function(&record.text_representation)
                .map_err(|source| FormatError::Parse { index, source })?;
            let segment = Segment::with_config(
                &record.text_representation,
                expr,
                record.start_time,
                record.end_time,
                config,
            )
            .map_err(|source| FormatError::Segment { index, source })?;
            timeline.push(segment)?;
        }
        tracing::debug!(segments = timeline.len(), run_time = timeline.run_time(), "session loaded");
        Ok(timeline)
    }
}

pub fn load_session(json: &str) -> Result<SessionFile, FormatError> {
    Ok(serde_json::from_str(json)?)
}

pub fn save_session(session: &SessionFile) -> Result<String, FormatError> {
    Ok(serde_json::to_string_pretty(session)?)
}

/// Parse a session document straight into a playable timeline.
pub fn read_timeline(json: &str, config: SynthConfig) -> Result<Timeline, FormatError> {
    load_session(json)?.to_timeline(config)
}

pub fn write_timeline(timeline: &Timeline) -> Result<String, FormatError> {
    save_session(&SessionFile::from_timeline(timeline))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVED: &str = r#"{
        "LowerTimeline": {
            "Count": 2,
            "Functions": {
                "0": { "TextRepresentation": "t", "StartTime": 0, "EndTime": 5 },
                "1": { "TextRepresentation": "t^2", "StartTime": 5, "EndTime": 10 }
            }
        }
    }"#;

    #[test]
    fn load_builds_timeline_in_order() {
        let timeline = read_timeline(SAVED, SynthConfig::default()).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.run_time(), 10);
        let texts: Vec<_> = timeline.iter().map(|(_, s)| s.text()).collect();
        assert_eq!(texts, ["t", "t^2"]);
    }

    #[test]
    fn numeric_keys_sort_numerically() {
        let records = (0..12).map(|i| FunctionRecord::new(&format!("{}", i), 0, 1));
        let json = save_session(&SessionFile::from_records(records)).unwrap();
        let timeline = read_timeline(&json, SynthConfig::default()).unwrap();
        let texts: Vec<_> = timeline.iter().map(|(_, s)| s.text().to_string()).collect();
        assert_eq!(texts[2], "2");
        assert_eq!(texts[10], "10");
    }

    #[test]
    fn saved_json_uses_pascal_case_and_string_keys() {
        let session = SessionFile::from_records([FunctionRecord::new("sin(3t)+1", -2, 3)]);
        let value: serde_json::Value = serde_json::from_str(&save_session(&session).unwrap()).unwrap();
        assert_eq!(value["LowerTimeline"]["Count"], 1);
        assert_eq!(value["LowerTimeline"]["Functions"]["0"]["TextRepresentation"], "sin(3t)+1");
        assert_eq!(value["LowerTimeline"]["Functions"]["0"]["StartTime"], -2);
        assert_eq!(value["LowerTimeline"]["Functions"]["0"]["EndTime"], 3);
    }

    #[test]
    fn parse_error_reports_function_index() {
        let json = SAVED.replace("t^2", "t^");
        match read_timeline(&json, SynthConfig::default()) {
            Err(FormatError::Parse { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected parse error, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn unknown_variable_is_rejected() {
        let json = SAVED.replace("\"t\"", "\"x\"");
        assert!(matches!(
            read_timeline(&json, SynthConfig::default()),
            Err(FormatError::Parse { index: 0, .. })
        ));
    }

    #[test]
    fn invalid_window_is_rejected() {
        let json = SAVED.replace("\"EndTime\": 10", "\"EndTime\": 5");
        assert!(matches!(
            read_timeline(&json, SynthConfig::default()),
            Err(FormatError::Segment { index: 1, .. })
        ));
    }

    #[test]
    fn missing_index_is_rejected() {
        let json = SAVED.replace("\"Count\": 2", "\"Count\": 3");
        assert!(matches!(
            read_timeline(&json, SynthConfig::default()),
            Err(FormatError::MissingFunction { index: 2 })
        ));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(load_session("{"), Err(FormatError::Json(_))));
    }
}
