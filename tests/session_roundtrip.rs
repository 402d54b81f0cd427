//! Integration test: timeline → session JSON on disk → timeline.

use std::fs;

use sn_engine::{Segment, SynthConfig, Timeline};
use sn_formats::{read_timeline, write_timeline, FormatError};
use sn_master::{Controller, RenderConfig};

fn authored() -> Timeline {
    let mut timeline = Timeline::new();
    for (text, start, end) in [("sin(3t)+1", -4, 4), ("|t| % 5", 0, 12), ("2^(t/3)", -1, 2)] {
        let expr = sn_formats::parse_function(text).unwrap();
        timeline.push(Segment::new(text, expr, start, end).unwrap()).unwrap();
    }
    timeline
}

fn windows(timeline: &Timeline) -> Vec<(String, i32, i32)> {
    timeline
        .iter()
        .map(|(_, s)| (s.text().to_string(), s.start_time(), s.end_time()))
        .collect()
}

#[test]
fn session_file_round_trip() {
    let original = authored();
    let path = std::env::temp_dir().join(format!("sonify-roundtrip-{}.json", std::process::id()));
    fs::write(&path, write_timeline(&original).unwrap()).unwrap();

    let json = fs::read_to_string(&path).unwrap();
    let _ = fs::remove_file(&path);
    let loaded = read_timeline(&json, SynthConfig::default()).unwrap();

    assert_eq!(windows(&loaded), windows(&original));
    assert_eq!(loaded.run_time(), original.run_time());
    for ((_, a), (_, b)) in original.iter().zip(loaded.iter()) {
        assert_eq!(a.expr(), b.expr());
        assert_eq!(a.preview(), b.preview());
    }
}

#[test]
fn edits_survive_save_and_load() {
    let mut timeline = authored();
    let last = timeline.key_at(2).unwrap();
    timeline.move_to(last, 0).unwrap();
    timeline.set_window(last, 3, 4).unwrap();
    let middle = timeline.key_at(1).unwrap();
    timeline.remove(middle).unwrap();

    let loaded = read_timeline(&write_timeline(&timeline).unwrap(), SynthConfig::default()).unwrap();
    assert_eq!(
        windows(&loaded),
        [("2^(t/3)".to_string(), 3, 4), ("|t| % 5".to_string(), 0, 12)]
    );
}

#[test]
fn controller_renders_loaded_session() {
    let mut ctrl = Controller::new();
    ctrl.load_session(&write_timeline(&authored()).unwrap()).unwrap();
    let config = RenderConfig {
        sample_rate: 2000,
        // Room for every fade, so no segment is cut short.
        buffer_seconds: 1.0,
        ..RenderConfig::default()
    };
    let frames = ctrl.render_frames(&config).unwrap();
    // 23 s of content plus a fade-in and fade-out per segment
    assert_eq!(frames.len(), 23 * 2000 + 3 * 2 * 100);
    assert!(frames.iter().any(|f| !f.is_silent()));

    let (rate, decoded) = sn_formats::read_wav(&mut std::io::Cursor::new(ctrl.render_to_wav(&config).unwrap())).unwrap();
    assert_eq!(rate, 2000);
    assert_eq!(decoded.len(), frames.len());
}

#[test]
fn hand_written_session_with_bad_function_fails() {
    let json = r#"{"LowerTimeline": {"Count": 1, "Functions": {
        "0": {"TextRepresentation": "sin(", "StartTime": 0, "EndTime": 1}}}}"#;
    let mut ctrl = Controller::new();
    let err = ctrl.load_session(json).unwrap_err();
    assert!(matches!(err, sn_master::MasterError::Format(FormatError::Parse { index: 0, .. })));
    assert!(ctrl.timeline().is_empty());
}
