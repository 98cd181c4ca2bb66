use judgeline::core::audio::LogSoundPlayer;
use judgeline::core::draw_queue::DrawQueue;
use judgeline::game::chart::Chart;
use judgeline::game::frame::{self, DrawCommand, EngineConfig};
use judgeline::game::judge_line::LineFields;
use judgeline::game::judgment::Judgement;
use judgeline::game::note::NoteType;
use std::cell::RefCell;

const BASIC: &str = include_str!("../demos/basic.json");

fn load() -> Chart {
    let mut chart: Chart = serde_json::from_str(BASIC).expect("demo chart should parse");
    chart.prepare();
    chart
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9
}

#[test]
fn demo_chart_loads() {
    let chart = load();
    assert_eq!(chart.meta.name, "Basic");
    assert_eq!(chart.judge_lines.len(), 2);
    assert_eq!(chart.note_count(), 2);
    assert_eq!(chart.judge_lines[0].event_layers.len(), 1);
    assert!(chart.detect_father_cycles().is_empty());
    // Beat 6 sits two 120 BPM seconds plus two 60 BPM seconds in.
    let hold = chart.note(1, 0).expect("hold exists");
    assert!(close(hold.end_seconds(&chart.bpm_list), 4.0));
}

#[test]
fn child_line_follows_rotated_father() {
    let mut chart = load();
    let root = chart.resolve_judge_line(0, 1.0, LineFields::BASE).expect("line 0");
    assert!(close(root.x.unwrap_or(f64::NAN), 50.0));
    assert!(close(root.angle.unwrap_or(f64::NAN), 90.0));

    let child = chart.resolve_judge_line(1, 1.0, LineFields::all()).expect("line 1");
    assert!(close(child.x.unwrap_or(f64::NAN), 50.0), "got {:?}", child.x);
    assert!(close(child.y.unwrap_or(f64::NAN), -50.0), "got {:?}", child.y);
    assert_eq!(child.angle, Some(0.0), "angles are not inherited");
    let color = child.color.expect("color requested").0;
    assert!(close(color[0], 100.0) && close(color[1], 50.0) && close(color[2], 0.0));
    assert_eq!(child.text.as_deref(), Some("ho"));
}

#[test]
fn frame_pipeline_end_to_end() {
    let mut chart = load();
    let mut sounds = LogSoundPlayer::new();
    let cfg = EngineConfig::default();

    let snapshot = frame::build(&mut chart, 1.0, &cfg, &mut sounds).expect("valid chart");
    assert_eq!(snapshot.hits, 1);
    assert_eq!(sounds.count(NoteType::Tap), 1);
    assert!(close(snapshot.beats, 2.0));
    assert_eq!(chart.classify(0, 0).expect("tap"), Judgement::Perfect);

    let hold = &snapshot.lines[1].notes[0];
    assert!(hold.visible);
    assert!(close(hold.scroll.start_position_y, 10.0));
    assert!(close(hold.scroll.end_position_y, 30.0));

    let out = RefCell::new(Vec::new());
    let failed = {
        let mut queue = DrawQueue::new();
        frame::enqueue_draws(&mut queue, &snapshot, &out).expect("queue is open");
        queue.run()
    };
    assert_eq!(failed, 0);
    let kinds: Vec<&str> = out
        .borrow()
        .iter()
        .map(|c| match c {
            DrawCommand::Line { .. } => "line",
            DrawCommand::Note { note_type, .. } => note_type.as_str(),
            DrawCommand::HitFx { .. } => "fx",
        })
        .collect();
    assert_eq!(kinds, vec!["line", "line", "Hold", "fx"]);

    let json = serde_json::to_string(&snapshot).expect("snapshot serializes");
    assert!(json.contains("\"judgement\":\"perfect\""), "json was {json}");
}

#[test]
fn held_hold_keeps_its_head_on_the_line() {
    let mut chart = load();
    let mut sounds = LogSoundPlayer::new();
    let snapshot =
        frame::build(&mut chart, 3.0, &EngineConfig::default(), &mut sounds).expect("valid chart");
    let hold = snapshot.lines[1].notes.iter().find(|n| n.note_type == NoteType::Hold);
    let hold = hold.expect("hold is still on screen");
    assert!(hold.scroll.start_position_y.abs() <= 1e-9);
    assert!(close(hold.scroll.end_position_y, 10.0));
    assert_eq!(hold.judgement, Judgement::Perfect);
    assert!(!hold.hit_fx.is_empty());
}

#[test]
fn scrubbing_back_rearms_notes() {
    let mut chart = load();
    let mut sounds = LogSoundPlayer::new();
    let cfg = EngineConfig::default();
    frame::build(&mut chart, 5.0, &cfg, &mut sounds).expect("valid chart");
    assert_eq!(sounds.total(), 2);
    let snapshot = frame::build(&mut chart, 0.5, &cfg, &mut sounds).expect("valid chart");
    assert_eq!(snapshot.hits, 0);
    assert!(chart.note(0, 0).expect("tap").hit_seconds.is_none());
    frame::build(&mut chart, 1.0, &cfg, &mut sounds).expect("valid chart");
    assert_eq!(sounds.count(NoteType::Tap), 2);
}
