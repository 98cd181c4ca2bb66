use crate::game::event::{Event, EventValue};
use crate::game::judge_line::JudgeLine;
use crate::game::note::{Note, NoteType};
use crate::game::timing::BpmList;
use serde::Serialize;

/// Signed distances of a note's head and tail from its judge line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollPosition {
    pub start_position_y: f64,
    pub end_position_y: f64,
    /// The note sits behind a covering line and must not be drawn.
    pub is_covered: bool,
}

#[inline(always)]
fn trapezoid(a: f64, b: f64, h: f64) -> f64 {
    (a + b) * h / 2.0
}

/// Area under one layer's speed curve over `[l, r]` (`l <= r`).
///
/// Each event contributes its ramp, approximated as a trapezoid between the
/// speeds at the overlap's ends, plus a flat stretch at `end` until the next
/// event starts (forever for the last one). `events` must be sorted by start.
pub fn speed_area(events: &[Event<f64>], l: f64, r: f64, bpm: &BpmList) -> f64 {
    let speed_at = |e: &Event<f64>, t: f64| f64::interpolate(e, t, bpm);
    let mut area = 0.0;

    for (i, cur) in events.iter().enumerate() {
        let (cs, ce) = cur.seconds(bpm);
        let ns = events.get(i + 1).map_or(f64::INFINITY, |n| n.start_seconds(bpm));

        // Ramp [cs, ce].
        if l <= cs && ce <= r {
            area += trapezoid(cur.start, cur.end, ce - cs);
        } else if cs <= l && r <= ce {
            area += trapezoid(speed_at(cur, l), speed_at(cur, r), r - l);
        } else if l < cs && cs < r && r < ce {
            area += trapezoid(cur.start, speed_at(cur, r), r - cs);
        } else if cs < l && l < ce && ce < r {
            area += trapezoid(speed_at(cur, l), cur.end, ce - l);
        }

        // Hold at `end` over [ce, ns].
        if l <= ce && ns <= r {
            area += cur.end * (ns - ce);
        } else if ce <= l && r <= ns {
            area += cur.end * (r - l);
        } else if l < ce && ce < r && r < ns {
            area += cur.end * (r - ce);
        } else if ce < l && l < ns && ns < r {
            area += cur.end * (ns - l);
        }
    }

    area
}

/// Scroll offsets of `note` on `line` at `seconds`.
///
/// Distances are the integral of the line's speed (summed over its layers)
/// between `seconds` and the note's start/end, scaled by `chart_speed`.
/// A Hold whose head has been passed keeps its head on the line; only the
/// tail keeps travelling.
pub fn note_scroll(
    line: &JudgeLine,
    note: &Note,
    seconds: f64,
    bpm: &BpmList,
    chart_speed: f64,
) -> ScrollPosition {
    let (start_s, end_s) = note.seconds(bpm);
    let head_frozen = note.note_type() == NoteType::Hold && start_s < seconds;

    let mut start_y = 0.0;
    let mut end_y = 0.0;
    for layer in &line.event_layers {
        let events = &layer.speed_events;
        if !head_frozen {
            start_y += speed_area(events, seconds.min(start_s), seconds.max(start_s), bpm);
        }
        end_y += speed_area(events, seconds.min(end_s), seconds.max(end_s), bpm);
    }

    start_y *= chart_speed;
    end_y *= chart_speed;
    if seconds >= start_s {
        start_y = -start_y;
    }
    if seconds >= end_s {
        end_y = -end_y;
    }
    let side = if note.above { 1.0 } else { -1.0 };
    start_y = start_y * note.speed * side + note.y_offset;
    end_y = end_y * note.speed * side + note.y_offset;

    ScrollPosition {
        start_position_y: start_y,
        end_position_y: end_y,
        is_covered: end_y < 0.0 && line.is_cover && seconds < end_s,
    }
}
