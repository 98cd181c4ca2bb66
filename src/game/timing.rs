use crate::game::beats::Beats;
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

pub const FALLBACK_BPM: f64 = 120.0;

// Versions are unique across every list in the process so a cache stamped by
// one chart's timeline can never validate against another's.
static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

#[inline(always)]
fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, AtomicOrdering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BpmSegment {
    pub bpm: f64,
    pub start_time: Beats,
}

impl BpmSegment {
    pub fn new(bpm: f64, start_time: Beats) -> Self {
        Self { bpm, start_time }
    }
}

#[derive(Debug, Clone, Default, Copy)]
struct BeatTimePoint {
    beat: f64,
    time_sec: f64,
    bpm: f64,
}

/// Tempo timeline of a chart.
///
/// Segments stay sorted by start beat. Every mutation rebuilds the
/// beat-to-seconds table and stamps a new [`BpmList::version`], which is what
/// event and note second-caches are validated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<BpmSegment>", into = "Vec<BpmSegment>")]
pub struct BpmList {
    segments: Vec<BpmSegment>,
    beat_to_time: Vec<BeatTimePoint>,
    version: u64,
}

impl Default for BpmList {
    fn default() -> Self {
        Self::constant(FALLBACK_BPM)
    }
}

impl From<Vec<BpmSegment>> for BpmList {
    fn from(segments: Vec<BpmSegment>) -> Self {
        Self::new(segments)
    }
}

impl From<BpmList> for Vec<BpmSegment> {
    fn from(list: BpmList) -> Self {
        list.segments
    }
}

impl BpmList {
    pub fn new(segments: Vec<BpmSegment>) -> Self {
        let mut list = Self { segments, beat_to_time: Vec::new(), version: 0 };
        list.rebuild();
        list
    }

    pub fn constant(bpm: f64) -> Self {
        Self::new(vec![BpmSegment::new(bpm, Beats::ZERO)])
    }

    #[inline(always)]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline(always)]
    pub fn segments(&self) -> &[BpmSegment] {
        &self.segments
    }

    pub fn push(&mut self, segment: BpmSegment) {
        self.segments.push(segment);
        self.rebuild();
    }

    pub fn remove(&mut self, index: usize) -> Option<BpmSegment> {
        if index >= self.segments.len() {
            return None;
        }
        let removed = self.segments.remove(index);
        self.rebuild();
        Some(removed)
    }

    pub fn set_bpm(&mut self, index: usize, bpm: f64) -> bool {
        let Some(seg) = self.segments.get_mut(index) else {
            return false;
        };
        seg.bpm = bpm;
        self.rebuild();
        true
    }

    pub fn set_start_time(&mut self, index: usize, start_time: Beats) -> bool {
        let Some(seg) = self.segments.get_mut(index) else {
            return false;
        };
        seg.start_time = start_time;
        self.rebuild();
        true
    }

    pub fn replace(&mut self, segments: Vec<BpmSegment>) {
        self.segments = segments;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        if self.segments.is_empty() {
            warn!("Empty BPM list; falling back to a single {FALLBACK_BPM} BPM segment.");
            self.segments.push(BpmSegment::new(FALLBACK_BPM, Beats::ZERO));
        }
        self.segments.sort_by(|a, b| a.start_time.cmp(&b.start_time));

        let mut beat_to_time = Vec::with_capacity(self.segments.len());
        let mut current_time = 0.0;
        let first = self.segments[0];
        let mut last_beat = first.start_time.value();
        let mut last_bpm = first.bpm;
        for seg in &self.segments {
            let beat = seg.start_time.value();
            if beat > last_beat {
                current_time += (beat - last_beat) / last_bpm * 60.0;
            }
            beat_to_time.push(BeatTimePoint { beat, time_sec: current_time, bpm: seg.bpm });
            last_beat = beat;
            last_bpm = seg.bpm;
        }
        self.beat_to_time = beat_to_time;
        self.version = next_version();
    }

    #[inline(always)]
    fn point_for_beat(&self, beat: f64) -> BeatTimePoint {
        let idx = self.beat_to_time.partition_point(|p| p.beat <= beat);
        self.beat_to_time[idx.saturating_sub(1)]
    }

    #[inline(always)]
    fn point_for_time(&self, time_sec: f64) -> BeatTimePoint {
        let idx = self.beat_to_time.partition_point(|p| p.time_sec <= time_sec);
        self.beat_to_time[idx.saturating_sub(1)]
    }

    /// Seconds elapsed from beat 0 to `beats`: each segment's tempo applies
    /// from its own start until the next segment's start.
    #[inline(always)]
    pub fn seconds_of(&self, beats: f64) -> f64 {
        let p = self.point_for_beat(beats);
        p.time_sec + (beats - p.beat) / p.bpm * 60.0
    }

    /// Inverse of [`BpmList::seconds_of`], as an unreduced beat value.
    #[inline(always)]
    pub fn beats_of(&self, seconds: f64) -> f64 {
        let p = self.point_for_time(seconds);
        p.beat + (seconds - p.time_sec) * p.bpm / 60.0
    }

    #[inline(always)]
    pub fn seconds_of_beats(&self, beats: Beats) -> f64 {
        self.seconds_of(beats.value())
    }

    pub fn beats_at(&self, seconds: f64, denominator: i32) -> Beats {
        Beats::from_value(self.beats_of(seconds), denominator)
    }

    pub fn bpm_at(&self, beats: f64) -> f64 {
        self.point_for_beat(beats).bpm
    }
}

#[cfg(test)]
mod tests {
    use super::{BpmList, BpmSegment};
    use crate::game::beats::Beats;
    use proptest::prelude::*;

    fn multi_segment() -> BpmList {
        BpmList::new(vec![
            BpmSegment::new(180.0, Beats::from_whole(8)),
            BpmSegment::new(120.0, Beats::ZERO),
            BpmSegment::new(90.0, Beats::new(16, 1, 2)),
        ])
    }

    #[test]
    fn single_segment_at_120_bpm() {
        let bpm = BpmList::constant(120.0);
        assert_eq!(bpm.seconds_of_beats(Beats::new(0, 0, 1)), 0.0);
        assert!((bpm.seconds_of_beats(Beats::new(1, 0, 1)) - 0.5).abs() <= 1e-12);
    }

    #[test]
    fn segments_are_sorted_and_walked_piecewise() {
        let bpm = multi_segment();
        let starts: Vec<f64> = bpm.segments().iter().map(|s| s.start_time.value()).collect();
        assert_eq!(starts, vec![0.0, 8.0, 16.5]);
        // 8 beats at 120 = 4s, then 4 beats at 180 = 4/3s.
        let s = bpm.seconds_of(12.0);
        assert!((s - (4.0 + 4.0 / 3.0)).abs() <= 1e-9, "got {s}");
        // 8.5 beats at 180 then 1 beat at 90.
        let s = bpm.seconds_of(17.5);
        let expected = 4.0 + 8.5 / 180.0 * 60.0 + 1.0 / 90.0 * 60.0;
        assert!((s - expected).abs() <= 1e-9, "got {s}, expected {expected}");
        assert_eq!(bpm.bpm_at(10.0), 180.0);
    }

    #[test]
    fn negative_beats_extrapolate_with_first_tempo() {
        let bpm = multi_segment();
        assert!((bpm.seconds_of(-2.0) + 1.0).abs() <= 1e-12);
        assert!((bpm.beats_of(-1.0) + 2.0).abs() <= 1e-12);
    }

    #[test]
    fn every_mutation_bumps_version() {
        let mut bpm = BpmList::constant(120.0);
        let v0 = bpm.version();
        bpm.push(BpmSegment::new(240.0, Beats::from_whole(4)));
        let v1 = bpm.version();
        assert_ne!(v0, v1);
        assert!(bpm.set_bpm(1, 60.0));
        assert_ne!(v1, bpm.version());
        assert!(!bpm.set_bpm(7, 60.0), "out-of-range edits are rejected");
        assert!((bpm.seconds_of(5.0) - 3.0).abs() <= 1e-12);
    }

    #[test]
    fn empty_list_falls_back_to_default_tempo() {
        let bpm = BpmList::new(Vec::new());
        assert_eq!(bpm.segments().len(), 1);
        assert!((bpm.seconds_of(2.0) - 1.0).abs() <= 1e-12);
    }

    #[test]
    fn beats_at_reduces_onto_grid() {
        let bpm = BpmList::constant(120.0);
        assert_eq!(bpm.beats_at(0.625, 4), Beats::new(1, 1, 4));
    }

    proptest! {
        #[test]
        fn beats_round_trip_through_seconds(
            tempos in prop::collection::vec((1u32..64, 30.0f64..400.0), 1..6),
            beat in 0.0f64..512.0,
        ) {
            let mut start = 0;
            let mut segments = vec![BpmSegment::new(tempos[0].1, Beats::ZERO)];
            for &(gap, bpm) in &tempos[1..] {
                start += gap as i32;
                segments.push(BpmSegment::new(bpm, Beats::from_whole(start)));
            }
            let list = BpmList::new(segments);
            let back = list.beats_of(list.seconds_of(beat));
            prop_assert!((back - beat).abs() <= 1e-9 * beat.max(1.0), "beat={beat} back={back}");
        }
    }
}
