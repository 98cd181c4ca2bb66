use crate::game::beats::Beats;
use crate::game::easing::{Easing, cubic_bezier};
use crate::game::timing::BpmList;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

/// RGB triple, channels nominally `0..=255` but kept as floats so
/// interpolated values are not truncated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb(pub [f64; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([255.0, 255.0, 255.0]);
    /// Color of a judge line without color events.
    pub const LINE_DEFAULT: Rgb = Rgb([128.0, 255.0, 128.0]);
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Start/end seconds stamped with the [`BpmList::version`] they came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SecondsCache {
    pub version: u64,
    pub start: f64,
    pub end: f64,
}

impl SecondsCache {
    #[inline(always)]
    pub fn lookup(
        cell: &Cell<Option<SecondsCache>>,
        bpm: &BpmList,
        start: Beats,
        end: Beats,
    ) -> (f64, f64) {
        if let Some(c) = cell.get()
            && c.version == bpm.version()
        {
            return (c.start, c.end);
        }
        let fresh = SecondsCache {
            version: bpm.version(),
            start: bpm.seconds_of_beats(start),
            end: bpm.seconds_of_beats(end),
        };
        cell.set(Some(fresh));
        (fresh.start, fresh.end)
    }
}

/// RPE writes flags as `0`/`1`; hand-edited charts often use booleans.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlagRepr {
    Bool(bool),
    Int(i64),
}

pub(crate) fn de_flag<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match FlagRepr::deserialize(de)? {
        FlagRepr::Bool(b) => b,
        FlagRepr::Int(n) => n != 0,
    })
}

/// `above` is `1` for the upper side and `2` for the lower one.
pub(crate) fn de_side<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match FlagRepr::deserialize(de)? {
        FlagRepr::Bool(b) => b,
        FlagRepr::Int(n) => n == 1,
    })
}

fn default_easing_right() -> f64 {
    1.0
}

fn default_bezier_points() -> [f64; 4] {
    [0.0, 0.0, 1.0, 1.0]
}

/// A timed interpolation segment of one animatable property.
///
/// Time fields are private: every edit goes through a setter so the cached
/// seconds are dropped and `end_time >= start_time` is restored (except while
/// dragging, see [`Event::drag_times`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event<T> {
    start_time: Beats,
    end_time: Beats,
    pub start: T,
    pub end: T,
    #[serde(default)]
    pub easing_type: Easing,
    #[serde(default)]
    pub easing_left: f64,
    #[serde(default = "default_easing_right")]
    pub easing_right: f64,
    #[serde(default, deserialize_with = "de_flag")]
    pub bezier: bool,
    #[serde(default = "default_bezier_points")]
    pub bezier_points: [f64; 4],
    #[serde(skip)]
    cache: Cell<Option<SecondsCache>>,
}

impl<T> Event<T> {
    /// Linear event over `[start_time, end_time]`; swapped if given in reverse.
    pub fn new(start_time: Beats, end_time: Beats, start: T, end: T) -> Self {
        let (start_time, end_time) = ordered(start_time, end_time);
        Self {
            start_time,
            end_time,
            start,
            end,
            easing_type: Easing::Linear,
            easing_left: 0.0,
            easing_right: 1.0,
            bezier: false,
            bezier_points: default_bezier_points(),
            cache: Cell::new(None),
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing_type = easing;
        self
    }

    pub fn with_easing_range(mut self, left: f64, right: f64) -> Self {
        self.easing_left = left;
        self.easing_right = right;
        self
    }

    pub fn with_bezier(mut self, points: [f64; 4]) -> Self {
        self.bezier = true;
        self.bezier_points = points;
        self
    }

    #[inline(always)]
    pub fn start_time(&self) -> Beats {
        self.start_time
    }

    #[inline(always)]
    pub fn end_time(&self) -> Beats {
        self.end_time
    }

    pub fn set_times(&mut self, start_time: Beats, end_time: Beats) {
        (self.start_time, self.end_time) = ordered(start_time, end_time);
        self.cache.set(None);
    }

    /// Applies times mid-drag without restoring the ordering.
    pub fn drag_times(&mut self, start_time: Beats, end_time: Beats) {
        self.start_time = start_time;
        self.end_time = end_time;
        self.cache.set(None);
    }

    /// Finishes a drag, swapping the times if the drag inverted them.
    pub fn end_drag(&mut self) {
        self.set_times(self.start_time, self.end_time);
    }

    #[inline(always)]
    pub fn seconds(&self, bpm: &BpmList) -> (f64, f64) {
        SecondsCache::lookup(&self.cache, bpm, self.start_time, self.end_time)
    }

    #[inline(always)]
    pub fn start_seconds(&self, bpm: &BpmList) -> f64 {
        self.seconds(bpm).0
    }

    #[inline(always)]
    pub fn end_seconds(&self, bpm: &BpmList) -> f64 {
        self.seconds(bpm).1
    }

    /// Eased progress in `[0, 1]` (unclamped) at `seconds`, for an event
    /// spanning `[start_s, end_s]` that has not yet ended.
    fn progress(&self, seconds: f64, start_s: f64, end_s: f64) -> f64 {
        let dx = end_s - start_s;
        if dx <= 0.0 {
            return 0.0;
        }
        let t = (seconds - start_s) / dx;
        if self.bezier {
            return cubic_bezier(self.bezier_points, t);
        }
        // Only the [l, r] slice of the curve is sampled.
        let (l, r) = (self.easing_left, self.easing_right);
        self.easing_type.apply(t * (r - l) + l)
    }
}

#[inline(always)]
fn ordered(a: Beats, b: Beats) -> (Beats, Beats) {
    if b < a { (b, a) } else { (a, b) }
}

/// A value type an [`Event`] can animate.
pub trait EventValue: Clone {
    /// Track value when no event is active.
    fn absent() -> Self;

    fn interpolate(event: &Event<Self>, seconds: f64, bpm: &BpmList) -> Self;
}

impl EventValue for f64 {
    fn absent() -> Self {
        0.0
    }

    fn interpolate(event: &Event<f64>, seconds: f64, bpm: &BpmList) -> f64 {
        let (start_s, end_s) = event.seconds(bpm);
        if seconds >= end_s {
            return event.end;
        }
        event.start + event.progress(seconds, start_s, end_s) * (event.end - event.start)
    }
}

impl EventValue for Rgb {
    fn absent() -> Self {
        Rgb::WHITE
    }

    fn interpolate(event: &Event<Rgb>, seconds: f64, bpm: &BpmList) -> Rgb {
        let (start_s, end_s) = event.seconds(bpm);
        if seconds >= end_s {
            return event.end;
        }
        // Every channel shares the event's timing and easing.
        let p = event.progress(seconds, start_s, end_s);
        let (a, b) = (event.start.0, event.end.0);
        Rgb([
            a[0] + p * (b[0] - a[0]),
            a[1] + p * (b[1] - a[1]),
            a[2] + p * (b[2] - a[2]),
        ])
    }
}

impl EventValue for String {
    fn absent() -> Self {
        String::new()
    }

    /// Typewriter text: only prefix-related strings animate, by slicing the
    /// longer one to an interpolated length. Unrelated strings hold `start`.
    fn interpolate(event: &Event<String>, seconds: f64, bpm: &BpmList) -> String {
        let (start_s, end_s) = event.seconds(bpm);
        if seconds >= end_s {
            return event.end.clone();
        }
        let (start, end) = (&event.start, &event.end);
        let longer = if end.starts_with(start.as_str()) {
            end
        } else if start.starts_with(end.as_str()) {
            start
        } else {
            return start.clone();
        };

        let start_len = start.chars().count() as f64;
        let end_len = end.chars().count() as f64;
        let p = event.progress(seconds, start_s, end_s);
        let len = start_len + p * (end_len - start_len);
        let max = longer.chars().count() as f64;
        let take = if len.is_nan() { 0 } else { len.trunc().clamp(0.0, max) as usize };
        longer.chars().take(take).collect()
    }
}

/// Interpolated value of `event` at `seconds`, or the type's absent value.
#[inline(always)]
pub fn interpolate<T: EventValue>(event: Option<&Event<T>>, seconds: f64, bpm: &BpmList) -> T {
    match event {
        Some(e) => T::interpolate(e, seconds, bpm),
        None => T::absent(),
    }
}

/// The active event of a track: the one whose start is the nearest at or
/// before `seconds`. Whether `seconds` is still inside it does not matter.
pub fn find_last_event<'a, T>(
    events: &'a [Event<T>],
    seconds: f64,
    bpm: &BpmList,
) -> Option<&'a Event<T>> {
    let mut best: Option<(&Event<T>, f64)> = None;
    for e in events {
        let start_s = e.start_seconds(bpm);
        if start_s > seconds {
            continue;
        }
        let gap = seconds - start_s;
        match best {
            Some((_, best_gap)) if gap >= best_gap => {}
            _ => best = Some((e, gap)),
        }
    }
    best.map(|(e, _)| e)
}

/// Value of a whole track at `seconds`.
#[inline(always)]
pub fn track_value<T: EventValue>(events: &[Event<T>], seconds: f64, bpm: &BpmList) -> T {
    interpolate(find_last_event(events, seconds, bpm), seconds, bpm)
}
