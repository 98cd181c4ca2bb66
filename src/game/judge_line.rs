use crate::game::event::{Event, Rgb, de_flag, find_last_event, interpolate, track_value};
use crate::game::note::Note;
use crate::game::timing::BpmList;
use bitflags::bitflags;
use glam::DVec2;
use log::warn;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One additive layer of a line's base motion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseLayer {
    pub move_x_events: Vec<Event<f64>>,
    pub move_y_events: Vec<Event<f64>>,
    pub rotate_events: Vec<Event<f64>>,
    pub alpha_events: Vec<Event<f64>>,
    pub speed_events: Vec<Event<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseTrack {
    MoveX,
    MoveY,
    Rotate,
    Alpha,
    Speed,
}

impl BaseLayer {
    #[inline(always)]
    pub fn track(&self, track: BaseTrack) -> &[Event<f64>] {
        match track {
            BaseTrack::MoveX => &self.move_x_events,
            BaseTrack::MoveY => &self.move_y_events,
            BaseTrack::Rotate => &self.rotate_events,
            BaseTrack::Alpha => &self.alpha_events,
            BaseTrack::Speed => &self.speed_events,
        }
    }

    pub(crate) fn tracks_mut(&mut self) -> [&mut Vec<Event<f64>>; 5] {
        [
            &mut self.move_x_events,
            &mut self.move_y_events,
            &mut self.rotate_events,
            &mut self.alpha_events,
            &mut self.speed_events,
        ]
    }
}

/// Per-line tracks that are never layered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedLayer {
    pub scale_x_events: Vec<Event<f64>>,
    pub scale_y_events: Vec<Event<f64>>,
    pub color_events: Vec<Event<Rgb>>,
    pub paint_events: Vec<Event<f64>>,
    pub text_events: Vec<Event<String>>,
}

fn default_father() -> i32 {
    -1
}

fn default_is_cover() -> bool {
    true
}

fn default_texture() -> String {
    "line.png".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeLine {
    #[serde(rename = "Name", default)]
    pub name: String,
    /// Index of the parent line, -1 for none.
    #[serde(default = "default_father")]
    pub father: i32,
    #[serde(default)]
    pub z_order: i32,
    #[serde(default = "default_is_cover", deserialize_with = "de_flag")]
    pub is_cover: bool,
    #[serde(rename = "Texture", default = "default_texture")]
    pub texture_name: String,
    #[serde(default, deserialize_with = "de_layers")]
    pub event_layers: Vec<BaseLayer>,
    #[serde(default)]
    pub extended: ExtendedLayer,
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// Unused layer slots are written as `null`.
fn de_layers<'de, D>(de: D) -> Result<Vec<BaseLayer>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let layers: Vec<Option<BaseLayer>> = Deserialize::deserialize(de)?;
    Ok(layers.into_iter().flatten().collect())
}

impl Default for JudgeLine {
    fn default() -> Self {
        Self {
            name: String::new(),
            father: -1,
            z_order: 0,
            is_cover: true,
            texture_name: default_texture(),
            event_layers: vec![BaseLayer::default()],
            extended: ExtendedLayer::default(),
            notes: Vec::new(),
        }
    }
}

impl JudgeLine {
    /// Sum of one base track over every layer of the line.
    pub fn sum_track(&self, track: BaseTrack, seconds: f64, bpm: &BpmList) -> f64 {
        self.event_layers
            .iter()
            .map(|layer| track_value(layer.track(track), seconds, bpm))
            .sum()
    }

    /// Sorts every event track by start beat.
    pub(crate) fn sort_events(&mut self) {
        for layer in &mut self.event_layers {
            for track in layer.tracks_mut() {
                track.sort_by_key(|e| e.start_time());
            }
        }
        let ext = &mut self.extended;
        ext.scale_x_events.sort_by_key(|e| e.start_time());
        ext.scale_y_events.sort_by_key(|e| e.start_time());
        ext.color_events.sort_by_key(|e| e.start_time());
        ext.paint_events.sort_by_key(|e| e.start_time());
        ext.text_events.sort_by_key(|e| e.start_time());
    }

    pub fn event_count(&self) -> usize {
        let base: usize = self
            .event_layers
            .iter()
            .map(|l| BaseTrack::ALL.iter().map(|&t| l.track(t).len()).sum::<usize>())
            .sum();
        let ext = &self.extended;
        base + ext.scale_x_events.len()
            + ext.scale_y_events.len()
            + ext.color_events.len()
            + ext.paint_events.len()
            + ext.text_events.len()
    }

    #[inline(always)]
    fn father_index(&self, line_count: usize) -> Option<usize> {
        usize::try_from(self.father).ok().filter(|&f| f < line_count)
    }
}

impl BaseTrack {
    pub const ALL: [BaseTrack; 5] =
        [Self::MoveX, Self::MoveY, Self::Rotate, Self::Alpha, Self::Speed];
}

bitflags! {
    /// Which parts of a [`LineTransform`] a resolve pass should compute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LineFields: u16 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const ANGLE = 1 << 2;
        const ALPHA = 1 << 3;
        const SPEED = 1 << 4;
        const SCALE_X = 1 << 5;
        const SCALE_Y = 1 << 6;
        const COLOR = 1 << 7;
        const PAINT = 1 << 8;
        const TEXT = 1 << 9;

        const POSITION = Self::X.bits() | Self::Y.bits();
        const INHERITED = Self::X.bits() | Self::Y.bits() | Self::ANGLE.bits();
        const BASE = Self::INHERITED.bits() | Self::ALPHA.bits() | Self::SPEED.bits();
        const EXTENDED = Self::SCALE_X.bits() | Self::SCALE_Y.bits() | Self::COLOR.bits()
            | Self::PAINT.bits() | Self::TEXT.bits();
    }
}

/// Resolved world state of a line; fields not requested stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineTransform {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub angle: Option<f64>,
    pub alpha: Option<f64>,
    pub speed: Option<f64>,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
    pub color: Option<Rgb>,
    pub paint: Option<f64>,
    pub text: Option<String>,
}

type Visited = SmallVec<[usize; 8]>;

/// Resolves line `index` at `seconds`.
///
/// Position is inherited from the father chain: the line's own `(x, y)` is an
/// offset in the father's frame, rotated by the father's angle. Angles are
/// not inherited. A father chain that loops is cut by setting the revisited
/// line's `father` to -1.
///
/// Callers must pass an in-range `index`.
pub fn resolve(
    lines: &mut [JudgeLine],
    bpm: &BpmList,
    index: usize,
    seconds: f64,
    fields: LineFields,
) -> LineTransform {
    let mut visited = Visited::new();
    resolve_inner(lines, bpm, index, seconds, fields, &mut visited)
}

fn resolve_inner(
    lines: &mut [JudgeLine],
    bpm: &BpmList,
    index: usize,
    seconds: f64,
    fields: LineFields,
    visited: &mut Visited,
) -> LineTransform {
    if visited.contains(&index) {
        warn!(
            "Judge line {index} closes a father cycle (father was {}); detaching it.",
            lines[index].father
        );
        lines[index].father = -1;
    }
    visited.push(index);

    let mut out = LineTransform::default();
    // Both coordinates are needed to rotate either of them into the father's frame.
    let mut pos = DVec2::ZERO;
    {
        let line = &lines[index];
        let base = |track| line.sum_track(track, seconds, bpm);
        if fields.intersects(LineFields::POSITION) {
            pos = DVec2::new(base(BaseTrack::MoveX), base(BaseTrack::MoveY));
        }
        if fields.contains(LineFields::ANGLE) {
            out.angle = Some(base(BaseTrack::Rotate));
        }
        if fields.contains(LineFields::ALPHA) {
            out.alpha = Some(base(BaseTrack::Alpha));
        }
        if fields.contains(LineFields::SPEED) {
            out.speed = Some(base(BaseTrack::Speed));
        }
    }

    if let Some(father) = lines[index].father_index(lines.len()) {
        let parent = resolve_inner(lines, bpm, father, seconds, LineFields::INHERITED, visited);
        pos = move_and_rotate(
            DVec2::new(parent.x.unwrap_or(0.0), parent.y.unwrap_or(0.0)),
            parent.angle.unwrap_or(0.0),
            pos,
        );
    }
    if fields.contains(LineFields::X) {
        out.x = Some(pos.x);
    }
    if fields.contains(LineFields::Y) {
        out.y = Some(pos.y);
    }

    if fields.intersects(LineFields::EXTENDED) {
        let ext = &lines[index].extended;
        let scale = |events: &[Event<f64>]| {
            let v: f64 = track_value(events, seconds, bpm);
            // Zero (and NaN) mean "unset".
            if v == 0.0 || v.is_nan() { 1.0 } else { v }
        };
        if fields.contains(LineFields::SCALE_X) {
            out.scale_x = Some(scale(&ext.scale_x_events[..]));
        }
        if fields.contains(LineFields::SCALE_Y) {
            out.scale_y = Some(scale(&ext.scale_y_events[..]));
        }
        if fields.contains(LineFields::COLOR) {
            out.color = Some(match find_last_event(&ext.color_events, seconds, bpm) {
                Some(e) => interpolate(Some(e), seconds, bpm),
                None => Rgb::LINE_DEFAULT,
            });
        }
        if fields.contains(LineFields::PAINT) {
            out.paint = Some(track_value(&ext.paint_events, seconds, bpm));
        }
        if fields.contains(LineFields::TEXT) {
            out.text = Some(track_value(&ext.text_events, seconds, bpm));
        }
    }

    out
}

/// Maps `offset`, given in a frame rotated by `angle_deg` (clockwise, the
/// chart convention) and anchored at `origin`, into world coordinates.
#[inline(always)]
pub fn move_and_rotate(origin: DVec2, angle_deg: f64, offset: DVec2) -> DVec2 {
    origin + DVec2::from_angle(-angle_deg.to_radians()).rotate(offset)
}

/// Lines whose father chain loops back into a cycle, without touching the
/// model. Each cycle is reported once, by its lowest line index.
pub fn detect_father_cycles(lines: &[JudgeLine]) -> Vec<usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unseen,
        OnPath,
        Done,
    }

    let mut marks = vec![Mark::Unseen; lines.len()];
    let mut cycles = Vec::new();
    for start in 0..lines.len() {
        let mut path: Visited = SmallVec::new();
        let mut cur = Some(start);
        while let Some(i) = cur {
            match marks[i] {
                Mark::Done => break,
                Mark::OnPath => {
                    let at = path.iter().position(|&p| p == i).unwrap_or(0);
                    if let Some(&lowest) = path[at..].iter().min() {
                        cycles.push(lowest);
                    }
                    break;
                }
                Mark::Unseen => {
                    marks[i] = Mark::OnPath;
                    path.push(i);
                    cur = lines[i].father_index(lines.len());
                }
            }
        }
        for &p in &path {
            marks[p] = Mark::Done;
        }
    }
    cycles.sort_unstable();
    cycles
}

#[cfg(test)]
mod tests {
    use super::{BaseLayer, JudgeLine, LineFields, detect_father_cycles, resolve};
    use crate::game::beats::Beats;
    use crate::game::event::{Event, Rgb};
    use crate::game::timing::BpmList;

    fn hold_value(v: f64) -> Vec<Event<f64>> {
        vec![Event::new(Beats::ZERO, Beats::ZERO, v, v)]
    }

    fn line_at(x: f64, y: f64, angle: f64, father: i32) -> JudgeLine {
        JudgeLine {
            father,
            event_layers: vec![BaseLayer {
                move_x_events: hold_value(x),
                move_y_events: hold_value(y),
                rotate_events: hold_value(angle),
                ..BaseLayer::default()
            }],
            ..JudgeLine::default()
        }
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() <= 1e-9)
    }

    #[test]
    fn layers_are_summed() {
        let bpm = BpmList::constant(60.0);
        let mut line = line_at(10.0, 0.0, 0.0, -1);
        line.event_layers.push(BaseLayer {
            move_x_events: hold_value(2.5),
            alpha_events: hold_value(128.0),
            ..BaseLayer::default()
        });
        let mut lines = vec![line];
        let t = resolve(&mut lines, &bpm, 0, 1.0, LineFields::BASE);
        assert!(close(t.x, 12.5), "x = {:?}", t.x);
        assert!(close(t.alpha, 128.0));
        assert!(t.scale_x.is_none(), "extended fields only when requested");
    }

    #[test]
    fn child_position_rotates_with_father_but_angle_does_not() {
        let bpm = BpmList::constant(60.0);
        let mut lines = vec![line_at(100.0, 50.0, 90.0, -1), line_at(10.0, 0.0, 15.0, 0)];
        let t = resolve(&mut lines, &bpm, 1, 1.0, LineFields::BASE);
        // 90 degrees clockwise turns +x into -y.
        assert!(close(t.x, 100.0), "x = {:?}", t.x);
        assert!(close(t.y, 40.0), "y = {:?}", t.y);
        assert!(close(t.angle, 15.0), "own angle only, got {:?}", t.angle);
    }

    #[test]
    fn father_cycle_is_healed_on_first_resolve() {
        let bpm = BpmList::constant(60.0);
        let mut lines = vec![
            line_at(1.0, 0.0, 0.0, 2),
            line_at(2.0, 0.0, 0.0, 0),
            line_at(4.0, 0.0, 0.0, 1),
        ];
        assert_eq!(detect_father_cycles(&lines), vec![0]);
        let t = resolve(&mut lines, &bpm, 0, 0.5, LineFields::all());
        assert_eq!(lines[0].father, -1, "the revisited line is detached");
        assert_eq!(lines[1].father, 0);
        assert!(t.x.is_some_and(f64::is_finite));
        // 0 -> 2 -> 1 -> 0(detached): 1 + 4 + 2 + 1.
        assert!(close(t.x, 8.0), "x = {:?}", t.x);
        assert!(detect_father_cycles(&lines).is_empty());
        let again = resolve(&mut lines, &bpm, 0, 0.5, LineFields::X);
        assert!(close(again.x, 1.0));
    }

    #[test]
    fn self_father_is_a_cycle() {
        let bpm = BpmList::constant(60.0);
        let mut lines = vec![line_at(3.0, 0.0, 0.0, 0)];
        let t = resolve(&mut lines, &bpm, 0, 0.0, LineFields::X);
        assert_eq!(lines[0].father, -1);
        assert!(close(t.x, 6.0), "x = {:?}", t.x);
    }

    #[test]
    fn out_of_range_father_is_ignored() {
        let bpm = BpmList::constant(60.0);
        let mut lines = vec![line_at(3.0, 4.0, 0.0, 9)];
        let t = resolve(&mut lines, &bpm, 0, 0.0, LineFields::POSITION);
        assert!(close(t.x, 3.0) && close(t.y, 4.0));
        assert_eq!(lines[0].father, 9, "not a cycle, left alone");
    }

    #[test]
    fn extended_defaults() {
        let bpm = BpmList::constant(60.0);
        let mut lines = vec![JudgeLine::default()];
        let t = resolve(&mut lines, &bpm, 0, 3.0, LineFields::EXTENDED);
        assert_eq!(t.scale_x, Some(1.0));
        assert_eq!(t.scale_y, Some(1.0));
        assert_eq!(t.color, Some(Rgb::LINE_DEFAULT));
        assert_eq!(t.paint, Some(0.0));
        assert_eq!(t.text.as_deref(), Some(""));
        assert!(t.x.is_none());

        lines[0].extended.scale_x_events = hold_value(2.0);
        lines[0].extended.color_events =
            vec![Event::new(Beats::ZERO, Beats::ZERO, Rgb::WHITE, Rgb([1.0, 2.0, 3.0]))];
        let t = resolve(&mut lines, &bpm, 0, 3.0, LineFields::SCALE_X | LineFields::COLOR);
        assert_eq!(t.scale_x, Some(2.0));
        assert_eq!(t.color, Some(Rgb([1.0, 2.0, 3.0])));
    }
}
