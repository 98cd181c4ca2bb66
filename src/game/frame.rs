use crate::core::audio::SoundPlayer;
use crate::core::draw_queue::{DrawLayer, DrawQueue};
use crate::error::Result;
use crate::game::chart::Chart;
use crate::game::event::Rgb;
use crate::game::judge_line::{LineFields, LineTransform, move_and_rotate};
use crate::game::judgment::{self, HitFx, Judgement};
use crate::game::note::NoteType;
use crate::game::scroll::ScrollPosition;
use glam::DVec2;
use serde::Serialize;
use std::cell::RefCell;

/// Engine-facing tuning, projected from the user configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Global multiplier on scroll distances.
    pub chart_speed: f64,
    pub hit_fx_duration: f64,
    /// Seconds between repeated hit effects while a Hold is held.
    pub hit_fx_frequency: f64,
    pub autoplay: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chart_speed: 1.0,
            hit_fx_duration: 0.5,
            hit_fx_frequency: 0.2,
            autoplay: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFrame {
    pub index: usize,
    pub note_type: NoteType,
    /// Whether the note body is drawn; hit effects may outlive it.
    pub visible: bool,
    pub position_x: f64,
    pub size: f64,
    pub alpha: u8,
    pub highlight: bool,
    pub scroll: ScrollPosition,
    pub judgement: Judgement,
    pub hit_fx: Vec<HitFx>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineFrame {
    pub index: usize,
    pub z_order: i32,
    pub transform: LineTransform,
    pub notes: Vec<NoteFrame>,
}

/// Everything a renderer needs for one frame, lines in draw (z) order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub seconds: f64,
    pub beats: f64,
    /// Notes auto-hit while building this frame.
    pub hits: usize,
    pub lines: Vec<LineFrame>,
}

/// Runs one frame of the engine at chart time `seconds`.
///
/// Order matters: autoplay first so judgements and hit effects of this frame
/// already see the hits it produced.
pub fn build(
    chart: &mut Chart,
    seconds: f64,
    cfg: &EngineConfig,
    sounds: &mut dyn SoundPlayer,
) -> Result<FrameSnapshot> {
    let hits = if cfg.autoplay { chart.autoplay(seconds, sounds) } else { 0 };

    let mut lines = Vec::with_capacity(chart.judge_lines.len());
    for index in 0..chart.judge_lines.len() {
        let transform = chart.resolve_judge_line(index, seconds, LineFields::all())?;
        let mut notes = Vec::new();
        for (note_index, note) in chart.judge_lines[index].notes.iter().enumerate() {
            let visible = note.is_visible_at(seconds, &chart.bpm_list);
            let hit_fx = judgment::hit_fx(
                note,
                seconds,
                &chart.bpm_list,
                cfg.hit_fx_duration,
                cfg.hit_fx_frequency,
            );
            // Effects of notes that are already gone still have to play out.
            if !visible && hit_fx.is_empty() {
                continue;
            }
            let scroll = chart.scroll_position(index, note_index, seconds, cfg.chart_speed)?;
            if scroll.is_covered && hit_fx.is_empty() {
                continue;
            }
            notes.push(NoteFrame {
                index: note_index,
                note_type: note.note_type(),
                visible: visible && !scroll.is_covered,
                position_x: note.position_x,
                size: note.size,
                alpha: note.alpha,
                highlight: note.highlight(),
                scroll,
                judgement: judgment::classify(note, &chart.bpm_list),
                hit_fx: hit_fx.into_vec(),
            });
        }
        lines.push(LineFrame {
            index,
            z_order: chart.judge_lines[index].z_order,
            transform,
            notes,
        });
    }
    lines.sort_by_key(|l| l.z_order);

    Ok(FrameSnapshot {
        seconds,
        beats: chart.bpm_list.beats_of(seconds),
        hits,
        lines,
    })
}

/// Numeric input of one draw call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DrawCommand {
    Line {
        line: usize,
        x: f64,
        y: f64,
        angle: f64,
        alpha: f64,
        scale_x: f64,
        scale_y: f64,
        color: Rgb,
        text: String,
    },
    Note {
        line: usize,
        note: usize,
        note_type: NoteType,
        head: [f64; 2],
        /// Tail end for Holds, same as `head` otherwise.
        tail: [f64; 2],
        angle: f64,
        size: f64,
        alpha: u8,
        highlight: bool,
    },
    HitFx {
        line: usize,
        note: usize,
        at: [f64; 2],
        progress: f64,
    },
}

fn line_origin(t: &LineTransform) -> (DVec2, f64) {
    (DVec2::new(t.x.unwrap_or(0.0), t.y.unwrap_or(0.0)), t.angle.unwrap_or(0.0))
}

/// Queues the draw calls of `frame` in band order, writing them into `out`
/// once the queue runs.
pub fn enqueue_draws<'a>(
    queue: &mut DrawQueue<'a>,
    frame: &'a FrameSnapshot,
    out: &'a RefCell<Vec<DrawCommand>>,
) -> Result<()> {
    for lf in &frame.lines {
        let (origin, angle) = line_origin(&lf.transform);
        queue.add_layer_task(DrawLayer::Line, move || {
            let t = &lf.transform;
            out.borrow_mut().push(DrawCommand::Line {
                line: lf.index,
                x: origin.x,
                y: origin.y,
                angle,
                alpha: t.alpha.unwrap_or(0.0),
                scale_x: t.scale_x.unwrap_or(1.0),
                scale_y: t.scale_y.unwrap_or(1.0),
                color: t.color.unwrap_or(Rgb::LINE_DEFAULT),
                text: t.text.clone().unwrap_or_default(),
            });
            Ok(())
        })?;

        for nf in &lf.notes {
            let on_line = |y: f64| {
                let p = move_and_rotate(origin, angle, DVec2::new(nf.position_x, y));
                [p.x, p.y]
            };
            if nf.visible {
                let head = on_line(nf.scroll.start_position_y);
                let tail = on_line(nf.scroll.end_position_y);
                queue.add_layer_task(DrawLayer::for_note(nf.note_type), move || {
                    out.borrow_mut().push(DrawCommand::Note {
                        line: lf.index,
                        note: nf.index,
                        note_type: nf.note_type,
                        head,
                        tail,
                        angle,
                        size: nf.size,
                        alpha: nf.alpha,
                        highlight: nf.highlight,
                    });
                    Ok(())
                })?;
            }
            let at = on_line(0.0);
            for fx in &nf.hit_fx {
                queue.add_layer_task(DrawLayer::HitFx, move || {
                    out.borrow_mut().push(DrawCommand::HitFx {
                        line: lf.index,
                        note: nf.index,
                        at,
                        progress: fx.progress,
                    });
                    Ok(())
                })?;
            }
        }
    }
    Ok(())
}
