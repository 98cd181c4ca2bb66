use crate::core::audio::SoundPlayer;
use crate::error::{Error, Result};
use crate::game::judge_line::{self, JudgeLine, LineFields, LineTransform};
use crate::game::judgment::{self, Judgement};
use crate::game::note::Note;
use crate::game::scroll::{self, ScrollPosition};
use crate::game::timing::BpmList;
use log::info;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Meta {
    pub name: String,
    pub composer: String,
    pub charter: String,
    pub level: String,
    pub song: String,
    pub background: String,
    /// Audio offset in milliseconds; positive values delay the chart.
    pub offset: i32,
    #[serde(rename = "RPEVersion")]
    pub rpe_version: i32,
}

/// A whole chart: tempo timeline, metadata and judge lines with their notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chart {
    #[serde(rename = "BPMList", default)]
    pub bpm_list: BpmList,
    #[serde(rename = "META", default)]
    pub meta: Meta,
    #[serde(rename = "judgeLineList", default)]
    pub judge_lines: Vec<JudgeLine>,
}

impl Chart {
    pub fn new(bpm_list: BpmList, meta: Meta, judge_lines: Vec<JudgeLine>) -> Self {
        let mut chart = Self { bpm_list, meta, judge_lines };
        chart.prepare();
        chart
    }

    /// Normalizes freshly loaded data: event tracks sorted by start, non-Hold
    /// notes collapsed to their start, chord highlights computed.
    pub fn prepare(&mut self) {
        for line in &mut self.judge_lines {
            line.sort_events();
            for note in &mut line.notes {
                note.normalize_times();
            }
        }
        self.recompute_highlights();
        info!(
            "Chart '{}' prepared: {} lines, {} notes, {} events, {} BPM segments.",
            self.meta.name,
            self.judge_lines.len(),
            self.note_count(),
            self.judge_lines.iter().map(JudgeLine::event_count).sum::<usize>(),
            self.bpm_list.segments().len(),
        );
    }

    pub fn note_count(&self) -> usize {
        self.judge_lines.iter().map(|l| l.notes.len()).sum()
    }

    /// Converts an audio clock reading into chart seconds.
    #[inline(always)]
    pub fn chart_seconds(&self, audio_seconds: f64) -> f64 {
        audio_seconds - self.meta.offset as f64 / 1000.0
    }

    fn check_line(&self, index: usize) -> Result<()> {
        if index < self.judge_lines.len() {
            Ok(())
        } else {
            Err(Error::LineIndex { index, len: self.judge_lines.len() })
        }
    }

    pub fn note(&self, line: usize, index: usize) -> Result<&Note> {
        self.check_line(line)?;
        let notes = &self.judge_lines[line].notes;
        notes.get(index).ok_or(Error::NoteIndex { line, index, len: notes.len() })
    }

    /// World transform of a line. May detach a line that closes a father cycle.
    pub fn resolve_judge_line(
        &mut self,
        index: usize,
        seconds: f64,
        fields: LineFields,
    ) -> Result<LineTransform> {
        self.check_line(index)?;
        Ok(judge_line::resolve(&mut self.judge_lines, &self.bpm_list, index, seconds, fields))
    }

    pub fn scroll_position(
        &self,
        line_index: usize,
        note_index: usize,
        seconds: f64,
        chart_speed: f64,
    ) -> Result<ScrollPosition> {
        let note = self.note(line_index, note_index)?;
        let line = &self.judge_lines[line_index];
        Ok(scroll::note_scroll(line, note, seconds, &self.bpm_list, chart_speed))
    }

    pub fn classify(&self, line_index: usize, note_index: usize) -> Result<Judgement> {
        let note = self.note(line_index, note_index)?;
        Ok(judgment::classify(note, &self.bpm_list))
    }

    pub fn autoplay(&mut self, seconds: f64, sounds: &mut dyn SoundPlayer) -> usize {
        judgment::autoplay(&mut self.judge_lines, &self.bpm_list, seconds, sounds)
    }

    /// Father-cycle report that leaves the chart untouched.
    pub fn detect_father_cycles(&self) -> Vec<usize> {
        judge_line::detect_father_cycles(&self.judge_lines)
    }

    // ----------------------------- Editing -----------------------------

    pub fn add_note(&mut self, line: usize, note: Note) -> Result<usize> {
        self.check_line(line)?;
        let notes = &mut self.judge_lines[line].notes;
        notes.push(note);
        let index = notes.len() - 1;
        self.recompute_highlights();
        Ok(index)
    }

    pub fn remove_note(&mut self, line: usize, index: usize) -> Result<Note> {
        self.note(line, index)?;
        let removed = self.judge_lines[line].notes.remove(index);
        self.recompute_highlights();
        Ok(removed)
    }

    pub fn add_line(&mut self, line: JudgeLine) -> usize {
        self.judge_lines.push(line);
        self.recompute_highlights();
        self.judge_lines.len() - 1
    }

    /// Removes a line; children of it become roots and later indices shift down.
    pub fn remove_line(&mut self, index: usize) -> Result<JudgeLine> {
        self.check_line(index)?;
        let removed = self.judge_lines.remove(index);
        let index = index as i32;
        for line in &mut self.judge_lines {
            if line.father == index {
                line.father = -1;
            } else if line.father > index {
                line.father -= 1;
            }
        }
        self.recompute_highlights();
        Ok(removed)
    }

    /// Marks every note that shares its exact start beat with another note
    /// anywhere in the chart.
    pub fn recompute_highlights(&mut self) {
        let mut counts: FxHashMap<u64, u32> = FxHashMap::default();
        let key = |n: &Note| n.start_time().value().to_bits();
        for note in self.judge_lines.iter().flat_map(|l| &l.notes) {
            *counts.entry(key(note)).or_default() += 1;
        }
        for note in self.judge_lines.iter_mut().flat_map(|l| &mut l.notes) {
            let shared = counts.get(&key(&*note)).is_some_and(|&c| c > 1);
            note.set_highlight(shared);
        }
    }
}
