use crate::error::Error;
use crate::game::beats::Beats;
use crate::game::event::{SecondsCache, de_flag, de_side};
use crate::game::timing::BpmList;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum NoteType {
    Tap = 1,
    Hold = 2,
    Flick = 3,
    Drag = 4,
}

impl NoteType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tap => "Tap",
            Self::Hold => "Hold",
            Self::Flick => "Flick",
            Self::Drag => "Drag",
        }
    }
}

impl TryFrom<u8> for NoteType {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Self::Tap),
            2 => Ok(Self::Hold),
            3 => Ok(Self::Flick),
            4 => Ok(Self::Drag),
            _ => Err(Error::NoteType(id)),
        }
    }
}

impl From<NoteType> for u8 {
    fn from(t: NoteType) -> u8 {
        t as u8
    }
}

fn default_one() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_alpha() -> u8 {
    255
}

fn default_visible_time() -> f64 {
    999_999.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "type")]
    note_type: NoteType,
    start_time: Beats,
    end_time: Beats,
    #[serde(default)]
    pub position_x: f64,
    #[serde(default = "default_one")]
    pub speed: f64,
    #[serde(default = "default_one")]
    pub size: f64,
    #[serde(default)]
    pub y_offset: f64,
    #[serde(default = "default_true", deserialize_with = "de_side")]
    pub above: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_fake: bool,
    #[serde(default = "default_alpha")]
    pub alpha: u8,
    /// How long before its start the note is allowed to appear, in seconds.
    #[serde(default = "default_visible_time")]
    pub visible_time: f64,

    // Runtime state, never persisted.
    /// When the note was hit (or auto-hit), in chart seconds.
    #[serde(skip)]
    pub hit_seconds: Option<f64>,
    #[serde(skip)]
    highlight: bool,
    #[serde(skip)]
    cache: Cell<Option<SecondsCache>>,
}

impl Note {
    pub fn new(note_type: NoteType, start_time: Beats, end_time: Beats) -> Self {
        let mut note = Self {
            note_type,
            start_time,
            end_time,
            position_x: 0.0,
            speed: 1.0,
            size: 1.0,
            y_offset: 0.0,
            above: true,
            is_fake: false,
            alpha: 255,
            visible_time: default_visible_time(),
            hit_seconds: None,
            highlight: false,
            cache: Cell::new(None),
        };
        note.set_times(start_time, end_time);
        note
    }

    pub fn tap(at: Beats) -> Self {
        Self::new(NoteType::Tap, at, at)
    }

    pub fn hold(start_time: Beats, end_time: Beats) -> Self {
        Self::new(NoteType::Hold, start_time, end_time)
    }

    #[inline(always)]
    pub fn note_type(&self) -> NoteType {
        self.note_type
    }

    #[inline(always)]
    pub fn start_time(&self) -> Beats {
        self.start_time
    }

    #[inline(always)]
    pub fn end_time(&self) -> Beats {
        self.end_time
    }

    /// True when another note in the chart starts on the exact same beat.
    #[inline(always)]
    pub fn highlight(&self) -> bool {
        self.highlight
    }

    pub(crate) fn set_highlight(&mut self, highlight: bool) {
        self.highlight = highlight;
    }

    /// Only Hold notes keep a distinct end; everything else ends where it starts.
    pub fn set_times(&mut self, start_time: Beats, end_time: Beats) {
        self.start_time = start_time;
        self.end_time = if self.note_type == NoteType::Hold {
            end_time.max(start_time)
        } else {
            start_time
        };
        self.cache.set(None);
    }

    pub fn set_note_type(&mut self, note_type: NoteType) {
        self.note_type = note_type;
        self.set_times(self.start_time, self.end_time);
    }

    /// Restores the end-time invariant on freshly loaded data.
    pub(crate) fn normalize_times(&mut self) {
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

    /// Whether the note should be drawn at `seconds`:
    /// - not earlier than `visible_time` before its start,
    /// - not fully transparent,
    /// - Hold notes until their end, others until they are hit.
    pub fn is_visible_at(&self, seconds: f64, bpm: &BpmList) -> bool {
        let (start_s, end_s) = self.seconds(bpm);
        if self.alpha == 0 || start_s - seconds > self.visible_time {
            return false;
        }
        match self.note_type {
            NoteType::Hold => seconds < end_s,
            _ => seconds < start_s || self.hit_seconds.is_none(),
        }
    }
}
