use crate::core::audio::SoundPlayer;
use crate::game::judge_line::JudgeLine;
use crate::game::note::{Note, NoteType};
use crate::game::timing::BpmList;
use crate::game::timing_windows::{JudgeWindows, windows_for};
use log::debug;
use serde::Serialize;
use smallvec::SmallVec;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Judgement {
    Perfect,
    Good,
    Bad,
    /// Not hit yet, or hit outside every window.
    None,
}

impl Judgement {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Good => "good",
            Self::Bad => "bad",
            Self::None => "none",
        }
    }
}

/// Classifies a signed hit offset (seconds) against `windows`. All bounds are
/// exclusive.
#[inline(always)]
pub fn classify_offset_s(offset_s: f64, windows: &JudgeWindows) -> Judgement {
    let abs = offset_s.abs();
    if abs < windows.perfect_s {
        Judgement::Perfect
    } else if abs < windows.good_s {
        Judgement::Good
    } else if abs < windows.bad_s {
        Judgement::Bad
    } else {
        Judgement::None
    }
}

pub fn classify(note: &Note, bpm: &BpmList) -> Judgement {
    match note.hit_seconds {
        Some(hit) => {
            classify_offset_s(hit - note.start_seconds(bpm), &windows_for(note.note_type()))
        }
        None => Judgement::None,
    }
}

/// Autoplay step for one frame.
///
/// - A hit later than `seconds` is cleared, so scrubbing backwards re-arms it.
/// - A real note whose start has been reached and that holds no valid
///   judgement is hit exactly on its start, and its sound is played once.
///
/// Returns the number of notes hit in this step.
pub fn autoplay(
    lines: &mut [JudgeLine],
    bpm: &BpmList,
    seconds: f64,
    sounds: &mut dyn SoundPlayer,
) -> usize {
    let mut hits = 0;
    for (line_idx, line) in lines.iter_mut().enumerate() {
        for (note_idx, note) in line.notes.iter_mut().enumerate() {
            if let Some(hit) = note.hit_seconds
                && seconds < hit
            {
                note.hit_seconds = None;
                debug!("Autoplay: rewound past line {line_idx} note {note_idx}.");
            }
            if note.is_fake || classify(note, bpm) != Judgement::None {
                continue;
            }
            let start_s = note.start_seconds(bpm);
            if seconds >= start_s {
                note.hit_seconds = Some(start_s);
                sounds.play_sound(note.note_type());
                hits += 1;
                debug!("Autoplay: hit line {line_idx} note {note_idx} at {start_s:.3}s.");
            }
        }
    }
    hits
}

/// One visible hit-effect instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitFx {
    pub started_at: f64,
    /// Animation progress in `[0, 1)`.
    pub progress: f64,
}

/// Hit effects of `note` visible at `seconds`.
///
/// Non-Hold notes show one effect for `duration` after the hit. Holds repeat
/// it every `frequency` seconds from the hit until the earlier of their end
/// and `seconds`.
pub fn hit_fx(
    note: &Note,
    seconds: f64,
    bpm: &BpmList,
    duration: f64,
    frequency: f64,
) -> SmallVec<[HitFx; 4]> {
    let mut out = SmallVec::new();
    let Some(hit) = note.hit_seconds else {
        return out;
    };
    if duration <= 0.0 {
        return out;
    }
    let mut push = |t: f64| {
        if t <= seconds && seconds < t + duration {
            out.push(HitFx { started_at: t, progress: (seconds - t) / duration });
        }
    };

    if note.note_type() != NoteType::Hold || frequency <= 0.0 {
        push(hit);
        return out;
    }

    let last = note.end_seconds(bpm).min(seconds);
    if last < hit {
        return out;
    }
    // Skip instances that have already faded out.
    let first_k = ((seconds - duration - hit) / frequency).floor().max(0.0) as u64;
    let last_k = ((last - hit) / frequency).floor() as u64;
    for k in first_k..=last_k {
        push(hit + k as f64 * frequency);
    }
    out
}
