// Shared judgement window definitions so autoplay, scoring and hit effects agree.

use crate::game::note::NoteType;

// All windows are in seconds, symmetric around the note's start.
pub const TAP_PERFECT_S: f64 = 0.08;
pub const TAP_GOOD_S: f64 = 0.16;
pub const TAP_BAD_S: f64 = 0.18;

// Drag and Flick only check whether the note was caught at all.
pub const CATCH_WINDOW_S: f64 = 0.18;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JudgeWindows {
    pub perfect_s: f64,
    pub good_s: f64,
    pub bad_s: f64,
}

#[inline(always)]
pub fn windows_for(note_type: NoteType) -> JudgeWindows {
    match note_type {
        NoteType::Tap | NoteType::Hold => JudgeWindows {
            perfect_s: TAP_PERFECT_S,
            good_s: TAP_GOOD_S,
            bad_s: TAP_BAD_S,
        },
        NoteType::Drag | NoteType::Flick => JudgeWindows {
            perfect_s: CATCH_WINDOW_S,
            good_s: CATCH_WINDOW_S,
            bad_s: CATCH_WINDOW_S,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{CATCH_WINDOW_S, windows_for};
    use crate::game::note::NoteType;

    #[test]
    fn holds_share_tap_windows_and_catch_notes_collapse() {
        assert_eq!(windows_for(NoteType::Hold), windows_for(NoteType::Tap));
        let w = windows_for(NoteType::Flick);
        assert_eq!([w.perfect_s, w.good_s, w.bad_s], [CATCH_WINDOW_S; 3]);
    }
}
