use crate::game::note::NoteType;
use log::info;
use rustc_hash::FxHashMap;

/* ============================== Public API ============================== */

/// Fire-and-forget hit sound output.
pub trait SoundPlayer {
    fn play_sound(&mut self, note_type: NoteType);
}

/// Hit sound file used for each note type.
pub fn hitsound_path(note_type: NoteType) -> &'static str {
    match note_type {
        NoteType::Tap | NoteType::Hold => "hitsounds/tap.ogg",
        NoteType::Drag => "hitsounds/drag.ogg",
        NoteType::Flick => "hitsounds/flick.ogg",
    }
}

/// Player for headless runs: logs each sound and keeps per-type counts.
#[derive(Debug, Default)]
pub struct LogSoundPlayer {
    played: FxHashMap<NoteType, u32>,
}

impl LogSoundPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, note_type: NoteType) -> u32 {
        self.played.get(&note_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.played.values().sum()
    }
}

impl SoundPlayer for LogSoundPlayer {
    fn play_sound(&mut self, note_type: NoteType) {
        *self.played.entry(note_type).or_default() += 1;
        info!("Play SFX: {} ({})", hitsound_path(note_type), note_type.as_str());
    }
}

/// Discards every sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct Muted;

impl SoundPlayer for Muted {
    fn play_sound(&mut self, _note_type: NoteType) {}
}

#[cfg(test)]
mod tests {
    use super::{LogSoundPlayer, SoundPlayer};
    use crate::game::note::NoteType;

    #[test]
    fn log_player_counts_per_type() {
        let mut p = LogSoundPlayer::new();
        p.play_sound(NoteType::Tap);
        p.play_sound(NoteType::Tap);
        p.play_sound(NoteType::Flick);
        assert_eq!(p.count(NoteType::Tap), 2);
        assert_eq!(p.count(NoteType::Drag), 0);
        assert_eq!(p.total(), 3);
    }
}
