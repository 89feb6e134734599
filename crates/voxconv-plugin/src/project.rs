//! Shared intermediate project model.
//!
//! Every format plugin loads into and dumps from this model, and middleware
//! transforms it. The orchestrator only moves it between plugins.

use serde::{Deserialize, Serialize};

/// Tick resolution of all positions and lengths.
pub const TICKS_PER_BEAT: i64 = 480;

/// Tempo assumed when a project declares none.
pub const DEFAULT_BPM: f64 = 120.0;

/// A singing-voice-synthesis project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Tempo changes, sorted by position.
    pub song_tempos: Vec<SongTempo>,
    /// Time signature changes, sorted by bar.
    pub time_signatures: Vec<TimeSignature>,
    /// Tracks in display order.
    pub tracks: Vec<Track>,
}

/// A tempo change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongTempo {
    /// Position in ticks.
    pub position: i64,
    /// Beats per minute.
    pub bpm: f64,
}

/// A time signature change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    /// Zero-based bar index where it takes effect.
    pub bar_index: i64,
    /// Beats per bar.
    pub numerator: u8,
    /// Beat unit.
    pub denominator: u8,
}

/// A project track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Track {
    /// Voice track with notes.
    Singing(SingingTrack),
    /// Audio backing track.
    Instrumental(InstrumentalTrack),
}

impl Track {
    /// Track title.
    pub fn title(&self) -> &str {
        match self {
            Self::Singing(t) => &t.title,
            Self::Instrumental(t) => &t.title,
        }
    }
}

/// Voice track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingingTrack {
    /// Title.
    pub title: String,
    /// Muted.
    pub mute: bool,
    /// Soloed.
    pub solo: bool,
    /// Voicebank / singer name.
    pub ai_singer_name: String,
    /// Notes sorted by start position.
    pub notes: Vec<Note>,
}

/// Audio backing track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentalTrack {
    /// Title.
    pub title: String,
    /// Muted.
    pub mute: bool,
    /// Soloed.
    pub solo: bool,
    /// Path of the audio file as referenced by the source project.
    pub audio_file_path: String,
    /// Offset in ticks.
    pub offset: i64,
}

/// A sung note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Start in ticks.
    pub start_pos: i64,
    /// Length in ticks.
    pub length: i64,
    /// MIDI key number.
    pub key_number: i32,
    /// Lyric text.
    pub lyric: String,
    /// Phonetic override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
}

impl Note {
    /// End position in ticks; `None` past the tick range.
    pub fn end_pos(&self) -> Option<i64> {
        self.start_pos.checked_add(self.length)
    }
}

impl Project {
    /// Voice tracks only.
    pub fn singing_tracks(&self) -> impl Iterator<Item = &SingingTrack> {
        self.tracks.iter().filter_map(|t| match t {
            Track::Singing(s) => Some(s),
            Track::Instrumental(_) => None,
        })
    }

    /// Mutable voice tracks only.
    pub fn singing_tracks_mut(&mut self) -> impl Iterator<Item = &mut SingingTrack> {
        self.tracks.iter_mut().filter_map(|t| match t {
            Track::Singing(s) => Some(s),
            Track::Instrumental(_) => None,
        })
    }

    /// Total notes over all voice tracks.
    pub fn note_count(&self) -> usize {
        self.singing_tracks().map(|t| t.notes.len()).sum()
    }

    /// Tick/second conversion for this project's tempo changes.
    pub fn tempo_map(&self) -> TempoMap {
        TempoMap::new(&self.song_tempos)
    }
}

/// Piecewise-constant tempo map.
#[derive(Debug, Clone)]
pub struct TempoMap {
    /// `(tick, seconds at tick, bpm)` segments sorted by tick.
    segments: Vec<(i64, f64, f64)>,
}

impl TempoMap {
    /// Builds a map; non-positive tempos are skipped and an empty list means
    /// [`DEFAULT_BPM`] throughout.
    pub fn new(tempos: &[SongTempo]) -> Self {
        let mut sorted: Vec<&SongTempo> = tempos
            .iter()
            .filter(|t| t.bpm.is_finite() && t.bpm > 0.0)
            .collect();
        sorted.sort_by_key(|t| t.position);

        let mut segments: Vec<(i64, f64, f64)> = Vec::with_capacity(sorted.len() + 1);
        let first_bpm = sorted.first().map_or(DEFAULT_BPM, |t| t.bpm);
        segments.push((0, 0.0, first_bpm));

        for tempo in sorted {
            let position = tempo.position.max(0);
            let (tick, secs, bpm) = *segments.last().unwrap_or(&(0, 0.0, first_bpm));
            let at = secs + ticks_to_secs(position - tick, bpm);
            if position == tick {
                segments.pop();
            }
            segments.push((position, at, tempo.bpm));
        }
        Self { segments }
    }

    /// Seconds elapsed at `tick`.
    pub fn ticks_to_seconds(&self, tick: i64) -> f64 {
        let (start, secs, bpm) = self
            .segments
            .iter()
            .rev()
            .find(|(start, _, _)| *start <= tick)
            .copied()
            .unwrap_or(self.segments[0]);
        secs + ticks_to_secs(tick - start, bpm)
    }

    /// Fractional tick at `seconds`.
    pub fn seconds_to_ticks(&self, seconds: f64) -> f64 {
        let (start, secs, bpm) = self
            .segments
            .iter()
            .rev()
            .find(|(_, at, _)| *at <= seconds)
            .copied()
            .unwrap_or(self.segments[0]);
        start as f64 + (seconds - secs) * bpm / 60.0 * TICKS_PER_BEAT as f64
    }

    /// Whether the map has a single tempo.
    pub fn is_constant(&self) -> bool {
        self.segments
            .windows(2)
            .all(|w| (w[0].2 - w[1].2).abs() < f64::EPSILON)
    }
}

fn ticks_to_secs(ticks: i64, bpm: f64) -> f64 {
    ticks as f64 / TICKS_PER_BEAT as f64 * 60.0 / bpm
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tempo(position: i64, bpm: f64) -> SongTempo {
        SongTempo { position, bpm }
    }

    #[test]
    fn test_default_tempo() {
        let map = TempoMap::new(&[]);
        assert_eq!(map.ticks_to_seconds(480), 0.5);
        assert!(map.is_constant());
    }

    #[test]
    fn test_tempo_change() {
        let map = TempoMap::new(&[tempo(0, 120.0), tempo(960, 60.0)]);
        assert_eq!(map.ticks_to_seconds(960), 1.0);
        assert_eq!(map.ticks_to_seconds(1440), 2.0);
        assert_eq!(map.seconds_to_ticks(2.0), 1440.0);
        assert!(!map.is_constant());
    }

    #[test]
    fn test_late_first_tempo_applies_from_start() {
        let map = TempoMap::new(&[tempo(480, 60.0)]);
        assert_eq!(map.ticks_to_seconds(480), 1.0);
    }

    #[test]
    fn test_track_tagging_in_json() {
        let project = Project {
            tracks: vec![Track::Singing(SingingTrack {
                title: "Vocal".to_string(),
                ..Default::default()
            })],
            ..Default::default()
        };
        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["tracks"][0]["type"], "singing");
        assert_eq!(project.tracks[0].title(), "Vocal");
    }
}
