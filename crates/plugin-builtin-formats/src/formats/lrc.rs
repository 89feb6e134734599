//! Timed lyrics (`.lrc`) export.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumMessage, VariantArray};
use tracing::debug;
use voxconv_plugin::project::{Note, SingingTrack, TICKS_PER_BEAT, TimeSignature};
use voxconv_plugin::{
    Capabilities, FormatPlugin, NoOptions, OptionSchema, OptionSet, PluginError, PluginInfo,
    Project, SchemaBuilder, WarningSink,
};

/// Where a new lyric line starts.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    AsRefStr,
    EnumMessage,
    VariantArray,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SplitMode {
    /// After punctuation or at a bar line, whichever comes first.
    #[default]
    #[strum(message = "Punctuation and bar lines")]
    Both,
    /// After punctuation only.
    #[strum(message = "Punctuation")]
    Symbol,
    /// At bar lines only.
    #[strum(message = "Bar lines")]
    Bar,
}

/// Dump options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrcOptions {
    /// Shift applied to every timestamp.
    pub offset_ms: i64,
    /// Line break rule.
    pub split_by: SplitMode,
    /// `[ti:]` tag.
    pub title: String,
    /// `[ar:]` tag.
    pub artist: String,
}

impl OptionSet for LrcOptions {
    fn schema() -> OptionSchema {
        SchemaBuilder::new::<Self>("LrcOptions")
            .integer("offset_ms", "Offset (ms)")
            .range(-60_000, 60_000)
            .describe("Positive values delay the lyrics")
            .enumeration::<SplitMode>("split_by", "Line break rule")
            .string("title", "Title")
            .string("artist", "Artist")
            .build()
    }
}

/// `lrc` format plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct LrcFormat;

impl FormatPlugin for LrcFormat {
    type LoadOptions = NoOptions;
    type DumpOptions = LrcOptions;

    fn info(&self) -> PluginInfo {
        PluginInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: "voxconv Team".to_string(),
            description: "Lyrics with line timestamps".to_string(),
            ..PluginInfo::new("lrc", "LRC lyrics", Capabilities::WriteOnly)
        }
    }

    fn dump(
        &self,
        project: &Project,
        options: LrcOptions,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Vec<u8>, PluginError> {
        let mut voiced = project.singing_tracks().filter(|t| !t.notes.is_empty());
        let track = voiced
            .next()
            .ok_or_else(|| PluginError::invalid_data("No singing track with notes"))?;
        let skipped = voiced.count();
        if skipped > 0 {
            warnings.warn(format!(
                "Only '{}' was exported; {skipped} other track(s) skipped",
                track.title
            ));
        }

        let bars = BarGrid::new(&project.time_signatures);
        let tempo = project.tempo_map();
        let mut output = String::new();
        if !options.title.is_empty() {
            output.push_str(&format!("[ti:{}]\n", options.title));
        }
        if !options.artist.is_empty() {
            output.push_str(&format!("[ar:{}]\n", options.artist));
        }

        let lines = split_lines(track, options.split_by, &bars);
        debug!(track = %track.title, lines = lines.len(), "Lyric lines split");
        let mut clamped = false;
        for line in lines {
            let millis = ((tempo.ticks_to_seconds(line.start) * 1000.0).round() as i64)
                .saturating_add(options.offset_ms);
            if millis < 0 {
                clamped = true;
            }
            output.push_str(&format!("[{}]{}\n", timestamp(millis.max(0)), line.text));
        }
        if clamped {
            warnings.warn("Negative timestamps were clamped to 00:00.00");
        }
        Ok(output.into_bytes())
    }
}

struct Line {
    start: i64,
    text: String,
}

fn split_lines(track: &SingingTrack, mode: SplitMode, bars: &BarGrid) -> Vec<Line> {
    let split_on_symbol = matches!(mode, SplitMode::Both | SplitMode::Symbol);
    let split_on_bar = matches!(mode, SplitMode::Both | SplitMode::Bar);

    let mut lines: Vec<Line> = Vec::new();
    let mut current: Option<(Line, i64)> = None;
    let mut break_pending = false;

    for note in track.notes.iter().filter(|n| !is_continuation(n)) {
        let bar = bars.bar_at(note.start_pos);
        let new_line = match &current {
            None => true,
            Some((_, line_bar)) => {
                (split_on_symbol && break_pending) || (split_on_bar && bar != *line_bar)
            }
        };
        if new_line {
            if let Some((line, _)) = current.take() {
                lines.push(line);
            }
            current = Some((
                Line {
                    start: note.start_pos,
                    text: String::new(),
                },
                bar,
            ));
        }
        if let Some((line, _)) = current.as_mut() {
            append_lyric(&mut line.text, note.lyric.trim());
        }
        break_pending = ends_with_symbol(&note.lyric);
    }
    if let Some((line, _)) = current {
        lines.push(line);
    }
    lines
}

fn is_continuation(note: &Note) -> bool {
    matches!(note.lyric.trim(), "-" | "+" | "")
}

fn append_lyric(text: &mut String, lyric: &str) {
    let latin = |c: char| c.is_ascii_alphanumeric() || c == '\'';
    let needs_space = text.chars().last().is_some_and(latin)
        && lyric.chars().next().is_some_and(latin);
    if needs_space {
        text.push(' ');
    }
    text.push_str(lyric);
}

fn ends_with_symbol(lyric: &str) -> bool {
    lyric.trim_end().chars().last().is_some_and(|c| {
        matches!(
            c,
            ',' | '.' | '!' | '?' | ';' | '，' | '。' | '！' | '？' | '、' | '；' | '…'
        )
    })
}

fn timestamp(millis: i64) -> String {
    let centis = millis / 10;
    format!(
        "{:02}:{:02}.{:02}",
        centis / 6000,
        centis / 100 % 60,
        centis % 100
    )
}

/// Tick → bar index under a list of time signature changes.
struct BarGrid {
    /// `(first bar, first tick, ticks per bar)` sorted by bar.
    segments: Vec<(i64, i64, i64)>,
}

impl BarGrid {
    fn new(signatures: &[TimeSignature]) -> Self {
        let mut sorted: Vec<&TimeSignature> = signatures
            .iter()
            .filter(|s| s.numerator > 0 && s.denominator > 0)
            .collect();
        sorted.sort_by_key(|s| s.bar_index);

        let mut segments: Vec<(i64, i64, i64)> = vec![(0, 0, bar_length(4, 4))];
        for sig in sorted {
            let bar = sig.bar_index.max(0);
            let (first_bar, first_tick, length) = segments[segments.len() - 1];
            let tick = first_tick.saturating_add((bar - first_bar).saturating_mul(length));
            if bar == first_bar {
                segments.pop();
            }
            segments.push((bar, tick, bar_length(sig.numerator, sig.denominator)));
        }
        Self { segments }
    }

    fn bar_at(&self, tick: i64) -> i64 {
        let (first_bar, first_tick, length) = self
            .segments
            .iter()
            .rev()
            .find(|(_, start, _)| *start <= tick)
            .copied()
            .unwrap_or(self.segments[0]);
        first_bar.saturating_add((tick - first_tick).div_euclid(length))
    }
}

fn bar_length(numerator: u8, denominator: u8) -> i64 {
    TICKS_PER_BEAT * 4 * i64::from(numerator) / i64::from(denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxconv_plugin::project::{SongTempo, Track};
    use voxconv_plugin::{Diagnostics, Phase};

    fn note(start_pos: i64, lyric: &str) -> Note {
        Note {
            start_pos,
            length: 240,
            key_number: 60,
            lyric: lyric.to_string(),
            pronunciation: None,
        }
    }

    fn project(notes: Vec<Note>) -> Project {
        Project {
            song_tempos: vec![SongTempo {
                position: 0,
                bpm: 120.0,
            }],
            tracks: vec![Track::Singing(SingingTrack {
                title: "Lead".to_string(),
                notes,
                ..Default::default()
            })],
            ..Default::default()
        }
    }

    fn dump(project: &Project, options: LrcOptions) -> (String, Vec<String>) {
        let mut diagnostics = Diagnostics::new();
        let bytes = LrcFormat
            .dump(project, options, &mut diagnostics.sink(Phase::Dump, "lrc"))
            .unwrap();
        let warnings = diagnostics
            .into_warnings()
            .into_iter()
            .map(|w| w.message)
            .collect();
        (String::from_utf8(bytes).unwrap(), warnings)
    }

    #[test]
    fn test_split_on_symbol_and_bar() {
        // one bar of 4/4 at 120 bpm is 1920 ticks = 2 s
        let notes = vec![
            note(0, "hel"),
            note(240, "lo,"),
            note(480, "world"),
            note(1920, "again"),
            note(2160, "-"),
        ];
        let (text, warnings) = dump(&project(notes), LrcOptions::default());
        assert_eq!(
            text,
            "[00:00.00]hel lo,\n[00:00.50]world\n[00:02.00]again\n"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_split_by_bar_only_keeps_punctuation_inline() {
        let notes = vec![note(0, "你"), note(240, "好，"), note(480, "世界")];
        let options = LrcOptions {
            split_by: SplitMode::Bar,
            ..Default::default()
        };
        let (text, _) = dump(&project(notes), options);
        assert_eq!(text, "[00:00.00]你好，世界\n");
    }

    #[test]
    fn test_tags_and_offset() {
        let options = LrcOptions {
            offset_ms: -250,
            title: "Song".to_string(),
            artist: "Someone".to_string(),
            ..Default::default()
        };
        let (text, warnings) = dump(&project(vec![note(0, "a"), note(1920, "b")]), options);
        assert_eq!(
            text,
            "[ti:Song]\n[ar:Someone]\n[00:00.00]a\n[00:01.75]b\n"
        );
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_no_notes_fails() {
        let mut diagnostics = Diagnostics::new();
        let err = LrcFormat
            .dump(
                &project(Vec::new()),
                LrcOptions::default(),
                &mut diagnostics.sink(Phase::Dump, "lrc"),
            )
            .unwrap_err();
        assert_eq!(err.kind, voxconv_plugin::PluginErrorKind::InvalidData);
    }

    #[test]
    fn test_bar_grid_with_signature_change() {
        let grid = BarGrid::new(&[TimeSignature {
            bar_index: 1,
            numerator: 3,
            denominator: 4,
        }]);
        assert_eq!(grid.bar_at(1919), 0);
        assert_eq!(grid.bar_at(1920), 1);
        assert_eq!(grid.bar_at(1920 + 1440), 2);
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(timestamp(0), "00:00.00");
        assert_eq!(timestamp(61_230), "01:01.23");
    }

    #[test]
    fn test_cannot_load() {
        let mut diagnostics = Diagnostics::new();
        let err = LrcFormat
            .load(b"[00:00.00]x", NoOptions {}, &mut diagnostics.sink(Phase::Load, "lrc"))
            .unwrap_err();
        assert_eq!(err.kind, voxconv_plugin::PluginErrorKind::Unsupported);
    }
}
