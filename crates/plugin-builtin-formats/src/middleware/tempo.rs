//! Tempo normalization.
//!
//! Every position is moved from the project's own tempo map onto a single
//! constant tempo so that each note still starts and ends at the same time
//! in seconds.

use serde::{Deserialize, Serialize};
use voxconv_plugin::project::{SongTempo, TempoMap, Track};
use voxconv_plugin::{
    MiddlewareInfo, MiddlewarePlugin, OptionSchema, OptionSet, PluginError, Project,
    SchemaBuilder, WarningSink,
};

/// Options of [`NormalizeTempo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeTempoOptions {
    /// Tempo of the rewritten project.
    pub target_bpm: f64,
}

impl Default for NormalizeTempoOptions {
    fn default() -> Self {
        Self { target_bpm: 120.0 }
    }
}

impl OptionSet for NormalizeTempoOptions {
    fn schema() -> OptionSchema {
        SchemaBuilder::new::<Self>("NormalizeTempoOptions")
            .float("target_bpm", "Target tempo (BPM)")
            .float_range(20.0, 300.0)
            .build()
    }
}

/// `normalize_tempo` middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeTempo;

impl MiddlewarePlugin for NormalizeTempo {
    type Options = NormalizeTempoOptions;

    fn info(&self) -> MiddlewareInfo {
        MiddlewareInfo {
            id: "normalize_tempo".to_string(),
            display_name: "Normalize tempo".to_string(),
            description: "Rewrite the project at one constant tempo, keeping note timing"
                .to_string(),
        }
    }

    fn process(
        &self,
        mut project: Project,
        options: NormalizeTempoOptions,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Project, PluginError> {
        if !options.target_bpm.is_finite() || options.target_bpm <= 0.0 {
            return Err(PluginError::invalid_options(format!(
                "target tempo must be positive, got {}",
                options.target_bpm
            )));
        }

        let source = project.tempo_map();
        let target = TempoMap::new(&[SongTempo {
            position: 0,
            bpm: options.target_bpm,
        }]);
        let remap = |tick: i64| target.seconds_to_ticks(source.ticks_to_seconds(tick)).round() as i64;

        let mut collapsed = 0usize;
        for track in &mut project.tracks {
            match track {
                Track::Singing(singing) => {
                    for note in &mut singing.notes {
                        let end_pos = note.end_pos().ok_or_else(|| {
                            PluginError::invalid_data(format!(
                                "note '{}' at tick {} ends past the last tick",
                                note.lyric, note.start_pos
                            ))
                        })?;
                        let start = remap(note.start_pos);
                        let end = remap(end_pos);
                        if end <= start {
                            collapsed += 1;
                        }
                        note.start_pos = start;
                        note.length = end.saturating_sub(start).max(1);
                    }
                }
                Track::Instrumental(instrumental) => {
                    instrumental.offset = remap(instrumental.offset);
                }
            }
        }

        if !source.is_constant() && project.time_signatures.len() > 1 {
            warnings.warn("Bar lines of later time signatures may no longer line up");
        }
        if collapsed > 0 {
            warnings.warn(format!(
                "{collapsed} note(s) became shorter than one tick and were extended"
            ));
        }

        project.song_tempos = vec![SongTempo {
            position: 0,
            bpm: options.target_bpm,
        }];
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxconv_plugin::project::{InstrumentalTrack, Note, SingingTrack};
    use voxconv_plugin::{Diagnostics, Phase};

    fn project() -> Project {
        Project {
            song_tempos: vec![
                SongTempo {
                    position: 0,
                    bpm: 60.0,
                },
                SongTempo {
                    position: 960,
                    bpm: 120.0,
                },
            ],
            tracks: vec![
                Track::Singing(SingingTrack {
                    notes: vec![
                        Note {
                            start_pos: 480,
                            length: 480,
                            key_number: 60,
                            lyric: "a".to_string(),
                            pronunciation: None,
                        },
                        Note {
                            start_pos: 960,
                            length: 960,
                            key_number: 62,
                            lyric: "b".to_string(),
                            pronunciation: None,
                        },
                    ],
                    ..Default::default()
                }),
                Track::Instrumental(InstrumentalTrack {
                    offset: 960,
                    ..Default::default()
                }),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_positions_keep_their_time() {
        let input = project();
        let source = input.tempo_map();
        let mut diagnostics = Diagnostics::new();
        let out = NormalizeTempo
            .process(
                input.clone(),
                NormalizeTempoOptions::default(),
                &mut diagnostics.sink(Phase::Middleware, "normalize_tempo"),
            )
            .unwrap();

        assert_eq!(out.song_tempos.len(), 1);
        let target = out.tempo_map();
        let before: Vec<_> = input.singing_tracks().flat_map(|t| t.notes.clone()).collect();
        let after: Vec<_> = out.singing_tracks().flat_map(|t| t.notes.clone()).collect();
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(
                source.ticks_to_seconds(b.start_pos),
                target.ticks_to_seconds(a.start_pos)
            );
        }
        // 60 bpm for the first 960 ticks doubles their length at 120 bpm
        assert_eq!(after[0].start_pos, 960);
        assert_eq!(after[0].length, 960);
        assert_eq!(after[1].start_pos, 1920);
        assert_eq!(after[1].length, 960);

        let Track::Instrumental(backing) = &out.tracks[1] else {
            panic!("expected instrumental track");
        };
        assert_eq!(backing.offset, 1920);
    }

    #[test]
    fn test_rejects_non_positive_target() {
        let mut diagnostics = Diagnostics::new();
        let err = NormalizeTempo
            .process(
                project(),
                NormalizeTempoOptions { target_bpm: 0.0 },
                &mut diagnostics.sink(Phase::Middleware, "normalize_tempo"),
            )
            .unwrap_err();
        assert_eq!(err.kind, voxconv_plugin::PluginErrorKind::InvalidOptions);
    }

    fn single_note(start_pos: i64, length: i64) -> Project {
        Project {
            tracks: vec![Track::Singing(SingingTrack {
                notes: vec![Note {
                    start_pos,
                    length,
                    key_number: 60,
                    lyric: "la".to_string(),
                    pronunciation: None,
                }],
                ..Default::default()
            })],
            ..Default::default()
        }
    }

    #[test]
    fn test_note_past_last_tick_is_rejected() {
        let mut diagnostics = Diagnostics::new();
        let err = NormalizeTempo
            .process(
                single_note(i64::MAX - 10, 480),
                NormalizeTempoOptions::default(),
                &mut diagnostics.sink(Phase::Middleware, "normalize_tempo"),
            )
            .unwrap_err();
        assert_eq!(err.kind, voxconv_plugin::PluginErrorKind::InvalidData);
    }

    #[test]
    fn test_extreme_positions_do_not_overflow() {
        let mut diagnostics = Diagnostics::new();
        let out = NormalizeTempo
            .process(
                single_note(i64::MIN, i64::MAX),
                NormalizeTempoOptions { target_bpm: 300.0 },
                &mut diagnostics.sink(Phase::Middleware, "normalize_tempo"),
            )
            .unwrap();
        let note = &out.singing_tracks().next().unwrap().notes[0];
        assert!(note.length >= 1);
    }
}
