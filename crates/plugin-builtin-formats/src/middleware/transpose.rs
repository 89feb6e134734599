//! Key transposition.

use serde::{Deserialize, Serialize};
use voxconv_plugin::{
    MiddlewareInfo, MiddlewarePlugin, OptionSchema, OptionSet, PluginError, Project,
    SchemaBuilder, WarningSink,
};

const MIN_KEY: i32 = 0;
const MAX_KEY: i32 = 127;

/// Options of [`TransposeKey`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransposeOptions {
    /// Semitones to shift by; negative lowers.
    pub semitones: i64,
}

impl OptionSet for TransposeOptions {
    fn schema() -> OptionSchema {
        SchemaBuilder::new::<Self>("TransposeOptions")
            .integer("semitones", "Semitones")
            .range(-24, 24)
            .build()
    }
}

/// `transpose_key` middleware.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransposeKey;

impl MiddlewarePlugin for TransposeKey {
    type Options = TransposeOptions;

    fn info(&self) -> MiddlewareInfo {
        MiddlewareInfo {
            id: "transpose_key".to_string(),
            display_name: "Transpose".to_string(),
            description: "Shift every note by a number of semitones".to_string(),
        }
    }

    fn process(
        &self,
        mut project: Project,
        options: TransposeOptions,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Project, PluginError> {
        if options.semitones == 0 {
            return Ok(project);
        }
        let shift = i32::try_from(options.semitones)
            .map_err(|_| PluginError::invalid_options("semitones out of range"))?;

        let mut clipped = 0usize;
        for track in project.singing_tracks_mut() {
            for note in &mut track.notes {
                let key = note.key_number.saturating_add(shift);
                if !(MIN_KEY..=MAX_KEY).contains(&key) {
                    clipped += 1;
                }
                note.key_number = key.clamp(MIN_KEY, MAX_KEY);
            }
        }
        if clipped > 0 {
            warnings.warn(format!(
                "{clipped} note(s) left the MIDI key range and were clamped"
            ));
        }
        Ok(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxconv_plugin::project::{Note, SingingTrack, Track};
    use voxconv_plugin::{Diagnostics, Phase};

    fn project(keys: &[i32]) -> Project {
        let notes = keys
            .iter()
            .enumerate()
            .map(|(i, &key_number)| Note {
                start_pos: i as i64 * 480,
                length: 480,
                key_number,
                lyric: "a".to_string(),
                pronunciation: None,
            })
            .collect();
        Project {
            tracks: vec![Track::Singing(SingingTrack {
                notes,
                ..Default::default()
            })],
            ..Default::default()
        }
    }

    fn keys(project: &Project) -> Vec<i32> {
        project
            .singing_tracks()
            .flat_map(|t| t.notes.iter().map(|n| n.key_number))
            .collect()
    }

    #[test]
    fn test_shift_up() {
        let mut diagnostics = Diagnostics::new();
        let out = TransposeKey
            .process(
                project(&[60, 64]),
                TransposeOptions { semitones: 12 },
                &mut diagnostics.sink(Phase::Middleware, "transpose_key"),
            )
            .unwrap();
        assert_eq!(keys(&out), vec![72, 76]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_clamp_warns() {
        let mut diagnostics = Diagnostics::new();
        let out = TransposeKey
            .process(
                project(&[2, 60, 125]),
                TransposeOptions { semitones: -5 },
                &mut diagnostics.sink(Phase::Middleware, "transpose_key"),
            )
            .unwrap();
        assert_eq!(keys(&out), vec![0, 55, 120]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_zero_is_identity() {
        let mut diagnostics = Diagnostics::new();
        let input = project(&[60]);
        let out = TransposeKey
            .process(
                input.clone(),
                TransposeOptions::default(),
                &mut diagnostics.sink(Phase::Middleware, "transpose_key"),
            )
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_extreme_keys_are_clamped() {
        let mut diagnostics = Diagnostics::new();
        let out = TransposeKey
            .process(
                project(&[i32::MAX, i32::MIN]),
                TransposeOptions { semitones: 1 },
                &mut diagnostics.sink(Phase::Middleware, "transpose_key"),
            )
            .unwrap();
        assert_eq!(keys(&out), vec![MAX_KEY, MIN_KEY]);
        assert_eq!(diagnostics.len(), 1);
    }
}
