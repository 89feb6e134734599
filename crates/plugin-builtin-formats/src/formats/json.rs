//! The shared project model serialized as JSON.

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use tracing::debug;
use voxconv_plugin::project::Track;
use voxconv_plugin::{
    Capabilities, FormatPlugin, OptionSchema, OptionSet, PluginError, PluginInfo, Project,
    SchemaBuilder, WarningSink,
};

/// Load options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonInputOptions {
    /// Drop singing tracks without notes.
    pub ignore_empty_tracks: bool,
}

impl OptionSet for JsonInputOptions {
    fn schema() -> OptionSchema {
        SchemaBuilder::new::<Self>("JsonInputOptions")
            .boolean("ignore_empty_tracks", "Ignore empty tracks")
            .describe("Singing tracks without any notes are not imported")
            .build()
    }
}

/// Dump options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonOutputOptions {
    /// Spaces per indentation level; 0 writes compact JSON.
    pub indent: i64,
}

impl Default for JsonOutputOptions {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl OptionSet for JsonOutputOptions {
    fn schema() -> OptionSchema {
        SchemaBuilder::new::<Self>("JsonOutputOptions")
            .integer("indent", "Indentation")
            .range(0, 8)
            .describe("0 writes everything on one line")
            .build()
    }
}

/// `json` format plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl FormatPlugin for JsonFormat {
    type LoadOptions = JsonInputOptions;
    type DumpOptions = JsonOutputOptions;

    fn info(&self) -> PluginInfo {
        PluginInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: "voxconv Team".to_string(),
            description: "Project model as JSON, lossless".to_string(),
            ..PluginInfo::new("json", "voxconv JSON project", Capabilities::ReadWrite)
        }
    }

    fn load(
        &self,
        bytes: &[u8],
        options: JsonInputOptions,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Project, PluginError> {
        let mut project: Project = serde_json::from_slice(bytes)?;

        for track in project.singing_tracks_mut() {
            let before = track.notes.len();
            track.notes.retain(|note| note.length > 0);
            let dropped = before - track.notes.len();
            if dropped > 0 {
                warnings.warn(format!(
                    "Dropped {dropped} note(s) with non-positive length from '{}'",
                    track.title
                ));
            }
            track.notes.sort_by_key(|note| note.start_pos);
        }

        if options.ignore_empty_tracks {
            project.tracks.retain(|track| match track {
                Track::Singing(singing) => !singing.notes.is_empty(),
                Track::Instrumental(_) => true,
            });
        }

        project.song_tempos.sort_by_key(|tempo| tempo.position);
        project.time_signatures.sort_by_key(|sig| sig.bar_index);
        debug!(
            tracks = project.tracks.len(),
            notes = project.note_count(),
            "JSON project parsed"
        );
        Ok(project)
    }

    fn dump(
        &self,
        project: &Project,
        options: JsonOutputOptions,
        _warnings: &mut WarningSink<'_>,
    ) -> Result<Vec<u8>, PluginError> {
        if options.indent <= 0 {
            return Ok(serde_json::to_vec(project)?);
        }
        let indent = " ".repeat(options.indent as usize);
        let mut buffer = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(
            &mut buffer,
            PrettyFormatter::with_indent(indent.as_bytes()),
        );
        project.serialize(&mut serializer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxconv_plugin::project::{Note, SingingTrack, SongTempo};
    use voxconv_plugin::{Diagnostics, Phase};

    fn note(start_pos: i64, length: i64, lyric: &str) -> Note {
        Note {
            start_pos,
            length,
            key_number: 64,
            lyric: lyric.to_string(),
            pronunciation: None,
        }
    }

    fn project() -> Project {
        Project {
            song_tempos: vec![SongTempo {
                position: 0,
                bpm: 140.0,
            }],
            tracks: vec![
                Track::Singing(SingingTrack {
                    title: "Lead".to_string(),
                    notes: vec![note(0, 240, "ka"), note(240, 240, "ze")],
                    ..Default::default()
                }),
                Track::Singing(SingingTrack {
                    title: "Empty".to_string(),
                    ..Default::default()
                }),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_round_trip_keeps_shape() {
        let mut diagnostics = Diagnostics::new();
        let bytes = JsonFormat
            .dump(
                &project(),
                JsonOutputOptions::default(),
                &mut diagnostics.sink(Phase::Dump, "json"),
            )
            .unwrap();
        let loaded = JsonFormat
            .load(
                &bytes,
                JsonInputOptions::default(),
                &mut diagnostics.sink(Phase::Load, "json"),
            )
            .unwrap();
        assert_eq!(loaded, project());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_indent_option() {
        let mut diagnostics = Diagnostics::new();
        let mut sink = diagnostics.sink(Phase::Dump, "json");
        let compact = JsonFormat
            .dump(&project(), JsonOutputOptions { indent: 0 }, &mut sink)
            .unwrap();
        assert!(!compact.contains(&b'\n'));

        let pretty = JsonFormat
            .dump(&project(), JsonOutputOptions { indent: 4 }, &mut sink)
            .unwrap();
        let text = String::from_utf8(pretty).unwrap();
        assert!(text.contains("\n    \"song_tempos\""));
    }

    #[test]
    fn test_load_drops_bad_notes_and_empty_tracks() {
        let mut input = project();
        if let Track::Singing(track) = &mut input.tracks[0] {
            track.notes.push(note(480, 0, "x"));
        }
        let bytes = serde_json::to_vec(&input).unwrap();

        let mut diagnostics = Diagnostics::new();
        let loaded = JsonFormat
            .load(
                &bytes,
                JsonInputOptions {
                    ignore_empty_tracks: true,
                },
                &mut diagnostics.sink(Phase::Load, "json"),
            )
            .unwrap();

        assert_eq!(loaded.tracks.len(), 1);
        assert_eq!(loaded.note_count(), 2);
        let warnings = diagnostics.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("'Lead'"));
    }

    #[test]
    fn test_malformed_input() {
        let mut diagnostics = Diagnostics::new();
        let err = JsonFormat
            .load(
                b"{not json",
                JsonInputOptions::default(),
                &mut diagnostics.sink(Phase::Load, "json"),
            )
            .unwrap_err();
        assert_eq!(err.kind, voxconv_plugin::PluginErrorKind::InvalidData);
    }
}
