//! File conversion command.
//!
//! A single file goes through a wizard session, the same flow an
//! interactive front end drives. Several files share one workspace and are
//! converted as a batch; a failed file does not stop the others.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, info};

use super::Context;
use crate::output;
use voxconv_core::error::{AppError, ErrorKind};
use voxconv_pipeline::{
    ConversionPipeline, ConversionReport, ConversionRequest, ConvertError,
    MiddlewareStep, Wizard, WizardError, WizardStep,
};
use voxconv_plugin::{Direction, PluginRegistry, StagedOptions, Translator};
use voxconv_workspace::VirtualWorkspace;

/// Arguments for the convert command
#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Input format ID; detected from the file extension when omitted
    #[arg(long)]
    pub from: Option<String>,

    /// Output format ID
    #[arg(long)]
    pub to: String,

    /// Load option (repeatable); dotted keys address nested fields
    #[arg(short = 'i', long = "input-option", value_name = "KEY=VALUE")]
    pub input_options: Vec<String>,

    /// Dump option (repeatable); dotted keys address nested fields
    #[arg(short = 'o', long = "output-option", value_name = "KEY=VALUE")]
    pub output_options: Vec<String>,

    /// Enable a middleware with comma separated options (repeatable).
    /// Middleware runs in registration order
    #[arg(short = 'm', long = "middleware", value_name = "ID[:KEY=VALUE,...]")]
    pub middleware: Vec<String>,

    /// Directory converted files are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Write every converted file into this zip archive instead
    #[arg(long)]
    pub zip: Option<PathBuf>,

    /// Project files to convert
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Per-file result row
#[derive(Debug, Serialize, Tabled)]
struct ResultRow {
    /// Input file
    input: String,
    /// Output file
    output: String,
    /// Output size in bytes
    size: String,
    /// Warning count
    warnings: usize,
    /// Outcome
    status: String,
}

impl ResultRow {
    fn new(
        input: &str,
        result: &Result<ConversionReport, ConvertError>,
        translator: &dyn Translator,
    ) -> Self {
        match result {
            Ok(report) => Self {
                input: input.to_string(),
                output: report.output_file_name.clone(),
                size: report.output_size.to_string(),
                warnings: report.warnings.len(),
                status: "ok".to_string(),
            },
            Err(e) => Self {
                input: input.to_string(),
                output: String::new(),
                size: String::new(),
                warnings: 0,
                status: e.localized_message(translator),
            },
        }
    }
}

/// Raw options parsed from the command line.
#[derive(Debug, Default)]
struct StagedArgs {
    input: StagedOptions,
    output: StagedOptions,
    middleware: Vec<(String, StagedOptions)>,
}

impl StagedArgs {
    fn parse(args: &ConvertArgs) -> Result<Self, AppError> {
        let input =
            StagedOptions::from_assignments(args.input_options.iter().map(String::as_str))?;
        let output =
            StagedOptions::from_assignments(args.output_options.iter().map(String::as_str))?;
        let middleware = args
            .middleware
            .iter()
            .map(String::as_str)
            .map(parse_middleware)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            input,
            output,
            middleware,
        })
    }
}

/// One file read from disk.
struct Upload {
    name: String,
    content: Bytes,
}

/// Execute the convert command
pub async fn execute(args: &ConvertArgs, ctx: &Context) -> Result<(), AppError> {
    let staged = StagedArgs::parse(args)?;
    let uploads = read_uploads(&args.files, ctx.config.workspace.max_upload_bytes).await?;
    let pipeline = ConversionPipeline::new(ctx.registry.clone(), ctx.config.conversion.clone());

    let (outputs, failed) = if let [upload] = uploads.as_slice() {
        let wizard = Wizard::new(pipeline.clone(), &ctx.config.workspace);
        let output = convert_single(&wizard, ctx, args, &staged, upload)?;
        (vec![output], 0)
    } else {
        convert_batch(&pipeline, ctx, args, &staged, &uploads)?
    };
    debug!(metrics = ?pipeline.metrics().snapshot(), "Conversion metrics");

    write_outputs(args, &outputs).await?;
    output::print_summary(uploads.len() - failed, failed);

    if failed > 0 {
        return Err(AppError::plugin(format!(
            "{failed} of {} file(s) failed to convert",
            uploads.len()
        )));
    }
    Ok(())
}

fn convert_single(
    wizard: &Wizard,
    ctx: &Context,
    args: &ConvertArgs,
    staged: &StagedArgs,
    upload: &Upload,
) -> Result<(String, Bytes), AppError> {
    let mut session = wizard.new_session();
    wizard.upload(&mut session, &upload.name, upload.content.clone())?;

    match &args.from {
        Some(from) => wizard.select_input(&mut session, from)?,
        None if session.state().input_plugin().is_none() => {
            return Err(undetected_input(&upload.name));
        }
        None => {}
    }
    wizard.select_output(&mut session, &args.to)?;
    wizard.go_to(&mut session, WizardStep::ConfiguringOptions)?;

    for (key, value) in staged.input.iter() {
        wizard.stage_input_option(&mut session, key, value.clone())?;
    }
    for (key, value) in staged.output.iter() {
        wizard.stage_output_option(&mut session, key, value.clone())?;
    }
    for (id, options) in &staged.middleware {
        wizard.configure_middleware(&mut session, id, options.clone(), true)?;
    }

    let outcome = wizard.convert(&mut session)?;
    let row = ResultRow::new(&upload.name, &outcome.result, ctx.translator.as_ref());
    let result = outcome.result.clone();
    report(ctx, &[row], result.iter().flat_map(|r| &r.warnings));
    if let Err(e) = result {
        return Err(e.into());
    }

    Ok(wizard.download(&session)?)
}

fn convert_batch(
    pipeline: &ConversionPipeline,
    ctx: &Context,
    args: &ConvertArgs,
    staged: &StagedArgs,
    uploads: &[Upload],
) -> Result<(Vec<(String, Bytes)>, usize), AppError> {
    let registry = pipeline.registry();
    let middleware = middleware_chain(registry, &staged.middleware)?;
    let workspace = VirtualWorkspace::new();

    let mut requests = Vec::with_capacity(uploads.len());
    for upload in uploads {
        if workspace.exists(&upload.name) {
            return Err(AppError::validation(format!(
                "More than one input is named '{}'",
                upload.name
            )));
        }
        let input_plugin = match &args.from {
            Some(from) => from.clone(),
            None => detect_input(registry, &upload.name)?,
        };
        workspace.write(upload.name.as_str(), upload.content.clone());
        requests.push(ConversionRequest {
            input_plugin,
            output_plugin: args.to.clone(),
            input_file_name: upload.name.clone(),
            input_options: staged.input.clone(),
            output_options: staged.output.clone(),
            middleware: middleware.clone(),
        });
    }

    let batch = pipeline.convert_batch(&workspace, &requests);
    let rows: Vec<ResultRow> = batch
        .items
        .iter()
        .map(|item| ResultRow::new(&item.input_file_name, &item.result, ctx.translator.as_ref()))
        .collect();
    let warnings = batch
        .items
        .iter()
        .filter_map(|item| item.result.as_ref().ok())
        .flat_map(|report| &report.warnings);
    report(ctx, &rows, warnings);

    let failed = batch.items.iter().filter(|item| item.result.is_err()).count();
    let mut outputs = Vec::new();
    for name in batch.output_file_names() {
        let content = workspace.read(&name)?;
        outputs.push((name, content));
    }
    Ok((outputs, failed))
}

fn report<'a>(
    ctx: &Context,
    rows: &[ResultRow],
    warnings: impl Iterator<Item = &'a voxconv_plugin::ConversionWarning>,
) {
    output::print_warnings(warnings);
    output::print_rows(rows, ctx.format, "No files converted.");
}

/// Every registered middleware in registration order, with the requested
/// ones enabled.
fn middleware_chain(
    registry: &PluginRegistry,
    requested: &[(String, StagedOptions)],
) -> Result<Vec<MiddlewareStep>, AppError> {
    let mut chain: Vec<MiddlewareStep> = registry
        .list_middleware()
        .iter()
        .map(|id| MiddlewareStep::disabled(id))
        .collect();
    for (id, options) in requested {
        registry.middleware(id)?;
        if let Some(step) = chain.iter_mut().find(|step| step.id == *id) {
            step.options = options.clone();
            step.enabled = true;
        }
    }
    Ok(chain)
}

/// Parses `id[:key=value,...]`.
fn parse_middleware(entry: &str) -> Result<(String, StagedOptions), AppError> {
    let (id, assignments) = match entry.split_once(':') {
        Some((id, rest)) => (id.trim(), rest.trim()),
        None => (entry.trim(), ""),
    };
    if id.is_empty() {
        return Err(AppError::validation(format!(
            "Missing middleware id in '{entry}'"
        )));
    }
    let options = if assignments.is_empty() {
        StagedOptions::new()
    } else {
        StagedOptions::from_assignments(assignments.split(','))?
    };
    Ok((id.to_string(), options))
}

fn detect_input(registry: &PluginRegistry, file_name: &str) -> Result<String, AppError> {
    file_name
        .rsplit_once('.')
        .and_then(|(_, extension)| registry.find_by_suffix(extension, Direction::Input))
        .map(|descriptor| descriptor.id.clone())
        .ok_or_else(|| undetected_input(file_name))
}

fn undetected_input(file_name: &str) -> AppError {
    AppError::validation(format!(
        "Cannot detect the input format of '{file_name}'; pass --from"
    ))
}

async fn read_uploads(files: &[PathBuf], limit: u64) -> Result<Vec<Upload>, AppError> {
    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        let name = file_name(path)?;
        let content = tokio::fs::read(path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read '{}'", path.display()),
                e,
            )
        })?;
        let size = content.len() as u64;
        if size > limit {
            return Err(WizardError::UploadTooLarge { size, limit }.into());
        }
        info!(file = %path.display(), size, "Read input");
        uploads.push(Upload {
            name,
            content: Bytes::from(content),
        });
    }
    Ok(uploads)
}

fn file_name(path: &Path) -> Result<String, AppError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::validation(format!("'{}' is not a file", path.display())))
}

async fn write_outputs(args: &ConvertArgs, outputs: &[(String, Bytes)]) -> Result<(), AppError> {
    if outputs.is_empty() {
        return Ok(());
    }

    if let Some(zip_path) = &args.zip {
        let workspace = VirtualWorkspace::new();
        for (name, content) in outputs {
            workspace.write(name.as_str(), content.clone());
        }
        let names: Vec<&str> = outputs.iter().map(|(name, _)| name.as_str()).collect();
        let archive = workspace.bundle_zip(&names)?;
        create_parent(zip_path).await?;
        tokio::fs::write(zip_path, &archive).await?;
        output::print_success(&format!(
            "{} file(s) written to '{}'",
            outputs.len(),
            zip_path.display()
        ));
        return Ok(());
    }

    tokio::fs::create_dir_all(&args.out_dir).await?;
    for (name, content) in outputs {
        let path = args.out_dir.join(name);
        tokio::fs::write(&path, content).await?;
        output::print_written(&path, content.len());
    }
    Ok(())
}

async fn create_parent(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await?;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use clap::Parser;
    use serde_json::json;
    use voxconv_core::config::{AppConfig, OutputNaming};
    use voxconv_plugin::IdentityTranslator;
    use voxconv_plugin::project::{Note, Project, SingingTrack, SongTempo, Track};

    use crate::commands::{Cli, Commands};
    use crate::output::OutputFormat;

    #[test]
    fn test_parse_middleware_entry() {
        let (id, options) = parse_middleware("transpose_key:semitones=-3").unwrap();
        assert_eq!(id, "transpose_key");
        assert_eq!(options.get("semitones"), Some(&json!("-3")));

        let (id, options) = parse_middleware("normalize_tempo").unwrap();
        assert_eq!(id, "normalize_tempo");
        assert!(options.is_empty());

        let (_, options) = parse_middleware("lrc:title=Song, artist=Me").unwrap();
        assert_eq!(options.get("title"), Some(&json!("Song")));
        assert_eq!(options.get("artist"), Some(&json!("Me")));
    }

    #[test]
    fn test_parse_middleware_rejects_bad_entries() {
        assert!(parse_middleware(":semitones=1").is_err());
        assert!(parse_middleware("transpose_key:semitones").is_err());
    }

    #[test]
    fn test_chain_keeps_registration_order() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();
        let requested = vec![
            ("normalize_tempo".to_string(), StagedOptions::new()),
            (
                "transpose_key".to_string(),
                StagedOptions::new().with("semitones", "2"),
            ),
        ];
        let chain = middleware_chain(&registry, &requested).unwrap();

        let ids: Vec<&str> = chain.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["transpose_key", "normalize_tempo"]);
        assert!(chain.iter().all(|s| s.enabled));
        assert_eq!(chain[0].options.get("semitones"), Some(&json!("2")));
    }

    #[test]
    fn test_chain_rejects_unknown_middleware() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();
        let requested = vec![("reverb".to_string(), StagedOptions::new())];
        assert!(middleware_chain(&registry, &requested).is_err());
    }

    #[test]
    fn test_detect_input_by_extension() {
        let registry = plugin_builtin_formats::builtin_registry().unwrap();
        assert_eq!(detect_input(&registry, "song.JSON").unwrap(), "json");
        // lrc is write only
        assert!(detect_input(&registry, "song.lrc").is_err());
        assert!(detect_input(&registry, "README").is_err());
    }

    #[test]
    fn test_convert_args() {
        let cli = Cli::try_parse_from([
            "voxconv",
            "convert",
            "--to",
            "lrc",
            "-o",
            "offset_ms=100",
            "-m",
            "transpose_key:semitones=1",
            "--zip",
            "out.zip",
            "a.json",
            "b.json",
        ])
        .unwrap();
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert command");
        };
        assert_eq!(args.from, None);
        assert_eq!(args.files.len(), 2);

        let staged = StagedArgs::parse(&args).unwrap();
        assert_eq!(staged.output.get("offset_ms"), Some(&json!("100")));
        assert_eq!(staged.middleware.len(), 1);
    }

    #[test]
    fn test_convert_requires_files() {
        assert!(Cli::try_parse_from(["voxconv", "convert", "--to", "json"]).is_err());
    }

    fn context() -> Context {
        Context {
            config: AppConfig::default(),
            registry: Arc::new(plugin_builtin_formats::builtin_registry().unwrap()),
            translator: Box::new(IdentityTranslator),
            format: OutputFormat::Json,
        }
    }

    fn project_json(lyric: &str) -> Vec<u8> {
        let project = Project {
            song_tempos: vec![SongTempo {
                position: 0,
                bpm: 120.0,
            }],
            tracks: vec![Track::Singing(SingingTrack {
                title: "Lead".to_string(),
                notes: vec![Note {
                    start_pos: 0,
                    length: 480,
                    key_number: 60,
                    lyric: lyric.to_string(),
                    pronunciation: None,
                }],
                ..Default::default()
            })],
            ..Default::default()
        };
        serde_json::to_vec(&project).unwrap()
    }

    fn convert_args(to: &str, files: Vec<PathBuf>, out_dir: PathBuf) -> ConvertArgs {
        ConvertArgs {
            from: None,
            to: to.to_string(),
            input_options: Vec::new(),
            output_options: Vec::new(),
            middleware: Vec::new(),
            out_dir,
            zip: None,
            files,
        }
    }

    #[tokio::test]
    async fn test_single_file_is_written_to_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.json");
        std::fs::write(&input, project_json("la")).unwrap();

        let mut args = convert_args("lrc", vec![input], dir.path().join("out"));
        args.output_options = vec!["title=Song".to_string()];
        args.middleware = vec!["transpose_key:semitones=2".to_string()];
        execute(&args, &context()).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("out").join("song.lrc")).unwrap();
        assert_eq!(text, "[ti:Song]\n[00:00.00]la\n");
    }

    #[tokio::test]
    async fn test_invalid_option_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("song.json");
        std::fs::write(&input, project_json("la")).unwrap();

        let mut args = convert_args("json", vec![input], dir.path().join("out"));
        args.output_options = vec!["indent=wide".to_string()];
        let err = execute(&args, &context()).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_batch_writes_zip_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let bad = dir.path().join("bad.json");
        std::fs::write(&good, project_json("a")).unwrap();
        std::fs::write(&bad, b"{").unwrap();

        let zip_path = dir.path().join("bundle").join("out.zip");
        let mut args = convert_args("lrc", vec![good, bad], dir.path().to_path_buf());
        args.zip = Some(zip_path.clone());
        let err = execute(&args, &context()).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Plugin);
        assert!(std::fs::metadata(&zip_path).unwrap().len() > 0);
        assert!(!dir.path().join("good.lrc").exists());
    }

    #[tokio::test]
    async fn test_batch_with_fixed_naming_keeps_every_output() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        std::fs::write(&first, project_json("a")).unwrap();
        std::fs::write(&second, project_json("b")).unwrap();

        let mut ctx = context();
        ctx.config.conversion.naming = OutputNaming::Fixed;
        let out = dir.path().join("out");
        execute(&convert_args("lrc", vec![first, second], out.clone()), &ctx)
            .await
            .unwrap();

        let a = std::fs::read_to_string(out.join("export.lrc")).unwrap();
        let b = std::fs::read_to_string(out.join("export (1).lrc")).unwrap();
        assert!(a.ends_with("]a\n"));
        assert!(b.ends_with("]b\n"));
    }
}
