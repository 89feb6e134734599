//! Conversion pipeline: load → middleware chain → dump.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use voxconv_core::config::ConversionConfig;
use voxconv_plugin::{
    ConversionWarning, Diagnostics, Direction, DynFormatPlugin, OptionValues, Phase, PluginError,
    PluginRegistry, Project, StagedOptions, coerce,
};
use voxconv_workspace::VirtualWorkspace;

use crate::error::ConvertError;
use crate::metrics::PipelineMetrics;

/// One entry of a middleware chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareStep {
    /// Middleware id.
    pub id: String,
    /// Raw options for `process`.
    #[serde(default)]
    pub options: StagedOptions,
    /// Disabled entries are skipped but keep their position.
    pub enabled: bool,
}

impl MiddlewareStep {
    /// Enabled entry with `options`.
    pub fn enabled(id: &str, options: StagedOptions) -> Self {
        Self {
            id: id.to_string(),
            options,
            enabled: true,
        }
    }

    /// Disabled entry with no options.
    pub fn disabled(id: &str) -> Self {
        Self {
            id: id.to_string(),
            options: StagedOptions::new(),
            enabled: false,
        }
    }
}

/// Everything one conversion run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Input plugin id.
    pub input_plugin: String,
    /// Output plugin id.
    pub output_plugin: String,
    /// Name of the upload in the workspace.
    pub input_file_name: String,
    /// Raw options for `load`.
    #[serde(default)]
    pub input_options: StagedOptions,
    /// Raw options for `dump`.
    #[serde(default)]
    pub output_options: StagedOptions,
    /// Middleware chain, applied in order.
    #[serde(default)]
    pub middleware: Vec<MiddlewareStep>,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionReport {
    /// Name the output was written under.
    pub output_file_name: String,
    /// Size of the output.
    pub output_size: u64,
    /// Non-fatal diagnostics from load, middleware and dump, in order.
    pub warnings: Vec<ConversionWarning>,
}

/// Outcome for one file of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    /// Upload name.
    pub input_file_name: String,
    /// What happened.
    pub result: Result<ConversionReport, ConvertError>,
}

/// Outcome of [`ConversionPipeline::convert_batch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// One item per request, in request order.
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    /// Whether at least one file failed.
    pub fn finished_with_errors(&self) -> bool {
        self.items.iter().any(|item| item.result.is_err())
    }

    /// Output names of the successful items.
    pub fn output_file_names(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().ok())
            .map(|report| report.output_file_name.clone())
            .collect()
    }
}

/// Runs conversions against a frozen plugin registry.
#[derive(Debug, Clone)]
pub struct ConversionPipeline {
    registry: Arc<PluginRegistry>,
    config: ConversionConfig,
    metrics: Arc<PipelineMetrics>,
}

impl ConversionPipeline {
    /// Create a pipeline over `registry`.
    pub fn new(registry: Arc<PluginRegistry>, config: ConversionConfig) -> Self {
        Self {
            registry,
            config,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// The plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Naming and other conversion settings.
    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Shared metrics.
    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    /// Runs one conversion.
    ///
    /// Exactly one terminal outcome: a report, or the first error. The
    /// output is written to `workspace` only on success, under a fresh
    /// name when the derived one is already taken.
    #[instrument(
        skip_all,
        fields(
            input = %request.input_file_name,
            from = %request.input_plugin,
            to = %request.output_plugin
        )
    )]
    pub fn convert(
        &self,
        workspace: &VirtualWorkspace,
        request: &ConversionRequest,
    ) -> Result<ConversionReport, ConvertError> {
        self.metrics.record_started();
        let started = Instant::now();

        let result = self.run(workspace, request);
        match &result {
            Ok(report) => {
                self.metrics.record_success(
                    started.elapsed(),
                    report.output_size,
                    report.warnings.len() as u64,
                );
                info!(
                    output = %report.output_file_name,
                    size = report.output_size,
                    warnings = report.warnings.len(),
                    "Conversion succeeded"
                );
            }
            Err(e) => {
                self.metrics.record_failure(started.elapsed());
                warn!(error = %e, "Conversion failed");
            }
        }
        result
    }

    /// Converts several uploads in order. A failed file does not stop the
    /// others.
    pub fn convert_batch(
        &self,
        workspace: &VirtualWorkspace,
        requests: &[ConversionRequest],
    ) -> BatchReport {
        let items = requests
            .iter()
            .map(|request| BatchItem {
                input_file_name: request.input_file_name.clone(),
                result: self.convert(workspace, request),
            })
            .collect();
        let report = BatchReport { items };
        if report.finished_with_errors() {
            warn!(files = requests.len(), "Batch finished with errors");
        }
        report
    }

    fn run(
        &self,
        workspace: &VirtualWorkspace,
        request: &ConversionRequest,
    ) -> Result<ConversionReport, ConvertError> {
        let input = self.resolve(&request.input_plugin, Direction::Input)?;
        let input_options = self.coerce_format_options(
            input.as_ref(),
            Direction::Input,
            &request.input_options,
        )?;

        let bytes = workspace
            .read(&request.input_file_name)
            .map_err(|_| ConvertError::MissingUpload {
                file_name: request.input_file_name.clone(),
            })?;
        self.metrics.record_input(bytes.len() as u64);

        let mut diagnostics = Diagnostics::new();
        let mut project = input
            .load(
                &bytes,
                &input_options,
                &mut diagnostics.sink(Phase::Load, &request.input_plugin),
            )
            .map_err(|cause| ConvertError::Load {
                plugin_id: request.input_plugin.clone(),
                cause,
            })?;
        debug!(
            tracks = project.tracks.len(),
            notes = project.note_count(),
            "Project loaded"
        );

        for (position, step) in request.middleware.iter().enumerate() {
            if !step.enabled {
                continue;
            }
            project = self
                .apply_middleware(project, step, &mut diagnostics)
                .map_err(|cause| ConvertError::Middleware {
                    middleware_id: step.id.clone(),
                    position,
                    cause,
                })?;
        }

        let output = self.resolve(&request.output_plugin, Direction::Output)?;
        let output_options = self.coerce_format_options(
            output.as_ref(),
            Direction::Output,
            &request.output_options,
        )?;
        let content = output
            .dump(
                &project,
                &output_options,
                &mut diagnostics.sink(Phase::Dump, &request.output_plugin),
            )
            .map_err(|cause| ConvertError::Dump {
                plugin_id: request.output_plugin.clone(),
                cause,
            })?;

        let derived_name = self
            .config
            .output_file_name(&request.input_file_name, &output.descriptor().suffix);
        let output_size = content.len() as u64;
        // Uploads and earlier outputs are never replaced.
        let output_file_name = workspace.write_unique(&derived_name, content);
        if output_file_name != derived_name {
            debug!(derived = %derived_name, output = %output_file_name, "Output renamed");
        }

        Ok(ConversionReport {
            output_file_name,
            output_size,
            warnings: diagnostics.into_warnings(),
        })
    }

    fn resolve(
        &self,
        plugin_id: &str,
        direction: Direction,
    ) -> Result<Arc<dyn DynFormatPlugin>, ConvertError> {
        self.registry
            .resolve_format(plugin_id, direction)
            .cloned()
            .map_err(|_| ConvertError::UnknownFormat {
                plugin_id: plugin_id.to_string(),
                direction,
            })
    }

    fn coerce_format_options(
        &self,
        plugin: &dyn DynFormatPlugin,
        direction: Direction,
        raw: &StagedOptions,
    ) -> Result<OptionValues, ConvertError> {
        let descriptor = plugin.descriptor();
        let option_type =
            descriptor
                .option_type(direction)
                .ok_or_else(|| ConvertError::UnknownFormat {
                    plugin_id: descriptor.id.clone(),
                    direction,
                })?;
        coerce(&option_type, raw).map_err(|source| ConvertError::OptionValidation {
            target: direction,
            source,
        })
    }

    fn apply_middleware(
        &self,
        project: Project,
        step: &MiddlewareStep,
        diagnostics: &mut Diagnostics,
    ) -> Result<Project, PluginError> {
        let middleware = self
            .registry
            .middleware(&step.id)
            .map_err(|_| PluginError::not_found(&step.id))?;
        let options = coerce(&middleware.descriptor().process_option_type, &step.options)
            .map_err(|e| PluginError::invalid_options(e.to_string()))?;
        debug!(middleware = %step.id, "Applying middleware");
        middleware.process(
            project,
            &options,
            &mut diagnostics.sink(Phase::Middleware, &step.id),
        )
    }
}
