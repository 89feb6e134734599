//! Wizard session state machine.
//!
//! A [`Session`] owns its staged selections and its own
//! [`VirtualWorkspace`]. The [`Wizard`] applies user actions to a session
//! through `&mut Session`, so a session is never mutated from two places
//! at once.
//!
//! Steps: `SelectingFormats → ConfiguringOptions → Converting → Done`.
//! `Converting` only exists inside [`Wizard::convert`].

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use voxconv_core::config::WorkspaceConfig;
use voxconv_plugin::{
    Direction, OptionSchema, PluginRegistry, StagedOptions, Translator, localize_schema,
    schema_for,
};
use voxconv_workspace::VirtualWorkspace;

use crate::error::{ConvertError, WizardError};
use crate::pipeline::{ConversionPipeline, ConversionReport, ConversionRequest, MiddlewareStep};

/// Wizard step.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WizardStep {
    /// Uploading and picking formats.
    #[default]
    SelectingFormats,
    /// Editing options and the middleware chain.
    ConfiguringOptions,
    /// Pipeline running.
    Converting,
    /// Outcome available.
    Done,
}

/// Terminal outcome of a session's conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutcome {
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// The report, or the error that ended the run.
    pub result: Result<ConversionReport, ConvertError>,
}

impl ConversionOutcome {
    /// Whether the run produced an output file.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    fn output_file_name(&self) -> Option<&str> {
        self.result
            .as_ref()
            .ok()
            .map(|report| report.output_file_name.as_str())
    }
}

/// Staged selections of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    step: WizardStep,
    input_plugin: Option<String>,
    output_plugin: Option<String>,
    input_options: StagedOptions,
    output_options: StagedOptions,
    middleware: Vec<MiddlewareStep>,
    upload: Option<String>,
    outcome: Option<ConversionOutcome>,
}

impl WizardState {
    fn new(middleware: Vec<MiddlewareStep>) -> Self {
        Self {
            step: WizardStep::SelectingFormats,
            input_plugin: None,
            output_plugin: None,
            input_options: StagedOptions::new(),
            output_options: StagedOptions::new(),
            middleware,
            upload: None,
            outcome: None,
        }
    }

    /// Current step.
    pub fn step(&self) -> WizardStep {
        self.step
    }

    /// Selected input plugin.
    pub fn input_plugin(&self) -> Option<&str> {
        self.input_plugin.as_deref()
    }

    /// Selected output plugin.
    pub fn output_plugin(&self) -> Option<&str> {
        self.output_plugin.as_deref()
    }

    /// Raw options for the input plugin.
    pub fn input_options(&self) -> &StagedOptions {
        &self.input_options
    }

    /// Raw options for the output plugin.
    pub fn output_options(&self) -> &StagedOptions {
        &self.output_options
    }

    /// Middleware chain in application order.
    pub fn middleware(&self) -> &[MiddlewareStep] {
        &self.middleware
    }

    /// Name of the uploaded file.
    pub fn upload_name(&self) -> Option<&str> {
        self.upload.as_deref()
    }

    /// Last conversion outcome.
    pub fn outcome(&self) -> Option<&ConversionOutcome> {
        self.outcome.as_ref()
    }

    fn options_mut(&mut self, direction: Direction) -> &mut StagedOptions {
        match direction {
            Direction::Input => &mut self.input_options,
            Direction::Output => &mut self.output_options,
        }
    }

    fn selection(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::Input => self.input_plugin(),
            Direction::Output => self.output_plugin(),
        }
    }

    fn has_both_formats(&self) -> bool {
        self.input_plugin.is_some() && self.output_plugin.is_some()
    }
}

/// One user's wizard session.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    state: WizardState,
    workspace: VirtualWorkspace,
}

impl Session {
    /// Session identifier used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// The session's workspace.
    pub fn workspace(&self) -> &VirtualWorkspace {
        &self.workspace
    }
}

/// Applies wizard actions to sessions.
#[derive(Debug, Clone)]
pub struct Wizard {
    pipeline: ConversionPipeline,
    max_upload_bytes: u64,
}

impl Wizard {
    /// Create a wizard driving `pipeline`.
    pub fn new(pipeline: ConversionPipeline, config: &WorkspaceConfig) -> Self {
        Self {
            pipeline,
            max_upload_bytes: config.max_upload_bytes,
        }
    }

    /// The underlying pipeline.
    pub fn pipeline(&self) -> &ConversionPipeline {
        &self.pipeline
    }

    fn registry(&self) -> &PluginRegistry {
        self.pipeline.registry()
    }

    /// Every registered middleware, in registration order, disabled.
    pub fn default_chain(&self) -> Vec<MiddlewareStep> {
        self.registry()
            .list_middleware()
            .iter()
            .map(|id| MiddlewareStep::disabled(id))
            .collect()
    }

    /// Starts a fresh session with an empty workspace.
    pub fn new_session(&self) -> Session {
        let session = Session {
            id: Uuid::new_v4(),
            state: WizardState::new(self.default_chain()),
            workspace: VirtualWorkspace::new(),
        };
        debug!(session_id = %session.id, "Session created");
        session
    }

    /// Stores an upload, discarding everything staged before it.
    ///
    /// Directory components of `name` are dropped. A readable plugin whose
    /// suffix matches the extension is pre-selected as input.
    pub fn upload(
        &self,
        session: &mut Session,
        name: &str,
        content: impl Into<Bytes>,
    ) -> Result<(), WizardError> {
        let content = content.into();
        let size = content.len() as u64;
        if size > self.max_upload_bytes {
            return Err(WizardError::UploadTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        let file_name = base_name(name);
        if file_name.is_empty() {
            return Err(WizardError::EmptyFileName);
        }

        self.clear(session);
        session.workspace.write(file_name, content);
        session.state.upload = Some(file_name.to_string());

        if let Some((stem, extension)) = file_name.rsplit_once('.') {
            if !stem.is_empty() {
                session.state.input_plugin = self
                    .registry()
                    .find_by_suffix(extension, Direction::Input)
                    .map(|plugin| plugin.id.clone());
            }
        }

        info!(
            session_id = %session.id,
            file = file_name,
            size,
            input = ?session.state.input_plugin,
            "File uploaded"
        );
        Ok(())
    }

    /// Moves to `target`, subject to the navigation rules.
    ///
    /// Without an upload the session always ends in `SelectingFormats`.
    /// Returns the step the session is in afterwards.
    pub fn go_to(
        &self,
        session: &mut Session,
        target: WizardStep,
    ) -> Result<WizardStep, WizardError> {
        if matches!(target, WizardStep::Converting | WizardStep::Done) {
            return Err(WizardError::NotNavigable { step: target });
        }
        if session.state.upload.is_none() {
            session.state.step = WizardStep::SelectingFormats;
            return Ok(session.state.step);
        }

        match target {
            WizardStep::SelectingFormats => {
                if session.state.step == WizardStep::Done {
                    self.rearm(session);
                }
                session.state.step = WizardStep::SelectingFormats;
            }
            WizardStep::ConfiguringOptions => {
                if session.state.step == WizardStep::Done {
                    return Err(WizardError::NotAllowed {
                        action: "go_to",
                        step: WizardStep::Done,
                    });
                }
                if !session.state.has_both_formats() {
                    return Err(WizardError::SelectionIncomplete);
                }
                session.state.step = WizardStep::ConfiguringOptions;
            }
            WizardStep::Converting | WizardStep::Done => {}
        }
        debug!(session_id = %session.id, step = %session.state.step, "Step changed");
        Ok(session.state.step)
    }

    /// Next step. From `ConfiguringOptions` this runs the conversion.
    pub fn advance(&self, session: &mut Session) -> Result<WizardStep, WizardError> {
        match session.state.step {
            WizardStep::SelectingFormats => self.go_to(session, WizardStep::ConfiguringOptions),
            WizardStep::ConfiguringOptions => {
                self.convert(session)?;
                Ok(session.state.step)
            }
            step @ (WizardStep::Converting | WizardStep::Done) => Err(WizardError::NotAllowed {
                action: "advance",
                step,
            }),
        }
    }

    /// Previous step. Leaving `Done` re-arms conversion.
    pub fn back(&self, session: &mut Session) -> Result<WizardStep, WizardError> {
        self.go_to(session, WizardStep::SelectingFormats)
    }

    /// Selects the input plugin. Changing it clears the staged input options.
    pub fn select_input(&self, session: &mut Session, plugin_id: &str) -> Result<(), WizardError> {
        self.select(session, plugin_id, Direction::Input)
    }

    /// Selects the output plugin. Changing it clears the staged output options.
    pub fn select_output(&self, session: &mut Session, plugin_id: &str) -> Result<(), WizardError> {
        self.select(session, plugin_id, Direction::Output)
    }

    fn select(
        &self,
        session: &mut Session,
        plugin_id: &str,
        direction: Direction,
    ) -> Result<(), WizardError> {
        ensure_editable(session, "select")?;
        self.registry().resolve_format(plugin_id, direction)?;

        let state = &mut session.state;
        if state.selection(direction) == Some(plugin_id) {
            return Ok(());
        }
        match direction {
            Direction::Input => state.input_plugin = Some(plugin_id.to_string()),
            Direction::Output => state.output_plugin = Some(plugin_id.to_string()),
        }
        state.options_mut(direction).clear();
        debug!(session_id = %session.id, %direction, plugin_id, "Format selected");
        Ok(())
    }

    /// Swaps input and output. Both plugins must support the other
    /// direction; staged options on both sides are cleared.
    pub fn swap_formats(&self, session: &mut Session) -> Result<(), WizardError> {
        ensure_editable(session, "swap_formats")?;
        let (Some(input), Some(output)) = (
            session.state.input_plugin.clone(),
            session.state.output_plugin.clone(),
        ) else {
            return Err(WizardError::SelectionIncomplete);
        };
        self.registry().resolve_format(&input, Direction::Output)?;
        self.registry().resolve_format(&output, Direction::Input)?;

        let state = &mut session.state;
        state.input_plugin = Some(output);
        state.output_plugin = Some(input);
        state.input_options.clear();
        state.output_options.clear();
        Ok(())
    }

    /// Stages one raw input option.
    pub fn stage_input_option(
        &self,
        session: &mut Session,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), WizardError> {
        self.stage_option(session, Direction::Input, key, value.into())
    }

    /// Stages one raw output option.
    pub fn stage_output_option(
        &self,
        session: &mut Session,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<(), WizardError> {
        self.stage_option(session, Direction::Output, key, value.into())
    }

    fn stage_option(
        &self,
        session: &mut Session,
        direction: Direction,
        key: &str,
        value: Value,
    ) -> Result<(), WizardError> {
        ensure_editable(session, "stage_option")?;
        if session.state.selection(direction).is_none() {
            return Err(WizardError::SelectionIncomplete);
        }
        session.state.options_mut(direction).set(key, value);
        Ok(())
    }

    /// Sets the options and enabled flag of middleware `id`.
    ///
    /// Middleware missing from the chain is appended.
    pub fn configure_middleware(
        &self,
        session: &mut Session,
        id: &str,
        options: StagedOptions,
        enabled: bool,
    ) -> Result<(), WizardError> {
        ensure_editable(session, "configure_middleware")?;
        self.registry().middleware(id)?;

        let chain = &mut session.state.middleware;
        match chain.iter_mut().find(|step| step.id == id) {
            Some(step) => {
                step.options = options;
                step.enabled = enabled;
            }
            None => chain.push(MiddlewareStep {
                id: id.to_string(),
                options,
                enabled,
            }),
        }
        Ok(())
    }

    /// Toggles middleware `id` in the chain.
    pub fn set_middleware_enabled(
        &self,
        session: &mut Session,
        id: &str,
        enabled: bool,
    ) -> Result<(), WizardError> {
        ensure_editable(session, "set_middleware_enabled")?;
        let step = session
            .state
            .middleware
            .iter_mut()
            .find(|step| step.id == id)
            .ok_or_else(|| voxconv_plugin::RegistryError::NotFound { id: id.to_string() })?;
        step.enabled = enabled;
        Ok(())
    }

    /// Schema of the selected input plugin's load options.
    pub fn input_schema(
        &self,
        session: &Session,
        translator: Option<&dyn Translator>,
    ) -> Result<OptionSchema, WizardError> {
        self.format_schema(session, Direction::Input, translator)
    }

    /// Schema of the selected output plugin's dump options.
    pub fn output_schema(
        &self,
        session: &Session,
        translator: Option<&dyn Translator>,
    ) -> Result<OptionSchema, WizardError> {
        self.format_schema(session, Direction::Output, translator)
    }

    fn format_schema(
        &self,
        session: &Session,
        direction: Direction,
        translator: Option<&dyn Translator>,
    ) -> Result<OptionSchema, WizardError> {
        let plugin_id = session
            .state
            .selection(direction)
            .ok_or(WizardError::SelectionIncomplete)?;
        let descriptor = self.registry().get(plugin_id)?;
        let option_type = descriptor.option_type(direction).ok_or_else(|| {
            voxconv_plugin::RegistryError::WrongCapability {
                id: plugin_id.to_string(),
                direction,
            }
        })?;
        Ok(localized(schema_for(&option_type), translator))
    }

    /// Schema of middleware `id`'s options.
    pub fn middleware_schema(
        &self,
        id: &str,
        translator: Option<&dyn Translator>,
    ) -> Result<OptionSchema, WizardError> {
        let middleware = self.registry().middleware(id)?;
        let schema = schema_for(&middleware.descriptor().process_option_type);
        Ok(localized(schema, translator))
    }

    /// Runs the conversion once per upload.
    ///
    /// When the session is already `Done` the cached outcome is returned
    /// without running anything. Otherwise the session passes through
    /// `Converting` and always lands in `Done`, whether the run succeeded
    /// or not.
    pub fn convert<'s>(
        &self,
        session: &'s mut Session,
    ) -> Result<&'s ConversionOutcome, WizardError> {
        if session.state.step == WizardStep::Done && session.state.outcome.is_some() {
            debug!(session_id = %session.id, "Returning cached outcome");
            return session
                .state
                .outcome
                .as_ref()
                .ok_or(WizardError::NothingToDownload);
        }

        let upload = session.state.upload.clone().ok_or(WizardError::NoUpload)?;
        let (Some(input_plugin), Some(output_plugin)) = (
            session.state.input_plugin.clone(),
            session.state.output_plugin.clone(),
        ) else {
            return Err(WizardError::SelectionIncomplete);
        };

        session.state.step = WizardStep::Converting;
        let request = ConversionRequest {
            input_plugin,
            output_plugin,
            input_file_name: upload,
            input_options: session.state.input_options.clone(),
            output_options: session.state.output_options.clone(),
            middleware: session.state.middleware.clone(),
        };
        let result = self.pipeline.convert(&session.workspace, &request);

        let outcome = ConversionOutcome {
            finished_at: Utc::now(),
            result,
        };
        info!(
            session_id = %session.id,
            success = outcome.is_success(),
            "Conversion finished"
        );
        session.state.step = WizardStep::Done;
        Ok(&*session.state.outcome.insert(outcome))
    }

    /// Name and bytes of the converted file.
    pub fn download(&self, session: &Session) -> Result<(String, Bytes), WizardError> {
        if session.state.step != WizardStep::Done {
            return Err(WizardError::NothingToDownload);
        }
        let name = session
            .state
            .outcome
            .as_ref()
            .and_then(ConversionOutcome::output_file_name)
            .ok_or(WizardError::NothingToDownload)?;
        let content = session
            .workspace
            .read(name)
            .map_err(|_| WizardError::NothingToDownload)?;
        Ok((name.to_string(), content))
    }

    /// Discards the upload, the output and every staged selection.
    pub fn reset(&self, session: &mut Session) {
        self.clear(session);
        info!(session_id = %session.id, "Session reset");
    }

    fn clear(&self, session: &mut Session) {
        if let Some(upload) = session.state.upload.take() {
            session.workspace.remove(&upload);
        }
        self.rearm(session);
        session.state = WizardState::new(self.default_chain());
    }

    fn rearm(&self, session: &mut Session) {
        let Some(outcome) = session.state.outcome.take() else {
            return;
        };
        if let Some(name) = outcome.output_file_name() {
            session.workspace.remove(name);
        }
    }
}

fn ensure_editable(session: &Session, action: &'static str) -> Result<(), WizardError> {
    match session.state.step {
        WizardStep::SelectingFormats | WizardStep::ConfiguringOptions => Ok(()),
        step => Err(WizardError::NotAllowed { action, step }),
    }
}

fn localized(schema: OptionSchema, translator: Option<&dyn Translator>) -> OptionSchema {
    match translator {
        Some(translator) => localize_schema(&schema, translator),
        None => schema,
    }
}

fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}
