//! Pipeline and wizard errors.
//!
//! Both map into `voxconv_core::error::AppError` at the host boundary.

use thiserror::Error;
use voxconv_core::error::{AppError, ErrorKind};
use voxconv_plugin::{Direction, OptionValidationError, PluginError, RegistryError, Translator};

use crate::wizard::WizardStep;

/// Terminal failure of one conversion run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// The plugin is not registered or cannot be used in this direction.
    #[error("Unknown {direction} format '{plugin_id}'")]
    UnknownFormat {
        /// Requested plugin id.
        plugin_id: String,
        /// Requested direction.
        direction: Direction,
    },

    /// The upload is not in the workspace.
    #[error("Uploaded file '{file_name}' is missing")]
    MissingUpload {
        /// Requested file name.
        file_name: String,
    },

    /// A staged option could not be coerced.
    #[error("Invalid {target} options: {source}")]
    OptionValidation {
        /// Which side's options failed.
        target: Direction,
        /// The field and reason.
        #[source]
        source: OptionValidationError,
    },

    /// The input plugin failed to load the upload.
    #[error("Failed to load with '{plugin_id}': {cause}")]
    Load {
        /// Input plugin id.
        plugin_id: String,
        /// What the plugin reported.
        cause: PluginError,
    },

    /// A middleware failed; the rest of the chain was skipped.
    #[error("Middleware '{middleware_id}' at position {position} failed: {cause}")]
    Middleware {
        /// Middleware id.
        middleware_id: String,
        /// Index in the full chain, disabled entries included.
        position: usize,
        /// What the middleware reported.
        cause: PluginError,
    },

    /// The output plugin failed to dump the project.
    #[error("Failed to dump with '{plugin_id}': {cause}")]
    Dump {
        /// Output plugin id.
        plugin_id: String,
        /// What the plugin reported.
        cause: PluginError,
    },
}

impl ConvertError {
    /// Untranslated message template with `{name}` placeholders.
    ///
    /// Matches the `Display` output once placeholders are filled.
    pub fn message_template(&self) -> &'static str {
        match self {
            Self::UnknownFormat { .. } => "Unknown {direction} format '{plugin_id}'",
            Self::MissingUpload { .. } => "Uploaded file '{file_name}' is missing",
            Self::OptionValidation { .. } => "Invalid {target} options: {source}",
            Self::Load { .. } => "Failed to load with '{plugin_id}': {cause}",
            Self::Middleware { .. } => {
                "Middleware '{middleware_id}' at position {position} failed: {cause}"
            }
            Self::Dump { .. } => "Failed to dump with '{plugin_id}': {cause}",
        }
    }

    fn message_args(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::UnknownFormat {
                plugin_id,
                direction,
            } => vec![
                ("plugin_id", plugin_id.clone()),
                ("direction", direction.to_string()),
            ],
            Self::MissingUpload { file_name } => vec![("file_name", file_name.clone())],
            Self::OptionValidation { target, source } => vec![
                ("target", target.to_string()),
                ("source", source.to_string()),
            ],
            Self::Load { plugin_id, cause } | Self::Dump { plugin_id, cause } => vec![
                ("plugin_id", plugin_id.clone()),
                ("cause", cause.to_string()),
            ],
            Self::Middleware {
                middleware_id,
                position,
                cause,
            } => vec![
                ("middleware_id", middleware_id.clone()),
                ("position", position.to_string()),
                ("cause", cause.to_string()),
            ],
        }
    }

    /// Message with the template passed through `translator` before the
    /// placeholders are filled.
    pub fn localized_message(&self, translator: &dyn Translator) -> String {
        let mut text = translator.text(self.message_template());
        for (name, value) in self.message_args() {
            text = text.replace(&format!("{{{name}}}"), &value);
        }
        text
    }
}

impl From<ConvertError> for AppError {
    fn from(err: ConvertError) -> Self {
        match &err {
            ConvertError::UnknownFormat { .. } | ConvertError::MissingUpload { .. } => {
                AppError::not_found(err.to_string())
            }
            ConvertError::OptionValidation { .. } => AppError::validation(err.to_string()),
            ConvertError::Load { .. }
            | ConvertError::Middleware { .. }
            | ConvertError::Dump { .. } => AppError::plugin(err.to_string()),
        }
    }
}

/// Rejected wizard action. The session state is left unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WizardError {
    /// Nothing has been uploaded yet.
    #[error("No file has been uploaded")]
    NoUpload,

    /// The upload exceeds the configured limit.
    #[error("Upload of {size} bytes exceeds the limit of {limit} bytes")]
    UploadTooLarge {
        /// Upload size.
        size: u64,
        /// Configured limit.
        limit: u64,
    },

    /// The upload name is empty after stripping directories.
    #[error("Upload has no file name")]
    EmptyFileName,

    /// Input and output formats must both be selected.
    #[error("Both input and output formats must be selected")]
    SelectionIncomplete,

    /// The step cannot be entered by navigation.
    #[error("Step '{step}' cannot be entered directly")]
    NotNavigable {
        /// Requested step.
        step: WizardStep,
    },

    /// The action is not allowed in the current step.
    #[error("'{action}' is not allowed while {step}")]
    NotAllowed {
        /// Attempted action.
        action: &'static str,
        /// Current step.
        step: WizardStep,
    },

    /// There is no successful conversion to download.
    #[error("No converted file is available")]
    NothingToDownload,

    /// A plugin or middleware lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<WizardError> for AppError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::Registry(inner) => inner.into(),
            WizardError::NotAllowed { .. } | WizardError::NotNavigable { .. } => {
                AppError::new(ErrorKind::Conflict, err.to_string())
            }
            WizardError::NothingToDownload => AppError::not_found(err.to_string()),
            _ => AppError::validation(err.to_string()),
        }
    }
}
