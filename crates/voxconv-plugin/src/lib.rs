//! # voxconv-plugin
//!
//! Plugin framework for voxconv. Provides:
//!
//! - Typed `FormatPlugin` / `MiddlewarePlugin` contracts and their
//!   object-safe adapters
//! - An immutable plugin registry built once at startup
//! - Option schemas declared explicitly by each plugin, with coercion of
//!   raw form input into typed option values
//! - Translation of schema display text
//! - The shared project model passed between plugins

pub mod diagnostics;
pub mod error;
pub mod i18n;
pub mod options;
pub mod project;
pub mod registry;
pub mod traits;

pub use diagnostics::{ConversionWarning, Diagnostics, Phase, WarningSink};
pub use error::{PluginError, PluginErrorKind, RegistryError};
pub use i18n::{CatalogError, IdentityTranslator, MessageCatalog, Translator, localize_schema};
pub use options::{
    AssignmentError, EnumChoice, FieldKind, NoOptions, OptionEnum, OptionField, OptionSchema, OptionSet,
    OptionType, OptionValidationError, OptionValues, SchemaBuilder, StagedOptions, coerce,
    coerce_typed, schema_for,
};
pub use project::Project;
pub use registry::{
    Capabilities, Direction, MiddlewareDescriptor, PluginDescriptor, PluginRegistry,
    PluginRegistryBuilder,
};
pub use traits::{
    DynFormatPlugin, DynMiddlewarePlugin, FormatAdapter, FormatPlugin, MiddlewareAdapter,
    MiddlewareInfo, MiddlewarePlugin, PluginInfo,
};
