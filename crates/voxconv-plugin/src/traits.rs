//! Plugin contracts.
//!
//! Plugin authors implement the typed [`FormatPlugin`] / [`MiddlewarePlugin`]
//! traits. The registry stores them behind the object-safe
//! [`DynFormatPlugin`] / [`DynMiddlewarePlugin`] traits through
//! [`FormatAdapter`] / [`MiddlewareAdapter`], which also turn coerced
//! [`OptionValues`] into the plugin's own option structs.

use std::sync::Arc;

use bytes::Bytes;

use crate::diagnostics::WarningSink;
use crate::error::PluginError;
use crate::options::{OptionSet, OptionType, OptionValues};
use crate::project::Project;
use crate::registry::{Capabilities, MiddlewareDescriptor, PluginDescriptor};

/// Static metadata of a format plugin.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Unique identifier.
    pub id: String,
    /// Registered file extension, without the dot.
    pub suffix: String,
    /// Human-readable format name.
    pub display_name: String,
    /// Plugin version string.
    pub version: String,
    /// Author or maintainer.
    pub author: String,
    /// Project website.
    pub website: String,
    /// Plugin description.
    pub description: String,
    /// Optional icon.
    pub icon_image: Option<Bytes>,
    /// Supported directions.
    pub capabilities: Capabilities,
}

impl PluginInfo {
    /// Metadata with `suffix` equal to `id` and empty presentation fields.
    pub fn new(id: &str, display_name: &str, capabilities: Capabilities) -> Self {
        Self {
            id: id.to_string(),
            suffix: id.to_string(),
            display_name: display_name.to_string(),
            version: String::new(),
            author: String::new(),
            website: String::new(),
            description: String::new(),
            icon_image: None,
            capabilities,
        }
    }
}

/// Static metadata of a middleware plugin.
#[derive(Debug, Clone)]
pub struct MiddlewareInfo {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// What the transform does.
    pub description: String,
}

/// A file format that can be loaded into and/or dumped from a [`Project`].
///
/// Only the operations allowed by [`PluginInfo::capabilities`] need to be
/// implemented; the defaults report [`PluginError::unsupported`].
pub trait FormatPlugin: Send + Sync + std::fmt::Debug + 'static {
    /// Options accepted by `load`.
    type LoadOptions: OptionSet;
    /// Options accepted by `dump`.
    type DumpOptions: OptionSet;

    /// Returns plugin metadata.
    fn info(&self) -> PluginInfo;

    /// Parses `bytes` into a project.
    fn load(
        &self,
        _bytes: &[u8],
        _options: Self::LoadOptions,
        _warnings: &mut WarningSink<'_>,
    ) -> Result<Project, PluginError> {
        Err(PluginError::unsupported("load"))
    }

    /// Serializes `project`.
    fn dump(
        &self,
        _project: &Project,
        _options: Self::DumpOptions,
        _warnings: &mut WarningSink<'_>,
    ) -> Result<Vec<u8>, PluginError> {
        Err(PluginError::unsupported("dump"))
    }
}

/// A project-to-project transform applied between load and dump.
pub trait MiddlewarePlugin: Send + Sync + std::fmt::Debug + 'static {
    /// Options accepted by `process`.
    type Options: OptionSet;

    /// Returns middleware metadata.
    fn info(&self) -> MiddlewareInfo;

    /// Transforms `project`.
    fn process(
        &self,
        project: Project,
        options: Self::Options,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Project, PluginError>;
}

/// Object-safe view of a format plugin.
pub trait DynFormatPlugin: Send + Sync + std::fmt::Debug {
    /// Descriptor including declared option types.
    fn descriptor(&self) -> &PluginDescriptor;

    /// Loads with already-coerced options.
    fn load(
        &self,
        bytes: &[u8],
        options: &OptionValues,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Project, PluginError>;

    /// Dumps with already-coerced options.
    fn dump(
        &self,
        project: &Project,
        options: &OptionValues,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Vec<u8>, PluginError>;
}

/// Object-safe view of a middleware plugin.
pub trait DynMiddlewarePlugin: Send + Sync + std::fmt::Debug {
    /// Descriptor including the declared option type.
    fn descriptor(&self) -> &MiddlewareDescriptor;

    /// Processes with already-coerced options.
    fn process(
        &self,
        project: Project,
        options: &OptionValues,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Project, PluginError>;
}

/// Adapts a [`FormatPlugin`] to [`DynFormatPlugin`].
#[derive(Debug)]
pub struct FormatAdapter<P> {
    inner: P,
    descriptor: PluginDescriptor,
}

impl<P: FormatPlugin> FormatAdapter<P> {
    /// Wraps `plugin`, capturing its descriptor once.
    pub fn new(plugin: P) -> Self {
        let info = plugin.info();
        let capabilities = info.capabilities;
        let descriptor = PluginDescriptor {
            id: info.id,
            suffix: info.suffix,
            display_name: info.display_name,
            version: info.version,
            author: info.author,
            website: info.website,
            description: info.description,
            icon_image: info.icon_image,
            capabilities,
            input_option_type: capabilities
                .can_read()
                .then(OptionType::of::<P::LoadOptions>),
            output_option_type: capabilities
                .can_write()
                .then(OptionType::of::<P::DumpOptions>),
        };
        Self {
            inner: plugin,
            descriptor,
        }
    }

    /// Wraps `plugin` into an `Arc<dyn DynFormatPlugin>`.
    pub fn wrap(plugin: P) -> Arc<dyn DynFormatPlugin> {
        Arc::new(Self::new(plugin))
    }
}

impl<P: FormatPlugin> DynFormatPlugin for FormatAdapter<P> {
    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn load(
        &self,
        bytes: &[u8],
        options: &OptionValues,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Project, PluginError> {
        let options = options
            .to_typed::<P::LoadOptions>()
            .map_err(|e| PluginError::invalid_options(e.to_string()))?;
        self.inner.load(bytes, options, warnings)
    }

    fn dump(
        &self,
        project: &Project,
        options: &OptionValues,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Vec<u8>, PluginError> {
        let options = options
            .to_typed::<P::DumpOptions>()
            .map_err(|e| PluginError::invalid_options(e.to_string()))?;
        self.inner.dump(project, options, warnings)
    }
}

/// Adapts a [`MiddlewarePlugin`] to [`DynMiddlewarePlugin`].
#[derive(Debug)]
pub struct MiddlewareAdapter<M> {
    inner: M,
    descriptor: MiddlewareDescriptor,
}

impl<M: MiddlewarePlugin> MiddlewareAdapter<M> {
    /// Wraps `middleware`, capturing its descriptor once.
    pub fn new(middleware: M) -> Self {
        let info = middleware.info();
        let descriptor = MiddlewareDescriptor {
            id: info.id,
            display_name: info.display_name,
            description: info.description,
            process_option_type: OptionType::of::<M::Options>(),
        };
        Self {
            inner: middleware,
            descriptor,
        }
    }

    /// Wraps `middleware` into an `Arc<dyn DynMiddlewarePlugin>`.
    pub fn wrap(middleware: M) -> Arc<dyn DynMiddlewarePlugin> {
        Arc::new(Self::new(middleware))
    }
}

impl<M: MiddlewarePlugin> DynMiddlewarePlugin for MiddlewareAdapter<M> {
    fn descriptor(&self) -> &MiddlewareDescriptor {
        &self.descriptor
    }

    fn process(
        &self,
        project: Project,
        options: &OptionValues,
        warnings: &mut WarningSink<'_>,
    ) -> Result<Project, PluginError> {
        let options = options
            .to_typed::<M::Options>()
            .map_err(|e| PluginError::invalid_options(e.to_string()))?;
        self.inner.process(project, options, warnings)
    }
}
