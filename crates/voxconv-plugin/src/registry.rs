//! Plugin registry: the formats and middleware available for a process.
//!
//! Built once through [`PluginRegistryBuilder`]; the resulting
//! [`PluginRegistry`] exposes no insertion or removal API.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::RegistryError;
use crate::options::OptionType;
use crate::traits::{
    DynFormatPlugin, DynMiddlewarePlugin, FormatAdapter, FormatPlugin, MiddlewareAdapter,
    MiddlewarePlugin,
};

/// Conversion direction a format is used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Source format (load).
    Input,
    /// Target format (dump).
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Which directions a format plugin supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capabilities {
    /// Load only.
    ReadOnly,
    /// Dump only.
    WriteOnly,
    /// Load and dump.
    ReadWrite,
}

impl Capabilities {
    /// Whether `load` is available.
    pub fn can_read(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    /// Whether `dump` is available.
    pub fn can_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }

    /// Whether the plugin may be used in `direction`.
    pub fn supports(self, direction: Direction) -> bool {
        match direction {
            Direction::Input => self.can_read(),
            Direction::Output => self.can_write(),
        }
    }
}

/// Descriptor of a registered format plugin.
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    /// Unique identifier.
    pub id: String,
    /// Registered file extension.
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
    /// Options accepted by `load`, if readable.
    pub input_option_type: Option<OptionType>,
    /// Options accepted by `dump`, if writable.
    pub output_option_type: Option<OptionType>,
}

impl PluginDescriptor {
    /// Option type for `direction`, if the plugin supports it.
    pub fn option_type(&self, direction: Direction) -> Option<OptionType> {
        match direction {
            Direction::Input => self.input_option_type,
            Direction::Output => self.output_option_type,
        }
    }
}

/// Descriptor of a registered middleware plugin.
#[derive(Debug, Clone)]
pub struct MiddlewareDescriptor {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// What the transform does.
    pub description: String,
    /// Options accepted by `process`.
    pub process_option_type: OptionType,
}

/// Collects plugins before the registry is frozen.
#[derive(Debug, Default)]
pub struct PluginRegistryBuilder {
    formats: Vec<Arc<dyn DynFormatPlugin>>,
    middleware: Vec<Arc<dyn DynMiddlewarePlugin>>,
}

impl PluginRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a typed format plugin.
    pub fn format<P: FormatPlugin>(self, plugin: P) -> Result<Self, RegistryError> {
        self.dyn_format(FormatAdapter::wrap(plugin))
    }

    /// Registers an already type-erased format plugin.
    pub fn dyn_format(mut self, plugin: Arc<dyn DynFormatPlugin>) -> Result<Self, RegistryError> {
        let id = plugin.descriptor().id.clone();
        if self.formats.iter().any(|p| p.descriptor().id == id) {
            return Err(RegistryError::Duplicate { id });
        }
        self.formats.push(plugin);
        Ok(self)
    }

    /// Registers a typed middleware plugin.
    pub fn middleware<M: MiddlewarePlugin>(self, middleware: M) -> Result<Self, RegistryError> {
        self.dyn_middleware(MiddlewareAdapter::wrap(middleware))
    }

    /// Registers an already type-erased middleware plugin.
    pub fn dyn_middleware(
        mut self,
        middleware: Arc<dyn DynMiddlewarePlugin>,
    ) -> Result<Self, RegistryError> {
        let id = middleware.descriptor().id.clone();
        if self.middleware.iter().any(|m| m.descriptor().id == id) {
            return Err(RegistryError::Duplicate { id });
        }
        self.middleware.push(middleware);
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> PluginRegistry {
        let format_index = self
            .formats
            .iter()
            .enumerate()
            .map(|(i, p)| (p.descriptor().id.clone(), i))
            .collect();
        let middleware_index = self
            .middleware
            .iter()
            .enumerate()
            .map(|(i, m)| (m.descriptor().id.clone(), i))
            .collect();

        for plugin in &self.formats {
            let d = plugin.descriptor();
            info!(
                plugin_id = %d.id,
                name = %d.display_name,
                version = %d.version,
                capabilities = ?d.capabilities,
                "Registering format plugin"
            );
        }
        for middleware in &self.middleware {
            info!(middleware_id = %middleware.descriptor().id, "Registering middleware");
        }

        PluginRegistry {
            formats: self.formats,
            format_index,
            middleware: self.middleware,
            middleware_index,
        }
    }
}

/// Immutable registry of format and middleware plugins.
#[derive(Debug)]
pub struct PluginRegistry {
    formats: Vec<Arc<dyn DynFormatPlugin>>,
    format_index: HashMap<String, usize>,
    middleware: Vec<Arc<dyn DynMiddlewarePlugin>>,
    middleware_index: HashMap<String, usize>,
}

impl PluginRegistry {
    /// Starts a builder.
    pub fn builder() -> PluginRegistryBuilder {
        PluginRegistryBuilder::new()
    }

    /// Ids of format plugins usable in `direction`, in registration order.
    pub fn list_plugins(&self, direction: Direction) -> Vec<String> {
        self.plugins(direction).map(|d| d.id.clone()).collect()
    }

    /// Descriptors of format plugins usable in `direction`, in registration order.
    pub fn plugins(&self, direction: Direction) -> impl Iterator<Item = &PluginDescriptor> {
        self.formats
            .iter()
            .map(|p| p.descriptor())
            .filter(move |d| d.capabilities.supports(direction))
    }

    /// Descriptors of all format plugins, in registration order.
    pub fn all_plugins(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.formats.iter().map(|p| p.descriptor())
    }

    /// Descriptor of format plugin `id`.
    pub fn get(&self, id: &str) -> Result<&PluginDescriptor, RegistryError> {
        self.format(id).map(|p| p.descriptor())
    }

    /// Format plugin `id`.
    pub fn format(&self, id: &str) -> Result<&Arc<dyn DynFormatPlugin>, RegistryError> {
        self.format_index
            .get(id)
            .map(|&i| &self.formats[i])
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// Format plugin `id`, checked against `direction`.
    pub fn resolve_format(
        &self,
        id: &str,
        direction: Direction,
    ) -> Result<&Arc<dyn DynFormatPlugin>, RegistryError> {
        let plugin = self.format(id)?;
        if !plugin.descriptor().capabilities.supports(direction) {
            return Err(RegistryError::WrongCapability {
                id: id.to_string(),
                direction,
            });
        }
        Ok(plugin)
    }

    /// First plugin usable in `direction` whose suffix matches `extension`
    /// (case-insensitive).
    pub fn find_by_suffix(&self, extension: &str, direction: Direction) -> Option<&PluginDescriptor> {
        self.plugins(direction)
            .find(|d| d.suffix.eq_ignore_ascii_case(extension))
    }

    /// Middleware ids in registration order (the default application order).
    pub fn list_middleware(&self) -> Vec<String> {
        self.middleware
            .iter()
            .map(|m| m.descriptor().id.clone())
            .collect()
    }

    /// Descriptors of all middleware, in registration order.
    pub fn all_middleware(&self) -> impl Iterator<Item = &MiddlewareDescriptor> {
        self.middleware.iter().map(|m| m.descriptor())
    }

    /// Middleware `id`.
    pub fn middleware(&self, id: &str) -> Result<&Arc<dyn DynMiddlewarePlugin>, RegistryError> {
        self.middleware_index
            .get(id)
            .map(|&i| &self.middleware[i])
            .ok_or_else(|| RegistryError::NotFound { id: id.to_string() })
    }

    /// Number of format plugins.
    pub fn format_count(&self) -> usize {
        self.formats.len()
    }
}
