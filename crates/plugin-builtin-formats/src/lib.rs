//! Built-in plugins shipped with voxconv.
//!
//! Formats:
//! - `json`: the shared project model as JSON (read/write)
//! - `lrc`: timed lyrics export (write only)
//!
//! Middleware:
//! - `transpose_key`: shifts every note by a number of semitones
//! - `normalize_tempo`: rewrites the project to one constant tempo while
//!   keeping every note at the same point in time

pub mod formats;
pub mod middleware;

use voxconv_plugin::{PluginRegistry, PluginRegistryBuilder, RegistryError};

pub use formats::{JsonFormat, LrcFormat};
pub use middleware::{NormalizeTempo, TransposeKey};

/// Adds every built-in plugin to `builder`, formats first.
pub fn register_builtins(
    builder: PluginRegistryBuilder,
) -> Result<PluginRegistryBuilder, RegistryError> {
    builder
        .format(JsonFormat)?
        .format(LrcFormat)?
        .middleware(TransposeKey)?
        .middleware(NormalizeTempo)
}

/// Registry holding only the built-in plugins.
pub fn builtin_registry() -> Result<PluginRegistry, RegistryError> {
    Ok(register_builtins(PluginRegistry::builder())?.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxconv_plugin::{Direction, schema_for};

    #[test]
    fn test_registry_contents() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.list_plugins(Direction::Input), vec!["json"]);
        assert_eq!(registry.list_plugins(Direction::Output), vec!["json", "lrc"]);
        assert_eq!(
            registry.list_middleware(),
            vec!["transpose_key", "normalize_tempo"]
        );
    }

    #[test]
    fn test_every_schema_is_deterministic() {
        let registry = builtin_registry().unwrap();
        for descriptor in registry.all_plugins() {
            for direction in [Direction::Input, Direction::Output] {
                if let Some(option_type) = descriptor.option_type(direction) {
                    assert_eq!(schema_for(&option_type), schema_for(&option_type));
                }
            }
        }
        for descriptor in registry.all_middleware() {
            let option_type = descriptor.process_option_type;
            assert_eq!(schema_for(&option_type), schema_for(&option_type));
        }
    }

    #[test]
    fn test_double_registration_fails() {
        let builder = register_builtins(PluginRegistry::builder()).unwrap();
        assert!(register_builtins(builder).is_err());
    }
}
