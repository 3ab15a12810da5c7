//! `hbpf.toml` configuration
//!
//! ```toml
//! [vm]
//! max_steps = 100000
//!
//! [helpers]
//! defaults = true
//!
//! [[helpers.bind]]
//! id = 200
//! routine = "increment"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;
use vm::specs::DEFAULT_MAX_STEPS;
use vm::{HelperTable, VmConfig};

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub vm: VmSection,
    pub helpers: HelpersSection,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct VmSection {
    pub max_steps: u64,
}

impl Default for VmSection {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HelpersSection {
    /// Bind the catalog routines that own a well-known id
    pub defaults: bool,
    pub bind: Vec<Binding>,
}

impl Default for HelpersSection {
    fn default() -> Self {
        Self {
            defaults: true,
            bind: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Binding {
    pub id: u32,
    pub routine: String,
}

impl Config {
    /// Read a configuration file, or the defaults when no path is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read config {}", path))?;
        Self::parse(&content).with_context(|| format!("Invalid config {}", path))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Build the helper table described by the `[helpers]` section.
    /// Explicit bindings override the defaults.
    pub fn helper_table(&self) -> Result<HelperTable> {
        let mut table = if self.helpers.defaults {
            HelperTable::with_defaults()
        } else {
            HelperTable::new()
        };
        for binding in &self.helpers.bind {
            table
                .register_routine(binding.id, &binding.routine)
                .with_context(|| format!("Cannot bind helper {}", binding.id))?;
        }
        Ok(table)
    }

    pub fn vm_config(&self) -> VmConfig {
        VmConfig::default().with_max_steps(self.vm.max_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.vm.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.helper_table().unwrap().len(), 3);
    }

    #[test]
    fn test_bindings_and_no_defaults() {
        let config = Config::parse(
            r#"
            [vm]
            max_steps = 500

            [helpers]
            defaults = false

            [[helpers.bind]]
            id = 200
            routine = "increment"
            "#,
        )
        .unwrap();
        assert_eq!(config.vm_config().max_steps, 500);

        let table = config.helper_table().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(200).unwrap().name, "increment");
    }

    #[test]
    fn test_unknown_routine_is_an_error() {
        let config = Config::parse("[[helpers.bind]]\nid = 9\nroutine = \"nope\"\n").unwrap();
        let err = format!("{:#}", config.helper_table().unwrap_err());
        assert!(err.contains("nope"), "{err}");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(Config::parse("[vm]\nsteps = 1\n").is_err());
    }
}
