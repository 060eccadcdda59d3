//! Platform definitions for multi-vendor support.
//!
//! A [`PlatformDefinition`] captures everything dialect-specific as data:
//! the prompt pattern, CLI rejection markers, config-mode commands, the
//! persistence command, and a lookup table mapping abstract command ids to
//! the vendor's command strings. Vendor behavior is selected by looking up
//! a device's platform tag in a [`PlatformCatalog`] built at startup; there
//! is no global registry.

pub mod vendors;

use indexmap::IndexMap;

use crate::error::{PlatformError, Result};

/// Vendor-specific configuration for one platform tag.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g. "cisco_ios", "huawei_vrp").
    pub name: String,

    /// Regex matching this platform's CLI prompt at end of output.
    pub prompt_pattern: String,

    /// Case-sensitive markers the CLI prints when it rejects a command.
    pub rejection_patterns: Vec<String>,

    /// Command entering configuration mode.
    pub config_enter: String,

    /// Command leaving configuration mode.
    pub config_exit: String,

    /// Command persisting the running configuration.
    pub save_command: String,

    /// Commands issued right after connecting (e.g. disable pagination).
    pub on_open_commands: Vec<String>,

    /// Marker line starting the real configuration; everything before it
    /// is console preamble and dropped when capturing a config.
    pub config_preamble_marker: Option<String>,

    /// Patterns for lines the device rewrites on its own (stripped before
    /// comparing configurations).
    pub volatile_patterns: Vec<String>,

    /// Dialect table: abstract command id -> vendor command string.
    /// A `{}` in the command string is replaced by the call argument.
    pub commands: IndexMap<String, String>,
}

impl PlatformDefinition {
    /// Create a new platform definition with the required fields.
    pub fn new(name: impl Into<String>, prompt_pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt_pattern: prompt_pattern.into(),
            rejection_patterns: vec![],
            config_enter: "configure terminal".to_string(),
            config_exit: "end".to_string(),
            save_command: "write".to_string(),
            on_open_commands: vec![],
            config_preamble_marker: None,
            volatile_patterns: vec![],
            commands: IndexMap::new(),
        }
    }

    /// Add a CLI rejection marker.
    pub fn with_rejection(mut self, pattern: impl Into<String>) -> Self {
        self.rejection_patterns.push(pattern.into());
        self
    }

    /// Set the config-mode enter/exit commands.
    pub fn with_config_mode(
        mut self,
        enter: impl Into<String>,
        exit: impl Into<String>,
    ) -> Self {
        self.config_enter = enter.into();
        self.config_exit = exit.into();
        self
    }

    /// Set the persistence command.
    pub fn with_save_command(mut self, command: impl Into<String>) -> Self {
        self.save_command = command.into();
        self
    }

    /// Add an on-open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set the configuration preamble marker.
    pub fn with_preamble_marker(mut self, marker: impl Into<String>) -> Self {
        self.config_preamble_marker = Some(marker.into());
        self
    }

    /// Add a volatile-line pattern.
    pub fn with_volatile_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.volatile_patterns.push(pattern.into());
        self
    }

    /// Register a dialect entry.
    pub fn with_command(mut self, id: impl Into<String>, command: impl Into<String>) -> Self {
        self.commands.insert(id.into(), command.into());
        self
    }

    /// Look up a dialect entry.
    pub fn dialect(&self, id: &str) -> Option<&str> {
        self.commands.get(id).map(String::as_str)
    }

    /// Resolve a dialect entry, substituting `{}` with `arg` when present.
    pub fn render_dialect(&self, id: &str, arg: Option<&str>) -> Result<String> {
        let template = self.dialect(id).ok_or_else(|| PlatformError::UnknownCommand {
            platform: self.name.clone(),
            id: id.to_string(),
        })?;
        Ok(match arg {
            Some(arg) => template.replace("{}", arg),
            None => template.to_string(),
        })
    }
}

/// Catalog of platform definitions, keyed by platform tag.
///
/// Built once at startup and shared read-only.
#[derive(Debug, Default)]
pub struct PlatformCatalog {
    platforms: IndexMap<String, PlatformDefinition>,
}

impl PlatformCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with the built-in platforms registered.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for platform in [vendors::cisco_ios::platform(), vendors::huawei_vrp::platform()] {
            // Built-in names are distinct; insert cannot clash.
            catalog.platforms.insert(platform.name.clone(), platform);
        }
        catalog
    }

    /// Register a platform definition.
    pub fn register(&mut self, platform: PlatformDefinition) -> Result<()> {
        if self.platforms.contains_key(&platform.name) {
            return Err(PlatformError::InvalidDefinition {
                message: format!("platform '{}' already registered", platform.name),
            }
            .into());
        }
        self.platforms.insert(platform.name.clone(), platform);
        Ok(())
    }

    /// Look up a platform by tag.
    pub fn get(&self, name: &str) -> Result<&PlatformDefinition> {
        self.platforms.get(name).ok_or_else(|| {
            PlatformError::Unknown {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// All registered platform tags.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }
}
